//! Group compiler.
//!
//! Walks a [`SchemaType`] depth-first in declaration order, producing a
//! [`CompiledGroup`] tree: descriptors for direct fields, named child
//! compilations for nested schema fields. Tree-wide invariants (unique flag
//! spellings, fillable positional slots) are checked once the tree is built.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::classify::Multiplicity;
use crate::descriptor::ArgumentDescriptor;
use crate::error::SchemaError;
use crate::schema::{ConfigSchema, FieldDeclaration, SchemaType, Transform, schema_of};
use crate::value::ValueShape;

/// Compiled form of one schema level.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledGroup {
    pub schema: String,
    pub about: Option<String>,
    /// Dotted path of the field holding this group; empty at the root.
    pub path: String,
    pub exclusive: bool,
    pub members: Vec<ArgumentDescriptor>,
    pub children: Vec<ChildGroup>,
}

/// A nested schema field.
#[derive(Debug, Clone, Serialize)]
pub struct ChildGroup {
    pub field: String,
    pub group: CompiledGroup,
    #[serde(skip)]
    pub transform: Option<Transform>,
}

impl CompiledGroup {
    /// Every descriptor in the tree, in registration order (direct members,
    /// then each child in turn).
    pub fn descriptors(&self) -> Vec<&ArgumentDescriptor> {
        let mut out = Vec::new();
        self.collect_descriptors(&mut out);
        out
    }

    fn collect_descriptors<'a>(&'a self, out: &mut Vec<&'a ArgumentDescriptor>) {
        out.extend(self.members.iter());
        for child in &self.children {
            child.group.collect_descriptors(out);
        }
    }

    pub fn child(&self, field: &str) -> Option<&ChildGroup> {
        self.children.iter().find(|c| c.field == field)
    }

    /// Number of groups in the tree, including this one.
    pub fn group_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|c| c.group.group_count())
            .sum::<usize>()
    }

    /// Heading used when the group is registered.
    pub fn title(&self) -> String {
        self.about.clone().unwrap_or_else(|| {
            if self.path.is_empty() {
                self.schema.clone()
            } else {
                self.path.clone()
            }
        })
    }
}

/// Compiles a schema into a fresh tree.
///
/// # Examples
///
/// ```
/// use cfgschema_core::*;
///
/// let log_level = SchemaType::new("LogLevel")
///     .mutually_exclusive()
///     .with_field(FieldDeclaration::flag("debug", "Enable debug logging"))
///     .with_field(FieldDeclaration::flag("quiet", "Only output errors"));
/// let config = SchemaType::new("Config").with_field(FieldDeclaration::new(
///     "loglevel",
///     ValueShape::Group(log_level.into()),
///     "",
/// ));
///
/// let compiled = compile(&config).unwrap();
/// let child = compiled.child("loglevel").unwrap();
/// assert!(child.group.exclusive);
/// assert_eq!(child.group.members[0].dest, "loglevel.debug");
/// ```
pub fn compile(schema: &SchemaType) -> Result<CompiledGroup, SchemaError> {
    let group = compile_group(schema, String::new(), schema.exclusive)?;
    check_identities(&group)?;
    check_positionals(&group)?;
    debug!(
        schema = %schema.name,
        arguments = group.descriptors().len(),
        groups = group.group_count(),
        "Compiled schema"
    );
    Ok(group)
}

/// Compiles the cached schema of `T`.
pub fn compile_schema<T: ConfigSchema>() -> Result<CompiledGroup, SchemaError> {
    compile(&schema_of::<T>())
}

fn compile_group(
    schema: &SchemaType,
    path: String,
    exclusive: bool,
) -> Result<CompiledGroup, SchemaError> {
    let mut seen = HashSet::new();
    let mut members = Vec::new();
    let mut children = Vec::new();

    for field in &schema.fields {
        if !seen.insert(field.name.as_str()) {
            return Err(SchemaError::DuplicateField {
                schema: schema.name.clone(),
                field: field.name.clone(),
            });
        }
        let dest = if path.is_empty() {
            field.name.clone()
        } else {
            format!("{path}.{}", field.name)
        };

        match field.cli_shape() {
            ValueShape::Group(child) => {
                check_group_field(&dest, field)?;
                let group = compile_group(child, dest, field.exclusive || child.exclusive)?;
                children.push(ChildGroup {
                    field: field.name.clone(),
                    group,
                    transform: field.transform.as_ref().map(|t| t.func.clone()),
                });
            }
            _ if field.exclusive => return Err(SchemaError::ExclusiveOnNonGroup { field: dest }),
            _ => members.push(ArgumentDescriptor::from_field(dest, field)?),
        }
    }

    Ok(CompiledGroup {
        schema: schema.name.clone(),
        about: schema.about.clone(),
        path,
        exclusive,
        members,
        children,
    })
}

/// Argument-level options have no meaning on a nested group field.
fn check_group_field(dest: &str, field: &FieldDeclaration) -> Result<(), SchemaError> {
    let option = if field.positional {
        "positional"
    } else if !field.names.is_empty() {
        "alternate names"
    } else if field.metavar.is_some() {
        "a metavar"
    } else if field.choices.is_some() {
        "choices"
    } else if field.default.is_specified() {
        "a default"
    } else if field.arity.is_some() {
        "a multiplicity"
    } else {
        return Ok(());
    };
    Err(SchemaError::GroupFieldOption {
        field: dest.to_string(),
        option,
    })
}

fn check_identities(group: &CompiledGroup) -> Result<(), SchemaError> {
    let mut owners: HashMap<String, &str> = HashMap::new();
    for desc in group.descriptors() {
        for identity in desc.flag_names() {
            if let Some(first) = owners.get(&identity) {
                return Err(SchemaError::DuplicateIdentity {
                    identity,
                    first: first.to_string(),
                    second: desc.dest.clone(),
                });
            }
            owners.insert(identity, desc.dest.as_str());
        }
    }
    Ok(())
}

fn check_positionals(group: &CompiledGroup) -> Result<(), SchemaError> {
    let mut list: Option<&str> = None;
    let mut optional: Option<&str> = None;
    for desc in group.descriptors().into_iter().filter(|d| d.positional) {
        if let Some(list) = list {
            return Err(SchemaError::PositionalAfterList {
                field: desc.dest.clone(),
                list: list.to_string(),
            });
        }
        if desc.required {
            if let Some(optional) = optional {
                return Err(SchemaError::RequiredPositionalAfterOptional {
                    field: desc.dest.clone(),
                    optional: optional.to_string(),
                });
            }
        } else {
            optional.get_or_insert(desc.dest.as_str());
        }
        if desc.multiplicity != Multiplicity::Single {
            list = Some(desc.dest.as_str());
        }
    }
    Ok(())
}
