//! Registration emitter and the parsing-engine seam.
//!
//! The core never reads argv. It declares the compiled tree to an
//! [`ArgumentEngine`] (one logical group per schema level, one argument per
//! descriptor) and later reads back a flat [`ParsedValues`] map keyed by
//! descriptor `dest`.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::compile::CompiledGroup;
use crate::descriptor::ArgumentDescriptor;
use crate::error::SchemaError;
use crate::value::Value;

/// One logical argument group as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupDeclaration {
    /// Schema name at the root, dotted field path below it.
    pub id: String,
    pub parent: Option<String>,
    pub title: String,
    /// Only direct members take part in the exclusivity constraint.
    pub exclusive: bool,
}

impl GroupDeclaration {
    fn for_group(group: &CompiledGroup, parent: Option<&GroupDeclaration>) -> Self {
        Self {
            id: if group.path.is_empty() {
                group.schema.clone()
            } else {
                group.path.clone()
            },
            parent: parent.map(|p| p.id.clone()),
            title: group.title(),
            exclusive: group.exclusive,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// An argument parsing engine that compiled trees can be declared to.
pub trait ArgumentEngine {
    /// Declares a logical group. Called before any of its arguments.
    fn declare_group(&mut self, group: &GroupDeclaration) -> Result<(), SchemaError>;

    /// Declares one argument inside `group`.
    fn declare_argument(
        &mut self,
        group: &GroupDeclaration,
        argument: &ArgumentDescriptor,
    ) -> Result<(), SchemaError>;

    /// Declares a subcommand alternative carrying its own compiled tree.
    fn declare_submode(
        &mut self,
        name: &str,
        about: Option<&str>,
        tree: &CompiledGroup,
    ) -> Result<(), SchemaError>;
}

/// Declares `tree` to `engine`: each group, then its direct members, then
/// its children in order.
pub fn register<E: ArgumentEngine + ?Sized>(
    tree: &CompiledGroup,
    engine: &mut E,
) -> Result<(), SchemaError> {
    register_group(tree, None, engine)
}

fn register_group<E: ArgumentEngine + ?Sized>(
    group: &CompiledGroup,
    parent: Option<&GroupDeclaration>,
    engine: &mut E,
) -> Result<(), SchemaError> {
    let declaration = GroupDeclaration::for_group(group, parent);
    debug!(
        group = %declaration.id,
        exclusive = declaration.exclusive,
        members = group.members.len(),
        "Registering group"
    );
    engine.declare_group(&declaration)?;
    for member in &group.members {
        engine.declare_argument(&declaration, member)?;
    }
    for child in &group.children {
        register_group(&child.group, Some(&declaration), engine)?;
    }
    Ok(())
}

/// Flat `dest → value` map produced by an engine.
///
/// Engines report only values the user supplied (toggles always); anything
/// absent falls back to the descriptor default during construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParsedValues(BTreeMap<String, Value>);

impl ParsedValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, dest: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(dest.into(), value)
    }

    pub fn get(&self, dest: &str) -> Option<&Value> {
        self.0.get(dest)
    }

    pub fn contains(&self, dest: &str) -> bool {
        self.0.contains_key(dest)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ParsedValues {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// One recorded declaration.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum PlanStep {
    Group(GroupDeclaration),
    Argument {
        group: String,
        argument: ArgumentDescriptor,
    },
    Submode {
        name: String,
        about: Option<String>,
        plan: RegistrationPlan,
    },
}

/// An engine that records declarations instead of acting on them.
///
/// # Examples
///
/// ```
/// use cfgschema_core::*;
///
/// let schema = SchemaType::new("Config")
///     .with_field(FieldDeclaration::arg("natural", ScalarType::Integer, "A natural number"));
/// let tree = compile(&schema).unwrap();
///
/// let mut plan = RegistrationPlan::default();
/// register(&tree, &mut plan).unwrap();
/// assert_eq!(plan.steps.len(), 2);
/// assert_eq!(plan.arguments().next().unwrap().dest, "natural");
/// ```
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistrationPlan {
    pub steps: Vec<PlanStep>,
}

impl RegistrationPlan {
    /// Records the full declaration sequence of `tree`.
    pub fn of(tree: &CompiledGroup) -> Result<Self, SchemaError> {
        let mut plan = Self::default();
        register(tree, &mut plan)?;
        Ok(plan)
    }

    pub fn groups(&self) -> impl Iterator<Item = &GroupDeclaration> {
        self.steps.iter().filter_map(|step| match step {
            PlanStep::Group(group) => Some(group),
            _ => None,
        })
    }

    pub fn arguments(&self) -> impl Iterator<Item = &ArgumentDescriptor> {
        self.steps.iter().filter_map(|step| match step {
            PlanStep::Argument { argument, .. } => Some(argument),
            _ => None,
        })
    }
}

impl ArgumentEngine for RegistrationPlan {
    fn declare_group(&mut self, group: &GroupDeclaration) -> Result<(), SchemaError> {
        self.steps.push(PlanStep::Group(group.clone()));
        Ok(())
    }

    fn declare_argument(
        &mut self,
        group: &GroupDeclaration,
        argument: &ArgumentDescriptor,
    ) -> Result<(), SchemaError> {
        self.steps.push(PlanStep::Argument {
            group: group.id.clone(),
            argument: argument.clone(),
        });
        Ok(())
    }

    fn declare_submode(
        &mut self,
        name: &str,
        about: Option<&str>,
        tree: &CompiledGroup,
    ) -> Result<(), SchemaError> {
        self.steps.push(PlanStep::Submode {
            name: name.to_string(),
            about: about.map(str::to_string),
            plan: Self::of(tree)?,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::schema::{FieldDeclaration, SchemaType};
    use crate::value::{ScalarType, ValueShape};

    fn log_level() -> SchemaType {
        SchemaType::new("LogLevel")
            .with_about("Logging verbosity")
            .mutually_exclusive()
            .with_field(FieldDeclaration::flag("debug", "Enable debug logging"))
            .with_field(FieldDeclaration::flag("quiet", "Only output errors"))
    }

    fn config() -> SchemaType {
        SchemaType::new("Config")
            .with_field(
                FieldDeclaration::new("loglevel", ValueShape::Group(log_level().into()), ""),
            )
            .with_field(FieldDeclaration::arg("name", ScalarType::String, "Name"))
    }

    #[test]
    fn test_register_emits_members_before_children() {
        let plan = RegistrationPlan::of(&compile(&config()).unwrap()).unwrap();
        let order: Vec<String> = plan
            .steps
            .iter()
            .map(|step| match step {
                PlanStep::Group(g) => format!("group:{}", g.id),
                PlanStep::Argument { argument, .. } => argument.dest.clone(),
                PlanStep::Submode { name, .. } => format!("submode:{name}"),
            })
            .collect();
        assert_eq!(
            order,
            vec![
                "group:Config",
                "name",
                "group:loglevel",
                "loglevel.debug",
                "loglevel.quiet"
            ]
        );
    }

    #[test]
    fn test_group_declarations_carry_parent_and_exclusivity() {
        let plan = RegistrationPlan::of(&compile(&config()).unwrap()).unwrap();
        let groups: Vec<_> = plan.groups().collect();
        assert!(groups[0].is_root());
        assert!(!groups[0].exclusive);
        assert_eq!(groups[0].title, "Config");
        assert_eq!(groups[1].parent.as_deref(), Some("Config"));
        assert_eq!(groups[1].title, "Logging verbosity");
        assert!(groups[1].exclusive);
    }

    #[test]
    fn test_submode_step_records_nested_plan() {
        let mut plan = RegistrationPlan::default();
        let tree = compile(&log_level()).unwrap();
        plan.declare_submode("log", Some("Logging"), &tree).unwrap();
        let PlanStep::Submode { name, plan: inner, .. } = &plan.steps[0] else {
            panic!("expected submode step");
        };
        assert_eq!(name, "log");
        assert_eq!(inner.arguments().count(), 2);

        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["steps"][0]["step"], "submode");
    }

    #[test]
    fn test_parsed_values_collects_from_pairs() {
        let values: ParsedValues = [("natural", Value::Int(5)), ("debug", Value::Bool(true))]
            .into_iter()
            .collect();
        assert_eq!(values.len(), 2);
        assert!(values.contains("debug"));
        assert_eq!(values.get("natural"), Some(&Value::Int(5)));
        assert_eq!(values.iter().next().map(|(k, _)| k), Some("debug"));
    }
}
