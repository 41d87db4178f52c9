//! Reconstruction of the object graph from parsed values.

use tracing::debug;

use crate::classify::ArgumentKind;
use crate::compile::CompiledGroup;
use crate::descriptor::ArgumentDescriptor;
use crate::engine::ParsedValues;
use crate::error::{Error, SchemaError, UsageError, UsageKind};
use crate::schema::{ConfigSchema, Transform, TransformError};
use crate::value::{Record, Value};

/// Builds the record for `tree` from `values`.
///
/// Each member takes its parsed value, or its default when the engine did
/// not report one, through the member's transform. Each child is built
/// recursively and then passed through its group transform.
///
/// # Examples
///
/// ```
/// use cfgschema_core::*;
///
/// let schema = SchemaType::new("Config")
///     .with_field(FieldDeclaration::flag("debug", "Enable debug logging"))
///     .with_field(FieldDeclaration::optional("name", ScalarType::String, "Name"));
/// let tree = compile(&schema).unwrap();
///
/// let record = construct(&tree, &ParsedValues::default()).unwrap();
/// assert_eq!(record.get("debug"), Some(&Value::Bool(false)));
/// assert_eq!(record.get("name"), Some(&Value::None));
/// ```
pub fn construct(tree: &CompiledGroup, values: &ParsedValues) -> Result<Record, Error> {
    let record = construct_group(tree, values)?;
    debug!(schema = %tree.schema, values = values.len(), "Constructed record");
    Ok(record)
}

/// Builds the record for `tree` and extracts `T` from it.
pub fn construct_typed<T: ConfigSchema>(tree: &CompiledGroup, values: &ParsedValues) -> Result<T, Error> {
    let record = construct(tree, values)?;
    Ok(T::from_record(record)?)
}

fn construct_group(group: &CompiledGroup, values: &ParsedValues) -> Result<Record, Error> {
    let mut fields = Vec::with_capacity(group.members.len() + group.children.len());
    for member in &group.members {
        fields.push((member.name.clone(), member_value(member, values)?));
    }
    for child in &group.children {
        let record = construct_group(&child.group, values)?;
        let value = match &child.transform {
            Some(transform) => apply(transform, Value::Record(record), &child.group.path)?,
            None => Value::Record(record),
        };
        fields.push((child.field.clone(), value));
    }
    Ok(Record::new(group.schema.clone(), fields))
}

fn member_value(member: &ArgumentDescriptor, values: &ParsedValues) -> Result<Value, Error> {
    let raw = match values.get(&member.dest).or(member.default.as_ref()) {
        Some(value) => value.clone(),
        None => {
            return Err(UsageError::new(
                UsageKind::InvalidInput,
                format!(
                    "the following required argument was not provided: {}",
                    member.display_name()
                ),
            )
            .into());
        }
    };
    if member.kind == ArgumentKind::Optional && raw == Value::None {
        return Ok(raw);
    }
    apply(&member.transform, raw, &member.dest)
}

fn apply(transform: &Transform, value: Value, path: &str) -> Result<Value, Error> {
    transform.apply(value).map_err(|err| match err {
        TransformError::Invalid(message) => UsageError::new(
            UsageKind::Transform,
            format!("invalid value for '{path}': {message}"),
        )
        .into(),
        TransformError::Mismatch(message) => SchemaError::Extract {
            schema: "transform".to_string(),
            field: path.to_string(),
            message,
        }
        .into(),
        TransformError::Schema(err) => err.into(),
    })
}
