//! Schema documents: YAML or JSON descriptions of a schema tree.
//!
//! ```yaml
//! name: Config
//! about: Example tool
//! fields:
//!   - name: natural
//!     type: int
//!     help: A natural number
//!   - name: loglevel
//!     exclusive: true
//!     group:
//!       name: LogLevel
//!       fields:
//!         - { name: debug, type: bool }
//!         - { name: quiet, type: bool }
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use cfgschema_core::{FieldDeclaration, ListArity, ScalarType, SchemaType, Value, ValueShape};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors from loading or converting a schema document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid YAML in '{path}': {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("field '{field}': unknown type '{ty}'")]
    UnknownType { field: String, ty: String },
    #[error("field '{field}': declare exactly one of 'type' or 'group'")]
    AmbiguousType { field: String },
    #[error("field '{field}': unknown multiplicity '{value}' (expected one_or_more or zero_or_more)")]
    UnknownMultiplicity { field: String, value: String },
    #[error("field '{field}': cannot use {value} as a {ty} value: {reason}")]
    BadValue {
        field: String,
        value: String,
        ty: String,
        reason: String,
    },
}

/// A schema tree as written in a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDocument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(default)]
    pub exclusive: bool,
    #[serde(default)]
    pub fields: Vec<FieldDocument>,
    /// Submodes, selected by their `name` on the command line.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub submodes: Vec<SchemaDocument>,
}

/// One field of a [`SchemaDocument`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDocument {
    pub name: String,
    /// `str`, `int`, `float`, `path`, `bool`, `list[T]`, `optional[T]` or
    /// `union[A, B, ...]`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<SchemaDocument>,
    #[serde(default)]
    pub help: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
    #[serde(default)]
    pub positional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metavar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplicity: Option<String>,
    #[serde(default)]
    pub exclusive: bool,
}

impl SchemaDocument {
    /// Loads a document, as JSON for `.json` files and YAML otherwise.
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let display = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| DocumentError::Read {
            path: display.clone(),
            source,
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let document: Self = if is_json {
            serde_json::from_str(&text).map_err(|source| DocumentError::Json {
                path: display.clone(),
                source,
            })?
        } else {
            serde_yaml::from_str(&text).map_err(|source| DocumentError::Yaml {
                path: display.clone(),
                source,
            })?
        };
        debug!(path = %path.display(), schema = %document.name, "Loaded schema document");
        Ok(document)
    }

    /// Converts the document, without its submodes, into a schema.
    pub fn to_schema(&self) -> Result<SchemaType, DocumentError> {
        let mut schema = SchemaType::new(self.name.clone());
        if let Some(about) = &self.about {
            schema = schema.with_about(about.clone());
        }
        if self.exclusive {
            schema = schema.mutually_exclusive();
        }
        for field in &self.fields {
            schema = schema.with_field(field.to_declaration()?);
        }
        Ok(schema)
    }

    /// Submodes as `(name, schema)` pairs, in document order.
    pub fn submode_schemas(&self) -> Result<Vec<(String, SchemaType)>, DocumentError> {
        self.submodes
            .iter()
            .map(|doc| Ok((doc.name.clone(), doc.to_schema()?)))
            .collect()
    }
}

impl FieldDocument {
    fn to_declaration(&self) -> Result<FieldDeclaration, DocumentError> {
        let shape = match (&self.ty, &self.group) {
            (Some(ty), None) => parse_shape(&self.name, ty)?,
            (None, Some(group)) => ValueShape::Group(Arc::new(group.to_schema()?)),
            _ => {
                return Err(DocumentError::AmbiguousType {
                    field: self.name.clone(),
                });
            }
        };

        let scalar = match &shape {
            ValueShape::Scalar(t) | ValueShape::List(t) | ValueShape::Optional(t) => Some(*t),
            ValueShape::Toggle => Some(ScalarType::Boolean),
            ValueShape::Group(_) | ValueShape::Union(_) => None,
        };

        let mut field = FieldDeclaration::new(self.name.clone(), shape, self.help.clone())
            .names(self.names.iter().cloned());
        if self.positional {
            field = field.positional();
        }
        if self.exclusive {
            field = field.exclusive();
        }
        if let Some(metavar) = &self.metavar {
            field = field.metavar(metavar.clone());
        }
        if let Some(choices) = &self.choices {
            let choices = choices
                .iter()
                .map(|choice| self.convert(choice, scalar))
                .collect::<Result<Vec<_>, _>>()?;
            field = field.choices(choices);
        }
        if let Some(default) = &self.default {
            field = field.default(self.convert(default, scalar)?);
        }
        if let Some(multiplicity) = &self.multiplicity {
            field = field.arity(match multiplicity.as_str() {
                "one_or_more" | "+" => ListArity::OneOrMore,
                "zero_or_more" | "*" => ListArity::ZeroOrMore,
                other => {
                    return Err(DocumentError::UnknownMultiplicity {
                        field: self.name.clone(),
                        value: other.to_string(),
                    });
                }
            });
        }
        Ok(field)
    }

    /// Converts a document value. Strings are treated as command-line
    /// tokens of the field's type; other JSON values map directly and are
    /// type-checked when the schema is compiled.
    fn convert(&self, json: &serde_json::Value, scalar: Option<ScalarType>) -> Result<Value, DocumentError> {
        let bad = |reason: String| DocumentError::BadValue {
            field: self.name.clone(),
            value: json.to_string(),
            ty: scalar.map_or_else(|| "nested".to_string(), |t| t.to_string()),
            reason,
        };
        let Some(scalar) = scalar else {
            return Err(bad("nested groups take no values".to_string()));
        };
        match json {
            serde_json::Value::Null => Ok(Value::None),
            serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
            serde_json::Value::String(token) => scalar.convert(token).map_err(bad),
            serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) if scalar != ScalarType::Float => Ok(Value::Int(i)),
                (_, Some(x)) => Ok(Value::Float(x)),
                _ => Err(bad("number out of range".to_string())),
            },
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| self.convert(item, Some(scalar)))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            serde_json::Value::Object(_) => Err(bad("objects are not supported".to_string())),
        }
    }
}

fn parse_shape(field: &str, ty: &str) -> Result<ValueShape, DocumentError> {
    let ty = ty.trim();
    let unknown = || DocumentError::UnknownType {
        field: field.to_string(),
        ty: ty.to_string(),
    };
    if let Some(inner) = strip_wrapper(ty, "list") {
        return parse_scalar(inner).map(ValueShape::List).ok_or_else(unknown);
    }
    if let Some(inner) = strip_wrapper(ty, "optional") {
        return parse_scalar(inner).map(ValueShape::Optional).ok_or_else(unknown);
    }
    if let Some(inner) = strip_wrapper(ty, "union") {
        return split_top_level(inner)
            .into_iter()
            .map(|member| parse_shape(field, member))
            .collect::<Result<Vec<_>, _>>()
            .map(ValueShape::Union);
    }
    match parse_scalar(ty) {
        Some(ScalarType::Boolean) => Ok(ValueShape::Toggle),
        Some(scalar) => Ok(ValueShape::Scalar(scalar)),
        None => Err(unknown()),
    }
}

fn parse_scalar(name: &str) -> Option<ScalarType> {
    match name.trim() {
        "str" | "string" => Some(ScalarType::String),
        "int" | "integer" => Some(ScalarType::Integer),
        "float" => Some(ScalarType::Float),
        "path" => Some(ScalarType::Path),
        "bool" | "boolean" => Some(ScalarType::Boolean),
        _ => None,
    }
}

/// `list[int]` → `int` for wrapper `list`.
fn strip_wrapper<'a>(ty: &'a str, wrapper: &str) -> Option<&'a str> {
    ty.strip_prefix(wrapper)?
        .trim_start()
        .strip_prefix('[')?
        .strip_suffix(']')
}

/// Splits on commas that are not inside brackets.
fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(list[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(list[start..].trim());
    parts
}
