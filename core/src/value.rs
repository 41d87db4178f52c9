//! Value shapes and runtime values.
//!
//! A field's declared value shape is a tagged variant decided when the
//! schema is authored ([`ValueShape`]); raw CLI tokens are converted into
//! [`Value`]s by the [`ScalarType`] converter the shape names. Typed Rust
//! values are read back out with [`FromValue`].

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::hash::Hash;
use std::path::PathBuf;
use std::sync::Arc;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::schema::{ConfigSchema, SchemaType};
use crate::error::SchemaError;

/// Converter applied to each raw token of an argument.
///
/// # Examples
///
/// ```
/// use cfgschema_core::{ScalarType, Value};
///
/// assert_eq!(ScalarType::Integer.convert("42"), Ok(Value::Int(42)));
/// assert!(ScalarType::Integer.convert("forty-two").is_err());
/// assert_eq!(ScalarType::Boolean.convert("yes"), Ok(Value::Bool(true)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    /// UTF-8 string, taken verbatim.
    String,
    /// Signed 64-bit integer.
    Integer,
    /// 64-bit float.
    Float,
    /// Filesystem path.
    Path,
    /// Boolean token (`true`/`false`, `yes`/`no`, `1`/`0`).
    Boolean,
}

impl ScalarType {
    /// Converts one raw token into a value of this type.
    pub fn convert(self, token: &str) -> Result<Value, String> {
        match self {
            Self::String => Ok(Value::Str(token.to_string())),
            Self::Integer => token
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| format!("invalid integer '{token}': {e}")),
            Self::Float => token
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| format!("invalid float '{token}': {e}")),
            Self::Path => Ok(Value::Path(PathBuf::from(token))),
            Self::Boolean => match token.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(Value::Bool(true)),
                "false" | "no" | "0" => Ok(Value::Bool(false)),
                _ => Err(format!("invalid boolean '{token}'")),
            },
        }
    }

    /// Returns true if `value` is a member of this type.
    pub fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::String, Value::Str(_))
                | (Self::Integer, Value::Int(_))
                | (Self::Float, Value::Float(_))
                | (Self::Path, Value::Path(_))
                | (Self::Boolean, Value::Bool(_))
        )
    }

    /// Short type name used in messages and schema documents.
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "str",
            Self::Integer => "int",
            Self::Float => "float",
            Self::Path => "path",
            Self::Boolean => "bool",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared shape of a field's value.
///
/// `Optional` is a variant of its own rather than a union with an absence
/// marker; `Union` only exists so that other unions can be described and
/// rejected at compile time.
#[derive(Debug, Clone)]
pub enum ValueShape {
    /// A single value of the scalar type.
    Scalar(ScalarType),
    /// One or more values of the scalar type.
    List(ScalarType),
    /// A single value or [`Value::None`].
    Optional(ScalarType),
    /// A boolean flag that takes no value.
    Toggle,
    /// A nested schema.
    Group(Arc<SchemaType>),
    /// Any other union. Always rejected by the compiler.
    Union(Vec<ValueShape>),
}

impl fmt::Display for ValueShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(t) => write!(f, "{t}"),
            Self::List(t) => write!(f, "list[{t}]"),
            Self::Optional(t) => write!(f, "optional[{t}]"),
            Self::Toggle => f.write_str("bool"),
            Self::Group(schema) => f.write_str(&schema.name),
            Self::Union(members) => {
                f.write_str("union[")?;
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{member}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// A runtime value: a converted token, a list of them, or a constructed
/// record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The absence member of an Optional field.
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Path(PathBuf),
    List(Vec<Value>),
    Record(Record),
}

impl Value {
    /// Human-readable kind name, used in extraction errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Path(_) => "path",
            Self::List(_) => "list",
            Self::Record(_) => "record",
        }
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Path(p) => write!(f, "{:?}", p.display().to_string()),
            other => write!(f, "{other}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt_nested(f)?;
                }
                f.write_str("]")
            }
            Self::Record(record) => write!(f, "{record}"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::None => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(x) => serializer.serialize_f64(*x),
            Self::Str(s) => serializer.serialize_str(s),
            Self::Path(p) => serializer.serialize_str(&p.to_string_lossy()),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Record(record) => record.serialize(serializer),
        }
    }
}

/// A constructed schema instance: field name to value, in compiled order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: String,
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new(schema: impl Into<String>, fields: Vec<(String, Value)>) -> Self {
        Self {
            schema: schema.into(),
            fields,
        }
    }

    /// Name of the schema this record was constructed from.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Removes a field and converts it into `T`.
    ///
    /// A missing field or a value of the wrong kind means the schema and
    /// the type reading it disagree, which is a [`SchemaError::Extract`].
    ///
    /// # Examples
    ///
    /// ```
    /// use cfgschema_core::{Record, Value};
    ///
    /// let mut record = Record::new("Config", vec![("natural".into(), Value::Int(5))]);
    /// let natural: i64 = record.take("natural").unwrap();
    /// assert_eq!(natural, 5);
    /// assert!(record.take::<i64>("natural").is_err());
    /// ```
    pub fn take<T: FromValue>(&mut self, name: &str) -> Result<T, SchemaError> {
        let value = self.take_value(name)?;
        T::from_value(value).map_err(|message| self.extract_error(name, message))
    }

    /// Removes a nested record field and builds the schema type from it.
    pub fn take_group<T: ConfigSchema>(&mut self, name: &str) -> Result<T, SchemaError> {
        match self.take_value(name)? {
            Value::Record(record) => T::from_record(record),
            other => Err(self.extract_error(
                name,
                format!("expected a nested record, found {}", other.kind_name()),
            )),
        }
    }

    fn take_value(&mut self, name: &str) -> Result<Value, SchemaError> {
        let idx = self
            .fields
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| self.extract_error(name, "no such field".to_string()))?;
        Ok(self.fields.remove(idx).1)
    }

    fn extract_error(&self, field: &str, message: String) -> SchemaError {
        SchemaError::Extract {
            schema: self.schema.clone(),
            field: field.to_string(),
            message,
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.schema)?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}=")?;
            value.fmt_nested(f)?;
        }
        f.write_str(")")
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Conversion from a [`Value`] into a typed Rust value.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, String>;
}

fn mismatch(expected: &str, found: &Value) -> String {
    format!("expected {expected}, found {}", found.kind_name())
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, String> {
        Ok(value)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(mismatch("str", &other)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Int(i) => Ok(i),
            other => Err(mismatch("int", &other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Float(x) => Ok(x),
            Value::Int(i) => Ok(i as f64),
            other => Err(mismatch("float", &other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl FromValue for PathBuf {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Path(p) => Ok(p),
            Value::Str(s) => Ok(PathBuf::from(s)),
            other => Err(mismatch("path", &other)),
        }
    }
}

impl FromValue for Record {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Record(r) => Ok(r),
            other => Err(mismatch("record", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::None => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

fn list_items(value: Value) -> Result<Vec<Value>, String> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(mismatch("list", &other)),
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, String> {
        list_items(value)?.into_iter().map(T::from_value).collect()
    }
}

impl<T: FromValue + Ord> FromValue for BTreeSet<T> {
    fn from_value(value: Value) -> Result<Self, String> {
        list_items(value)?.into_iter().map(T::from_value).collect()
    }
}

impl<T: FromValue + Eq + Hash> FromValue for HashSet<T> {
    fn from_value(value: Value) -> Result<Self, String> {
        list_items(value)?.into_iter().map(T::from_value).collect()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<PathBuf> for Value {
    fn from(p: PathBuf) -> Self {
        Value::Path(p)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::None, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_tokens() {
        assert_eq!(ScalarType::String.convert("abc"), Ok(Value::Str("abc".into())));
        assert_eq!(ScalarType::Integer.convert("-1"), Ok(Value::Int(-1)));
        assert_eq!(ScalarType::Float.convert("1.5"), Ok(Value::Float(1.5)));
        assert_eq!(
            ScalarType::Path.convert("/tmp/x"),
            Ok(Value::Path(PathBuf::from("/tmp/x")))
        );
        assert_eq!(ScalarType::Boolean.convert("FALSE"), Ok(Value::Bool(false)));
        assert!(ScalarType::Boolean.convert("maybe").is_err());
        assert!(ScalarType::Float.convert("x").is_err());
    }

    #[test]
    fn test_accepts_is_strict() {
        assert!(ScalarType::Integer.accepts(&Value::Int(1)));
        assert!(!ScalarType::Integer.accepts(&Value::Str("1".into())));
        assert!(!ScalarType::String.accepts(&Value::None));
    }

    #[test]
    fn test_record_display_quotes_nested_strings() {
        let record = Record::new(
            "SimpleOptCase",
            vec![("strfield".into(), Value::Str("test".into()))],
        );
        assert_eq!(record.to_string(), "SimpleOptCase(strfield=\"test\")");
    }

    #[test]
    fn test_typed_extraction() {
        let list = Value::from(vec!["b", "a", "b"]);
        let set: BTreeSet<String> = FromValue::from_value(list.clone()).unwrap();
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);

        let opt: Option<i64> = FromValue::from_value(Value::None).unwrap();
        assert_eq!(opt, None);

        let err = <i64 as FromValue>::from_value(Value::Str("x".into())).unwrap_err();
        assert_eq!(err, "expected int, found str");
    }

    #[test]
    fn test_record_take_group_requires_record() {
        let mut record = Record::new("Top", vec![("inner".into(), Value::Int(1))]);
        let err = record.take::<Record>("inner").unwrap_err();
        assert!(matches!(err, SchemaError::Extract { ref field, .. } if field == "inner"));
    }

    #[test]
    fn test_serialize_record_as_map() {
        let record = Record::new(
            "Config",
            vec![
                ("debug".into(), Value::Bool(true)),
                ("level".into(), Value::None),
                ("paths".into(), Value::List(vec![Value::Path("a".into())])),
            ],
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"debug": true, "level": null, "paths": ["a"]})
        );
    }
}
