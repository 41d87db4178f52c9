//! Author-facing schema declarations.
//!
//! A [`SchemaType`] is an ordered list of [`FieldDeclaration`]s. Rust types
//! opt in by implementing [`ConfigSchema`]; their descriptions are built once
//! per type and cached by type identity ([`schema_of`]).
//!
//! # Example
//!
//! ```
//! use cfgschema_core::*;
//!
//! let schema = SchemaType::new("Config")
//!     .with_about("Example tool")
//!     .with_field(FieldDeclaration::arg("natural", ScalarType::Integer, "A natural number"))
//!     .with_field(FieldDeclaration::flag("debug", "Enable debug logging"))
//!     .with_field(
//!         FieldDeclaration::arg("out", ScalarType::Path, "Output file")
//!             .names(["-o", "--output"])
//!             .default(Value::Path("out.txt".into())),
//!     );
//!
//! assert_eq!(schema.fields.len(), 3);
//! assert!(schema.field("debug").is_some());
//! ```

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use thiserror::Error;

use crate::error::SchemaError;
use crate::validate::{Validate, Validator};
use crate::value::{FromValue, Record, ScalarType, Value, ValueShape};

/// Failure from a [`Transform`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// The value was well-typed but rejected; reported as a usage failure.
    #[error("{0}")]
    Invalid(String),
    /// The transform received a value of the wrong shape; a schema defect.
    #[error("{0}")]
    Mismatch(String),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

type TransformFn = dyn Fn(Value) -> Result<Value, TransformError> + Send + Sync;

/// Function applied to a value after parsing (field transform) or to a
/// fully built nested record (group transform).
#[derive(Clone)]
pub struct Transform(Arc<TransformFn>);

impl Transform {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, TransformError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn identity() -> Self {
        Self::new(Ok)
    }

    /// Typed infallible transform.
    ///
    /// # Examples
    ///
    /// ```
    /// use cfgschema_core::{Transform, Value};
    ///
    /// let upper = Transform::map(|s: String| s.to_uppercase());
    /// assert_eq!(upper.apply(Value::from("abc")), Ok(Value::from("ABC")));
    /// ```
    pub fn map<A, B, F>(f: F) -> Self
    where
        A: FromValue,
        B: Into<Value>,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        Self::new(move |value| {
            let input = A::from_value(value).map_err(TransformError::Mismatch)?;
            Ok(f(input).into())
        })
    }

    /// Typed transform that may reject its input.
    pub fn try_map<A, B, F>(f: F) -> Self
    where
        A: FromValue,
        B: Into<Value>,
        F: Fn(A) -> Result<B, String> + Send + Sync + 'static,
    {
        Self::new(move |value| {
            let input = A::from_value(value).map_err(TransformError::Mismatch)?;
            f(input).map(Into::into).map_err(TransformError::Invalid)
        })
    }

    /// Group transform over a fully built nested schema instance.
    pub fn group<T, B, F>(f: F) -> Self
    where
        T: ConfigSchema,
        B: Into<Value>,
        F: Fn(T) -> B + Send + Sync + 'static,
    {
        Self::new(move |value| {
            let record = Record::from_value(value).map_err(TransformError::Mismatch)?;
            Ok(f(T::from_record(record)?).into())
        })
    }

    pub fn apply(&self, value: Value) -> Result<Value, TransformError> {
        (self.0)(value)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transform(..)")
    }
}

/// Declared default of a field.
///
/// `NotSpecified` is the explicit absence marker; it is never confused with
/// a default of [`Value::None`], `false`, or an empty list.
#[derive(Clone, Default)]
pub enum DefaultValue {
    #[default]
    NotSpecified,
    Value(Value),
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    /// Evaluates the default; factories are called on every resolve.
    pub fn resolve(&self) -> Option<Value> {
        match self {
            Self::NotSpecified => None,
            Self::Value(v) => Some(v.clone()),
            Self::Factory(f) => Some(f()),
        }
    }

    pub fn is_specified(&self) -> bool {
        !matches!(self, Self::NotSpecified)
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSpecified => f.write_str("NotSpecified"),
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Multiplicity override for list fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListArity {
    OneOrMore,
    ZeroOrMore,
}

/// A transform together with the shape the CLI exposes in its place.
#[derive(Debug, Clone)]
pub struct FieldTransform {
    pub input: ValueShape,
    pub func: Transform,
}

/// One field of a schema.
#[derive(Debug, Clone)]
pub struct FieldDeclaration {
    pub name: String,
    pub shape: ValueShape,
    pub help: String,
    pub names: Vec<String>,
    pub positional: bool,
    pub metavar: Option<String>,
    pub choices: Option<Vec<Value>>,
    pub default: DefaultValue,
    pub transform: Option<FieldTransform>,
    pub arity: Option<ListArity>,
    pub exclusive: bool,
}

impl FieldDeclaration {
    pub fn new(name: impl Into<String>, shape: ValueShape, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shape,
            help: help.into(),
            names: Vec::new(),
            positional: false,
            metavar: None,
            choices: None,
            default: DefaultValue::NotSpecified,
            transform: None,
            arity: None,
            exclusive: false,
        }
    }

    /// A single-valued field of the given type.
    pub fn arg(name: impl Into<String>, ty: ScalarType, help: impl Into<String>) -> Self {
        Self::new(name, ValueShape::Scalar(ty), help)
    }

    /// A list field of the given element type.
    pub fn list(name: impl Into<String>, ty: ScalarType, help: impl Into<String>) -> Self {
        Self::new(name, ValueShape::List(ty), help)
    }

    /// An optional field that is [`Value::None`] when omitted.
    pub fn optional(name: impl Into<String>, ty: ScalarType, help: impl Into<String>) -> Self {
        Self::new(name, ValueShape::Optional(ty), help)
    }

    /// A boolean flag defaulting to false.
    pub fn flag(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self::new(name, ValueShape::Toggle, help)
    }

    /// A nested schema group. Its validators only run when the owning
    /// type lists the built instance in [`ConfigSchema::nested`].
    pub fn group<T: ConfigSchema>(name: impl Into<String>) -> Self {
        Self::new(name, ValueShape::Group(schema_of::<T>()), "")
    }

    /// A nested schema group whose direct members are mutually exclusive.
    pub fn exclusive_group<T: ConfigSchema>(name: impl Into<String>) -> Self {
        Self::group::<T>(name).exclusive()
    }

    /// A nested schema group whose built instance is passed through `f`.
    pub fn group_with<T, B, F>(name: impl Into<String>, f: F) -> Self
    where
        T: ConfigSchema,
        B: Into<Value>,
        F: Fn(T) -> B + Send + Sync + 'static,
    {
        let schema = schema_of::<T>();
        Self::new(name, ValueShape::Group(schema.clone()), "")
            .transform(ValueShape::Group(schema), Transform::group(f))
    }

    /// Explicit flag spellings, e.g. `["-f", "--force"]`.
    pub fn names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn positional(mut self) -> Self {
        self.positional = true;
        self
    }

    pub fn metavar(mut self, metavar: impl Into<String>) -> Self {
        self.metavar = Some(metavar.into());
        self
    }

    pub fn choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    /// Default in the CLI-facing shape (pre-transform).
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = DefaultValue::Value(value.into());
        self
    }

    pub fn default_with<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = DefaultValue::Factory(Arc::new(factory));
        self
    }

    /// Exposes `input` on the command line and applies `func` to the parsed
    /// value to produce the field's value.
    pub fn transform(mut self, input: ValueShape, func: Transform) -> Self {
        self.transform = Some(FieldTransform { input, func });
        self
    }

    pub fn arity(mut self, arity: ListArity) -> Self {
        self.arity = Some(arity);
        self
    }

    /// Marks a nested group field as mutually exclusive.
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    /// Shape the command line sees: the transform input if one is declared.
    pub fn cli_shape(&self) -> &ValueShape {
        self.transform
            .as_ref()
            .map_or(&self.shape, |transform| &transform.input)
    }
}

/// A named, ordered set of field declarations.
#[derive(Debug, Clone)]
pub struct SchemaType {
    pub name: String,
    pub about: Option<String>,
    pub fields: Vec<FieldDeclaration>,
    /// Direct members are mutually exclusive wherever this schema is nested.
    pub exclusive: bool,
}

impl SchemaType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            about: None,
            fields: Vec::new(),
            exclusive: false,
        }
    }

    pub fn with_about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    pub fn with_field(mut self, field: FieldDeclaration) -> Self {
        self.fields.push(field);
        self
    }

    pub fn mutually_exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDeclaration> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Capability a Rust type opts into to be parsed from the command line.
///
/// # Examples
///
/// ```
/// use cfgschema_core::*;
///
/// #[derive(Debug, PartialEq)]
/// struct Config {
///     natural: i64,
/// }
///
/// impl ConfigSchema for Config {
///     fn schema() -> SchemaType {
///         SchemaType::new("Config")
///             .with_field(FieldDeclaration::arg("natural", ScalarType::Integer, "A natural number"))
///     }
///
///     fn from_record(mut record: Record) -> Result<Self, SchemaError> {
///         Ok(Self { natural: record.take("natural")? })
///     }
///
///     fn validators() -> Vec<Validator<Self>> {
///         vec![Validator::new("natural", |c: &Config| {
///             if c.natural < 0 {
///                 return Err(ValidationFailure::new("natural numbers must be >= 0"));
///             }
///             Ok(())
///         })]
///     }
/// }
///
/// let compiled = compile_schema::<Config>().unwrap();
/// let mut values = ParsedValues::default();
/// values.insert("natural", Value::Int(-1));
/// let config: Config = construct_typed(&compiled, &values).unwrap();
/// assert!(validate(&config).is_err());
/// ```
pub trait ConfigSchema: Sized + 'static {
    /// Describes the fields of this type.
    fn schema() -> SchemaType;

    /// Builds an instance from a constructed record.
    fn from_record(record: Record) -> Result<Self, SchemaError>;

    /// Validators run on every instance after construction.
    fn validators() -> Vec<Validator<Self>> {
        Vec::new()
    }

    /// Nested objects the validation pass should descend into. Every
    /// untransformed group field belongs here; the validation pass logs a
    /// warning for declared groups that are missing.
    fn nested(&self) -> Vec<&dyn Validate> {
        Vec::new()
    }
}

static SCHEMA_CACHE: OnceLock<Mutex<HashMap<TypeId, Arc<SchemaType>>>> = OnceLock::new();

/// Returns the schema of `T`, building it on first use.
pub fn schema_of<T: ConfigSchema>() -> Arc<SchemaType> {
    let cache = SCHEMA_CACHE.get_or_init(Default::default);
    let id = TypeId::of::<T>();
    if let Some(schema) = cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
    {
        return schema.clone();
    }

    // Built without holding the lock: nested groups call back into here.
    let schema = Arc::new(T::schema());
    cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(id)
        .or_insert(schema)
        .clone()
}
