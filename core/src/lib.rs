//! Schema compiler for declarative, nested configuration records.
//!
//! A configuration record is described once as a [`SchemaType`] (usually
//! through the [`ConfigSchema`] trait) and compiled into a tree of
//! engine-agnostic argument descriptors:
//!
//! - [`classify`] decides the argument kind of each field from its
//!   [`ValueShape`]: list, optional, toggle or standard.
//! - [`compile`] builds the [`CompiledGroup`] tree, one group per schema
//!   level, and rejects schema defects before any argv is read.
//! - [`register`] declares the tree to an [`ArgumentEngine`]; the engine
//!   parses argv and reports a flat [`ParsedValues`] map.
//! - [`construct`] turns the parsed values back into a nested [`Record`],
//!   applying field and group transforms.
//! - [`validate`] walks the constructed objects and runs their validators.
//!
//! Defects in the schema are [`SchemaError`]s; anything the end user can
//! fix on the command line is a [`UsageError`].
//!
//! # Example
//!
//! ```
//! use cfgschema_core::*;
//!
//! let schema = SchemaType::new("Config")
//!     .with_field(FieldDeclaration::arg("natural", ScalarType::Integer, "A natural number"))
//!     .with_field(FieldDeclaration::list("files", ScalarType::Path, "Inputs").positional());
//!
//! let tree = compile(&schema).unwrap();
//! let plan = RegistrationPlan::of(&tree).unwrap();
//! assert_eq!(plan.arguments().count(), 2);
//!
//! let mut values = ParsedValues::new();
//! values.insert("natural", Value::Int(5));
//! values.insert("files", Value::from(vec![std::path::PathBuf::from("a.txt")]));
//!
//! let mut record = construct(&tree, &values).unwrap();
//! assert_eq!(record.take::<i64>("natural").unwrap(), 5);
//! ```

mod classify;
mod compile;
mod construct;
mod descriptor;
mod engine;
mod error;
mod schema;
mod validate;
mod value;

pub use classify::{ArgumentKind, Classification, Multiplicity, TogglePolarity, classify};
pub use compile::{ChildGroup, CompiledGroup, compile, compile_schema};
pub use construct::{construct, construct_typed};
pub use descriptor::ArgumentDescriptor;
pub use engine::{ArgumentEngine, GroupDeclaration, ParsedValues, PlanStep, RegistrationPlan, register};
pub use error::{Error, Result, SchemaError, UsageError, UsageKind, ValidationFailure};
pub use schema::{
    ConfigSchema, DefaultValue, FieldDeclaration, FieldTransform, ListArity, SchemaType, Transform,
    TransformError, schema_of,
};
pub use validate::{Validate, Validator, validate};
pub use value::{FromValue, Record, ScalarType, Value, ValueShape};
