//! Top-level parse entry points.
//!
//! Each call compiles the schema afresh, registers it with a new
//! [`ClapEngine`], lets clap parse argv, then constructs and validates the
//! result. `argv` never includes the program name.

use std::collections::HashSet;
use std::ffi::OsString;
use std::sync::Arc;

use cfgschema_core::{
    ArgumentEngine, CompiledGroup, ConfigSchema, Error, Record, Result, SchemaError, SchemaType, UsageError,
    UsageKind, ValidationFailure, compile, compile_schema, construct, register, schema_of,
    validate,
};
use clap::Command;
use clap::error::ErrorKind;
use tracing::debug;

use crate::engine::{ClapEngine, collect, usage_error};
use crate::settings::ParserSettings;

type Build<S> = Box<dyn Fn(Record) -> Result<S> + Send + Sync>;

struct Submode<S> {
    name: String,
    about: Option<String>,
    schema: Arc<SchemaType>,
    build: Build<S>,
}

/// Ordered set of submodes sharing one output type.
///
/// # Examples
///
/// ```
/// use cfgschema_clap::Submodes;
/// use cfgschema_core::*;
///
/// struct Fetch { url: String }
///
/// impl ConfigSchema for Fetch {
///     fn schema() -> SchemaType {
///         SchemaType::new("Fetch")
///             .with_about("Download a file")
///             .with_field(FieldDeclaration::arg("url", ScalarType::String, "Source URL"))
///     }
///
///     fn from_record(mut record: Record) -> Result<Self, SchemaError> {
///         Ok(Self { url: record.take("url")? })
///     }
/// }
///
/// enum Mode { Fetch(Fetch) }
///
/// let submodes = Submodes::new().with("fetch", Mode::Fetch);
/// assert_eq!(submodes.names().collect::<Vec<_>>(), vec!["fetch"]);
/// ```
pub struct Submodes<S> {
    entries: Vec<Submode<S>>,
}

impl<S> Default for Submodes<S> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<S: 'static> Submodes<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a submode selected by `name`, built as `M` and wrapped into `S`.
    /// The schema's about text becomes the submode's help.
    pub fn with<M, F>(mut self, name: impl Into<String>, wrap: F) -> Self
    where
        M: ConfigSchema,
        F: Fn(M) -> S + Send + Sync + 'static,
    {
        let schema = schema_of::<M>();
        self.entries.push(Submode {
            name: name.into(),
            about: schema.about.clone(),
            schema,
            build: Box::new(move |record: Record| -> Result<S> {
                let submode = M::from_record(record)?;
                validate(&submode).map_err(validation_error)?;
                Ok(wrap(submode))
            }),
        });
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parses `argv` into `T`.
///
/// # Examples
///
/// ```
/// use cfgschema_clap::{ParserSettings, parse_args};
/// use cfgschema_core::*;
///
/// #[derive(Debug, PartialEq)]
/// struct Config { natural: i64, debug: bool }
///
/// impl ConfigSchema for Config {
///     fn schema() -> SchemaType {
///         SchemaType::new("Config")
///             .with_field(FieldDeclaration::arg("natural", ScalarType::Integer, "A natural number"))
///             .with_field(FieldDeclaration::flag("debug", "Enable debug logging"))
///     }
///
///     fn from_record(mut record: Record) -> Result<Self, SchemaError> {
///         Ok(Self { natural: record.take("natural")?, debug: record.take("debug")? })
///     }
/// }
///
/// let config: Config = parse_args(["--natural", "5"], &ParserSettings::default()).unwrap();
/// assert_eq!(config, Config { natural: 5, debug: false });
///
/// let err = parse_args::<Config, _, _>(["--debug"], &ParserSettings::default()).unwrap_err();
/// assert_eq!(err.as_usage().unwrap().exit_code(), 2);
/// ```
pub fn parse_args<T, I, A>(argv: I, settings: &ParserSettings) -> Result<T>
where
    T: ConfigSchema,
    I: IntoIterator<Item = A>,
    A: Into<OsString> + Clone,
{
    let tree = compile_schema::<T>()?;
    let mut parsed = parse_trees(&tree, &[], argv, settings)?;
    let config = T::from_record(parsed.top)?;
    validate(&config).map_err(|failure| render(&mut parsed.command, validation_error(failure)))?;
    Ok(config)
}

/// Parses `argv` into `T` plus exactly one selected submode.
pub fn parse_args_with_submodes<T, S, I, A>(
    argv: I,
    submodes: &Submodes<S>,
    settings: &ParserSettings,
) -> Result<(T, S)>
where
    T: ConfigSchema,
    I: IntoIterator<Item = A>,
    A: Into<OsString> + Clone,
{
    let tree = compile_schema::<T>()?;
    let compiled = compile_submodes(
        submodes
            .entries
            .iter()
            .map(|entry| (entry.name.as_str(), entry.about.as_deref(), entry.schema.as_ref())),
    )?;
    let mut parsed = parse_trees(&tree, &compiled, argv, settings)?;
    let (name, record) = selected(&mut parsed)?;

    let top = T::from_record(parsed.top)?;
    validate(&top).map_err(|failure| render(&mut parsed.command, validation_error(failure)))?;

    let entry = submodes
        .entries
        .iter()
        .find(|entry| entry.name == name)
        .ok_or_else(|| SchemaError::Engine(format!("unknown submode '{name}'")))?;
    let submode = (entry.build)(record).map_err(|err| render(&mut parsed.command, err))?;
    Ok((top, submode))
}

/// Parses `argv` against a schema without a Rust type.
pub fn parse_dynamic<I, A>(schema: &SchemaType, argv: I, settings: &ParserSettings) -> Result<Record>
where
    I: IntoIterator<Item = A>,
    A: Into<OsString> + Clone,
{
    let tree = compile(schema)?;
    Ok(parse_trees(&tree, &[], argv, settings)?.top)
}

/// Parses `argv` against a schema and its submodes, returning the top-level
/// record, the selected submode's name and its record.
pub fn parse_dynamic_with_submodes<I, A>(
    schema: &SchemaType,
    submodes: &[(String, SchemaType)],
    argv: I,
    settings: &ParserSettings,
) -> Result<(Record, String, Record)>
where
    I: IntoIterator<Item = A>,
    A: Into<OsString> + Clone,
{
    let tree = compile(schema)?;
    let compiled = compile_submodes(
        submodes
            .iter()
            .map(|(name, schema)| (name.as_str(), schema.about.as_deref(), schema)),
    )?;
    let mut parsed = parse_trees(&tree, &compiled, argv, settings)?;
    let (name, record) = selected(&mut parsed)?;
    Ok((parsed.top, name, record))
}

struct CompiledSubmode {
    name: String,
    about: Option<String>,
    tree: CompiledGroup,
}

struct Parsed {
    command: Command,
    top: Record,
    submode: Option<(String, Record)>,
}

fn compile_submodes<'a>(
    entries: impl Iterator<Item = (&'a str, Option<&'a str>, &'a SchemaType)>,
) -> Result<Vec<CompiledSubmode>, SchemaError> {
    let mut seen = HashSet::new();
    let mut compiled = Vec::new();
    for (name, about, schema) in entries {
        if !seen.insert(name) {
            return Err(SchemaError::DuplicateSubmode(name.to_string()));
        }
        compiled.push(CompiledSubmode {
            name: name.to_string(),
            about: about.map(str::to_string),
            tree: compile(schema)?,
        });
    }
    if compiled.is_empty() {
        return Err(SchemaError::EmptySubmodes);
    }
    Ok(compiled)
}

fn parse_trees<I, A>(
    tree: &CompiledGroup,
    submodes: &[CompiledSubmode],
    argv: I,
    settings: &ParserSettings,
) -> Result<Parsed>
where
    I: IntoIterator<Item = A>,
    A: Into<OsString> + Clone,
{
    let mut engine = ClapEngine::new(settings);
    register(tree, &mut engine)?;
    for submode in submodes {
        engine.declare_submode(&submode.name, submode.about.as_deref(), &submode.tree)?;
    }
    if !submodes.is_empty() {
        engine = engine.require_submode();
    }
    let mut command = engine.finish();

    let matches = command
        .try_get_matches_from_mut(argv)
        .map_err(|err| usage_error(&err))?;
    let values = collect(tree, &matches)?;
    debug!(schema = %tree.schema, values = values.len(), "Parsed arguments");
    let top = construct(tree, &values).map_err(|err| render(&mut command, err))?;

    let submode = match matches.subcommand() {
        Some((name, sub_matches)) => {
            let sub = submodes
                .iter()
                .find(|s| s.name == name)
                .ok_or_else(|| SchemaError::Engine(format!("unknown submode '{name}'")))?;
            let values = collect(&sub.tree, sub_matches)?;
            let record = construct(&sub.tree, &values).map_err(|err| render(&mut command, err))?;
            Some((name.to_string(), record))
        }
        None => None,
    };

    Ok(Parsed {
        command,
        top,
        submode,
    })
}

fn selected(parsed: &mut Parsed) -> Result<(String, Record)> {
    match parsed.submode.take() {
        Some(selected) => Ok(selected),
        None => Err(render(
            &mut parsed.command,
            UsageError::new(UsageKind::MissingSubmode, "no submode selected").into(),
        )),
    }
}

fn validation_error(failure: ValidationFailure) -> Error {
    UsageError::new(UsageKind::Validation, failure.0).into()
}

/// Re-renders our own usage errors the way clap renders its own, with the
/// usage line and help hint.
fn render(command: &mut Command, err: Error) -> Error {
    match err {
        Error::Usage(usage) => {
            let kind = match usage.kind {
                UsageKind::Help | UsageKind::Version => return Error::Usage(usage),
                UsageKind::MissingSubmode => ErrorKind::MissingSubcommand,
                UsageKind::InvalidInput => ErrorKind::MissingRequiredArgument,
                UsageKind::Validation | UsageKind::Transform => ErrorKind::ValueValidation,
            };
            let message = command.error(kind, &usage.message).to_string();
            Error::Usage(UsageError::new(usage.kind, message))
        }
        other => other,
    }
}
