//! Error types.
//!
//! Two disjoint classes: [`SchemaError`] for defects in the tool author's
//! schema, detected before any argv is read, and [`UsageError`] for
//! conditions the end user can fix by changing the command line.

use thiserror::Error;

/// Build-time defects in a schema declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The field's declared shape cannot be expressed as an argument.
    #[error("field '{field}': unsupported type shape {shape}")]
    UnsupportedShape { field: String, shape: String },
    /// A positional field also declared alternate flag names.
    #[error("field '{field}': a positional argument cannot have alternate names")]
    PositionalWithAltNames { field: String },
    /// A boolean toggle was declared positional.
    #[error("field '{field}': a boolean toggle cannot be positional")]
    PositionalToggle { field: String },
    /// A multiplicity override on a field that is not a list.
    #[error("field '{field}': multiplicity overrides are only valid for list fields")]
    MultiplicityOnNonList { field: String },
    /// A list narrowed to zero-or-more without a default to fall back on.
    #[error("field '{field}': zero-or-more multiplicity requires a default")]
    ZeroOrMoreWithoutDefault { field: String },
    /// The declared default is not a value of the field's converter type.
    #[error("field '{field}': default {value} is not a valid {expected}")]
    DefaultMismatch {
        field: String,
        value: String,
        expected: String,
    },
    /// A declared choice is not a value of the field's converter type.
    #[error("field '{field}': choice {value} is not a valid {expected}")]
    ChoiceMismatch {
        field: String,
        value: String,
        expected: String,
    },
    /// An alternate name that is neither `-x` nor `--long`.
    #[error("field '{field}': invalid flag name '{name}'")]
    InvalidFlagName { field: String, name: String },
    /// An argument-level option declared on a nested group field.
    #[error("field '{field}': a nested group field cannot take {option}")]
    GroupFieldOption { field: String, option: &'static str },
    /// The exclusive marker on a field that is not a nested group.
    #[error("field '{field}': only nested group fields can be marked exclusive")]
    ExclusiveOnNonGroup { field: String },
    /// Two fields of the same schema share a name.
    #[error("schema '{schema}': duplicate field '{field}'")]
    DuplicateField { schema: String, field: String },
    /// Two arguments anywhere in the compiled tree share a flag spelling.
    #[error("duplicate argument '{identity}' declared by '{first}' and '{second}'")]
    DuplicateIdentity {
        identity: String,
        first: String,
        second: String,
    },
    /// A flag spelling the parsing engine reserves for itself.
    #[error("field '{field}': argument '{identity}' is reserved")]
    ReservedIdentity { field: String, identity: String },
    /// A positional declared after a list positional, which would never
    /// receive a token.
    #[error("positional '{field}' follows list positional '{list}'")]
    PositionalAfterList { field: String, list: String },
    /// A required positional declared after an optional one.
    #[error("required positional '{field}' follows optional positional '{optional}'")]
    RequiredPositionalAfterOptional { field: String, optional: String },
    /// Submode parsing requested with no submodes.
    #[error("cannot parse with submodes when no submodes are declared")]
    EmptySubmodes,
    /// Two submodes share a name.
    #[error("duplicate submode '{0}'")]
    DuplicateSubmode(String),
    /// A schema type's typed extraction disagrees with its declaration.
    #[error("schema '{schema}' field '{field}': {message}")]
    Extract {
        schema: String,
        field: String,
        message: String,
    },
    /// The parsing engine returned values the compiled tree did not declare.
    #[error("engine error: {0}")]
    Engine(String),
}

/// Category of a [`UsageError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageKind {
    /// Help was requested; the message is the help text.
    Help,
    /// Version was requested; the message is the version text.
    Version,
    /// The engine rejected the argument vector.
    InvalidInput,
    /// A validator rejected the constructed object.
    Validation,
    /// No submode token was supplied.
    MissingSubmode,
    /// A field transform rejected its input.
    Transform,
}

/// A failure the end user can fix by changing the command line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UsageError {
    pub kind: UsageKind,
    pub message: String,
}

impl UsageError {
    pub fn new(kind: UsageKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Exit status following the argument-parser convention: 0 for
    /// help/version output, 2 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self.kind {
            UsageKind::Help | UsageKind::Version => 0,
            _ => 2,
        }
    }

    /// Prints the message (stdout for help/version, stderr otherwise) and
    /// terminates the process with [`exit_code`](Self::exit_code).
    pub fn exit(&self) -> ! {
        let message = self.message.trim_end();
        match self.kind {
            UsageKind::Help | UsageKind::Version => println!("{message}"),
            _ => eprintln!("{message}"),
        }
        std::process::exit(self.exit_code())
    }
}

/// Semantic failure signalled by a validator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationFailure(pub String);

impl ValidationFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Either class of failure from a full parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Usage(#[from] UsageError),
}

impl Error {
    /// Returns the usage error, if this is one.
    pub fn as_usage(&self) -> Option<&UsageError> {
        match self {
            Self::Usage(err) => Some(err),
            Self::Schema(_) => None,
        }
    }
}

/// Convenience alias for results with [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;
