//! Engine-agnostic description of one command-line argument.

use serde::Serialize;

use crate::classify::{ArgumentKind, Multiplicity, TogglePolarity, classify};
use crate::error::SchemaError;
use crate::schema::{FieldDeclaration, Transform};
use crate::value::{ScalarType, Value};

/// Normalized form of one non-nested field.
///
/// Addressed either as a positional slot or by its flag spellings: the
/// explicit `alt_names` if any, otherwise `--name` with underscores turned
/// into hyphens. `required` is always derived by the classifier.
#[derive(Debug, Clone, Serialize)]
pub struct ArgumentDescriptor {
    /// Field name.
    pub name: String,
    /// Dotted field path; unique per compiled tree and the key under which
    /// the engine reports the parsed value.
    pub dest: String,
    pub kind: ArgumentKind,
    pub positional: bool,
    pub alt_names: Vec<String>,
    pub converter: Option<ScalarType>,
    pub multiplicity: Multiplicity,
    pub toggle: Option<TogglePolarity>,
    pub required: bool,
    pub choices: Option<Vec<Value>>,
    /// Pre-transform default; `None` when no default is declared.
    pub default: Option<Value>,
    pub metavar: Option<String>,
    pub help: String,
    #[serde(skip)]
    pub transform: Transform,
}

impl ArgumentDescriptor {
    /// Builds the descriptor for `field`, addressed by `dest`.
    ///
    /// # Examples
    ///
    /// ```
    /// use cfgschema_core::*;
    ///
    /// let field = FieldDeclaration::arg("str_field", ScalarType::String, "A string");
    /// let desc = ArgumentDescriptor::from_field("group.str_field".into(), &field).unwrap();
    /// assert_eq!(desc.flag_names(), vec!["--str-field"]);
    /// assert_eq!(desc.value_name(), "STR_FIELD");
    /// assert!(desc.required);
    /// ```
    pub fn from_field(dest: String, field: &FieldDeclaration) -> Result<Self, SchemaError> {
        let class = classify(&dest, field)?;
        Ok(Self {
            name: field.name.clone(),
            dest,
            kind: class.kind,
            positional: field.positional,
            alt_names: field.names.clone(),
            converter: class.converter,
            multiplicity: class.multiplicity,
            toggle: class.toggle,
            required: class.required,
            choices: field.choices.clone(),
            default: class.default,
            metavar: field.metavar.clone(),
            help: field.help.clone(),
            transform: field
                .transform
                .as_ref()
                .map(|t| t.func.clone())
                .unwrap_or_default(),
        })
    }

    /// Flag spellings; empty for positionals.
    pub fn flag_names(&self) -> Vec<String> {
        if self.positional {
            Vec::new()
        } else if self.alt_names.is_empty() {
            vec![format!("--{}", self.name.replace('_', "-"))]
        } else {
            self.alt_names.clone()
        }
    }

    /// Name shown for the argument's value(s).
    pub fn value_name(&self) -> String {
        self.metavar
            .clone()
            .unwrap_or_else(|| self.name.to_uppercase())
    }

    /// How the argument is referred to in messages.
    pub fn display_name(&self) -> String {
        match self.flag_names().into_iter().last() {
            Some(flag) => flag,
            None => format!("<{}>", self.value_name()),
        }
    }
}
