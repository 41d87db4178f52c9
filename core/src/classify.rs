//! Type classifier.
//!
//! Decides which argument kind a field becomes from its CLI-facing shape,
//! and with it the converter, multiplicity, toggle polarity and
//! required-ness. Rules apply in order, first match wins:
//!
//! 1. list ⇒ [`ArgumentKind::List`], one-or-more unless narrowed;
//! 2. optional ⇒ [`ArgumentKind::Optional`], never required;
//! 3. boolean ⇒ [`ArgumentKind::Toggle`], polarity from the default;
//! 4. anything else ⇒ [`ArgumentKind::Standard`], required without default.

use serde::Serialize;

use crate::error::SchemaError;
use crate::schema::{FieldDeclaration, ListArity};
use crate::value::{ScalarType, Value, ValueShape};

/// Argument kind of a non-nested field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentKind {
    Standard,
    List,
    Optional,
    Toggle,
}

/// Number of tokens an argument consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Multiplicity {
    Single,
    OneOrMore,
    ZeroOrMore,
}

/// What presence of a toggle flag does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TogglePolarity {
    /// Flag absent ⇒ false, present ⇒ true.
    BecomesTrue,
    /// Flag absent ⇒ true, present ⇒ false.
    BecomesFalse,
}

/// Result of classifying one field.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub kind: ArgumentKind,
    pub converter: Option<ScalarType>,
    pub multiplicity: Multiplicity,
    pub toggle: Option<TogglePolarity>,
    pub required: bool,
    /// `None` when no default is declared.
    pub default: Option<Value>,
}

/// Classifies a field. `path` names the field in error messages.
///
/// # Examples
///
/// ```
/// use cfgschema_core::*;
///
/// let field = FieldDeclaration::flag("negative", "Starts on").default(true);
/// let class = classify("negative", &field).unwrap();
/// assert_eq!(class.kind, ArgumentKind::Toggle);
/// assert_eq!(class.toggle, Some(TogglePolarity::BecomesFalse));
/// assert!(!class.required);
/// ```
pub fn classify(path: &str, field: &FieldDeclaration) -> Result<Classification, SchemaError> {
    let shape = field.cli_shape();

    if field.positional && !field.names.is_empty() {
        return Err(SchemaError::PositionalWithAltNames {
            field: path.to_string(),
        });
    }
    if field.arity.is_some() && !matches!(shape, ValueShape::List(_)) {
        return Err(SchemaError::MultiplicityOnNonList {
            field: path.to_string(),
        });
    }
    for name in &field.names {
        if !is_valid_flag_name(name) {
            return Err(SchemaError::InvalidFlagName {
                field: path.to_string(),
                name: name.clone(),
            });
        }
    }

    let default = field.default.resolve();
    let class = match shape {
        ValueShape::List(ty) => {
            let multiplicity = match field.arity {
                None | Some(ListArity::OneOrMore) => Multiplicity::OneOrMore,
                Some(ListArity::ZeroOrMore) if default.is_some() => Multiplicity::ZeroOrMore,
                Some(ListArity::ZeroOrMore) => {
                    return Err(SchemaError::ZeroOrMoreWithoutDefault {
                        field: path.to_string(),
                    });
                }
            };
            if let Some(value) = &default {
                check_list_default(path, *ty, value)?;
            }
            Classification {
                kind: ArgumentKind::List,
                converter: Some(*ty),
                multiplicity,
                toggle: None,
                required: default.is_none(),
                default,
            }
        }
        ValueShape::Optional(ty) => {
            let default = default.unwrap_or(Value::None);
            if default != Value::None {
                check_default(path, *ty, &default)?;
            }
            Classification {
                kind: ArgumentKind::Optional,
                converter: Some(*ty),
                multiplicity: Multiplicity::Single,
                toggle: None,
                required: false,
                default: Some(default),
            }
        }
        ValueShape::Toggle => {
            if field.positional {
                return Err(SchemaError::PositionalToggle {
                    field: path.to_string(),
                });
            }
            let toggle = match default {
                None | Some(Value::Bool(false)) => TogglePolarity::BecomesTrue,
                Some(Value::Bool(true)) => TogglePolarity::BecomesFalse,
                Some(other) => {
                    return Err(SchemaError::DefaultMismatch {
                        field: path.to_string(),
                        value: other.to_string(),
                        expected: "bool".to_string(),
                    });
                }
            };
            if let Some(choice) = field.choices.as_ref().and_then(|c| c.first()) {
                return Err(SchemaError::ChoiceMismatch {
                    field: path.to_string(),
                    value: choice.to_string(),
                    expected: "toggle (takes no value)".to_string(),
                });
            }
            Classification {
                kind: ArgumentKind::Toggle,
                converter: None,
                multiplicity: Multiplicity::Single,
                toggle: Some(toggle),
                required: false,
                default: Some(Value::Bool(toggle == TogglePolarity::BecomesFalse)),
            }
        }
        ValueShape::Scalar(ty) => {
            if let Some(value) = &default {
                check_default(path, *ty, value)?;
            }
            Classification {
                kind: ArgumentKind::Standard,
                converter: Some(*ty),
                multiplicity: Multiplicity::Single,
                toggle: None,
                required: default.is_none(),
                default,
            }
        }
        ValueShape::Group(_) | ValueShape::Union(_) => {
            return Err(SchemaError::UnsupportedShape {
                field: path.to_string(),
                shape: shape.to_string(),
            });
        }
    };

    if let (Some(ty), Some(choices)) = (class.converter, &field.choices) {
        if let Some(bad) = choices.iter().find(|c| !ty.accepts(c)) {
            return Err(SchemaError::ChoiceMismatch {
                field: path.to_string(),
                value: bad.to_string(),
                expected: ty.to_string(),
            });
        }
    }

    Ok(class)
}

/// `-x` or `--long-name`.
fn is_valid_flag_name(name: &str) -> bool {
    if let Some(long) = name.strip_prefix("--") {
        !long.is_empty() && !long.starts_with('-') && !long.contains(char::is_whitespace)
    } else if let Some(short) = name.strip_prefix('-') {
        let mut chars = short.chars();
        matches!((chars.next(), chars.next()), (Some(c), None) if c != '-' && !c.is_whitespace())
    } else {
        false
    }
}

fn check_default(path: &str, ty: ScalarType, value: &Value) -> Result<(), SchemaError> {
    if ty.accepts(value) {
        Ok(())
    } else {
        Err(SchemaError::DefaultMismatch {
            field: path.to_string(),
            value: value.to_string(),
            expected: ty.to_string(),
        })
    }
}

fn check_list_default(path: &str, ty: ScalarType, value: &Value) -> Result<(), SchemaError> {
    match value {
        Value::List(items) => items
            .iter()
            .try_for_each(|item| check_default(path, ty, item)),
        other => Err(SchemaError::DefaultMismatch {
            field: path.to_string(),
            value: other.to_string(),
            expected: format!("list[{ty}]"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Transform;

    #[test]
    fn test_list_is_required_without_default() {
        let field = FieldDeclaration::list("firstlist", ScalarType::String, "A list");
        let class = classify("firstlist", &field).unwrap();
        assert_eq!(class.kind, ArgumentKind::List);
        assert_eq!(class.multiplicity, Multiplicity::OneOrMore);
        assert!(class.required);
        assert_eq!(class.default, None);
    }

    #[test]
    fn test_list_zero_or_more_needs_default() {
        let field = FieldDeclaration::list("items", ScalarType::String, "Items")
            .arity(ListArity::ZeroOrMore);
        assert_eq!(
            classify("items", &field),
            Err(SchemaError::ZeroOrMoreWithoutDefault {
                field: "items".into()
            })
        );

        let field = field.default_with(|| Value::List(Vec::new()));
        let class = classify("items", &field).unwrap();
        assert_eq!(class.multiplicity, Multiplicity::ZeroOrMore);
        assert!(!class.required);
    }

    #[test]
    fn test_optional_is_never_required() {
        let field = FieldDeclaration::optional("optfield", ScalarType::String, "Optional");
        let class = classify("optfield", &field).unwrap();
        assert_eq!(class.kind, ArgumentKind::Optional);
        assert!(!class.required);
        assert_eq!(class.default, Some(Value::None));

        let field = field.default("fallback");
        let class = classify("optfield", &field).unwrap();
        assert!(!class.required);
        assert_eq!(class.default, Some(Value::from("fallback")));
    }

    #[test]
    fn test_toggle_polarity_follows_default() {
        let on = classify("boolfield", &FieldDeclaration::flag("boolfield", "On")).unwrap();
        assert_eq!(on.toggle, Some(TogglePolarity::BecomesTrue));
        assert_eq!(on.default, Some(Value::Bool(false)));
        assert_eq!(on.converter, None);

        let off = FieldDeclaration::flag("neg", "Off").default(true);
        let off = classify("neg", &off).unwrap();
        assert_eq!(off.toggle, Some(TogglePolarity::BecomesFalse));
        assert_eq!(off.default, Some(Value::Bool(true)));
    }

    #[test]
    fn test_standard_required_unless_default() {
        let field = FieldDeclaration::arg("strfield", ScalarType::String, "String");
        assert!(classify("strfield", &field).unwrap().required);
        let field = field.default("x");
        assert!(!classify("strfield", &field).unwrap().required);
    }

    #[test]
    fn test_transform_input_drives_classification() {
        let field = FieldDeclaration::arg("opt_a", ScalarType::String, "Option A").transform(
            ValueShape::List(ScalarType::String),
            Transform::identity(),
        );
        let class = classify("opt_a", &field).unwrap();
        assert_eq!(class.kind, ArgumentKind::List);
        assert_eq!(class.converter, Some(ScalarType::String));
    }

    #[test]
    fn test_rejects_illegal_combinations() {
        let field = FieldDeclaration::arg("pos", ScalarType::String, "Pos")
            .positional()
            .names(["-p"]);
        assert!(matches!(
            classify("pos", &field),
            Err(SchemaError::PositionalWithAltNames { .. })
        ));

        let field =
            FieldDeclaration::arg("n", ScalarType::Integer, "N").arity(ListArity::OneOrMore);
        assert!(matches!(
            classify("n", &field),
            Err(SchemaError::MultiplicityOnNonList { .. })
        ));

        let field = FieldDeclaration::flag("debug", "Debug").positional();
        assert!(matches!(
            classify("debug", &field),
            Err(SchemaError::PositionalToggle { .. })
        ));

        let field = FieldDeclaration::new(
            "either",
            ValueShape::Union(vec![
                ValueShape::Scalar(ScalarType::Integer),
                ValueShape::Scalar(ScalarType::String),
            ]),
            "Either",
        );
        assert_eq!(
            classify("either", &field),
            Err(SchemaError::UnsupportedShape {
                field: "either".into(),
                shape: "union[int, str]".into()
            })
        );
    }

    #[test]
    fn test_rejects_mismatched_defaults_and_choices() {
        let field = FieldDeclaration::arg("n", ScalarType::Integer, "N").default("ten");
        assert!(matches!(
            classify("n", &field),
            Err(SchemaError::DefaultMismatch { .. })
        ));

        let field = FieldDeclaration::arg("c", ScalarType::String, "C").choices([1, 2]);
        assert!(matches!(
            classify("c", &field),
            Err(SchemaError::ChoiceMismatch { .. })
        ));

        let field = FieldDeclaration::arg("c", ScalarType::String, "C").choices(["a", "b", "c"]);
        assert!(classify("c", &field).is_ok());
    }

    #[test]
    fn test_flag_name_format() {
        assert!(is_valid_flag_name("-c"));
        assert!(is_valid_flag_name("--custom-name"));
        assert!(!is_valid_flag_name("c"));
        assert!(!is_valid_flag_name("-cc"));
        assert!(!is_valid_flag_name("--"));
        assert!(!is_valid_flag_name("---x"));
    }
}
