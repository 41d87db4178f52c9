//! Validation pass over constructed objects.
//!
//! Runs after construction and follows the objects themselves rather than
//! the compiled tree, so anything a group transform substituted in is still
//! reached as long as its owner lists it in [`ConfigSchema::nested`].
//!
//! # Examples
//!
//! ```
//! use cfgschema_core::*;
//!
//! struct Range {
//!     low: i64,
//!     high: i64,
//! }
//!
//! impl ConfigSchema for Range {
//!     fn schema() -> SchemaType {
//!         SchemaType::new("Range")
//!             .with_field(FieldDeclaration::arg("low", ScalarType::Integer, "Lower bound"))
//!             .with_field(FieldDeclaration::arg("high", ScalarType::Integer, "Upper bound"))
//!     }
//!
//!     fn from_record(mut record: Record) -> Result<Self, SchemaError> {
//!         Ok(Self { low: record.take("low")?, high: record.take("high")? })
//!     }
//!
//!     fn validators() -> Vec<Validator<Self>> {
//!         vec![Validator::new("ordered", |r: &Range| {
//!             if r.low > r.high {
//!                 return Err(ValidationFailure::new("low must not exceed high"));
//!             }
//!             Ok(())
//!         })]
//!     }
//! }
//!
//! assert!(validate(&Range { low: 1, high: 2 }).is_ok());
//! assert_eq!(
//!     validate(&Range { low: 3, high: 2 }).unwrap_err().to_string(),
//!     "low must not exceed high"
//! );
//! ```

use std::fmt;

use tracing::{debug, info, warn};

use crate::error::ValidationFailure;
use crate::schema::{ConfigSchema, schema_of};
use crate::value::ValueShape;

type Check<T> = fn(&T) -> Result<(), ValidationFailure>;

/// A named validation check on instances of `T`.
pub struct Validator<T> {
    pub name: &'static str,
    check: Check<T>,
}

impl<T> Validator<T> {
    pub fn new(name: &'static str, check: Check<T>) -> Self {
        Self { name, check }
    }

    pub fn run(&self, target: &T) -> Result<(), ValidationFailure> {
        (self.check)(target)
    }
}

impl<T> Clone for Validator<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            check: self.check,
        }
    }
}

impl<T> fmt::Debug for Validator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator").field("name", &self.name).finish()
    }
}

/// Object-safe view of a constructed schema instance.
pub trait Validate {
    /// Name used in log events.
    fn type_name(&self) -> &'static str;

    /// Runs this object's own validators in declaration order.
    fn run_validators(&self) -> Result<(), ValidationFailure>;

    /// Nested objects to visit after this one.
    fn children(&self) -> Vec<&dyn Validate>;

    /// Number of untransformed nested group fields the schema declares.
    fn declared_groups(&self) -> usize;
}

impl<T: ConfigSchema> Validate for T {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn run_validators(&self) -> Result<(), ValidationFailure> {
        for validator in T::validators() {
            validator.run(self).inspect_err(|err| {
                info!(
                    target_type = std::any::type_name::<T>(),
                    validator = validator.name,
                    error = %err,
                    "Validation failed"
                );
            })?;
        }
        Ok(())
    }

    fn children(&self) -> Vec<&dyn Validate> {
        self.nested()
    }

    fn declared_groups(&self) -> usize {
        schema_of::<T>()
            .fields
            .iter()
            .filter(|field| {
                field.transform.is_none() && matches!(field.shape, ValueShape::Group(_))
            })
            .count()
    }
}

/// Declared nested groups that `target` does not list in
/// [`ConfigSchema::nested`]; their validators would never run.
pub(crate) fn unlisted_groups(target: &dyn Validate) -> usize {
    target
        .declared_groups()
        .saturating_sub(target.children().len())
}

/// Validates `root` and then every nested object depth-first, returning the
/// first failure.
pub fn validate(root: &dyn Validate) -> Result<(), ValidationFailure> {
    debug!(root = root.type_name(), "Validating");
    let unlisted = unlisted_groups(root);
    if unlisted > 0 {
        warn!(
            target_type = root.type_name(),
            unlisted, "Nested groups missing from ConfigSchema::nested are not validated"
        );
    }
    root.run_validators()?;
    for child in root.children() {
        validate(child)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use crate::schema::{FieldDeclaration, SchemaType};
    use crate::value::Record;

    struct Leaf {
        value: i64,
    }

    impl ConfigSchema for Leaf {
        fn schema() -> SchemaType {
            SchemaType::new("Leaf")
        }

        fn from_record(_record: Record) -> Result<Self, SchemaError> {
            Ok(Self { value: 0 })
        }

        fn validators() -> Vec<Validator<Self>> {
            vec![Validator::new("positive", |leaf: &Leaf| {
                if leaf.value > 0 {
                    Ok(())
                } else {
                    Err(ValidationFailure::new(format!(
                        "leaf value must be positive, got {}",
                        leaf.value
                    )))
                }
            })]
        }
    }

    struct Root {
        enabled: bool,
        left: Leaf,
        right: Option<Leaf>,
    }

    impl ConfigSchema for Root {
        fn schema() -> SchemaType {
            SchemaType::new("Root")
        }

        fn from_record(_record: Record) -> Result<Self, SchemaError> {
            Err(SchemaError::Engine("not constructed in tests".into()))
        }

        fn validators() -> Vec<Validator<Self>> {
            vec![Validator::new("enabled", |root: &Root| {
                if root.enabled {
                    Ok(())
                } else {
                    Err(ValidationFailure::new("root must be enabled"))
                }
            })]
        }

        fn nested(&self) -> Vec<&dyn Validate> {
            let mut out: Vec<&dyn Validate> = vec![&self.left];
            if let Some(right) = &self.right {
                out.push(right);
            }
            out
        }
    }

    #[test]
    fn test_passes_when_every_object_is_valid() {
        let root = Root {
            enabled: true,
            left: Leaf { value: 1 },
            right: Some(Leaf { value: 2 }),
        };
        assert_eq!(validate(&root), Ok(()));
    }

    #[test]
    fn test_failure_deep_in_the_graph_surfaces() {
        let root = Root {
            enabled: true,
            left: Leaf { value: 1 },
            right: Some(Leaf { value: -4 }),
        };
        assert_eq!(
            validate(&root),
            Err(ValidationFailure::new("leaf value must be positive, got -4"))
        );
    }

    #[test]
    fn test_root_validators_run_before_children() {
        let root = Root {
            enabled: false,
            left: Leaf { value: 0 },
            right: None,
        };
        assert_eq!(
            validate(&root),
            Err(ValidationFailure::new("root must be enabled"))
        );
    }

    struct Pair<const REVERSED: bool> {
        x: i64,
        y: i64,
    }

    impl<const REVERSED: bool> ConfigSchema for Pair<REVERSED> {
        fn schema() -> SchemaType {
            SchemaType::new("Pair")
        }

        fn from_record(_record: Record) -> Result<Self, SchemaError> {
            Err(SchemaError::Engine("not constructed in tests".into()))
        }

        fn validators() -> Vec<Validator<Self>> {
            let mut validators = vec![
                Validator::new("x", |p: &Self| {
                    if p.x >= 0 {
                        Ok(())
                    } else {
                        Err(ValidationFailure::new("x must be >= 0"))
                    }
                }),
                Validator::new("y", |p: &Self| {
                    if p.y >= 0 {
                        Ok(())
                    } else {
                        Err(ValidationFailure::new("y must be >= 0"))
                    }
                }),
            ];
            if REVERSED {
                validators.reverse();
            }
            validators
        }
    }

    #[test]
    fn test_validator_order_does_not_change_outcome() {
        for (x, y) in [(1, 1), (-1, 1), (1, -1), (-1, -1)] {
            let forward = validate(&Pair::<false> { x, y });
            let reversed = validate(&Pair::<true> { x, y });
            assert_eq!(forward.is_ok(), reversed.is_ok(), "x={x} y={y}");
        }
        assert_eq!(
            validate(&Pair::<false> { x: -1, y: -1 }),
            Err(ValidationFailure::new("x must be >= 0"))
        );
        assert_eq!(
            validate(&Pair::<true> { x: -1, y: -1 }),
            Err(ValidationFailure::new("y must be >= 0"))
        );
    }

    struct Holder {
        leaf: Leaf,
    }

    impl ConfigSchema for Holder {
        fn schema() -> SchemaType {
            SchemaType::new("Holder").with_field(FieldDeclaration::group::<Leaf>("leaf"))
        }

        fn from_record(_record: Record) -> Result<Self, SchemaError> {
            Ok(Self {
                leaf: Leaf { value: 1 },
            })
        }

        fn nested(&self) -> Vec<&dyn Validate> {
            vec![&self.leaf]
        }
    }

    struct Forgetful {
        leaf: Leaf,
    }

    impl ConfigSchema for Forgetful {
        fn schema() -> SchemaType {
            SchemaType::new("Forgetful").with_field(FieldDeclaration::group::<Leaf>("leaf"))
        }

        fn from_record(_record: Record) -> Result<Self, SchemaError> {
            Ok(Self {
                leaf: Leaf { value: 1 },
            })
        }
    }

    #[test]
    fn test_unlisted_nested_groups_are_detected() {
        let holder = Holder {
            leaf: Leaf { value: -1 },
        };
        assert_eq!(unlisted_groups(&holder), 0);
        assert!(validate(&holder).is_err());

        let forgetful = Forgetful {
            leaf: Leaf { value: -1 },
        };
        assert_eq!(unlisted_groups(&forgetful), 1);
        assert_eq!(forgetful.leaf.value, -1);
        assert!(validate(&forgetful).is_ok());
    }

    #[test]
    fn test_validator_debug_shows_name() {
        let validator = Leaf::validators().remove(0);
        assert_eq!(format!("{validator:?}"), "Validator { name: \"positive\" }");
    }
}
