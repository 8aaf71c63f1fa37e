//! # Structural Validation
//!
//! Recursive descent of a JSON value against the constraint model. Records
//! check their allow-list, sequences check each element in order, mappings
//! check each value, unions try each variant in order and keep the first
//! that produces no violations. Every violation found is collected; the
//! descent never stops at the first.
//!
//! The only error this module returns is [`RegistryError`], raised when a
//! `Ref` names a record the registry does not know. That is a bug in the
//! declarations, not a property of the document.

use bsm_core::FieldPath;
use serde_json::Value;

use crate::registry::{self, RegistryError};
use crate::shape::{RecordDef, Shape, ValueKind};
use crate::violation::{VariantAttempt, Violation, ViolationKind};

/// Check `value` against a named record.
pub fn check_record(
    def: &RecordDef,
    value: &Value,
    path: &FieldPath,
    out: &mut Vec<Violation>,
) -> Result<(), RegistryError> {
    let Some(object) = value.as_object() else {
        out.push(Violation::new(
            path.clone(),
            ViolationKind::type_mismatch(format!("{} object", def.name), value),
        ));
        return Ok(());
    };

    for field in def.fields {
        match object.get(field.name) {
            Some(v) => check_shape(&field.shape, v, &path.key(field.name), out)?,
            None if field.required => out.push(Violation::new(
                path.key(field.name),
                ViolationKind::MissingField {
                    expected: field.shape.describe(),
                },
            )),
            None => {}
        }
    }

    for key in object.keys() {
        if def.field(key).is_none() {
            out.push(Violation::new(
                path.key(key.as_str()),
                ViolationKind::UnknownField {
                    allowed: def.fields.iter().map(|f| f.name).collect(),
                },
            ));
        }
    }

    Ok(())
}

/// Check `value` against a shape.
pub fn check_shape(
    shape: &Shape,
    value: &Value,
    path: &FieldPath,
    out: &mut Vec<Violation>,
) -> Result<(), RegistryError> {
    let mismatch = |out: &mut Vec<Violation>| {
        out.push(Violation::new(
            path.clone(),
            ViolationKind::type_mismatch(shape.describe(), value),
        ));
    };

    match shape {
        Shape::String => {
            if !value.is_string() {
                mismatch(out);
            }
        }
        // Integers beyond the signed 64-bit range are rejected here rather
        // than failing the typed decode later.
        Shape::Integer => {
            if !value.is_i64() {
                mismatch(out);
            }
        }
        Shape::Number => {
            if !value.is_number() {
                mismatch(out);
            }
        }
        Shape::Boolean => {
            if !value.is_boolean() {
                mismatch(out);
            }
        }
        Shape::Null => {
            if !value.is_null() {
                mismatch(out);
            }
        }
        Shape::IntLiteral(expected) => {
            if value.as_i64() != Some(*expected) {
                mismatch(out);
            }
        }
        Shape::Enum { values, .. } => match value.as_str() {
            Some(s) if values.contains(&s) => {}
            _ => mismatch(out),
        },
        Shape::Any => {}
        Shape::Ref(name) => {
            let def = registry::record(name)
                .ok_or_else(|| RegistryError::Unresolved((*name).to_string()))?;
            check_record(def, value, path, out)?;
        }
        Shape::Array(item) | Shape::NonEmptyArray(item) => match value.as_array() {
            Some(items) if items.is_empty() && matches!(shape, Shape::NonEmptyArray(_)) => {
                mismatch(out)
            }
            Some(items) => {
                for (i, v) in items.iter().enumerate() {
                    check_shape(item, v, &path.index(i), out)?;
                }
            }
            None => mismatch(out),
        },
        Shape::Map(item) => match value.as_object() {
            Some(entries) => {
                for (k, v) in entries {
                    check_shape(item, v, &path.key(k.as_str()), out)?;
                }
            }
            None => mismatch(out),
        },
        Shape::Union(variants) => {
            let mut attempts = Vec::with_capacity(variants.len());
            for variant in *variants {
                let mut scratch = Vec::new();
                check_shape(variant, value, path, &mut scratch)?;
                if scratch.is_empty() {
                    return Ok(());
                }
                attempts.push(VariantAttempt {
                    variant: variant.describe(),
                    violations: scratch,
                });
            }
            out.push(Violation::new(
                path.clone(),
                ViolationKind::NoVariantMatched {
                    expected: shape.describe(),
                    actual: ValueKind::of(value),
                    attempts,
                },
            ));
        }
    }

    Ok(())
}
