//! # Violations
//!
//! Structured description of everything wrong with a document. Invalid input
//! is a normal result, so violations are plain data: each names the field
//! path it concerns and what was wrong there.

use std::fmt;

use bsm_core::FieldPath;
use serde::Serialize;

use crate::shape::ValueKind;

/// Longest rendering of an offending scalar kept in a violation.
const FOUND_PREVIEW_LEN: usize = 40;

/// What went wrong at a path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    /// The value does not have the declared primitive, enum or container shape.
    TypeMismatch {
        expected: String,
        actual: ValueKind,
        /// Compact rendering of a scalar value; `None` for arrays and objects.
        found: Option<String>,
    },
    /// A required field is absent.
    MissingField { expected: String },
    /// A key that is not on the record's allow-list.
    UnknownField { allowed: Vec<&'static str> },
    /// No variant of a union accepted the value; one attempt per variant,
    /// in declaration order.
    NoVariantMatched {
        expected: String,
        actual: ValueKind,
        attempts: Vec<VariantAttempt>,
    },
    /// A cross-field or cross-entity rule is broken. The path is anchored at
    /// the containing entity.
    Inconsistent { reason: String },
}

/// Why one union variant rejected a value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantAttempt {
    pub variant: String,
    pub violations: Vec<Violation>,
}

impl ViolationKind {
    pub(crate) fn type_mismatch(expected: String, value: &serde_json::Value) -> Self {
        Self::TypeMismatch {
            expected,
            actual: ValueKind::of(value),
            found: preview(value),
        }
    }

    /// Short machine-friendly category name.
    pub fn category(&self) -> &'static str {
        match self {
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::MissingField { .. } => "missing_field",
            Self::UnknownField { .. } => "unknown_field",
            Self::NoVariantMatched { .. } => "no_variant_matched",
            Self::Inconsistent { .. } => "inconsistent",
        }
    }
}

fn preview(value: &serde_json::Value) -> Option<String> {
    if value.is_array() || value.is_object() {
        return None;
    }
    let rendered = value.to_string();
    if rendered.chars().count() <= FOUND_PREVIEW_LEN {
        Some(rendered)
    } else {
        let cut: String = rendered.chars().take(FOUND_PREVIEW_LEN).collect();
        Some(format!("{cut}…"))
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch {
                expected,
                actual,
                found,
            } => {
                write!(f, "expected {expected}, got {actual}")?;
                if let Some(found) = found {
                    write!(f, " {found}")?;
                }
                Ok(())
            }
            Self::MissingField { expected } => {
                write!(f, "missing required field (expected {expected})")
            }
            Self::UnknownField { allowed } => {
                write!(f, "unknown field; allowed fields: {}", allowed.join(", "))
            }
            Self::NoVariantMatched {
                expected,
                actual,
                attempts,
            } => {
                write!(f, "expected {expected}, got {actual}; no variant matched")?;
                for attempt in attempts {
                    for v in &attempt.violations {
                        write!(f, "\n      as {}: {}", attempt.variant, v)?;
                    }
                }
                Ok(())
            }
            Self::Inconsistent { reason } => f.write_str(reason),
        }
    }
}

/// A single violation with its location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub path: FieldPath,
    #[serde(flatten)]
    pub kind: ViolationKind,
}

impl Violation {
    pub fn new(path: FieldPath, kind: ViolationKind) -> Self {
        Self { path, kind }
    }

    pub fn inconsistent(path: FieldPath, reason: impl Into<String>) -> Self {
        Self::new(
            path,
            ViolationKind::Inconsistent {
                reason: reason.into(),
            },
        )
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.kind)
    }
}

/// Collection of validation violations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationViolations {
    violations: Vec<Violation>,
}

impl ValidationViolations {
    /// Returns the number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Returns true if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns a slice of all violations.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<Violation> {
        self.violations
    }

    /// Violations whose path renders exactly as `path`, e.g. `"Nodes[1].Level"`.
    pub fn at(&self, path: &str) -> Vec<&Violation> {
        self.violations
            .iter()
            .filter(|v| v.path.to_string() == path)
            .collect()
    }
}

impl From<Vec<Violation>> for ValidationViolations {
    fn from(violations: Vec<Violation>) -> Self {
        Self { violations }
    }
}

impl<'a> IntoIterator for &'a ValidationViolations {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.iter()
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {v}")?;
        }
        Ok(())
    }
}
