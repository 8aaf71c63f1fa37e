//! # Union Values
//!
//! The handful of fields whose JSON value may take more than one shape:
//!
//! - [`Predictor`]: an entry of `Model.X` or `Contrast.ConditionList`, either
//!   a variable name or the literal integer `1` (the intercept).
//! - [`Weight`]: a contrast weight, either a JSON number or a string such as
//!   `"1/3"`. Strings are carried verbatim; nothing here parses fractions.
//! - [`Weights`]: a 1-D or 2-D array of [`Weight`].
//!
//! Booleans and `null` are never accepted by any of these unions.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A model predictor: a variable name (glob wildcards allowed, resolved
/// downstream) or the intercept, spelled as the integer `1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Predictor {
    /// The literal `1`.
    Intercept,
    /// A variable name or glob pattern.
    Variable(String),
}

impl Predictor {
    /// The variable name, or `None` for the intercept.
    pub fn as_variable(&self) -> Option<&str> {
        match self {
            Self::Intercept => None,
            Self::Variable(name) => Some(name),
        }
    }
}

impl fmt::Display for Predictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Intercept => f.write_str("1"),
            Self::Variable(name) => f.write_str(name),
        }
    }
}

impl Serialize for Predictor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Intercept => serializer.serialize_u8(1),
            Self::Variable(name) => serializer.serialize_str(name),
        }
    }
}

struct PredictorVisitor;

impl<'de> Visitor<'de> for PredictorVisitor {
    type Value = Predictor;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a variable name or the integer 1")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Predictor, E> {
        Ok(Predictor::Variable(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Predictor, E> {
        Ok(Predictor::Variable(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Predictor, E> {
        if v == 1 {
            Ok(Predictor::Intercept)
        } else {
            Err(E::invalid_value(de::Unexpected::Unsigned(v), &self))
        }
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Predictor, E> {
        if v == 1 {
            Ok(Predictor::Intercept)
        } else {
            Err(E::invalid_value(de::Unexpected::Signed(v), &self))
        }
    }
}

impl<'de> Deserialize<'de> for Predictor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PredictorVisitor)
    }
}

/// A single contrast weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Weight {
    /// A JSON number, kept exactly as written (integers stay integers).
    Number(serde_json::Number),
    /// A string such as `"1/3"`, passed through unparsed.
    Expression(String),
}

impl Weight {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            Self::Expression(_) => None,
        }
    }
}

impl From<i64> for Weight {
    fn from(v: i64) -> Self {
        Self::Number(v.into())
    }
}

impl From<&str> for Weight {
    fn from(v: &str) -> Self {
        Self::Expression(v.to_string())
    }
}

/// Contrast weights: one row, or a matrix of rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Weights {
    /// A 1-D array.
    Vector(Vec<Weight>),
    /// A 2-D array. Only the total number of weights is constrained, not
    /// the length of each row.
    Matrix(Vec<Vec<Weight>>),
}

impl Weights {
    pub fn is_matrix(&self) -> bool {
        matches!(self, Self::Matrix(_))
    }

    /// Number of rows; a vector is a single row.
    pub fn row_count(&self) -> usize {
        match self {
            Self::Vector(_) => 1,
            Self::Matrix(rows) => rows.len(),
        }
    }

    /// Total number of weights across all rows.
    pub fn element_count(&self) -> usize {
        match self {
            Self::Vector(row) => row.len(),
            Self::Matrix(rows) => rows.iter().map(Vec::len).sum(),
        }
    }
}
