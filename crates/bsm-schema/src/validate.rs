//! # Document Validation
//!
//! Entry points that turn untrusted JSON into a typed value tree. Each call
//! runs two passes:
//!
//! 1. The structural pass ([`crate::structural`]) checks the value against
//!    the constraint model and collects every violation.
//! 2. If that pass is clean, the value is decoded into its `bsm-core` type
//!    and the document-level checks ([`crate::consistency`]) run on the
//!    typed tree. Otherwise the document-level checks that can still be
//!    read off the raw value run alongside, so one call reports everything.
//!
//! Invalid input is an ordinary result: [`DocumentError::Invalid`] carries
//! the complete violation list. Malformed JSON text is reported separately
//! as [`DocumentError::Parse`] and is never mixed with violations.

use bsm_core::{
    BidsStatsModel, Contrast, DummyContrasts, Edge, FieldPath, Hrf, HrfParameters, Model, Node,
    Options, Transformations,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::consistency;
use crate::registry::{self, RegistryError};
use crate::structural;
use crate::violation::{ValidationViolations, Violation};

/// Why a document could not be turned into a typed value.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The input is not well-formed JSON.
    #[error("invalid JSON at line {line}, column {column}: {reason}")]
    Parse {
        line: usize,
        column: usize,
        reason: String,
    },

    /// The input is JSON but violates the model.
    #[error("document has {n} violation(s):\n{0}", n = .0.len())]
    Invalid(ValidationViolations),

    /// No record of this name is registered.
    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    /// The constraint model itself is inconsistent.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// A structurally valid value failed to decode into its typed form.
    /// The constraint model and the typed tree disagree.
    #[error("internal error decoding '{entity}': {reason}")]
    Internal { entity: &'static str, reason: String },
}

impl DocumentError {
    /// The violations, when the document was rejected for its content.
    pub fn violations(&self) -> Option<&ValidationViolations> {
        match self {
            Self::Invalid(v) => Some(v),
            _ => None,
        }
    }

    fn parse(err: &serde_json::Error) -> Self {
        let full = err.to_string();
        // serde_json appends " at line L column C"; the fields carry that.
        let reason = match full.rfind(" at line ") {
            Some(idx) => full[..idx].to_string(),
            None => full,
        };
        Self::Parse {
            line: err.line(),
            column: err.column(),
            reason,
        }
    }
}

/// A type in the document tree with a registered record.
pub trait Entity: DeserializeOwned {
    /// Name of the record this type is checked against.
    const RECORD: &'static str;

    /// Document-level checks that apply to this entity on its own.
    fn check_consistency(&self, _path: &FieldPath, _out: &mut Vec<Violation>) {}

    /// The subset of [`Entity::check_consistency`] that can run on a value
    /// with structural violations.
    fn check_consistency_value(_value: &Value, _path: &FieldPath, _out: &mut Vec<Violation>) {}
}

impl Entity for BidsStatsModel {
    const RECORD: &'static str = registry::ROOT;

    fn check_consistency(&self, _path: &FieldPath, out: &mut Vec<Violation>) {
        consistency::check_document(self, out);
    }

    fn check_consistency_value(value: &Value, _path: &FieldPath, out: &mut Vec<Violation>) {
        consistency::check_document_value(value, out);
    }
}

impl Entity for Node {
    const RECORD: &'static str = "Node";

    fn check_consistency(&self, path: &FieldPath, out: &mut Vec<Violation>) {
        consistency::check_node(self, path, out);
    }

    fn check_consistency_value(value: &Value, path: &FieldPath, out: &mut Vec<Violation>) {
        consistency::check_node_value(value, path, out);
    }
}

impl Entity for Contrast {
    const RECORD: &'static str = "Contrast";

    fn check_consistency(&self, path: &FieldPath, out: &mut Vec<Violation>) {
        consistency::check_contrast(self, path, out);
    }
}

impl Entity for Edge {
    const RECORD: &'static str = "Edge";
}

impl Entity for Transformations {
    const RECORD: &'static str = "Transformations";
}

impl Entity for Model {
    const RECORD: &'static str = "Model";
}

impl Entity for Hrf {
    const RECORD: &'static str = "HRF";
}

impl Entity for HrfParameters {
    const RECORD: &'static str = "Parameters";
}

impl Entity for Options {
    const RECORD: &'static str = "Options";
}

impl Entity for DummyContrasts {
    const RECORD: &'static str = "DummyContrasts";
}

/// A validated fragment, tagged by the record it was checked against.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedEntity {
    StatsModel(BidsStatsModel),
    Node(Node),
    Edge(Edge),
    Transformations(Transformations),
    Model(Model),
    Hrf(Hrf),
    Parameters(HrfParameters),
    Options(Options),
    Contrast(Contrast),
    DummyContrasts(DummyContrasts),
}

/// Every violation in `value` as a `T`: the structural pass, then the
/// document-level checks on the typed tree, or on the raw value when the
/// structure is broken. Returns the typed value when there are no
/// violations at all.
fn collect<T: Entity>(value: &Value) -> Result<(Option<T>, Vec<Violation>), DocumentError> {
    let def = registry::record(T::RECORD)
        .ok_or_else(|| RegistryError::Unresolved(T::RECORD.to_string()))?;
    let root = FieldPath::root();
    let mut out = Vec::new();

    structural::check_record(def, value, &root, &mut out)?;
    if !out.is_empty() {
        T::check_consistency_value(value, &root, &mut out);
        return Ok((None, out));
    }

    let typed = <T as serde::Deserialize>::deserialize(value).map_err(|e| DocumentError::Internal {
        entity: T::RECORD,
        reason: e.to_string(),
    })?;
    typed.check_consistency(&root, &mut out);
    if out.is_empty() {
        Ok((Some(typed), out))
    } else {
        Ok((None, out))
    }
}

/// Validate a JSON value as a `T` and decode it.
pub fn decode_entity<T: Entity>(value: &Value) -> Result<T, DocumentError> {
    let (typed, violations) = collect::<T>(value)?;
    tracing::debug!(
        entity = T::RECORD,
        violations = violations.len(),
        "validated entity"
    );
    match typed {
        Some(t) => Ok(t),
        None => Err(DocumentError::Invalid(violations.into())),
    }
}

/// Validate a fragment against a record chosen by name, e.g. a single
/// `"Contrast"`.
pub fn validate_entity(name: &str, value: &Value) -> Result<ValidatedEntity, DocumentError> {
    let entity = match name {
        registry::ROOT => ValidatedEntity::StatsModel(decode_entity(value)?),
        "Node" => ValidatedEntity::Node(decode_entity(value)?),
        "Edge" => ValidatedEntity::Edge(decode_entity(value)?),
        "Transformations" => ValidatedEntity::Transformations(decode_entity(value)?),
        "Model" => ValidatedEntity::Model(decode_entity(value)?),
        "HRF" => ValidatedEntity::Hrf(decode_entity(value)?),
        "Parameters" => ValidatedEntity::Parameters(decode_entity(value)?),
        "Options" => ValidatedEntity::Options(decode_entity(value)?),
        "Contrast" => ValidatedEntity::Contrast(decode_entity(value)?),
        "DummyContrasts" => ValidatedEntity::DummyContrasts(decode_entity(value)?),
        other => return Err(DocumentError::UnknownEntity(other.to_string())),
    };
    Ok(entity)
}

/// Validate a decoded JSON value as a complete BIDS Stats Model.
pub fn validate_value(value: &Value) -> Result<BidsStatsModel, DocumentError> {
    decode_entity(value)
}

/// Parse and validate raw JSON text as a complete BIDS Stats Model.
pub fn validate_str(input: &str) -> Result<BidsStatsModel, DocumentError> {
    let value: Value = serde_json::from_str(input).map_err(|e| DocumentError::parse(&e))?;
    validate_value(&value)
}

/// All violations of a complete document, empty when it is valid.
///
/// Unlike [`validate_value`] this never fails for content reasons; only an
/// inconsistent constraint model or a decode disagreement is an error.
pub fn check_value(value: &Value) -> Result<ValidationViolations, DocumentError> {
    let (_, violations) = collect::<BidsStatsModel>(value)?;
    Ok(violations.into())
}
