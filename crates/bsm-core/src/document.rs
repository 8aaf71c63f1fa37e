//! # Stats Model Document
//!
//! The strongly-typed tree a validated BIDS Stats Model decodes into. Field
//! names follow the document's PascalCase keys; every record denies unknown
//! fields and omits absent optional fields when serialized, so a typed value
//! re-serializes to a document that validates to an equal value.
//!
//! Edges refer to Nodes by name, never by reference, which keeps the tree
//! acyclic and plainly serializable. Whether those names resolve is a
//! document-level check performed by `bsm-schema`, not a property of these
//! types.
//!
//! Opaque sub-trees whose shape belongs to an external consumer
//! (`Transformations.Instructions`, `Model.Software`,
//! `Options.ReplaceVariables`) are kept as `serde_json::Value`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::value::{Predictor, Weights};
use crate::vocabulary::{Aggregate, HrfModel, ModelType, NodeLevel, StatisticalTest, TransformerId};

/// Maps a grouping variable or entity name to the values it may take.
/// Multiple keys combine conjunctively.
pub type Filter = BTreeMap<String, Vec<Value>>;

/// Root of a BIDS Stats Model document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "PascalCase")]
pub struct BidsStatsModel {
    pub name: String,
    #[serde(rename = "BIDSModelVersion")]
    pub bids_model_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Filter>,
    /// Order is significant when `edges` is absent.
    pub nodes: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edges: Option<Vec<Edge>>,
}

impl BidsStatsModel {
    /// Look up a node by name.
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Declared edges, empty when `Edges` is absent.
    pub fn edges(&self) -> &[Edge] {
        self.edges.as_deref().unwrap_or(&[])
    }
}

/// One estimator stage at a given level of analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "PascalCase")]
pub struct Node {
    pub level: NodeLevel,
    pub name: String,
    pub group_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformations: Option<Transformations>,
    pub model: Model,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contrasts: Option<Vec<Contrast>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dummy_contrasts: Option<DummyContrasts>,
}

impl Node {
    /// Explicit contrasts, empty when `Contrasts` is absent.
    pub fn contrasts(&self) -> &[Contrast] {
        self.contrasts.as_deref().unwrap_or(&[])
    }
}

/// Directed link passing the (filtered) outputs of `source` to `destination`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "PascalCase")]
pub struct Edge {
    pub source: String,
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "PascalCase")]
pub struct Transformations {
    pub transformer: TransformerId,
    pub instructions: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "PascalCase")]
pub struct Model {
    #[serde(rename = "Type")]
    pub kind: ModelType,
    pub x: Vec<Predictor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(rename = "HRF", default, skip_serializing_if = "Option::is_none")]
    pub hrf: Option<Hrf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Options>,
    /// Package name → package-specific parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software: Option<BTreeMap<String, Map<String, Value>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "PascalCase")]
pub struct Hrf {
    pub variables: Vec<String>,
    pub model: HrfModel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<HrfParameters>,
}

/// Named HRF model parameters. Each applies to a subset of [`HrfModel`]s,
/// so all are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "PascalCase")]
pub struct HrfParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_delay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_dispersion: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undershoot_delay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undershoot_dispersion: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_undershoot_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derivatives: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delays: Option<Vec<i64>>,
}

/// Estimation options shared across packages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "PascalCase")]
pub struct Options {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_pass_filter_cutoff_hz: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_pass_filter_cutoff_hz: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace_variables: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<Aggregate>,
}

/// A weighted linear combination of model variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "PascalCase")]
pub struct Contrast {
    pub name: String,
    pub condition_list: Vec<Predictor>,
    pub weights: Weights,
    pub test: StatisticalTest,
}

/// Shorthand for one unit-weight contrast per listed variable (or per
/// variable in the model when `contrasts` is absent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "PascalCase")]
pub struct DummyContrasts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contrasts: Option<Vec<String>>,
    pub test: StatisticalTest,
}
