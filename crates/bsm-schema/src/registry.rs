//! # Entity Registry
//!
//! The declarations of every named record in a BIDS Stats Model, and the
//! shared shapes they use. This is the single canonical revision of the
//! model: strict leaves, `Contrast.Weights` and `Contrast.Test` required,
//! `Test` accepting `pass`, HRF parameters as a named record.
//!
//! Enumerations are taken from the `bsm-core` vocabulary enums so the typed
//! tree and the constraint model always agree on the literal sets.

use bsm_core::vocabulary::{Aggregate, HrfModel, ModelType, NodeLevel, StatisticalTest, TransformerId};
use thiserror::Error;

use crate::shape::{FieldDef, RecordDef, Shape};

/// Name of the root record.
pub const ROOT: &str = "BIDSStatsModel";

// Shared shapes.

const STRINGS: Shape = Shape::Array(&Shape::String);

/// A scalar a Filter may match against.
const FILTER_LITERAL: Shape = Shape::Union(&[Shape::String, Shape::Number, Shape::Boolean, Shape::Null]);

/// Variable/entity name → non-empty list of allowed values.
pub const FILTER: Shape = Shape::Map(&Shape::NonEmptyArray(&FILTER_LITERAL));

/// A variable name or the intercept `1`.
pub const PREDICTOR: Shape = Shape::Union(&[Shape::String, Shape::IntLiteral(1)]);

/// A single weight: a number, or a string such as `"1/3"` passed through
/// verbatim.
pub const WEIGHT: Shape = Shape::Union(&[Shape::Number, Shape::String]);

/// A 1-D or 2-D array of [`WEIGHT`].
pub const WEIGHTS: Shape = Shape::Union(&[Shape::Array(&WEIGHT), Shape::Array(&Shape::Array(&WEIGHT))]);

const STATISTICAL_TEST: Shape = Shape::Enum {
    name: StatisticalTest::SCHEMA_NAME,
    values: StatisticalTest::LITERALS,
};

/// A BIDS Stats Model: one or more hierarchical models over brain imaging
/// data.
pub static BIDS_STATS_MODEL: RecordDef = RecordDef {
    name: ROOT,
    doc: "A BIDS Stats Model is a JSON file that defines one or more hierarchical models on brain imaging data. A hierarchical model is a sequence of estimator nodes connected via edges to form a directed, acyclic graph. The graph contains a single root node, which only has outgoing edges, and may have many leaf nodes that only have incoming edges.",
    fields: &[
        FieldDef::required(
            "Name",
            Shape::String,
            "A name identifying the model, ideally short. Each model's name should be unique for any given BIDS project.",
        ),
        FieldDef::required(
            "BIDSModelVersion",
            Shape::String,
            "A string identifying the version of the specification adhered to. Note this is different from BIDSVersion.",
        ),
        FieldDef::optional("Description", Shape::String, "A concise verbal description of the model."),
        FieldDef::optional("Input", FILTER, "Dictionary specification of input images."),
        FieldDef::required(
            "Nodes",
            Shape::Array(&Shape::Ref("Node")),
            "A list of analysis nodes. The ordering of this list is significant if Edges is absent.",
        ),
        FieldDef::optional(
            "Edges",
            Shape::Array(&Shape::Ref("Edge")),
            "A list of edges between analysis nodes. If absent, the nodes are connected in the sequence presented in Nodes.",
        ),
    ],
};

pub static NODE: RecordDef = RecordDef {
    name: "Node",
    doc: "A node represents an estimator that applies to a given level of analysis. It contains sufficient information to construct a design matrix, estimate parameter weights (betas) and construct contrasts.",
    fields: &[
        FieldDef::required(
            "Level",
            Shape::Enum {
                name: NodeLevel::SCHEMA_NAME,
                values: NodeLevel::LITERALS,
            },
            "Level of analysis being described.",
        ),
        FieldDef::required("Name", Shape::String, "Name of node. Must be unique among the Nodes of a model."),
        FieldDef::required(
            "GroupBy",
            STRINGS,
            "The output statistical maps received from the input node are split along unique combinations of the grouping variables and passed to the model as subsets. If empty, all inputs are passed to a single model to fit. Reserved strings include: \"run\", \"session\", \"subject\", and \"contrast\".",
        ),
        FieldDef::optional(
            "Transformations",
            Shape::Ref("Transformations"),
            "Specification of transformations to be applied to variables before the construction of the model.",
        ),
        FieldDef::required(
            "Model",
            Shape::Ref("Model"),
            "What model parameters should be included, and how the errors are specified.",
        ),
        FieldDef::optional(
            "Contrasts",
            Shape::Array(&Shape::Ref("Contrast")),
            "How to linearly weight/combine design matrix columns to generate contrast maps and (optionally) run statistical tests.",
        ),
        FieldDef::optional(
            "DummyContrasts",
            Shape::Ref("DummyContrasts"),
            "A convenient shortcut for specifying contrasts; allows automatic creation of indicator contrasts for either all variables in the design matrix, or all named variables.",
        ),
    ],
};

pub static EDGE: RecordDef = RecordDef {
    name: "Edge",
    doc: "An Edge connects two Nodes, indicating the outputs (contrasts) of the Source node are to be made available as inputs to the Destination node. Contrasts may be filtered by any metadata field, including entities; each contrast has an additional entity \"contrast\" that may be used to filter contrasts by name.",
    fields: &[
        FieldDef::required(
            "Source",
            Shape::String,
            "Name of node. The outputs of this node are passed to Destination.",
        ),
        FieldDef::required(
            "Destination",
            Shape::String,
            "Name of node. The outputs of Source, after filtering (if any), are the inputs of this node.",
        ),
        FieldDef::optional(
            "Filter",
            FILTER,
            "Maps a grouping variable to a list of values to pass to Destination. If multiple grouping variables are passed, the result is the conjunction of filters.",
        ),
    ],
};

pub static TRANSFORMATIONS: RecordDef = RecordDef {
    name: "Transformations",
    doc: "Transformations applied to variables before the model is constructed.",
    fields: &[
        FieldDef::required(
            "Transformer",
            Shape::Enum {
                name: TransformerId::SCHEMA_NAME,
                values: TransformerId::LITERALS,
            },
            "Name of the specification of an instruction set.",
        ),
        FieldDef::required(
            "Instructions",
            Shape::Array(&Shape::Any),
            "Sequence of instructions to pass to an implementation of Transformer. The format of these instructions is determined by the Transformer.",
        ),
    ],
};

pub static MODEL: RecordDef = RecordDef {
    name: "Model",
    doc: "The design of a node's estimator.",
    fields: &[
        FieldDef::required(
            "Type",
            Shape::Enum {
                name: ModelType::SCHEMA_NAME,
                values: ModelType::LITERALS,
            },
            "The type of analysis to run: \"glm\" for general linear model, \"meta\" for meta-analysis.",
        ),
        FieldDef::required(
            "X",
            Shape::Array(&PREDICTOR),
            "A list of predictors to include in the model. Each entry is a variable name or 1 for an intercept. Wildcards follow Unix-style glob rules: \"*\" matches 0 or more alphanumeric characters and \"?\" exactly one.",
        ),
        FieldDef::optional(
            "Formula",
            Shape::String,
            "Wilkinson notation specification of a transformation of the design matrix X. A 1 or 0 term MUST be present to explicitly include or exclude an intercept.",
        ),
        FieldDef::optional(
            "HRF",
            Shape::Ref("HRF"),
            "A specification of the hemodynamic response function (HRF) that should be applied to variables by implementing software.",
        ),
        FieldDef::optional(
            "Options",
            Shape::Ref("Options"),
            "Estimation options that are common to multiple estimation packages.",
        ),
        FieldDef::optional(
            "Software",
            Shape::Map(&Shape::Map(&Shape::Any)),
            "Software-specific estimation parameters, keyed by the name of the package (FSL, SPM, etc.). The values are not constrained.",
        ),
    ],
};

pub static HRF: RecordDef = RecordDef {
    name: "HRF",
    doc: "A hemodynamic response function applied to sparse event variables.",
    fields: &[
        FieldDef::required("Variables", STRINGS, "Name of the variables to be convolved."),
        FieldDef::required(
            "Model",
            Shape::Enum {
                name: HrfModel::SCHEMA_NAME,
                values: HrfModel::LITERALS,
            },
            "Name of a hemodynamic model.",
        ),
        FieldDef::optional(
            "Parameters",
            Shape::Ref("Parameters"),
            "Parameters to the hemodynamic model.",
        ),
    ],
};

pub static PARAMETERS: RecordDef = RecordDef {
    name: "Parameters",
    doc: "Parameters of a hemodynamic model. Each applies to a subset of models, so all are optional.",
    fields: &[
        FieldDef::optional(
            "PeakDelay",
            Shape::Number,
            "Delay, in seconds, from onset to peak response. Applies to models: Gamma, DoubleGamma.",
        ),
        FieldDef::optional(
            "PeakDispersion",
            Shape::Number,
            "Width of peak. Applies to models: Gamma, DoubleGamma.",
        ),
        FieldDef::optional(
            "UndershootDelay",
            Shape::Number,
            "Delay, in seconds, from onset to undershoot response. Applies to model: DoubleGamma.",
        ),
        FieldDef::optional(
            "UndershootDispersion",
            Shape::Number,
            "Width of undershoot. Applies to model: DoubleGamma.",
        ),
        FieldDef::optional(
            "PeakUndershootRatio",
            Shape::Number,
            "Peak-to-undershoot ratio. Applies to model: DoubleGamma.",
        ),
        FieldDef::optional(
            "Derivatives",
            Shape::Integer,
            "Order of derivatives to include. 1 indicates the first derivative, while 2 indicates the first and second derivative. Applies to models: Gamma, DoubleGamma.",
        ),
        FieldDef::optional(
            "Delays",
            Shape::Array(&Shape::Integer),
            "List of delays, in scans, for impulse responses. Applies to model: FiniteImpulseResponse.",
        ),
    ],
};

pub static OPTIONS: RecordDef = RecordDef {
    name: "Options",
    doc: "Estimation options that are common to multiple estimation packages.",
    fields: &[
        FieldDef::optional(
            "HighPassFilterCutoffHz",
            Shape::Number,
            "The cutoff frequency, in Hz, for a high-pass filter.",
        ),
        FieldDef::optional(
            "LowPassFilterCutoffHz",
            Shape::Number,
            "The cutoff frequency, in Hz, for a low-pass filter.",
        ),
        FieldDef::optional(
            "ReplaceVariables",
            Shape::Map(&Shape::Any),
            "Design matrix columns that are to be replaced by the estimating software. Keys are the names of columns to replace; values are unconstrained.",
        ),
        FieldDef::optional(
            "Mask",
            FILTER,
            "BIDS entities specifying a mask file from the input dataset, for example {\"desc\": [\"brain\"], \"suffix\": [\"mask\"]}.",
        ),
        FieldDef::optional(
            "Aggregate",
            Shape::Enum {
                name: Aggregate::SCHEMA_NAME,
                values: Aggregate::LITERALS,
            },
            "Method of combining time series within each value in the Mask. \"none\" returns a separate time course for each voxel, \"mean\" the average of all voxels within each value, \"pca\" the first principal component.",
        ),
    ],
};

pub static CONTRAST: RecordDef = RecordDef {
    name: "Contrast",
    doc: "A weighted linear combination of model variables, optionally with a statistical test.",
    fields: &[
        FieldDef::required(
            "Name",
            Shape::String,
            "The name of the contrast. Must be unique within a node, including dummy contrasts.",
        ),
        FieldDef::required(
            "ConditionList",
            Shape::Array(&PREDICTOR),
            "A list of variables used to compute the contrast.",
        ),
        FieldDef::required(
            "Weights",
            WEIGHTS,
            "A 1D or 2D array of weights mapped 1-to-1 onto ConditionList in order. For t-tests, a 1D array must be passed; for F-tests either a 1D or 2D array. Each row has as many weights as ConditionList has entries. Fractional values MAY be passed as strings (e.g. \"1/3\").",
        ),
        FieldDef::required(
            "Test",
            STATISTICAL_TEST,
            "The type of test statistic to compute on the contrast. \"pass\" computes the weighted sum of parameter estimates without a statistical test.",
        ),
    ],
};

pub static DUMMY_CONTRASTS: RecordDef = RecordDef {
    name: "DummyContrasts",
    doc: "Unit-weight, single-variable contrasts generated for every listed variable.",
    fields: &[
        FieldDef::optional(
            "Contrasts",
            STRINGS,
            "A list of variables to generate dummy contrasts for. If absent, every variable in the design matrix gets one.",
        ),
        FieldDef::required(
            "Test",
            STATISTICAL_TEST,
            "Indicates the contrast type that will be applied for each dummy contrast in the section.",
        ),
    ],
};

/// Every named record, root first. Export order follows this list.
pub static RECORDS: &[&RecordDef] = &[
    &BIDS_STATS_MODEL,
    &NODE,
    &EDGE,
    &TRANSFORMATIONS,
    &MODEL,
    &HRF,
    &PARAMETERS,
    &OPTIONS,
    &CONTRAST,
    &DUMMY_CONTRASTS,
];

/// Look up a record by name.
pub fn record(name: &str) -> Option<&'static RecordDef> {
    RECORDS.iter().copied().find(|r| r.name == name)
}

/// Names of every registered record, in registry order.
pub fn record_names() -> impl Iterator<Item = &'static str> {
    RECORDS.iter().map(|r| r.name)
}

/// The registry is internally inconsistent. Always a bug in the
/// declarations above, never a property of a document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("record '{record}' references unregistered record '{target}'")]
    UnknownRecord { record: String, target: String },

    #[error("record '{record}' declares field '{field}' more than once")]
    DuplicateField { record: String, field: String },

    #[error("record '{0}' is registered more than once")]
    DuplicateRecord(String),

    #[error("record '{record}' contains an empty enum or union")]
    EmptyChoice { record: String },

    #[error("reference to unregistered record '{0}'")]
    Unresolved(String),
}

/// Verify the registry is self-consistent: unique record names, unique
/// field names per record, every `Ref` resolves, no empty choices.
pub fn check_registry() -> Result<(), RegistryError> {
    for (i, rec) in RECORDS.iter().enumerate() {
        if RECORDS[..i].iter().any(|r| r.name == rec.name) {
            return Err(RegistryError::DuplicateRecord(rec.name.to_string()));
        }
        for (j, field) in rec.fields.iter().enumerate() {
            if rec.fields[..j].iter().any(|f| f.name == field.name) {
                return Err(RegistryError::DuplicateField {
                    record: rec.name.to_string(),
                    field: field.name.to_string(),
                });
            }
            if has_empty_choice(&field.shape) {
                return Err(RegistryError::EmptyChoice {
                    record: rec.name.to_string(),
                });
            }
        }
        for target in rec.references() {
            if record(target).is_none() {
                return Err(RegistryError::UnknownRecord {
                    record: rec.name.to_string(),
                    target: target.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn has_empty_choice(shape: &Shape) -> bool {
    match shape {
        Shape::Enum { values, .. } => values.is_empty(),
        Shape::Union(variants) => variants.is_empty() || variants.iter().any(has_empty_choice),
        Shape::Array(inner) | Shape::NonEmptyArray(inner) | Shape::Map(inner) => {
            has_empty_choice(inner)
        }
        _ => false,
    }
}
