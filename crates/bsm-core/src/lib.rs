//! # bsm-core: Foundational Types for BIDS Stats Models
//!
//! Defines the strongly-typed tree a validated BIDS Stats Model decodes
//! into, the closed vocabularies it draws from, and the field paths used to
//! address locations inside a document. Every other crate in the workspace
//! depends on `bsm-core`; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Closed vocabularies are enums.** `NodeLevel`, `ModelType`,
//!    `StatisticalTest` and friends are exhaustive Rust enums whose literal
//!    spellings double as the constraint model's enumerations.
//!
//! 2. **Unions are sum types.** `Predictor` (name or intercept `1`),
//!    `Weight` (number or string) and `Weights` (1-D or 2-D) never accept a
//!    boolean or `null` in place of a number.
//!
//! 3. **Names, not references.** Edges carry Node names; the tree is acyclic
//!    and serializes without identity tracking.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `bsm-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod document;
pub mod path;
pub mod value;
pub mod vocabulary;

pub use document::{
    BidsStatsModel, Contrast, DummyContrasts, Edge, Filter, Hrf, HrfParameters, Model, Node,
    Options, Transformations,
};
pub use path::{FieldPath, Segment};
pub use value::{Predictor, Weight, Weights};
pub use vocabulary::{Aggregate, HrfModel, ModelType, NodeLevel, StatisticalTest, TransformerId};
