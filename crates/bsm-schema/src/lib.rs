//! # bsm-schema: Constraint Model, Validation & Schema Export
//!
//! Declares what a BIDS Stats Model may contain, checks untrusted JSON
//! against it, and derives portable JSON Schema documents from the same
//! declarations.
//!
//! ## Constraint Model (`shape`, `registry`)
//!
//! Every named record is a static [`RecordDef`] with an explicit field
//! allow-list. The [`registry`] lists them in a stable order, root first,
//! and [`registry::check_registry`] verifies the declarations are
//! self-consistent.
//!
//! ## Validation (`structural`, `consistency`, `validate`)
//!
//! [`validate_str`] and [`validate_value`] return either a typed
//! [`bsm_core::BidsStatsModel`] or the complete list of violations, each
//! with a field path such as `Nodes[0].Model.X[2]`. Structural checks run
//! first; document-level checks (unique names, resolvable and acyclic edges,
//! weight cardinality) run on the typed tree once the structure is clean.
//! [`validate_entity`] checks a single fragment by record name.
//!
//! ## Schema Export (`export`, `audit`, `exported`)
//!
//! [`SchemaExporter`] writes one draft 2020-12 document per record with
//! sibling `$ref`s. [`audit_exported`] confirms every object schema is
//! locked with `additionalProperties: false` or is a declared mapping, and
//! [`ExportedSchemaValidator`] re-validates documents against the exported
//! files with `jsonschema`.
//!
//! ## Crate Policy
//!
//! - Depends only on `bsm-core` internally.
//! - Invalid documents are data, not panics: every rejection carries a path
//!   and an expected-vs-actual description.
//! - Record names double as schema file names; renaming a record changes
//!   the exported `$id`s.

pub mod audit;
pub mod consistency;
pub mod export;
pub mod exported;
pub mod registry;
pub mod shape;
pub mod structural;
pub mod validate;
pub mod violation;

pub use audit::{audit_additional_properties, audit_exported, AdditionalPropertiesFinding};
pub use export::{ExportError, SchemaExporter, DEFAULT_BASE_URI, SCHEMA_DIALECT};
pub use exported::{ExportedSchemaError, ExportedSchemaValidator, SchemaViolation, SchemaViolations};
pub use registry::{check_registry, RegistryError, RECORDS, ROOT};
pub use shape::{FieldDef, RecordDef, Shape, ValueKind};
pub use validate::{
    check_value, decode_entity, validate_entity, validate_str, validate_value, DocumentError,
    Entity, ValidatedEntity,
};
pub use violation::{ValidationViolations, VariantAttempt, Violation, ViolationKind};
