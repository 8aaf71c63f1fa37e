//! # Exported Schema Validation
//!
//! Validates documents against exported schema files with the `jsonschema`
//! crate (draft 2020-12). This is an independent check that the exported
//! artifacts agree with the native validator.
//!
//! ## Schema Resolution
//!
//! Every exported document has an `$id` of the form `<base>/<Name>.json` and
//! refers to its siblings with relative `$ref`s such as `"Node.json"`. A
//! local retriever maps each `$id` (and each bare file name) to the loaded
//! schema, so resolution never touches the network.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use jsonschema::{Retrieve, Uri, ValidationOptions, Validator};
use serde_json::Value;
use thiserror::Error;

use crate::export::{SchemaExporter, SCHEMA_EXTENSION};

/// Local retriever that resolves `$ref` URIs to schemas loaded in memory.
struct LocalSchemaRetriever {
    /// Map from URI string to schema value.
    schemas_by_uri: HashMap<String, Value>,
}

impl Retrieve for LocalSchemaRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri_str = uri.as_str();

        if let Some(value) = self.schemas_by_uri.get(uri_str) {
            return Ok(value.clone());
        }

        // Fall back to the file name, whatever base the reference was
        // resolved against.
        let filename = uri_str.rsplit('/').next().unwrap_or(uri_str);
        if let Some(value) = self.schemas_by_uri.get(filename) {
            return Ok(value.clone());
        }

        Err(format!("schema '{uri_str}' is not among the loaded schemas").into())
    }
}

/// Error during validation against exported schemas.
#[derive(Error, Debug)]
pub enum ExportedSchemaError {
    /// The document did not conform to the schema.
    #[error("validation failed against schema '{schema_name}':\n{violations}")]
    ValidationFailed {
        schema_name: String,
        violations: SchemaViolations,
    },

    /// The schema file could not be loaded.
    #[error("schema load error for '{schema_name}': {reason}")]
    SchemaLoadError { schema_name: String, reason: String },

    /// The compiled validator could not be built.
    #[error("validator build error for schema '{schema_name}': {reason}")]
    ValidatorBuildError { schema_name: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single `jsonschema` violation.
#[derive(Debug, Clone)]
pub struct SchemaViolation {
    /// JSON Pointer path to the violating value in the instance.
    pub instance_path: String,
    /// JSON Pointer path within the schema that triggered the error.
    pub schema_path: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "  (root): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.instance_path, self.message)
        }
    }
}

/// Violations reported by `jsonschema`.
#[derive(Debug, Clone, Default)]
pub struct SchemaViolations {
    violations: Vec<SchemaViolation>,
}

impl SchemaViolations {
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[SchemaViolation] {
        &self.violations
    }
}

impl fmt::Display for SchemaViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// A validator backed by the `jsonschema` crate over exported schemas.
///
/// Schemas are indexed by record name (`"Node"`, `"BIDSStatsModel"`, …).
#[derive(Debug)]
pub struct ExportedSchemaValidator {
    /// Directory the schemas were loaded from; `None` when built in memory.
    schema_dir: Option<PathBuf>,
    schemas: HashMap<String, Value>,
}

impl ExportedSchemaValidator {
    /// Load every `*.json` schema file in `schema_dir`.
    ///
    /// # Errors
    ///
    /// Returns `ExportedSchemaError::SchemaLoadError` if the directory or any
    /// schema file cannot be read or parsed as JSON.
    pub fn new(schema_dir: impl AsRef<Path>) -> Result<Self, ExportedSchemaError> {
        let schema_dir = schema_dir.as_ref().to_path_buf();
        let mut schemas = HashMap::new();

        let entries = std::fs::read_dir(&schema_dir).map_err(|e| {
            ExportedSchemaError::SchemaLoadError {
                schema_name: schema_dir.display().to_string(),
                reason: format!("cannot read schema directory: {e}"),
            }
        })?;

        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SCHEMA_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|n| n.to_str()) else {
                continue;
            };
            let content = std::fs::read_to_string(&path)?;
            let value: Value = serde_json::from_str(&content).map_err(|e| {
                ExportedSchemaError::SchemaLoadError {
                    schema_name: name.to_string(),
                    reason: format!("invalid JSON: {e}"),
                }
            })?;
            schemas.insert(name.to_string(), value);
        }

        tracing::debug!(
            count = schemas.len(),
            dir = %schema_dir.display(),
            "loaded exported schemas"
        );
        Ok(Self {
            schema_dir: Some(schema_dir),
            schemas,
        })
    }

    /// Use the exporter's documents directly, without touching the
    /// filesystem.
    pub fn from_exporter(exporter: &SchemaExporter) -> Self {
        let schemas = exporter
            .export_all()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        Self {
            schema_dir: None,
            schemas,
        }
    }

    pub fn schema_dir(&self) -> Option<&Path> {
        self.schema_dir.as_deref()
    }

    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    /// Names of all loaded schemas, sorted alphabetically.
    pub fn schema_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }

    pub fn get_schema(&self, name: &str) -> Option<&Value> {
        self.schemas.get(name)
    }

    /// Options with a retriever that knows every loaded schema by its `$id`
    /// and by its file name.
    fn build_options(&self) -> ValidationOptions {
        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft202012);

        let mut schemas_by_uri: HashMap<String, Value> = HashMap::new();
        for (name, value) in &self.schemas {
            if let Some(id) = value.get("$id").and_then(|v| v.as_str()) {
                schemas_by_uri.insert(id.to_string(), value.clone());
            }
            schemas_by_uri.insert(SchemaExporter::file_name(name), value.clone());
        }

        opts.with_retriever(LocalSchemaRetriever { schemas_by_uri });
        opts
    }

    /// Compile the schema for one record.
    ///
    /// # Errors
    ///
    /// `SchemaLoadError` if no schema of that name is loaded,
    /// `ValidatorBuildError` if it does not compile.
    pub fn build_validator(&self, schema_name: &str) -> Result<Validator, ExportedSchemaError> {
        let schema_value = self.schemas.get(schema_name).ok_or_else(|| {
            ExportedSchemaError::SchemaLoadError {
                schema_name: schema_name.to_string(),
                reason: "schema not loaded".to_string(),
            }
        })?;

        self.build_options().build(schema_value).map_err(|e| {
            ExportedSchemaError::ValidatorBuildError {
                schema_name: schema_name.to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// Validate a JSON value against a named record's schema.
    pub fn validate_document(
        &self,
        instance: &Value,
        schema_name: &str,
    ) -> Result<(), ExportedSchemaError> {
        let validator = self.build_validator(schema_name)?;

        let violations: Vec<SchemaViolation> = validator
            .iter_errors(instance)
            .map(|e| SchemaViolation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ExportedSchemaError::ValidationFailed {
                schema_name: schema_name.to_string(),
                violations: SchemaViolations { violations },
            })
        }
    }
}
