//! # JSON Schema Export
//!
//! Derives one JSON Schema (draft 2020-12) document per registered record.
//! Nested records are referenced as sibling documents (`"$ref": "Node.json"`),
//! resolved against each document's `$id`. Field and record documentation
//! become `description`s.
//!
//! Output is deterministic: `serde_json`'s default map keeps keys sorted, and
//! every document is pretty-printed with a trailing newline, so exporting
//! twice yields byte-identical files.
//!
//! ## Known divergence
//!
//! JSON Schema treats `1.0` as an integer; the native validator does not.
//! The exported schemas are therefore slightly more permissive for
//! `Derivatives`, `Delays` and the intercept literal.

use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::registry::RECORDS;
use crate::shape::{RecordDef, Shape};

/// Dialect URI written to every document's `$schema`.
pub const SCHEMA_DIALECT: &str = "https://json-schema.org/draft/2020-12/schema";

/// Base URI the document `$id`s are built from unless overridden.
pub const DEFAULT_BASE_URI: &str = "https://bids-standard.github.io/stats-models/schema/";

/// File extension of exported schema documents.
pub const SCHEMA_EXTENSION: &str = "json";

/// Error writing exported schemas.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("cannot write schema '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialize schema '{record}': {source}")]
    Serialization {
        record: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Builds JSON Schema documents from the registry.
#[derive(Debug, Clone)]
pub struct SchemaExporter {
    base_uri: String,
}

impl Default for SchemaExporter {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URI)
    }
}

impl SchemaExporter {
    /// An exporter whose `$id`s live under `base_uri`. A missing trailing
    /// slash is added so relative `$ref`s resolve to siblings.
    pub fn new(base_uri: impl Into<String>) -> Self {
        let mut base_uri = base_uri.into();
        if !base_uri.ends_with('/') {
            base_uri.push('/');
        }
        Self { base_uri }
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// File name of a record's document, e.g. `Node.json`.
    pub fn file_name(record: &str) -> String {
        format!("{record}.{SCHEMA_EXTENSION}")
    }

    /// Absolute `$id` of a record's document.
    pub fn schema_id(&self, record: &str) -> String {
        format!("{}{}", self.base_uri, Self::file_name(record))
    }

    /// The JSON Schema document for one record.
    pub fn export_record(&self, def: &RecordDef) -> Value {
        let mut properties = Map::new();
        for field in def.fields {
            let mut schema = shape_schema(&field.shape);
            if let Value::Object(ref mut obj) = schema {
                obj.insert("description".into(), Value::String(field.doc.to_string()));
            }
            properties.insert(field.name.to_string(), schema);
        }

        let mut doc = Map::new();
        doc.insert("$schema".into(), json!(SCHEMA_DIALECT));
        doc.insert("$id".into(), json!(self.schema_id(def.name)));
        doc.insert("title".into(), json!(def.name));
        doc.insert("description".into(), json!(def.doc));
        doc.insert("type".into(), json!("object"));
        doc.insert("properties".into(), Value::Object(properties));
        let required: Vec<&str> = def.required_fields().map(|f| f.name).collect();
        if !required.is_empty() {
            doc.insert("required".into(), json!(required));
        }
        doc.insert("additionalProperties".into(), Value::Bool(false));
        Value::Object(doc)
    }

    /// Documents for every registered record, in registry order.
    pub fn export_all(&self) -> Vec<(&'static str, Value)> {
        RECORDS
            .iter()
            .map(|def| (def.name, self.export_record(def)))
            .collect()
    }

    /// Pretty-printed text of one record's document, with a trailing newline.
    pub fn render(&self, def: &RecordDef) -> Result<String, ExportError> {
        let mut text = serde_json::to_string_pretty(&self.export_record(def)).map_err(|source| {
            ExportError::Serialization {
                record: def.name,
                source,
            }
        })?;
        text.push('\n');
        Ok(text)
    }

    /// Write `<dir>/<Name>.json` for every registered record, creating `dir`
    /// if needed. Returns the written paths in registry order.
    pub fn write_all(&self, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
        std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut written = Vec::with_capacity(RECORDS.len());
        for def in RECORDS {
            let path = dir.join(Self::file_name(def.name));
            let text = self.render(def)?;
            std::fs::write(&path, text).map_err(|source| ExportError::Io {
                path: path.clone(),
                source,
            })?;
            tracing::debug!(record = def.name, path = %path.display(), "wrote schema");
            written.push(path);
        }

        tracing::info!(
            count = written.len(),
            dir = %dir.display(),
            "exported schemas"
        );
        Ok(written)
    }
}

/// The JSON Schema fragment for a shape.
pub fn shape_schema(shape: &Shape) -> Value {
    match shape {
        Shape::String => json!({"type": "string"}),
        Shape::Integer => json!({"type": "integer"}),
        Shape::Number => json!({"type": "number"}),
        Shape::Boolean => json!({"type": "boolean"}),
        Shape::Null => json!({"type": "null"}),
        Shape::IntLiteral(n) => json!({"type": "integer", "const": n}),
        Shape::Enum { name, values } => json!({
            "title": name,
            "type": "string",
            "enum": values,
        }),
        Shape::Any => json!({}),
        Shape::Ref(name) => json!({"$ref": SchemaExporter::file_name(name)}),
        Shape::Array(item) => json!({"type": "array", "items": shape_schema(item)}),
        Shape::NonEmptyArray(item) => json!({
            "type": "array",
            "items": shape_schema(item),
            "minItems": 1,
        }),
        Shape::Map(value) => json!({
            "type": "object",
            "additionalProperties": shape_schema(value),
        }),
        Shape::Union(variants) => json!({
            "anyOf": variants.iter().map(shape_schema).collect::<Vec<_>>(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{self, CONTRAST, NODE, OPTIONS};

    #[test]
    fn test_record_document_header() {
        let doc = SchemaExporter::default().export_record(&NODE);
        assert_eq!(doc["$schema"], SCHEMA_DIALECT);
        assert_eq!(doc["$id"], format!("{DEFAULT_BASE_URI}Node.json"));
        assert_eq!(doc["title"], "Node");
        assert_eq!(doc["type"], "object");
        assert_eq!(doc["additionalProperties"], false);
        assert_eq!(
            doc["required"],
            json!(["Level", "Name", "GroupBy", "Model"])
        );
        assert!(doc["description"].as_str().unwrap().starts_with("A node"));
    }

    #[test]
    fn test_refs_point_at_sibling_documents() {
        let doc = SchemaExporter::default().export_record(&NODE);
        assert_eq!(doc["properties"]["Model"]["$ref"], "Model.json");
        assert_eq!(
            doc["properties"]["Contrasts"]["items"]["$ref"],
            "Contrast.json"
        );
        assert!(doc["properties"]["Model"]["description"].is_string());
    }

    #[test]
    fn test_enum_and_union_fragments() {
        let doc = SchemaExporter::default().export_record(&CONTRAST);
        assert_eq!(doc["properties"]["Test"]["enum"], json!(["t", "F", "pass"]));
        let condition = &doc["properties"]["ConditionList"]["items"]["anyOf"];
        assert_eq!(condition[0], json!({"type": "string"}));
        assert_eq!(condition[1], json!({"type": "integer", "const": 1}));
    }

    #[test]
    fn test_all_optional_record_has_no_required() {
        let doc = SchemaExporter::default().export_record(&OPTIONS);
        assert!(doc.get("required").is_none());
        assert_eq!(doc["properties"]["Mask"]["additionalProperties"]["minItems"], 1);
    }

    #[test]
    fn test_base_uri_gets_trailing_slash() {
        let exporter = SchemaExporter::new("https://example.org/bsm");
        assert_eq!(exporter.schema_id("Edge"), "https://example.org/bsm/Edge.json");
    }

    #[test]
    fn test_render_is_deterministic() {
        let exporter = SchemaExporter::default();
        for def in RECORDS {
            let a = exporter.render(def).unwrap();
            let b = exporter.render(def).unwrap();
            assert_eq!(a, b);
            assert!(a.ends_with("}\n"));
        }
    }

    #[test]
    fn test_write_all_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("schemas");
        let written = SchemaExporter::default().write_all(&dir).unwrap();
        assert_eq!(written.len(), RECORDS.len());
        for (path, name) in written.iter().zip(registry::record_names()) {
            assert_eq!(path.file_name().unwrap().to_str().unwrap(), format!("{name}.json"));
            let value: Value =
                serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
            assert_eq!(value["title"], name);
        }
    }
}
