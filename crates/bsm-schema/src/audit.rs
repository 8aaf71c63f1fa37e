//! # Forbid-Policy Audit
//!
//! Walks exported JSON Schema documents and reports every object schema that
//! would accept unknown keys.
//!
//! Two object forms are expected in the output:
//!
//! - **Records** (`properties` present): must carry
//!   `additionalProperties: false`.
//! - **Mappings** (`additionalProperties` is itself a schema): the declared
//!   open-keyed maps such as `Filter`, `Software` and `ReplaceVariables`.
//!   The value schema constrains every entry, so these pass.
//!
//! Anything else of `"type": "object"`, including an explicit
//! `additionalProperties: true`, is a finding.

use std::fmt;

use serde_json::Value;

use crate::export::SchemaExporter;

/// A finding about `additionalProperties` configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AdditionalPropertiesFinding {
    /// Record whose document contains the schema.
    pub schema_name: String,
    /// JSON Pointer path to the `additionalProperties` field.
    pub json_path: String,
    /// Current value of `additionalProperties`.
    pub current_value: String,
    /// Recommended action.
    pub recommendation: String,
}

impl fmt::Display for AdditionalPropertiesFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  {}#{}: {} → {}",
            self.schema_name, self.json_path, self.current_value, self.recommendation
        )
    }
}

/// Audit one exported schema document.
pub fn audit_additional_properties(schema_name: &str, schema: &Value) -> Vec<AdditionalPropertiesFinding> {
    let mut findings = Vec::new();
    walk(schema_name, schema, "", &mut findings);
    findings
}

/// Audit every document the exporter produces.
pub fn audit_exported(exporter: &SchemaExporter) -> Vec<AdditionalPropertiesFinding> {
    exporter
        .export_all()
        .iter()
        .flat_map(|(name, schema)| audit_additional_properties(name, schema))
        .collect()
}

fn walk(schema_name: &str, schema: &Value, path: &str, findings: &mut Vec<AdditionalPropertiesFinding>) {
    let Some(obj) = schema.as_object() else {
        return;
    };

    if is_object_schema(schema) {
        check_object_additional_properties(schema_name, schema, path, findings);
    }

    if let Some(Value::Object(properties)) = obj.get("properties") {
        for (name, sub) in properties {
            walk(
                schema_name,
                sub,
                &format!("{path}/properties/{}", escape_pointer(name)),
                findings,
            );
        }
    }
    for key in ["items", "additionalProperties"] {
        if let Some(sub) = obj.get(key) {
            walk(schema_name, sub, &format!("{path}/{key}"), findings);
        }
    }
    if let Some(Value::Array(variants)) = obj.get("anyOf") {
        for (i, sub) in variants.iter().enumerate() {
            walk(schema_name, sub, &format!("{path}/anyOf/{i}"), findings);
        }
    }
}

fn is_object_schema(schema: &Value) -> bool {
    schema.get("type") == Some(&Value::String("object".to_string()))
        || schema.get("properties").is_some()
        || schema.get("required").is_some()
}

/// Check a single object schema for additionalProperties.
fn check_object_additional_properties(
    schema_name: &str,
    schema: &Value,
    path: &str,
    findings: &mut Vec<AdditionalPropertiesFinding>,
) {
    let is_record = schema.get("properties").is_some();
    let finding = |current_value: &str, recommendation: &str| AdditionalPropertiesFinding {
        schema_name: schema_name.to_string(),
        json_path: format!("{path}/additionalProperties"),
        current_value: current_value.to_string(),
        recommendation: recommendation.to_string(),
    };

    match schema.get("additionalProperties") {
        Some(Value::Bool(false)) => {}
        Some(Value::Bool(true)) => {
            findings.push(finding("true", "Set to false or declare a value schema"));
        }
        None => {
            findings.push(finding(
                "(absent, defaults to true)",
                "Set to false or declare a value schema",
            ));
        }
        Some(Value::Object(_)) if is_record => {
            findings.push(finding(
                "(value schema on a record)",
                "Records list their fields; set to false",
            ));
        }
        Some(_) => {}
    }
}

/// Escape a key for use in a JSON Pointer (RFC 6901).
fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}
