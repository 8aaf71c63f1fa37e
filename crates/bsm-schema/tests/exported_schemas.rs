//! Integration test: exported JSON Schema files, checked with `jsonschema`
//! as an independent oracle.

use std::path::PathBuf;

use bsm_schema::{
    audit_exported, check_value, ExportedSchemaValidator, SchemaExporter, RECORDS, ROOT,
};
use serde_json::{json, Value};

fn example() -> Value {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("model-example_smdl.json");
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_exported_files_accept_example() {
    let tmp = tempfile::tempdir().unwrap();
    SchemaExporter::default().write_all(tmp.path()).unwrap();

    let validator = ExportedSchemaValidator::new(tmp.path()).unwrap();
    assert_eq!(validator.schema_count(), RECORDS.len());
    validator.validate_document(&example(), ROOT).unwrap();
}

#[test]
fn test_export_is_byte_identical_across_runs() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let written_a = SchemaExporter::default().write_all(a.path()).unwrap();
    let written_b = SchemaExporter::default().write_all(b.path()).unwrap();
    assert_eq!(written_a.len(), written_b.len());
    for (pa, pb) in written_a.iter().zip(&written_b) {
        assert_eq!(pa.file_name(), pb.file_name());
        assert_eq!(std::fs::read(pa).unwrap(), std::fs::read(pb).unwrap());
    }
}

#[test]
fn test_export_overwrites_existing_files() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("Node.json"), "stale").unwrap();
    SchemaExporter::default().write_all(tmp.path()).unwrap();
    let text = std::fs::read_to_string(tmp.path().join("Node.json")).unwrap();
    assert!(text.starts_with('{'));
}

#[test]
fn test_forbid_policy_audit_is_clean() {
    let findings = audit_exported(&SchemaExporter::default());
    assert!(findings.is_empty(), "findings: {findings:?}");
}

#[test]
fn test_custom_base_uri_still_resolves() {
    let exporter = SchemaExporter::new("https://example.org/schemas/bsm");
    let validator = ExportedSchemaValidator::from_exporter(&exporter);
    validator.validate_document(&example(), ROOT).unwrap();
}

/// Structural rejections agree between the native validator and the
/// exported schemas.
#[test]
fn test_structural_rejections_agree() {
    let validator = ExportedSchemaValidator::from_exporter(&SchemaExporter::default());
    let cases = [
        ("/Nodes/0/Level", json!("run")),
        ("/Nodes/0/Model/X/0", json!(false)),
        ("/Nodes/0/Contrasts/0/Weights/1", json!(null)),
        ("/Nodes/0/Contrasts/0/Test", json!("T")),
        ("/Edges/1/Filter/contrast", json!([])),
        ("/Nodes/0/Model/HRF/Parameters/PeakDelay", json!("6")),
        ("/Name", json!(42)),
    ];
    for (pointer, bad) in cases {
        let mut doc = example();
        *doc.pointer_mut(pointer).unwrap() = bad.clone();
        assert!(
            !check_value(&doc).unwrap().is_empty(),
            "native validator accepted {pointer} = {bad}"
        );
        assert!(
            validator.validate_document(&doc, ROOT).is_err(),
            "exported schema accepted {pointer} = {bad}"
        );
    }

    let mut doc = example();
    doc["Nodes"][1]["Extra"] = json!({});
    assert!(validator.validate_document(&doc, ROOT).is_err());
}
