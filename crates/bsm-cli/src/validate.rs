//! # Validate Subcommand
//!
//! Loads BIDS Stats Model documents and validates each one. A document that
//! fails validation is a normal outcome and is reported, not raised; only
//! input that cannot be read at all is an operational error.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use bsm_schema::{validate_str, DocumentError, Violation};

use crate::{EXIT_INVALID, EXIT_OK};

/// Arguments for the `bsm validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Model documents to validate.
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Print one JSON report per file instead of text.
    #[arg(long)]
    pub json: bool,
}

/// Outcome of validating a single document.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Pass {
        nodes: usize,
        edges: usize,
    },
    Fail {
        violations: Vec<Violation>,
    },
    /// Not well-formed JSON.
    Malformed {
        line: usize,
        column: usize,
        reason: String,
    },
}

/// The result of validating one file.
#[derive(Debug, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl FileReport {
    pub fn passed(&self) -> bool {
        matches!(self.outcome, Outcome::Pass { .. })
    }
}

impl fmt::Display for FileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Pass { nodes, edges } => write!(
                f,
                "PASS: {} ({nodes} node(s), {edges} edge(s))",
                self.path.display()
            ),
            Outcome::Fail { violations } => {
                write!(
                    f,
                    "FAIL: {} ({} violation(s))",
                    self.path.display(),
                    violations.len()
                )?;
                for v in violations {
                    write!(f, "\n  {v}")?;
                }
                Ok(())
            }
            Outcome::Malformed {
                line,
                column,
                reason,
            } => write!(
                f,
                "FAIL: {} (invalid JSON at line {line}, column {column}: {reason})",
                self.path.display()
            ),
        }
    }
}

/// Read and validate one document.
///
/// # Errors
///
/// Fails only when the file cannot be read or the constraint model is
/// internally inconsistent; an invalid document is an `Ok` report.
pub fn validate_file(path: &Path) -> Result<FileReport> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;

    let outcome = match validate_str(&text) {
        Ok(model) => Outcome::Pass {
            nodes: model.nodes.len(),
            edges: model.edges().len(),
        },
        Err(DocumentError::Invalid(violations)) => Outcome::Fail {
            violations: violations.into_inner(),
        },
        Err(DocumentError::Parse {
            line,
            column,
            reason,
        }) => Outcome::Malformed {
            line,
            column,
            reason,
        },
        Err(other) => {
            return Err(other).with_context(|| format!("cannot validate {}", path.display()))
        }
    };

    Ok(FileReport {
        path: path.to_path_buf(),
        outcome,
    })
}

/// Execute the validate subcommand.
///
/// Returns exit code: 0 when every document passes, 1 when any fails.
/// Operational errors propagate as `Err`.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let mut failed = 0usize;

    for path in &args.files {
        let report = validate_file(path)?;
        tracing::info!(
            path = %path.display(),
            passed = report.passed(),
            "validated document"
        );
        if !report.passed() {
            failed += 1;
        }
        if args.json {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            println!("{report}");
        }
    }

    if !args.json {
        println!(
            "\n{}/{} document(s) passed",
            args.files.len() - failed,
            args.files.len()
        );
    }

    if failed > 0 {
        Ok(EXIT_INVALID)
    } else {
        Ok(EXIT_OK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "Name": "m",
        "BIDSModelVersion": "1.0.0",
        "Nodes": [{
            "Level": "Run",
            "Name": "run",
            "GroupBy": ["run", "subject"],
            "Model": {"Type": "glm", "X": [1]}
        }]
    }"#;

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_valid_file_passes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "ok.json", VALID);
        let report = validate_file(&path).unwrap();
        assert!(report.passed());
        assert!(report.to_string().starts_with("PASS: "));
    }

    #[test]
    fn test_invalid_file_lists_violations() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "bad.json", &VALID.replace("\"Run\"", "\"run\""));
        let report = validate_file(&path).unwrap();
        assert!(!report.passed());
        let text = report.to_string();
        assert!(text.starts_with("FAIL: "));
        assert!(text.contains("Nodes[0].Level: expected one of: Run, Session, Subject, Dataset"));
    }

    #[test]
    fn test_malformed_file_is_a_failure_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "broken.json", "{\"Name\": ");
        let report = validate_file(&path).unwrap();
        assert!(matches!(report.outcome, Outcome::Malformed { .. }));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = validate_file(&tmp.path().join("absent.json")).unwrap_err();
        assert!(format!("{err:#}").contains("cannot read"));
    }

    #[test]
    fn test_run_validate_exit_codes() {
        let tmp = tempfile::tempdir().unwrap();
        let ok = write(tmp.path(), "ok.json", VALID);
        let bad = write(tmp.path(), "bad.json", "[]");

        let all_ok = ValidateArgs {
            files: vec![ok.clone()],
            json: false,
        };
        assert_eq!(run_validate(&all_ok).unwrap(), EXIT_OK);

        let mixed = ValidateArgs {
            files: vec![ok, bad],
            json: true,
        };
        assert_eq!(run_validate(&mixed).unwrap(), EXIT_INVALID);
    }

    #[test]
    fn test_json_report_shape() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(tmp.path(), "bad.json", &VALID.replace("\"glm\"", "\"GLM\""));
        let report = validate_file(&path).unwrap();
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "fail");
        assert_eq!(value["violations"][0]["path"], "Nodes[0].Model.Type");
        assert_eq!(value["violations"][0]["kind"], "type_mismatch");
    }
}
