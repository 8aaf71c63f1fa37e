//! # Export Subcommand
//!
//! Writes every registered record's JSON Schema to `<DIR>/<Name>.json`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use bsm_schema::{audit_exported, SchemaExporter, DEFAULT_BASE_URI};

use crate::EXIT_OK;

/// Arguments for the `bsm export` subcommand.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Directory to write the schemas into. Created if absent.
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Base URI for the documents' `$id`s.
    #[arg(long, value_name = "URI", default_value = DEFAULT_BASE_URI)]
    pub base_uri: String,
}

/// Execute the export subcommand.
pub fn run_export(args: &ExportArgs) -> Result<u8> {
    let exporter = SchemaExporter::new(args.base_uri.as_str());

    for finding in audit_exported(&exporter) {
        tracing::warn!("open object schema: {finding}");
    }

    let written = exporter
        .write_all(&args.dir)
        .with_context(|| format!("failed to export schemas to {}", args.dir.display()))?;

    for path in &written {
        println!("wrote {}", path.display());
    }
    Ok(EXIT_OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_export_writes_every_record() {
        let tmp = tempfile::tempdir().unwrap();
        let args = ExportArgs {
            dir: tmp.path().join("out"),
            base_uri: DEFAULT_BASE_URI.to_string(),
        };
        assert_eq!(run_export(&args).unwrap(), EXIT_OK);
        for name in bsm_schema::registry::record_names() {
            assert!(args.dir.join(format!("{name}.json")).is_file(), "{name}");
        }
    }

    #[test]
    fn test_run_export_into_a_file_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("occupied");
        std::fs::write(&file, "x").unwrap();
        let args = ExportArgs {
            dir: file,
            base_uri: DEFAULT_BASE_URI.to_string(),
        };
        let err = run_export(&args).unwrap_err();
        assert!(format!("{err:#}").contains("failed to export schemas"));
    }
}
