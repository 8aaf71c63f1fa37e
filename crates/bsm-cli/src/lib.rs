//! # bsm-cli: Command-Line Tool for BIDS Stats Models
//!
//! Provides the `bsm` command-line interface.
//!
//! ## Subcommands
//!
//! - `bsm export <DIR>`: write one JSON Schema document per record.
//! - `bsm validate <FILE>...`: validate model documents and report every
//!   violation.
//!
//! ```bash
//! bsm export schemas/
//! bsm validate model-example_smdl.json
//! bsm -v validate --json models/*.json
//! ```
//!
//! Handlers return the process exit code: 0 on success, 1 when a document
//! fails validation, 2 on an operational error.

pub mod export;
pub mod validate;

/// Exit code when every input passed.
pub const EXIT_OK: u8 = 0;
/// Exit code when at least one document failed validation.
pub const EXIT_INVALID: u8 = 1;
/// Exit code for operational errors (unreadable input, unwritable output).
pub const EXIT_ERROR: u8 = 2;
