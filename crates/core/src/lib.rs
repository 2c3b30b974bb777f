//! Pure logic for the Nexus bulk-import workflow.
//!
//! This crate has no network or filesystem access. It owns the import
//! session state machine and everything derivable from it: file checks,
//! the preview store, batch partitioning, progress math and the status
//! reporter. The HTTP side lives in `nexus-client`.

pub mod error;
pub mod import;
pub mod types;
