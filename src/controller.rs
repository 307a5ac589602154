//! Top-level action dispatch.
//!
//! The [`Command`] values built from the command line are executed by the
//! [`controller_handler::Controller`], which owns the configuration and the
//! single connection to the endpoint.

use crate::gateway::types::SnapshotSpec;
use crate::session_management::SessionAction;

/// Submodule for the controller and error reporting.
pub mod controller_handler;

pub use controller_handler::{report_error, Controller};

/// Which snapshots a delete removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    Named(String),
    All,
}

/// Snapshot tool actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotCommand {
    List {
        vm_names: Vec<String>,
        older_than: Option<u32>,
        output_width: Option<usize>,
    },
    Create {
        vm: String,
        spec: SnapshotSpec,
    },
    Delete {
        vm: String,
        target: DeleteTarget,
    },
}

/// One invocation of the tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Snapshot(SnapshotCommand),
    Session(SessionAction),
}
