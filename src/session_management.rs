//! Session management core module.
//!
//! This module classifies the sessions held by the endpoint by idle time and
//! applies the view and nuke actions to them.

use clap::ValueEnum;

/// Submodule for idle-time classification.
pub mod classifier;
/// Submodule for the action executor.
pub mod session_manager;

pub use classifier::{classify, idle_duration, Classification};
pub use session_manager::{SessionCapture, SessionManager};

/// Direction of the last-activity ordering in the session table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortDirection {
    #[value(name = "asc")]
    Ascending,
    #[value(name = "desc")]
    Descending,
}

/// What to do with the captured sessions.
///
/// Variants:
/// - `View`: show one session in detail, or all of them as a table.
/// - `Nuke`: terminate one session, or sweep every expired session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    View {
        key: Option<String>,
        sort: SortDirection,
    },
    Nuke {
        key: Option<String>,
        dry_run: bool,
    },
}
