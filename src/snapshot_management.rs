//! Snapshot subsystem.
//!
//! - `resolver`: depth-first flattening and filtering of a snapshot forest.
//! - `report`: sorting and fixed-width rendering of resolved snapshots.
//! - `snapshot_manager`: list, create and delete operations against a gateway.

pub mod report;
pub mod resolver;
pub mod snapshot_manager;

pub use report::{ColumnWidths, SnapshotRecord, SnapshotReport, SortOrder};
pub use resolver::{resolve, SnapshotFilter};
pub use snapshot_manager::SnapshotManager;
