//! Snapshot report: ordering and fixed-width rendering.
//!
//! A report collects flattened [`SnapshotRecord`]s from any number of VMs,
//! orders them under one of two regimes and renders a table whose last column
//! is a 23 character timestamp.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::gateway::types::SnapshotNode;

/// Width of a rendered timestamp, e.g. `2026-01-01 00:00:00 UTC`.
pub const TIMESTAMP_WIDTH: usize = 23;
/// The snapshot column never gets narrower than this.
pub const MIN_SNAPSHOT_WIDTH: usize = 10;
/// Floor for the VM column when it gives up space to the snapshot column.
pub const MIN_VM_WIDTH: usize = 5;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";
const OFFSET_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M %:z";
const EMPTY_NOTICE: &str = "No snapshots found.";

/// One snapshot, flattened for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRecord {
    pub vm_name: String,
    pub snapshot_name: String,
    /// Creation time, seconds since the Unix epoch.
    pub created: i64,
}

impl SnapshotRecord {
    pub fn from_node(node: &SnapshotNode) -> Self {
        Self {
            vm_name: node.vm.clone(),
            snapshot_name: node.name.clone(),
            created: node.created.timestamp(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// VM name ascending, then oldest first.
    VmThenCreated,
    /// Oldest first across all VMs, then VM name. Used for age-filtered reports.
    CreatedThenVm,
}

impl SortOrder {
    pub fn for_age_filter(age_filtered: bool) -> Self {
        if age_filtered {
            SortOrder::CreatedThenVm
        } else {
            SortOrder::VmThenCreated
        }
    }

    fn compare(self, a: &SnapshotRecord, b: &SnapshotRecord) -> Ordering {
        match self {
            SortOrder::VmThenCreated => a
                .vm_name
                .cmp(&b.vm_name)
                .then_with(|| a.created.cmp(&b.created)),
            SortOrder::CreatedThenVm => a
                .created
                .cmp(&b.created)
                .then_with(|| a.vm_name.cmp(&b.vm_name)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnWidths {
    pub vm_name: usize,
    pub snapshot_name: usize,
}

impl ColumnWidths {
    /// Widths for `records`, optionally fitted to a requested total width.
    pub fn compute(records: &[SnapshotRecord], output_width: Option<usize>) -> Self {
        let longest_vm = records
            .iter()
            .map(|r| r.vm_name.chars().count())
            .max()
            .unwrap_or(0);
        let longest_snapshot = records
            .iter()
            .map(|r| r.snapshot_name.chars().count())
            .max()
            .unwrap_or(0);
        Self::fit(longest_vm + 1, longest_snapshot + 1, output_width)
    }

    /// Fits the columns to `output_width`. The snapshot column takes what is
    /// left after the VM and timestamp columns; below [`MIN_SNAPSHOT_WIDTH`]
    /// the deficit is taken from the VM column instead, down to [`MIN_VM_WIDTH`].
    pub fn fit(vm_name: usize, snapshot_name: usize, output_width: Option<usize>) -> Self {
        let Some(output_width) = output_width else {
            return Self {
                vm_name,
                snapshot_name,
            };
        };

        let reserved = vm_name + TIMESTAMP_WIDTH;
        if let Some(available) = output_width
            .checked_sub(reserved)
            .filter(|width| *width >= MIN_SNAPSHOT_WIDTH)
        {
            return Self {
                vm_name,
                snapshot_name: available,
            };
        }

        let deficit = (MIN_SNAPSHOT_WIDTH + reserved).saturating_sub(output_width);
        Self {
            vm_name: vm_name
                .saturating_sub(deficit)
                .max(MIN_VM_WIDTH.min(vm_name)),
            snapshot_name: MIN_SNAPSHOT_WIDTH,
        }
    }

    pub fn total(&self) -> usize {
        self.vm_name
            .saturating_add(self.snapshot_name)
            .saturating_add(TIMESTAMP_WIDTH)
    }
}

/// Renders `epoch` in `timezone`, padded to exactly [`TIMESTAMP_WIDTH`] characters.
///
/// Zones whose abbreviation does not fit are shown with a numeric offset and
/// without seconds.
pub fn format_timestamp(epoch: i64, timezone: Tz) -> String {
    let instant = DateTime::<Utc>::from_timestamp(epoch, 0).unwrap_or_default();
    let local = instant.with_timezone(&timezone);
    let mut rendered = local.format(TIMESTAMP_FORMAT).to_string();
    if rendered.chars().count() > TIMESTAMP_WIDTH {
        rendered = local.format(OFFSET_TIMESTAMP_FORMAT).to_string();
    }
    format!("{:<width$.width$}", rendered, width = TIMESTAMP_WIDTH)
}

/// Keeps `width - 1` characters so that a column always ends with a space.
fn truncate(field: &str, width: usize) -> String {
    field.chars().take(width.saturating_sub(1)).collect()
}

/// Transient, in-memory store of the records of one report.
#[derive(Debug, Clone)]
pub struct SnapshotReport {
    records: Vec<SnapshotRecord>,
    order: SortOrder,
}

impl SnapshotReport {
    pub fn new(order: SortOrder) -> Self {
        Self {
            records: Vec::new(),
            order,
        }
    }

    pub fn insert(&mut self, record: SnapshotRecord) {
        self.records.push(record);
    }

    pub fn extend<'a, I>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = &'a SnapshotNode>,
    {
        self.records
            .extend(nodes.into_iter().map(SnapshotRecord::from_node));
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in report order. Ties keep their insertion order.
    pub fn sorted(&self) -> Vec<&SnapshotRecord> {
        let mut sorted: Vec<&SnapshotRecord> = self.records.iter().collect();
        sorted.sort_by(|a, b| self.order.compare(a, b));
        sorted
    }

    /// Renders the table, or a single notice when there is nothing to show.
    pub fn render(&self, timezone: Tz, output_width: Option<usize>) -> String {
        if self.records.is_empty() {
            return String::from(EMPTY_NOTICE);
        }

        let widths = ColumnWidths::compute(&self.records, output_width);
        let vw = widths.vm_name;
        let sw = widths.snapshot_name;

        let mut lines = Vec::with_capacity(self.records.len() + 2);
        lines.push(format!("{:<vw$}{:<sw$}Created On", "VM", "Snapshot"));
        lines.push("-".repeat(widths.total()));
        for record in self.sorted() {
            lines.push(format!(
                "{:<vw$}{:<sw$}{}",
                truncate(&record.vm_name, vw),
                truncate(&record.snapshot_name, sw),
                format_timestamp(record.created, timezone)
            ));
        }
        lines.join("\n").trim_end().to_string()
    }
}
