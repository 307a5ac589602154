use std::io::Write;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::{debug, error, info, warn};

use crate::configuration::Config;
use crate::error_handling::types::SnapshotError;
use crate::gateway::gateway_trait::Gateway;
use crate::gateway::types::{SnapshotSpec, Vm};
use crate::snapshot_management::report::{SnapshotRecord, SnapshotReport, SortOrder};
use crate::snapshot_management::resolver::{by_name, resolve, SnapshotFilter};

/// Snapshot operations on top of a [`Gateway`].
///
/// Reports and per-mutation outcomes are written to the `out` sink handed to
/// each operation; diagnostics go to the log.
pub struct SnapshotManager<'a> {
    gateway: &'a mut dyn Gateway,
    timezone: Tz,
}

impl<'a> SnapshotManager<'a> {
    pub fn new(gateway: &'a mut dyn Gateway, config: &Config) -> Self {
        Self {
            gateway,
            timezone: config.timezone(),
        }
    }

    /// Resolves the snapshots of the given VMs (all VMs when `vm_names` is
    /// `None`) into a report ordered for `filter`.
    pub fn collect(
        &self,
        vm_names: Option<&[String]>,
        filter: &SnapshotFilter,
    ) -> Result<SnapshotReport, SnapshotError> {
        let vms = self.gateway.list_vms(vm_names)?;
        if let Some(names) = vm_names {
            if let Some(missing) = names.iter().find(|name| !vms.iter().any(|vm| &vm.name == *name)) {
                return Err(SnapshotError::VmNotFound(missing.clone()));
            }
        }

        let mut report = SnapshotReport::new(SortOrder::for_age_filter(filter.is_age_filtered()));
        for vm in &vms {
            let Some(forest) = self.gateway.snapshot_tree(vm)? else {
                debug!("VM {} has no snapshots", vm.name);
                continue;
            };
            report.extend(resolve(&forest, filter));
        }
        debug!("Collected {} snapshot(s) from {} VM(s)", report.len(), vms.len());
        Ok(report)
    }

    /// Prints the snapshot report of the given VMs.
    pub fn list_snapshots<W: Write>(
        &self,
        vm_names: Option<&[String]>,
        older_than: Option<u32>,
        output_width: Option<usize>,
        out: &mut W,
    ) -> Result<(), SnapshotError> {
        self.list_snapshots_at(vm_names, older_than, output_width, Utc::now(), out)
    }

    /// Same as [`Self::list_snapshots`] with the age cutoff computed from `now`.
    pub fn list_snapshots_at<W: Write>(
        &self,
        vm_names: Option<&[String]>,
        older_than: Option<u32>,
        output_width: Option<usize>,
        now: DateTime<Utc>,
        out: &mut W,
    ) -> Result<(), SnapshotError> {
        let filter = match older_than {
            Some(days) => SnapshotFilter::default().older_than_days(days, now),
            None => SnapshotFilter::default(),
        };
        let report = self.collect(vm_names, &filter)?;
        writeln!(out, "{}", report.render(self.timezone, output_width))?;
        Ok(())
    }

    /// Takes a snapshot of `vm_name`, then lists the VM's snapshots.
    pub fn create_snapshot<W: Write>(
        &mut self,
        vm_name: &str,
        spec: &SnapshotSpec,
        out: &mut W,
    ) -> Result<(), SnapshotError> {
        let vm = self.get_vm(vm_name)?;

        writeln!(out, "Creating snapshot for VM {}...", vm.name)?;
        info!(
            "Creating snapshot {} on {} (memory: {}, quiesce: {})",
            spec.name, vm.name, spec.memory, spec.quiesce
        );
        let task = self.gateway.create_snapshot(&vm, spec)?;
        debug!("Waiting for {}", task.id());
        if let Err(e) = task.wait() {
            error!("Snapshot {} on {} failed: {}", spec.name, vm.name, e);
            return Err(e.into());
        }
        writeln!(out, "Done.")?;

        self.list_snapshots(Some(std::slice::from_ref(&vm.name)), None, None, out)
    }

    /// Deletes the single snapshot of `vm_name` called `snapshot_name`.
    ///
    /// Nothing is deleted when the name is missing or matches several
    /// snapshots; the latter yields [`SnapshotError::AmbiguousMatch`] with every
    /// candidate.
    pub fn delete_snapshot_by_name<W: Write>(
        &mut self,
        vm_name: &str,
        snapshot_name: &str,
        out: &mut W,
    ) -> Result<(), SnapshotError> {
        let vm = self.get_vm(vm_name)?;
        let Some(forest) = self.gateway.snapshot_tree(&vm)? else {
            writeln!(out, "No snapshots found for VM {}", vm.name)?;
            return Ok(());
        };

        let filter = by_name(snapshot_name);
        let matches = resolve(&forest, &filter);
        let snapshot = match matches.as_slice() {
            [] => {
                return Err(SnapshotError::SnapshotNotFound {
                    vm: vm.name,
                    snapshot: snapshot_name.to_string(),
                })
            }
            [single] => (*single).clone(),
            several => {
                warn!(
                    "{} snapshots named '{}' on {}, refusing to delete",
                    several.len(),
                    snapshot_name,
                    vm.name
                );
                return Err(SnapshotError::AmbiguousMatch {
                    vm: vm.name.clone(),
                    snapshot: snapshot_name.to_string(),
                    candidates: several
                        .iter()
                        .map(|node| SnapshotRecord::from_node(node))
                        .collect(),
                });
            }
        };

        writeln!(out, "Deleting snapshot '{}' from {}...", snapshot.name, vm.name)?;
        info!("Deleting snapshot {} ({}) from {}", snapshot.name, snapshot.id, vm.name);
        self.gateway.delete_snapshot(&vm, &snapshot, false)?.wait()?;
        writeln!(out, "Done.")?;

        self.list_snapshots(Some(std::slice::from_ref(&vm.name)), None, None, out)
    }

    /// Deletes every snapshot of `vm_name`, one task per snapshot, in traversal order.
    ///
    /// Each deletion is reported as it completes. The first fault stops the run;
    /// snapshots deleted before it stay deleted.
    pub fn delete_snapshots<W: Write>(
        &mut self,
        vm_name: &str,
        out: &mut W,
    ) -> Result<(), SnapshotError> {
        let vm = self.get_vm(vm_name)?;
        let Some(forest) = self.gateway.snapshot_tree(&vm)? else {
            writeln!(out, "No snapshots found for VM {}", vm.name)?;
            return Ok(());
        };

        for snapshot in resolve(&forest, &SnapshotFilter::default()) {
            writeln!(out, "Deleting snapshot '{}' from {}...", snapshot.name, vm.name)?;
            info!("Deleting snapshot {} ({}) from {}", snapshot.name, snapshot.id, vm.name);
            let outcome = self
                .gateway
                .delete_snapshot(&vm, snapshot, false)
                .and_then(|task| task.wait());
            match outcome {
                Ok(()) => writeln!(out, "Done.")?,
                Err(e) => {
                    error!("Failed to delete snapshot {} from {}: {}", snapshot.name, vm.name, e);
                    writeln!(out, "Failed: {}", e)?;
                    return Err(e.into());
                }
            }
        }

        self.list_snapshots(Some(std::slice::from_ref(&vm.name)), None, None, out)
    }

    fn get_vm(&self, vm_name: &str) -> Result<Vm, SnapshotError> {
        let names = [vm_name.to_string()];
        self.gateway
            .list_vms(Some(names.as_slice()))?
            .into_iter()
            .next()
            .ok_or_else(|| SnapshotError::VmNotFound(vm_name.to_string()))
    }
}
