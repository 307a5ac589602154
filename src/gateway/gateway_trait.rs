//! Gateway Trait
//!
//! This module defines the `Gateway` trait, the capability surface of the
//! management endpoint, and the `Task` handle returned by mutating calls.
//!
//! All methods return a `Result` carrying a [`GatewayError`]. Calls are
//! blocking and one call is in flight at a time.

use crate::error_handling::types::GatewayError;
use crate::gateway::types::{Session, SnapshotForest, SnapshotNode, SnapshotSpec, Vm};
use uuid::Uuid;

/// Capabilities the endpoint offers to the rest of the crate.
pub trait Gateway {
    /// Lists non-template VMs, restricted to `names` when given.
    fn list_vms(&self, names: Option<&[String]>) -> Result<Vec<Vm>, GatewayError>;

    /// Returns the snapshot forest of `vm`, or `None` when it has no snapshots.
    fn snapshot_tree(&self, vm: &Vm) -> Result<Option<SnapshotForest>, GatewayError>;

    /// Removes `snapshot`. With `remove_children` unset its children move up to
    /// its parent.
    fn delete_snapshot(
        &mut self,
        vm: &Vm,
        snapshot: &SnapshotNode,
        remove_children: bool,
    ) -> Result<Task, GatewayError>;

    /// Takes a new snapshot of `vm`.
    fn create_snapshot(&mut self, vm: &Vm, spec: &SnapshotSpec) -> Result<Task, GatewayError>;

    /// Lists the sessions currently held by the endpoint.
    fn list_sessions(&self) -> Result<Vec<Session>, GatewayError>;

    /// Terminates every session in `keys` in a single call.
    fn terminate_sessions(&mut self, keys: &[String]) -> Result<(), GatewayError>;

    /// Releases the authenticated session of this gateway.
    fn logout(&mut self) -> Result<(), GatewayError>;
}

#[derive(Debug, Clone, PartialEq)]
enum TaskState {
    Success,
    Error(String),
}

/// Handle to a remote operation started by a mutating call.
///
/// Success may only be reported once [`Task::wait`] returned `Ok`.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    id: String,
    description: String,
    state: TaskState,
}

impl Task {
    pub fn succeeded<S: Into<String>>(description: S) -> Self {
        Self::with_state(description.into(), TaskState::Success)
    }

    pub fn failed<S: Into<String>, F: Into<String>>(description: S, fault: F) -> Self {
        Self::with_state(description.into(), TaskState::Error(fault.into()))
    }

    fn with_state(description: String, state: TaskState) -> Self {
        Self {
            id: format!("task-{}", Uuid::new_v4()),
            description,
            state,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Blocks until the task reaches a final state.
    pub fn wait(self) -> Result<(), GatewayError> {
        match self.state {
            TaskState::Success => Ok(()),
            TaskState::Error(fault) => Err(GatewayError::Fault(fault)),
        }
    }
}
