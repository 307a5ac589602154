//! Remote object model handed out by a [`super::Gateway`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A virtual machine known to the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vm {
    pub name: String,
}

/// Stable position of a node inside a [`SnapshotForest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIndex(usize);

/// One snapshot of a VM.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotNode {
    /// Endpoint identifier, stable across re-parenting.
    pub id: String,
    /// Display name, not unique within a tree.
    pub name: String,
    pub description: String,
    pub created: DateTime<Utc>,
    /// Name of the owning VM.
    pub vm: String,
    /// Children in the order the endpoint reports them.
    pub children: Vec<NodeIndex>,
}

/// Snapshot tree(s) of a single VM, stored as an arena.
///
/// Nodes are only ever appended, so a [`NodeIndex`] stays valid for the
/// lifetime of the forest. Each forest is a transient view built per call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotForest {
    vm: String,
    nodes: Vec<SnapshotNode>,
    roots: Vec<NodeIndex>,
}

impl SnapshotForest {
    pub fn new<S: Into<String>>(vm: S) -> Self {
        Self {
            vm: vm.into(),
            nodes: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Appends a node under `parent`, or as a new root when `parent` is `None`.
    ///
    /// # Panics
    /// Panics if `parent` does not belong to this forest.
    pub fn push(
        &mut self,
        parent: Option<NodeIndex>,
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        created: DateTime<Utc>,
    ) -> NodeIndex {
        let index = NodeIndex(self.nodes.len());
        self.nodes.push(SnapshotNode {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            created,
            vm: self.vm.clone(),
            children: Vec::new(),
        });
        match parent {
            Some(parent) => self.nodes[parent.0].children.push(index),
            None => self.roots.push(index),
        }
        index
    }

    pub fn vm_name(&self) -> &str {
        &self.vm
    }

    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    pub fn node(&self, index: NodeIndex) -> &SnapshotNode {
        &self.nodes[index.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Parameters of a snapshot to take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSpec {
    pub name: String,
    pub description: Option<String>,
    /// Include the VM's memory in the snapshot.
    pub memory: bool,
    /// Quiesce the guest file system first.
    pub quiesce: bool,
}

/// A login session held by the endpoint.
///
/// Timestamps are normalized to UTC on deserialization, whatever offset the
/// endpoint reported them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub key: String,
    pub user_name: String,
    #[serde(default)]
    pub full_name: String,
    pub login_time: DateTime<Utc>,
    pub last_active_time: DateTime<Utc>,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub message_locale: String,
    #[serde(default)]
    pub extension_session: bool,
    #[serde(default)]
    pub call_count: u64,
}
