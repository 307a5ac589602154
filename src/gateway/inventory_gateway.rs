//! Gateway backend serving a JSON inventory document.
//!
//! The document describes one endpoint: its address, the accounts allowed to
//! log in, the VMs with their nested snapshot trees, and the open sessions.
//! Mutations are written back to the document before the returned task
//! completes.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::configuration::types::{Credentials, EndpointConfig};
use crate::error_handling::types::GatewayError;
use crate::gateway::gateway_trait::{Gateway, Task};
use crate::gateway::types::{NodeIndex, Session, SnapshotForest, SnapshotNode, SnapshotSpec, Vm};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EndpointEntry {
    host: String,
    port: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccountEntry {
    username: String,
    password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotEntry {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    created: DateTime<Utc>,
    #[serde(default)]
    memory: bool,
    #[serde(default)]
    quiesced: bool,
    #[serde(default)]
    children: Vec<SnapshotEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VmEntry {
    name: String,
    #[serde(default)]
    template: bool,
    #[serde(default)]
    current_snapshot: Option<String>,
    #[serde(default)]
    snapshots: Vec<SnapshotEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct InventoryDocument {
    endpoint: EndpointEntry,
    #[serde(default)]
    accounts: Vec<AccountEntry>,
    #[serde(default)]
    vms: Vec<VmEntry>,
    #[serde(default)]
    sessions: Vec<Session>,
}

pub struct InventoryGateway {
    path: PathBuf,
    document: InventoryDocument,
    user: String,
    logged_in: bool,
}

impl InventoryGateway {
    /// Logs in to the endpoint described by `endpoint`.
    ///
    /// Fails with [`GatewayError::ConnectionFailed`] when the inventory cannot
    /// be loaded, when it describes another host or port, or when it lists
    /// accounts and none matches `credentials`.
    pub fn authenticate(
        endpoint: &EndpointConfig,
        credentials: &Credentials,
    ) -> Result<Self, GatewayError> {
        let address = format!("{}:{}", endpoint.host, endpoint.port);
        info!("Connecting to {} as {}", address, credentials.username);

        if !endpoint.verify_tls {
            warn!("TLS certificate verification is disabled for {}", address);
        }

        let document = Self::load(&endpoint.inventory).map_err(|e| {
            error!("Unable to reach {}: {}", address, e);
            GatewayError::ConnectionFailed(format!("{}: {}", address, e))
        })?;

        if !document.endpoint.host.eq_ignore_ascii_case(&endpoint.host)
            || document.endpoint.port != endpoint.port
        {
            error!(
                "Inventory {} serves {}:{}, not {}",
                endpoint.inventory.display(),
                document.endpoint.host,
                document.endpoint.port,
                address
            );
            return Err(GatewayError::ConnectionFailed(format!(
                "no endpoint listening at {}",
                address
            )));
        }

        if !document.accounts.is_empty()
            && !document.accounts.iter().any(|a| {
                a.username == credentials.username && a.password == credentials.password
            })
        {
            error!("Login rejected for {} on {}", credentials.username, address);
            return Err(GatewayError::ConnectionFailed(format!(
                "{}: cannot complete login due to an incorrect user name or password",
                address
            )));
        }

        info!("Connected to {}", address);
        Ok(Self {
            path: endpoint.inventory.clone(),
            document,
            user: credentials.username.clone(),
            logged_in: true,
        })
    }

    fn load(path: &Path) -> Result<InventoryDocument, GatewayError> {
        let content = fs::read_to_string(path)
            .map_err(|e| GatewayError::InventoryError(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| GatewayError::InventoryError(format!("{}: {}", path.display(), e)))
    }

    fn save(&self) -> Result<(), GatewayError> {
        let content = serde_json::to_string_pretty(&self.document)
            .map_err(|e| GatewayError::InventoryError(e.to_string()))?;
        fs::write(&self.path, content).map_err(|e| {
            error!("Failed to write inventory {}: {}", self.path.display(), e);
            GatewayError::InventoryError(format!("{}: {}", self.path.display(), e))
        })?;
        debug!("Saved inventory to {}", self.path.display());
        Ok(())
    }

    fn ensure_logged_in(&self) -> Result<(), GatewayError> {
        if self.logged_in {
            Ok(())
        } else {
            Err(GatewayError::Fault(String::from(
                "NotAuthenticated: the session is not authenticated",
            )))
        }
    }

    fn vm_entry(&self, name: &str) -> Result<&VmEntry, GatewayError> {
        self.document
            .vms
            .iter()
            .find(|vm| vm.name == name)
            .ok_or_else(|| vm_not_found(name))
    }

    fn vm_entry_mut(&mut self, name: &str) -> Result<&mut VmEntry, GatewayError> {
        self.document
            .vms
            .iter_mut()
            .find(|vm| vm.name == name)
            .ok_or_else(|| vm_not_found(name))
    }
}

fn vm_not_found(name: &str) -> GatewayError {
    GatewayError::Fault(format!("ManagedObjectNotFound: virtual machine {}", name))
}

/// Builds the arena view of a nested snapshot list, breadth first so that
/// children keep their document order.
fn build_forest(vm: &str, entries: &[SnapshotEntry]) -> SnapshotForest {
    let mut forest = SnapshotForest::new(vm);
    let mut queue: VecDeque<(Option<NodeIndex>, &SnapshotEntry)> =
        entries.iter().map(|entry| (None, entry)).collect();

    while let Some((parent, entry)) = queue.pop_front() {
        let index = forest.push(
            parent,
            entry.id.as_str(),
            entry.name.as_str(),
            entry.description.as_str(),
            entry.created,
        );
        queue.extend(entry.children.iter().map(|child| (Some(index), child)));
    }
    forest
}

fn find_entry_mut<'a>(entries: &'a mut [SnapshotEntry], id: &str) -> Option<&'a mut SnapshotEntry> {
    for entry in entries.iter_mut() {
        if entry.id == id {
            return Some(entry);
        }
        if let Some(found) = find_entry_mut(&mut entry.children, id) {
            return Some(found);
        }
    }
    None
}

fn contains_entry(entries: &[SnapshotEntry], id: &str) -> bool {
    entries
        .iter()
        .any(|entry| entry.id == id || contains_entry(&entry.children, id))
}

/// Removes the entry `id`, returning the id of its parent (`Some(None)` for a root).
fn remove_entry(
    entries: &mut Vec<SnapshotEntry>,
    parent: Option<&str>,
    id: &str,
    remove_children: bool,
) -> Option<Option<String>> {
    if let Some(position) = entries.iter().position(|entry| entry.id == id) {
        let removed = entries.remove(position);
        if !remove_children {
            for (offset, child) in removed.children.into_iter().enumerate() {
                entries.insert(position + offset, child);
            }
        }
        return Some(parent.map(str::to_string));
    }

    for entry in entries.iter_mut() {
        if let Some(found) = remove_entry(
            &mut entry.children,
            Some(entry.id.as_str()),
            id,
            remove_children,
        ) {
            return Some(found);
        }
    }
    None
}

impl Gateway for InventoryGateway {
    fn list_vms(&self, names: Option<&[String]>) -> Result<Vec<Vm>, GatewayError> {
        self.ensure_logged_in()?;
        let vms: Vec<Vm> = self
            .document
            .vms
            .iter()
            .filter(|vm| !vm.template)
            .filter(|vm| names.map_or(true, |names| names.contains(&vm.name)))
            .map(|vm| Vm {
                name: vm.name.clone(),
            })
            .collect();
        debug!("Listed {} VM(s)", vms.len());
        Ok(vms)
    }

    fn snapshot_tree(&self, vm: &Vm) -> Result<Option<SnapshotForest>, GatewayError> {
        self.ensure_logged_in()?;
        let entry = self.vm_entry(&vm.name)?;
        if entry.snapshots.is_empty() {
            return Ok(None);
        }
        let forest = build_forest(&entry.name, &entry.snapshots);
        debug!("VM {} has {} snapshot(s)", vm.name, forest.len());
        Ok(Some(forest))
    }

    fn delete_snapshot(
        &mut self,
        vm: &Vm,
        snapshot: &SnapshotNode,
        remove_children: bool,
    ) -> Result<Task, GatewayError> {
        self.ensure_logged_in()?;
        let entry = self.vm_entry_mut(&vm.name)?;

        let parent = remove_entry(&mut entry.snapshots, None, &snapshot.id, remove_children)
            .ok_or_else(|| {
                GatewayError::Fault(format!(
                    "ManagedObjectNotFound: snapshot {} on {}",
                    snapshot.id, vm.name
                ))
            })?;

        let current_gone = entry
            .current_snapshot
            .as_deref()
            .map_or(false, |current| !contains_entry(&entry.snapshots, current));
        if current_gone {
            entry.current_snapshot = parent;
        }

        self.save()?;
        info!(
            "Removed snapshot {} ({}) from {}",
            snapshot.name, snapshot.id, vm.name
        );
        Ok(Task::succeeded(format!(
            "Remove snapshot {} from {}",
            snapshot.name, vm.name
        )))
    }

    fn create_snapshot(&mut self, vm: &Vm, spec: &SnapshotSpec) -> Result<Task, GatewayError> {
        self.ensure_logged_in()?;
        let description = format!("Create snapshot {} on {}", spec.name, vm.name);
        if spec.name.trim().is_empty() {
            return Ok(Task::failed(
                description,
                "InvalidName: the snapshot name must not be empty",
            ));
        }

        let entry = self.vm_entry_mut(&vm.name)?;
        let new_entry = SnapshotEntry {
            id: format!("snapshot-{}", Uuid::new_v4().simple()),
            name: spec.name.clone(),
            description: spec.description.clone().unwrap_or_default(),
            created: Utc::now(),
            memory: spec.memory,
            quiesced: spec.quiesce,
            children: Vec::new(),
        };
        let new_id = new_entry.id.clone();

        let parent = match entry.current_snapshot.clone() {
            Some(current) => find_entry_mut(&mut entry.snapshots, &current),
            None => None,
        };
        match parent {
            Some(parent) => parent.children.push(new_entry),
            None => entry.snapshots.push(new_entry),
        }
        entry.current_snapshot = Some(new_id.clone());

        self.save()?;
        info!("Created snapshot {} ({}) on {}", spec.name, new_id, vm.name);
        Ok(Task::succeeded(description))
    }

    fn list_sessions(&self) -> Result<Vec<Session>, GatewayError> {
        self.ensure_logged_in()?;
        Ok(self.document.sessions.clone())
    }

    fn terminate_sessions(&mut self, keys: &[String]) -> Result<(), GatewayError> {
        self.ensure_logged_in()?;
        if let Some(missing) = keys
            .iter()
            .find(|key| !self.document.sessions.iter().any(|s| &s.key == *key))
        {
            return Err(GatewayError::Fault(format!(
                "NotFound: session {} does not exist",
                missing
            )));
        }

        self.document
            .sessions
            .retain(|session| !keys.contains(&session.key));
        self.save()?;
        info!("Terminated {} session(s)", keys.len());
        Ok(())
    }

    fn logout(&mut self) -> Result<(), GatewayError> {
        if self.logged_in {
            self.logged_in = false;
            debug!("Logged out {} from {}", self.user, self.document.endpoint.host);
        }
        Ok(())
    }
}
