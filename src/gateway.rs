//! Remote Object Gateway.
//!
//! The management endpoint is reached only through the [`Gateway`] trait. The
//! rest of the crate never knows which backend answers the calls.
//!
//! Components:
//! - `gateway_trait`: the `Gateway` trait and the `Task` handle returned by mutating calls.
//! - `types`: the remote object model (VMs, snapshot forests, sessions).
//! - `inventory_gateway`: backend serving a JSON inventory document.
//! - `connection`: scoped ownership of the authenticated gateway.

pub mod connection;
pub mod gateway_trait;
pub mod inventory_gateway;
pub mod types;

pub use connection::Connection;
pub use gateway_trait::{Gateway, Task};
pub use inventory_gateway::InventoryGateway;
pub use types::{NodeIndex, Session, SnapshotForest, SnapshotNode, SnapshotSpec, Vm};
