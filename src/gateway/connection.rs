//! Scoped ownership of the authenticated gateway.

use log::{debug, warn};

use crate::configuration::Config;
use crate::error_handling::types::GatewayError;
use crate::gateway::gateway_trait::Gateway;
use crate::gateway::inventory_gateway::InventoryGateway;

/// The single connection of the process to the endpoint.
///
/// Logging out happens when the connection is dropped, on success and error
/// paths alike.
pub struct Connection {
    gateway: Box<dyn Gateway>,
    address: String,
}

impl Connection {
    /// Authenticates against the endpoint named in `config`.
    pub fn open(config: &Config) -> Result<Self, GatewayError> {
        let gateway = InventoryGateway::authenticate(&config.endpoint, &config.credentials)?;
        Ok(Self::new(
            Box::new(gateway),
            format!("{}:{}", config.endpoint.host, config.endpoint.port),
        ))
    }

    pub fn new(gateway: Box<dyn Gateway>, address: String) -> Self {
        debug!("Connection to {} acquired", address);
        Self { gateway, address }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn gateway(&mut self) -> &mut dyn Gateway {
        self.gateway.as_mut()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        match self.gateway.logout() {
            Ok(()) => debug!("Connection to {} released", self.address),
            Err(e) => warn!("Failed to log out from {}: {}", self.address, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::types::{Session, SnapshotForest, SnapshotNode, SnapshotSpec, Vm};
    use crate::gateway::Task;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingGateway {
        logouts: Rc<Cell<usize>>,
    }

    impl Gateway for CountingGateway {
        fn list_vms(&self, _names: Option<&[String]>) -> Result<Vec<Vm>, GatewayError> {
            Ok(Vec::new())
        }
        fn snapshot_tree(&self, _vm: &Vm) -> Result<Option<SnapshotForest>, GatewayError> {
            Ok(None)
        }
        fn delete_snapshot(
            &mut self,
            _vm: &Vm,
            _snapshot: &SnapshotNode,
            _remove_children: bool,
        ) -> Result<Task, GatewayError> {
            Err(GatewayError::Fault(String::from("unsupported")))
        }
        fn create_snapshot(&mut self, _vm: &Vm, _spec: &SnapshotSpec) -> Result<Task, GatewayError> {
            Err(GatewayError::Fault(String::from("unsupported")))
        }
        fn list_sessions(&self) -> Result<Vec<Session>, GatewayError> {
            Ok(Vec::new())
        }
        fn terminate_sessions(&mut self, _keys: &[String]) -> Result<(), GatewayError> {
            Ok(())
        }
        fn logout(&mut self) -> Result<(), GatewayError> {
            self.logouts.set(self.logouts.get() + 1);
            Ok(())
        }
    }

    fn failing_operation(connection: &mut Connection) -> Result<(), GatewayError> {
        connection.gateway().terminate_sessions(&[])?;
        Err(GatewayError::Fault(String::from("InvalidState")))
    }

    #[test]
    fn test_logout_on_drop_after_error() {
        let logouts = Rc::new(Cell::new(0));
        {
            let mut connection = Connection::new(
                Box::new(CountingGateway {
                    logouts: Rc::clone(&logouts),
                }),
                String::from("vc01:443"),
            );
            assert_eq!(connection.address(), "vc01:443");
            assert!(failing_operation(&mut connection).is_err());
            assert_eq!(logouts.get(), 0);
        }
        assert_eq!(logouts.get(), 1);
    }
}
