use std::fmt;

use crate::snapshot_management::report::SnapshotRecord;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    MissingCredentials(String),
    InvalidTimezone(String),
    DirectoryDoesNotExist(String),
    NotInRange(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::MissingCredentials(e) => write!(f, "Missing credentials: {}", e),
            ConfigError::InvalidTimezone(e) => write!(f, "Invalid timezone: {}", e),
            ConfigError::DirectoryDoesNotExist(e) => write!(f, "Directory error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// Failures reported by a [`crate::gateway::Gateway`] backend.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// The endpoint could not be reached or refused the credentials.
    ConnectionFailed(String),
    /// The backing inventory could not be read or written.
    InventoryError(String),
    /// Structured failure raised by the endpoint during a call, kept verbatim.
    Fault(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::ConnectionFailed(e) => write!(f, "Connection failed: {}", e),
            GatewayError::InventoryError(e) => write!(f, "Inventory error: {}", e),
            GatewayError::Fault(e) => write!(f, "Remote fault: {}", e),
        }
    }
}

impl std::error::Error for GatewayError {}

#[derive(Debug)]
pub enum SnapshotError {
    VmNotFound(String),
    SnapshotNotFound { vm: String, snapshot: String },
    AmbiguousMatch {
        vm: String,
        snapshot: String,
        candidates: Vec<SnapshotRecord>,
    },
    GatewayError(GatewayError),
    OutputError(std::io::Error),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::VmNotFound(vm) => write!(f, "VM not found: {}", vm),
            SnapshotError::SnapshotNotFound { vm, snapshot } => {
                write!(f, "Snapshot {} not found on VM {}", snapshot, vm)
            }
            SnapshotError::AmbiguousMatch {
                vm,
                snapshot,
                candidates,
            } => write!(
                f,
                "Found {} snapshots named '{}' on VM {}",
                candidates.len(),
                snapshot,
                vm
            ),
            SnapshotError::GatewayError(e) => write!(f, "{}", e),
            SnapshotError::OutputError(e) => write!(f, "Output error: {}", e),
        }
    }
}

impl std::error::Error for SnapshotError {}

impl From<GatewayError> for SnapshotError {
    fn from(err: GatewayError) -> Self {
        SnapshotError::GatewayError(err)
    }
}

impl From<std::io::Error> for SnapshotError {
    fn from(err: std::io::Error) -> Self {
        SnapshotError::OutputError(err)
    }
}

#[derive(Debug)]
pub enum SessionError {
    NotFound(String),
    GatewayError(GatewayError),
    OutputError(std::io::Error),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotFound(key) => write!(f, "Session not found: {}", key),
            SessionError::GatewayError(e) => write!(f, "{}", e),
            SessionError::OutputError(e) => write!(f, "Output error: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<GatewayError> for SessionError {
    fn from(err: GatewayError) -> Self {
        SessionError::GatewayError(err)
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::OutputError(err)
    }
}

#[derive(Debug)]
pub enum ControllerError {
    ConfigurationError(ConfigError),
    ConnectionFailure(GatewayError),
    SnapshotError(SnapshotError),
    SessionError(SessionError),
}

impl ControllerError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ControllerError::ConfigurationError(_) => 2,
            ControllerError::ConnectionFailure(_) => 3,
            ControllerError::SnapshotError(SnapshotError::GatewayError(
                GatewayError::ConnectionFailed(_),
            ))
            | ControllerError::SessionError(SessionError::GatewayError(
                GatewayError::ConnectionFailed(_),
            )) => 3,
            ControllerError::SnapshotError(_) | ControllerError::SessionError(_) => 1,
        }
    }
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            ControllerError::ConnectionFailure(e) => write!(f, "{}", e),
            ControllerError::SnapshotError(e) => write!(f, "{}", e),
            ControllerError::SessionError(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::ConfigurationError(err)
    }
}

impl From<SnapshotError> for ControllerError {
    fn from(err: SnapshotError) -> Self {
        ControllerError::SnapshotError(err)
    }
}

impl From<SessionError> for ControllerError {
    fn from(err: SessionError) -> Self {
        ControllerError::SessionError(err)
    }
}
