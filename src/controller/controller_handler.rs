use std::io::Write;

use chrono_tz::Tz;
use log::{debug, error};

use crate::configuration::Config;
use crate::controller::{Command, DeleteTarget, SnapshotCommand};
use crate::error_handling::types::*;
use crate::gateway::connection::Connection;
use crate::session_management::SessionManager;
use crate::snapshot_management::report::{SnapshotReport, SortOrder};
use crate::snapshot_management::SnapshotManager;

const AMBIGUOUS_GUIDANCE: &str = "Use the vCenter UI to delete the correct one";

/// The structure dispatching one command against the endpoint
///
/// The controller holds the validated configuration and the process's only
/// [`Connection`]. Dropping the controller logs out.
///
/// # Fields Overview
///
/// - `config`: configuration the connection was opened with
/// - `connection`: authenticated session with the endpoint
pub struct Controller {
    pub config: Config,
    connection: Connection,
}

impl Controller {
    /// Opens the connection described by `config`.
    pub fn new(config: Config) -> Result<Self, ControllerError> {
        match Connection::open(&config) {
            Ok(connection) => Ok(Self::with_connection(config, connection)),
            Err(err) => {
                error!("Unable to connect: {}", err);
                Err(ControllerError::ConnectionFailure(err))
            }
        }
    }

    pub fn with_connection(config: Config, connection: Connection) -> Self {
        Self { config, connection }
    }

    /// Executes `command`, writing its user-facing output to `out`.
    pub fn run<W: Write>(&mut self, command: &Command, out: &mut W) -> Result<(), ControllerError> {
        debug!("Dispatching {:?} on {}", command, self.connection.address());
        match command {
            Command::Snapshot(command) => self.run_snapshot(command, out)?,
            Command::Session(action) => {
                SessionManager::new(self.connection.gateway(), &self.config).execute(action, out)?
            }
        }
        Ok(())
    }

    fn run_snapshot<W: Write>(
        &mut self,
        command: &SnapshotCommand,
        out: &mut W,
    ) -> Result<(), SnapshotError> {
        let mut manager = SnapshotManager::new(self.connection.gateway(), &self.config);
        match command {
            SnapshotCommand::List {
                vm_names,
                older_than,
                output_width,
            } => {
                let names = (!vm_names.is_empty()).then_some(vm_names.as_slice());
                manager.list_snapshots(names, *older_than, *output_width, out)
            }
            SnapshotCommand::Create { vm, spec } => manager.create_snapshot(vm, spec, out),
            SnapshotCommand::Delete {
                vm,
                target: DeleteTarget::Named(name),
            } => manager.delete_snapshot_by_name(vm, name, out),
            SnapshotCommand::Delete {
                vm,
                target: DeleteTarget::All,
            } => manager.delete_snapshots(vm, out),
        }
    }
}

/// Writes the user-facing message for `err`.
///
/// An ambiguous delete is followed by the guidance line and the table of
/// every candidate, rendered in `timezone`.
pub fn report_error<W: Write>(err: &ControllerError, timezone: Tz, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "Error: {}", err)?;
    if let ControllerError::SnapshotError(SnapshotError::AmbiguousMatch { candidates, .. }) = err {
        writeln!(out, "{}", AMBIGUOUS_GUIDANCE)?;
        let mut report = SnapshotReport::new(SortOrder::VmThenCreated);
        for candidate in candidates {
            report.insert(candidate.clone());
        }
        writeln!(out, "{}", report.render(timezone, None))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::config::ConfigFile;
    use crate::configuration::Credentials;
    use crate::gateway::types::SnapshotSpec;
    use crate::session_management::{SessionAction, SortDirection};
    use std::fs;
    use tempfile::TempDir;

    const INVENTORY: &str = r#"{
  "endpoint": { "host": "vc01.lab.local", "port": 443 },
  "accounts": [ { "username": "admin", "password": "s3cret" } ],
  "vms": [
    {
      "name": "web01",
      "current_snapshot": "snapshot-2",
      "snapshots": [
        {
          "id": "snapshot-1", "name": "base", "created": "2026-01-01T00:00:00Z",
          "children": [
            { "id": "snapshot-2", "name": "base", "created": "2026-02-01T00:00:00Z" }
          ]
        }
      ]
    },
    { "name": "db01" }
  ],
  "sessions": [
    {
      "key": "52b6e1f0", "user_name": "alice",
      "login_time": "2020-01-01T08:00:00Z", "last_active_time": "2020-01-01T09:00:00Z"
    },
    {
      "key": "52c0ffee", "user_name": "bob",
      "login_time": "2020-01-01T08:00:00Z", "last_active_time": "2099-01-01T09:00:00Z"
    }
  ]
}"#;

    fn config(dir: &TempDir, host: &str) -> Config {
        let inventory = dir.path().join("inventory.json");
        fs::write(&inventory, INVENTORY).unwrap();
        let file = ConfigFile::from_toml_str(&format!(
            "[endpoint]\nhost = \"{}\"\ninventory = \"{}\"\n",
            host,
            inventory.display()
        ))
        .unwrap();
        Config::from_parts(
            file,
            Credentials {
                username: String::from("admin"),
                password: String::from("s3cret"),
            },
        )
        .unwrap()
    }

    fn run(controller: &mut Controller, command: Command) -> (Result<(), ControllerError>, String) {
        let mut out = Vec::new();
        let result = controller.run(&command, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_unreachable_endpoint() {
        let dir = TempDir::new().unwrap();
        let err = match Controller::new(config(&dir, "vc02.lab.local")) {
            Ok(_) => panic!("connected to the wrong endpoint"),
            Err(err) => err,
        };
        assert!(matches!(err, ControllerError::ConnectionFailure(_)));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_list_all_vms() {
        let dir = TempDir::new().unwrap();
        let mut controller = Controller::new(config(&dir, "vc01.lab.local")).unwrap();
        let (result, out) = run(
            &mut controller,
            Command::Snapshot(SnapshotCommand::List {
                vm_names: Vec::new(),
                older_than: None,
                output_width: None,
            }),
        );
        result.unwrap();

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("web01 base"));
        assert!(lines[3].contains("2026-02-01 00:00:00 UTC"));
    }

    #[test]
    fn test_list_unknown_vm() {
        let dir = TempDir::new().unwrap();
        let mut controller = Controller::new(config(&dir, "vc01.lab.local")).unwrap();
        let (result, _) = run(
            &mut controller,
            Command::Snapshot(SnapshotCommand::List {
                vm_names: vec![String::from("app99")],
                older_than: None,
                output_width: None,
            }),
        );
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            ControllerError::SnapshotError(SnapshotError::VmNotFound(ref vm)) if vm == "app99"
        ));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_ambiguous_delete_reports_candidates() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, "vc01.lab.local");
        let timezone = config.timezone();
        let mut controller = Controller::new(config).unwrap();
        let (result, out) = run(
            &mut controller,
            Command::Snapshot(SnapshotCommand::Delete {
                vm: String::from("web01"),
                target: DeleteTarget::Named(String::from("base")),
            }),
        );
        assert!(out.is_empty());
        let err = result.unwrap_err();
        assert_eq!(err.exit_code(), 1);

        let mut report = Vec::new();
        report_error(&err, timezone, &mut report).unwrap();
        let report = String::from_utf8(report).unwrap();
        assert!(report.starts_with("Error: Found 2 snapshots named 'base' on VM web01\n"));
        assert!(report.contains(AMBIGUOUS_GUIDANCE));
        assert_eq!(report.matches("web01 base").count(), 2);

        let inventory = fs::read_to_string(dir.path().join("inventory.json")).unwrap();
        assert!(inventory.contains("snapshot-2"));
    }

    #[test]
    fn test_create_then_delete_all() {
        let dir = TempDir::new().unwrap();
        let mut controller = Controller::new(config(&dir, "vc01.lab.local")).unwrap();
        let (result, out) = run(
            &mut controller,
            Command::Snapshot(SnapshotCommand::Create {
                vm: String::from("db01"),
                spec: SnapshotSpec {
                    name: String::from("pre-upgrade"),
                    description: None,
                    memory: false,
                    quiesce: true,
                },
            }),
        );
        result.unwrap();
        assert!(out.starts_with("Creating snapshot for VM db01...\nDone.\n"));
        assert!(out.contains("db01 pre-upgrade"));

        let (result, out) = run(
            &mut controller,
            Command::Snapshot(SnapshotCommand::Delete {
                vm: String::from("web01"),
                target: DeleteTarget::All,
            }),
        );
        result.unwrap();
        assert_eq!(out.matches("Done.").count(), 2);
        assert!(out.ends_with("No snapshots found.\n"));
    }

    #[test]
    fn test_session_actions() {
        let dir = TempDir::new().unwrap();
        let mut controller = Controller::new(config(&dir, "vc01.lab.local")).unwrap();

        let (result, _) = run(
            &mut controller,
            Command::Session(SessionAction::View {
                key: Some(String::from("deadbeef")),
                sort: SortDirection::Descending,
            }),
        );
        assert_eq!(result.unwrap_err().exit_code(), 1);

        let (result, out) = run(
            &mut controller,
            Command::Session(SessionAction::Nuke {
                key: None,
                dry_run: false,
            }),
        );
        result.unwrap();
        assert!(out.starts_with("Terminated session 52b6e1f0 (alice)\n"));

        let inventory = fs::read_to_string(dir.path().join("inventory.json")).unwrap();
        assert!(!inventory.contains("52b6e1f0"));
        assert!(inventory.contains("52c0ffee"));
    }
}
