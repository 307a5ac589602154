use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Args as ClapArgs, Parser, Subcommand};
use log::{debug, info};
use vcadmin::configuration::{Config, LoggingConfig};
use vcadmin::controller::{report_error, Command, Controller, DeleteTarget, SnapshotCommand};
use vcadmin::error_handling::types::{ConfigError, ControllerError};
use vcadmin::gateway::SnapshotSpec;
use vcadmin::session_management::{SessionAction, SortDirection};

const LOG_FILE: &str = "vcadmin.log";

#[derive(Parser)]
#[command(name = "vcadmin")]
#[command(version = "0.1.0")]
#[command(about = "Snapshot and session administration for a vSphere endpoint")]
struct Args {
    /// Configuration file
    #[arg(long, global = true, env = "VCADMIN_CONFIG", default_value = "vcadmin.toml")]
    config: PathBuf,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    tool: Tool,
}

#[derive(Subcommand)]
enum Tool {
    /// Manage VM snapshots
    #[command(subcommand)]
    Snapshot(SnapshotArgs),
    /// Manage login sessions
    #[command(subcommand)]
    Session(SessionArgs),
}

#[derive(Subcommand)]
enum SnapshotArgs {
    /// List the snapshots of the given VMs, or of every VM
    List {
        vm_names: Vec<String>,
        /// Only snapshots created more than DAYS days ago
        #[arg(long, value_name = "DAYS")]
        older_than: Option<u32>,
        /// Fit the table into CHARS columns
        #[arg(long, value_name = "CHARS")]
        output_width: Option<u16>,
    },
    /// Take a snapshot of a VM
    Create {
        vm: String,
        snap: String,
        desc: Option<String>,
        /// Include the VM's memory
        #[arg(long)]
        snap_mem: bool,
        /// Quiesce the guest file system
        #[arg(long)]
        quiesce: bool,
    },
    /// Delete one snapshot by name, or every snapshot of a VM
    Delete(DeleteArgs),
}

#[derive(ClapArgs)]
struct DeleteArgs {
    vm: String,
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    snap: Option<String>,
    /// Delete every snapshot of the VM
    #[arg(long)]
    all: bool,
}

#[derive(Subcommand)]
enum SessionArgs {
    /// Show one session, or all of them ordered by last activity
    View {
        #[arg(long, value_name = "KEY")]
        session: Option<String>,
        #[arg(long, value_enum, default_value = "desc")]
        sort: SortDirection,
    },
    /// Terminate one session, or every session idle for too long
    Nuke {
        #[arg(long, value_name = "KEY")]
        session: Option<String>,
        /// Report what would be terminated without terminating anything
        #[arg(short = 'd', long)]
        noop: bool,
    },
}

impl From<Tool> for Command {
    fn from(tool: Tool) -> Self {
        match tool {
            Tool::Snapshot(SnapshotArgs::List {
                vm_names,
                older_than,
                output_width,
            }) => Command::Snapshot(SnapshotCommand::List {
                vm_names,
                older_than,
                output_width: output_width.map(usize::from),
            }),
            Tool::Snapshot(SnapshotArgs::Create {
                vm,
                snap,
                desc,
                snap_mem,
                quiesce,
            }) => Command::Snapshot(SnapshotCommand::Create {
                vm,
                spec: SnapshotSpec {
                    name: snap,
                    description: desc,
                    memory: snap_mem,
                    quiesce,
                },
            }),
            Tool::Snapshot(SnapshotArgs::Delete(DeleteArgs { vm, snap, .. })) => {
                let target = match snap {
                    Some(name) => DeleteTarget::Named(name),
                    None => DeleteTarget::All,
                };
                Command::Snapshot(SnapshotCommand::Delete { vm, target })
            }
            Tool::Session(SessionArgs::View { session, sort }) => {
                Command::Session(SessionAction::View { key: session, sort })
            }
            Tool::Session(SessionArgs::Nuke { session, noop }) => {
                Command::Session(SessionAction::Nuke {
                    key: session,
                    dry_run: noop,
                })
            }
        }
    }
}

fn init_logging(logging: &LoggingConfig, verbose: bool) -> Result<(), ConfigError> {
    let level = if verbose || logging.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).format_target(false).parse_default_env();
    if let Some(dir) = &logging.log_dir {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(LOG_FILE))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn load_config(path: &Path, verbose: bool) -> Result<Config, ConfigError> {
    let config = Config::from_file(path)?;
    init_logging(&config.logging, verbose)?;
    info!("Configuration imported from {}", path.display());
    Ok(config)
}

/// Runs one invocation and returns the process exit status.
///
/// The controller, and with it the connection, is dropped before returning.
fn execute(args: Args) -> i32 {
    let config = match load_config(&args.config, args.verbose) {
        Ok(config) => config,
        Err(err) => {
            let err = ControllerError::from(err);
            let _ = report_error(&err, chrono_tz::Tz::UTC, &mut io::stderr());
            return err.exit_code();
        }
    };
    let timezone = config.timezone();
    let command = Command::from(args.tool);

    let outcome = Controller::new(config).and_then(|mut controller| {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        let result = controller.run(&command, &mut out);
        let _ = out.flush();
        result
    });

    match outcome {
        Ok(()) => {
            debug!("Command completed");
            0
        }
        Err(err) => {
            let _ = report_error(&err, timezone, &mut io::stderr());
            err.exit_code()
        }
    }
}

fn main() {
    let args = Args::parse();
    let code = execute(args);
    std::process::exit(code);
}
