//! Command-line argument structures for the mibward binary.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default location of the MIB database.
pub const DEFAULT_DB_PATH: &str = "/var/lib/mibward/mibward.db";

/// Pass-persist MIB extension agent.
///
/// Keeps a typed, persistent OID tree, answers GET/GETNEXT/SET frames from
/// the SNMP master agent over stdin/stdout, and runs shell-command events
/// attached to OIDs.
#[derive(Debug, Parser)]
#[command(name = "mibward", version, about, subcommand_required = true)]
pub struct Cli {
    /// Log level: error, warn, info, debug or trace.
    #[arg(
        short = 'l',
        long = "log-level",
        value_name = "LEVEL",
        default_value = "warn",
        global = true
    )]
    pub log_level: String,

    /// Append log output to this file instead of stderr.
    #[arg(short = 'L', long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Path to the MIB database.
    #[arg(
        short = 'd',
        long = "database",
        value_name = "PATH",
        default_value = DEFAULT_DB_PATH,
        global = true
    )]
    pub database: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run as a pass_persist co-process on stdin/stdout.
    Daemon,

    /// One-shot GET; prints the same frame the daemon would.
    Get {
        /// Requested OID, dotted decimal.
        oid: String,
    },

    /// One-shot GETNEXT; prints the same frame the daemon would.
    #[command(name = "getnext")]
    GetNext {
        /// Starting OID, dotted decimal.
        oid: String,
    },

    /// One-shot SET; prints the same frame the daemon would.
    Set {
        /// Target OID, dotted decimal.
        oid: String,
        /// Declared type tag, e.g. INTEGER or COUNTER32.
        datatype: String,
        /// New printable value.
        value: String,
    },

    /// Load a compiled MIB under the given root OID.
    #[command(name = "parse-mib")]
    ParseMib {
        /// Root OID every record must live under.
        root_oid: String,
        /// Compiled MIB file (one oid|TYPE|access|name[|value] record per line).
        mib_file: PathBuf,
    },

    /// Register scheduling events from a file, or interactively when no file
    /// is given.
    Schedule {
        /// Scheduling file (OID;MODE;TIMEOUT;COMMAND[;COMMAND...] per line).
        file: Option<PathBuf>,
    },

    /// Write the registered events out in scheduling-file format.
    #[command(name = "dump-schedule")]
    DumpSchedule {
        /// Destination file; stdout when omitted.
        file: Option<PathBuf>,
    },

    /// Delete every OID and every event.
    Reset,

    /// Overwrite an OID value directly, bypassing access-mode checks.
    Change {
        /// Target OID, dotted decimal.
        oid: String,
        /// New printable value.
        value: String,
    },
}

/// Initialize tracing from the global flags.
///
/// Daemon mode owns stdout for the wire protocol, so log output goes to
/// stderr or, with `-L`, to an append-only file.
pub fn init_tracing(level: &str, log_file: Option<&Path>) -> std::io::Result<()> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::new(format!("mibward={level}"));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Arc::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_daemon() {
        let cli = Cli::try_parse_from(["mibward", "daemon"]).unwrap();
        assert!(matches!(cli.command, Command::Daemon));
        assert_eq!(cli.log_level, "warn");
        assert_eq!(cli.database, PathBuf::from(DEFAULT_DB_PATH));
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "mibward", "-l", "debug", "-L", "/tmp/mibward.log", "-d", "/tmp/mib.db", "daemon",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        assert_eq!(cli.log_file, Some(PathBuf::from("/tmp/mibward.log")));
        assert_eq!(cli.database, PathBuf::from("/tmp/mib.db"));
    }

    #[test]
    fn test_parse_set() {
        let cli =
            Cli::try_parse_from(["mibward", "set", "1.3.6.1.2.1.1.1.0", "INTEGER", "42"]).unwrap();
        match cli.command {
            Command::Set {
                oid,
                datatype,
                value,
            } => {
                assert_eq!(oid, "1.3.6.1.2.1.1.1.0");
                assert_eq!(datatype, "INTEGER");
                assert_eq!(value, "42");
            }
            other => panic!("expected Set, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_schedule_optional_file() {
        let cli = Cli::try_parse_from(["mibward", "schedule"]).unwrap();
        assert!(matches!(cli.command, Command::Schedule { file: None }));

        let cli = Cli::try_parse_from(["mibward", "schedule", "/tmp/events.sched"]).unwrap();
        assert!(matches!(cli.command, Command::Schedule { file: Some(_) }));
    }

    #[test]
    fn test_commands_are_mutually_exclusive() {
        // a subcommand is required
        assert!(Cli::try_parse_from(["mibward"]).is_err());
        // and only one can be given
        assert!(Cli::try_parse_from(["mibward", "daemon", "reset"]).is_err());
    }
}
