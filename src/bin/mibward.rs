//! mibward binary: pass_persist daemon, one-shot requests, and the
//! maintenance commands around the MIB database.

use clap::Parser;
use mibward::cli::{self, Cli, Command};
use mibward::engine::Engine;
use mibward::mib::{self, MibTable};
use mibward::oid::Oid;
use mibward::scheduler::{self, Scheduler};
use mibward::state::SharedState;
use mibward::store::Store;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const EXIT_OK: u8 = 0;
const EXIT_MIB: u8 = 1;
const EXIT_SCHEDULER: u8 = 2;
const EXIT_USAGE: u8 = 255;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version land here too; they are not usage errors
            let code = if e.use_stderr() { EXIT_USAGE } else { EXIT_OK };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    if let Err(e) = cli::init_tracing(&cli.log_level, cli.log_file.as_deref()) {
        eprintln!("could not open log file: {e}");
        return ExitCode::from(EXIT_MIB);
    }

    let store = match Store::open(&cli.database) {
        Ok(store) => store,
        Err(e) => {
            error!(target: "mibward::cli", { error = %e }, "could not initialize database");
            return ExitCode::from(EXIT_MIB);
        }
    };

    let code = match cli.command {
        Command::Daemon => run_daemon(store),
        Command::Get { oid } => run_request(store, Request::Get(oid)),
        Command::GetNext { oid } => run_request(store, Request::GetNext(oid)),
        Command::Set {
            oid,
            datatype,
            value,
        } => run_request(store, Request::Set(oid, datatype, value)),
        Command::ParseMib { root_oid, mib_file } => run_parse_mib(store, &root_oid, &mib_file),
        Command::Schedule { file } => run_schedule(store, file.as_deref()),
        Command::DumpSchedule { file } => run_dump_schedule(store, file.as_deref()),
        Command::Reset => run_reset(store),
        Command::Change { oid, value } => run_change(store, &oid, &value),
    };
    ExitCode::from(code)
}

/// One-shot request kinds; they share the startup path with the daemon.
enum Request {
    Get(String),
    GetNext(String),
    Set(String, String, String),
}

fn runtime() -> Result<tokio::runtime::Runtime, u8> {
    tokio::runtime::Runtime::new().map_err(|e| {
        error!(target: "mibward::cli", { error = %e }, "could not start runtime");
        EXIT_MIB
    })
}

fn load_mib(store: &Store) -> Result<MibTable, u8> {
    MibTable::load(store).map_err(|e| {
        error!(target: "mibward::cli", { error = %e },
            "MIB table loading failed; execution aborted");
        EXIT_MIB
    })
}

fn load_scheduler(store: &Store) -> Result<Scheduler, u8> {
    Scheduler::load(store).map_err(|e| {
        error!(target: "mibward::cli", { error = %e },
            "could not load scheduler events; execution aborted");
        EXIT_SCHEDULER
    })
}

fn load_state(store: Store) -> Result<SharedState, u8> {
    let mib = load_mib(&store)?;
    info!(target: "mibward::cli", "MIB table loaded successfully");
    let scheduler = load_scheduler(&store)?;
    info!(target: "mibward::cli", "scheduler loaded successfully");
    Ok(SharedState {
        store,
        mib,
        scheduler,
    })
}

fn run_daemon(store: Store) -> u8 {
    let runtime = match runtime() {
        Ok(rt) => rt,
        Err(code) => return code,
    };

    runtime.block_on(async {
        let state = match load_state(store) {
            Ok(state) => state,
            Err(code) => return code,
        };
        let state = Arc::new(Mutex::new(state));
        let cancel = CancellationToken::new();

        let scheduler_task = tokio::spawn(scheduler::run(state.clone(), cancel.clone()));
        info!(target: "mibward::cli", "daemon started");

        let engine = Engine::new(state, cancel.clone());
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        let code = match engine.run(stdin, stdout).await {
            Ok(()) => EXIT_OK,
            Err(e) => {
                error!(target: "mibward::cli", { error = %e }, "daemon I/O failure");
                EXIT_MIB
            }
        };

        cancel.cancel();
        let _ = scheduler_task.await;
        info!(target: "mibward::cli", "daemon terminated");
        code
    })
}

fn run_request(store: Store, request: Request) -> u8 {
    let runtime = match runtime() {
        Ok(rt) => rt,
        Err(code) => return code,
    };

    runtime.block_on(async {
        let state = match load_state(store) {
            Ok(state) => state,
            Err(code) => return code,
        };
        // one-shot requests run INIT events the way daemon startup does
        scheduler::run_init_events(&state).await;

        let engine = Engine::new(Arc::new(Mutex::new(state)), CancellationToken::new());
        let response = match &request {
            Request::Get(oid) => engine.get(oid).await,
            Request::GetNext(oid) => engine.get_next(oid).await,
            Request::Set(oid, datatype, value) => engine.set(oid, datatype, value).await,
        };

        use std::io::Write as _;
        print!("{}", response.render());
        let _ = std::io::stdout().flush();
        EXIT_OK
    })
}

fn run_parse_mib(store: Store, root: &str, path: &Path) -> u8 {
    let mut mibtab = match load_mib(&store) {
        Ok(mib) => mib,
        Err(code) => return code,
    };
    let root = match Oid::parse(root) {
        Ok(root) => root,
        Err(e) => {
            error!(target: "mibward::cli", { error = %e }, "bad root OID");
            return EXIT_MIB;
        }
    };

    match mib::load_compiled_mib(&store, &mut mibtab, &root, path) {
        Ok(count) => {
            info!(target: "mibward::cli", { count }, "MIB parsed successfully");
            EXIT_OK
        }
        Err(e) => {
            error!(target: "mibward::cli", { error = %e }, "MIB parsing failed");
            EXIT_MIB
        }
    }
}

fn run_schedule(store: Store, file: Option<&Path>) -> u8 {
    let mibtab = match load_mib(&store) {
        Ok(mib) => mib,
        Err(code) => return code,
    };
    let mut sched = match load_scheduler(&store) {
        Ok(sched) => sched,
        Err(code) => return code,
    };

    match file {
        Some(path) => match sched.load_schedule_file(&store, &mibtab, path) {
            Ok(count) => {
                info!(target: "mibward::cli", { count }, "scheduling file parsed successfully");
                EXIT_OK
            }
            Err(e) => {
                error!(target: "mibward::cli", { error = %e }, "unable to parse scheduling file");
                EXIT_MIB
            }
        },
        None => {
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            match cli::run_schedule_prompt(
                &mut stdin.lock(),
                &mut stdout.lock(),
                &store,
                &mibtab,
                &mut sched,
            ) {
                Ok(()) => EXIT_OK,
                Err(e) => {
                    error!(target: "mibward::cli", { error = %e }, "scheduling prompt failed");
                    EXIT_MIB
                }
            }
        }
    }
}

fn run_dump_schedule(store: Store, file: Option<&Path>) -> u8 {
    let sched = match load_scheduler(&store) {
        Ok(sched) => sched,
        Err(code) => return code,
    };

    let result = match file {
        Some(path) => std::fs::File::create(path).and_then(|mut out| sched.dump(&mut out)),
        None => sched.dump(&mut std::io::stdout().lock()),
    };

    match result {
        Ok(()) => EXIT_OK,
        Err(e) => {
            error!(target: "mibward::cli", { error = %e }, "scheduling dump failed");
            EXIT_MIB
        }
    }
}

fn run_reset(store: Store) -> u8 {
    let mut mibtab = match load_mib(&store) {
        Ok(mib) => mib,
        Err(code) => return code,
    };
    let mut sched = Scheduler::new();

    if let Err(e) = sched.clear(&store) {
        error!(target: "mibward::cli", { error = %e }, "scheduling reset failed");
        return EXIT_MIB;
    }
    if let Err(e) = mibtab.clear(&store) {
        error!(target: "mibward::cli", { error = %e }, "MIB table reset failed");
        return EXIT_MIB;
    }
    EXIT_OK
}

fn run_change(store: Store, oid: &str, value: &str) -> u8 {
    let mut mibtab = match load_mib(&store) {
        Ok(mib) => mib,
        Err(code) => return code,
    };
    let oid = match Oid::parse(oid) {
        Ok(oid) => oid,
        Err(e) => {
            error!(target: "mibward::cli", { error = %e }, "bad OID");
            return EXIT_MIB;
        }
    };

    let Some(entry) = mibtab.get_mut(&oid) else {
        error!(target: "mibward::cli", { oid = %oid }, "provided OID does not exist");
        return EXIT_MIB;
    };
    match entry.set_value(&store, value) {
        Ok(()) => {
            info!(target: "mibward::cli", { oid = %oid, value = %value }, "value changed");
            EXIT_OK
        }
        Err(e) => {
            error!(target: "mibward::cli", { error = %e }, "could not set value for this OID");
            EXIT_MIB
        }
    }
}
