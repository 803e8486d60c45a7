//! Event registry and periodic executor.
//!
//! Events attach shell command lists to an `(OID, mode)` pair. GET and SET
//! events run synchronously inside the request that triggers them; INIT
//! events run once at scheduler start, in OID order; AUTO events fire from a
//! one-second tick loop whenever the tick count is divisible by the event's
//! timeout. Commands receive the OID's current printable value through the
//! `SNMP_VALUE` environment variable.

use crate::error::{Error, Result};
use crate::oid::Oid;
use crate::state::SharedState;
use crate::store::Store;
use rusqlite::params;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Trigger of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventMode {
    /// Runs before a GET response for the OID is emitted.
    Get,
    /// Runs after a successful SET on the OID (or its table parent).
    Set,
    /// Runs periodically, every `timeout` seconds.
    Auto,
    /// Runs once at scheduler start.
    Init,
}

impl EventMode {
    /// Parse the exact uppercase form used in scheduling files and storage.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(EventMode::Get),
            "SET" => Some(EventMode::Set),
            "AUTO" => Some(EventMode::Auto),
            "INIT" => Some(EventMode::Init),
            _ => None,
        }
    }

    /// The stored uppercase form.
    pub fn as_str(self) -> &'static str {
        match self {
            EventMode::Get => "GET",
            EventMode::Set => "SET",
            EventMode::Auto => "AUTO",
            EventMode::Init => "INIT",
        }
    }
}

impl fmt::Display for EventMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command list attached to an `(OID, mode)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub oid: Oid,
    pub mode: EventMode,
    /// Period in seconds; meaningful only for AUTO, zero otherwise.
    pub timeout: u64,
    /// Shell commands, executed in order.
    pub commands: Vec<String>,
}

/// The event registry.
///
/// Keyed by `(oid, mode)` in a BTreeMap so iteration is OID-ordered, which
/// gives INIT execution order and deterministic dumps for free.
#[derive(Debug, Default)]
pub struct Scheduler {
    events: BTreeMap<(Oid, EventMode), Event>,
}

impl Scheduler {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            events: BTreeMap::new(),
        }
    }

    /// Load every persisted event and its command list, in insertion order
    /// per event.
    pub fn load(store: &Store) -> Result<Self> {
        let rows = store.select("SELECT oid, mode, timeout FROM events", [])?;

        let mut events = BTreeMap::new();
        for row in &rows {
            let oid = Oid::parse(&row[0])?;
            let mode = EventMode::parse(&row[1])
                .ok_or_else(|| Error::Scheduler(format!("bad event mode {:?}", row[1])))?;
            let timeout: u64 = row[2]
                .parse()
                .map_err(|_| Error::Scheduler(format!("bad event timeout {:?}", row[2])))?;
            let commands = store
                .select(
                    "SELECT command FROM event_commands \
                     WHERE oid = ?1 AND mode = ?2 ORDER BY seq",
                    params![row[0], row[1]],
                )?
                .into_iter()
                .map(|mut cols| cols.remove(0))
                .collect();

            events.insert(
                (oid.clone(), mode),
                Event {
                    oid,
                    mode,
                    timeout,
                    commands,
                },
            );
        }

        Ok(Self { events })
    }

    /// Look up the event for an `(oid, mode)` pair.
    pub fn get(&self, oid: &Oid, mode: EventMode) -> Option<&Event> {
        self.events.get(&(oid.clone(), mode))
    }

    /// Iterate over all events in OID order.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    /// Number of registered events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Register an event, replacing any previous one for the same
    /// `(oid, mode)` pair, and persist it with its command order.
    pub fn add(&mut self, store: &Store, event: Event) -> Result<()> {
        if event.mode == EventMode::Auto && event.timeout == 0 {
            return Err(Error::Scheduler(
                "AUTO event requires a positive timeout".to_string(),
            ));
        }
        if event.commands.is_empty() {
            return Err(Error::Scheduler("event has no commands".to_string()));
        }

        let oid_str = event.oid.to_string();
        let mode_str = event.mode.as_str();
        store.execute(
            "DELETE FROM events WHERE oid = ?1 AND mode = ?2",
            params![oid_str, mode_str],
        )?;
        store.execute(
            "DELETE FROM event_commands WHERE oid = ?1 AND mode = ?2",
            params![oid_str, mode_str],
        )?;
        store.execute(
            "INSERT INTO events (oid, mode, timeout) VALUES (?1, ?2, ?3)",
            params![oid_str, mode_str, event.timeout as i64],
        )?;
        for (seq, command) in event.commands.iter().enumerate() {
            store.execute(
                "INSERT INTO event_commands (oid, mode, seq, command) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![oid_str, mode_str, seq as i64, command],
            )?;
        }

        self.events.insert((event.oid.clone(), event.mode), event);
        Ok(())
    }

    /// Remove every event from the registry and the store.
    pub fn clear(&mut self, store: &Store) -> Result<()> {
        store.execute("DELETE FROM event_commands", [])?;
        store.execute("DELETE FROM events", [])?;
        self.events.clear();
        Ok(())
    }

    /// Execute the event for `(oid, mode)` if one is registered.
    ///
    /// Commands run in order through the shell, each awaited to completion.
    /// `snmp_value` is exported as `SNMP_VALUE` when present. Failures are
    /// logged, never propagated.
    pub async fn fetch_and_exec(&self, oid: &Oid, mode: EventMode, snmp_value: Option<&str>) {
        if let Some(event) = self.get(oid, mode) {
            run_event(event, snmp_value).await;
        }
    }

    /// The AUTO events due at `tick` (seconds since scheduler start).
    ///
    /// An event with timeout T is due at ticks T, 2T, 3T and so on.
    pub fn auto_due(&self, tick: u64) -> Vec<&Event> {
        self.events
            .values()
            .filter(|e| {
                e.mode == EventMode::Auto && e.timeout > 0 && tick > 0 && tick % e.timeout == 0
            })
            .collect()
    }

    /// Append events from a scheduling file.
    ///
    /// One event per line: `OID;MODE;TIMEOUT;COMMAND[;COMMAND...]`. Blank
    /// lines and `#` comments are ignored. The whole file is validated before
    /// anything is persisted. GET, SET and INIT events must name an existing
    /// MIB entry; AUTO events may poll an OID the tree does not expose.
    /// Returns the number of events appended.
    pub fn load_schedule_file(
        &mut self,
        store: &Store,
        mib: &crate::mib::MibTable,
        path: &Path,
    ) -> Result<usize> {
        let text = std::fs::read_to_string(path)?;

        let mut staged = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let event = parse_schedule_line(idx + 1, line)?;
            if event.mode != EventMode::Auto && mib.get(&event.oid).is_none() {
                return Err(Error::BadRecord {
                    line: idx + 1,
                    msg: format!("OID {} does not exist in the MIB table", event.oid),
                });
            }
            staged.push(event);
        }

        let count = staged.len();
        for event in staged {
            self.add(store, event)?;
        }
        Ok(count)
    }

    /// Serialize the registry in scheduling-file format, OID order.
    pub fn dump<W: std::io::Write>(&self, out: &mut W) -> std::io::Result<()> {
        for event in self.events.values() {
            writeln!(
                out,
                "{};{};{};{}",
                event.oid,
                event.mode,
                event.timeout,
                event.commands.join(";")
            )?;
        }
        Ok(())
    }
}

fn parse_schedule_line(line: usize, record: &str) -> Result<Event> {
    let bad = |msg: String| Error::BadRecord { line, msg };

    let fields: Vec<&str> = record.split(';').collect();
    if fields.len() < 4 {
        return Err(bad(
            "expected OID;MODE;TIMEOUT;COMMAND[;COMMAND...]".to_string(),
        ));
    }

    let oid = Oid::parse(fields[0].trim()).map_err(|_| bad(format!("bad OID {:?}", fields[0])))?;
    let mode = EventMode::parse(fields[1].trim())
        .ok_or_else(|| bad(format!("bad event mode {:?}", fields[1])))?;
    let timeout: u64 = fields[2]
        .trim()
        .parse()
        .map_err(|_| bad(format!("bad timeout {:?}", fields[2])))?;
    if mode == EventMode::Auto && timeout == 0 {
        return Err(bad("AUTO event requires a positive timeout".to_string()));
    }

    let commands: Vec<String> = fields[3..].iter().map(|c| c.to_string()).collect();

    Ok(Event {
        oid,
        mode,
        // timeout is meaningful only for AUTO
        timeout: if mode == EventMode::Auto { timeout } else { 0 },
        commands,
    })
}

/// Run one event's commands in order, each through the shell, awaited to
/// completion.
async fn run_event(event: &Event, snmp_value: Option<&str>) {
    for command in &event.commands {
        let mut child = tokio::process::Command::new("/bin/sh");
        child.arg("-c").arg(command);
        match snmp_value {
            Some(value) => {
                child.env("SNMP_VALUE", value);
            }
            None => {
                child.env_remove("SNMP_VALUE");
            }
        }

        match child.status().await {
            Ok(status) if status.success() => {}
            Ok(status) => {
                tracing::warn!(target: "mibward::scheduler",
                    { oid = %event.oid, mode = %event.mode, %status, command = %command },
                    "event command exited with failure");
            }
            Err(e) => {
                tracing::warn!(target: "mibward::scheduler",
                    { oid = %event.oid, mode = %event.mode, error = %e, command = %command },
                    "failed to spawn event command");
            }
        }
    }
}

/// Run every INIT event once, in OID order.
///
/// `SNMP_VALUE` carries the OID's current value when the MIB table has one;
/// it stays unset otherwise.
pub async fn run_init_events(state: &SharedState) {
    let pending = collect_init_events(state);
    for (event, value) in &pending {
        run_event(event, value.as_deref()).await;
    }
}

/// Snapshot the INIT events and their current values while the caller
/// still holds whatever lock guards `state`, so no lock guard needs to be
/// held across the `.await` points in `run_event`.
fn collect_init_events(state: &SharedState) -> Vec<(Event, Option<String>)> {
    state
        .scheduler
        .events()
        .filter(|event| event.mode == EventMode::Init)
        .map(|event| {
            let value = state.mib.get(&event.oid).map(|e| e.printable());
            (event.clone(), value)
        })
        .collect()
}

/// The scheduler task: INIT pass, then the one-second tick loop.
///
/// AUTO events fire on tick divisibility, counted from start; ticks missed
/// while a child runs long are skipped, not queued. Returns within one second
/// of `cancel` firing; a child already running is awaited, not killed.
pub async fn run(state: Arc<Mutex<SharedState>>, cancel: CancellationToken) {
    let init_pending = {
        let st = state.lock().await;
        collect_init_events(&st)
    };
    for (event, value) in &init_pending {
        run_event(event, value.as_deref()).await;
    }

    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // the first tick completes immediately; the loop counts from the next one
    interval.tick().await;

    let mut tick: u64 = 0;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                tick += 1;
                let due: Vec<(Event, Option<String>)> = {
                    let st = state.lock().await;
                    st.scheduler
                        .auto_due(tick)
                        .into_iter()
                        .map(|event| {
                            let value = st.mib.get(&event.oid).map(|e| e.printable());
                            (event.clone(), value)
                        })
                        .collect()
                };
                for (event, value) in &due {
                    run_event(event, value.as_deref()).await;
                }
            }
            _ = cancel.cancelled() => {
                tracing::info!(target: "mibward::scheduler", "scheduler stopped");
                return;
            }
        }
    }
}
