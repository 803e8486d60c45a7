//! Shared fixtures for integration tests.
//!
//! `Fixture` assembles an in-memory store, MIB entries and events, and hands
//! back an [`Engine`] plus the shared state so tests can assert on post-state.

// Allow dead code since not all test files use all utilities
#![allow(dead_code)]

use mibward::engine::Engine;
use mibward::mib::{AccessMode, MibEntry, MibTable};
use mibward::oid::Oid;
use mibward::scheduler::{Event, EventMode, Scheduler};
use mibward::state::SharedState;
use mibward::store::Store;
use mibward::value::TypeTag;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

pub struct Fixture {
    store: Store,
    mib: MibTable,
    scheduler: Scheduler,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            store: Store::open_in_memory().expect("in-memory store"),
            mib: MibTable::new(),
            scheduler: Scheduler::new(),
        }
    }

    /// Preload one OID row.
    pub fn oid(mut self, oid: &str, tag: TypeTag, access: AccessMode, name: &str, value: &str) -> Self {
        let entry = MibEntry::new(Oid::parse(oid).expect("fixture OID"), tag, value, access, name)
            .expect("fixture entry");
        self.mib.add(&self.store, entry).expect("fixture add");
        self
    }

    /// Preload one event.
    pub fn event(mut self, oid: &str, mode: EventMode, timeout: u64, commands: &[&str]) -> Self {
        self.scheduler
            .add(
                &self.store,
                Event {
                    oid: Oid::parse(oid).expect("fixture OID"),
                    mode,
                    timeout,
                    commands: commands.iter().map(|c| c.to_string()).collect(),
                },
            )
            .expect("fixture event");
        self
    }

    /// Finish: an engine plus the state handle for post-state assertions.
    pub fn build(self) -> (Engine, Arc<Mutex<SharedState>>) {
        let state = Arc::new(Mutex::new(SharedState {
            store: self.store,
            mib: self.mib,
            scheduler: self.scheduler,
        }));
        (Engine::new(state.clone(), CancellationToken::new()), state)
    }

    /// Finish when only the engine is needed.
    pub fn engine(self) -> Engine {
        self.build().0
    }
}

/// Feed a full protocol session into the engine and capture the output.
pub async fn drive(engine: &Engine, session: &str) -> String {
    let mut output: Vec<u8> = Vec::new();
    engine
        .run(session.as_bytes(), &mut output)
        .await
        .expect("engine run");
    String::from_utf8(output).expect("utf-8 output")
}
