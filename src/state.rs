//! Shared daemon state.
//!
//! The store, the MIB table and the event registry are guarded by one coarse
//! `tokio::sync::Mutex`: the protocol engine holds it across each
//! lookup-mutate-event sequence, and the scheduler holds it around each
//! AUTO/INIT event execution, so the two never interleave inside a request.

use crate::mib::MibTable;
use crate::scheduler::Scheduler;
use crate::store::Store;

/// Everything the protocol engine and the scheduler share.
#[derive(Debug)]
pub struct SharedState {
    pub store: Store,
    pub mib: MibTable,
    pub scheduler: Scheduler,
}
