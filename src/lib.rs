//! # mibward
//!
//! Pass-persist MIB extension agent: a co-process for an SNMP master agent
//! that serves a typed, persistent OID tree and runs per-OID shell-command
//! events.
//!
//! The master agent speaks the line-oriented pass_persist protocol over the
//! daemon's stdin/stdout: `get`, `getnext` and `set` requests answered with
//! three-line frames (OID, type tag, printable value) or one of the fixed
//! single-line reply codes. The tree lives in SQLite; conceptual table rows
//! can be provisioned dynamically by SET requests against children of
//! SEQUENCE nodes. A scheduler attaches shell commands to `(OID, mode)`
//! pairs and fires them on GET, on SET, once at startup (INIT), or
//! periodically (AUTO), passing the OID's value through the `SNMP_VALUE`
//! environment variable.
//!
//! ## Library layout
//!
//! - [`oid`] — dotted-decimal identifiers with component-wise ordering
//! - [`value`] — the closed family of typed primitives
//! - [`store`] — SQLite persistence
//! - [`mib`] — the ordered MIB table and its entries
//! - [`scheduler`] — the event registry and periodic executor
//! - [`engine`] — the pass_persist request/response state machine
//! - [`cli`] — argument parsing and the interactive scheduling prompt
//!
//! ## Embedding example
//!
//! ```rust
//! use mibward::engine::Engine;
//! use mibward::mib::{AccessMode, MibEntry, MibTable};
//! use mibward::scheduler::Scheduler;
//! use mibward::state::SharedState;
//! use mibward::store::Store;
//! use mibward::value::TypeTag;
//! use mibward::oid;
//! use std::sync::Arc;
//! use tokio::sync::Mutex;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> mibward::Result<()> {
//! let store = Store::open_in_memory()?;
//! let mut mib = MibTable::new();
//! mib.add(&store, MibEntry::new(
//!     oid!(1, 3, 6, 1, 2, 1, 1, 5, 0),
//!     TypeTag::OctetString,
//!     "router1",
//!     AccessMode::ReadOnly,
//!     "sysName",
//! )?)?;
//!
//! let state = SharedState { store, mib, scheduler: Scheduler::new() };
//! let engine = Engine::new(Arc::new(Mutex::new(state)), CancellationToken::new());
//!
//! let response = engine.get("1.3.6.1.2.1.1.5.0").await;
//! assert_eq!(response.render(), "1.3.6.1.2.1.1.5.0\nOCTET STRING\nrouter1\n");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod engine;
pub mod error;
pub mod mib;
pub mod oid;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod value;

// Re-exports for convenience
pub use engine::{Engine, ReplyCode, Response};
pub use error::{Error, Result};
pub use mib::{AccessMode, MibEntry, MibTable};
pub use oid::Oid;
pub use scheduler::{Event, EventMode, Scheduler};
pub use state::SharedState;
pub use store::Store;
pub use value::{Primitive, TypeTag};
