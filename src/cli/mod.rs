//! Command-line surface: argument structures, tracing setup, and the
//! interactive scheduling prompt. The binary in `src/bin/mibward.rs` wires
//! these to the library.

mod args;
mod prompt;

pub use args::{Cli, Command, DEFAULT_DB_PATH, init_tracing};
pub use prompt::run_schedule_prompt;
