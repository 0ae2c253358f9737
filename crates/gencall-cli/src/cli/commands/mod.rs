//! CLI command handlers, one file per command.

mod ask;
mod batch;
mod completions;
mod config;

pub use ask::run_ask;
pub use batch::run_batch;
pub use completions::{run_completions, run_manpage};
pub use config::run_config;
