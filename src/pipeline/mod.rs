mod config;
mod harness;
mod prompts;
mod trace;

pub use config::{init_default_config, CliOverrides, HarnessConfig, DEFAULT_CATALOG_FILENAME};
pub use harness::{dry_run, Harness, RunSummary};
pub use prompts::resolve_prompt;
pub use trace::TraceWriter;
