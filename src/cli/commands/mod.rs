//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod courses;
mod ingest;
mod outline;
mod search;
mod serve;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use courses::run_courses;
pub use ingest::run_ingest;
pub use outline::run_outline;
pub use search::run_search;
pub use serve::run_serve;

use crate::assistant::CourseAssistant;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;

/// Run pre-flight checks, then build the assistant.
fn open_assistant(operation: Operation, settings: Settings) -> anyhow::Result<CourseAssistant> {
    if let Err(e) = preflight::check(operation, &settings) {
        Output::error(&e.to_string());
        Output::info("Run 'coursemate config path' to locate the configuration file.");
        return Err(e.into());
    }

    Ok(CourseAssistant::new(settings)?)
}
