//! Outline command implementation.

use super::open_assistant;
use crate::cli::preflight::Operation;
use crate::config::Settings;
use anyhow::Result;

/// Run the outline command.
pub async fn run_outline(course: &str, settings: Settings) -> Result<()> {
    let assistant = open_assistant(Operation::Search, settings)?;
    println!("{}", assistant.course_outline(course).await);
    Ok(())
}
