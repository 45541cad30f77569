//! Search command implementation.

use super::open_assistant;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the search command: the content search tool, without the model.
pub async fn run_search(
    query: &str,
    course: Option<String>,
    lesson: Option<u32>,
    settings: Settings,
) -> Result<()> {
    let assistant = open_assistant(Operation::Search, settings)?;

    let spinner = Output::spinner("Searching course content...");
    let (output, sources) = assistant
        .search_content(query, course.as_deref(), lesson)
        .await;
    spinner.finish_and_clear();

    if sources.is_empty() {
        Output::info(&output);
        return Ok(());
    }

    Output::header(&format!("Results ({})", sources.len()));
    println!("\n{}", output);
    Ok(())
}
