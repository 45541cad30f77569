//! Ask command implementation.

use super::open_assistant;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    model: Option<String>,
    session: Option<String>,
    settings: Settings,
) -> Result<()> {
    let mut assistant = open_assistant(Operation::Ask, settings)?;
    if let Some(model) = model {
        assistant = assistant.with_model(&model);
    }

    let spinner = Output::spinner("Thinking...");

    match assistant.query(question, session.as_deref()).await {
        Ok(response) => {
            spinner.finish_and_clear();
            Output::answer(&response.answer, &response.sources);
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
