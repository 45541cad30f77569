//! Interactive chat command.

use super::open_assistant;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use tracing::debug;

/// Run the interactive chat command.
pub async fn run_chat(model: Option<String>, settings: Settings) -> Result<()> {
    let mut assistant = open_assistant(Operation::Ask, settings)?;
    if let Some(model) = model {
        assistant = assistant.with_model(&model);
    }

    let mut session = assistant.sessions().create_session()?;
    debug!("Chat session {}", session);

    println!("\n{}", style("Coursemate Chat").bold().cyan());
    println!(
        "{}\n",
        style("Ask about your courses, or 'exit' to quit. Use 'clear' to start over.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            assistant.sessions().clear_session(&session)?;
            session = assistant.sessions().create_session()?;
            Output::info("Conversation cleared.");
            continue;
        }

        let spinner = Output::spinner("Thinking...");
        let result = assistant.query(input, Some(&session)).await;
        spinner.finish_and_clear();

        match result {
            Ok(response) => {
                print!("{}", style("Assistant:").cyan().bold());
                Output::answer(&response.answer, &response.sources);
                println!();
            }
            Err(e) => Output::error(&format!("Error: {}", e)),
        }
    }

    println!("{}", style("Goodbye!").dim());
    Ok(())
}
