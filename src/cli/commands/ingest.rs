//! Ingest command implementation.

use super::open_assistant;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::{bail, Result};
use std::path::PathBuf;

/// Run the ingest command.
pub async fn run_ingest(path: &str, clear: bool, settings: Settings) -> Result<()> {
    let path = PathBuf::from(shellexpand::tilde(path).to_string());
    if !path.exists() {
        bail!("Path not found: {}", path.display());
    }

    let assistant = open_assistant(Operation::Ingest, settings)?;
    let spinner = Output::spinner(&format!("Indexing {}...", path.display()));

    if path.is_dir() {
        let report = match assistant.add_course_folder(&path, clear).await {
            Ok(report) => report,
            Err(e) => {
                spinner.finish_and_clear();
                Output::error(&format!("Ingestion failed: {}", e));
                return Err(e.into());
            }
        };
        spinner.finish_and_clear();

        Output::success(&format!(
            "Added {} courses ({} chunks)",
            report.courses_added, report.chunks_added
        ));
        for title in &report.skipped {
            Output::list_item(&format!("{} (already indexed)", title));
        }
        return Ok(());
    }

    if clear {
        assistant.store().clear().await?;
    }

    let added = assistant.add_course_document(&path).await;
    spinner.finish_and_clear();

    match added? {
        Some((title, chunks)) => Output::success(&format!("Added '{}' ({} chunks)", title, chunks)),
        None => Output::info("Course already indexed, nothing to do."),
    }

    Ok(())
}
