//! Pre-flight checks before expensive operations.
//!
//! Validates configuration before starting operations that would otherwise fail
//! midway, such as a query that reaches the model only after loading the store.

use crate::config::{Settings, StoreProvider};
use crate::error::{CourseError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Ingestion embeds course content, so it needs an API key.
    Ingest,
    /// Questions need an API key for both embeddings and completions.
    Ask,
    /// Search, outlines and listings read an existing index and embed queries.
    Search,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Ingest | Operation::Ask => {
            check_api_key(settings)?;
        }
        Operation::Search => {
            check_api_key(settings)?;
            check_index(settings)?;
        }
    }
    Ok(())
}

/// Check that an OpenAI API key is configured or in the environment.
fn check_api_key(settings: &Settings) -> Result<()> {
    settings.api_key().map(|_| ())
}

/// Check that a persistent index exists before reading from it.
fn check_index(settings: &Settings) -> Result<()> {
    if settings.store.provider != StoreProvider::Sqlite {
        return Ok(());
    }

    let path = settings.sqlite_path();
    if path.exists() {
        Ok(())
    } else {
        Err(CourseError::Config(format!(
            "No course index at {}. Run 'coursemate ingest <path>' first.",
            path.display()
        )))
    }
}
