//! Courses command implementation.

use super::open_assistant;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the courses command.
pub async fn run_courses(settings: Settings) -> Result<()> {
    let assistant = open_assistant(Operation::Search, settings)?;

    match assistant.course_analytics().await {
        Ok(analytics) if analytics.total_courses == 0 => {
            Output::info("No courses indexed yet. Use 'coursemate ingest <path>' to add some.");
        }
        Ok(analytics) => {
            Output::header(&format!("Indexed Courses ({})", analytics.total_courses));
            println!();
            for title in &analytics.course_titles {
                Output::list_item(title);
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list courses: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
