//! Course outline lookup.

use super::{parse_arguments, ParameterSchema, ParameterType, Tool, ToolDefinition};
use crate::error::Result;
use crate::vector_store::{CourseStore, LessonEntry};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Name the model uses to call [`OutlineTool`].
pub const OUTLINE_TOOL_NAME: &str = "get_course_outline";

#[derive(Debug, Deserialize)]
struct OutlineArgs {
    course_name: String,
}

/// Returns a course's title, instructor, link and lesson list.
///
/// Outlines are not citation-bearing, so this tool records no sources.
pub struct OutlineTool {
    store: Arc<dyn CourseStore>,
}

impl OutlineTool {
    pub fn new(store: Arc<dyn CourseStore>) -> Self {
        Self { store }
    }

    async fn outline(&self, course_title: &str) -> Result<Option<String>> {
        let Some(metadata) = self.store.get_course_metadata(course_title).await? else {
            return Ok(None);
        };
        let lessons = metadata.lessons()?;

        Ok(Some(format_course_outline(
            &metadata.title,
            metadata.instructor.as_deref(),
            metadata.course_link.as_deref(),
            &lessons,
        )))
    }
}

/// Render a course outline as markdown. Lessons are listed by ascending number.
pub fn format_course_outline(
    title: &str,
    instructor: Option<&str>,
    course_link: Option<&str>,
    lessons: &[LessonEntry],
) -> String {
    let course_link = course_link.filter(|l| !l.is_empty());
    let mut lines: Vec<String> = vec!["---".to_string(), String::new()];

    match course_link {
        Some(link) => lines.push(format!("# [{}]({})", title, link)),
        None => lines.push(format!("# {}", title)),
    }
    lines.push(String::new());

    if let Some(instructor) = instructor.filter(|i| !i.is_empty()) {
        lines.push(format!("**Instructor:** {}", instructor));
        lines.push(String::new());
    }

    if let Some(link) = course_link {
        lines.push(format!("**Course Link:** [Access Course]({})", link));
        lines.push(String::new());
    }

    lines.push("---".to_string());
    lines.push(String::new());
    lines.push("## Course Lessons".to_string());
    lines.push(String::new());

    if lessons.is_empty() {
        lines.push("There are no lessons available for this course.".to_string());
    } else {
        let mut sorted: Vec<&LessonEntry> = lessons.iter().collect();
        sorted.sort_by_key(|l| l.lesson_number);

        for lesson in sorted {
            match lesson.lesson_link.as_deref().filter(|l| !l.is_empty()) {
                Some(link) => lines.push(format!(
                    "{}. [{}]({})",
                    lesson.lesson_number, lesson.lesson_title, link
                )),
                None => lines.push(format!("{}. {}", lesson.lesson_number, lesson.lesson_title)),
            }
        }
    }

    lines.push(String::new());
    lines.push("---".to_string());
    lines.join("\n")
}

#[async_trait]
impl Tool for OutlineTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(
            OUTLINE_TOOL_NAME,
            "Get the complete outline of a specific course including all lessons",
            ParameterSchema::new().required(
                "course_name",
                ParameterType::String,
                "Course title or partial course name to get the outline for",
            ),
        )
    }

    async fn execute(&self, parameters: Value) -> String {
        let args: OutlineArgs = match parse_arguments(OUTLINE_TOOL_NAME, parameters) {
            Ok(args) => args,
            Err(message) => return message,
        };

        info!(course = %args.course_name, "Looking up course outline");

        let course_title = match self.store.resolve_course_name(&args.course_name).await {
            Ok(Some(title)) => title,
            Ok(None) => return format!("No course found matching '{}'", args.course_name),
            Err(e) => {
                warn!("Course name resolution failed: {}", e);
                return format!("Error retrieving course outline: {}", e);
            }
        };

        match self.outline(&course_title).await {
            Ok(Some(outline)) => outline,
            Ok(None) => format!("Course metadata not found for '{}'", course_title),
            Err(e) => {
                warn!("Outline lookup failed for '{}': {}", course_title, e);
                format!("Error retrieving course outline: {}", e)
            }
        }
    }
}
