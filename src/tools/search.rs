//! Semantic search over course content.

use super::{parse_arguments, ParameterSchema, ParameterType, Source, Tool, ToolDefinition};
use crate::vector_store::{CourseStore, SearchResults};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Name the model uses to call [`ContentSearchTool`].
pub const SEARCH_TOOL_NAME: &str = "search_course_content";

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    course_name: Option<String>,
    #[serde(default)]
    lesson_number: Option<u32>,
}

/// Searches course content, optionally filtered by course and lesson.
///
/// Every execution replaces the recorded sources: one entry per hit, or none.
pub struct ContentSearchTool {
    store: Arc<dyn CourseStore>,
    last_sources: Mutex<Vec<Source>>,
}

impl ContentSearchTool {
    pub fn new(store: Arc<dyn CourseStore>) -> Self {
        Self {
            store,
            last_sources: Mutex::new(Vec::new()),
        }
    }

    fn set_sources(&self, sources: Vec<Source>) {
        let mut guard = self.last_sources.lock().unwrap_or_else(|e| e.into_inner());
        *guard = sources;
    }

    async fn format_results(&self, results: &SearchResults) -> String {
        let mut blocks = Vec::with_capacity(results.len());
        let mut sources = Vec::with_capacity(results.len());

        for (document, metadata) in results.hits() {
            let link = match metadata.lesson_number {
                Some(n) => match self.store.get_lesson_link(&metadata.course_title, n).await {
                    Ok(link) => link,
                    Err(e) => {
                        warn!("Lesson link lookup failed for '{}' lesson {}: {}", metadata.course_title, n, e);
                        None
                    }
                },
                None => None,
            };

            let source = Source {
                course_title: metadata.course_title.clone(),
                lesson_number: metadata.lesson_number,
                link,
            };

            blocks.push(format!("{}\n{}", source, document));
            sources.push(source);
        }

        self.set_sources(sources);
        blocks.join("\n\n")
    }
}

/// Message for a search that matched nothing, naming the filters applied.
fn no_results_message(course_name: Option<&str>, lesson_number: Option<u32>) -> String {
    let mut message = String::from("No relevant content found");
    if let Some(course) = course_name {
        message.push_str(&format!(" in course '{}'", course));
    }
    if let Some(lesson) = lesson_number {
        message.push_str(&format!(" in lesson {}", lesson));
    }
    message.push('.');
    message
}

#[async_trait]
impl Tool for ContentSearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(
            SEARCH_TOOL_NAME,
            "Search course materials with smart course name matching and lesson filtering",
            ParameterSchema::new()
                .required("query", ParameterType::String, "What to search for in the course content")
                .optional(
                    "course_name",
                    ParameterType::String,
                    "Course title (partial matches work, e.g. 'MCP', 'Introduction')",
                )
                .optional(
                    "lesson_number",
                    ParameterType::Integer,
                    "Specific lesson number to search within (e.g. 1, 2, 3)",
                ),
        )
    }

    async fn execute(&self, parameters: Value) -> String {
        self.set_sources(Vec::new());

        let args: SearchArgs = match parse_arguments(SEARCH_TOOL_NAME, parameters) {
            Ok(args) => args,
            Err(message) => return message,
        };

        info!(
            query = %args.query,
            course = ?args.course_name,
            lesson = ?args.lesson_number,
            "Searching course content"
        );

        let results = self
            .store
            .search(&args.query, args.course_name.as_deref(), args.lesson_number)
            .await;

        if let Some(error) = results.error {
            debug!("Search reported: {}", error);
            return error;
        }

        if results.is_empty() {
            return no_results_message(args.course_name.as_deref(), args.lesson_number);
        }

        self.format_results(&results).await
    }

    fn last_sources(&self) -> Vec<Source> {
        self.last_sources.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn reset_sources(&self) {
        self.set_sources(Vec::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::StubStore;
    use crate::vector_store::ChunkMetadata;
    use serde_json::json;

    fn hit(course: &str, lesson: Option<u32>) -> ChunkMetadata {
        ChunkMetadata {
            course_title: course.to_string(),
            lesson_number: lesson,
            chunk_index: 0,
        }
    }

    #[tokio::test]
    async fn test_two_hits_render_headers_and_sources() {
        let mut results = SearchResults::empty();
        results.push("First chunk.", hit("X", Some(2)), 0.9);
        results.push("Second chunk.", hit("X", Some(2)), 0.8);
        let store = StubStore::new().with_results(results);
        let tool = ContentSearchTool::new(Arc::new(store));

        let output = tool
            .execute(json!({"query": "What is in lesson 2?", "course_name": "X", "lesson_number": 2}))
            .await;

        assert_eq!(output, "[X - Lesson 2]\nFirst chunk.\n\n[X - Lesson 2]\nSecond chunk.");
        let sources: Vec<String> = tool.last_sources().iter().map(|s| s.to_string()).collect();
        assert_eq!(sources, vec!["[X - Lesson 2]", "[X - Lesson 2]"]);
    }

    #[tokio::test]
    async fn test_link_form_when_lesson_link_exists() {
        let mut results = SearchResults::empty();
        results.push("Linked chunk.", hit("X", Some(1)), 0.9);
        results.push("Course-level chunk.", hit("X", None), 0.5);
        let store = StubStore::new()
            .with_results(results)
            .with_lesson_link("X", 1, "https://example.com/x/1");
        let tool = ContentSearchTool::new(Arc::new(store));

        let output = tool.execute(json!({"query": "q"})).await;

        assert_eq!(
            output,
            "[X - Lesson 1](https://example.com/x/1)\nLinked chunk.\n\n[X]\nCourse-level chunk."
        );
        assert_eq!(tool.last_sources()[0].link.as_deref(), Some("https://example.com/x/1"));
        assert_eq!(tool.last_sources()[1].to_string(), "[X]");
    }

    #[tokio::test]
    async fn test_empty_results_name_the_filters() {
        let tool = ContentSearchTool::new(Arc::new(StubStore::new()));

        assert_eq!(
            tool.execute(json!({"query": "q", "course_name": "X"})).await,
            "No relevant content found in course 'X'."
        );
        assert_eq!(
            tool.execute(json!({"query": "q", "course_name": "X", "lesson_number": 3})).await,
            "No relevant content found in course 'X' in lesson 3."
        );
        assert_eq!(
            tool.execute(json!({"query": "q", "lesson_number": 0})).await,
            "No relevant content found in lesson 0."
        );
        assert_eq!(tool.execute(json!({"query": "q"})).await, "No relevant content found.");
    }

    #[tokio::test]
    async fn test_backend_error_returned_verbatim() {
        let store = StubStore::new().with_results(SearchResults::with_error("No course found matching 'Y'"));
        let tool = ContentSearchTool::new(Arc::new(store));

        let output = tool.execute(json!({"query": "q", "course_name": "Y"})).await;
        assert_eq!(output, "No course found matching 'Y'");
        assert!(tool.last_sources().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_arguments_become_text() {
        let tool = ContentSearchTool::new(Arc::new(StubStore::new()));

        let output = tool.execute(json!({"course_name": "X"})).await;
        assert!(output.starts_with("Invalid arguments for tool 'search_course_content'"));

        let output = tool.execute(json!({"query": "q", "lesson_number": "two"})).await;
        assert!(output.starts_with("Invalid arguments"));
    }

    #[tokio::test]
    async fn test_sources_overwritten_not_appended() {
        let mut first = SearchResults::empty();
        first.push("a", hit("A", Some(1)), 0.9);
        first.push("b", hit("A", Some(2)), 0.8);
        let store = Arc::new(StubStore::new().with_results(first));
        let tool = ContentSearchTool::new(store.clone());

        tool.execute(json!({"query": "q"})).await;
        assert_eq!(tool.last_sources().len(), 2);

        let mut second = SearchResults::empty();
        second.push("c", hit("B", Some(5)), 0.9);
        store.set_results(second);

        tool.execute(json!({"query": "q"})).await;
        let sources = tool.last_sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].to_string(), "[B - Lesson 5]");

        store.set_results(SearchResults::empty());
        tool.execute(json!({"query": "q"})).await;
        assert!(tool.last_sources().is_empty());
    }

    #[test]
    fn test_definition() {
        let tool = ContentSearchTool::new(Arc::new(StubStore::new()));
        let definition = tool.definition();
        assert_eq!(definition.name(), SEARCH_TOOL_NAME);

        let ToolDefinition::Function(function) = definition;
        let required: Vec<_> = function
            .parameters
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(required, vec!["query"]);
    }
}
