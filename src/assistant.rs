//! Query pipeline for Coursemate.
//!
//! Wires the course store, the tools, the response generator and the session
//! history together, and handles course ingestion.

use crate::chunking::{load_course_folder, read_course_file, ChunkingConfig, CourseDocument, SentenceChunker};
use crate::config::{Prompts, Settings};
use crate::embedding::OpenAIEmbedder;
use crate::error::Result;
use crate::llm::{CompletionClient, OpenAICompletionClient};
use crate::rag::{ResponseGenerator, SessionManager};
use crate::tools::{ContentSearchTool, OutlineTool, Source, ToolRegistry, OUTLINE_TOOL_NAME, SEARCH_TOOL_NAME};
use crate::vector_store::{create_store, CourseStore};
use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

/// Answer to one user query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<Source>,
}

/// Outcome of ingesting course documents.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub courses_added: usize,
    pub chunks_added: usize,
    /// Titles already in the catalog, left untouched.
    pub skipped: Vec<String>,
}

/// Catalog summary.
#[derive(Debug, Clone, Serialize)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

/// The course assistant.
pub struct CourseAssistant {
    settings: Settings,
    prompts: Prompts,
    store: Arc<dyn CourseStore>,
    registry: ToolRegistry,
    generator: ResponseGenerator,
    sessions: SessionManager,
    chunker: SentenceChunker,
    query_lock: Mutex<()>,
}

impl CourseAssistant {
    /// Build the assistant from settings, using OpenAI for embeddings and completions.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let embedder = Arc::new(OpenAIEmbedder::new(&settings)?);
        let store = create_store(&settings, embedder)?;
        let client: Arc<dyn CompletionClient> = Arc::new(OpenAICompletionClient::new(&settings)?);

        info!(
            "Course store: {} ({} results per search)",
            settings.store.provider, settings.search.max_results
        );

        Self::with_components(settings, prompts, store, client)
    }

    /// Build the assistant around existing components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        store: Arc<dyn CourseStore>,
        client: Arc<dyn CompletionClient>,
    ) -> Result<Self> {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(ContentSearchTool::new(store.clone())))?;
        registry.register(Arc::new(OutlineTool::new(store.clone())))?;

        let generator = ResponseGenerator::from_settings(client, &settings, &prompts.system_prompt());
        let sessions = SessionManager::new(settings.session.max_history, settings.session.max_sessions);
        let chunker = SentenceChunker::new(ChunkingConfig::from(&settings));

        Ok(Self {
            settings,
            prompts,
            store,
            registry,
            generator,
            sessions,
            chunker,
            query_lock: Mutex::new(()),
        })
    }

    /// Use a different chat model.
    pub fn with_model(mut self, model: &str) -> Self {
        self.generator = self.generator.with_model(model);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> Arc<dyn CourseStore> {
        self.store.clone()
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Answer a question, optionally continuing a session.
    ///
    /// Queries are serialized so the sources returned belong to this query alone.
    #[instrument(skip(self))]
    pub async fn query(&self, query: &str, session_id: Option<&str>) -> Result<QueryResponse> {
        let _guard = self.query_lock.lock().await;

        self.registry.reset_sources();

        let prompt = self.prompts.query_prompt(query);
        let history = match session_id {
            Some(id) => self.sessions.get_conversation_history(id)?,
            None => None,
        };
        let definitions = self.registry.definitions();

        let result = self
            .generator
            .generate_response(&prompt, history.as_deref(), Some(&definitions), Some(&self.registry))
            .await;

        let sources = self.registry.collect_sources();
        self.registry.reset_sources();
        let answer = result?;

        if let Some(id) = session_id {
            self.sessions.add_exchange(id, query, &answer)?;
        }

        info!("Answered with {} sources", sources.len());
        Ok(QueryResponse { answer, sources })
    }

    /// Run a content search directly, without the model.
    pub async fn search_content(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> (String, Vec<Source>) {
        let _guard = self.query_lock.lock().await;

        let mut arguments = json!({ "query": query });
        if let Some(course) = course_name {
            arguments["course_name"] = json!(course);
        }
        if let Some(lesson) = lesson_number {
            arguments["lesson_number"] = json!(lesson);
        }

        let output = self.registry.execute(SEARCH_TOOL_NAME, arguments).await;
        let sources = self.registry.collect_sources();
        self.registry.reset_sources();
        (output, sources)
    }

    /// Render a course outline directly, without the model.
    pub async fn course_outline(&self, course_name: &str) -> String {
        self.registry
            .execute(OUTLINE_TOOL_NAME, json!({ "course_name": course_name }))
            .await
    }

    /// Parse and index one course file. Returns `None` when the course already exists.
    pub async fn add_course_document(&self, path: &Path) -> Result<Option<(String, usize)>> {
        let document = read_course_file(path, &self.chunker)?;
        let existing: HashSet<String> = self.store.course_titles().await?.into_iter().collect();
        if existing.contains(&document.course.title) {
            info!("Course '{}' already indexed, skipping", document.course.title);
            return Ok(None);
        }

        let chunks = self.index(&document).await?;
        Ok(Some((document.course.title, chunks)))
    }

    /// Index every course document in a folder, optionally clearing the store first.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn add_course_folder(&self, path: &Path, clear_existing: bool) -> Result<IngestReport> {
        if clear_existing {
            warn!("Clearing existing course data");
            self.store.clear().await?;
        }

        let documents = load_course_folder(path, &self.chunker)?;
        let mut existing: HashSet<String> = self.store.course_titles().await?.into_iter().collect();
        let mut report = IngestReport::default();

        for document in documents {
            if existing.contains(&document.course.title) {
                report.skipped.push(document.course.title);
                continue;
            }

            report.chunks_added += self.index(&document).await?;
            report.courses_added += 1;
            existing.insert(document.course.title);
        }

        info!(
            "Added {} courses ({} chunks), skipped {}",
            report.courses_added,
            report.chunks_added,
            report.skipped.len()
        );
        Ok(report)
    }

    /// Number of courses and their titles.
    pub async fn course_analytics(&self) -> Result<CourseAnalytics> {
        let course_titles = self.store.course_titles().await?;
        Ok(CourseAnalytics {
            total_courses: course_titles.len(),
            course_titles,
        })
    }

    async fn index(&self, document: &CourseDocument) -> Result<usize> {
        self.store.add_course(&document.course).await?;
        self.store.add_chunks(&document.chunks).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreProvider;
    use crate::llm::{Completion, CompletionRequest, ToolCallRequest};
    use crate::vector_store::testing::KeywordEmbedder;
    use crate::vector_store::MemoryCourseStore;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::fs;
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;

    const COURSE: &str = "Course Title: Building Towards Computer Use
Course Link: https://example.com/computer-use
Course Instructor: Colt Steele

Lesson 1: Tool Use
Lesson Link: https://example.com/computer-use/1
Agents call a tool. The tool returns text to the agent.

Lesson 2: Screenshots
Computer use relies on screenshots of the screen.
";

    struct ScriptedClient {
        replies: StdMutex<VecDeque<Completion>>,
        requests: StdMutex<Vec<CompletionRequest>>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Completion>) -> Arc<Self> {
            Arc::new(Self {
                replies: StdMutex::new(replies.into()),
                requests: StdMutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
            self.requests.lock().unwrap().push(request);
            Ok(self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Completion::text("done")))
        }
    }

    fn search_call(arguments: &str) -> Completion {
        Completion::tool_calls(vec![ToolCallRequest {
            id: "call_1".to_string(),
            name: SEARCH_TOOL_NAME.to_string(),
            arguments: arguments.to_string(),
        }])
    }

    async fn assistant(client: Arc<ScriptedClient>) -> (CourseAssistant, TempDir) {
        let mut settings = Settings::default();
        settings.store.provider = StoreProvider::Memory;

        let embedder = Arc::new(KeywordEmbedder::new(&["agent", "tool", "screenshot", "computer"]));
        let store = Arc::new(MemoryCourseStore::new(embedder, settings.search.max_results));
        let assistant =
            CourseAssistant::with_components(settings, Prompts::default(), store, client).unwrap();

        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("computer_use.txt"), COURSE).unwrap();
        (assistant, dir)
    }

    #[tokio::test]
    async fn test_ingest_skips_existing_courses() {
        let (assistant, dir) = assistant(ScriptedClient::new(Vec::new())).await;

        let report = assistant.add_course_folder(dir.path(), false).await.unwrap();
        assert_eq!(report.courses_added, 1);
        assert!(report.chunks_added >= 2);

        let report = assistant.add_course_folder(dir.path(), false).await.unwrap();
        assert_eq!(report.courses_added, 0);
        assert_eq!(report.skipped, vec!["Building Towards Computer Use"]);

        let again = assistant
            .add_course_document(&dir.path().join("computer_use.txt"))
            .await
            .unwrap();
        assert!(again.is_none());

        let report = assistant.add_course_folder(dir.path(), true).await.unwrap();
        assert_eq!(report.courses_added, 1);

        let analytics = assistant.course_analytics().await.unwrap();
        assert_eq!(analytics.total_courses, 1);
        assert_eq!(analytics.course_titles, vec!["Building Towards Computer Use"]);
    }

    #[tokio::test]
    async fn test_query_returns_sources_then_resets() {
        let client = ScriptedClient::new(vec![
            search_call(r#"{"query": "tool", "course_name": "computer", "lesson_number": 1}"#),
            Completion::text("Agents call tools."),
            Completion::text("Hello again."),
        ]);
        let (assistant, dir) = assistant(client.clone()).await;
        assistant.add_course_folder(dir.path(), false).await.unwrap();

        let session = assistant.sessions().create_session().unwrap();
        let response = assistant.query("How do agents use tools?", Some(&session)).await.unwrap();

        assert_eq!(response.answer, "Agents call tools.");
        assert_eq!(response.sources.len(), 1);
        assert_eq!(
            response.sources[0].to_string(),
            "[Building Towards Computer Use - Lesson 1](https://example.com/computer-use/1)"
        );

        let response = assistant.query("Thanks", Some(&session)).await.unwrap();
        assert_eq!(response.answer, "Hello again.");
        assert!(response.sources.is_empty());

        let requests = client.requests.lock().unwrap();
        let user = requests[0].messages.last().unwrap().content.clone().unwrap();
        assert_eq!(user, "Answer this question about course materials: How do agents use tools?");

        let history = requests[2].messages[1].content.clone().unwrap();
        assert_eq!(
            history,
            "Previous conversation:\nUser: How do agents use tools?\nAssistant: Agents call tools."
        );
    }

    #[tokio::test]
    async fn test_direct_tool_helpers() {
        let (assistant, dir) = assistant(ScriptedClient::new(Vec::new())).await;
        assistant.add_course_folder(dir.path(), false).await.unwrap();

        let (output, sources) = assistant.search_content("screenshot", None, Some(2)).await;
        assert!(output.starts_with("[Building Towards Computer Use - Lesson 2]"));
        assert_eq!(sources.len(), 1);

        let (output, sources) = assistant.search_content("anything", Some("Nonexistent"), None).await;
        assert_eq!(output, "No course found matching 'Nonexistent'");
        assert!(sources.is_empty());

        let outline = assistant.course_outline("computer use").await;
        assert!(outline.contains("1. [Tool Use](https://example.com/computer-use/1)"));
        assert!(outline.contains("2. Screenshots"));
    }
}
