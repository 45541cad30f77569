//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for course queries and the course catalog.

use super::open_assistant;
use crate::assistant::CourseAssistant;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, warn};

/// Shared application state.
pub struct AppState {
    assistant: CourseAssistant,
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let docs_dir = settings.server.docs_dir.clone();

    let assistant = open_assistant(Operation::Ask, settings)?;

    if let Some(dir) = docs_dir {
        let dir = Settings::expand_path(&dir);
        if dir.is_dir() {
            Output::info(&format!("Loading course documents from {}", dir.display()));
            match assistant.add_course_folder(&dir, false).await {
                Ok(report) => Output::success(&format!(
                    "Loaded {} courses ({} chunks)",
                    report.courses_added, report.chunks_added
                )),
                Err(e) => Output::warning(&format!("Could not load documents: {}", e)),
            }
        } else {
            warn!("Documents folder {} not found", dir.display());
        }
    }

    let app = router(Arc::new(AppState { assistant }));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Coursemate API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Query", "POST /api/query");
    Output::kv("Courses", "GET  /api/courses");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/query", post(query))
        .route("/api/courses", get(courses))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Serialize)]
struct QueryResponse {
    answer: String,
    sources: Vec<String>,
    session_id: String,
}

#[derive(Serialize)]
struct CourseStats {
    total_courses: usize,
    course_titles: Vec<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn internal_error(e: impl std::fmt::Display) -> axum::response::Response {
    error!("Request failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> impl IntoResponse {
    let session_id = match req.session_id {
        Some(id) => id,
        None => match state.assistant.sessions().create_session() {
            Ok(id) => id,
            Err(e) => return internal_error(e),
        },
    };

    match state.assistant.query(&req.query, Some(&session_id)).await {
        Ok(response) => Json(QueryResponse {
            answer: response.answer,
            sources: response.sources.iter().map(ToString::to_string).collect(),
            session_id,
        })
        .into_response(),
        Err(e) => internal_error(e),
    }
}

async fn courses(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.assistant.course_analytics().await {
        Ok(analytics) => Json(CourseStats {
            total_courses: analytics.total_courses,
            course_titles: analytics.course_titles,
        })
        .into_response(),
        Err(e) => internal_error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Prompts;
    use crate::error::Result;
    use crate::llm::{Completion, CompletionClient, CompletionRequest};
    use crate::models::{Course, CourseChunk};
    use crate::vector_store::testing::KeywordEmbedder;
    use crate::vector_store::{CourseStore, MemoryCourseStore};
    use async_trait::async_trait;
    use axum::body::to_bytes;
    use serde_json::Value;

    struct FixedClient;

    #[async_trait]
    impl CompletionClient for FixedClient {
        async fn complete(&self, _request: CompletionRequest) -> Result<Completion> {
            Ok(Completion::text("Lesson 1 covers setup."))
        }
    }

    async fn state() -> Arc<AppState> {
        let embedder = Arc::new(KeywordEmbedder::new(&["setup", "server"]));
        let store = Arc::new(MemoryCourseStore::new(embedder, 5));
        store.add_course(&Course::new("Intro to MCP")).await.unwrap();
        store
            .add_chunks(&[CourseChunk {
                content: "Lesson 1 content: setup".to_string(),
                course_title: "Intro to MCP".to_string(),
                lesson_number: Some(1),
                chunk_index: 0,
            }])
            .await
            .unwrap();

        let assistant = CourseAssistant::with_components(
            Settings::default(),
            Prompts::default(),
            store,
            Arc::new(FixedClient),
        )
        .unwrap();
        Arc::new(AppState { assistant })
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_query_creates_session() {
        let state = state().await;
        let request = QueryRequest {
            query: "What is in lesson 1?".to_string(),
            session_id: None,
        };

        let response = query(State(state.clone()), Json(request)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["answer"], "Lesson 1 covers setup.");
        assert_eq!(body["sources"], serde_json::json!([]));
        let session_id = body["session_id"].as_str().unwrap().to_string();
        assert!(session_id.starts_with("session_"));

        let history = state
            .assistant
            .sessions()
            .get_conversation_history(&session_id)
            .unwrap()
            .unwrap();
        assert!(history.starts_with("User: What is in lesson 1?"));
    }

    #[tokio::test]
    async fn test_courses_endpoint() {
        let response = courses(State(state().await)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["total_courses"], 1);
        assert_eq!(body["course_titles"], serde_json::json!(["Intro to MCP"]));
    }
}
