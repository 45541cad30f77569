//! Course store abstraction for Coursemate.
//!
//! The store holds two collections: a course catalog (one entry per course, used for
//! resolving partial course names and for outlines) and the chunked course content
//! used for semantic search. Both backends rank by cosine similarity over embeddings.

mod memory;
mod retrieval;
mod sqlite;

pub use memory::MemoryCourseStore;
pub use sqlite::SqliteCourseStore;

use crate::config::{Settings, StoreProvider};
use crate::embedding::Embedder;
use crate::error::Result;
use crate::models::{Course, CourseChunk};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Provenance of one search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub chunk_index: usize,
}

impl From<&CourseChunk> for ChunkMetadata {
    fn from(chunk: &CourseChunk) -> Self {
        Self {
            course_title: chunk.course_title.clone(),
            lesson_number: chunk.lesson_number,
            chunk_index: chunk.chunk_index,
        }
    }
}

/// Result set of a semantic search.
///
/// `documents`, `metadata` and `scores` are parallel and ordered best first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub documents: Vec<String>,
    pub metadata: Vec<ChunkMetadata>,
    pub scores: Vec<f32>,
    /// Set when the search could not run; the message is meant for the model.
    pub error: Option<String>,
}

impl SearchResults {
    /// An empty result set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// An empty result set carrying an error message.
    pub fn with_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Append one hit.
    pub fn push(&mut self, document: impl Into<String>, metadata: ChunkMetadata, score: f32) {
        self.documents.push(document.into());
        self.metadata.push(metadata);
        self.scores.push(score);
    }

    /// Iterate hits as (text, metadata) pairs.
    pub fn hits(&self) -> impl Iterator<Item = (&str, &ChunkMetadata)> {
        self.documents
            .iter()
            .map(String::as_str)
            .zip(self.metadata.iter())
    }
}

/// One entry of the serialized lesson list stored with a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonEntry {
    pub lesson_number: u32,
    #[serde(default = "untitled")]
    pub lesson_title: String,
    #[serde(default)]
    pub lesson_link: Option<String>,
}

fn untitled() -> String {
    "Untitled".to_string()
}

/// Catalog entry for a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseMetadata {
    pub title: String,
    pub instructor: Option<String>,
    pub course_link: Option<String>,
    /// JSON array of [`LessonEntry`].
    pub lessons_json: Option<String>,
}

impl CourseMetadata {
    /// Build catalog metadata for a course.
    pub fn from_course(course: &Course) -> Result<Self> {
        let lessons: Vec<LessonEntry> = course
            .lessons
            .iter()
            .map(|l| LessonEntry {
                lesson_number: l.lesson_number,
                lesson_title: l.title.clone(),
                lesson_link: l.lesson_link.clone(),
            })
            .collect();

        Ok(Self {
            title: course.title.clone(),
            instructor: course.instructor.clone(),
            course_link: course.course_link.clone(),
            lessons_json: Some(serde_json::to_string(&lessons)?),
        })
    }

    /// Parse the serialized lesson list. A missing list means no lessons.
    pub fn lessons(&self) -> Result<Vec<LessonEntry>> {
        match self.lessons_json.as_deref() {
            Some(json) if !json.trim().is_empty() => Ok(serde_json::from_str(json)?),
            _ => Ok(Vec::new()),
        }
    }

    /// Link of a lesson, if the lesson exists and has one.
    pub fn lesson_link(&self, lesson_number: u32) -> Result<Option<String>> {
        Ok(self
            .lessons()?
            .into_iter()
            .find(|l| l.lesson_number == lesson_number)
            .and_then(|l| l.lesson_link))
    }
}

/// Retrieval backend for course content and metadata.
#[async_trait]
pub trait CourseStore: Send + Sync {
    /// Semantic search over course content.
    ///
    /// `course_name` may be partial; it is resolved to a catalog title first. Failures
    /// are reported through [`SearchResults::error`] rather than as `Err`.
    async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> SearchResults;

    /// Resolve a partial or fuzzy course name to a catalog title.
    async fn resolve_course_name(&self, course_name: &str) -> Result<Option<String>>;

    /// Link of a specific lesson.
    async fn get_lesson_link(&self, course_title: &str, lesson_number: u32) -> Result<Option<String>>;

    /// Catalog metadata by exact course title.
    async fn get_course_metadata(&self, course_title: &str) -> Result<Option<CourseMetadata>>;

    /// Add or replace a course in the catalog.
    async fn add_course(&self, course: &Course) -> Result<()>;

    /// Index content chunks.
    async fn add_chunks(&self, chunks: &[CourseChunk]) -> Result<usize>;

    /// All catalog titles, sorted.
    async fn course_titles(&self) -> Result<Vec<String>>;

    /// Number of courses in the catalog.
    async fn course_count(&self) -> Result<usize> {
        Ok(self.course_titles().await?.len())
    }

    /// Remove all courses and content.
    async fn clear(&self) -> Result<()>;
}

/// Create the store backend selected in settings.
pub fn create_store(settings: &Settings, embedder: Arc<dyn Embedder>) -> Result<Arc<dyn CourseStore>> {
    let max_results = settings.search.max_results;
    match settings.store.provider {
        StoreProvider::Sqlite => Ok(Arc::new(SqliteCourseStore::new(
            &settings.sqlite_path(),
            embedder,
            max_results,
        )?)),
        StoreProvider::Memory => Ok(Arc::new(MemoryCourseStore::new(embedder, max_results))),
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Lesson;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_course_metadata_lessons() {
        let mut course = Course::new("Intro to MCP");
        course.lessons.push(Lesson {
            lesson_number: 1,
            title: "Setup".to_string(),
            lesson_link: Some("https://example.com/1".to_string()),
        });
        course.lessons.push(Lesson {
            lesson_number: 2,
            title: "Servers".to_string(),
            lesson_link: None,
        });

        let metadata = CourseMetadata::from_course(&course).unwrap();
        let lessons = metadata.lessons().unwrap();
        assert_eq!(lessons.len(), 2);
        assert_eq!(lessons[1].lesson_title, "Servers");
        assert_eq!(metadata.lesson_link(1).unwrap().as_deref(), Some("https://example.com/1"));
        assert_eq!(metadata.lesson_link(2).unwrap(), None);
        assert_eq!(metadata.lesson_link(9).unwrap(), None);
    }

    #[test]
    fn test_malformed_lessons_json_is_an_error() {
        let metadata = CourseMetadata {
            title: "Broken".to_string(),
            instructor: None,
            course_link: None,
            lessons_json: Some("not json".to_string()),
        };
        assert!(metadata.lessons().is_err());
    }
}
