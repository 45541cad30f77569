//! SQLite-based course store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! Course catalogs are small, so a full scan per query is acceptable.

use super::retrieval::{Candidate, Retriever};
use super::{ChunkMetadata, CourseMetadata, CourseStore, SearchResults};
use crate::embedding::Embedder;
use crate::error::{CourseError, Result};
use crate::models::{Course, CourseChunk};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS courses (
    title TEXT PRIMARY KEY,
    instructor TEXT,
    course_link TEXT,
    lessons_json TEXT,
    embedding BLOB NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    course_title TEXT NOT NULL,
    lesson_number INTEGER,
    chunk_index INTEGER NOT NULL,
    content TEXT NOT NULL,
    embedding BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_course ON chunks(course_title);
CREATE INDEX IF NOT EXISTS idx_chunks_course_lesson ON chunks(course_title, lesson_number);
"#;

/// SQLite-based course store.
pub struct SqliteCourseStore {
    conn: Mutex<Connection>,
    retriever: Retriever,
}

impl SqliteCourseStore {
    /// Open (or create) a store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path, embedder: Arc<dyn Embedder>, max_results: usize) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite course store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
            retriever: Retriever::new(embedder, max_results),
        })
    }

    /// Create an in-memory SQLite store (useful for testing).
    pub fn in_memory(embedder: Arc<dyn Embedder>, max_results: usize) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
            retriever: Retriever::new(embedder, max_results),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| CourseError::Store(format!("Failed to acquire lock: {}", e)))
    }

    /// Number of indexed content chunks.
    pub fn chunk_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn catalog_embeddings(&self) -> Result<Vec<(String, Vec<f32>)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT title, embedding FROM courses")?;
        let rows = stmt.query_map([], |row| {
            let title: String = row.get(0)?;
            let bytes: Vec<u8> = row.get(1)?;
            Ok((title, Self::bytes_to_embedding(&bytes)))
        })?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    fn candidates(&self, course_title: Option<&str>, lesson_number: Option<u32>) -> Result<Vec<Candidate>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT course_title, lesson_number, chunk_index, content, embedding
            FROM chunks
            WHERE (?1 IS NULL OR course_title = ?1)
              AND (?2 IS NULL OR lesson_number = ?2)
            "#,
        )?;

        let rows = stmt.query_map(params![course_title, lesson_number], |row| {
            let chunk_index: i64 = row.get(2)?;
            let bytes: Vec<u8> = row.get(4)?;
            Ok(Candidate {
                metadata: ChunkMetadata {
                    course_title: row.get(0)?,
                    lesson_number: row.get(1)?,
                    chunk_index: chunk_index as usize,
                },
                content: row.get(3)?,
                embedding: Self::bytes_to_embedding(&bytes),
            })
        })?;

        let candidates: Vec<Candidate> = rows.filter_map(|r| r.ok()).collect();
        debug!("Loaded {} candidate chunks", candidates.len());
        Ok(candidates)
    }

    async fn try_search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> Result<SearchResults> {
        let course_title = match course_name {
            Some(name) => match self.resolve_course_name(name).await? {
                Some(title) => Some(title),
                None => return Ok(SearchResults::with_error(format!("No course found matching '{}'", name))),
            },
            None => None,
        };

        let candidates = self.candidates(course_title.as_deref(), lesson_number)?;
        self.retriever.rank(query, candidates).await
    }
}

#[async_trait]
impl CourseStore for SqliteCourseStore {
    #[instrument(skip(self))]
    async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> SearchResults {
        match self.try_search(query, course_name, lesson_number).await {
            Ok(results) => results,
            Err(e) => {
                warn!("Search failed: {}", e);
                SearchResults::with_error(format!("Search error: {}", e))
            }
        }
    }

    #[instrument(skip(self))]
    async fn resolve_course_name(&self, course_name: &str) -> Result<Option<String>> {
        let catalog = self.catalog_embeddings()?;
        self.retriever.resolve(course_name, &catalog).await
    }

    async fn get_lesson_link(&self, course_title: &str, lesson_number: u32) -> Result<Option<String>> {
        match self.get_course_metadata(course_title).await? {
            Some(metadata) => metadata.lesson_link(lesson_number),
            None => Ok(None),
        }
    }

    async fn get_course_metadata(&self, course_title: &str) -> Result<Option<CourseMetadata>> {
        let conn = self.lock()?;
        let metadata = conn
            .query_row(
                "SELECT title, instructor, course_link, lessons_json FROM courses WHERE title = ?1",
                params![course_title],
                |row| {
                    Ok(CourseMetadata {
                        title: row.get(0)?,
                        instructor: row.get(1)?,
                        course_link: row.get(2)?,
                        lessons_json: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(metadata)
    }

    #[instrument(skip(self, course), fields(title = %course.title))]
    async fn add_course(&self, course: &Course) -> Result<()> {
        let metadata = CourseMetadata::from_course(course)?;
        let embedding = self.retriever.embedder().embed(&course.title).await?;

        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO courses
            (title, instructor, course_link, lessons_json, embedding, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                metadata.title,
                metadata.instructor,
                metadata.course_link,
                metadata.lessons_json,
                Self::embedding_to_bytes(&embedding),
                Utc::now().to_rfc3339(),
            ],
        )?;

        debug!("Stored course metadata");
        Ok(())
    }

    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    async fn add_chunks(&self, chunks: &[CourseChunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.retriever.embedder().embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(CourseError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO chunks
                (id, course_title, lesson_number, chunk_index, content, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    uuid::Uuid::new_v4().to_string(),
                    chunk.course_title,
                    chunk.lesson_number,
                    chunk.chunk_index as i64,
                    chunk.content,
                    Self::embedding_to_bytes(embedding),
                ],
            )?;
        }

        tx.commit()?;
        info!("Indexed {} chunks", chunks.len());
        Ok(chunks.len())
    }

    async fn course_titles(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT title FROM courses ORDER BY title")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    async fn course_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM courses", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch("DELETE FROM chunks; DELETE FROM courses;")?;
        info!("Cleared course store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Lesson;
    use crate::vector_store::testing::KeywordEmbedder;

    fn store() -> SqliteCourseStore {
        let embedder = Arc::new(KeywordEmbedder::new(&["rust", "borrow", "async", "trait"]));
        SqliteCourseStore::in_memory(embedder, 2).unwrap()
    }

    #[tokio::test]
    async fn test_sqlite_course_store() {
        let store = store();

        let mut course = Course::new("Rust Fundamentals");
        course.course_link = Some("https://example.com/rust".to_string());
        course.lessons.push(Lesson {
            lesson_number: 3,
            title: "Ownership".to_string(),
            lesson_link: Some("https://example.com/rust/3".to_string()),
        });
        store.add_course(&course).await.unwrap();

        let chunks = vec![
            CourseChunk {
                content: "The borrow checker enforces borrow rules.".to_string(),
                course_title: course.title.clone(),
                lesson_number: Some(3),
                chunk_index: 0,
            },
            CourseChunk {
                content: "Async functions return futures.".to_string(),
                course_title: course.title.clone(),
                lesson_number: Some(4),
                chunk_index: 1,
            },
            CourseChunk {
                content: "Trait objects and async traits.".to_string(),
                course_title: course.title.clone(),
                lesson_number: None,
                chunk_index: 2,
            },
        ];
        assert_eq!(store.add_chunks(&chunks).await.unwrap(), 3);
        assert_eq!(store.chunk_count().unwrap(), 3);

        // max_results caps the hit count
        let results = store.search("async", None, None).await;
        assert_eq!(results.len(), 2);

        let results = store.search("borrow", Some("rust"), Some(3)).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results.metadata[0].lesson_number, Some(3));
        assert_eq!(results.metadata[0].chunk_index, 0);

        assert_eq!(
            store.get_lesson_link("Rust Fundamentals", 3).await.unwrap().as_deref(),
            Some("https://example.com/rust/3")
        );
        assert_eq!(store.course_count().await.unwrap(), 1);

        store.clear().await.unwrap();
        assert_eq!(store.course_count().await.unwrap(), 0);
        assert_eq!(store.chunk_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_replacing_course_keeps_single_entry() {
        let store = store();
        let mut course = Course::new("Rust Fundamentals");
        store.add_course(&course).await.unwrap();

        course.instructor = Some("Ferris".to_string());
        store.add_course(&course).await.unwrap();

        assert_eq!(store.course_count().await.unwrap(), 1);
        let metadata = store.get_course_metadata("Rust Fundamentals").await.unwrap().unwrap();
        assert_eq!(metadata.instructor.as_deref(), Some("Ferris"));
        assert!(store.get_course_metadata("Missing").await.unwrap().is_none());
    }

    #[test]
    fn test_embedding_bytes_roundtrip() {
        let embedding = vec![0.5, -1.25, 3.0];
        let bytes = SqliteCourseStore::embedding_to_bytes(&embedding);
        assert_eq!(SqliteCourseStore::bytes_to_embedding(&bytes), embedding);
    }
}
