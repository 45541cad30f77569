//! In-memory course store implementation.
//!
//! Useful for testing and for serving a folder of course documents without a database.

use super::retrieval::{Candidate, Retriever};
use super::{ChunkMetadata, CourseMetadata, CourseStore, SearchResults};
use crate::embedding::Embedder;
use crate::error::{CourseError, Result};
use crate::models::{Course, CourseChunk};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::warn;

struct CatalogEntry {
    metadata: CourseMetadata,
    embedding: Vec<f32>,
}

struct StoredChunk {
    chunk: CourseChunk,
    embedding: Vec<f32>,
}

/// In-memory course store.
pub struct MemoryCourseStore {
    retriever: Retriever,
    catalog: RwLock<BTreeMap<String, CatalogEntry>>,
    chunks: RwLock<Vec<StoredChunk>>,
}

impl MemoryCourseStore {
    /// Create a new in-memory store returning at most `max_results` hits per search.
    pub fn new(embedder: Arc<dyn Embedder>, max_results: usize) -> Self {
        Self {
            retriever: Retriever::new(embedder, max_results),
            catalog: RwLock::new(BTreeMap::new()),
            chunks: RwLock::new(Vec::new()),
        }
    }

    fn catalog_embeddings(&self) -> Result<Vec<(String, Vec<f32>)>> {
        let catalog = self.catalog.read().map_err(lock_error)?;
        Ok(catalog
            .iter()
            .map(|(title, entry)| (title.clone(), entry.embedding.clone()))
            .collect())
    }

    fn candidates(&self, course_title: Option<&str>, lesson_number: Option<u32>) -> Result<Vec<Candidate>> {
        let chunks = self.chunks.read().map_err(lock_error)?;
        Ok(chunks
            .iter()
            .filter(|s| course_title.map_or(true, |t| s.chunk.course_title == t))
            .filter(|s| lesson_number.map_or(true, |n| s.chunk.lesson_number == Some(n)))
            .map(|s| Candidate {
                content: s.chunk.content.clone(),
                metadata: ChunkMetadata::from(&s.chunk),
                embedding: s.embedding.clone(),
            })
            .collect())
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

fn lock_error<T>(e: std::sync::PoisonError<T>) -> CourseError {
    CourseError::Store(format!("Failed to acquire lock: {}", e))
}

#[async_trait]
impl CourseStore for MemoryCourseStore {
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
        let catalog = self.catalog.read().map_err(lock_error)?;
        Ok(catalog.get(course_title).map(|e| e.metadata.clone()))
    }

    async fn add_course(&self, course: &Course) -> Result<()> {
        let metadata = CourseMetadata::from_course(course)?;
        let embedding = self.retriever.embedder().embed(&course.title).await?;

        let mut catalog = self.catalog.write().map_err(lock_error)?;
        catalog.insert(course.title.clone(), CatalogEntry { metadata, embedding });
        Ok(())
    }

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

        let mut stored = self.chunks.write().map_err(lock_error)?;
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            stored.push(StoredChunk {
                chunk: chunk.clone(),
                embedding,
            });
        }
        Ok(chunks.len())
    }

    async fn course_titles(&self) -> Result<Vec<String>> {
        let catalog = self.catalog.read().map_err(lock_error)?;
        Ok(catalog.keys().cloned().collect())
    }

    async fn clear(&self) -> Result<()> {
        self.catalog.write().map_err(lock_error)?.clear();
        self.chunks.write().map_err(lock_error)?.clear();
        Ok(())
    }
}
