//! Ranking and course-name resolution shared by the store backends.

use super::{cosine_similarity, ChunkMetadata, SearchResults};
use crate::embedding::Embedder;
use crate::error::Result;
use std::sync::Arc;
use tracing::debug;

/// Minimum similarity for a semantic course-name match.
const MIN_TITLE_SIMILARITY: f32 = 0.3;

/// A stored chunk considered for ranking.
pub(crate) struct Candidate {
    pub content: String,
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f32>,
}

/// Embeds queries and ranks stored vectors against them.
pub(crate) struct Retriever {
    embedder: Arc<dyn Embedder>,
    max_results: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, max_results: usize) -> Self {
        Self {
            embedder,
            max_results,
        }
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Pick the catalog title best matching `course_name`.
    ///
    /// Case-insensitive exact matches win, then the shortest title containing the
    /// name, then the most similar title embedding above the similarity floor.
    pub async fn resolve(
        &self,
        course_name: &str,
        catalog: &[(String, Vec<f32>)],
    ) -> Result<Option<String>> {
        let needle = course_name.trim().to_lowercase();
        if needle.is_empty() || catalog.is_empty() {
            return Ok(None);
        }

        if let Some((title, _)) = catalog.iter().find(|(t, _)| t.to_lowercase() == needle) {
            return Ok(Some(title.clone()));
        }

        if let Some((title, _)) = catalog
            .iter()
            .filter(|(t, _)| t.to_lowercase().contains(&needle))
            .min_by_key(|(t, _)| t.len())
        {
            return Ok(Some(title.clone()));
        }

        let query = self.embedder.embed(course_name).await?;
        let best = catalog
            .iter()
            .map(|(title, embedding)| (title, cosine_similarity(&query, embedding)))
            .filter(|(_, score)| *score >= MIN_TITLE_SIMILARITY)
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        debug!(?best, "Semantic course name resolution for '{}'", course_name);
        Ok(best.map(|(title, _)| title.clone()))
    }

    /// Rank candidates by similarity to `query`, keeping the top results.
    pub async fn rank(&self, query: &str, candidates: Vec<Candidate>) -> Result<SearchResults> {
        if candidates.is_empty() {
            return Ok(SearchResults::empty());
        }

        let query_embedding = self.embedder.embed(query).await?;

        let mut scored: Vec<(f32, Candidate)> = candidates
            .into_iter()
            .map(|c| (cosine_similarity(&query_embedding, &c.embedding), c))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.max_results);

        let mut results = SearchResults::empty();
        for (score, candidate) in scored {
            results.push(candidate.content, candidate.metadata, score);
        }

        debug!("Ranked {} results", results.len());
        Ok(results)
    }
}
