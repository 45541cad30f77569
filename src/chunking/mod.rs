//! Splitting course text into overlapping, sentence-aligned chunks.

mod document;

pub use document::{load_course_folder, parse_course_document, read_course_file, CourseDocument};

use crate::config::Settings;
use regex::Regex;

/// Size limits for chunking, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Upper bound on chunk length. A single longer sentence becomes its own chunk.
    pub chunk_size: usize,
    /// Characters of trailing sentences repeated at the start of the next chunk.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
        }
    }
}

impl From<&Settings> for ChunkingConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            chunk_size: settings.search.chunk_size,
            chunk_overlap: settings.search.chunk_overlap,
        }
    }
}

/// Sentence-based chunker.
pub struct SentenceChunker {
    sentence_end: Regex,
    config: ChunkingConfig,
}

impl SentenceChunker {
    pub fn new(config: ChunkingConfig) -> Self {
        // Terminal punctuation followed by whitespace and a capitalised word
        let sentence_end = Regex::new(r"[.!?]+\s+[A-Z]").expect("Invalid regex");
        Self { sentence_end, config }
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    /// Split text into sentences after collapsing whitespace.
    pub fn split_sentences(&self, text: &str) -> Vec<String> {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut sentences = Vec::new();
        let mut start = 0;

        for m in self.sentence_end.find_iter(&normalized) {
            // The match ends on the first letter of the next sentence.
            let punct_end = m.as_str().trim_end_matches(|c: char| !c.is_ascii_punctuation()).len();
            let sentence = normalized[start..m.start() + punct_end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            start = m.end() - 1;
        }

        let rest = normalized[start..].trim();
        if !rest.is_empty() {
            sentences.push(rest.to_string());
        }
        sentences
    }

    /// Group sentences into chunks no longer than `chunk_size`, with consecutive
    /// chunks sharing up to `chunk_overlap` characters of whole sentences.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let sentences = self.split_sentences(text);
        let mut chunks = Vec::new();
        let mut i = 0;

        while i < sentences.len() {
            let mut end = i;
            let mut size = 0;

            while end < sentences.len() {
                let added = sentences[end].len() + usize::from(end > i);
                if end > i && size + added > self.config.chunk_size {
                    break;
                }
                size += added;
                end += 1;
            }

            chunks.push(sentences[i..end].join(" "));

            if end >= sentences.len() {
                break;
            }

            let mut overlap = 0;
            let mut overlap_size = 0;
            for sentence in sentences[i + 1..end].iter().rev() {
                let added = sentence.len() + usize::from(overlap > 0);
                if overlap_size + added > self.config.chunk_overlap {
                    break;
                }
                overlap_size += added;
                overlap += 1;
            }

            i = end - overlap;
        }

        chunks
    }
}
