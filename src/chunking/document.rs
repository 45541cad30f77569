//! Course document parsing.
//!
//! A course file starts with header lines, followed by lessons:
//!
//! ```text
//! Course Title: Building Towards Computer Use
//! Course Link: https://example.com/course
//! Course Instructor: Colt Steele
//!
//! Lesson 0: Introduction
//! Lesson Link: https://example.com/course/lesson-0
//! Lesson text...
//! ```
//!
//! Every header is optional. A missing title falls back to the file name.

use super::SentenceChunker;
use crate::error::{CourseError, Result};
use crate::models::{Course, CourseChunk, Lesson};
use regex::Regex;
use std::path::Path;
use tracing::{debug, info, warn};

/// File extensions recognised as course documents.
const COURSE_EXTENSIONS: &[&str] = &["txt", "md"];

/// A parsed course and its chunks, ready to index.
#[derive(Debug, Clone)]
pub struct CourseDocument {
    pub course: Course,
    pub chunks: Vec<CourseChunk>,
}

struct LessonDraft {
    lesson: Lesson,
    body: Vec<String>,
}

/// Parse course text into a course and its chunks.
pub fn parse_course_document(text: &str, fallback_title: &str, chunker: &SentenceChunker) -> Result<CourseDocument> {
    let lesson_header = Regex::new(r"(?i)^lesson\s+(\d+)\s*:\s*(.*)$").expect("Invalid regex");

    let mut title: Option<String> = None;
    let mut course_link = None;
    let mut instructor = None;
    let mut preamble: Vec<String> = Vec::new();
    let mut lessons: Vec<LessonDraft> = Vec::new();

    let mut lines = text.lines().map(str::trim).peekable();
    while let Some(line) = lines.next() {
        if let Some(caps) = lesson_header.captures(line) {
            let lesson_number: u32 = caps[1]
                .parse()
                .map_err(|e| CourseError::Ingest(format!("Bad lesson number '{}': {}", &caps[1], e)))?;
            let lesson_title = caps[2].trim();

            while lines.peek().is_some_and(|l| l.is_empty()) {
                lines.next();
            }
            let lesson_link = match lines.peek().copied().and_then(|l| header_value(l, "lesson link")) {
                Some(link) => {
                    lines.next();
                    valid_link(link)
                }
                None => None,
            };

            lessons.push(LessonDraft {
                lesson: Lesson {
                    lesson_number,
                    title: if lesson_title.is_empty() {
                        format!("Lesson {}", lesson_number)
                    } else {
                        lesson_title.to_string()
                    },
                    lesson_link,
                },
                body: Vec::new(),
            });
            continue;
        }

        if let Some(current) = lessons.last_mut() {
            current.body.push(line.to_string());
            continue;
        }

        if let Some(value) = header_value(line, "course title") {
            title = Some(value.to_string());
        } else if let Some(value) = header_value(line, "course link") {
            course_link = valid_link(value);
        } else if let Some(value) = header_value(line, "course instructor") {
            instructor = Some(value.to_string()).filter(|v| !v.is_empty());
        } else {
            preamble.push(line.to_string());
        }
    }

    let title = title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| fallback_title.to_string());
    if title.trim().is_empty() {
        return Err(CourseError::Ingest("Course document has no title".to_string()));
    }

    let mut course = Course::new(title);
    course.course_link = course_link;
    course.instructor = instructor;

    let mut chunks = Vec::new();
    let mut push_chunks = |body: &str, lesson_number: Option<u32>, course_title: &str| {
        for text in chunker.chunk(body) {
            let content = match lesson_number {
                Some(n) => format!("Lesson {} content: {}", n, text),
                None => text,
            };
            let chunk_index = chunks.len();
            chunks.push(CourseChunk {
                content,
                course_title: course_title.to_string(),
                lesson_number,
                chunk_index,
            });
        }
    };

    push_chunks(&preamble.join("\n"), None, &course.title);
    for draft in lessons {
        push_chunks(&draft.body.join("\n"), Some(draft.lesson.lesson_number), &course.title);
        course.lessons.push(draft.lesson);
    }

    debug!(
        "Parsed '{}': {} lessons, {} chunks",
        course.title,
        course.lessons.len(),
        chunks.len()
    );

    Ok(CourseDocument { course, chunks })
}

/// Read and parse one course file.
pub fn read_course_file(path: &Path, chunker: &SentenceChunker) -> Result<CourseDocument> {
    let text = std::fs::read_to_string(path)?;
    let fallback = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    parse_course_document(&text, &fallback, chunker)
}

/// Parse every course file directly inside `dir`, in file-name order.
///
/// Files that fail to parse are skipped with a warning.
pub fn load_course_folder(dir: &Path, chunker: &SentenceChunker) -> Result<Vec<CourseDocument>> {
    if !dir.is_dir() {
        return Err(CourseError::Ingest(format!(
            "Course folder {} does not exist",
            dir.display()
        )));
    }

    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_course_file(path))
        .collect();
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        match read_course_file(&path, chunker) {
            Ok(document) => documents.push(document),
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }

    info!("Loaded {} course documents from {}", documents.len(), dir.display());
    Ok(documents)
}

fn is_course_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| COURSE_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

/// Value of a `Key: value` line when the key matches case-insensitively.
fn header_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let (name, value) = line.split_once(':')?;
    name.trim().eq_ignore_ascii_case(key).then(|| value.trim())
}

fn valid_link(value: &str) -> Option<String> {
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(value.to_string()),
        _ => {
            if !value.is_empty() {
                warn!("Ignoring invalid link '{}'", value);
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::ChunkingConfig;
    use std::fs;
    use tempfile::TempDir;

    const SAMPLE: &str = "Course Title: Building Towards Computer Use
Course Link: https://example.com/computer-use
Course Instructor: Colt Steele

Lesson 0: Introduction
Lesson Link: https://example.com/computer-use/0
Welcome to the course. We will build an agent.

Lesson 1: Tool Use
Models can call tools. Tools return text.
";

    fn chunker() -> SentenceChunker {
        SentenceChunker::new(ChunkingConfig::default())
    }

    #[test]
    fn test_parse_headers_and_lessons() {
        let document = parse_course_document(SAMPLE, "fallback", &chunker()).unwrap();
        let course = &document.course;

        assert_eq!(course.title, "Building Towards Computer Use");
        assert_eq!(course.course_link.as_deref(), Some("https://example.com/computer-use"));
        assert_eq!(course.instructor.as_deref(), Some("Colt Steele"));
        assert_eq!(course.lessons.len(), 2);
        assert_eq!(course.lessons[0].title, "Introduction");
        assert_eq!(
            course.lessons[0].lesson_link.as_deref(),
            Some("https://example.com/computer-use/0")
        );
        assert_eq!(course.lessons[1].lesson_link, None);
    }

    #[test]
    fn test_chunks_tagged_with_lessons() {
        let document = parse_course_document(SAMPLE, "fallback", &chunker()).unwrap();

        assert_eq!(document.chunks.len(), 2);
        assert_eq!(document.chunks[0].lesson_number, Some(0));
        assert!(document.chunks[0].content.starts_with("Lesson 0 content: Welcome"));
        assert_eq!(document.chunks[1].lesson_number, Some(1));
        assert_eq!(document.chunks[1].chunk_index, 1);
        assert!(document
            .chunks
            .iter()
            .all(|c| c.course_title == "Building Towards Computer Use"));
    }

    #[test]
    fn test_missing_headers_and_bad_link() {
        let text = "Course Link: not a url\nSome loose notes about the course.";
        let document = parse_course_document(text, "notes", &chunker()).unwrap();

        assert_eq!(document.course.title, "notes");
        assert_eq!(document.course.course_link, None);
        assert!(document.course.lessons.is_empty());
        assert_eq!(document.chunks.len(), 1);
        assert_eq!(document.chunks[0].lesson_number, None);
    }

    #[test]
    fn test_no_title_at_all_is_error() {
        let result = parse_course_document("just text", "", &chunker());
        assert!(matches!(result, Err(CourseError::Ingest(_))));
    }

    #[test]
    fn test_load_folder_filters_extensions() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b_course.txt"), SAMPLE).unwrap();
        fs::write(dir.path().join("a_course.md"), "Course Title: Alpha\nLesson 1: One\nText here.").unwrap();
        fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();

        let documents = load_course_folder(dir.path(), &chunker()).unwrap();
        let titles: Vec<&str> = documents.iter().map(|d| d.course.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Building Towards Computer Use"]);
    }

    #[test]
    fn test_load_missing_folder() {
        let dir = TempDir::new().unwrap();
        let result = load_course_folder(&dir.path().join("missing"), &chunker());
        assert!(result.is_err());
    }
}
