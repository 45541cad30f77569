//! Coursemate - a course-content assistant
//!
//! Indexes course documents and answers questions about them with a tool-calling
//! model that can search lesson content and look up course outlines.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Settings and prompt templates
//! - `chunking` - Course document parsing and sentence chunking
//! - `embedding` - Embedding generation
//! - `vector_store` - Course catalog and content search
//! - `tools` - Search and outline tools, and the tool registry
//! - `llm` - Chat completion abstraction
//! - `rag` - Tool-mediated response generation and session history
//! - `assistant` - The query pipeline tying it all together
//!
//! # Example
//!
//! ```rust,no_run
//! use coursemate::assistant::CourseAssistant;
//! use coursemate::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let assistant = CourseAssistant::new(settings)?;
//!
//!     assistant.add_course_folder("docs".as_ref(), false).await?;
//!     let response = assistant.query("What does lesson 2 cover?", None).await?;
//!     println!("{}", response.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod assistant;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod models;
pub mod openai;
pub mod rag;
pub mod tools;
pub mod vector_store;

pub use error::{CourseError, Result};
