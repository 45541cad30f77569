//! Configuration module for Coursemate.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AssistantPrompts, Prompts};
pub use settings::{
    EmbeddingSettings, GeneralSettings, OpenAISettings, PromptSettings, SearchSettings,
    ServerSettings, SessionSettings, Settings, StoreProvider, StoreSettings, API_KEY_ENV,
};
