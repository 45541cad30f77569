//! Configuration settings for Coursemate.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub openai: OpenAISettings,
    pub embedding: EmbeddingSettings,
    pub store: StoreSettings,
    pub search: SearchSettings,
    pub session: SessionSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.coursemate".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Chat completion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAISettings {
    /// API key. Falls back to `OPENAI_API_KEY` when unset.
    pub api_key: Option<String>,
    /// Alternative API base URL (OpenAI-compatible servers).
    pub base_url: Option<String>,
    /// Chat model used for answers.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on tokens per completion.
    pub max_tokens: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            max_tokens: 800,
            timeout_secs: 300,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Course store backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreProvider {
    /// SQLite file on disk (default).
    #[default]
    Sqlite,
    /// Process-local, lost on exit.
    Memory,
}

impl std::str::FromStr for StoreProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(StoreProvider::Sqlite),
            "memory" => Ok(StoreProvider::Memory),
            _ => Err(format!("Unknown store provider: {}", s)),
        }
    }
}

impl std::fmt::Display for StoreProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreProvider::Sqlite => write!(f, "sqlite"),
            StoreProvider::Memory => write!(f, "memory"),
        }
    }
}

/// Course store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Store provider (sqlite, memory).
    pub provider: StoreProvider,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            provider: StoreProvider::Sqlite,
            sqlite_path: "~/.coursemate/courses.db".to_string(),
        }
    }
}

/// Retrieval and chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Maximum number of chunks returned per search.
    pub max_results: usize,
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters of trailing context repeated at the start of the next chunk.
    pub chunk_overlap: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_results: 5,
            chunk_size: 800,
            chunk_overlap: 100,
        }
    }
}

/// Conversation session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Number of question/answer exchanges remembered per session.
    pub max_history: usize,
    /// Number of sessions kept in memory; the least recently used is evicted first.
    pub max_sessions: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_history: 2,
            max_sessions: 1000,
        }
    }
}

/// HTTP API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Folder of course documents ingested at startup.
    pub docs_dir: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            docs_dir: None,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::CourseError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("coursemate")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.store.sqlite_path)
    }

    /// Resolve the API key: configured value first, then the environment.
    pub fn api_key(&self) -> crate::error::Result<String> {
        if let Some(key) = self.openai.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Ok(key.clone());
        }
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.is_empty() => Ok(key),
            Ok(_) => Err(crate::error::CourseError::Config(format!(
                "{} is empty. Set it with: export {}='sk-...'",
                API_KEY_ENV, API_KEY_ENV
            ))),
            Err(_) => Err(crate::error::CourseError::Config(format!(
                "No API key configured. Set openai.api_key or export {}='sk-...'",
                API_KEY_ENV
            ))),
        }
    }

    /// Set a dotted configuration key (e.g. "openai.model") from a string value.
    pub fn set_value(&mut self, key: &str, value: &str) -> crate::error::Result<()> {
        use crate::error::CourseError;

        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> crate::error::Result<T>
        where
            T::Err: std::fmt::Display,
        {
            value
                .parse()
                .map_err(|e| CourseError::Config(format!("Invalid value for {}: {}", key, e)))
        }

        fn optional(value: &str) -> Option<String> {
            if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            }
        }

        match key {
            "general.data_dir" => self.general.data_dir = value.to_string(),
            "general.log_level" => self.general.log_level = value.to_string(),
            "openai.api_key" => self.openai.api_key = optional(value),
            "openai.base_url" => self.openai.base_url = optional(value),
            "openai.model" => self.openai.model = value.to_string(),
            "openai.temperature" => self.openai.temperature = parse(key, value)?,
            "openai.max_tokens" => self.openai.max_tokens = parse(key, value)?,
            "openai.timeout_secs" => self.openai.timeout_secs = parse(key, value)?,
            "embedding.model" => self.embedding.model = value.to_string(),
            "embedding.dimensions" => self.embedding.dimensions = parse(key, value)?,
            "store.provider" => self.store.provider = parse(key, value)?,
            "store.sqlite_path" => self.store.sqlite_path = value.to_string(),
            "search.max_results" => self.search.max_results = parse(key, value)?,
            "search.chunk_size" => self.search.chunk_size = parse(key, value)?,
            "search.chunk_overlap" => self.search.chunk_overlap = parse(key, value)?,
            "session.max_history" => self.session.max_history = parse(key, value)?,
            "session.max_sessions" => self.session.max_sessions = parse(key, value)?,
            "server.host" => self.server.host = value.to_string(),
            "server.port" => self.server.port = parse(key, value)?,
            "server.docs_dir" => self.server.docs_dir = optional(value),
            "prompts.custom_dir" => self.prompts.custom_dir = optional(value),
            _ => return Err(CourseError::Config(format!("Unknown configuration key: {}", key))),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.openai.max_tokens, 800);
        assert_eq!(settings.openai.temperature, 0.0);
        assert_eq!(settings.search.max_results, 5);
        assert_eq!(settings.search.chunk_size, 800);
        assert_eq!(settings.search.chunk_overlap, 100);
        assert_eq!(settings.session.max_history, 2);
        assert_eq!(settings.store.provider, StoreProvider::Sqlite);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [openai]
            model = "gpt-4o"

            [store]
            provider = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(settings.openai.model, "gpt-4o");
        assert_eq!(settings.openai.max_tokens, 800);
        assert_eq!(settings.store.provider, StoreProvider::Memory);
        assert_eq!(settings.server.port, 8000);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.openai.model = "gpt-4.1".to_string();
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.openai.model, "gpt-4.1");
    }

    #[test]
    fn test_set_value() {
        let mut settings = Settings::default();
        settings.set_value("search.max_results", "8").unwrap();
        settings.set_value("store.provider", "memory").unwrap();
        settings.set_value("openai.api_key", "sk-test").unwrap();

        assert_eq!(settings.search.max_results, 8);
        assert_eq!(settings.store.provider, StoreProvider::Memory);
        assert_eq!(settings.api_key().unwrap(), "sk-test");

        assert!(settings.set_value("search.max_results", "many").is_err());
        assert!(settings.set_value("nope.key", "1").is_err());
    }
}
