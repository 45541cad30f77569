//! OpenAI client construction from explicit configuration.

use crate::config::Settings;
use crate::error::{CourseError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Create an OpenAI client from settings.
///
/// The API key comes from `openai.api_key`, falling back to `OPENAI_API_KEY`.
pub fn create_client(settings: &Settings) -> Result<Client<OpenAIConfig>> {
    let api_key = settings.api_key()?;
    create_client_with(
        &api_key,
        settings.openai.base_url.as_deref(),
        Duration::from_secs(settings.openai.timeout_secs),
    )
}

/// Create an OpenAI client with an explicit key, optional base URL and timeout.
pub fn create_client_with(
    api_key: &str,
    base_url: Option<&str>,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| CourseError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let mut config = OpenAIConfig::new().with_api_key(api_key);
    if let Some(base) = base_url {
        config = config.with_api_base(base);
    }

    Ok(Client::with_config(config).with_http_client(http_client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client_with_configured_key() {
        let mut settings = Settings::default();
        settings.openai.api_key = Some("sk-test".to_string());
        settings.openai.base_url = Some("http://localhost:11434/v1".to_string());
        assert!(create_client(&settings).is_ok());
    }
}
