//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;
use std::path::PathBuf;

/// Run the config command against the file at `config_path`.
pub fn run_config(action: &ConfigAction, mut settings: Settings, config_path: PathBuf) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Set { key, value } => {
            settings.set_value(key, value)?;
            settings.save_to(&config_path)?;
            let shown = if key == "openai.api_key" { "********" } else { value.as_str() };
            Output::success(&format!("Set {} = {}", key, shown));
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_persists_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let action = ConfigAction::Set {
            key: "session.max_history".to_string(),
            value: "4".to_string(),
        };
        run_config(&action, Settings::default(), path.clone()).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.session.max_history, 4);
    }

    #[test]
    fn test_unknown_key_fails() {
        let dir = TempDir::new().unwrap();
        let action = ConfigAction::Set {
            key: "nope.key".to_string(),
            value: "1".to_string(),
        };
        assert!(run_config(&action, Settings::default(), dir.path().join("c.toml")).is_err());
    }
}
