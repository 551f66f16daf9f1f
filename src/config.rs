// Contract-Drafter: Settings
// JSON settings file with the provider, the retry policy and an optional
// prompt override directory. Every field has a default, so a partial file
// (or none at all) is fine.

use crate::error::{DrafterError, Result};
use crate::llm::{LlmConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit settings file
pub const CONFIG_ENV: &str = "CONTRACT_DRAFTER_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DrafterConfig {
    pub llm: LlmConfig,
    pub retry: RetryPolicy,
    /// Directory of `<name>.md` prompts that take precedence over the built-in ones
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts_dir: Option<PathBuf>,
}

impl DrafterConfig {
    /// `<config dir>/contract-drafter/config.json`
    pub fn default_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("contract-drafter").join("config.json")
    }

    /// Load from `explicit`, else `$CONTRACT_DRAFTER_CONFIG`, else the default
    /// path. A missing default file yields the defaults; a missing explicit
    /// file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut config = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::from_path(&path)?,
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::from_path(&path)?
                } else {
                    log::debug!("No settings file at {}, using defaults", path.display());
                    Self::default()
                }
            }
        };
        config.retry.validate().map_err(DrafterError::Config)?;
        config.llm = config.llm.with_env_key();
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            DrafterError::Config(format!("Failed to read settings {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&json).map_err(|e| {
            DrafterError::Config(format!("Failed to parse settings {}: {}", path.display(), e))
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ProviderType;
    use tempfile::tempdir;

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"llm": {"provider": "anthropic", "model": "claude-3-5-haiku-latest"}, "retry": {"cooldown_ms": 0}}"#,
        )
        .unwrap();

        let config = DrafterConfig::from_path(&path).unwrap();
        assert_eq!(config.llm.provider, ProviderType::Anthropic);
        assert_eq!(config.retry.cooldown_ms, 0);
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.prompts_dir.is_none());
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let result = DrafterConfig::load(Some(&dir.path().join("absent.json")));
        assert!(matches!(result, Err(DrafterError::Config(_))));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(DrafterConfig::from_path(&path), Err(DrafterError::Config(_))));
    }

    #[test]
    fn test_cooldown_longer_than_deadline_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"retry": {"cooldown_ms": 40000, "call_timeout_ms": 30000}}"#)
            .unwrap();
        match DrafterConfig::load(Some(&path)) {
            Err(DrafterError::Config(message)) => assert!(message.contains("cooldown_ms")),
            other => panic!("expected a config error, got {:?}", other),
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = DrafterConfig {
            retry: RetryPolicy::fast(),
            prompts_dir: Some(dir.path().join("prompts")),
            ..DrafterConfig::default()
        };
        config.save(&path).unwrap();

        let loaded = DrafterConfig::from_path(&path).unwrap();
        assert_eq!(loaded.retry, RetryPolicy::fast());
        assert_eq!(loaded.prompts_dir, config.prompts_dir);
    }
}
