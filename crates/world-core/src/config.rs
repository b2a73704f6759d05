use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::RegistryError;
use crate::preset::{Preset, PresetRegistry};

pub const DEFAULT_CONFIG_PATH: &str = "configs/world.yaml";
pub const DEFAULT_FAILURE_MESSAGE: &str = "Failed to connect to the universe. Please try again.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Model identifier passed to the generation service.
    pub model: String,
    /// Base URL of the Gemini REST API (without the `/models/...` suffix).
    pub api_base: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub connect_timeout_secs: u64,
    /// Longest wait for the first chunk, or between two chunks, before the attempt fails.
    pub read_timeout_secs: u64,
    /// Text shown in place of the greeting when generation fails.
    pub failure_message: String,
    /// Where the terminal UI writes its log.
    pub log_file: String,
    /// Replaces the built-in vibes when set.
    pub presets: Option<Vec<Preset>>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            model: "gemini-3-flash-preview".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: "API_KEY".to_string(),
            connect_timeout_secs: 10,
            read_timeout_secs: 30,
            failure_message: DEFAULT_FAILURE_MESSAGE.to_string(),
            log_file: "world-tui.log".to_string(),
            presets: None,
        }
    }
}

impl WorldConfig {
    /// Reads a YAML config if `path` exists, otherwise returns the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {:?}", path))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse config at {:?}", path))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a map.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Configured presets, or the built-in ones when none are given.
    pub fn registry(&self) -> Result<PresetRegistry, RegistryError> {
        match &self.presets {
            Some(presets) => PresetRegistry::new(presets.clone()),
            None => Ok(PresetRegistry::builtin()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = WorldConfig::from_yaml("model: gemini-2.5-flash\nconnect_timeout_secs: 3\n").unwrap();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.connect_timeout_secs, 3);
        assert_eq!(config.failure_message, DEFAULT_FAILURE_MESSAGE);
        assert_eq!(config.api_key_env, "API_KEY");
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(WorldConfig::from_yaml("").unwrap(), WorldConfig::default());
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = WorldConfig::load_or_default("does/not/exist.yaml").unwrap();
        assert_eq!(config, WorldConfig::default());
    }

    #[test]
    fn test_custom_presets() {
        let config = WorldConfig::from_yaml(
            "presets:\n  - id: pirate\n    label: Pirate\n    prompt: a swashbuckling pirate greeting\n  - id: haiku\n    label: Haiku\n    prompt: a haiku\n",
        )
        .unwrap();
        let registry = config.registry().unwrap();
        assert_eq!(registry.ids(), vec!["pirate", "haiku"]);
        assert_eq!(registry.default_preset().prompt, "a swashbuckling pirate greeting");
    }

    #[test]
    fn test_no_presets_means_builtin() {
        let registry = WorldConfig::default().registry().unwrap();
        assert_eq!(registry.ids(), vec!["friendly", "scifi", "poetic", "code"]);
    }

    #[test]
    fn test_invalid_custom_presets() {
        let empty = WorldConfig::from_yaml("presets: []\n").unwrap();
        assert_eq!(empty.registry().unwrap_err(), RegistryError::Empty);

        let duplicate = WorldConfig::from_yaml(
            "presets:\n  - {id: a, label: A, prompt: one}\n  - {id: a, label: B, prompt: two}\n",
        )
        .unwrap();
        assert_eq!(
            duplicate.registry().unwrap_err(),
            RegistryError::DuplicateId("a".to_string())
        );
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        assert!(WorldConfig::from_yaml("model: [unterminated").is_err());
    }
}
