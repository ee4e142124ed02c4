use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::transport::FileSlots;

const FILENAME: &str = "config.yaml";
const APP_DIR: &str = "lumina";

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Environment variables consulted, in order, when no key is configured.
pub const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai: Option<AiConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiConfig {
    /// Gemini API key. If not set, falls back to the GEMINI_API_KEY or
    /// API_KEY environment variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the live-state, settings and history slots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR).join(FILENAME))
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                anyhow::anyhow!("No config found. Run `lumina config show` to see defaults.")
            } else {
                anyhow::anyhow!("Failed to read config: {e}")
            }
        })?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        let contents = format!("# Lumina configuration\n{yaml}");
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "ai.api_key" => {
                if value.is_empty() {
                    anyhow::bail!("API key must not be empty. Use `lumina ai remove` to clear it.");
                }
                self.ai.get_or_insert_with(AiConfig::default).api_key = Some(value.to_string());
            }
            "ai.model" => {
                if !value.starts_with("gemini-") {
                    anyhow::bail!(
                        "Invalid model: {value}. Must be a Gemini model name such as '{DEFAULT_MODEL}'."
                    );
                }
                self.ai.get_or_insert_with(AiConfig::default).model = Some(value.to_string());
            }
            "storage.dir" => {
                if value.is_empty() {
                    anyhow::bail!("Storage directory must not be empty.");
                }
                self.storage.get_or_insert_with(StorageConfig::default).dir =
                    Some(PathBuf::from(value));
            }
            _ => anyhow::bail!(
                "Unknown config key: {key}. Valid keys: ai.api_key, ai.model, storage.dir"
            ),
        }
        Ok(())
    }

    /// API key from config, then from the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    fn resolve_api_key_with(&self, env: impl Fn(&str) -> Option<String>) -> Option<String> {
        if let Some(key) = self.ai.as_ref().and_then(|ai| ai.api_key.as_ref()) {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }
        API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| env(name))
            .find(|key| !key.is_empty())
    }

    pub fn model(&self) -> &str {
        self.ai
            .as_ref()
            .and_then(|ai| ai.model.as_deref())
            .unwrap_or(DEFAULT_MODEL)
    }

    pub fn slots_dir(&self) -> Result<PathBuf> {
        self.storage
            .as_ref()
            .and_then(|s| s.dir.clone())
            .or_else(FileSlots::default_dir)
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_validates_keys() {
        let mut config = Config::default();
        config.set("ai.model", "gemini-2.0-flash").unwrap();
        assert_eq!(config.model(), "gemini-2.0-flash");

        let err = config.set("ai.model", "gpt-4").unwrap_err();
        assert!(err.to_string().contains("Invalid model"));

        let err = config.set("defaults.theme", "dark").unwrap_err();
        assert!(err.to_string().contains("Valid keys"));

        assert!(config.set("storage.dir", "  ").is_err());
        assert!(config.set("ai.api_key", "").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.model(), DEFAULT_MODEL);
        assert_eq!(config.slots_dir().ok(), FileSlots::default_dir());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(FILENAME);
        let mut config = Config::default();
        config.set("storage.dir", "/srv/lumina").unwrap();
        config.set("ai.api_key", "abc123").unwrap();
        config.save_to(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("# Lumina configuration"));

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.slots_dir().unwrap(), PathBuf::from("/srv/lumina"));
        assert_eq!(loaded.resolve_api_key_with(|_| None), Some("abc123".into()));
    }

    #[test]
    fn test_missing_file_message() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join(FILENAME)).unwrap_err();
        assert!(err.to_string().contains("No config found"));
    }

    #[test]
    fn test_api_key_env_fallback_order() {
        let config = Config::default();
        let both = |name: &str| match name {
            "GEMINI_API_KEY" => Some("from-gemini".to_string()),
            "API_KEY" => Some("from-generic".to_string()),
            _ => None,
        };
        assert_eq!(config.resolve_api_key_with(both), Some("from-gemini".into()));

        let generic = |name: &str| (name == "API_KEY").then(|| "from-generic".to_string());
        assert_eq!(config.resolve_api_key_with(generic), Some("from-generic".into()));

        let blank = |_: &str| Some(String::new());
        assert_eq!(config.resolve_api_key_with(blank), None);
    }
}
