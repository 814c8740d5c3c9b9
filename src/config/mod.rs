use crate::core::error::{Result, ShellmancerError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

fn default_stderr_filters() -> Vec<String> {
    ["CategoryInfo", "FullyQualifiedErrorId", "At line:"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Persisted settings. Loaded once per operation and passed by reference;
/// changes go through [`Config::save`] with a new value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Save the line history on exit instead of deleting it.
    #[serde(default)]
    pub keep_history: bool,
    /// Substrings or regexes marking shell diagnostic noise on stderr.
    #[serde(default = "default_stderr_filters")]
    pub stderr_filters: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: None,
            base_url: None,
            keep_history: false,
            stderr_filters: default_stderr_filters(),
        }
    }
}

impl Config {
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".shellmancer")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    pub fn history_path() -> PathBuf {
        Self::config_dir().join("history")
    }

    pub fn load() -> Result<Config> {
        let path = Self::config_path();
        if path.exists() {
            return Self::load_from(&path);
        }

        let config = Config::default();
        if let Err(e) = config.save() {
            warn!("Could not write default config to {}: {}", path.display(), e);
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Config> {
        let contents = fs::read_to_string(path)?;
        let config = serde_yml::from_str::<Config>(&contents)
            .map_err(|e| ShellmancerError::Config(format!("Parse {}: {}", path.display(), e)))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let yaml_content = serde_yml::to_string(self)?;
        fs::write(path, yaml_content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
                warn!("Could not restrict permissions on {}: {}", path.display(), e);
            }
        }
        Ok(())
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// The environment variable wins over the stored key.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.api_key.clone())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }

    pub fn with_model(self, model: &str) -> Config {
        Config {
            model: Some(model.to_string()),
            ..self
        }
    }

    pub fn with_api_key(self, api_key: &str) -> Config {
        Config {
            api_key: Some(api_key.trim().to_string()),
            ..self
        }
    }

    pub fn without_api_key(self) -> Config {
        Config {
            api_key: None,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config: Config = serde_yml::from_str("keep_history: true\n").unwrap();
        assert!(config.keep_history);
        assert_eq!(config.model(), DEFAULT_MODEL);
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.stderr_filters, default_stderr_filters());
    }

    #[test]
    fn save_then_load_keeps_model_and_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let config = Config::default()
            .with_model("gemini-1.5-pro")
            .with_api_key("  secret  ");
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.model(), "gemini-1.5-pro");
        assert_eq!(loaded.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn removing_the_key_drops_it_from_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");

        Config::default().with_api_key("secret").save_to(&path).unwrap();
        Config::load_from(&path)
            .unwrap()
            .without_api_key()
            .save_to(&path)
            .unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("api_key"));
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "stderr_filters: [unclosed").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ShellmancerError::Config(_))
        ));
    }
}
