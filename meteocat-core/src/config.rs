use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Example TOML:
    /// api_key = "..."
    pub api_key: Option<String>,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "meteocat-collect", "meteocat-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    /// Resolve the API key to use: an explicit override (CLI flag or
    /// environment variable) wins over the stored key. No key anywhere is a
    /// fatal configuration error.
    pub fn resolve_api_key(&self, override_key: Option<String>) -> Result<String> {
        if let Some(key) = override_key.filter(|key| !key.is_empty()) {
            return Ok(key);
        }

        self.api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "No Meteocat API key provided.\n\
                     Hint: pass --api-key, set METEOCAT_API_KEY, or run `meteocat configure` first."
                )
            })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_api_key_errors_when_nothing_is_set() {
        let cfg = Config::default();
        let err = cfg.resolve_api_key(None).unwrap_err();

        assert!(err.to_string().contains("No Meteocat API key provided"));
        assert!(err.to_string().contains("Hint: pass --api-key"));
    }

    #[test]
    fn override_key_wins_over_stored_key() {
        let mut cfg = Config::default();
        cfg.set_api_key("STORED".into());

        let key = cfg.resolve_api_key(Some("OVERRIDE".into())).expect("key must resolve");
        assert_eq!(key, "OVERRIDE");
    }

    #[test]
    fn stored_key_is_used_without_override() {
        let mut cfg = Config::default();
        cfg.set_api_key("STORED".into());

        let key = cfg.resolve_api_key(None).expect("key must resolve");
        assert_eq!(key, "STORED");
        assert!(cfg.is_configured());
    }

    #[test]
    fn empty_override_falls_back_to_stored_key() {
        let mut cfg = Config::default();
        cfg.set_api_key("STORED".into());

        let key = cfg.resolve_api_key(Some(String::new())).expect("key must resolve");
        assert_eq!(key, "STORED");
    }
}
