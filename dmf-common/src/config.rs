//! Bootstrap configuration loading and config file resolution
//!
//! Configuration file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Platform config directory (`<config_dir>/dmf/config.toml`)
//! 4. Built-in defaults (fallback)
//!
//! Secrets (analyzer API keys) may also come from the environment; that
//! resolution lives with the consumer so it can report which source won.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "DMF_CONFIG";

/// Bootstrap configuration loaded from TOML file
///
/// Every section is optional; a missing file behaves like an empty one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Text analyzer settings
    #[serde(default)]
    pub text: TextSettings,

    /// Vision analyzer settings
    #[serde(default)]
    pub vision: VisionSettings,

    /// Fusion behavior settings
    #[serde(default)]
    pub fusion: FusionSettings,

    /// Raw analyzer payload cache settings
    #[serde(default)]
    pub cache: CacheSettings,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Text analyzer settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextSettings {
    /// API key for the language model backing the text analyzer
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Vision analyzer settings
#[derive(Debug, Clone, Deserialize)]
pub struct VisionSettings {
    /// Whether screenshots are sent to the vision analyzer at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// API key for the vision-capable model
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
        }
    }
}

/// Fusion behavior settings
#[derive(Debug, Clone, Deserialize)]
pub struct FusionSettings {
    /// Field type conflict policy name
    /// (`prefer_specific`, `prefer_existing`, `prefer_higher_confidence`)
    #[serde(default = "default_field_type_policy")]
    pub field_type_policy: String,

    /// Append `created_at`/`updated_at` to every entity
    #[serde(default = "default_true")]
    pub timestamp_fields: bool,
}

impl Default for FusionSettings {
    fn default() -> Self {
        Self {
            field_type_policy: default_field_type_policy(),
            timestamp_fields: true,
        }
    }
}

/// Raw analyzer payload cache settings
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Enable the in-memory cache
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum cached payloads before oldest entries are evicted
    #[serde(default = "default_cache_entries")]
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_cache_entries(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_field_type_policy() -> String {
    "prefer_specific".to_string()
}

fn default_cache_entries() -> usize {
    128
}

/// Parse a TOML configuration file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)?;
    debug!("Parsed TOML config: {}", path.display());
    Ok(config)
}

/// Resolve which config file to read, if any
///
/// An explicitly named file (CLI or environment) is returned even when it does
/// not exist so the caller reports the missing file instead of silently using
/// defaults. The platform default is only returned when present.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    default_config_path().filter(|p| p.exists())
}

/// Platform config file location (`~/.config/dmf/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("dmf").join("config.toml"))
}

/// Resolve and load bootstrap configuration
///
/// Falls back to built-in defaults when no config file is found.
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg, CONFIG_PATH_ENV) {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            info!("Loading configuration from {}", path.display());
            load_toml_config(&path)
        }
        None => {
            debug!("No config file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.logging.level, "info");
        assert!(config.vision.enabled);
        assert!(config.vision.api_key.is_none());
        assert_eq!(config.fusion.field_type_policy, "prefer_specific");
        assert!(config.fusion.timestamp_fields);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.max_entries, 128);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert!(config.vision.enabled);
    }

    #[test]
    fn test_partial_sections() {
        let config: TomlConfig = toml::from_str(
            r#"
            [vision]
            enabled = false

            [fusion]
            field_type_policy = "prefer_existing"
            "#,
        )
        .unwrap();
        assert!(!config.vision.enabled);
        assert_eq!(config.fusion.field_type_policy, "prefer_existing");
        assert!(config.fusion.timestamp_fields);
    }
}
