//! Runtime configuration resolution for dmf-fusion
//!
//! Builds a validated `FusionConfig` from the bootstrap `TomlConfig`.
//! Analyzer API keys resolve with ENV → TOML priority.

use crate::error::{FusionError, FusionResult};
use crate::fusion::FusionOptions;
use crate::types::FieldTypePolicy;
use dmf_common::config::TomlConfig;
use tracing::{info, warn};

/// Environment variable overriding `[text] api_key`
pub const TEXT_API_KEY_ENV: &str = "DMF_TEXT_API_KEY";

/// Environment variable overriding `[vision] api_key`
pub const VISION_API_KEY_ENV: &str = "DMF_VISION_API_KEY";

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct FusionConfig {
    pub text_api_key: Option<String>,
    pub vision_api_key: Option<String>,
    /// Whether screenshots are sent to the vision analyzer
    pub vision_enabled: bool,
    pub fusion: FusionOptions,
    pub cache_enabled: bool,
    pub cache_max_entries: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            text_api_key: None,
            vision_api_key: None,
            vision_enabled: true,
            fusion: FusionOptions::default(),
            cache_enabled: true,
            cache_max_entries: 128,
        }
    }
}

impl FusionConfig {
    /// Resolve from TOML plus environment
    ///
    /// # Errors
    /// `FusionError::Configuration` for an unknown field type policy or an
    /// enabled cache with `max_entries = 0`
    pub fn resolve(toml_config: &TomlConfig) -> FusionResult<Self> {
        let field_type_policy: FieldTypePolicy = toml_config
            .fusion
            .field_type_policy
            .parse()
            .map_err(FusionError::Configuration)?;

        let config = Self {
            text_api_key: resolve_api_key(
                "text",
                TEXT_API_KEY_ENV,
                toml_config.text.api_key.as_deref(),
            ),
            vision_api_key: resolve_api_key(
                "vision",
                VISION_API_KEY_ENV,
                toml_config.vision.api_key.as_deref(),
            ),
            vision_enabled: toml_config.vision.enabled,
            fusion: FusionOptions {
                field_type_policy,
                timestamp_fields: toml_config.fusion.timestamp_fields,
            },
            cache_enabled: toml_config.cache.enabled,
            cache_max_entries: toml_config.cache.max_entries,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that do not depend on which analyzers get attached
    pub fn validate(&self) -> FusionResult<()> {
        if self.cache_enabled && self.cache_max_entries == 0 {
            return Err(FusionError::Configuration(
                "cache is enabled but [cache] max_entries is 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolve one analyzer API key
///
/// **Priority:** ENV → TOML. Blank values are ignored.
pub fn resolve_api_key(analyzer: &str, env_var: &str, toml_key: Option<&str>) -> Option<String> {
    let env_key = std::env::var(env_var).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_key.filter(|k| is_valid_key(k));

    match (env_key, toml_key) {
        (Some(env_key), Some(_)) => {
            warn!(
                analyzer,
                "API key found in both {} and TOML config. Using environment (highest priority).",
                env_var
            );
            Some(env_key)
        }
        (Some(env_key), None) => {
            info!(analyzer, "API key loaded from environment variable");
            Some(env_key)
        }
        (None, Some(toml_key)) => {
            info!(analyzer, "API key loaded from TOML config");
            Some(toml_key.to_string())
        }
        (None, None) => None,
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
