//! Configuration for the pipeline, model selection, validation and provider keys.

use crate::{Error, ModelTier, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use toml::{from_str, to_string_pretty};
use tracing::debug;

/// Complete forge configuration.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct ForgeConfig {
    /// Pipeline behaviour
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Model identifiers and call limits
    #[serde(default)]
    pub models: ModelConfig,
    /// Validator limits
    #[serde(default)]
    pub validation: ValidationConfig,
    /// API keys for model providers
    #[serde(default)]
    pub api_keys: ApiKeys,
}

/// Pipeline behaviour knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Reflexion attempt ceiling per session
    pub max_reflexion_attempts: u32,
    /// Characters per streamed chunk
    pub chunk_size: usize,
    /// Sampling temperature for classification
    pub classification_temperature: f32,
    /// Sampling temperature for generation
    pub generation_temperature: f32,
    /// Sampling temperature for repair
    pub repair_temperature: f32,
    /// Token cap for the classification call
    pub classification_max_tokens: u32,
    /// Maximum characters of reference pattern code included in the generation prompt
    pub reference_snippet_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_reflexion_attempts: 3,
            chunk_size: 100,
            classification_temperature: 0.1,
            generation_temperature: 0.3,
            repair_temperature: 0.2,
            classification_max_tokens: 500,
            reference_snippet_chars: 1500,
        }
    }
}

/// Model identifiers per tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model used for the fast tier and for classification
    pub fast_model: String,
    /// Model used for the capable tier
    pub capable_model: String,
    /// Timeout in seconds for a single model call
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            fast_model: "anthropic/claude-3.5-haiku".to_owned(),
            capable_model: "anthropic/claude-sonnet-4".to_owned(),
            timeout_seconds: 120,
        }
    }
}

impl ModelConfig {
    /// Model identifier for a tier.
    #[must_use]
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.fast_model,
            ModelTier::Capable => &self.capable_model,
        }
    }
}

/// Validator limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Line limit advertised in the generation prompt and used by the default rule set
    pub max_lines: usize,
    /// Compiled-size limit for rule regexes, in bytes
    pub regex_size_limit: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_lines: 500,
            regex_size_limit: 1 << 20,
        }
    }
}

/// API keys for model providers.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiKeys {
    /// `OpenRouter` API key
    pub openrouter_api_key: Option<String>,
}

impl ForgeConfig {
    /// Get the default config directory path (`~/.forge`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_owned()))?;
        Ok(home.join(".forge"))
    }

    /// Get the default config file path (`~/.forge/config.toml`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from the default location, creating it with defaults if missing.
    ///
    /// # Errors
    /// Returns an error if the config cannot be read or created
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            let config = Self::default();
            config.save_to_file(&config_path)?;
            Ok(config)
        }
    }

    /// Load config from a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = from_str(&contents)?;

        debug!(
            "Loaded config from {:?}: openrouter_api_key={}",
            path,
            if config.api_keys.openrouter_api_key.is_some() {
                "present"
            } else {
                "missing"
            }
        );

        Ok(config)
    }

    /// Save config to a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be written
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = to_string_pretty(self)
            .map_err(|error| Error::Config(format!("Failed to serialize config: {error}")))?;

        let header = "# Forge Configuration File\n\
                      # This file is automatically generated on first run\n\
                      # Edit this file to customize your settings\n\n";

        fs::write(path, format!("{header}{contents}"))?;
        Ok(())
    }

    /// `OpenRouter` API key from the config, falling back to `OPENROUTER_API_KEY`.
    pub fn openrouter_api_key(&self) -> Option<String> {
        self.api_keys
            .openrouter_api_key
            .clone()
            .or_else(|| env::var("OPENROUTER_API_KEY").ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result as AnyResult;
    use std::io::Write as _;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_config() {
        let config = ForgeConfig::default();
        assert_eq!(config.pipeline.max_reflexion_attempts, 3);
        assert_eq!(config.pipeline.chunk_size, 100);
        assert_eq!(config.validation.max_lines, 500);
        assert_eq!(config.models.model_for(ModelTier::Fast), config.models.fast_model);
    }

    #[test]
    fn test_partial_file_uses_defaults() -> AnyResult<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(
            temp_file,
            "[pipeline]\nmax_reflexion_attempts = 5\n\n[api_keys]\nopenrouter_api_key = \"sk-test\"\n"
        )?;

        let config = ForgeConfig::load_from_file(temp_file.path())?;
        assert_eq!(config.pipeline.max_reflexion_attempts, 5);
        assert_eq!(config.pipeline.chunk_size, 100);
        assert_eq!(config.models.timeout_seconds, 120);
        assert_eq!(config.openrouter_api_key().as_deref(), Some("sk-test"));
        Ok(())
    }

    #[test]
    fn test_save_and_reload() -> AnyResult<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("config.toml");

        let mut config = ForgeConfig::default();
        config.models.capable_model = "openai/gpt-4o".to_owned();
        config.save_to_file(&path)?;

        let contents = fs::read_to_string(&path)?;
        assert!(contents.starts_with("# Forge Configuration File"));

        let reloaded = ForgeConfig::load_from_file(&path)?;
        assert_eq!(reloaded.models.capable_model, "openai/gpt-4o");
        Ok(())
    }

    #[test]
    fn test_invalid_toml_is_rejected() -> AnyResult<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "[pipeline\nbroken")?;

        let error = ForgeConfig::load_from_file(temp_file.path()).unwrap_err();
        assert!(matches!(error, Error::Toml(_)));
        Ok(())
    }
}
