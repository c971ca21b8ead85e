//! Configuration loading, validation, and management for the Denkitsu
//! chat pipeline.
//!
//! Loads configuration from `~/.denkitsu/config.toml` with environment
//! variable overrides. Validates all settings at startup. Produces the
//! [`ChatSettings`] parameter struct the pipeline entry points take — the
//! pipeline never reads ambient configuration.

use std::path::{Path, PathBuf};

use denkitsu_core::client::Credentials;
use serde::{Deserialize, Serialize};

/// The root configuration structure.
///
/// Maps directly to `~/.denkitsu/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key forwarded to the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default AI provider
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub model: String,

    /// Backend base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Triage persona that decides which agent answers
    #[serde(default = "default_router_agent")]
    pub router_agent: String,

    /// Persona used by the prompt-improvement side-flow
    #[serde(default = "default_prompter_agent")]
    pub prompter_agent: String,

    /// Tools the agents may call
    #[serde(default)]
    pub active_tools: Vec<String>,

    /// Model catalogs, concatenated into the candidate list
    #[serde(default)]
    pub catalogs: ModelCatalogs,

    /// Transcription side-flow configuration
    #[serde(default)]
    pub transcription: TranscriptionConfig,
}

fn default_provider() -> String {
    "openrouter".into()
}
fn default_model() -> String {
    "deepseek/deepseek-chat-v3".into()
}
fn default_base_url() -> String {
    "https://api.denkitsu.app".into()
}
fn default_router_agent() -> String {
    "Roteador".into()
}
fn default_prompter_agent() -> String {
    "Prompter".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("router_agent", &self.router_agent)
            .field("prompter_agent", &self.prompter_agent)
            .field("active_tools", &self.active_tools)
            .field("catalogs", &self.catalogs)
            .field("transcription", &self.transcription)
            .finish()
    }
}

/// The three model catalogs supplied by the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelCatalogs {
    #[serde(default)]
    pub free: Vec<String>,

    #[serde(default)]
    pub paid: Vec<String>,

    #[serde(default)]
    pub groq: Vec<String>,
}

impl ModelCatalogs {
    /// The candidate model list: the catalogs concatenated in order,
    /// passed through to the backend unmodified.
    pub fn candidate_list(&self) -> Vec<String> {
        let mut all = Vec::with_capacity(self.free.len() + self.paid.len() + self.groq.len());
        all.extend(self.free.iter().cloned());
        all.extend(self.paid.iter().cloned());
        all.extend(self.groq.iter().cloned());
        all
    }
}

/// Transcription side-flow configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_transcription_model")]
    pub model: String,
}

fn default_true() -> bool {
    true
}
fn default_transcription_model() -> String {
    "whisper-large-v3".into()
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: default_transcription_model(),
        }
    }
}

/// Everything one orchestration run needs, passed explicitly.
///
/// Built once from [`AppConfig`] (or assembled by hand in tests) and handed
/// to the pipeline entry points — no configuration is threaded implicitly.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub credentials: Credentials,
    pub model: String,
    pub candidate_models: Vec<String>,
    pub active_tools: Vec<String>,
    pub router_agent: String,
    pub prompter_agent: String,
}

/// Everything the transcription side-flow needs to build its client.
#[derive(Clone)]
pub struct TranscriptionSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl std::fmt::Debug for TranscriptionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptionSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.denkitsu/config.toml).
    ///
    /// Environment variable overrides (highest priority):
    /// - `DENKITSU_API_KEY` (falls back to `OPENROUTER_API_KEY`)
    /// - `DENKITSU_PROVIDER`
    /// - `DENKITSU_MODEL`
    /// - `DENKITSU_BASE_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("DENKITSU_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("DENKITSU_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("DENKITSU_MODEL") {
            config.model = model;
        }

        if let Ok(base_url) = std::env::var("DENKITSU_BASE_URL") {
            config.base_url = base_url;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".denkitsu")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "base_url must not be empty".into(),
            ));
        }

        if self.router_agent.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "router_agent must not be empty".into(),
            ));
        }

        if self.prompter_agent.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "prompter_agent must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Whether an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Build the parameter struct the pipeline entry points take.
    ///
    /// Fails when no API key is configured.
    pub fn chat_settings(&self) -> Result<ChatSettings, ConfigError> {
        let api_key = self.api_key.clone().ok_or_else(|| {
            ConfigError::ValidationError(
                "no API key configured: set api_key or DENKITSU_API_KEY".into(),
            )
        })?;

        Ok(ChatSettings {
            credentials: Credentials {
                provider: self.provider.clone(),
                api_key,
            },
            model: self.model.clone(),
            candidate_models: self.catalogs.candidate_list(),
            active_tools: self.active_tools.clone(),
            router_agent: self.router_agent.clone(),
            prompter_agent: self.prompter_agent.clone(),
        })
    }

    /// Settings for the transcription side-flow's client.
    ///
    /// `None` when transcription is disabled or no API key is configured —
    /// hosts then skip constructing a transcriber entirely.
    pub fn transcription_settings(&self) -> Option<TranscriptionSettings> {
        if !self.transcription.enabled {
            return None;
        }
        let api_key = self.api_key.clone()?;
        Some(TranscriptionSettings {
            base_url: self.base_url.clone(),
            api_key,
            model: self.transcription.model.clone(),
        })
    }

    /// Generate a default config TOML string (for onboarding).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            model: default_model(),
            base_url: default_base_url(),
            router_agent: default_router_agent(),
            prompter_agent: default_prompter_agent(),
            active_tools: vec![],
            catalogs: ModelCatalogs::default(),
            transcription: TranscriptionConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.provider, "openrouter");
        assert_eq!(config.router_agent, "Roteador");
        assert_eq!(config.prompter_agent, "Prompter");
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider, config.provider);
        assert_eq!(parsed.router_agent, config.router_agent);
    }

    #[test]
    fn empty_base_url_rejected() {
        let config = AppConfig {
            base_url: "  ".into(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().provider, "openrouter");
    }

    #[test]
    fn candidate_list_concatenates_catalogs_in_order() {
        let catalogs = ModelCatalogs {
            free: vec!["free-1".into(), "free-2".into()],
            paid: vec!["paid-1".into()],
            groq: vec!["groq-1".into()],
        };
        assert_eq!(
            catalogs.candidate_list(),
            vec!["free-1", "free-2", "paid-1", "groq-1"]
        );
    }

    #[test]
    fn chat_settings_requires_api_key() {
        let config = AppConfig::default();
        assert!(config.chat_settings().is_err());

        let config = AppConfig {
            api_key: Some("sk-test".into()),
            ..AppConfig::default()
        };
        let settings = config.chat_settings().unwrap();
        assert_eq!(settings.credentials.api_key, "sk-test");
        assert_eq!(settings.router_agent, "Roteador");
    }

    #[test]
    fn transcription_settings_respect_the_enabled_flag() {
        let config = AppConfig {
            api_key: Some("sk-test".into()),
            ..AppConfig::default()
        };
        let settings = config.transcription_settings().unwrap();
        assert_eq!(settings.model, "whisper-large-v3");
        assert_eq!(settings.api_key, "sk-test");

        let disabled = AppConfig {
            api_key: Some("sk-test".into()),
            transcription: TranscriptionConfig {
                enabled: false,
                ..TranscriptionConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(disabled.transcription_settings().is_none());
    }

    #[test]
    fn transcription_settings_require_an_api_key() {
        let config = AppConfig::default();
        assert!(config.transcription_settings().is_none());
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-secret"));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
api_key = "sk-file"
model = "llama-3.3-70b"

[catalogs]
free = ["free-model"]
groq = ["groq-model"]

[transcription]
model = "whisper-1"
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-file"));
        assert_eq!(config.model, "llama-3.3-70b");
        assert_eq!(
            config.catalogs.candidate_list(),
            vec!["free-model", "groq-model"]
        );
        assert_eq!(config.transcription.model, "whisper-1");
    }

    #[test]
    fn parse_error_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_key = [not valid").unwrap();
        let result = AppConfig::load_from(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }
}
