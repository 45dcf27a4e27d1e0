//! Configuration loading, validation, and management for supperclub.
//!
//! Loads configuration from `~/.supperclub/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.supperclub/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Orchestration loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Session store policy
    #[serde(default)]
    pub sessions: SessionConfig,

    /// Tool credentials and data sources
    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}

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
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("providers", &self.providers)
            .field("gateway", &self.gateway)
            .field("agent", &self.agent)
            .field("sessions", &self.sessions)
            .field("tools", &self.tools)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// CORS origins. Empty = any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_port() -> u16 {
    8001
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origins: vec![],
        }
    }
}

/// How a presentation-mode context collects one tool's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectMode {
    /// Only the most recent result
    Latest,
    /// Every result, labeled by call order
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationToolConfig {
    pub tool: String,
    #[serde(default = "default_collect_mode")]
    pub mode: CollectMode,
}

fn default_collect_mode() -> CollectMode {
    CollectMode::Latest
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum model rounds per run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Executing this tool switches the run into presentation mode
    #[serde(default = "default_enrichment_tool")]
    pub enrichment_tool: String,

    /// Tools whose results feed the presentation context, in section order
    #[serde(default = "default_presentation_tools")]
    pub presentation_tools: Vec<PresentationToolConfig>,
}

fn default_max_iterations() -> u32 {
    15
}
fn default_enrichment_tool() -> String {
    "get_yelp_info".into()
}
fn default_presentation_tools() -> Vec<PresentationToolConfig> {
    [
        ("get_friends_info", CollectMode::Latest),
        ("calculate_drive_times", CollectMode::All),
        ("rank_and_score", CollectMode::Latest),
        ("get_restaurant_details", CollectMode::Latest),
        ("get_yelp_info", CollectMode::Latest),
    ]
    .into_iter()
    .map(|(tool, mode)| PresentationToolConfig {
        tool: tool.into(),
        mode,
    })
    .collect()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            enrichment_tool: default_enrichment_tool(),
            presentation_tools: default_presentation_tools(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Evict sessions idle for longer than this. 0 disables idle expiry.
    #[serde(default = "default_idle_ttl_secs")]
    pub idle_ttl_secs: u64,

    /// Evict the least recently used session beyond this many.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_idle_ttl_secs() -> u64 {
    2 * 60 * 60
}
fn default_max_sessions() -> usize {
    1_000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: default_idle_ttl_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_maps_api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yelp_api_key: Option<String>,

    /// JSON friend roster. The built-in roster is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friends_path: Option<PathBuf>,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_http_timeout_secs() -> u64 {
    15
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            google_maps_api_key: None,
            yelp_api_key: None,
            friends_path: None,
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for ToolsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolsConfig")
            .field("google_maps_api_key", &redact(&self.google_maps_api_key))
            .field("yelp_api_key", &redact(&self.yelp_api_key))
            .field("friends_path", &self.friends_path)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.supperclub/config.toml).
    ///
    /// Also checks environment variables:
    /// - `SUPPERCLUB_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `SUPPERCLUB_PROVIDER`, `SUPPERCLUB_MODEL`
    /// - `GOOGLE_MAPS_API_KEY`, `YELP_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_dir().join("config.toml"))
    }

    /// Load `path` (defaults when missing), then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
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

    /// Apply environment overrides through `lookup` (injectable for tests).
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("SUPPERCLUB_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }
        if let Some(provider) = lookup("SUPPERCLUB_PROVIDER") {
            self.default_provider = provider;
        }
        if let Some(model) = lookup("SUPPERCLUB_MODEL") {
            self.default_model = model;
        }
        if self.tools.google_maps_api_key.is_none() {
            self.tools.google_maps_api_key = lookup("GOOGLE_MAPS_API_KEY");
        }
        if self.tools.yelp_api_key.is_none() {
            self.tools.yelp_api_key = lookup("YELP_API_KEY");
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".supperclub")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_iterations == 0 || self.agent.max_iterations > 100 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be between 1 and 100".into(),
            ));
        }

        if self.agent.enrichment_tool.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "agent.enrichment_tool must not be empty".into(),
            ));
        }

        if self.sessions.max_sessions == 0 {
            return Err(ConfigError::ValidationError(
                "sessions.max_sessions must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            providers: HashMap::new(),
            gateway: GatewayConfig::default(),
            agent: AgentConfig::default(),
            sessions: SessionConfig::default(),
            tools: ToolsConfig::default(),
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

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_provider, "openai");
        assert_eq!(config.gateway.port, 8001);
        assert_eq!(config.agent.max_iterations, 15);
        assert_eq!(config.agent.enrichment_tool, "get_yelp_info");
    }

    #[test]
    fn drive_times_collect_every_result_by_default() {
        let config = AppConfig::default();
        let drive = config
            .agent
            .presentation_tools
            .iter()
            .find(|p| p.tool == "calculate_drive_times")
            .unwrap();
        assert_eq!(drive.mode, CollectMode::All);
        assert!(
            config
                .agent
                .presentation_tools
                .iter()
                .filter(|p| p.tool != "calculate_drive_times")
                .all(|p| p.mode == CollectMode::Latest)
        );
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.gateway.port, config.gateway.port);
        assert_eq!(
            parsed.agent.presentation_tools,
            config.agent.presentation_tools
        );
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_iterations_rejected() {
        let mut config = AppConfig::default();
        config.agent.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().default_model, "gpt-4o");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_model = "gpt-4o-mini"

[agent]
max_iterations = 20
enrichment_tool = "get_restaurant_details"

[[agent.presentation_tools]]
tool = "calculate_drive_times"
mode = "all"

[sessions]
idle_ttl_secs = 0
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.default_model, "gpt-4o-mini");
        assert_eq!(config.agent.max_iterations, 20);
        assert_eq!(config.agent.enrichment_tool, "get_restaurant_details");
        assert_eq!(config.agent.presentation_tools.len(), 1);
        assert_eq!(config.sessions.idle_ttl_secs, 0);
        assert_eq!(config.sessions.max_sessions, 1_000);
        assert_eq!(config.gateway.port, 8001);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_model = [").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_overrides_fill_gaps_only() {
        let mut config = AppConfig::default();
        config.tools.yelp_api_key = Some("from-file".into());
        config.apply_env(|key| match key {
            "OPENAI_API_KEY" => Some("sk-env".into()),
            "SUPPERCLUB_MODEL" => Some("gpt-4.1".into()),
            "YELP_API_KEY" => Some("from-env".into()),
            "GOOGLE_MAPS_API_KEY" => Some("maps".into()),
            _ => None,
        });
        assert_eq!(config.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.default_model, "gpt-4.1");
        assert_eq!(config.tools.yelp_api_key.as_deref(), Some("from-file"));
        assert_eq!(config.tools.google_maps_api_key.as_deref(), Some("maps"));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-secret".into());
        config.tools.google_maps_api_key = Some("maps-secret".into());
        let printed = format!("{config:?}");
        assert!(!printed.contains("sk-secret"));
        assert!(!printed.contains("maps-secret"));
        assert!(printed.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-4o"));
        assert!(toml_str.contains("8001"));
        assert!(toml_str.contains("get_yelp_info"));
    }
}
