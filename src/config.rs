//! Configuration management for TownChat
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{Result, TownchatError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for TownChat
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Hosted assistant provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Run status polling behavior
    #[serde(default)]
    pub polling: PollingConfig,

    /// Chat log and chatbot storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Provider configuration
///
/// Specifies which assistant provider to use and its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use
    #[serde(rename = "type", default = "default_provider_type")]
    pub provider_type: String,

    /// OpenAI Assistants configuration
    #[serde(default)]
    pub openai: OpenAiConfig,
}

fn default_provider_type() -> String {
    "openai".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            openai: OpenAiConfig::default(),
        }
    }
}

/// OpenAI Assistants API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API base URL (overridable for tests and proxies)
    #[serde(default = "default_openai_api_base")]
    pub api_base: String,

    /// API key; usually supplied through the environment instead of the file
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model used when a chatbot does not name one
    #[serde(default = "default_openai_model")]
    pub default_model: String,

    /// Prefix every provider thread id must start with
    #[serde(default = "default_thread_prefix")]
    pub thread_prefix: String,

    /// Per-request HTTP timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub timeout_seconds: u64,
}

fn default_openai_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_thread_prefix() -> String {
    "thread_".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base: default_openai_api_base(),
            api_key: None,
            default_model: default_openai_model(),
            thread_prefix: default_thread_prefix(),
            timeout_seconds: default_request_timeout(),
        }
    }
}

/// Run status polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Delay between two status checks (milliseconds)
    #[serde(default = "default_poll_interval")]
    pub interval_ms: u64,

    /// Maximum number of status checks before giving up
    #[serde(default = "default_poll_attempts")]
    pub max_attempts: u32,
}

fn default_poll_interval() -> u64 {
    2_000
}

fn default_poll_attempts() -> u32 {
    30
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval(),
            max_attempts: default_poll_attempts(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// SQLite database file; the platform data directory is used when unset
    #[serde(default)]
    pub path: Option<String>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| TownchatError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| TownchatError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(provider_type) = std::env::var("TOWNCHAT_PROVIDER") {
            self.provider.provider_type = provider_type;
        }

        if let Ok(api_base) = std::env::var("TOWNCHAT_OPENAI_API_BASE") {
            self.provider.openai.api_base = api_base;
        }

        // The project-specific key wins over the generic one.
        if let Ok(api_key) =
            std::env::var("TOWNCHAT_OPENAI_API_KEY").or_else(|_| std::env::var("OPENAI_API_KEY"))
        {
            self.provider.openai.api_key = Some(api_key);
        }

        if let Ok(model) = std::env::var("TOWNCHAT_OPENAI_MODEL") {
            self.provider.openai.default_model = model;
        }

        if let Ok(interval) = std::env::var("TOWNCHAT_POLL_INTERVAL_MS") {
            if let Ok(value) = interval.parse() {
                self.polling.interval_ms = value;
            } else {
                tracing::warn!("Invalid TOWNCHAT_POLL_INTERVAL_MS: {}", interval);
            }
        }

        if let Ok(attempts) = std::env::var("TOWNCHAT_POLL_MAX_ATTEMPTS") {
            if let Ok(value) = attempts.parse() {
                self.polling.max_attempts = value;
            } else {
                tracing::warn!("Invalid TOWNCHAT_POLL_MAX_ATTEMPTS: {}", attempts);
            }
        }

        if let Ok(db_path) = std::env::var("TOWNCHAT_DB") {
            tracing::debug!(db_path = %db_path, "Env override: TOWNCHAT_DB");
            self.storage.path = Some(db_path);
        }

        if let Ok(bind) = std::env::var("TOWNCHAT_BIND") {
            self.server.bind_address = bind;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(path) = &cli.storage_path {
            self.storage.path = Some(path.clone());
        }

        if let crate::cli::Commands::Serve {
            bind: Some(bind), ..
        } = &cli.command
        {
            self.server.bind_address = bind.clone();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `TownchatError::Config` describing the first invalid setting
    pub fn validate(&self) -> Result<()> {
        if self.provider.provider_type.is_empty() {
            return Err(TownchatError::Config("Provider type cannot be empty".to_string()).into());
        }

        let valid_providers = ["openai"];
        if !valid_providers.contains(&self.provider.provider_type.as_str()) {
            return Err(TownchatError::Config(format!(
                "Invalid provider type: {}. Must be one of: {}",
                self.provider.provider_type,
                valid_providers.join(", ")
            ))
            .into());
        }

        if self.provider.openai.thread_prefix.is_empty() {
            return Err(TownchatError::Config(
                "provider.openai.thread_prefix cannot be empty".to_string(),
            )
            .into());
        }

        if self.provider.openai.timeout_seconds == 0 {
            return Err(TownchatError::Config(
                "provider.openai.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.polling.interval_ms == 0 {
            return Err(TownchatError::Config(
                "polling.interval_ms must be greater than 0".to_string(),
            )
            .into());
        }

        if self.polling.max_attempts == 0 || self.polling.max_attempts > 600 {
            return Err(TownchatError::Config(
                "polling.max_attempts must be between 1 and 600".to_string(),
            )
            .into());
        }

        if self.server.bind_address.trim().is_empty() {
            return Err(
                TownchatError::Config("server.bind_address cannot be empty".to_string()).into(),
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use serial_test::serial;

    fn cli_with(command: Commands) -> Cli {
        Cli {
            config: None,
            verbose: false,
            storage_path: None,
            json_logs: false,
            command,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider.provider_type, "openai");
        assert_eq!(config.polling.interval_ms, 2_000);
        assert_eq!(config.polling.max_attempts, 30);
        assert_eq!(config.provider.openai.thread_prefix, "thread_");
        assert!(config.storage.path.is_none());
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_provider() {
        let mut config = Config::default();
        config.provider.provider_type = "copilot".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_attempts() {
        let mut config = Config::default();
        config.polling.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_too_many_attempts() {
        let mut config = Config::default();
        config.polling.max_attempts = 601;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_interval() {
        let mut config = Config::default();
        config.polling.interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_empty_prefix() {
        let mut config = Config::default();
        config.provider.openai.thread_prefix = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
provider:
  type: openai
  openai:
    api_base: http://localhost:9999/v1
    default_model: gpt-4o
polling:
  interval_ms: 500
  max_attempts: 10
storage:
  path: /tmp/townchat.db
server:
  bind_address: 127.0.0.1:8080
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.provider.openai.api_base, "http://localhost:9999/v1");
        assert_eq!(config.provider.openai.default_model, "gpt-4o");
        assert_eq!(config.provider.openai.thread_prefix, "thread_");
        assert_eq!(config.polling.interval_ms, 500);
        assert_eq!(config.polling.max_attempts, 10);
        assert_eq!(config.storage.path.as_deref(), Some("/tmp/townchat.db"));
        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let config: Config = serde_yaml::from_str(include_str!("../config/config.yaml")).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.storage.path.is_none());
    }

    #[test]
    fn test_config_from_empty_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.polling.max_attempts, 30);
        assert_eq!(config.server.bind_address, "0.0.0.0:3000");
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var("TOWNCHAT_POLL_MAX_ATTEMPTS", "5");
        std::env::set_var("TOWNCHAT_POLL_INTERVAL_MS", "not-a-number");
        std::env::set_var("TOWNCHAT_OPENAI_API_KEY", "sk-test");

        let mut config = Config::default();
        config.apply_env_vars();

        assert_eq!(config.polling.max_attempts, 5);
        assert_eq!(config.polling.interval_ms, 2_000);
        assert_eq!(config.provider.openai.api_key.as_deref(), Some("sk-test"));

        std::env::remove_var("TOWNCHAT_POLL_MAX_ATTEMPTS");
        std::env::remove_var("TOWNCHAT_POLL_INTERVAL_MS");
        std::env::remove_var("TOWNCHAT_OPENAI_API_KEY");
    }

    #[test]
    fn test_cli_overrides_bind_and_storage() {
        let mut cli = cli_with(Commands::Serve {
            bind: Some("127.0.0.1:4000".to_string()),
        });
        cli.storage_path = Some("/tmp/override.db".to_string());

        let mut config = Config::default();
        config.apply_cli_overrides(&cli);

        assert_eq!(config.server.bind_address, "127.0.0.1:4000");
        assert_eq!(config.storage.path.as_deref(), Some("/tmp/override.db"));
    }

    #[test]
    #[serial]
    fn test_load_missing_file_uses_defaults() {
        let cli = cli_with(Commands::Serve { bind: None });
        let config = Config::load("/nonexistent/townchat.yaml", &cli).unwrap();
        assert_eq!(config.provider.provider_type, "openai");
    }
}
