//! Configuration management for linkscan
//!
//! Handles loading and saving the TOML config file, including the backend
//! provider, investigation limits and tool settings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::provider::ProviderType;
use crate::session::{DEFAULT_MAX_HISTORY_TURNS, MAX_ITERATIONS};

/// Footer appended to every outgoing chat text
pub const DEFAULT_FOOTER: &str = "_Automated scan by linkscan. Verify before you trust any link._";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Generative backend settings
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Investigation limits and presentation
    #[serde(default)]
    pub scan: ScanConfig,
    /// Investigation tool settings
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Backend provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider type: "gemini", "openai", "anthropic", etc.
    pub provider_type: String,
    /// Model to use (provider default when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// API key (can be loaded from env)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable name for API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Request timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: ProviderType::Gemini.as_str().to_string(),
            model: None,
            api_key: None,
            api_key_env: None,
            temperature: 0.2,
            max_tokens: 2000,
            timeout_secs: None,
        }
    }
}

impl ProviderConfig {
    /// Get the API key, checking environment variables if not set directly
    pub fn get_api_key(&self) -> Option<String> {
        if let Some(key) = &self.api_key {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }

        if let Some(env_name) = &self.api_key_env {
            if let Some(key) = non_empty_env(env_name) {
                return Some(key);
            }
        }

        match self.provider_type.parse::<ProviderType>() {
            Ok(ProviderType::Gemini) => {
                non_empty_env("GEMINI_API_KEY").or_else(|| non_empty_env("GOOGLE_API_KEY"))
            }
            Ok(provider) => provider.api_key_env().and_then(non_empty_env),
            Err(_) => None,
        }
    }

    /// Model name, falling back to the provider's default
    pub fn model_name(&self) -> String {
        match &self.model {
            Some(model) if !model.is_empty() => model.clone(),
            _ => self
                .provider_type
                .parse::<ProviderType>()
                .map(|p| p.default_model().to_string())
                .unwrap_or_else(|_| "unknown".to_string()),
        }
    }
}

/// Investigation limits and presentation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Backend requests per investigation
    pub max_iterations: usize,
    /// Turns kept per session before the oldest pairs are dropped
    pub max_history_turns: usize,
    /// Subjects longer than this many characters are withheld from the backend
    pub long_url_threshold: usize,
    /// Appended to every outgoing chat text
    pub footer: String,
    /// Language the verdict explanation is written in
    pub explanation_language: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            max_history_turns: DEFAULT_MAX_HISTORY_TURNS,
            long_url_threshold: 512,
            footer: DEFAULT_FOOTER.to_string(),
            explanation_language: "English".to_string(),
        }
    }
}

/// Investigation tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safe_browsing_api_key: Option<String>,
    /// Environment variable holding the Safe Browsing key
    pub safe_browsing_api_key_env: String,
    /// Timeout for each outbound HTTP or WHOIS call
    pub http_timeout_secs: u64,
    /// Page text and WHOIS answers are cut to this many characters
    pub max_page_chars: usize,
    /// Root WHOIS server queried first
    pub whois_server: String,
    pub user_agent: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            safe_browsing_api_key: None,
            safe_browsing_api_key_env: "GOOGLE_SAFE_BROWSING_API_KEY".to_string(),
            http_timeout_secs: 15,
            max_page_chars: 30_000,
            whois_server: "whois.iana.org".to_string(),
            user_agent: format!("linkscan/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ToolsConfig {
    /// Safe Browsing key from the config, then the environment
    pub fn safe_browsing_key(&self) -> Option<String> {
        match &self.safe_browsing_api_key {
            Some(key) if !key.is_empty() => Some(key.clone()),
            _ => non_empty_env(&self.safe_browsing_api_key_env),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Configuration manager for loading and saving config
pub struct ConfigManager {
    config_path: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::with_path(config_path)
    }

    /// Create a config manager with a specific path
    pub fn with_path(config_path: PathBuf) -> Result<Self> {
        let config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            Config::default()
        };

        Ok(Self { config_path, config })
    }

    /// Get the default config path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not find config directory".to_string()))?;

        Ok(config_dir.join("linkscan").join("config.toml"))
    }

    /// Load configuration from a file
    fn load_from_path(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get the current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get mutable access to configuration
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(&self.config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&self.config_path, content)
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider.provider_type, "gemini");
        assert_eq!(config.provider.model_name(), "gemini-2.5-flash");
        assert_eq!(config.provider.temperature, 0.2);
        assert_eq!(config.provider.max_tokens, 2000);
        assert_eq!(config.scan.max_iterations, 5);
        assert_eq!(config.scan.long_url_threshold, 512);
        assert_eq!(config.tools.whois_server, "whois.iana.org");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[provider]"));
        assert!(toml_str.contains("[scan]"));
        assert!(toml_str.contains("[tools]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider.provider_type, config.provider.provider_type);
        assert_eq!(parsed.scan.footer, config.scan.footer);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [provider]
            provider_type = "openai"

            [scan]
            max_iterations = 3
            "#,
        )
        .unwrap();
        assert_eq!(parsed.provider.model_name(), "gpt-4o-mini");
        assert_eq!(parsed.scan.max_iterations, 3);
        assert_eq!(parsed.scan.max_history_turns, DEFAULT_MAX_HISTORY_TURNS);
        assert_eq!(parsed.tools.http_timeout_secs, 15);
    }

    #[test]
    fn test_api_key_from_env() {
        let config = ProviderConfig {
            api_key_env: Some("LINKSCAN_TEST_API_KEY_12345".to_string()),
            ..Default::default()
        };

        unsafe { std::env::set_var("LINKSCAN_TEST_API_KEY_12345", "test-key") };
        assert_eq!(config.get_api_key(), Some("test-key".to_string()));
        unsafe { std::env::remove_var("LINKSCAN_TEST_API_KEY_12345") };
    }

    #[test]
    fn test_explicit_api_key_wins() {
        let config = ProviderConfig {
            api_key: Some("explicit".to_string()),
            api_key_env: Some("LINKSCAN_TEST_UNSET_KEY".to_string()),
            ..Default::default()
        };
        assert_eq!(config.get_api_key(), Some("explicit".to_string()));
    }

    #[test]
    fn test_safe_browsing_key_from_config() {
        let tools = ToolsConfig {
            safe_browsing_api_key: Some("sb-key".to_string()),
            ..Default::default()
        };
        assert_eq!(tools.safe_browsing_key(), Some("sb-key".to_string()));

        let empty = ToolsConfig {
            safe_browsing_api_key: Some(String::new()),
            safe_browsing_api_key_env: "LINKSCAN_TEST_UNSET_SB_KEY".to_string(),
            ..Default::default()
        };
        assert_eq!(empty.safe_browsing_key(), None);
    }

    #[test]
    fn test_manager_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut manager = ConfigManager::with_path(path.clone()).unwrap();
        manager.config_mut().scan.max_iterations = 7;
        manager.config_mut().provider.model = Some("gemini-2.5-pro".to_string());
        manager.save().unwrap();
        assert!(path.exists());

        let reloaded = ConfigManager::with_path(path).unwrap();
        assert_eq!(reloaded.config().scan.max_iterations, 7);
        assert_eq!(reloaded.config().provider.model_name(), "gemini-2.5-pro");
    }

    #[test]
    fn test_manager_rejects_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();

        let err = ConfigManager::with_path(path).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }
}
