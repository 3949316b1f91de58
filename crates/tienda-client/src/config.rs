//! # Client Configuration
//!
//! Where the backend lives and how receipts look.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TIENDA_API_URL=https://api.mitienda.ec                             │
//! │     TIENDA_API_TIMEOUT_SECS=20                                         │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/tienda-pos/tienda.toml (Linux)                           │
//! │     ~/Library/Application Support/ec.tienda.pos/tienda.toml (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     http://localhost:3000/api, 15s timeout                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [api]
//! base_url = "https://api.mitienda.ec/api"
//! timeout_secs = 15
//! page_size = 50
//!
//! [store]
//! name = "Tienda Centro"
//! currency_symbol = "$"
//! receipt_width = 40
//! ```
//!
//! The bearer token is never stored here.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ClientError, ClientResult};
use tienda_core::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Config file name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "tienda.toml";

// =============================================================================
// API Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL every endpoint path is appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Page size for catalog and customer listings.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_timeout() -> u64 {
    15
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            page_size: default_page_size(),
        }
    }
}

// =============================================================================
// Store Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Printed at the top of every receipt.
    #[serde(default = "default_store_name")]
    pub name: String,

    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,

    /// Receipt width in characters (58mm paper is 32, 80mm is 48).
    #[serde(default = "default_receipt_width")]
    pub receipt_width: usize,
}

fn default_store_name() -> String {
    "Tienda".to_string()
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

fn default_receipt_width() -> usize {
    40
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            name: default_store_name(),
            currency_symbol: default_currency_symbol(),
            receipt_width: default_receipt_width(),
        }
    }
}

// =============================================================================
// Main Client Configuration
// =============================================================================

/// Complete client configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub store: StoreSettings,
}

impl ClientConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (explicit path, else `tienda.toml` in the config dir)
    /// 3. Environment variables
    ///
    /// An explicit path that doesn't exist is an error; a missing default
    /// file is not.
    pub fn load(config_path: Option<PathBuf>) -> ClientResult<Self> {
        let mut config = Self::default();

        match config_path {
            Some(path) => {
                info!(?path, "Loading client config from file");
                config = Self::from_file(&path)?;
            }
            None => {
                if let Some(path) = Self::default_config_path() {
                    if path.exists() {
                        info!(?path, "Loading client config from file");
                        config = Self::from_file(&path)?;
                    } else {
                        debug!(?path, "Config file not found, using defaults");
                    }
                }
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load client config: {}. Using defaults.", e);
            Self::default()
        })
    }

    fn from_file(path: &std::path::Path) -> ClientResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ClientResult<()> {
        let url = Url::parse(&self.api.base_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ClientError::Config(format!(
                "base_url must use http or https, got: {}",
                self.api.base_url
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(ClientError::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.api.page_size == 0 || self.api.page_size > MAX_PAGE_SIZE {
            return Err(ClientError::Config(format!(
                "page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        if self.store.receipt_width < 24 {
            return Err(ClientError::Config(
                "receipt_width must be at least 24".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("TIENDA_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }

        if let Ok(timeout) = std::env::var("TIENDA_API_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(t) => self.api.timeout_secs = t,
                Err(_) => warn!(value = %timeout, "Ignoring non-numeric TIENDA_API_TIMEOUT_SECS"),
            }
        }

        if let Ok(size) = std::env::var("TIENDA_PAGE_SIZE") {
            match size.parse::<u32>() {
                Ok(s) => self.api.page_size = s,
                Err(_) => warn!(value = %size, "Ignoring non-numeric TIENDA_PAGE_SIZE"),
            }
        }

        if let Ok(name) = std::env::var("TIENDA_STORE_NAME") {
            self.store.name = name;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("ec", "tienda", "tienda-pos")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "TIENDA_API_URL",
            "TIENDA_API_TIMEOUT_SECS",
            "TIENDA_PAGE_SIZE",
            "TIENDA_STORE_NAME",
        ] {
            std::env::remove_var(key);
        }
    }

    fn temp_config(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "tienda-config-{}-{}.toml",
            name,
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.api.base_url, "http://localhost:3000/api");
        assert_eq!(config.api.timeout_secs, 15);
        assert_eq!(config.api.page_size, DEFAULT_PAGE_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ClientConfig::default();

        config.api.base_url = "ftp://example.com".into();
        assert!(config.validate().is_err());

        config.api.base_url = "not a url".into();
        assert!(config.validate().is_err());

        config.api.base_url = "https://api.example.com/api".into();
        assert!(config.validate().is_ok());

        config.api.timeout_secs = 0;
        assert!(config.validate().is_err());
        config.api.timeout_secs = 5;

        config.api.page_size = MAX_PAGE_SIZE + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_load_from_file_with_partial_sections() {
        clear_env();
        let path = temp_config(
            "partial",
            r#"
[api]
base_url = "https://pos.example.com/api"

[store]
name = "Tienda Centro"
"#,
        );

        let config = ClientConfig::load(Some(path.clone())).unwrap();
        std::fs::remove_file(path).ok();

        assert_eq!(config.api.base_url, "https://pos.example.com/api");
        assert_eq!(config.api.timeout_secs, 15);
        assert_eq!(config.store.name, "Tienda Centro");
        assert_eq!(config.store.receipt_width, 40);
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        clear_env();
        let path = temp_config("env", "[api]\ntimeout_secs = 30\n");
        std::env::set_var("TIENDA_API_URL", "https://override.example.com");
        std::env::set_var("TIENDA_API_TIMEOUT_SECS", "5");

        let config = ClientConfig::load(Some(path.clone()));
        clear_env();
        std::fs::remove_file(path).ok();

        let config = config.unwrap();
        assert_eq!(config.api.base_url, "https://override.example.com");
        assert_eq!(config.api.timeout_secs, 5);
    }

    #[test]
    #[serial]
    fn test_missing_explicit_file_is_an_error() {
        clear_env();
        let path = std::env::temp_dir().join("tienda-does-not-exist.toml");
        assert!(matches!(
            ClientConfig::load(Some(path)),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_toml_round_trip_sections() {
        let toml_str = toml::to_string_pretty(&ClientConfig::default()).unwrap();
        assert!(toml_str.contains("[api]"));
        assert!(toml_str.contains("[store]"));
    }
}
