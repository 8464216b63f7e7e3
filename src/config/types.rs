//! Core configuration types and loading.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use super::env::resolve_env_vars;
use crate::asset::{
    Asset, DEFAULT_APP_DESC, DEFAULT_APP_ID, DEFAULT_IMAGE_URL_LOGO, DEFAULT_IMAGE_URL_MASK,
    DEFAULT_THEME,
};
use crate::error::ConfigError;
use crate::notify::Registry;
use crate::throttle::DEFAULT_THROTTLE_INTERVAL;
use crate::transport::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/herald/config.yaml";

/// Main configuration structure for herald.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Service identifiers; `${VAR}` references are resolved on use.
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub asset: AssetConfig,
}

/// Settings applied to every notifier.
#[derive(Debug, Clone, Deserialize)]
pub struct DefaultsConfig {
    /// Minimum spacing between two requests of one notifier.
    #[serde(default = "default_throttle", with = "humantime_serde")]
    pub throttle: Duration,
    /// HTTP request timeout.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_throttle() -> Duration {
    DEFAULT_THROTTLE_INTERVAL
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            throttle: default_throttle(),
            timeout: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Application identity and image sources.
///
/// Masks are minijinja templates over `theme`, `type` and `xy`; set a mask
/// to `null` to turn that image source off.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetConfig {
    #[serde(default = "default_app_id")]
    pub app_id: String,
    #[serde(default = "default_app_desc")]
    pub app_desc: String,
    #[serde(default)]
    pub app_url: Option<String>,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_image_url_mask")]
    pub image_url_mask: Option<String>,
    #[serde(default = "default_image_url_logo")]
    pub image_url_logo: Option<String>,
    #[serde(default)]
    pub image_path_mask: Option<String>,
    #[serde(default = "default_true")]
    pub include_image: bool,
}

fn default_app_id() -> String {
    DEFAULT_APP_ID.to_string()
}

fn default_app_desc() -> String {
    DEFAULT_APP_DESC.to_string()
}

fn default_theme() -> String {
    DEFAULT_THEME.to_string()
}

fn default_image_url_mask() -> Option<String> {
    Some(DEFAULT_IMAGE_URL_MASK.to_string())
}

fn default_image_url_logo() -> Option<String> {
    Some(DEFAULT_IMAGE_URL_LOGO.to_string())
}

fn default_true() -> bool {
    true
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            app_id: default_app_id(),
            app_desc: default_app_desc(),
            app_url: None,
            theme: default_theme(),
            image_url_mask: default_image_url_mask(),
            image_url_logo: default_image_url_logo(),
            image_path_mask: None,
            include_image: true,
        }
    }
}

impl AssetConfig {
    pub fn to_asset(&self) -> Asset {
        Asset::new(
            self.app_id.clone(),
            self.app_desc.clone(),
            self.app_url.clone(),
            self.theme.clone(),
            self.image_url_mask.clone(),
            self.image_url_logo.clone(),
            self.image_path_mask.clone(),
        )
    }
}

impl Config {
    /// Load configuration from a file path.
    ///
    /// # Errors
    /// Returns [`ConfigError::LoadError`] if the file cannot be read.
    /// Returns [`ConfigError::ValidationError`] if the YAML is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadError(format!("{}: {}", path.display(), e)))?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    /// Identifiers with environment variables substituted.
    ///
    /// # Errors
    /// One [`ConfigError::InvalidUrl`] per identifier referencing an
    /// undefined variable.
    pub fn resolved_urls(&self) -> Result<Vec<String>, Vec<ConfigError>> {
        let mut urls = Vec::with_capacity(self.urls.len());
        let mut errors = Vec::new();

        for (index, url) in self.urls.iter().enumerate() {
            match resolve_env_vars(url) {
                Ok(resolved) => urls.push(resolved),
                Err(e) => errors.push(ConfigError::InvalidUrl {
                    index,
                    message: e.to_string(),
                }),
            }
        }

        if errors.is_empty() {
            Ok(urls)
        } else {
            Err(errors)
        }
    }

    /// Check everything that can be checked without building notifiers.
    ///
    /// # Errors
    /// Returns a `Vec<ConfigError>` containing all validation errors found.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        for (index, url) in self.urls.iter().enumerate() {
            match url.split_once("://") {
                Some((scheme, _)) if Registry::is_supported(scheme) => {}
                Some((scheme, _)) => errors.push(ConfigError::InvalidUrl {
                    index,
                    message: format!("unsupported scheme '{}'", scheme),
                }),
                None => errors.push(ConfigError::InvalidUrl {
                    index,
                    message: "missing scheme://".to_string(),
                }),
            }
        }

        if self.defaults.timeout.is_zero() {
            errors.push(ConfigError::ValidationError(
                "defaults.timeout must be greater than zero".to_string(),
            ));
        }
        if self.defaults.user_agent.trim().is_empty() {
            errors.push(ConfigError::ValidationError(
                "defaults.user_agent must not be empty".to_string(),
            ));
        }
        if self.asset.app_id.trim().is_empty() {
            errors.push(ConfigError::ValidationError(
                "asset.app_id must not be empty".to_string(),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
