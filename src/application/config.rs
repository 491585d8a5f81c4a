use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::entities::threshold::DEFAULT_RATIO_LIMIT;
use crate::domain::value_objects::DeliveryPolicy;

/// Top-level application configuration loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub thresholds: ThresholdFileConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Cadence of the two periodic activities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_sample_interval")]
    pub sample_interval_secs: u64,
    #[serde(default = "default_digest_interval")]
    pub digest_interval_secs: u64,
}

/// Database storage path (tilde-expanded at point of use).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
}

/// Location of the threshold document and the bootstrap default for ratio leaves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdFileConfig {
    #[serde(default = "default_thresholds_path")]
    pub path: String,
    #[serde(default = "default_ratio_limit")]
    pub ratio_default: f64,
}

/// Outbound SMTP relay. Sender and credential live in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default = "default_true")]
    pub starttls: bool,
    #[serde(default = "default_mail_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub delivery: DeliveryPolicy,
}

/// HTTP listener for the live feed and the notification settings API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_live_capacity")]
    pub live_capacity: usize,
}

// --- Defaults ---

const fn default_sample_interval() -> u64 {
    3
}

const fn default_digest_interval() -> u64 {
    3600
}

// Stored with the tilde; callers expand it with shellexpand.
fn default_database_path() -> String {
    "~/.local/share/webspecs/webspecs.db".into()
}

fn default_thresholds_path() -> String {
    "~/.local/share/webspecs/notif_config.json".into()
}

const fn default_ratio_limit() -> f64 {
    DEFAULT_RATIO_LIMIT
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".into()
}

const fn default_smtp_port() -> u16 {
    587
}

const fn default_true() -> bool {
    true
}

const fn default_mail_timeout() -> u64 {
    10
}

fn default_bind() -> String {
    "127.0.0.1:8000".into()
}

const fn default_live_capacity() -> usize {
    16
}

// --- Default impls ---

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            sample_interval_secs: default_sample_interval(),
            digest_interval_secs: default_digest_interval(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

impl Default for ThresholdFileConfig {
    fn default() -> Self {
        Self {
            path: default_thresholds_path(),
            ratio_default: default_ratio_limit(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            starttls: default_true(),
            timeout_secs: default_mail_timeout(),
            delivery: DeliveryPolicy::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            live_capacity: default_live_capacity(),
        }
    }
}

impl GeneralConfig {
    /// Tick period of the live loop, never shorter than one second.
    #[must_use]
    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_secs.max(1))
    }

    /// Firing period of the digest scheduler, never shorter than one second.
    #[must_use]
    pub fn digest_interval(&self) -> Duration {
        Duration::from_secs(self.digest_interval_secs.max(1))
    }
}

impl MailConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

// --- AppConfig methods ---

impl AppConfig {
    /// Load config from default path or create default config file
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined,
    /// the file cannot be read, or the TOML content is invalid.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_or_create(&path)
    }

    /// Load from a specific path, or create a default config file if missing
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML content is invalid,
    /// or the default config file cannot be written.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Load from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the TOML content is invalid.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save config to a specific path, creating parent directories if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created,
    /// serialization fails, or the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("webspecs").join("config.toml"))
    }
}
