//! Runtime configuration for logwarden.
//!
//! Settings come from `~/.config/logwarden/config.toml` when it exists,
//! with defaults for everything else. Credentials and channel secrets can
//! also arrive through the environment (`OPENROUTER_API_KEY`,
//! `DISCORD_WEBHOOK_URL`, `SMTP_*`), which always wins over the file so a
//! cron line can carry its own secrets.
//!
//! The config is an explicit value constructed once in `main` and passed
//! down; nothing reads the environment after startup.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::warn;

const CONFIG_FILE: &str = "config.toml";

/// Classifier endpoint and request settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// API key for the classifier endpoint. Usually injected via
    /// `OPENROUTER_API_KEY` rather than written to disk.
    #[serde(default)]
    pub api_key: Option<String>,

    /// OpenAI-compatible base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used when `--model` is not given.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Hard timeout for one classifier request. Bounds unattended runtime.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_model() -> String {
    "google/gemini-2.0-flash-001".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            default_model: default_model(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Finding-history windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// A finding seen again within this many hours is suppressed.
    #[serde(default = "default_dedup_window_hours")]
    pub dedup_window_hours: i64,

    /// Entries older than this many days are pruned.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,

    /// When true, pruning never deletes an entry still inside the dedup
    /// window, even if retention is configured shorter than the window.
    #[serde(default = "default_prune_spares_dedup_window")]
    pub prune_spares_dedup_window: bool,
}

fn default_dedup_window_hours() -> i64 {
    24
}

fn default_retention_days() -> i64 {
    30
}

fn default_prune_spares_dedup_window() -> bool {
    true
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            dedup_window_hours: default_dedup_window_hours(),
            retention_days: default_retention_days(),
            prune_spares_dedup_window: default_prune_spares_dedup_window(),
        }
    }
}

/// SMTP submission settings. The channel is active only when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub server: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// Envelope sender; falls back to `user` when absent.
    #[serde(default)]
    pub from: Option<String>,
    pub to: String,
}

fn default_smtp_port() -> u16 {
    587
}

/// Notification channels. Each is independently optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Webhook URL for embed-style push notifications.
    #[serde(default)]
    pub webhook_url: Option<String>,

    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub notify: NotifyConfig,
}

impl Config {
    /// Load from the config file if present, then apply environment
    /// overrides. A missing or unparseable file degrades to defaults with
    /// a warning; only a missing credential is fatal, and that is caught
    /// by [`Config::validate`] before any pipeline work starts.
    pub fn load() -> Self {
        let mut config = match fs::read_to_string(config_path()) {
            Ok(raw) => match toml::from_str(&raw) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Unparseable config file, using defaults: {e}");
                    Config::default()
                }
            },
            Err(_) => Config::default(),
        };
        config.apply_env();
        config
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
            if !key.is_empty() {
                self.classifier.api_key = Some(key);
            }
        }
        if let Ok(model) = std::env::var("DEFAULT_MODEL") {
            if !model.is_empty() {
                self.classifier.default_model = model;
            }
        }
        if let Ok(url) = std::env::var("DISCORD_WEBHOOK_URL") {
            if !url.is_empty() {
                self.notify.webhook_url = Some(url);
            }
        }
        if let Ok(server) = std::env::var("SMTP_SERVER") {
            if !server.is_empty() {
                let smtp = SmtpConfig {
                    server,
                    port: std::env::var("SMTP_PORT")
                        .ok()
                        .and_then(|p| p.parse().ok())
                        .unwrap_or_else(default_smtp_port),
                    user: std::env::var("SMTP_USER").unwrap_or_default(),
                    password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
                    from: std::env::var("SMTP_FROM").ok().filter(|s| !s.is_empty()),
                    to: std::env::var("SMTP_TO").unwrap_or_default(),
                };
                self.notify.smtp = Some(smtp);
            }
        }
    }

    /// Fail fast when the classifier credential is missing. Everything in
    /// the pipeline needs it, so this runs before any source is touched.
    pub fn validate(&self) -> Result<()> {
        match &self.classifier.api_key {
            Some(key) if !key.is_empty() => Ok(()),
            _ => bail!(
                "OPENROUTER_API_KEY is not set.\n\
                 Export it in the environment or add it to {}:\n\n\
                 \t[classifier]\n\
                 \tapi_key = \"sk-or-...\"",
                config_path().display()
            ),
        }
    }

    pub fn api_key(&self) -> &str {
        self.classifier.api_key.as_deref().unwrap_or_default()
    }
}

/// `~/.config/logwarden` (created on demand by callers that write).
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("logwarden")
}

fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}

/// `~/.local/state/logwarden`, home of the pattern and history files.
pub fn state_dir() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("logwarden")
}
