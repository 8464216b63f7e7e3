//! Command-line interface for herald using clap.

use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

use crate::config::DEFAULT_CONFIG_PATH;
use crate::notify::NotifyType;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format for log aggregation.
    Json,
}

/// Send one notification to every configured service.
#[derive(Parser, Debug)]
#[command(name = "herald")]
#[command(version)]
#[command(about = "Send one notification to many chat, push and webhook services")]
pub struct Cli {
    /// Path to configuration file [default: /etc/herald/config.yaml, if present].
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Notification title.
    #[arg(short = 't', long = "title", default_value = "")]
    pub title: String,

    /// Notification body; read from stdin when omitted.
    #[arg(short = 'b', long = "body")]
    pub body: Option<String>,

    /// Notification type.
    #[arg(
        short = 'n',
        long = "notification-type",
        default_value = "info",
        value_parser = ["info", "success", "warning", "failure"]
    )]
    pub notification_type: String,

    /// Validate configuration and identifiers, then exit without sending.
    #[arg(long = "validate")]
    pub validate: bool,

    /// Log format: text or json.
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Text, env = "LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Service identifiers, in addition to those in the configuration file.
    #[arg(value_name = "URL")]
    pub urls: Vec<String>,
}

impl Cli {
    pub fn notify_type(&self) -> NotifyType {
        NotifyType::from_name(&self.notification_type)
    }

    /// Configuration file to load, if any.
    ///
    /// An explicit `-c` path is always returned; the default path only when
    /// it exists.
    pub fn config_path(&self) -> Option<PathBuf> {
        match &self.config {
            Some(path) => Some(path.clone()),
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                default.exists().then(|| default.to_path_buf())
            }
        }
    }
}
