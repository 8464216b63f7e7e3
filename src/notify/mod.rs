//! Notification services.
//!
//! Every supported service is one module implementing the [`Notifier`]
//! trait. A notifier is built from a compact identifier by the
//! [`Registry`], validated once at construction, and then delivers
//! notifications through the shared [`Transport`](crate::transport::Transport).
//!
//! # Architecture
//!
//! ```text
//! identifier -> ServiceUrl -> Registry -> Box<dyn Notifier> -> notify()
//!                                                                 |
//!                      throttle -> payload -> transport -> status check -> bool
//! ```
//!
//! The shared half of that pipeline (throttle, image policy, status
//! interpretation, logging and metrics) lives in [`NotifierBase`]; the
//! service modules only build payloads and pick recipients.

pub mod base;
pub mod boxcar;
pub mod discord;
pub mod faast;
pub mod ifttt;
pub mod join;
pub mod json;
pub mod kodi;
pub mod mattermost;
pub mod nma;
pub mod prowl;
pub mod pushalot;
pub mod pushbullet;
pub mod pushjet;
pub mod pushover;
pub mod registry;
pub mod rocketchat;
pub mod slack;
pub mod telegram;
pub mod toasty;
pub mod traits;
pub mod xml;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;

pub use base::{NotifierBase, NotifierContext};
pub use boxcar::BoxcarNotifier;
pub use discord::DiscordNotifier;
pub use faast::FaastNotifier;
pub use ifttt::IftttNotifier;
pub use join::JoinNotifier;
pub use json::JsonNotifier;
pub use kodi::KodiNotifier;
pub use mattermost::MattermostNotifier;
pub use nma::NmaNotifier;
pub use prowl::ProwlNotifier;
pub use pushalot::PushalotNotifier;
pub use pushbullet::PushbulletNotifier;
pub use pushjet::PushjetNotifier;
pub use pushover::PushoverNotifier;
pub use registry::Registry;
pub use rocketchat::RocketChatNotifier;
pub use slack::SlackNotifier;
pub use telegram::TelegramNotifier;
pub use toasty::ToastyNotifier;
pub use traits::Notifier;
pub use xml::XmlNotifier;

// =============================================================================
// Notification types
// =============================================================================

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NotifyType {
    #[default]
    Info,
    Success,
    Warning,
    Failure,
}

impl NotifyType {
    pub const ALL: [NotifyType; 4] = [
        NotifyType::Info,
        NotifyType::Success,
        NotifyType::Warning,
        NotifyType::Failure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyType::Info => "info",
            NotifyType::Success => "success",
            NotifyType::Warning => "warning",
            NotifyType::Failure => "failure",
        }
    }

    /// Lenient lookup: unknown names fall back to `Info`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "success" => NotifyType::Success,
            "warning" => NotifyType::Warning,
            "failure" => NotifyType::Failure,
            _ => NotifyType::Info,
        }
    }
}

impl fmt::Display for NotifyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Markup of the notification body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyFormat {
    /// Plain text. Services without a plain mode escape it into their
    /// markup instead: Telegram sends it HTML-escaped with `parse_mode=HTML`.
    Text,
    Html,
    Markdown,
}

impl NotifyFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyFormat::Text => "text",
            NotifyFormat::Html => "html",
            NotifyFormat::Markdown => "markdown",
        }
    }

    /// Strict lookup; callers pick their own fallback.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "text" => Some(NotifyFormat::Text),
            "html" => Some(NotifyFormat::Html),
            "markdown" => Some(NotifyFormat::Markdown),
            _ => None,
        }
    }
}

impl fmt::Display for NotifyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery priority shared by the push gateways (NMA, Prowl, Pushover).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    Low,
    Moderate,
    #[default]
    Normal,
    High,
    Emergency,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Moderate => "moderate",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Emergency => "emergency",
        }
    }

    /// Wire value, from -2 (low) to 2 (emergency).
    pub fn value(&self) -> i8 {
        match self {
            Priority::Low => -2,
            Priority::Moderate => -1,
            Priority::Normal => 0,
            Priority::High => 1,
            Priority::Emergency => 2,
        }
    }

    /// Lenient lookup: unknown or empty names yield `Normal`.
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(|n| n.trim().to_ascii_lowercase()).as_deref() {
            Some("low") => Priority::Low,
            Some("moderate") => Priority::Moderate,
            Some("high") => Priority::High,
            Some("emergency") => Priority::Emergency,
            _ => Priority::Normal,
        }
    }
}

/// Square image sizes served by the asset masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSize {
    XY72,
    XY128,
    XY256,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::XY72 => "72x72",
            ImageSize::XY128 => "128x128",
            ImageSize::XY256 => "256x256",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One notification request, built per `notify` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub notify_type: NotifyType,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>, notify_type: NotifyType) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            notify_type,
        }
    }

    /// Title, or the application id when the title is empty.
    pub fn title_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.title.is_empty() {
            fallback
        } else {
            &self.title
        }
    }
}
