//! Slack incoming-webhook notifier.
//!
//! `slack://[botname@]{token_a}/{token_b}/{token_c}/{channel}...[?channel=..]`
//!
//! Channels are written `#channel` (or bare), `@user`, or `+id` for a raw
//! channel id. They are checked when sending; an invalid one is skipped
//! and the call reports failure.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::config::SecretString;
use crate::error::{SendError, ValidationError};
use crate::identifier::{ServiceUrl, build_auth, encode, parse_list};
use crate::notify::base::{NotifierBase, NotifierContext, escape_html};
use crate::notify::{ImageSize, Notification, Notifier};
use crate::transport::{HttpRequest, Method};

const SERVICE: &str = "Slack";
const API_URL: &str = "https://hooks.slack.com/services";

static TOKEN_AB_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{9}$").expect("valid regex"));
static TOKEN_C_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{24}$").expect("valid regex"));
static CHANNEL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+#@]?[A-Za-z0-9_]{1,32}$").expect("valid regex"));

const SLACK_ERRORS: &[(u16, &str)] = &[(401, "Unauthorized - Invalid Token.")];

#[derive(Debug, Serialize)]
struct SlackAttachment<'a> {
    title: &'a str,
    text: String,
    color: &'a str,
    footer: &'a str,
    ts: i64,
}

#[derive(Debug, Serialize)]
struct SlackPayload<'a> {
    channel: String,
    username: &'a str,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon_url: Option<String>,
    attachments: Vec<SlackAttachment<'a>>,
}

/// Webhook address in the form Slack expects, or why it is rejected.
fn resolve_channel(channel: &str) -> Result<String, SendError> {
    if !CHANNEL_REGEX.is_match(channel) {
        return Err(SendError::InvalidRecipient(format!(
            "channel '{}' is not a valid Slack channel",
            channel
        )));
    }
    Ok(match channel.chars().next() {
        Some('+') => channel[1..].to_string(),
        Some('@') | Some('#') => channel.to_string(),
        _ => format!("#{}", channel),
    })
}

pub struct SlackNotifier {
    base: NotifierBase,
    token_a: SecretString,
    token_b: SecretString,
    token_c: SecretString,
    user: Option<String>,
    channels: Vec<String>,
}

impl SlackNotifier {
    pub fn new(
        ctx: &NotifierContext,
        tokens: [&str; 3],
        user: Option<String>,
        channels: Vec<String>,
    ) -> Result<Self, ValidationError> {
        let [token_a, token_b, token_c] = tokens;
        for (field, token) in [("token A", token_a), ("token B", token_b)] {
            if token.is_empty() {
                return Err(ValidationError::Missing { service: SERVICE, field });
            }
            if !TOKEN_AB_REGEX.is_match(token) {
                return Err(ValidationError::Invalid {
                    service: SERVICE,
                    field,
                    reason: "expected 9 upper-case alphanumeric characters".to_string(),
                });
            }
        }
        if token_c.is_empty() {
            return Err(ValidationError::Missing {
                service: SERVICE,
                field: "token C",
            });
        }
        if !TOKEN_C_REGEX.is_match(token_c) {
            return Err(ValidationError::Invalid {
                service: SERVICE,
                field: "token C",
                reason: "expected 24 alphanumeric characters".to_string(),
            });
        }
        if channels.is_empty() {
            return Err(ValidationError::NoRecipients { service: SERVICE });
        }

        Ok(Self {
            base: NotifierBase::new(SERVICE, ctx).with_errors(SLACK_ERRORS),
            token_a: SecretString::new(token_a.to_string()),
            token_b: SecretString::new(token_b.to_string()),
            token_c: SecretString::new(token_c.to_string()),
            user,
            channels,
        })
    }

    pub fn from_url(url: &ServiceUrl, ctx: &NotifierContext) -> Result<Self, ValidationError> {
        let segment = |idx: usize| url.path.get(idx).map(String::as_str).unwrap_or_default();
        let mut channels: Vec<String> = url.path.iter().skip(2).cloned().collect();
        if let Some(extra) = url.query_value("channel") {
            channels.extend(parse_list(extra));
        }
        Self::new(
            ctx,
            [&url.host, segment(0), segment(1)],
            url.user.clone(),
            channels,
        )
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    fn webhook_url(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            API_URL,
            self.token_a.expose(),
            self.token_b.expose(),
            self.token_c.expose()
        )
    }

    fn deliver(&mut self, channel: &str, notification: &Notification) -> Result<(), SendError> {
        let channel = resolve_channel(channel)?;
        let asset = self.base.asset();
        let payload = SlackPayload {
            channel,
            username: self.user.as_deref().unwrap_or(&asset.app_id),
            text: escape_html(&notification.title),
            icon_url: self
                .base
                .image_url(notification.notify_type, ImageSize::XY72),
            attachments: vec![SlackAttachment {
                title: &notification.title,
                text: escape_html(&notification.body),
                color: self.base.color(notification.notify_type),
                footer: &asset.app_id,
                ts: chrono::Utc::now().timestamp(),
            }],
        };
        let request = HttpRequest::new(self.webhook_url()).json(&payload)?;
        self.base.execute(Method::Post, &request, &[200])?;
        Ok(())
    }
}

impl Notifier for SlackNotifier {
    fn protocol(&self) -> &'static str {
        "slack"
    }

    fn base(&self) -> &NotifierBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NotifierBase {
        &mut self.base
    }

    fn url(&self) -> String {
        let channels = self
            .channels
            .iter()
            .map(|c| encode(c))
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "slack://{}{}/{}/{}/{}",
            build_auth(self.user.as_deref(), None),
            encode(self.token_a.expose()),
            encode(self.token_b.expose()),
            encode(self.token_c.expose()),
            channels
        )
    }

    fn send(&mut self, notification: &Notification) -> bool {
        let channels = self.channels.clone();
        let mut all_ok = true;
        for channel in &channels {
            let outcome = self.deliver(channel, notification);
            all_ok &= self.base.settle(outcome, Some(channel));
        }
        all_ok
    }
}

impl std::fmt::Debug for SlackNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackNotifier")
            .field("tokens", &[&self.token_a, &self.token_b, &self.token_c])
            .field("user", &self.user)
            .field("channels", &self.channels)
            .finish()
    }
}

pub(crate) fn build(
    url: &ServiceUrl,
    ctx: &NotifierContext,
) -> Result<Box<dyn Notifier>, ValidationError> {
    Ok(Box::new(SlackNotifier::from_url(url, ctx)?))
}
