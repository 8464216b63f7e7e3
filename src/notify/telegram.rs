//! Telegram bot notifier.
//!
//! `tgram://{bot_token}/{chat_id}...[?format=html&image=no]`
//!
//! The bot token contains a `:` (`123456789:abcdef...`), which a plain
//! identifier parse would read as a port, so `tgram` identifiers go
//! through [`parse_url`] first.
//!
//! Without chat ids the notifier asks the bot for its owner: it reads the
//! bot's updates and takes the sender of the first `/start` message.
//! Construction fails when no such message exists.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::config::SecretString;
use crate::error::{ProtocolError, SendError, ValidationError};
use crate::identifier::{ServiceUrl, build_query, encode};
use crate::notify::base::{NotifierBase, NotifierContext, escape_html};
use crate::notify::{ImageSize, Notification, Notifier, NotifyFormat};
use crate::transport::{FileUpload, HttpRequest, Method};

const SERVICE: &str = "Telegram";
const API_URL: &str = "https://api.telegram.org";

static IDENTIFIER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:tgram://)([^/@]+@)?(bot)?([0-9]+):+(.*)$").expect("valid regex")
});
static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(bot)?([0-9]+:[A-Za-z0-9_-]+)$").expect("valid regex"));
static CHAT_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@?-?[0-9]{1,32}$").expect("valid regex"));
static CHAT_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@?([A-Za-z_-][A-Za-z0-9_-]+)$").expect("valid regex"));

const TELEGRAM_ERRORS: &[(u16, &str)] = &[
    (400, "Bad Request - chat not found or malformed message."),
    (401, "Unauthorized - Invalid bot token."),
    (403, "Forbidden - the bot was blocked or removed from the chat."),
];

/// Parse a `tgram://` identifier.
///
/// `tgram://[user@][bot]123456789:token/chat...` is rewritten to
/// `tgram://[user@]123456789/token/chat...` so the numeric bot id lands in
/// host position and the token becomes the first path segment.
pub(crate) fn parse_url(raw: &str) -> Option<ServiceUrl> {
    let raw = raw.trim();
    match IDENTIFIER_REGEX.captures(raw) {
        Some(caps) => {
            let rewritten = format!(
                "tgram://{}{}/{}",
                caps.get(1).map(|m| m.as_str()).unwrap_or_default(),
                &caps[3],
                &caps[4]
            );
            let mut url = ServiceUrl::parse(&rewritten)?;
            url.url = raw.to_string();
            Some(url)
        }
        None => ServiceUrl::parse(raw),
    }
}

/// Form a chat id takes on the wire, or why it is rejected.
fn resolve_chat_id(chat_id: &str) -> Result<String, SendError> {
    if CHAT_ID_REGEX.is_match(chat_id) {
        return Ok(chat_id.trim_start_matches('@').to_string());
    }
    if let Some(caps) = CHAT_NAME_REGEX.captures(chat_id) {
        return Ok(format!("@{}", &caps[1]));
    }
    Err(SendError::InvalidRecipient(format!(
        "'{}' is not a valid Telegram chat id",
        chat_id
    )))
}

#[derive(Debug, Serialize)]
struct MessagePayload<'a> {
    chat_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    text: String,
}

pub struct TelegramNotifier {
    base: NotifierBase,
    token: SecretString,
    chat_ids: Vec<String>,
    format: NotifyFormat,
    send_image: bool,
}

impl TelegramNotifier {
    /// Build a notifier; an empty `chat_ids` triggers owner discovery.
    pub fn new(
        ctx: &NotifierContext,
        token: &str,
        chat_ids: Vec<String>,
        format: NotifyFormat,
        send_image: bool,
    ) -> Result<Self, ValidationError> {
        let Some(caps) = TOKEN_REGEX.captures(token.trim()) else {
            return Err(ValidationError::Invalid {
                service: SERVICE,
                field: "bot token",
                reason: "expected {bot_id}:{token}".to_string(),
            });
        };

        let mut notifier = Self {
            base: NotifierBase::new(SERVICE, ctx).with_errors(TELEGRAM_ERRORS),
            token: SecretString::new(caps[2].to_string()),
            chat_ids,
            format,
            send_image,
        };

        if notifier.chat_ids.is_empty() {
            let owner = notifier.discover_owner().map_err(|reason| {
                tracing::warn!(service = SERVICE, reason = %reason, "chat id discovery failed");
                ValidationError::Discovery {
                    service: SERVICE,
                    reason,
                }
            })?;
            tracing::info!(service = SERVICE, chat_id = %owner, "discovered bot owner");
            notifier.chat_ids.push(owner);
        }

        Ok(notifier)
    }

    pub fn from_url(url: &ServiceUrl, ctx: &NotifierContext) -> Result<Self, ValidationError> {
        let Some(secret) = url.path.first() else {
            return Err(ValidationError::Missing {
                service: SERVICE,
                field: "bot token",
            });
        };
        let token = format!("{}:{}", url.host, secret);
        let format = url
            .query_value("format")
            .and_then(NotifyFormat::from_name)
            .unwrap_or(NotifyFormat::Html);

        Self::new(
            ctx,
            &token,
            url.path.iter().skip(1).cloned().collect(),
            format,
            url.query_bool("image", false),
        )
    }

    pub fn chat_ids(&self) -> &[String] {
        &self.chat_ids
    }

    pub fn format(&self) -> NotifyFormat {
        self.format
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", API_URL, self.token.expose(), method)
    }

    /// Sender id of the first `/start` message the bot received.
    fn discover_owner(&self) -> Result<String, String> {
        let request = HttpRequest::new(self.api_url("getUpdates"));
        let response = self
            .base
            .request(Method::Get, &request, &[200])
            .map_err(|e| e.to_string())?;

        let body = response
            .json()
            .ok_or_else(|| "getUpdates response is not JSON".to_string())?;
        if body.get("ok").and_then(|ok| ok.as_bool()) != Some(true) {
            return Err("getUpdates did not report ok".to_string());
        }

        body.get("result")
            .and_then(|r| r.as_array())
            .into_iter()
            .flatten()
            .filter_map(|update| update.get("message"))
            .find(|message| {
                message
                    .get("text")
                    .and_then(|t| t.as_str())
                    .is_some_and(|t| t.starts_with("/start"))
                    && message.get("from").and_then(|f| f.get("id")).is_some()
            })
            .and_then(|message| message["from"]["id"].as_i64())
            .map(|id| id.to_string())
            .ok_or_else(|| "no /start message found; message the bot first".to_string())
    }

    /// `parse_mode` and text for `sendMessage`.
    ///
    /// Telegram has no plain mode; `Text` is sent HTML-escaped under HTML.
    fn message_text(&self, notification: &Notification) -> (Option<&'static str>, String) {
        let title = &notification.title;
        let body = &notification.body;
        match self.format {
            NotifyFormat::Markdown if title.is_empty() => (Some("Markdown"), body.clone()),
            NotifyFormat::Markdown => (Some("Markdown"), format!("*{}*\r\n{}", title, body)),
            NotifyFormat::Html if title.is_empty() => (Some("HTML"), body.clone()),
            NotifyFormat::Html => (Some("HTML"), format!("<b>{}</b>\r\n{}", title, body)),
            NotifyFormat::Text if title.is_empty() => (Some("HTML"), escape_html(body)),
            NotifyFormat::Text => (
                Some("HTML"),
                format!("<b>{}</b>\r\n{}", escape_html(title), escape_html(body)),
            ),
        }
    }

    /// Upload the notification image ahead of its message.
    ///
    /// Rides on the message's throttle slot; only `sendMessage` marks it.
    fn send_photo(&self, chat_id: &str, notification: &Notification) -> Result<(), SendError> {
        let Some(path) = self
            .base
            .image_path(notification.notify_type, ImageSize::XY256)
        else {
            return Ok(());
        };
        let request = HttpRequest::new(self.api_url("sendPhoto")).multipart(
            vec![("chat_id".to_string(), chat_id.to_string())],
            Some(FileUpload {
                field: "photo".to_string(),
                path,
                mime: "image/png".to_string(),
            }),
        );
        self.base.request(Method::Post, &request, &[200])?;
        Ok(())
    }

    fn deliver(&mut self, chat_id: &str, notification: &Notification) -> Result<(), SendError> {
        let chat_id = resolve_chat_id(chat_id)?;
        if self.send_image {
            self.base.throttle().wait();
            self.send_photo(&chat_id, notification)?;
        }

        let (parse_mode, text) = self.message_text(notification);
        let payload = MessagePayload {
            chat_id: &chat_id,
            parse_mode,
            text,
        };
        let request = HttpRequest::new(self.api_url("sendMessage")).json(&payload)?;
        let response = self.base.execute(Method::Post, &request, &[200])?;

        if let Some(body) = response.json()
            && body.get("ok").and_then(|ok| ok.as_bool()) == Some(false)
        {
            return Err(ProtocolError::RejectedBody(
                body.get("description")
                    .and_then(|d| d.as_str())
                    .unwrap_or("sendMessage returned ok=false")
                    .to_string(),
            )
            .into());
        }
        Ok(())
    }
}

impl Notifier for TelegramNotifier {
    fn protocol(&self) -> &'static str {
        "tgram"
    }

    fn base(&self) -> &NotifierBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NotifierBase {
        &mut self.base
    }

    fn url(&self) -> String {
        let chat_ids = self
            .chat_ids
            .iter()
            .map(|c| encode(c))
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "tgram://{}/{}{}",
            self.token.expose(),
            chat_ids,
            build_query(&[
                ("format", self.format.as_str()),
                ("image", if self.send_image { "yes" } else { "no" }),
            ])
        )
    }

    fn send(&mut self, notification: &Notification) -> bool {
        let chat_ids = self.chat_ids.clone();
        let mut all_ok = true;
        for chat_id in &chat_ids {
            let outcome = self.deliver(chat_id, notification);
            all_ok &= self.base.settle(outcome, Some(chat_id));
        }
        all_ok
    }
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("token", &self.token)
            .field("chat_ids", &self.chat_ids)
            .field("format", &self.format)
            .field("send_image", &self.send_image)
            .finish()
    }
}

pub(crate) fn build(
    url: &ServiceUrl,
    ctx: &NotifierContext,
) -> Result<Box<dyn Notifier>, ValidationError> {
    Ok(Box::new(TelegramNotifier::from_url(url, ctx)?))
}
