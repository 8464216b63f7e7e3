//! Boxcar push notifier.
//!
//! `boxcar://{access_key}/{secret_key}/[@tag|device_token/...]`
//!
//! Requests are signed with HMAC-SHA1 over the method, host, path and the
//! exact JSON body, so the body is serialized once and sent verbatim.

use std::sync::LazyLock;

use hmac::{Hmac, Mac};
use regex::Regex;
use serde::Serialize;
use sha1::Sha1;

use crate::config::SecretString;
use crate::error::{SendError, ValidationError};
use crate::identifier::{ServiceUrl, encode};
use crate::notify::base::{NotifierBase, NotifierContext};
use crate::notify::{ImageSize, Notification, Notifier};
use crate::transport::{HttpRequest, Method};

const SERVICE: &str = "Boxcar";
const API_HOST: &str = "boxcar-api.io";
const API_PATH: &str = "/api/push/";
/// Seconds a push stays deliverable.
const EXPIRES_AFTER: i64 = 30;

static KEY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{64}$").expect("valid regex"));
static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@?([A-Za-z0-9]{1,63})$").expect("valid regex"));
static DEVICE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{64}$").expect("valid regex"));

type HmacSha1 = Hmac<Sha1>;

#[derive(Debug, Serialize)]
struct Aps<'a> {
    badge: &'static str,
    alert: &'a str,
    #[serde(rename = "@title", skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct BoxcarPayload<'a> {
    aps: Aps<'a>,
    expires: String,
    timestamp: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    device_tokens: Vec<&'a str>,
    #[serde(rename = "@img", skip_serializing_if = "Option::is_none")]
    image: Option<String>,
}

/// Boxcar notifier; an empty recipient list broadcasts to every device.
pub struct BoxcarNotifier {
    base: NotifierBase,
    access: SecretString,
    secret: SecretString,
    tags: Vec<String>,
    device_tokens: Vec<String>,
}

impl BoxcarNotifier {
    pub fn new(
        ctx: &NotifierContext,
        access: &str,
        secret: &str,
        recipients: &[String],
    ) -> Result<Self, ValidationError> {
        for (field, value) in [("access key", access), ("secret key", secret)] {
            if !KEY_REGEX.is_match(value) {
                return Err(ValidationError::Invalid {
                    service: SERVICE,
                    field,
                    reason: "expected 64 characters of [A-Za-z0-9_-]".to_string(),
                });
            }
        }

        let mut tags = Vec::new();
        let mut device_tokens = Vec::new();
        for recipient in recipients {
            if DEVICE_REGEX.is_match(recipient) {
                device_tokens.push(recipient.clone());
            } else if let Some(caps) = TAG_REGEX.captures(recipient) {
                tags.push(caps[1].to_string());
            } else {
                tracing::warn!(service = SERVICE, recipient = %recipient, "dropped invalid tag or device token");
            }
        }

        Ok(Self {
            base: NotifierBase::new(SERVICE, ctx),
            access: SecretString::new(access.to_string()),
            secret: SecretString::new(secret.to_string()),
            tags,
            device_tokens,
        })
    }

    pub fn from_url(url: &ServiceUrl, ctx: &NotifierContext) -> Result<Self, ValidationError> {
        let secret = url.path.first().ok_or(ValidationError::Missing {
            service: SERVICE,
            field: "secret key",
        })?;
        Self::new(ctx, &url.host, secret, &url.path[1..])
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn device_tokens(&self) -> &[String] {
        &self.device_tokens
    }

    fn sign(&self, body: &str) -> Result<String, SendError> {
        let mut mac = HmacSha1::new_from_slice(self.secret.expose().as_bytes())
            .map_err(|e| SendError::Encode(e.to_string()))?;
        mac.update(format!("POST\n{}\n{}\n{}", API_HOST, API_PATH, body).as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn build_request(&self, notification: &Notification) -> Result<HttpRequest, SendError> {
        let now = chrono::Utc::now().timestamp();
        let payload = BoxcarPayload {
            aps: Aps {
                badge: "auto",
                alert: &notification.body,
                title: (!notification.title.is_empty()).then_some(notification.title.as_str()),
            },
            expires: (now + EXPIRES_AFTER).to_string(),
            timestamp: now.to_string(),
            tags: self.tags.iter().map(String::as_str).collect(),
            device_tokens: self.device_tokens.iter().map(String::as_str).collect(),
            image: self
                .base
                .image_url(notification.notify_type, ImageSize::XY72),
        };

        let body = serde_json::to_string(&payload)?;
        let signature = self.sign(&body)?;
        let url = format!(
            "https://{}{}?publishkey={}&signature={}",
            API_HOST,
            API_PATH,
            encode(self.access.expose()),
            signature
        );
        Ok(HttpRequest::new(url).raw("application/json", body))
    }

    fn deliver(&mut self, notification: &Notification) -> Result<(), SendError> {
        let request = self.build_request(notification)?;
        self.base.execute(Method::Post, &request, &[201])?;
        Ok(())
    }
}

impl Notifier for BoxcarNotifier {
    fn protocol(&self) -> &'static str {
        "boxcar"
    }

    fn base(&self) -> &NotifierBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NotifierBase {
        &mut self.base
    }

    fn url(&self) -> String {
        let recipients = self
            .tags
            .iter()
            .map(|tag| format!("@{}", tag))
            .chain(self.device_tokens.iter().cloned())
            .collect::<Vec<_>>();
        format!(
            "boxcar://{}/{}/{}",
            encode(self.access.expose()),
            encode(self.secret.expose()),
            recipients.join("/")
        )
    }

    fn send(&mut self, notification: &Notification) -> bool {
        let outcome = self.deliver(notification);
        self.base.settle(outcome, None)
    }
}

impl std::fmt::Debug for BoxcarNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxcarNotifier")
            .field("access", &self.access)
            .field("tags", &self.tags)
            .field("device_tokens", &self.device_tokens.len())
            .finish()
    }
}

pub(crate) fn build(
    url: &ServiceUrl,
    ctx: &NotifierContext,
) -> Result<Box<dyn Notifier>, ValidationError> {
    Ok(Box::new(BoxcarNotifier::from_url(url, ctx)?))
}
