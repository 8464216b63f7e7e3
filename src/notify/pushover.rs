//! Pushover notifier.
//!
//! `pover://{user_key}@{token}[/{device}...][?priority=normal]`
//!
//! Devices are checked when sending: an invalid one is skipped and makes
//! the whole call report failure. Without devices every device of the
//! user is notified.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::SecretString;
use crate::error::{SendError, ValidationError};
use crate::identifier::{ServiceUrl, build_query, encode};
use crate::notify::base::{NotifierBase, NotifierContext};
use crate::notify::{Notification, Notifier, Priority};
use crate::transport::{HttpRequest, Method};

const SERVICE: &str = "Pushover";
const API_URL: &str = "https://api.pushover.net/1/messages.json";

static KEY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{30}$").expect("valid regex"));
static DEVICE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{1,25}$").expect("valid regex"));

const PUSHOVER_ERRORS: &[(u16, &str)] = &[(401, "Unauthorized - Invalid Token.")];

pub struct PushoverNotifier {
    base: NotifierBase,
    user: SecretString,
    token: SecretString,
    devices: Vec<String>,
    priority: Priority,
}

impl PushoverNotifier {
    pub fn new(
        ctx: &NotifierContext,
        user: &str,
        token: &str,
        devices: Vec<String>,
        priority: Priority,
    ) -> Result<Self, ValidationError> {
        if user.is_empty() {
            return Err(ValidationError::Missing {
                service: SERVICE,
                field: "user key",
            });
        }
        if !KEY_REGEX.is_match(user) {
            return Err(ValidationError::Invalid {
                service: SERVICE,
                field: "user key",
                reason: "expected 30 alphanumeric characters".to_string(),
            });
        }
        if !KEY_REGEX.is_match(token) {
            return Err(ValidationError::Invalid {
                service: SERVICE,
                field: "token",
                reason: "expected 30 alphanumeric characters".to_string(),
            });
        }

        Ok(Self {
            base: NotifierBase::new(SERVICE, ctx).with_errors(PUSHOVER_ERRORS),
            user: SecretString::new(user.to_string()),
            token: SecretString::new(token.to_string()),
            devices,
            priority,
        })
    }

    pub fn from_url(url: &ServiceUrl, ctx: &NotifierContext) -> Result<Self, ValidationError> {
        Self::new(
            ctx,
            url.user.as_deref().unwrap_or_default(),
            &url.host,
            url.path.clone(),
            Priority::from_name(url.query_value("priority")),
        )
    }

    pub fn devices(&self) -> &[String] {
        &self.devices
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    fn deliver(&mut self, device: Option<&str>, notification: &Notification) -> Result<(), SendError> {
        if let Some(device) = device
            && !DEVICE_REGEX.is_match(device)
        {
            return Err(SendError::InvalidRecipient(format!(
                "device '{}' is not a valid Pushover device name",
                device
            )));
        }

        let mut fields = vec![
            ("token", self.token.expose().to_string()),
            ("user", self.user.expose().to_string()),
            ("priority", self.priority.value().to_string()),
            ("title", notification.title.clone()),
            ("message", notification.body.clone()),
        ];
        if let Some(device) = device {
            fields.push(("device", device.to_string()));
        }

        let request = HttpRequest::new(API_URL).form(fields);
        self.base.execute(Method::Post, &request, &[200])?;
        Ok(())
    }
}

impl Notifier for PushoverNotifier {
    fn protocol(&self) -> &'static str {
        "pover"
    }

    fn base(&self) -> &NotifierBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NotifierBase {
        &mut self.base
    }

    fn url(&self) -> String {
        let devices = self
            .devices
            .iter()
            .map(|d| encode(d))
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "pover://{}@{}/{}{}",
            encode(self.user.expose()),
            encode(self.token.expose()),
            devices,
            build_query(&[("priority", self.priority.as_str())])
        )
    }

    fn send(&mut self, notification: &Notification) -> bool {
        if self.devices.is_empty() {
            let outcome = self.deliver(None, notification);
            return self.base.settle(outcome, Some("all devices"));
        }

        let devices = self.devices.clone();
        let mut all_ok = true;
        for device in &devices {
            let outcome = self.deliver(Some(device), notification);
            all_ok &= self.base.settle(outcome, Some(device));
        }
        all_ok
    }
}

impl std::fmt::Debug for PushoverNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushoverNotifier")
            .field("user", &self.user)
            .field("token", &self.token)
            .field("devices", &self.devices)
            .field("priority", &self.priority)
            .finish()
    }
}

pub(crate) fn build(
    url: &ServiceUrl,
    ctx: &NotifierContext,
) -> Result<Box<dyn Notifier>, ValidationError> {
    Ok(Box::new(PushoverNotifier::from_url(url, ctx)?))
}
