//! Join (joaoapps) push notifier.
//!
//! `join://{apikey}[/{device_id}|group.{name}...]`

use std::sync::LazyLock;

use regex::Regex;

use crate::config::SecretString;
use crate::error::{SendError, ValidationError};
use crate::identifier::{ServiceUrl, build_query, encode};
use crate::notify::base::{NotifierBase, NotifierContext};
use crate::notify::{ImageSize, Notification, Notifier};
use crate::transport::{HttpRequest, Method};

const SERVICE: &str = "Join";
const API_URL: &str = "https://joinjoaomgcd.appspot.com/_ah/api/messaging/v1/sendPush";
const DEFAULT_GROUP: &str = "group.all";

static APIKEY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{32}$").expect("valid regex"));
static DEVICE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{32}$").expect("valid regex"));
static GROUP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^group\.(all|android|chrome|firefox|ios|pc|phone|tablet)$")
        .expect("valid regex")
});

pub struct JoinNotifier {
    base: NotifierBase,
    apikey: SecretString,
    devices: Vec<String>,
}

impl JoinNotifier {
    /// Invalid device ids are dropped; no devices means every device.
    pub fn new(
        ctx: &NotifierContext,
        apikey: &str,
        devices: &[String],
    ) -> Result<Self, ValidationError> {
        if !APIKEY_REGEX.is_match(apikey) {
            return Err(ValidationError::Invalid {
                service: SERVICE,
                field: "apikey",
                reason: "expected 32 alphanumeric characters".to_string(),
            });
        }

        let mut valid: Vec<String> = devices
            .iter()
            .filter(|device| {
                let ok = is_group(device) || DEVICE_REGEX.is_match(device);
                if !ok {
                    tracing::warn!(service = SERVICE, device = %device, "dropped invalid device");
                }
                ok
            })
            .cloned()
            .collect();
        if valid.is_empty() {
            valid.push(DEFAULT_GROUP.to_string());
        }

        Ok(Self {
            base: NotifierBase::new(SERVICE, ctx),
            apikey: SecretString::new(apikey.to_string()),
            devices: valid,
        })
    }

    pub fn from_url(url: &ServiceUrl, ctx: &NotifierContext) -> Result<Self, ValidationError> {
        Self::new(ctx, &url.host, &url.path)
    }

    pub fn devices(&self) -> &[String] {
        &self.devices
    }

    fn deliver(&mut self, device: &str, notification: &Notification) -> Result<(), SendError> {
        let target = if is_group(device) { "deviceIds" } else { "deviceId" };
        let mut params = vec![
            ("apikey", self.apikey.expose().to_string()),
            (target, device.to_string()),
            ("title", notification.title.clone()),
            ("text", notification.body.clone()),
        ];
        if let Some(icon) = self
            .base
            .image_url(notification.notify_type, ImageSize::XY72)
        {
            params.push(("icon", icon));
        }

        let request = HttpRequest::new(format!("{}{}", API_URL, build_query(&params)))
            .header("Content-Type", "application/x-www-form-urlencoded");
        self.base.execute(Method::Post, &request, &[200])?;
        Ok(())
    }
}

fn is_group(device: &str) -> bool {
    GROUP_REGEX.is_match(device)
}

impl Notifier for JoinNotifier {
    fn protocol(&self) -> &'static str {
        "join"
    }

    fn base(&self) -> &NotifierBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NotifierBase {
        &mut self.base
    }

    fn url(&self) -> String {
        format!(
            "join://{}/{}",
            encode(self.apikey.expose()),
            self.devices.join("/")
        )
    }

    fn send(&mut self, notification: &Notification) -> bool {
        if notification.title.is_empty() && notification.body.is_empty() {
            tracing::warn!(service = SERVICE, "nothing to send: empty title and body");
            return false;
        }

        let devices = self.devices.clone();
        let mut all_ok = true;
        for device in &devices {
            let outcome = self.deliver(device, notification);
            all_ok &= self.base.settle(outcome, Some(device));
        }
        all_ok
    }
}

impl std::fmt::Debug for JoinNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoinNotifier")
            .field("apikey", &self.apikey)
            .field("devices", &self.devices)
            .finish()
    }
}

pub(crate) fn build(
    url: &ServiceUrl,
    ctx: &NotifierContext,
) -> Result<Box<dyn Notifier>, ValidationError> {
    Ok(Box::new(JoinNotifier::from_url(url, ctx)?))
}
