//! Pushalot notifier.
//!
//! `palot://{authorization_token}[?important=no&silent=no]`

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::config::SecretString;
use crate::error::{SendError, ValidationError};
use crate::identifier::{ServiceUrl, build_query, encode};
use crate::notify::base::{NotifierBase, NotifierContext};
use crate::notify::{ImageSize, Notification, Notifier};
use crate::transport::{HttpRequest, Method};

const SERVICE: &str = "Pushalot";
const API_URL: &str = "https://pushalot.com/api/sendmessage";

static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{32}$").expect("valid regex"));

const PUSHALOT_ERRORS: &[(u16, &str)] = &[
    (406, "Message throttle limit hit."),
    (410, "AuthorizedToken is no longer valid."),
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PushalotPayload<'a> {
    authorization_token: &'a str,
    is_important: bool,
    is_silent: bool,
    title: &'a str,
    body: &'a str,
    source: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<String>,
}

pub struct PushalotNotifier {
    base: NotifierBase,
    token: SecretString,
    important: bool,
    silent: bool,
}

impl PushalotNotifier {
    pub fn new(
        ctx: &NotifierContext,
        token: &str,
        important: bool,
        silent: bool,
    ) -> Result<Self, ValidationError> {
        if !TOKEN_REGEX.is_match(token) {
            return Err(ValidationError::Invalid {
                service: SERVICE,
                field: "authorization token",
                reason: "expected 32 alphanumeric characters".to_string(),
            });
        }
        Ok(Self {
            base: NotifierBase::new(SERVICE, ctx).with_errors(PUSHALOT_ERRORS),
            token: SecretString::new(token.to_string()),
            important,
            silent,
        })
    }

    pub fn from_url(url: &ServiceUrl, ctx: &NotifierContext) -> Result<Self, ValidationError> {
        Self::new(
            ctx,
            &url.host,
            url.query_bool("important", false),
            url.query_bool("silent", false),
        )
    }

    fn deliver(&mut self, notification: &Notification) -> Result<(), SendError> {
        let payload = PushalotPayload {
            authorization_token: self.token.expose(),
            is_important: self.important,
            is_silent: self.silent,
            title: &notification.title,
            body: &notification.body,
            source: &self.base.asset().app_id,
            image: self
                .base
                .image_url(notification.notify_type, ImageSize::XY72),
        };
        let request = HttpRequest::new(API_URL).json(&payload)?;
        self.base.execute(Method::Post, &request, &[200])?;
        Ok(())
    }
}

impl Notifier for PushalotNotifier {
    fn protocol(&self) -> &'static str {
        "palot"
    }

    fn base(&self) -> &NotifierBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NotifierBase {
        &mut self.base
    }

    fn url(&self) -> String {
        let yes_no = |flag: bool| if flag { "yes" } else { "no" };
        format!(
            "palot://{}/{}",
            encode(self.token.expose()),
            build_query(&[
                ("important", yes_no(self.important)),
                ("silent", yes_no(self.silent)),
            ])
        )
    }

    fn send(&mut self, notification: &Notification) -> bool {
        let outcome = self.deliver(notification);
        self.base.settle(outcome, None)
    }
}

impl std::fmt::Debug for PushalotNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushalotNotifier")
            .field("token", &self.token)
            .field("important", &self.important)
            .field("silent", &self.silent)
            .finish()
    }
}

pub(crate) fn build(
    url: &ServiceUrl,
    ctx: &NotifierContext,
) -> Result<Box<dyn Notifier>, ValidationError> {
    Ok(Box::new(PushalotNotifier::from_url(url, ctx)?))
}
