//! NotifyMyAndroid notifier.
//!
//! `nma://{apikey}[/{developer_key}][?priority=normal&format=html]`

use std::sync::LazyLock;

use regex::Regex;

use crate::config::SecretString;
use crate::error::{SendError, ValidationError};
use crate::identifier::{ServiceUrl, build_query, encode};
use crate::notify::base::{NotifierBase, NotifierContext};
use crate::notify::{Notification, Notifier, NotifyFormat, Priority};
use crate::transport::{HttpRequest, Method};

const SERVICE: &str = "NotifyMyAndroid";
const API_URL: &str = "https://www.notifymyandroid.com/publicapi/notify";

static KEY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{48}$").expect("valid regex"));

const NMA_ERRORS: &[(u16, &str)] = &[
    (400, "Data is wrong format, invalid length or null."),
    (401, "API Key provided is invalid."),
    (402, "Maximum number of API calls per hour reached."),
];

pub struct NmaNotifier {
    base: NotifierBase,
    apikey: SecretString,
    devapikey: Option<SecretString>,
    priority: Priority,
    format: NotifyFormat,
}

impl NmaNotifier {
    pub fn new(
        ctx: &NotifierContext,
        apikey: &str,
        devapikey: Option<&str>,
        priority: Priority,
        format: NotifyFormat,
    ) -> Result<Self, ValidationError> {
        if !KEY_REGEX.is_match(apikey) {
            return Err(ValidationError::Invalid {
                service: SERVICE,
                field: "apikey",
                reason: "expected 48 alphanumeric characters".to_string(),
            });
        }
        if let Some(devapikey) = devapikey
            && !KEY_REGEX.is_match(devapikey)
        {
            return Err(ValidationError::Invalid {
                service: SERVICE,
                field: "developer apikey",
                reason: "expected 48 alphanumeric characters".to_string(),
            });
        }

        Ok(Self {
            base: NotifierBase::new(SERVICE, ctx).with_errors(NMA_ERRORS),
            apikey: SecretString::new(apikey.to_string()),
            devapikey: devapikey.map(|k| SecretString::new(k.to_string())),
            priority,
            format,
        })
    }

    pub fn from_url(url: &ServiceUrl, ctx: &NotifierContext) -> Result<Self, ValidationError> {
        let priority = Priority::from_name(url.query_value("priority"));
        let format = url
            .query_value("format")
            .and_then(NotifyFormat::from_name)
            .unwrap_or(NotifyFormat::Html);
        Self::new(
            ctx,
            &url.host,
            url.path.first().map(String::as_str),
            priority,
            format,
        )
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn format(&self) -> NotifyFormat {
        self.format
    }

    fn deliver(&mut self, notification: &Notification) -> Result<(), SendError> {
        let mut fields = vec![
            ("apikey", self.apikey.expose().to_string()),
            ("application", self.base.asset().app_id.clone()),
            ("event", notification.title.clone()),
            ("description", notification.body.clone()),
            ("priority", self.priority.value().to_string()),
        ];
        if self.format == NotifyFormat::Html {
            fields.push(("content-type", "text/html".to_string()));
        }
        if let Some(devapikey) = &self.devapikey {
            fields.push(("developerkey", devapikey.expose().to_string()));
        }

        let request = HttpRequest::new(API_URL).form(fields);
        self.base.execute(Method::Post, &request, &[200])?;
        Ok(())
    }
}

impl Notifier for NmaNotifier {
    fn protocol(&self) -> &'static str {
        "nma"
    }

    fn base(&self) -> &NotifierBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NotifierBase {
        &mut self.base
    }

    fn url(&self) -> String {
        let devapikey = self
            .devapikey
            .as_ref()
            .map(|k| encode(k.expose()))
            .unwrap_or_default();
        format!(
            "nma://{}/{}{}",
            encode(self.apikey.expose()),
            devapikey,
            build_query(&[
                ("priority", self.priority.as_str()),
                ("format", self.format.as_str()),
            ])
        )
    }

    fn send(&mut self, notification: &Notification) -> bool {
        let outcome = self.deliver(notification);
        self.base.settle(outcome, None)
    }
}

impl std::fmt::Debug for NmaNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NmaNotifier")
            .field("apikey", &self.apikey)
            .field("priority", &self.priority)
            .field("format", &self.format)
            .finish()
    }
}

pub(crate) fn build(
    url: &ServiceUrl,
    ctx: &NotifierContext,
) -> Result<Box<dyn Notifier>, ValidationError> {
    Ok(Box::new(NmaNotifier::from_url(url, ctx)?))
}
