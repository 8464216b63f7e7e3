//! Prowl notifier.
//!
//! `prowl://{apikey}[/{provider_key}][?priority=normal]`

use std::sync::LazyLock;

use regex::Regex;

use crate::config::SecretString;
use crate::error::{SendError, ValidationError};
use crate::identifier::{ServiceUrl, build_query, encode};
use crate::notify::base::{NotifierBase, NotifierContext, truncate_chars};
use crate::notify::{Notification, Notifier, Priority};
use crate::transport::{HttpRequest, Method};

const SERVICE: &str = "Prowl";
const API_URL: &str = "https://api.prowlapp.com/publicapi/add";
const MAX_DESCRIPTION: usize = 10000;
const MAX_EVENT: usize = 1024;

static KEY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{40}$").expect("valid regex"));

const PROWL_ERRORS: &[(u16, &str)] = &[
    (406, "IP address has exceeded API limit"),
    (409, "Request not aproved."),
];

pub struct ProwlNotifier {
    base: NotifierBase,
    apikey: SecretString,
    providerkey: Option<SecretString>,
    priority: Priority,
}

impl ProwlNotifier {
    pub fn new(
        ctx: &NotifierContext,
        apikey: &str,
        providerkey: Option<&str>,
        priority: Priority,
    ) -> Result<Self, ValidationError> {
        if !KEY_REGEX.is_match(apikey) {
            return Err(ValidationError::Invalid {
                service: SERVICE,
                field: "apikey",
                reason: "expected 40 alphanumeric characters".to_string(),
            });
        }
        if let Some(providerkey) = providerkey
            && !KEY_REGEX.is_match(providerkey)
        {
            return Err(ValidationError::Invalid {
                service: SERVICE,
                field: "provider key",
                reason: "expected 40 alphanumeric characters".to_string(),
            });
        }

        Ok(Self {
            base: NotifierBase::new(SERVICE, ctx).with_errors(PROWL_ERRORS),
            apikey: SecretString::new(apikey.to_string()),
            providerkey: providerkey.map(|k| SecretString::new(k.to_string())),
            priority,
        })
    }

    pub fn from_url(url: &ServiceUrl, ctx: &NotifierContext) -> Result<Self, ValidationError> {
        Self::new(
            ctx,
            &url.host,
            url.path.first().map(String::as_str),
            Priority::from_name(url.query_value("priority")),
        )
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    fn deliver(&mut self, notification: &Notification) -> Result<(), SendError> {
        let mut fields = vec![
            ("apikey", self.apikey.expose().to_string()),
            ("application", self.base.asset().app_id.clone()),
            ("event", truncate_chars(&notification.title, MAX_EVENT)),
            (
                "description",
                truncate_chars(&notification.body, MAX_DESCRIPTION),
            ),
            ("priority", self.priority.value().to_string()),
        ];
        if let Some(providerkey) = &self.providerkey {
            fields.push(("providerkey", providerkey.expose().to_string()));
        }

        let request = HttpRequest::new(API_URL).form(fields);
        self.base.execute(Method::Post, &request, &[200])?;
        Ok(())
    }
}

impl Notifier for ProwlNotifier {
    fn protocol(&self) -> &'static str {
        "prowl"
    }

    fn base(&self) -> &NotifierBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NotifierBase {
        &mut self.base
    }

    fn url(&self) -> String {
        let providerkey = self
            .providerkey
            .as_ref()
            .map(|k| encode(k.expose()))
            .unwrap_or_default();
        format!(
            "prowl://{}/{}{}",
            encode(self.apikey.expose()),
            providerkey,
            build_query(&[("priority", self.priority.as_str())])
        )
    }

    fn send(&mut self, notification: &Notification) -> bool {
        let outcome = self.deliver(notification);
        self.base.settle(outcome, None)
    }
}

impl std::fmt::Debug for ProwlNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProwlNotifier")
            .field("apikey", &self.apikey)
            .field("priority", &self.priority)
            .finish()
    }
}

pub(crate) fn build(
    url: &ServiceUrl,
    ctx: &NotifierContext,
) -> Result<Box<dyn Notifier>, ValidationError> {
    Ok(Box::new(ProwlNotifier::from_url(url, ctx)?))
}
