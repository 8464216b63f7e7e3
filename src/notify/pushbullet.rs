//! PushBullet notifier.
//!
//! `pbul://{access_token}[/#channel|email|device...]`
//!
//! One push is created per recipient; without recipients the push goes
//! to every device of the account.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::config::SecretString;
use crate::error::{SendError, ValidationError};
use crate::identifier::{ServiceUrl, encode};
use crate::notify::base::{NotifierBase, NotifierContext};
use crate::notify::{Notification, Notifier};
use crate::transport::{HttpRequest, Method};

const SERVICE: &str = "PushBullet";
const API_URL: &str = "https://api.pushbullet.com/v2/pushes";

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s/]+@[^@\s/]+\.[^@\s/]+$").expect("valid regex"));

const PUSHBULLET_ERRORS: &[(u16, &str)] = &[
    (401, "Unauthorized - Invalid Token."),
    (403, "Forbidden - Access token lacks permission."),
];

/// Where one push is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushTarget {
    AllDevices,
    Channel(String),
    Email(String),
    Device(String),
}

impl PushTarget {
    fn parse(recipient: &str) -> Option<Self> {
        if let Some(tag) = recipient.strip_prefix('#') {
            return (!tag.is_empty()).then(|| PushTarget::Channel(tag.to_string()));
        }
        if EMAIL_REGEX.is_match(recipient) {
            return Some(PushTarget::Email(recipient.to_string()));
        }
        Some(PushTarget::Device(recipient.to_string()))
    }

    fn label(&self) -> String {
        match self {
            PushTarget::AllDevices => "all devices".to_string(),
            PushTarget::Channel(tag) => format!("#{}", tag),
            PushTarget::Email(email) => email.clone(),
            PushTarget::Device(iden) => iden.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct PushPayload<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    title: &'a str,
    body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel_tag: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_iden: Option<&'a str>,
}

pub struct PushbulletNotifier {
    base: NotifierBase,
    access_token: SecretString,
    targets: Vec<PushTarget>,
}

impl PushbulletNotifier {
    pub fn new(
        ctx: &NotifierContext,
        access_token: &str,
        recipients: &[String],
    ) -> Result<Self, ValidationError> {
        if access_token.is_empty() {
            return Err(ValidationError::Missing {
                service: SERVICE,
                field: "access token",
            });
        }

        let mut targets: Vec<PushTarget> = recipients
            .iter()
            .filter_map(|r| PushTarget::parse(r))
            .collect();
        if targets.is_empty() {
            targets.push(PushTarget::AllDevices);
        }

        Ok(Self {
            base: NotifierBase::new(SERVICE, ctx).with_errors(PUSHBULLET_ERRORS),
            access_token: SecretString::new(access_token.to_string()),
            targets,
        })
    }

    pub fn from_url(url: &ServiceUrl, ctx: &NotifierContext) -> Result<Self, ValidationError> {
        Self::new(ctx, &url.host, &url.path)
    }

    pub fn targets(&self) -> &[PushTarget] {
        &self.targets
    }

    fn deliver(&mut self, target: &PushTarget, notification: &Notification) -> Result<(), SendError> {
        let mut payload = PushPayload {
            kind: "note",
            title: &notification.title,
            body: &notification.body,
            channel_tag: None,
            email: None,
            device_iden: None,
        };
        match target {
            PushTarget::AllDevices => {}
            PushTarget::Channel(tag) => payload.channel_tag = Some(tag),
            PushTarget::Email(email) => payload.email = Some(email),
            PushTarget::Device(iden) => payload.device_iden = Some(iden),
        }

        let request = HttpRequest::new(API_URL)
            .basic_auth(self.access_token.expose(), Some(String::new()))
            .json(&payload)?;
        self.base.execute(Method::Post, &request, &[200])?;
        Ok(())
    }
}

impl Notifier for PushbulletNotifier {
    fn protocol(&self) -> &'static str {
        "pbul"
    }

    fn base(&self) -> &NotifierBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NotifierBase {
        &mut self.base
    }

    fn url(&self) -> String {
        let recipients = self
            .targets
            .iter()
            .filter(|t| **t != PushTarget::AllDevices)
            .map(|t| encode(&t.label()))
            .collect::<Vec<_>>();
        format!(
            "pbul://{}/{}",
            encode(self.access_token.expose()),
            recipients.join("/")
        )
    }

    fn send(&mut self, notification: &Notification) -> bool {
        let targets = self.targets.clone();
        let mut all_ok = true;
        for target in &targets {
            let outcome = self.deliver(target, notification);
            all_ok &= self.base.settle(outcome, Some(&target.label()));
        }
        all_ok
    }
}

impl std::fmt::Debug for PushbulletNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushbulletNotifier")
            .field("access_token", &self.access_token)
            .field("targets", &self.targets)
            .finish()
    }
}

pub(crate) fn build(
    url: &ServiceUrl,
    ctx: &NotifierContext,
) -> Result<Box<dyn Notifier>, ValidationError> {
    Ok(Box::new(PushbulletNotifier::from_url(url, ctx)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::parse_list;
    use crate::notify::NotifyType;
    use crate::notify::testing::{MockTransport, Reply, context};

    #[test]
    fn recipients_are_classified() {
        let transport = MockTransport::new();
        let ctx = context(&transport);
        let recipients = parse_list("#chan1,#chan2,device,user@example.com,,,");
        let notifier = PushbulletNotifier::new(&ctx, &"a".repeat(32), &recipients).unwrap();

        assert_eq!(
            notifier.targets(),
            &[
                PushTarget::Channel("chan1".to_string()),
                PushTarget::Channel("chan2".to_string()),
                PushTarget::Device("device".to_string()),
                PushTarget::Email("user@example.com".to_string()),
            ]
        );

        let notifier = PushbulletNotifier::new(&ctx, &"a".repeat(32), &[]).unwrap();
        assert_eq!(notifier.targets(), &[PushTarget::AllDevices]);
    }

    #[test]
    fn one_push_per_recipient() {
        let transport = MockTransport::new();
        let url = ServiceUrl::parse(&format!(
            "pbul://{}/device/#channel/user@example.com/",
            "a".repeat(32)
        ))
        .unwrap();
        let mut notifier = PushbulletNotifier::from_url(&url, &context(&transport)).unwrap();

        assert!(notifier.notify("title", "body", NotifyType::Info));

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        let first = &requests[0].1;
        assert_eq!(first.url, API_URL);
        assert_eq!(
            first.basic_auth,
            Some(("a".repeat(32), Some(String::new())))
        );
        assert_eq!(first.json_body().unwrap()["device_iden"], "device");
        assert_eq!(first.json_body().unwrap()["type"], "note");
        assert_eq!(requests[1].1.json_body().unwrap()["channel_tag"], "channel");
        assert_eq!(requests[2].1.json_body().unwrap()["email"], "user@example.com");
    }

    #[test]
    fn any_failed_push_fails_the_call() {
        let transport = MockTransport::new();
        transport.push(Reply::status(200));
        transport.push(Reply::status(401));
        let url = ServiceUrl::parse(&format!("pbul://{}/a/b", "a".repeat(32))).unwrap();
        let mut notifier = PushbulletNotifier::from_url(&url, &context(&transport)).unwrap();

        assert!(!notifier.notify("title", "body", NotifyType::Info));
    }

    #[test]
    fn url_round_trips() {
        let transport = MockTransport::new();
        let url = ServiceUrl::parse(&format!("pbul://{}/#chan/dev/", "a".repeat(32))).unwrap();
        let notifier = PushbulletNotifier::from_url(&url, &context(&transport)).unwrap();

        let reparsed = ServiceUrl::parse(&notifier.url()).unwrap();
        assert_eq!(reparsed.path, vec!["#chan", "dev"]);
    }
}
