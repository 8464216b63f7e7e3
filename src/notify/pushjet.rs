//! Pushjet notifier (self-hosted or public server).
//!
//! `pjet[s]://{secret}@{host}[:port]` or `pjet[s]://{host}?secret={secret}`

use crate::config::SecretString;
use crate::error::{SendError, ValidationError};
use crate::identifier::{ServiceUrl, encode};
use crate::notify::base::{Endpoint, NotifierBase, NotifierContext};
use crate::notify::{Notification, Notifier, NotifyType};
use crate::transport::{HttpRequest, Method};

const SERVICE: &str = "Pushjet";

/// Pushjet message level for a notification type.
fn level(notify_type: NotifyType) -> u8 {
    match notify_type {
        NotifyType::Info => 2,
        NotifyType::Success => 3,
        NotifyType::Warning => 4,
        NotifyType::Failure => 5,
    }
}

pub struct PushjetNotifier {
    base: NotifierBase,
    endpoint: Endpoint,
    secret: SecretString,
}

impl PushjetNotifier {
    pub fn new(
        ctx: &NotifierContext,
        endpoint: Endpoint,
        secret: &str,
    ) -> Result<Self, ValidationError> {
        if endpoint.host.is_empty() {
            return Err(ValidationError::Missing {
                service: SERVICE,
                field: "host",
            });
        }
        if secret.is_empty() {
            return Err(ValidationError::Missing {
                service: SERVICE,
                field: "secret",
            });
        }
        Ok(Self {
            base: NotifierBase::new(SERVICE, ctx),
            endpoint,
            secret: SecretString::new(secret.to_string()),
        })
    }

    pub fn from_url(url: &ServiceUrl, ctx: &NotifierContext) -> Result<Self, ValidationError> {
        let secret = url
            .query_value("secret")
            .filter(|s| !s.is_empty())
            .or(url.user.as_deref())
            .unwrap_or_default()
            .to_string();
        let endpoint = Endpoint {
            user: None,
            password: None,
            path: "/".to_string(),
            ..Endpoint::from_url(url)
        };
        Self::new(ctx, endpoint, &secret)
    }

    fn deliver(&mut self, notification: &Notification) -> Result<(), SendError> {
        let url = format!(
            "{}/message?secret={}",
            self.endpoint.origin(),
            encode(self.secret.expose())
        );
        let request = HttpRequest::new(url).form(vec![
            ("title", notification.title.clone()),
            ("message", notification.body.clone()),
            ("level", level(notification.notify_type).to_string()),
        ]);
        self.base.execute(Method::Post, &request, &[200])?;
        Ok(())
    }
}

impl Notifier for PushjetNotifier {
    fn protocol(&self) -> &'static str {
        "pjet"
    }

    fn base(&self) -> &NotifierBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NotifierBase {
        &mut self.base
    }

    fn url(&self) -> String {
        let port = self
            .endpoint
            .port
            .map(|p| format!(":{}", p))
            .unwrap_or_default();
        format!(
            "pjet{}://{}@{}{}/",
            if self.endpoint.secure { "s" } else { "" },
            encode(self.secret.expose()),
            self.endpoint.host,
            port
        )
    }

    fn send(&mut self, notification: &Notification) -> bool {
        let outcome = self.deliver(notification);
        self.base.settle(outcome, None)
    }
}

impl std::fmt::Debug for PushjetNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushjetNotifier")
            .field("endpoint", &self.endpoint)
            .field("secret", &self.secret)
            .finish()
    }
}

pub(crate) fn build(
    url: &ServiceUrl,
    ctx: &NotifierContext,
) -> Result<Box<dyn Notifier>, ValidationError> {
    Ok(Box::new(PushjetNotifier::from_url(url, ctx)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::testing::{MockTransport, context};

    #[test]
    fn secret_from_user_or_query() {
        let transport = MockTransport::new();
        let ctx = context(&transport);

        let url = ServiceUrl::parse("pjets://abc123@localhost:8080").unwrap();
        let mut notifier = PushjetNotifier::from_url(&url, &ctx).unwrap();
        assert!(notifier.notify("title", "body", NotifyType::Warning));

        let (method, request) = transport.last().unwrap();
        assert_eq!(method, Method::Post);
        assert_eq!(request.url, "https://localhost:8080/message?secret=abc123");
        assert_eq!(request.form_value("level"), Some("4"));
        assert_eq!(request.form_value("message"), Some("body"));

        let url = ServiceUrl::parse("pjet://localhost?secret=xyz").unwrap();
        let mut notifier = PushjetNotifier::from_url(&url, &ctx).unwrap();
        assert!(notifier.notify("title", "body", NotifyType::Info));
        let (_, request) = transport.last().unwrap();
        assert_eq!(request.url, "http://localhost/message?secret=xyz");
        assert_eq!(request.form_value("level"), Some("2"));
    }

    #[test]
    fn missing_secret_is_rejected() {
        let transport = MockTransport::new();
        let url = ServiceUrl::parse("pjet://localhost").unwrap();
        assert!(matches!(
            PushjetNotifier::from_url(&url, &context(&transport)),
            Err(ValidationError::Missing { field: "secret", .. })
        ));
    }

    #[test]
    fn url_keeps_secret_and_port() {
        let transport = MockTransport::new();
        let url = ServiceUrl::parse("pjets://abc@example.com:9000").unwrap();
        let notifier = PushjetNotifier::from_url(&url, &context(&transport)).unwrap();

        let reparsed = ServiceUrl::parse(&notifier.url()).unwrap();
        assert_eq!(reparsed.scheme, "pjets");
        assert_eq!(reparsed.user.as_deref(), Some("abc"));
        assert_eq!(reparsed.port, Some(9000));
    }
}
