//! Faast notifier.
//!
//! `faast://{authtoken}`

use crate::config::SecretString;
use crate::error::{SendError, ValidationError};
use crate::identifier::{ServiceUrl, encode};
use crate::notify::base::{NotifierBase, NotifierContext};
use crate::notify::{ImageSize, Notification, Notifier};
use crate::transport::{HttpRequest, Method};

const SERVICE: &str = "Faast";
const API_URL: &str = "https://www.appnotifications.com/account/notifications.json";

pub struct FaastNotifier {
    base: NotifierBase,
    authtoken: SecretString,
}

impl FaastNotifier {
    pub fn new(ctx: &NotifierContext, authtoken: &str) -> Result<Self, ValidationError> {
        if authtoken.is_empty() {
            return Err(ValidationError::Missing {
                service: SERVICE,
                field: "authtoken",
            });
        }
        Ok(Self {
            base: NotifierBase::new(SERVICE, ctx),
            authtoken: SecretString::new(authtoken.to_string()),
        })
    }

    pub fn from_url(url: &ServiceUrl, ctx: &NotifierContext) -> Result<Self, ValidationError> {
        Self::new(ctx, &url.host)
    }

    fn deliver(&mut self, notification: &Notification) -> Result<(), SendError> {
        let mut fields = vec![
            ("user_credentials", self.authtoken.expose().to_string()),
            ("title", notification.title.clone()),
            ("message", notification.body.clone()),
        ];
        if let Some(icon) = self
            .base
            .image_url(notification.notify_type, ImageSize::XY72)
        {
            fields.push(("icon_url", icon));
        }

        let request = HttpRequest::new(API_URL).form(fields);
        self.base.execute(Method::Post, &request, &[200])?;
        Ok(())
    }
}

impl Notifier for FaastNotifier {
    fn protocol(&self) -> &'static str {
        "faast"
    }

    fn base(&self) -> &NotifierBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NotifierBase {
        &mut self.base
    }

    fn url(&self) -> String {
        format!("faast://{}/", encode(self.authtoken.expose()))
    }

    fn send(&mut self, notification: &Notification) -> bool {
        let outcome = self.deliver(notification);
        self.base.settle(outcome, None)
    }
}

impl std::fmt::Debug for FaastNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaastNotifier")
            .field("authtoken", &self.authtoken)
            .finish()
    }
}

pub(crate) fn build(
    url: &ServiceUrl,
    ctx: &NotifierContext,
) -> Result<Box<dyn Notifier>, ValidationError> {
    Ok(Box::new(FaastNotifier::from_url(url, ctx)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotifyType;
    use crate::notify::testing::{MockTransport, context};

    #[test]
    fn form_fields() {
        let transport = MockTransport::new();
        let url = ServiceUrl::parse(&format!("faast://{}", "a".repeat(32))).unwrap();
        let mut notifier = FaastNotifier::from_url(&url, &context(&transport)).unwrap();

        assert!(notifier.notify("title", "body", NotifyType::Success));

        let (method, request) = transport.last().unwrap();
        assert_eq!(method, Method::Post);
        assert_eq!(request.url, API_URL);
        assert_eq!(request.form_value("user_credentials"), Some("a".repeat(32).as_str()));
        assert_eq!(request.form_value("title"), Some("title"));
        assert_eq!(request.form_value("message"), Some("body"));
        assert!(request.form_value("icon_url").unwrap().contains("success-72x72"));
    }

    #[test]
    fn icon_is_omitted_without_images() {
        let transport = MockTransport::new();
        let ctx = context(&transport).with_include_image(false);
        let mut notifier = FaastNotifier::new(&ctx, "token").unwrap();

        assert!(notifier.notify("title", "body", NotifyType::Info));
        let (_, request) = transport.last().unwrap();
        assert!(request.form_value("icon_url").is_none());
    }
}
