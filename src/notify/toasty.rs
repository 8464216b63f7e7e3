//! Super Toasty notifier.
//!
//! `toasty://{user}@{device}[/{device}...]`

use crate::error::{SendError, ValidationError};
use crate::identifier::{ServiceUrl, build_query, encode};
use crate::notify::base::{NotifierBase, NotifierContext};
use crate::notify::{ImageSize, Notification, Notifier};
use crate::transport::{HttpRequest, Method};

const SERVICE: &str = "Toasty";
const API_URL: &str = "http://api.supertoasty.com/notify";

pub struct ToastyNotifier {
    base: NotifierBase,
    user: String,
    devices: Vec<String>,
}

impl ToastyNotifier {
    pub fn new(
        ctx: &NotifierContext,
        user: &str,
        devices: Vec<String>,
    ) -> Result<Self, ValidationError> {
        if user.is_empty() {
            return Err(ValidationError::Missing {
                service: SERVICE,
                field: "user",
            });
        }
        if devices.is_empty() {
            return Err(ValidationError::NoRecipients { service: SERVICE });
        }
        Ok(Self {
            base: NotifierBase::new(SERVICE, ctx),
            user: user.to_string(),
            devices,
        })
    }

    pub fn from_url(url: &ServiceUrl, ctx: &NotifierContext) -> Result<Self, ValidationError> {
        let devices = std::iter::once(url.host.clone())
            .chain(url.path.iter().cloned())
            .collect();
        Self::new(ctx, url.user.as_deref().unwrap_or_default(), devices)
    }

    pub fn devices(&self) -> &[String] {
        &self.devices
    }

    fn deliver(&mut self, device: &str, notification: &Notification) -> Result<(), SendError> {
        let mut params = vec![
            ("sender", self.user.clone()),
            ("title", notification.title.clone()),
            ("text", notification.body.clone()),
        ];
        if let Some(image) = self
            .base
            .image_url(notification.notify_type, ImageSize::XY128)
        {
            params.push(("image", image));
        }

        let url = format!("{}/{}{}", API_URL, encode(device), build_query(&params));
        self.base
            .execute(Method::Get, &HttpRequest::new(url), &[200])?;
        Ok(())
    }
}

impl Notifier for ToastyNotifier {
    fn protocol(&self) -> &'static str {
        "toasty"
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
        format!("toasty://{}@{}/", encode(&self.user), devices)
    }

    fn send(&mut self, notification: &Notification) -> bool {
        let devices = self.devices.clone();
        let mut all_ok = true;
        for device in &devices {
            let outcome = self.deliver(device, notification);
            all_ok &= self.base.settle(outcome, Some(device));
        }
        all_ok
    }
}

impl std::fmt::Debug for ToastyNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToastyNotifier")
            .field("user", &self.user)
            .field("devices", &self.devices)
            .finish()
    }
}

pub(crate) fn build(
    url: &ServiceUrl,
    ctx: &NotifierContext,
) -> Result<Box<dyn Notifier>, ValidationError> {
    Ok(Box::new(ToastyNotifier::from_url(url, ctx)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotifyType;
    use crate::notify::testing::{MockTransport, Reply, context};

    #[test]
    fn user_is_required() {
        let transport = MockTransport::new();
        let url = ServiceUrl::parse(&format!("toasty://{}", "d".repeat(32))).unwrap();
        assert!(matches!(
            ToastyNotifier::from_url(&url, &context(&transport)),
            Err(ValidationError::Missing { field: "user", .. })
        ));
    }

    #[test]
    fn one_get_per_device() {
        let transport = MockTransport::new();
        let url = ServiceUrl::parse("toasty://user@device0/device1/device2/").unwrap();
        let mut toasty = ToastyNotifier::from_url(&url, &context(&transport)).unwrap();
        assert_eq!(toasty.devices(), &["device0", "device1", "device2"]);

        assert!(toasty.notify("my title", "body", NotifyType::Success));

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        let (method, first) = &requests[0];
        assert_eq!(*method, Method::Get);
        assert!(
            first
                .url
                .starts_with("http://api.supertoasty.com/notify/device0?sender=user&title=my%20title&text=body&image=")
        );
        assert!(first.url.contains("128x128"));
        assert!(requests[2].1.url.contains("/notify/device2?"));
    }

    #[test]
    fn failure_status_fails_the_call() {
        let transport = MockTransport::with_default(Reply::status(999));
        let url = ServiceUrl::parse("toasty://user@device").unwrap();
        let mut toasty = ToastyNotifier::from_url(&url, &context(&transport)).unwrap();

        assert!(!toasty.notify("title", "body", NotifyType::Info));
    }
}
