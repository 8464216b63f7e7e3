//! IFTTT Maker webhook notifier.
//!
//! `ifttt://{webhook_key}@{event}[/{event}...][?+key=value&-key]`
//!
//! The notification fills `value1` (title), `value2` (body) and `value3`
//! (type). Query keys prefixed with `+` add or override fields, keys
//! prefixed with `-` remove them.

use std::collections::BTreeMap;

use crate::config::SecretString;
use crate::error::{SendError, ValidationError};
use crate::identifier::{ServiceUrl, build_query, encode};
use crate::notify::base::{NotifierBase, NotifierContext};
use crate::notify::{Notification, Notifier};
use crate::transport::{HttpRequest, Method};

const SERVICE: &str = "IFTTT";
const API_URL: &str = "https://maker.ifttt.com/trigger";

const IFTTT_ERRORS: &[(u16, &str)] = &[
    (401, "Unauthorized - Invalid Webhook Key."),
    (404, "Not Found - Unknown Event."),
];

pub struct IftttNotifier {
    base: NotifierBase,
    webhook_key: SecretString,
    events: Vec<String>,
    add_fields: BTreeMap<String, String>,
    remove_fields: Vec<String>,
}

impl IftttNotifier {
    pub fn new(
        ctx: &NotifierContext,
        webhook_key: &str,
        events: Vec<String>,
        add_fields: BTreeMap<String, String>,
        remove_fields: Vec<String>,
    ) -> Result<Self, ValidationError> {
        if webhook_key.is_empty() {
            return Err(ValidationError::Missing {
                service: SERVICE,
                field: "webhook key",
            });
        }
        if events.is_empty() {
            return Err(ValidationError::NoRecipients { service: SERVICE });
        }

        Ok(Self {
            base: NotifierBase::new(SERVICE, ctx).with_errors(IFTTT_ERRORS),
            webhook_key: SecretString::new(webhook_key.to_string()),
            events,
            add_fields,
            remove_fields,
        })
    }

    pub fn from_url(url: &ServiceUrl, ctx: &NotifierContext) -> Result<Self, ValidationError> {
        let (key, events) = match &url.user {
            Some(user) => {
                let mut events = vec![url.host.clone()];
                events.extend(url.path.iter().cloned());
                (user.as_str(), events)
            }
            None => (url.host.as_str(), url.path.clone()),
        };

        let mut add_fields = BTreeMap::new();
        let mut remove_fields = Vec::new();
        for (key, value) in &url.query {
            if let Some(name) = key.strip_prefix('+') {
                add_fields.insert(name.to_string(), value.clone());
            } else if let Some(name) = key.strip_prefix('-') {
                remove_fields.push(name.to_string());
            }
        }

        Self::new(ctx, key, events, add_fields, remove_fields)
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }

    fn build_payload(&self, notification: &Notification) -> BTreeMap<String, String> {
        let mut payload = BTreeMap::from([
            ("value1".to_string(), notification.title.clone()),
            ("value2".to_string(), notification.body.clone()),
            (
                "value3".to_string(),
                notification.notify_type.as_str().to_string(),
            ),
        ]);
        payload.extend(self.add_fields.clone());
        for name in &self.remove_fields {
            payload.remove(name);
        }
        payload
    }

    fn deliver(&mut self, event: &str, notification: &Notification) -> Result<(), SendError> {
        let url = format!(
            "{}/{}/with/key/{}",
            API_URL,
            encode(event),
            encode(self.webhook_key.expose())
        );
        let request = HttpRequest::new(url).json(&self.build_payload(notification))?;
        self.base.execute(Method::Post, &request, &[200])?;
        Ok(())
    }
}

impl Notifier for IftttNotifier {
    fn protocol(&self) -> &'static str {
        "ifttt"
    }

    fn base(&self) -> &NotifierBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NotifierBase {
        &mut self.base
    }

    fn url(&self) -> String {
        let mut query: Vec<(String, String)> = self
            .add_fields
            .iter()
            .map(|(k, v)| (format!("+{}", k), v.clone()))
            .collect();
        query.extend(
            self.remove_fields
                .iter()
                .map(|k| (format!("-{}", k), String::new())),
        );
        let events = self
            .events
            .iter()
            .map(|e| encode(e))
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "ifttt://{}@{}/{}",
            encode(self.webhook_key.expose()),
            events,
            build_query(&query)
        )
    }

    fn send(&mut self, notification: &Notification) -> bool {
        let events = self.events.clone();
        let mut all_ok = true;
        for event in &events {
            let outcome = self.deliver(event, notification);
            all_ok &= self.base.settle(outcome, Some(event));
        }
        all_ok
    }
}

impl std::fmt::Debug for IftttNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IftttNotifier")
            .field("webhook_key", &self.webhook_key)
            .field("events", &self.events)
            .finish()
    }
}

pub(crate) fn build(
    url: &ServiceUrl,
    ctx: &NotifierContext,
) -> Result<Box<dyn Notifier>, ValidationError> {
    Ok(Box::new(IftttNotifier::from_url(url, ctx)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotifyType;
    use crate::notify::testing::{MockTransport, Reply, context};

    #[test]
    fn one_request_per_event() {
        let transport = MockTransport::new();
        let url = ServiceUrl::parse("ifttt://WebHookKey@door_open/lights_on").unwrap();
        let mut notifier = IftttNotifier::from_url(&url, &context(&transport)).unwrap();
        assert_eq!(notifier.events(), &["door_open", "lights_on"]);

        assert!(notifier.notify("Front door", "opened", NotifyType::Warning));

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[0].1.url,
            "https://maker.ifttt.com/trigger/door_open/with/key/WebHookKey"
        );
        let json = requests[1].1.json_body().unwrap();
        assert_eq!(json["value1"], "Front door");
        assert_eq!(json["value2"], "opened");
        assert_eq!(json["value3"], "warning");
    }

    #[test]
    fn query_adds_and_removes_fields() {
        let transport = MockTransport::new();
        let url = ServiceUrl::parse("ifttt://WebHookKey@event?+Room=kitchen&-value3").unwrap();
        let mut notifier = IftttNotifier::from_url(&url, &context(&transport)).unwrap();

        assert!(notifier.notify("t", "b", NotifyType::Info));

        let (_, request) = transport.last().unwrap();
        let json = request.json_body().unwrap();
        assert_eq!(json["room"], "kitchen");
        assert!(json.get("value3").is_none());
        assert_eq!(json["value1"], "t");
    }

    #[test]
    fn key_in_host_position() {
        let transport = MockTransport::new();
        let url = ServiceUrl::parse("ifttt://WebHookKey/event").unwrap();
        let notifier = IftttNotifier::from_url(&url, &context(&transport)).unwrap();
        assert_eq!(notifier.events(), &["event"]);
    }

    #[test]
    fn events_are_required() {
        let transport = MockTransport::new();
        let url = ServiceUrl::parse("ifttt://WebHookKey").unwrap();
        assert_eq!(
            IftttNotifier::from_url(&url, &context(&transport)).unwrap_err(),
            ValidationError::NoRecipients { service: SERVICE }
        );
    }

    #[test]
    fn one_failed_event_fails_the_call() {
        let transport = MockTransport::new();
        transport.push(Reply::status(200));
        transport.push(Reply::status(404));
        let url = ServiceUrl::parse("ifttt://key@a/b").unwrap();
        let mut notifier = IftttNotifier::from_url(&url, &context(&transport)).unwrap();

        assert!(!notifier.notify("t", "b", NotifyType::Info));
        assert_eq!(transport.count(), 2);
    }
}
