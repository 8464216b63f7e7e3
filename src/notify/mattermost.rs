//! Mattermost notifier.
//!
//! Sends notifications to Mattermost via incoming webhooks.
//!
//! `mmost://[botname@]host[:port]/{token}[?channel=name]` (`mmosts://`
//! for HTTPS).

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::config::SecretString;
use crate::error::{SendError, ValidationError};
use crate::identifier::{ServiceUrl, build_query, encode};
use crate::notify::base::{Endpoint, NotifierBase, NotifierContext};
use crate::notify::{ImageSize, Notification, Notifier};
use crate::transport::{HttpRequest, Method};

const SERVICE: &str = "Mattermost";
const DEFAULT_PORT: u16 = 8065;

static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{24,32}$").expect("valid regex"));

/// Mattermost webhook payload structure.
#[derive(Debug, Clone, Serialize)]
struct MattermostPayload<'a> {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon_url: Option<String>,
    username: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<&'a str>,
}

/// Build Mattermost webhook payload from a notification.
fn build_mattermost_payload<'a>(
    notification: &Notification,
    username: &'a str,
    channel: Option<&'a str>,
    icon_url: Option<String>,
) -> MattermostPayload<'a> {
    let text = if notification.title.is_empty() {
        notification.body.clone()
    } else {
        format!("###### {}\n{}", notification.title, notification.body)
    };
    MattermostPayload {
        text,
        icon_url,
        username,
        channel,
    }
}

/// Mattermost notifier implementation.
pub struct MattermostNotifier {
    base: NotifierBase,
    endpoint: Endpoint,
    token: SecretString,
    channel: Option<String>,
}

impl MattermostNotifier {
    /// Create a new Mattermost notifier; port 0 or none means 8065.
    pub fn new(
        ctx: &NotifierContext,
        mut endpoint: Endpoint,
        token: &str,
        channel: Option<String>,
    ) -> Result<Self, ValidationError> {
        if endpoint.host.is_empty() {
            return Err(ValidationError::Missing {
                service: SERVICE,
                field: "host",
            });
        }
        if token.is_empty() {
            return Err(ValidationError::Missing {
                service: SERVICE,
                field: "webhook token",
            });
        }
        if !TOKEN_REGEX.is_match(token) {
            return Err(ValidationError::Invalid {
                service: SERVICE,
                field: "webhook token",
                reason: "expected 24 to 32 alphanumeric characters".to_string(),
            });
        }
        if matches!(endpoint.port, None | Some(0)) {
            endpoint.port = Some(DEFAULT_PORT);
        }
        endpoint.path = "/".to_string();

        Ok(Self {
            base: NotifierBase::new(SERVICE, ctx),
            endpoint,
            token: SecretString::new(token.to_string()),
            channel: channel.filter(|c| !c.is_empty()),
        })
    }

    pub fn from_url(url: &ServiceUrl, ctx: &NotifierContext) -> Result<Self, ValidationError> {
        let token = url.path.first().map(String::as_str).unwrap_or_default();
        let channel = url.query_value("channel").map(str::to_string);
        Self::new(ctx, Endpoint::from_url(url), token, channel)
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn deliver(&mut self, notification: &Notification) -> Result<(), SendError> {
        let asset = self.base.asset();
        let username = self.endpoint.user.as_deref().unwrap_or(&asset.app_id);
        let payload = build_mattermost_payload(
            notification,
            username,
            self.channel.as_deref(),
            self.base
                .image_url(notification.notify_type, ImageSize::XY72),
        );

        let url = format!(
            "{}/hooks/{}",
            self.endpoint.origin(),
            encode(self.token.expose())
        );
        let request = HttpRequest::new(url).json(&payload)?;
        self.base.execute(Method::Post, &request, &[200])?;
        Ok(())
    }
}

impl Notifier for MattermostNotifier {
    fn protocol(&self) -> &'static str {
        if self.endpoint.secure { "mmosts" } else { "mmost" }
    }

    fn base(&self) -> &NotifierBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NotifierBase {
        &mut self.base
    }

    fn url(&self) -> String {
        let query = match &self.channel {
            Some(channel) => build_query(&[("channel", channel.as_str())]),
            None => String::new(),
        };
        let mut endpoint = self.endpoint.clone();
        endpoint.path = format!("/{}", self.token.expose());
        endpoint.identifier("mmost", &query)
    }

    fn send(&mut self, notification: &Notification) -> bool {
        let outcome = self.deliver(notification);
        self.base.settle(outcome, self.channel.as_deref())
    }
}

impl std::fmt::Debug for MattermostNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MattermostNotifier")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token)
            .field("channel", &self.channel)
            .finish()
    }
}

pub(crate) fn build(
    url: &ServiceUrl,
    ctx: &NotifierContext,
) -> Result<Box<dyn Notifier>, ValidationError> {
    Ok(Box::new(MattermostNotifier::from_url(url, ctx)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotifyType;
    use crate::notify::testing::{MockTransport, context};

    const TOKEN: &str = "3ccdd113474722377935511fc85d3dd4";

    #[test]
    fn build_mattermost_payload_structure() {
        let notification = Notification::new("Test Alert", "Something happened", NotifyType::Info);
        let payload = build_mattermost_payload(
            &notification,
            "herald",
            Some("ops"),
            Some("http://img/info.png".to_string()),
        );

        assert_eq!(payload.text, "###### Test Alert\nSomething happened");
        assert_eq!(payload.username, "herald");
        assert_eq!(payload.channel, Some("ops"));
        assert_eq!(payload.icon_url.as_deref(), Some("http://img/info.png"));
    }

    #[test]
    fn mattermost_payload_serializes_without_optional_fields() {
        let notification = Notification::new("", "Body", NotifyType::Info);
        let payload = build_mattermost_payload(&notification, "herald", None, None);
        let json = serde_json::to_string(&payload).unwrap();

        assert!(json.contains("\"text\":\"Body\""));
        assert!(json.contains("\"username\":\"herald\""));
        assert!(!json.contains("icon_url"));
        assert!(!json.contains("channel"));
    }

    #[test]
    fn port_defaults() {
        let transport = MockTransport::new();
        let ctx = context(&transport);

        for (identifier, port) in [
            (format!("mmost://localhost/{}", TOKEN), 8065),
            (format!("mmost://localhost:0/{}", TOKEN), 8065),
            (format!("mmost://localhost:8080/{}", TOKEN), 8080),
        ] {
            let url = ServiceUrl::parse(&identifier).unwrap();
            let notifier = MattermostNotifier::from_url(&url, &ctx).unwrap();
            assert_eq!(notifier.endpoint().port, Some(port), "{}", identifier);
        }
    }

    #[test]
    fn token_validation() {
        let transport = MockTransport::new();
        let ctx = context(&transport);

        let url = ServiceUrl::parse("mmosts://localhost").unwrap();
        assert!(matches!(
            MattermostNotifier::from_url(&url, &ctx),
            Err(ValidationError::Missing { .. })
        ));

        let url = ServiceUrl::parse("mmost://localhost/bad-web-hook").unwrap();
        assert!(matches!(
            MattermostNotifier::from_url(&url, &ctx),
            Err(ValidationError::Invalid { .. })
        ));
    }

    #[test]
    fn posts_to_hook_with_channel() {
        let transport = MockTransport::new();
        let url =
            ServiceUrl::parse(&format!("mmost://bot@localhost/{}?channel=test", TOKEN)).unwrap();
        let mut notifier = MattermostNotifier::from_url(&url, &context(&transport)).unwrap();

        assert!(notifier.notify("title", "body", NotifyType::Info));

        let (_, request) = transport.last().unwrap();
        assert_eq!(request.url, format!("http://localhost:8065/hooks/{}", TOKEN));
        let json = request.json_body().unwrap();
        assert_eq!(json["channel"], "test");
        assert_eq!(json["username"], "bot");
    }

    #[test]
    fn mattermost_notifier_debug() {
        let transport = MockTransport::new();
        let url = ServiceUrl::parse(&format!("mmost://localhost/{}", TOKEN)).unwrap();
        let notifier = MattermostNotifier::from_url(&url, &context(&transport)).unwrap();
        let debug = format!("{:?}", notifier);
        assert!(debug.contains("MattermostNotifier"));
        assert!(!debug.contains(TOKEN));
    }

    #[test]
    fn notifier_trait_is_object_safe() {
        let transport = MockTransport::new();
        let url = ServiceUrl::parse(&format!("mmosts://localhost/{}", TOKEN)).unwrap();
        let notifier: Box<dyn Notifier> =
            Box::new(MattermostNotifier::from_url(&url, &context(&transport)).unwrap());

        assert_eq!(notifier.service_name(), "Mattermost");
        assert_eq!(notifier.protocol(), "mmosts");
        let reparsed = ServiceUrl::parse(&notifier.url()).unwrap();
        assert_eq!(reparsed.path, vec![TOKEN]);
        assert_eq!(reparsed.port, Some(8065));
    }
}
