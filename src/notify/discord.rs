//! Discord webhook notifier.
//!
//! `discord://[botname@]{webhook_id}/{webhook_token}[?tts=no&avatar=yes&footer=no&thumbnail=yes]`

use serde::Serialize;

use crate::config::SecretString;
use crate::error::{SendError, ValidationError};
use crate::identifier::{ServiceUrl, build_auth, build_query, encode};
use crate::notify::base::{NotifierBase, NotifierContext};
use crate::notify::{ImageSize, Notification, Notifier};
use crate::transport::{HttpRequest, Method};

const SERVICE: &str = "Discord";
const API_URL: &str = "https://discordapp.com/api/webhooks";

#[derive(Debug, Serialize)]
struct Provider<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Footer {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct Thumbnail {
    url: String,
    height: u32,
    width: u32,
}

#[derive(Debug, Serialize)]
struct Embed<'a> {
    provider: Provider<'a>,
    title: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    description: &'a str,
    color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    footer: Option<Footer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail: Option<Thumbnail>,
}

#[derive(Debug, Serialize)]
struct DiscordPayload<'a> {
    tts: bool,
    wait: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar_url: Option<String>,
    embeds: Vec<Embed<'a>>,
}

/// Display options for the embed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscordOptions {
    pub tts: bool,
    pub avatar: bool,
    pub footer: bool,
    pub thumbnail: bool,
}

impl Default for DiscordOptions {
    fn default() -> Self {
        Self {
            tts: false,
            avatar: true,
            footer: false,
            thumbnail: true,
        }
    }
}

pub struct DiscordNotifier {
    base: NotifierBase,
    webhook_id: SecretString,
    webhook_token: SecretString,
    username: Option<String>,
    options: DiscordOptions,
}

impl DiscordNotifier {
    pub fn new(
        ctx: &NotifierContext,
        webhook_id: &str,
        webhook_token: &str,
        username: Option<String>,
        options: DiscordOptions,
    ) -> Result<Self, ValidationError> {
        if webhook_id.is_empty() {
            return Err(ValidationError::Missing {
                service: SERVICE,
                field: "webhook id",
            });
        }
        if webhook_token.is_empty() {
            return Err(ValidationError::Missing {
                service: SERVICE,
                field: "webhook token",
            });
        }

        Ok(Self {
            base: NotifierBase::new(SERVICE, ctx),
            webhook_id: SecretString::new(webhook_id.to_string()),
            webhook_token: SecretString::new(webhook_token.to_string()),
            username,
            options,
        })
    }

    pub fn from_url(url: &ServiceUrl, ctx: &NotifierContext) -> Result<Self, ValidationError> {
        let defaults = DiscordOptions::default();
        let options = DiscordOptions {
            tts: url.query_bool("tts", defaults.tts),
            avatar: url.query_bool("avatar", defaults.avatar),
            footer: url.query_bool("footer", defaults.footer),
            thumbnail: url.query_bool("thumbnail", defaults.thumbnail),
        };
        let token = url.path.first().map(String::as_str).unwrap_or_default();
        Self::new(ctx, &url.host, token, url.user.clone(), options)
    }

    pub fn options(&self) -> DiscordOptions {
        self.options
    }

    fn build_payload<'a>(&'a self, notification: &'a Notification) -> DiscordPayload<'a> {
        let asset = self.base.asset();
        let image = self
            .base
            .image_url(notification.notify_type, ImageSize::XY256);

        let footer = self.options.footer.then(|| Footer {
            text: asset.app_desc.clone(),
            icon_url: if self.base.include_image() {
                asset.image_url_logo()
            } else {
                None
            },
        });

        let thumbnail = match (&image, self.options.thumbnail) {
            (Some(url), true) => Some(Thumbnail {
                url: url.clone(),
                height: 256,
                width: 256,
            }),
            _ => None,
        };

        DiscordPayload {
            tts: self.options.tts,
            wait: true,
            username: self.username.as_deref(),
            avatar_url: image.filter(|_| self.options.avatar),
            embeds: vec![Embed {
                provider: Provider {
                    name: &asset.app_id,
                    url: asset.app_url.as_deref(),
                },
                title: &notification.title,
                kind: "rich",
                description: &notification.body,
                color: asset.color_int(notification.notify_type),
                footer,
                thumbnail,
            }],
        }
    }

    fn deliver(&mut self, notification: &Notification) -> Result<(), SendError> {
        let url = format!(
            "{}/{}/{}",
            API_URL,
            encode(self.webhook_id.expose()),
            encode(self.webhook_token.expose())
        );
        let request = HttpRequest::new(url).json(&self.build_payload(notification))?;
        self.base.execute(Method::Post, &request, &[200, 204])?;
        Ok(())
    }
}

impl Notifier for DiscordNotifier {
    fn protocol(&self) -> &'static str {
        "discord"
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
            "discord://{}{}/{}/{}",
            build_auth(self.username.as_deref(), None),
            encode(self.webhook_id.expose()),
            encode(self.webhook_token.expose()),
            build_query(&[
                ("tts", yes_no(self.options.tts)),
                ("avatar", yes_no(self.options.avatar)),
                ("footer", yes_no(self.options.footer)),
                ("thumbnail", yes_no(self.options.thumbnail)),
            ])
        )
    }

    fn send(&mut self, notification: &Notification) -> bool {
        let outcome = self.deliver(notification);
        self.base.settle(outcome, None)
    }
}

impl std::fmt::Debug for DiscordNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordNotifier")
            .field("webhook_id", &self.webhook_id)
            .field("username", &self.username)
            .field("options", &self.options)
            .finish()
    }
}

pub(crate) fn build(
    url: &ServiceUrl,
    ctx: &NotifierContext,
) -> Result<Box<dyn Notifier>, ValidationError> {
    Ok(Box::new(DiscordNotifier::from_url(url, ctx)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotifyType;
    use crate::notify::testing::{MockTransport, Reply, context};

    fn identifier(query: &str) -> ServiceUrl {
        ServiceUrl::parse(&format!(
            "discord://l2g@{}/{}{}",
            "i".repeat(24),
            "t".repeat(64),
            query
        ))
        .unwrap()
    }

    #[test]
    fn payload_structure_with_defaults() {
        let transport = MockTransport::with_default(Reply::status(204));
        let mut notifier = DiscordNotifier::from_url(&identifier(""), &context(&transport)).unwrap();

        assert!(notifier.notify("Disk full", "92% used on /var", NotifyType::Failure));

        let (_, request) = transport.last().unwrap();
        assert_eq!(
            request.url,
            format!(
                "https://discordapp.com/api/webhooks/{}/{}",
                "i".repeat(24),
                "t".repeat(64)
            )
        );
        let json = request.json_body().unwrap();
        assert_eq!(json["tts"], false);
        assert_eq!(json["wait"], true);
        assert_eq!(json["username"], "l2g");
        assert!(json["avatar_url"].as_str().unwrap().contains("failure-256x256"));

        let embed = &json["embeds"][0];
        assert_eq!(embed["title"], "Disk full");
        assert_eq!(embed["description"], "92% used on /var");
        assert_eq!(embed["type"], "rich");
        assert_eq!(embed["color"], 0xA32037);
        assert_eq!(embed["provider"]["name"], "Herald");
        assert!(embed.get("footer").is_none());
        assert_eq!(embed["thumbnail"]["width"], 256);
    }

    #[test]
    fn options_toggle_payload_fields() {
        let transport = MockTransport::new();
        let mut notifier = DiscordNotifier::from_url(
            &identifier("?avatar=No&footer=Yes&thumbnail=no&tts=yes"),
            &context(&transport),
        )
        .unwrap();
        assert!(notifier.options().tts);

        assert!(notifier.notify("t", "b", NotifyType::Info));

        let (_, request) = transport.last().unwrap();
        let json = request.json_body().unwrap();
        assert!(json.get("avatar_url").is_none());
        assert_eq!(json["embeds"][0]["footer"]["text"], "Herald Notifications");
        assert!(json["embeds"][0].get("thumbnail").is_none());
    }

    #[test]
    fn missing_token_is_rejected() {
        let transport = MockTransport::new();
        let url = ServiceUrl::parse(&format!("discord://{}", "i".repeat(24))).unwrap();
        assert!(matches!(
            DiscordNotifier::from_url(&url, &context(&transport)),
            Err(ValidationError::Missing { field: "webhook token", .. })
        ));
    }
}
