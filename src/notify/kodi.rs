//! Kodi / XBMC notifier (JSON-RPC `GUI.ShowNotification`).
//!
//! `kodi://[user[:password]@]host[:port]` (`kodis://` for HTTPS),
//! `xbmc://...` (`xbmcs://`) for the legacy v2 protocol.

use serde::Serialize;

use crate::error::{SendError, ValidationError};
use crate::identifier::ServiceUrl;
use crate::notify::base::{Endpoint, NotifierBase, NotifierContext};
use crate::notify::{ImageSize, Notification, Notifier, NotifyType};
use crate::transport::{HttpRequest, Method};

const SERVICE: &str = "Kodi";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SECURE_PORT: u16 = 443;
/// Milliseconds the notification stays on screen.
const DISPLAY_TIME: u32 = 12000;

/// Remote protocol spoken by the media center.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KodiProtocol {
    /// XBMC, JSON-RPC v2.
    Xbmc,
    /// Kodi, JSON-RPC v6.
    Kodi,
}

impl KodiProtocol {
    fn scheme(&self) -> &'static str {
        match self {
            KodiProtocol::Xbmc => "xbmc",
            KodiProtocol::Kodi => "kodi",
        }
    }
}

#[derive(Debug, Serialize)]
struct ShowNotification<'a> {
    title: &'a str,
    message: &'a str,
    displaytime: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<String>,
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'static str,
    params: ShowNotification<'a>,
    id: u32,
}

pub struct KodiNotifier {
    base: NotifierBase,
    endpoint: Endpoint,
    protocol: KodiProtocol,
}

impl KodiNotifier {
    pub fn new(
        ctx: &NotifierContext,
        mut endpoint: Endpoint,
        protocol: KodiProtocol,
    ) -> Result<Self, ValidationError> {
        if endpoint.host.is_empty() {
            return Err(ValidationError::Missing {
                service: SERVICE,
                field: "host",
            });
        }
        if endpoint.port.is_none() {
            endpoint.port = Some(if endpoint.secure {
                DEFAULT_SECURE_PORT
            } else {
                DEFAULT_PORT
            });
        }
        endpoint.path = "/".to_string();

        Ok(Self {
            base: NotifierBase::new(SERVICE, ctx),
            endpoint,
            protocol,
        })
    }

    pub fn from_url(url: &ServiceUrl, ctx: &NotifierContext) -> Result<Self, ValidationError> {
        let protocol = if url.scheme.starts_with("xbmc") {
            KodiProtocol::Xbmc
        } else {
            KodiProtocol::Kodi
        };
        Self::new(ctx, Endpoint::from_url(url), protocol)
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn build_request<'a>(&self, notification: &'a Notification) -> RpcRequest<'a> {
        let image = self
            .base
            .image_url(notification.notify_type, ImageSize::XY128);
        let image = match self.protocol {
            // v6 falls back to its builtin icons
            KodiProtocol::Kodi => Some(image.unwrap_or_else(|| {
                match notification.notify_type {
                    NotifyType::Failure => "error",
                    NotifyType::Warning => "warning",
                    _ => "info",
                }
                .to_string()
            })),
            KodiProtocol::Xbmc => image,
        };

        RpcRequest {
            jsonrpc: "2.0",
            method: "GUI.ShowNotification",
            params: ShowNotification {
                title: &notification.title,
                message: &notification.body,
                displaytime: DISPLAY_TIME,
                image,
            },
            id: 1,
        }
    }

    fn deliver(&mut self, notification: &Notification) -> Result<(), SendError> {
        let url = format!("{}/jsonrpc", self.endpoint.origin());
        let request = self
            .endpoint
            .authorize(HttpRequest::new(url))
            .json(&self.build_request(notification))?;
        self.base.execute(Method::Post, &request, &[200])?;
        Ok(())
    }
}

impl Notifier for KodiNotifier {
    fn protocol(&self) -> &'static str {
        match (self.protocol, self.endpoint.secure) {
            (KodiProtocol::Kodi, false) => "kodi",
            (KodiProtocol::Kodi, true) => "kodis",
            (KodiProtocol::Xbmc, false) => "xbmc",
            (KodiProtocol::Xbmc, true) => "xbmcs",
        }
    }

    fn base(&self) -> &NotifierBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NotifierBase {
        &mut self.base
    }

    fn url(&self) -> String {
        self.endpoint.identifier(self.protocol.scheme(), "")
    }

    fn send(&mut self, notification: &Notification) -> bool {
        let outcome = self.deliver(notification);
        self.base.settle(outcome, None)
    }
}

impl std::fmt::Debug for KodiNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KodiNotifier")
            .field("endpoint", &self.endpoint)
            .field("protocol", &self.protocol)
            .finish()
    }
}

pub(crate) fn build(
    url: &ServiceUrl,
    ctx: &NotifierContext,
) -> Result<Box<dyn Notifier>, ValidationError> {
    Ok(Box::new(KodiNotifier::from_url(url, ctx)?))
}
