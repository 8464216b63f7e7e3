//! Behaviour shared by every notifier.
//!
//! [`NotifierBase`] owns the pieces each service needs but should not
//! reimplement: the throttle, the shared asset and transport, the image
//! policy and the uniform interpretation of HTTP outcomes.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::asset::Asset;
use crate::config::SecretString;
use crate::error::{ProtocolError, SendError};
use crate::identifier::{ServiceUrl, build_auth, encode_path};
use crate::notify::{ImageSize, NotifyType};
use crate::throttle::{DEFAULT_THROTTLE_INTERVAL, Throttle};
use crate::transport::{HttpRequest, HttpResponse, Method, Transport};

/// Status code descriptions, checked after a service's own table.
pub type StatusMap = &'static [(u16, &'static str)];

/// Generic HTTP status descriptions.
pub const HTTP_ERRORS: StatusMap = &[
    (400, "Bad Request - Unsupported Parameters."),
    (401, "Verification Failed."),
    (404, "Page not found."),
    (405, "Method not allowed."),
    (500, "Internal server error."),
    (503, "Servers are overloaded."),
];

/// Everything a notifier needs from its environment.
#[derive(Clone)]
pub struct NotifierContext {
    pub asset: Arc<Asset>,
    pub transport: Arc<dyn Transport>,
    pub throttle_interval: Duration,
    pub include_image: bool,
}

impl fmt::Debug for NotifierContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifierContext")
            .field("asset", &self.asset)
            .field("throttle_interval", &self.throttle_interval)
            .field("include_image", &self.include_image)
            .finish()
    }
}

impl NotifierContext {
    pub fn new(asset: Arc<Asset>, transport: Arc<dyn Transport>) -> Self {
        Self {
            asset,
            transport,
            throttle_interval: DEFAULT_THROTTLE_INTERVAL,
            include_image: true,
        }
    }

    pub fn with_throttle_interval(mut self, interval: Duration) -> Self {
        self.throttle_interval = interval;
        self
    }

    pub fn with_include_image(mut self, include_image: bool) -> Self {
        self.include_image = include_image;
        self
    }
}

/// State and helpers embedded in every notifier.
pub struct NotifierBase {
    service: &'static str,
    asset: Arc<Asset>,
    transport: Arc<dyn Transport>,
    throttle: Throttle,
    include_image: bool,
    errors: StatusMap,
}

impl fmt::Debug for NotifierBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifierBase")
            .field("service", &self.service)
            .field("throttle", &self.throttle)
            .field("include_image", &self.include_image)
            .finish()
    }
}

impl NotifierBase {
    pub fn new(service: &'static str, ctx: &NotifierContext) -> Self {
        Self {
            service,
            asset: Arc::clone(&ctx.asset),
            transport: Arc::clone(&ctx.transport),
            throttle: Throttle::new(ctx.throttle_interval),
            include_image: ctx.include_image,
            errors: &[],
        }
    }

    /// Service-specific status descriptions, consulted before [`HTTP_ERRORS`].
    pub fn with_errors(mut self, errors: StatusMap) -> Self {
        self.errors = errors;
        self
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    pub fn throttle_mut(&mut self) -> &mut Throttle {
        &mut self.throttle
    }

    pub fn include_image(&self) -> bool {
        self.include_image
    }

    pub fn set_include_image(&mut self, include_image: bool) {
        self.include_image = include_image;
    }

    /// Image URL for this notification, honouring the image policy.
    pub fn image_url(&self, notify_type: NotifyType, size: ImageSize) -> Option<String> {
        if !self.include_image {
            return None;
        }
        self.asset.image_url(notify_type, size)
    }

    /// Local image file for this notification, honouring the image policy.
    pub fn image_path(&self, notify_type: NotifyType, size: ImageSize) -> Option<PathBuf> {
        if !self.include_image {
            return None;
        }
        self.asset.image_path(notify_type, size)
    }

    pub fn color(&self, notify_type: NotifyType) -> &'static str {
        self.asset.color(notify_type)
    }

    /// Human-readable description of a status code.
    pub fn status_reason(&self, status: u16) -> &'static str {
        self.errors
            .iter()
            .chain(HTTP_ERRORS.iter())
            .find(|(code, _)| *code == status)
            .map(|(_, reason)| *reason)
            .unwrap_or("unknown error")
    }

    /// Issue one throttled request and check its status.
    ///
    /// Used for message deliveries: the throttle spaces consecutive calls
    /// by the configured interval. See [`NotifierBase::request`] for the
    /// status handling.
    pub fn execute(
        &mut self,
        method: Method,
        request: &HttpRequest,
        accepted: &[u16],
    ) -> Result<HttpResponse, SendError> {
        self.throttle.wait();
        let result = self.request(method, request, accepted);
        self.throttle.mark();
        result
    }

    /// Issue one request without touching the throttle and check its status.
    ///
    /// For session and lookup calls (logins, logouts, update polling) that
    /// are not deliveries. Returns the response when the status is in
    /// `accepted`; otherwise an [`ProtocolError::UnexpectedStatus`] carrying
    /// the mapped reason and whatever detail the body offered.
    pub fn request(
        &self,
        method: Method,
        request: &HttpRequest,
        accepted: &[u16],
    ) -> Result<HttpResponse, SendError> {
        let response = self.transport.execute(method, request)?;
        if accepted.contains(&response.status) {
            return Ok(response);
        }

        Err(ProtocolError::UnexpectedStatus {
            status: response.status,
            reason: self.status_reason(response.status).to_string(),
            detail: extract_error_detail(&response.text),
        }
        .into())
    }

    /// Log and count the outcome of one delivery; `true` on success.
    pub fn settle<T>(&self, outcome: Result<T, SendError>, recipient: Option<&str>) -> bool {
        match outcome {
            Ok(_) => {
                tracing::info!(
                    service = self.service,
                    recipient = recipient.unwrap_or("-"),
                    "notification delivered"
                );
                metrics::counter!(
                    crate::metrics::NOTIFICATIONS_SENT,
                    "service" => self.service
                )
                .increment(1);
                true
            }
            Err(e) => {
                let detail = match &e {
                    SendError::Protocol(ProtocolError::UnexpectedStatus { detail, .. }) => {
                        detail.clone()
                    }
                    _ => None,
                };
                tracing::warn!(
                    service = self.service,
                    recipient = recipient.unwrap_or("-"),
                    error = %e,
                    detail = detail.as_deref().unwrap_or(""),
                    "failed to deliver notification"
                );
                metrics::counter!(
                    crate::metrics::NOTIFY_ERRORS,
                    "service" => self.service,
                    "error_type" => e.kind()
                )
                .increment(1);
                false
            }
        }
    }
}

/// Address of a self-hosted service: `[user[:password]@]host[:port][/path]`.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub secure: bool,
    pub host: String,
    pub port: Option<u16>,
    /// Decoded path; encoded again whenever it is rendered.
    pub path: String,
    pub user: Option<String>,
    pub password: Option<SecretString>,
}

impl Endpoint {
    pub fn from_url(url: &ServiceUrl) -> Self {
        Self {
            secure: url.secure,
            host: url.host.clone(),
            port: url.port,
            path: url.fullpath.clone(),
            user: url.user.clone(),
            password: url.password.clone().map(SecretString::new),
        }
    }

    /// `http(s)://host[:port]`
    pub fn origin(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        match self.port {
            Some(port) => format!("{}://{}:{}", scheme, self.host, port),
            None => format!("{}://{}", scheme, self.host),
        }
    }

    /// Origin followed by the configured path.
    pub fn url(&self) -> String {
        format!("{}{}", self.origin(), encode_path(&self.path))
    }

    /// Attach Basic credentials when a user is configured.
    pub fn authorize(&self, request: HttpRequest) -> HttpRequest {
        match &self.user {
            Some(user) => request.basic_auth(
                user.clone(),
                self.password.as_ref().map(|p| p.expose().to_string()),
            ),
            None => request,
        }
    }

    /// Identifier form under `scheme` (plain) or `scheme` + "s" (TLS).
    pub fn identifier(&self, scheme: &str, query: &str) -> String {
        let port = self.port.map(|p| format!(":{}", p)).unwrap_or_default();
        format!(
            "{}{}://{}{}{}{}{}",
            scheme,
            if self.secure { "s" } else { "" },
            build_auth(
                self.user.as_deref(),
                self.password.as_ref().map(SecretString::expose)
            ),
            self.host,
            port,
            encode_path(&self.path),
            query
        )
    }
}

/// Best-effort error message from a JSON response body.
///
/// Looks at `description`, `message`, `error` and `errors[0].message`;
/// bodies that are not JSON or carry none of these yield `None`.
pub fn extract_error_detail(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    let as_text = |v: &serde_json::Value| match v {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Object(map) => map
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string),
        _ => None,
    };

    ["description", "message", "error"]
        .iter()
        .filter_map(|key| value.get(key))
        .find_map(as_text)
        .or_else(|| {
            value
                .get("errors")?
                .get(0)?
                .get("message")?
                .as_str()
                .map(str::to_string)
        })
}

/// Escape `&`, `<` and `>`.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape text for inclusion in an XML element or attribute.
pub fn escape_xml(text: &str) -> String {
    escape_html(text).replace('"', "&quot;").replace('\'', "&apos;")
}

/// Keep at most `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
