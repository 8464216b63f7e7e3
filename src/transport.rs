//! HTTP transport abstraction.
//!
//! Notifiers describe their request as an [`HttpRequest`] and hand it to a
//! [`Transport`]. The crate ships [`ReqwestTransport`], a thin wrapper over
//! `reqwest::blocking`; tests substitute an in-memory implementation.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, multipart};
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;

use crate::error::{SendError, TransportError};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = concat!("herald/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A file attached to a multipart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub field: String,
    pub path: PathBuf,
    pub mime: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
    Raw {
        content_type: String,
        text: String,
    },
    Multipart {
        fields: Vec<(String, String)>,
        file: Option<FileUpload>,
    },
}

/// One outbound request.
///
/// URLs routinely embed API keys, so `Debug` only shows the body kind.
#[derive(Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub basic_auth: Option<(String, Option<String>)>,
    pub body: RequestBody,
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match &self.body {
            RequestBody::Empty => "empty",
            RequestBody::Json(_) => "json",
            RequestBody::Form(_) => "form",
            RequestBody::Raw { .. } => "raw",
            RequestBody::Multipart { .. } => "multipart",
        };
        f.debug_struct("HttpRequest")
            .field("url", &"[REDACTED]")
            .field("headers", &self.headers.len())
            .field("basic_auth", &self.basic_auth.is_some())
            .field("body", &body)
            .finish()
    }
}

impl HttpRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            basic_auth: None,
            body: RequestBody::Empty,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn basic_auth(mut self, user: impl Into<String>, password: Option<String>) -> Self {
        self.basic_auth = Some((user.into(), password));
        self
    }

    /// Serialize `payload` as the JSON body.
    pub fn json<T: Serialize>(mut self, payload: &T) -> Result<Self, SendError> {
        self.body = RequestBody::Json(serde_json::to_value(payload)?);
        Ok(self)
    }

    pub fn form<K, V>(mut self, fields: Vec<(K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = RequestBody::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn raw(mut self, content_type: impl Into<String>, text: impl Into<String>) -> Self {
        self.body = RequestBody::Raw {
            content_type: content_type.into(),
            text: text.into(),
        };
        self
    }

    pub fn multipart(mut self, fields: Vec<(String, String)>, file: Option<FileUpload>) -> Self {
        self.body = RequestBody::Multipart { fields, file };
        self
    }

    /// Value of the first header called `name` (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Value of a form field, if the body is a form or multipart.
    pub fn form_value(&self, name: &str) -> Option<&str> {
        let fields = match &self.body {
            RequestBody::Form(fields) => fields,
            RequestBody::Multipart { fields, .. } => fields,
            _ => return None,
        };
        fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The JSON body, if any.
    pub fn json_body(&self) -> Option<&serde_json::Value> {
        match &self.body {
            RequestBody::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// What came back from the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub text: String,
}

impl HttpResponse {
    pub fn new(status: u16, text: impl Into<String>) -> Self {
        Self {
            status,
            text: text.into(),
        }
    }

    /// Body parsed as JSON; `None` when it is not JSON.
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.text).ok()
    }
}

/// Blocking HTTP client used by every notifier.
///
/// Implementations must be thread-safe; one transport is shared by all
/// notifiers built from the same registry.
pub trait Transport: Send + Sync {
    fn execute(&self, method: Method, request: &HttpRequest)
    -> Result<HttpResponse, TransportError>;

    fn post(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.execute(Method::Post, request)
    }

    fn get(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.execute(Method::Get, request)
    }
}

/// [`Transport`] backed by `reqwest::blocking`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(classify)?;
        Ok(Self { client })
    }

    pub fn with_defaults() -> Result<Self, TransportError> {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    fn build(&self, method: Method, request: &HttpRequest) -> Result<RequestBuilder, TransportError> {
        let mut builder = match method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some((user, password)) = &request.basic_auth {
            builder = builder.basic_auth(user, password.as_ref());
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(fields) => builder.form(fields),
            RequestBody::Raw { content_type, text } => builder
                .header(CONTENT_TYPE, content_type.as_str())
                .body(text.clone()),
            RequestBody::Multipart { fields, file } => {
                let mut form = multipart::Form::new();
                for (name, value) in fields {
                    form = form.text(name.clone(), value.clone());
                }
                if let Some(upload) = file {
                    form = form.part(upload.field.clone(), file_part(upload)?);
                }
                builder.multipart(form)
            }
        };

        Ok(builder)
    }
}

impl Transport for ReqwestTransport {
    fn execute(
        &self,
        method: Method,
        request: &HttpRequest,
    ) -> Result<HttpResponse, TransportError> {
        let response = self.build(method, request)?.send().map_err(classify)?;
        let status = response.status().as_u16();
        // An unreadable body still carries a meaningful status
        let text = response.text().unwrap_or_default();
        Ok(HttpResponse { status, text })
    }
}

fn file_part(upload: &FileUpload) -> Result<multipart::Part, TransportError> {
    let bytes = std::fs::read(&upload.path).map_err(|e| {
        TransportError::Request(format!("cannot read '{}': {}", upload.path.display(), e))
    })?;
    let file_name = upload
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    multipart::Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(&upload.mime)
        .map_err(classify)
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else if e.is_redirect() {
        TransportError::TooManyRedirects(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}
