//! Generic XML (SOAP) webhook notifier.
//!
//! `xml://[user[:password]@]host[:port][/path][?+Header=value]`
//! (`xmls://` for HTTPS).

use crate::error::{SendError, ValidationError};
use crate::identifier::ServiceUrl;
use crate::notify::base::{Endpoint, NotifierBase, NotifierContext, escape_xml};
use crate::notify::json::{custom_headers, headers_query};
use crate::notify::{Notification, Notifier};
use crate::transport::{HttpRequest, Method};

const SERVICE: &str = "XML";

/// Render the SOAP envelope for one notification.
pub fn render_envelope(notification: &Notification) -> String {
    format!(
        r#"<?xml version='1.0' encoding='utf-8'?>
<soapenv:Envelope
    xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"
    xmlns:xsd="http://www.w3.org/2001/XMLSchema"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
    <soapenv:Body>
        <Notification xmlns:xsi="http://nuxref.com/apprise/NotifyXML-1.0.xsd">
            <Version>1.0</Version>
            <Subject>{subject}</Subject>
            <MessageType>{message_type}</MessageType>
            <Message>{message}</Message>
        </Notification>
    </soapenv:Body>
</soapenv:Envelope>"#,
        subject = escape_xml(&notification.title),
        message_type = notification.notify_type.as_str(),
        message = escape_xml(&notification.body),
    )
}

pub struct XmlNotifier {
    base: NotifierBase,
    endpoint: Endpoint,
    headers: Vec<(String, String)>,
}

impl XmlNotifier {
    pub fn new(
        ctx: &NotifierContext,
        endpoint: Endpoint,
        headers: Vec<(String, String)>,
    ) -> Result<Self, ValidationError> {
        if endpoint.host.is_empty() {
            return Err(ValidationError::Missing {
                service: SERVICE,
                field: "host",
            });
        }
        Ok(Self {
            base: NotifierBase::new(SERVICE, ctx),
            endpoint,
            headers,
        })
    }

    pub fn from_url(url: &ServiceUrl, ctx: &NotifierContext) -> Result<Self, ValidationError> {
        Self::new(ctx, Endpoint::from_url(url), custom_headers(url))
    }

    fn deliver(&mut self, notification: &Notification) -> Result<(), SendError> {
        let mut request = self
            .endpoint
            .authorize(HttpRequest::new(self.endpoint.url()))
            .raw("application/xml", render_envelope(notification));
        for (name, value) in &self.headers {
            request = request.header(name.clone(), value.clone());
        }

        self.base.execute(Method::Post, &request, &[200])?;
        Ok(())
    }
}

impl Notifier for XmlNotifier {
    fn protocol(&self) -> &'static str {
        if self.endpoint.secure { "xmls" } else { "xml" }
    }

    fn base(&self) -> &NotifierBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NotifierBase {
        &mut self.base
    }

    fn url(&self) -> String {
        self.endpoint.identifier("xml", &headers_query(&self.headers))
    }

    fn send(&mut self, notification: &Notification) -> bool {
        let outcome = self.deliver(notification);
        self.base.settle(outcome, None)
    }
}

impl std::fmt::Debug for XmlNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmlNotifier")
            .field("endpoint", &self.endpoint)
            .field("headers", &self.headers.len())
            .finish()
    }
}

pub(crate) fn build(
    url: &ServiceUrl,
    ctx: &NotifierContext,
) -> Result<Box<dyn Notifier>, ValidationError> {
    Ok(Box::new(XmlNotifier::from_url(url, ctx)?))
}
