//! In-memory transport for notifier tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::asset::Asset;
use crate::error::TransportError;
use crate::notify::base::NotifierContext;
use crate::transport::{HttpRequest, HttpResponse, Method, Transport};

/// What the mock answers to one request.
#[derive(Debug, Clone)]
pub enum Reply {
    Respond(u16, String),
    Fail(TransportError),
}

impl Reply {
    pub fn status(status: u16) -> Self {
        Reply::Respond(status, String::new())
    }

    pub fn respond(status: u16, body: &str) -> Self {
        Reply::Respond(status, body.to_string())
    }
}

/// Records every request and answers from a queue, then a default.
#[derive(Debug)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Reply>>,
    default: Mutex<Reply>,
    requests: Mutex<Vec<(Method, HttpRequest)>>,
}

impl MockTransport {
    /// Answers 200 with an empty body unless told otherwise.
    pub fn new() -> Arc<Self> {
        Self::with_default(Reply::status(200))
    }

    pub fn with_default(default: Reply) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            default: Mutex::new(default),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Every request fails with a connection error.
    pub fn unreachable() -> Arc<Self> {
        Self::with_default(Reply::Fail(TransportError::Connect(
            "connection refused".to_string(),
        )))
    }

    /// Queue a reply for the next unanswered request.
    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn set_default(&self, reply: Reply) {
        *self.default.lock().unwrap() = reply;
    }

    pub fn requests(&self) -> Vec<(Method, HttpRequest)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<(Method, HttpRequest)> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Transport for MockTransport {
    fn execute(
        &self,
        method: Method,
        request: &HttpRequest,
    ) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push((method, request.clone()));
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default.lock().unwrap().clone());
        match reply {
            Reply::Respond(status, text) => Ok(HttpResponse { status, text }),
            Reply::Fail(e) => Err(e),
        }
    }
}

/// Context with default assets, the given mock and no throttling.
pub fn context(transport: &Arc<MockTransport>) -> NotifierContext {
    let transport: Arc<dyn Transport> = transport.clone();
    NotifierContext::new(Arc::new(Asset::default()), transport)
        .with_throttle_interval(Duration::ZERO)
}
