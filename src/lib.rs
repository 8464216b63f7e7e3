// src/lib.rs
//! herald - one notification, many chat, push and webhook services.

pub mod asset;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod identifier;
pub mod metrics;
pub mod notify;
pub mod throttle;
pub mod transport;

// Re-export commonly used types
pub use asset::Asset;
pub use cli::LogFormat;
pub use dispatch::Dispatcher;
pub use error::{ConfigError, ProtocolError, SendError, TransportError, ValidationError};
pub use identifier::ServiceUrl;
pub use metrics::register_metric_descriptions;
pub use notify::{
    ImageSize, Notification, Notifier, NotifierBase, NotifierContext, NotifyFormat, NotifyType,
    Priority, Registry,
};
pub use throttle::Throttle;
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
