//! Notifier trait definition.

use std::time::Duration;

use super::base::NotifierBase;
use super::{Notification, NotifyType};

/// Abstract notifier trait for delivering notifications to one service.
///
/// Implementations are built once from a validated identifier and then
/// reused. `notify` takes `&mut self`: the throttle and any session state
/// belong to one caller at a time.
///
/// # Example
///
/// ```ignore
/// use herald::notify::{Notifier, NotifyType};
///
/// let mut notifier = registry.instantiate("json://localhost", asset, false)?.unwrap();
/// if !notifier.notify("Deploy", "v1.2 is live", NotifyType::Success) {
///     eprintln!("delivery failed");
/// }
/// ```
pub trait Notifier: Send {
    /// Display name of the service (e.g. "Slack").
    fn service_name(&self) -> &'static str {
        self.base().service()
    }

    /// Scheme this instance is addressed by (e.g. "jsons").
    fn protocol(&self) -> &'static str;

    fn base(&self) -> &NotifierBase;

    fn base_mut(&mut self) -> &mut NotifierBase;

    /// Identifier that parses back into this notifier's configuration.
    fn url(&self) -> String;

    /// Deliver one notification.
    ///
    /// Returns `true` only when the service accepted it for every
    /// recipient. Failures are logged, never returned.
    fn send(&mut self, notification: &Notification) -> bool;

    /// Build a notification and send it.
    fn notify(&mut self, title: &str, body: &str, notify_type: NotifyType) -> bool {
        let span = tracing::info_span!(
            "notify",
            service = self.service_name(),
            notify_type = %notify_type
        );
        let _guard = span.enter();

        let notification = Notification::new(title, body, notify_type);
        self.send(&notification)
    }

    /// Minimum spacing between two requests of this instance.
    fn throttle_interval(&self) -> Duration {
        self.base().throttle().interval()
    }

    fn set_throttle_interval(&mut self, interval: Duration) {
        self.base_mut().throttle_mut().set_interval(interval);
    }
}

// Implement Debug for dyn Notifier so boxed notifiers can be inspected
impl std::fmt::Debug for dyn Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("service", &self.service_name())
            .field("protocol", &self.protocol())
            .finish()
    }
}
