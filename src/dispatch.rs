//! Broadcast one notification to many services.

use std::sync::Arc;

use crate::asset::Asset;
use crate::notify::{Notifier, NotifyType, Registry};

/// Holds configured notifiers and sends every notification to all of them.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use herald::{Asset, Dispatcher, NotifyType, Registry, ReqwestTransport};
///
/// let transport = Arc::new(ReqwestTransport::with_defaults()?);
/// let mut dispatcher = Dispatcher::new(Registry::new(transport), Arc::new(Asset::default()));
/// dispatcher.add("json://localhost:8080/hook");
/// dispatcher.notify("Backup", "nightly backup finished", NotifyType::Success);
/// # Ok::<(), herald::TransportError>(())
/// ```
#[derive(Debug)]
pub struct Dispatcher {
    registry: Registry,
    asset: Arc<Asset>,
    notifiers: Vec<Box<dyn Notifier>>,
}

impl Dispatcher {
    pub fn new(registry: Registry, asset: Arc<Asset>) -> Self {
        Self {
            registry,
            asset,
            notifiers: Vec::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn asset(&self) -> &Arc<Asset> {
        &self.asset
    }

    /// Build and keep the notifier for `identifier`.
    ///
    /// Unknown, malformed or invalid identifiers are logged and skipped;
    /// the return value says whether a notifier was added.
    pub fn add(&mut self, identifier: &str) -> bool {
        match self
            .registry
            .instantiate(identifier, self.asset.clone(), true)
        {
            Ok(Some(notifier)) => {
                tracing::debug!(service = notifier.service_name(), "notifier added");
                self.notifiers.push(notifier);
                true
            }
            Ok(None) | Err(_) => {
                tracing::warn!(
                    scheme = identifier.split("://").next().unwrap_or_default(),
                    "skipping identifier"
                );
                false
            }
        }
    }

    /// Keep an already built notifier.
    pub fn add_notifier(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    pub fn clear(&mut self) {
        self.notifiers.clear();
    }

    /// Send to every notifier in insertion order.
    ///
    /// Every notifier is tried even after a failure. `true` only when all
    /// of them delivered; `false` when there is nothing to send to.
    pub fn notify(&mut self, title: &str, body: &str, notify_type: NotifyType) -> bool {
        if self.notifiers.is_empty() {
            tracing::warn!("no notifiers configured, nothing sent");
            return false;
        }

        let mut delivered = 0;
        for notifier in &mut self.notifiers {
            if notifier.notify(title, body, notify_type) {
                delivered += 1;
            }
        }

        let total = self.notifiers.len();
        if delivered == total {
            tracing::info!(total, "notification dispatched");
            true
        } else {
            tracing::warn!(delivered, total, "notification partially dispatched");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::notify::testing::{MockTransport, Reply};
    use crate::transport::Transport;

    fn dispatcher(transport: &Arc<MockTransport>) -> Dispatcher {
        let shared: Arc<dyn Transport> = transport.clone();
        let registry = Registry::new(shared).with_throttle_interval(Duration::ZERO);
        Dispatcher::new(registry, Arc::new(Asset::default()))
    }

    #[test]
    fn add_skips_bad_identifiers() {
        let transport = MockTransport::new();
        let mut dispatcher = dispatcher(&transport);

        assert!(dispatcher.add("json://localhost"));
        assert!(dispatcher.add("xml://localhost"));
        assert!(!dispatcher.add("invalid://localhost"));
        assert!(!dispatcher.add("mmost://localhost"));
        assert!(!dispatcher.add("garbage"));

        assert_eq!(dispatcher.len(), 2);
        dispatcher.clear();
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn empty_dispatcher_reports_failure() {
        let transport = MockTransport::new();
        let mut dispatcher = dispatcher(&transport);
        assert!(!dispatcher.notify("title", "body", NotifyType::Info));
        assert_eq!(transport.count(), 0);
    }

    #[test]
    fn all_notifiers_are_tried() {
        let transport = MockTransport::new();
        let mut dispatcher = dispatcher(&transport);
        dispatcher.add("json://first");
        dispatcher.add("json://second");
        dispatcher.add("json://third");

        assert!(dispatcher.notify("title", "body", NotifyType::Info));
        assert_eq!(transport.count(), 3);

        transport.push(Reply::status(500));
        assert!(!dispatcher.notify("title", "body", NotifyType::Info));
        assert_eq!(transport.count(), 6);

        let urls: Vec<String> = transport.requests().iter().map(|(_, r)| r.url.clone()).collect();
        assert_eq!(urls[3], "http://first/");
        assert_eq!(urls[5], "http://third/");
    }

    #[test]
    fn prebuilt_notifiers_are_accepted() {
        let transport = MockTransport::new();
        let mut dispatcher = dispatcher(&transport);
        let notifier = dispatcher
            .registry()
            .instantiate("xml://localhost", dispatcher.asset().clone(), false)
            .unwrap()
            .unwrap();
        dispatcher.add_notifier(notifier);

        assert_eq!(dispatcher.len(), 1);
        assert!(dispatcher.notify("title", "body", NotifyType::Warning));
    }
}
