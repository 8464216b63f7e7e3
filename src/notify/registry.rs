//! Scheme registry: turns identifiers into notifiers.

use std::sync::Arc;
use std::time::Duration;

use crate::asset::Asset;
use crate::error::ValidationError;
use crate::identifier::ServiceUrl;
use crate::throttle::DEFAULT_THROTTLE_INTERVAL;
use crate::transport::Transport;

use super::base::NotifierContext;
use super::{
    Notifier, boxcar, discord, faast, ifttt, join, json, kodi, mattermost, nma, prowl, pushalot,
    pushbullet, pushjet, pushover, rocketchat, slack, telegram, toasty, xml,
};

type ParseFn = fn(&str) -> Option<ServiceUrl>;
type BuildFn = fn(&ServiceUrl, &NotifierContext) -> Result<Box<dyn Notifier>, ValidationError>;

/// One supported service and the schemes that select it.
#[derive(Clone, Copy)]
pub struct ServiceEntry {
    pub name: &'static str,
    pub schemes: &'static [&'static str],
    parse: ParseFn,
    build: BuildFn,
}

impl std::fmt::Debug for ServiceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceEntry")
            .field("name", &self.name)
            .field("schemes", &self.schemes)
            .finish()
    }
}

const fn entry(name: &'static str, schemes: &'static [&'static str], build: BuildFn) -> ServiceEntry {
    ServiceEntry {
        name,
        schemes,
        parse: ServiceUrl::parse,
        build,
    }
}

static SERVICES: &[ServiceEntry] = &[
    entry("Boxcar", &["boxcar"], boxcar::build),
    entry("Discord", &["discord"], discord::build),
    entry("Faast", &["faast"], faast::build),
    entry("IFTTT", &["ifttt"], ifttt::build),
    entry("Join", &["join"], join::build),
    entry("JSON", &["json", "jsons"], json::build),
    entry("Kodi", &["kodi", "kodis", "xbmc", "xbmcs"], kodi::build),
    entry("Mattermost", &["mmost", "mmosts"], mattermost::build),
    entry("NotifyMyAndroid", &["nma"], nma::build),
    entry("Prowl", &["prowl"], prowl::build),
    entry("Pushalot", &["palot"], pushalot::build),
    entry("PushBullet", &["pbul"], pushbullet::build),
    entry("Pushjet", &["pjet", "pjets"], pushjet::build),
    entry("Pushover", &["pover"], pushover::build),
    entry("Rocket.Chat", &["rocket", "rockets"], rocketchat::build),
    entry("Slack", &["slack"], slack::build),
    ServiceEntry {
        name: "Telegram",
        schemes: &["tgram"],
        parse: telegram::parse_url,
        build: telegram::build,
    },
    entry("Toasty", &["toasty"], toasty::build),
    entry("XML", &["xml", "xmls"], xml::build),
];

/// Builds notifiers from identifiers.
///
/// Every notifier it builds shares the registry's transport and starts
/// with its throttle interval and image policy.
#[derive(Clone)]
pub struct Registry {
    transport: Arc<dyn Transport>,
    throttle_interval: Duration,
    include_image: bool,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("throttle_interval", &self.throttle_interval)
            .field("include_image", &self.include_image)
            .field("services", &SERVICES.len())
            .finish()
    }
}

impl Registry {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
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

    pub fn throttle_interval(&self) -> Duration {
        self.throttle_interval
    }

    /// Every supported scheme, plaintext and TLS aliases included.
    pub fn schemes() -> impl Iterator<Item = &'static str> {
        SERVICES.iter().flat_map(|s| s.schemes.iter().copied())
    }

    pub fn services() -> &'static [ServiceEntry] {
        SERVICES
    }

    /// Whether `scheme` (any case) selects a service.
    pub fn is_supported(scheme: &str) -> bool {
        Self::lookup(scheme).is_some()
    }

    fn lookup(scheme: &str) -> Option<&'static ServiceEntry> {
        let scheme = scheme.to_ascii_lowercase();
        SERVICES
            .iter()
            .find(|s| s.schemes.contains(&scheme.as_str()))
    }

    /// Build the notifier an identifier describes.
    ///
    /// * `Ok(None)` - unknown scheme or an identifier that does not parse
    /// * `Err(_)` - the service rejected its configuration (only when
    ///   `suppress` is false; otherwise the error is logged and `Ok(None)`
    ///   returned)
    pub fn instantiate(
        &self,
        identifier: &str,
        asset: Arc<Asset>,
        suppress: bool,
    ) -> Result<Option<Box<dyn Notifier>>, ValidationError> {
        let Some((scheme, _)) = identifier.trim().split_once("://") else {
            tracing::warn!("identifier has no scheme, ignoring");
            return Ok(None);
        };
        let Some(service) = Self::lookup(scheme) else {
            tracing::warn!(scheme = %scheme, "unsupported scheme, ignoring");
            return Ok(None);
        };
        let Some(url) = (service.parse)(identifier) else {
            tracing::warn!(
                service = service.name,
                scheme = %scheme,
                "malformed identifier, ignoring"
            );
            return Ok(None);
        };

        let ctx = NotifierContext::new(asset, self.transport.clone())
            .with_throttle_interval(self.throttle_interval)
            .with_include_image(self.include_image);

        match (service.build)(&url, &ctx) {
            Ok(notifier) => {
                tracing::debug!(service = service.name, "notifier configured");
                Ok(Some(notifier))
            }
            Err(e) => {
                metrics::counter!(
                    crate::metrics::NOTIFIER_CONFIG_ERRORS,
                    "scheme" => url.scheme.clone()
                )
                .increment(1);
                if suppress {
                    tracing::warn!(
                        service = service.name,
                        error = %e,
                        "invalid notifier configuration, ignoring"
                    );
                    Ok(None)
                } else {
                    Err(e)
                }
            }
        }
    }
}
