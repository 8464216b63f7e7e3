//! Application identity and notification imagery.
//!
//! Notifiers that can show an icon ask the shared [`Asset`] for the image
//! matching a notification type and size. URLs and file paths are built
//! from minijinja masks with three variables: `theme`, `type` and `xy`.
//!
//! ```text
//! http://nuxref.com/apprise/themes/{{ theme }}/apprise-{{ type }}-{{ xy }}.png
//! ```
//!
//! A missing mask, a render failure or (for paths) a file that does not
//! exist all yield `None`; imagery never fails a send.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use minijinja::{Environment, UndefinedBehavior, context};

use crate::notify::{ImageSize, NotifyType};

pub const DEFAULT_APP_ID: &str = "Herald";
pub const DEFAULT_APP_DESC: &str = "Herald Notifications";
pub const DEFAULT_THEME: &str = "default";
pub const DEFAULT_IMAGE_URL_MASK: &str =
    "http://nuxref.com/apprise/themes/{{ theme }}/apprise-{{ type }}-{{ xy }}.png";
pub const DEFAULT_IMAGE_URL_LOGO: &str =
    "http://nuxref.com/apprise/themes/{{ theme }}/apprise-logo.png";

/// Shared, read-only application assets.
pub struct Asset {
    pub app_id: String,
    pub app_desc: String,
    pub app_url: Option<String>,
    pub theme: String,
    pub image_url_mask: Option<String>,
    pub image_url_logo: Option<String>,
    pub image_path_mask: Option<String>,
    env: Environment<'static>,
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Asset")
            .field("app_id", &self.app_id)
            .field("theme", &self.theme)
            .field("image_url_mask", &self.image_url_mask)
            .field("image_path_mask", &self.image_path_mask)
            .finish()
    }
}

impl Default for Asset {
    fn default() -> Self {
        Self::new(
            DEFAULT_APP_ID,
            DEFAULT_APP_DESC,
            None,
            DEFAULT_THEME,
            Some(DEFAULT_IMAGE_URL_MASK.to_string()),
            Some(DEFAULT_IMAGE_URL_LOGO.to_string()),
            None,
        )
    }
}

impl Asset {
    pub fn new(
        app_id: impl Into<String>,
        app_desc: impl Into<String>,
        app_url: Option<String>,
        theme: impl Into<String>,
        image_url_mask: Option<String>,
        image_url_logo: Option<String>,
        image_path_mask: Option<String>,
    ) -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        Self {
            app_id: app_id.into(),
            app_desc: app_desc.into(),
            app_url,
            theme: theme.into(),
            image_url_mask,
            image_url_logo,
            image_path_mask,
            env,
        }
    }

    /// Default identity with every image source turned off.
    pub fn disabled() -> Self {
        Self::new(
            DEFAULT_APP_ID,
            DEFAULT_APP_DESC,
            None,
            DEFAULT_THEME,
            None,
            None,
            None,
        )
    }

    /// URL of the image for `notify_type` at `size`, if a URL mask is set.
    pub fn image_url(&self, notify_type: NotifyType, size: ImageSize) -> Option<String> {
        let mask = self.image_url_mask.as_deref()?;
        self.render(mask, notify_type, size)
    }

    /// Path of the image for `notify_type` at `size`; only existing files.
    pub fn image_path(&self, notify_type: NotifyType, size: ImageSize) -> Option<PathBuf> {
        let mask = self.image_path_mask.as_deref()?;
        let path = PathBuf::from(self.render(mask, notify_type, size)?);
        if path.is_file() {
            Some(path)
        } else {
            tracing::debug!(path = %path.display(), "image file not found");
            None
        }
    }

    /// Application logo URL.
    pub fn image_url_logo(&self) -> Option<String> {
        let mask = self.image_url_logo.as_deref()?;
        match self.env.render_str(mask, context! { theme => &self.theme }) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(error = %e, "failed to render logo mask");
                None
            }
        }
    }

    /// Hex colour associated with a notification type.
    pub fn color(&self, notify_type: NotifyType) -> &'static str {
        match notify_type {
            NotifyType::Info => "#3AA3E3",
            NotifyType::Success => "#3AA337",
            NotifyType::Warning => "#CACF29",
            NotifyType::Failure => "#A32037",
        }
    }

    /// Colour as an integer (Discord embeds).
    pub fn color_int(&self, notify_type: NotifyType) -> u32 {
        u32::from_str_radix(self.color(notify_type).trim_start_matches('#'), 16).unwrap_or(0)
    }

    fn render(&self, mask: &str, notify_type: NotifyType, size: ImageSize) -> Option<String> {
        let ctx = BTreeMap::from([
            ("theme", self.theme.as_str()),
            ("type", notify_type.as_str()),
            ("xy", size.as_str()),
        ]);
        match self.env.render_str(mask, ctx) {
            Ok(rendered) => Some(rendered),
            Err(e) => {
                tracing::warn!(error = %e, "failed to render image mask");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_image_url() {
        let asset = Asset::default();
        assert_eq!(
            asset.image_url(NotifyType::Warning, ImageSize::XY72).as_deref(),
            Some("http://nuxref.com/apprise/themes/default/apprise-warning-72x72.png")
        );
        assert_eq!(
            asset.image_url_logo().as_deref(),
            Some("http://nuxref.com/apprise/themes/default/apprise-logo.png")
        );
    }

    #[test]
    fn disabled_asset_has_no_images() {
        let asset = Asset::disabled();
        assert!(asset.image_url(NotifyType::Info, ImageSize::XY256).is_none());
        assert!(asset.image_path(NotifyType::Info, ImageSize::XY256).is_none());
        assert!(asset.image_url_logo().is_none());
    }

    #[test]
    fn bad_mask_yields_none() {
        let mut asset = Asset::default();
        asset.image_url_mask = Some("http://x/{{ unknown_var }}.png".to_string());
        assert!(asset.image_url(NotifyType::Info, ImageSize::XY72).is_none());

        asset.image_url_mask = Some("http://x/{{ theme".to_string());
        assert!(asset.image_url(NotifyType::Info, ImageSize::XY72).is_none());
    }

    #[test]
    fn image_path_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("herald-failure-256x256.png");
        let mut file = std::fs::File::create(&existing).unwrap();
        file.write_all(b"\x89PNG").unwrap();

        let mut asset = Asset::default();
        asset.image_path_mask = Some(format!(
            "{}/herald-{{{{ type }}}}-{{{{ xy }}}}.png",
            dir.path().display()
        ));

        assert_eq!(
            asset.image_path(NotifyType::Failure, ImageSize::XY256),
            Some(existing)
        );
        assert!(asset.image_path(NotifyType::Info, ImageSize::XY256).is_none());
    }

    #[test]
    fn colors() {
        let asset = Asset::default();
        assert_eq!(asset.color(NotifyType::Info), "#3AA3E3");
        assert_eq!(asset.color(NotifyType::Failure), "#A32037");
        assert_eq!(asset.color_int(NotifyType::Success), 0x3AA337);
    }
}
