use serde::{Deserialize, Serialize};

use super::record::ThemeRecord;

/// Named image slots a theme can override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetSlot {
    Logo,
    HomeAvatar,
    PreviewImage,
}

/// Image for `slot`: the active theme's override when it has one, else `default`.
pub fn seasonal_asset(theme: Option<&ThemeRecord>, slot: AssetSlot, default: &str) -> String {
    theme
        .and_then(|t| t.assets.as_ref())
        .and_then(|assets| match slot {
            AssetSlot::Logo => assets.logo.as_deref(),
            AssetSlot::HomeAvatar => assets.home_avatar.as_deref(),
            AssetSlot::PreviewImage => assets.preview_image.as_deref(),
        })
        .filter(|url| !url.trim().is_empty())
        .unwrap_or(default)
        .to_string()
}
