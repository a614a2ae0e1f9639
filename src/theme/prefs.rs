//! Theme state remembered on the device between sessions.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::apply::AppliedTheme;
use super::resolve::ThemeMode;
use crate::config::{load_json_config, save_json_config};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThemePrefs {
    #[serde(default)]
    pub mode: ThemeMode,
    /// Slug of the theme that was on screen last time.
    #[serde(default)]
    pub active_slug: Option<String>,
    /// Class and variables last applied, for first paint before themes load.
    #[serde(default)]
    pub css_snapshot: Option<AppliedTheme>,
}

impl ThemePrefs {
    pub fn load(path: &Path) -> Self {
        load_json_config(path, "Theme")
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        save_json_config(path, self, "Theme")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_to_auto_without_snapshot() {
        let tmp = TempDir::new().unwrap();
        let prefs = ThemePrefs::load(&tmp.path().join("theme_prefs.json"));
        assert_eq!(prefs.mode, ThemeMode::Auto);
        assert!(prefs.css_snapshot.is_none());
    }

    #[test]
    fn mode_is_stored_lowercase() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("theme_prefs.json");
        let prefs = ThemePrefs {
            mode: ThemeMode::Off,
            ..ThemePrefs::default()
        };
        prefs.save(&path).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"off\""), "unexpected file: {}", raw);
        assert_eq!(ThemePrefs::load(&path).mode, ThemeMode::Off);
    }
}
