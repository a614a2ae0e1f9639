//! Picks the one theme that should be on screen.
//!
//! Resolution is a pure function of the theme list, the mode and the day,
//! so the engine can call it on every read instead of caching a result.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::record::{MonthDay, ThemeRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Explicit activation first, then seasonal date matching.
    #[default]
    Auto,
    /// Explicit activation only.
    Manual,
    /// Never theme.
    Off,
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ThemeMode::Auto => "auto",
            ThemeMode::Manual => "manual",
            ThemeMode::Off => "off",
        };
        f.write_str(s)
    }
}

impl FromStr for ThemeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(ThemeMode::Auto),
            "manual" => Ok(ThemeMode::Manual),
            "off" => Ok(ThemeMode::Off),
            other => Err(format!("Unknown theme mode: {}", other)),
        }
    }
}

/// Select at most one theme.
///
/// An explicitly active record beats any date match. If several records are
/// flagged active the first one in list order is returned.
pub fn resolve_active(themes: &[ThemeRecord], mode: ThemeMode, today: MonthDay) -> Option<&ThemeRecord> {
    if mode == ThemeMode::Off {
        return None;
    }

    if let Some(active) = themes.iter().find(|t| t.is_active) {
        return Some(active);
    }

    if mode == ThemeMode::Auto {
        return themes.iter().find(|t| match t.season() {
            Some((from, to)) => today.within(from, to),
            None => false,
        });
    }

    None
}
