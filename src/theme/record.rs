use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::particles::ParticleKind;

/// A theme row as stored in the backing `themes` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeRecord {
    pub id: String,
    pub name: String,
    /// Unique human key, also used for the root CSS class.
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,

    /// Explicit activation. Expected on at most one record.
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_seasonal: bool,
    #[serde(default)]
    pub active_from: Option<MonthDay>,
    #[serde(default)]
    pub active_to: Option<MonthDay>,

    #[serde(default)]
    pub css_variables: CssVariables,
    #[serde(default)]
    pub particle_config: Option<ParticleConfig>,
    #[serde(default)]
    pub assets: Option<ThemeAssets>,
}

impl ThemeRecord {
    /// The seasonal window, if this record is seasonal and both ends are set.
    pub fn season(&self) -> Option<(MonthDay, MonthDay)> {
        if !self.is_seasonal {
            return None;
        }
        Some((self.active_from?, self.active_to?))
    }

    /// CSS class placed on the document root while this theme is applied.
    pub fn css_class(&self) -> String {
        format!("theme-{}", self.slug)
    }
}

// ── Month/day ──────────────────────────────────────────

/// Year-agnostic calendar day. Orders by month, then day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthDay {
    month: u32,
    day: u32,
}

const DAYS_IN_MONTH: [u32; 12] = [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

impl MonthDay {
    pub fn new(month: u32, day: u32) -> Option<Self> {
        if !(1..=12).contains(&month) {
            return None;
        }
        if day == 0 || day > DAYS_IN_MONTH[(month - 1) as usize] {
            return None;
        }
        Some(Self { month, day })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn from_date<D: chrono::Datelike>(date: &D) -> Self {
        Self {
            month: date.month(),
            day: date.day(),
        }
    }

    pub fn today() -> Self {
        Self::from_date(&chrono::Local::now().date_naive())
    }

    /// Inclusive range check. `start > end` wraps across new year.
    pub fn within(&self, start: MonthDay, end: MonthDay) -> bool {
        if start <= end {
            start <= *self && *self <= end
        } else {
            *self >= start || *self <= end
        }
    }
}

impl fmt::Display for MonthDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.day)
    }
}

impl FromStr for MonthDay {
    type Err = String;

    /// Accepts `MM-DD` or a full `YYYY-MM-DD` date (the year is dropped).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parts: Vec<&str> = s.split('-').collect();
        let (month, day) = match parts.as_slice() {
            [m, d] => (*m, *d),
            [_, m, d] => (*m, *d),
            _ => return Err(format!("Invalid month-day: {}", s)),
        };
        // tolerate a trailing time component on full dates
        let day = day.split('T').next().unwrap_or(day);
        let month: u32 = month
            .parse()
            .map_err(|_| format!("Invalid month in {}", s))?;
        let day: u32 = day.parse().map_err(|_| format!("Invalid day in {}", s))?;
        MonthDay::new(month, day).ok_or_else(|| format!("Out of range month-day: {}", s))
    }
}

impl Serialize for MonthDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MonthDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ── CSS variables ──────────────────────────────────────

/// Light/dark split of CSS custom properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModeVariables {
    #[serde(default)]
    pub light: BTreeMap<String, String>,
    #[serde(default)]
    pub dark: BTreeMap<String, String>,
}

/// CSS custom properties, e.g. `{ "--accent": "#ff7aa2" }`, either one map
/// for both color modes or split by mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CssVariables {
    Split(ModeVariables),
    Flat(BTreeMap<String, String>),
}

impl Default for CssVariables {
    fn default() -> Self {
        CssVariables::Flat(BTreeMap::new())
    }
}

/// Which half of a split variable map to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Light,
    Dark,
}

impl CssVariables {
    pub fn for_mode(&self, mode: ColorMode) -> &BTreeMap<String, String> {
        match self {
            CssVariables::Split(split) => match mode {
                ColorMode::Light => &split.light,
                ColorMode::Dark => &split.dark,
            },
            CssVariables::Flat(map) => map,
        }
    }
}

// ── Particles ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Linear pick inside the range for `t` in `[0, 1)`. Tolerates reversed bounds.
    pub fn lerp(&self, t: f64) -> f64 {
        let (lo, hi) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        lo + (hi - lo) * t
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LowPowerHint {
    pub count: usize,
}

/// Particle effect descriptor attached to a theme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticleConfig {
    #[serde(rename = "type")]
    pub kind: ParticleKind,
    pub count: usize,
    pub speed: Range,
    pub wind: Range,
    #[serde(default)]
    pub colors: Vec<String>,
    /// Sprite size in pixels; per-kind default when absent.
    #[serde(default)]
    pub size: Option<Range>,
    #[serde(default)]
    pub low_power: Option<LowPowerHint>,
}

// ── Assets ─────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeAssets {
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub home_avatar: Option<String>,
    #[serde(default)]
    pub preview_image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn md(m: u32, d: u32) -> MonthDay {
        MonthDay::new(m, d).unwrap()
    }

    #[test]
    fn month_day_parses_short_and_full_forms() {
        assert_eq!("11-15".parse::<MonthDay>().unwrap(), md(11, 15));
        assert_eq!("2024-02-28".parse::<MonthDay>().unwrap(), md(2, 28));
        assert_eq!("2024-12-01T00:00:00".parse::<MonthDay>().unwrap(), md(12, 1));
        assert!("13-01".parse::<MonthDay>().is_err());
        assert!("02-30".parse::<MonthDay>().is_err());
        assert!("garbage".parse::<MonthDay>().is_err());
    }

    #[test]
    fn month_day_serializes_as_mm_dd() {
        let json = serde_json::to_string(&md(3, 7)).unwrap();
        assert_eq!(json, "\"03-07\"");
    }

    #[test]
    fn within_handles_plain_and_wrapping_ranges() {
        assert!(md(6, 15).within(md(6, 1), md(6, 30)));
        assert!(!md(7, 1).within(md(6, 1), md(6, 30)));
        assert!(md(12, 31).within(md(11, 15), md(2, 28)));
        assert!(md(1, 1).within(md(11, 15), md(2, 28)));
        assert!(!md(6, 1).within(md(11, 15), md(2, 28)));
    }

    #[test]
    fn css_variables_split_form() {
        let vars: CssVariables = serde_json::from_value(serde_json::json!({
            "light": { "--accent": "#fff" },
            "dark": { "--accent": "#000" }
        }))
        .unwrap();
        assert_eq!(vars.for_mode(ColorMode::Dark)["--accent"], "#000");
        assert_eq!(vars.for_mode(ColorMode::Light)["--accent"], "#fff");
    }

    #[test]
    fn css_variables_flat_form() {
        let vars: CssVariables =
            serde_json::from_value(serde_json::json!({ "--accent": "#f0f", "light": "x" }))
                .unwrap();
        assert!(matches!(vars, CssVariables::Flat(_)));
        assert_eq!(vars.for_mode(ColorMode::Dark)["--accent"], "#f0f");
    }

    #[test]
    fn full_record_deserializes_from_backend_row() {
        let row = serde_json::json!({
            "id": "7f3c",
            "name": "Sakura",
            "slug": "sakura",
            "is_active": false,
            "is_seasonal": true,
            "active_from": "2025-03-20",
            "active_to": "2025-04-30",
            "css_variables": { "light": { "--primary": "#ffb7c5" }, "dark": {} },
            "particle_config": {
                "type": "sakura",
                "count": 30,
                "speed": { "min": 0.5, "max": 1.2 },
                "wind": { "min": -0.3, "max": 0.6 },
                "colors": ["#ffb7c5", "#ffd1dc"],
                "lowPower": { "count": 12 }
            },
            "assets": { "logo": "https://cdn.example/sakura-logo.png", "homeAvatar": null },
            "created_at": "2025-01-01T00:00:00Z"
        });
        let theme: ThemeRecord = serde_json::from_value(row).unwrap();
        assert_eq!(theme.season(), Some((md(3, 20), md(4, 30))));
        let particles = theme.particle_config.unwrap();
        assert_eq!(particles.kind, ParticleKind::Sakura);
        assert_eq!(particles.low_power.unwrap().count, 12);
        assert_eq!(
            theme.assets.unwrap().logo.as_deref(),
            Some("https://cdn.example/sakura-logo.png")
        );
    }

    #[test]
    fn non_seasonal_record_has_no_season() {
        let row = serde_json::json!({
            "id": "1", "name": "Plain", "slug": "plain",
            "is_seasonal": false, "active_from": "01-01", "active_to": "12-31"
        });
        let theme: ThemeRecord = serde_json::from_value(row).unwrap();
        assert!(theme.season().is_none());
        assert_eq!(theme.css_class(), "theme-plain");
    }

    #[test]
    fn range_lerp_tolerates_reversed_bounds() {
        let r = Range::new(4.0, 2.0);
        assert_eq!(r.lerp(0.0), 2.0);
        assert_eq!(r.lerp(1.0), 4.0);
    }
}
