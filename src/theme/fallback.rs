use std::collections::BTreeMap;

use super::record::{
    CssVariables, LowPowerHint, ModeVariables, MonthDay, ParticleConfig, Range, ThemeAssets,
    ThemeRecord,
};
use crate::particles::ParticleKind;
use crate::seasonal::SEASONAL_CAMPAIGN;

fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Built-in themes used whenever the backing table cannot be read.
/// Neither is explicitly active, so only the seasonal one can auto-apply.
pub fn fallback_themes() -> Vec<ThemeRecord> {
    vec![
        ThemeRecord {
            id: "fallback-default".to_string(),
            name: "Default".to_string(),
            slug: "default".to_string(),
            description: Some("Built-in catalog palette".to_string()),
            is_active: false,
            is_seasonal: false,
            active_from: None,
            active_to: None,
            css_variables: CssVariables::Split(ModeVariables {
                light: vars(&[
                    ("--primary", "#6366f1"),
                    ("--background", "#ffffff"),
                    ("--foreground", "#0f172a"),
                ]),
                dark: vars(&[
                    ("--primary", "#818cf8"),
                    ("--background", "#0b1020"),
                    ("--foreground", "#e2e8f0"),
                ]),
            }),
            particle_config: None,
            assets: None,
        },
        ThemeRecord {
            id: "fallback-winter".to_string(),
            name: "Winter Holidays".to_string(),
            slug: "winter-holidays".to_string(),
            description: Some("Snowfall and festive accents".to_string()),
            is_active: false,
            is_seasonal: true,
            active_from: MonthDay::new(12, 1),
            active_to: MonthDay::new(1, 6),
            css_variables: CssVariables::Split(ModeVariables {
                light: vars(&[("--primary", "#c0392b"), ("--accent", "#1e8449")]),
                dark: vars(&[("--primary", "#e74c3c"), ("--accent", "#27ae60")]),
            }),
            particle_config: Some(ParticleConfig {
                kind: ParticleKind::Snow,
                count: SEASONAL_CAMPAIGN.particles.full_count,
                speed: Range::new(0.5, 1.5),
                wind: Range::new(-0.5, 0.5),
                colors: vec!["#ffffff".to_string(), "#e8f4ff".to_string()],
                size: None,
                low_power: Some(LowPowerHint {
                    count: SEASONAL_CAMPAIGN.particles.low_power_count,
                }),
            }),
            assets: Some(ThemeAssets {
                logo: Some(SEASONAL_CAMPAIGN.assets.logo.to_string()),
                home_avatar: Some(SEASONAL_CAMPAIGN.assets.home_avatar.to_string()),
                preview_image: None,
            }),
        },
    ]
}
