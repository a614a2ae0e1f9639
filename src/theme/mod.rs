pub mod apply;
pub mod assets;
pub mod engine;
pub mod fallback;
pub mod prefs;
pub mod record;
pub mod resolve;
pub mod store;

pub use apply::{plan_application, RootStyle, StyleTarget, ThemeHost, ThemePatch};
pub use assets::{seasonal_asset, AssetSlot};
pub use engine::ThemeEngine;
pub use record::{ColorMode, MonthDay, ParticleConfig, ThemeRecord};
pub use resolve::{resolve_active, ThemeMode};
pub use store::{MemoryThemeStore, RestThemeStore, ThemeError, ThemeStore};
