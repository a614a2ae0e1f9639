pub mod field;
pub mod renderer;

pub use field::{Particle, ParticleField};
pub use renderer::{ParticleRenderer, RendererHandle, Sprite, Surface};

use serde::{Deserialize, Serialize};

use crate::theme::record::{ParticleConfig, Range};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticleKind {
    Snow,
    Sakura,
    Leaves,
    Rain,
    None,
}

impl ParticleKind {
    /// Multiplier applied to the configured fall speed.
    pub fn speed_factor(&self) -> f64 {
        match self {
            ParticleKind::Rain => 2.5,
            _ => 1.0,
        }
    }

    pub fn sprite(&self) -> Option<Sprite> {
        match self {
            ParticleKind::Snow => Some(Sprite::Circle),
            ParticleKind::Sakura => Some(Sprite::Petal),
            ParticleKind::Leaves => Some(Sprite::Leaf),
            ParticleKind::Rain => Some(Sprite::Streak),
            ParticleKind::None => None,
        }
    }

    pub(crate) fn default_size(&self) -> Range {
        match self {
            ParticleKind::Snow => Range::new(2.0, 5.0),
            ParticleKind::Sakura => Range::new(6.0, 12.0),
            ParticleKind::Leaves => Range::new(8.0, 14.0),
            ParticleKind::Rain => Range::new(1.0, 2.0),
            ParticleKind::None => Range::new(0.0, 0.0),
        }
    }

    pub(crate) fn default_color(&self) -> &'static str {
        match self {
            ParticleKind::Snow => "#ffffff",
            ParticleKind::Sakura => "#ffb7c5",
            ParticleKind::Leaves => "#d2691e",
            ParticleKind::Rain => "#a4c8f0",
            ParticleKind::None => "transparent",
        }
    }

    /// Horizontal sway amplitude range. Rain falls straight.
    pub(crate) fn sway(&self) -> Range {
        match self {
            ParticleKind::Snow => Range::new(0.2, 0.6),
            ParticleKind::Sakura | ParticleKind::Leaves => Range::new(0.5, 1.5),
            ParticleKind::Rain | ParticleKind::None => Range::new(0.0, 0.0),
        }
    }

    /// Rotation speed magnitude in radians per frame. Only tumbling sprites rotate.
    pub(crate) fn spin(&self) -> f64 {
        match self {
            ParticleKind::Sakura => 0.03,
            ParticleKind::Leaves => 0.05,
            _ => 0.0,
        }
    }
}

/// What the host knows about the device, used to scale particle counts down.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfile {
    #[serde(default)]
    pub hardware_concurrency: Option<usize>,
    #[serde(default)]
    pub is_mobile: bool,
    #[serde(default)]
    pub save_data: bool,
    #[serde(default)]
    pub prefers_reduced_motion: bool,
}

impl DeviceProfile {
    pub fn is_low_power(&self) -> bool {
        self.prefers_reduced_motion
            || self.is_mobile
            || self.save_data
            || matches!(self.hardware_concurrency, Some(cores) if cores <= 4)
    }
}

/// How many particles to run: explicit override, then the low-power hint
/// on constrained devices, then the configured count.
pub fn particle_count(config: &ParticleConfig, override_count: Option<usize>, profile: &DeviceProfile) -> usize {
    if let Some(count) = override_count {
        return count;
    }
    match config.low_power {
        Some(hint) if profile.is_low_power() => hint.count,
        _ => config.count,
    }
}
