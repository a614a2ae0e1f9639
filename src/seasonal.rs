//! Default seasonal campaign shipped with the app.

use crate::particles::{DeviceProfile, ParticleKind};

#[derive(Debug, Clone, Copy)]
pub struct CampaignAssets {
    pub logo: &'static str,
    pub home_avatar: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct CampaignParticles {
    pub kind: ParticleKind,
    pub full_count: usize,
    pub low_power_count: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct SeasonalCampaign {
    pub name: &'static str,
    pub enabled: bool,
    pub assets: CampaignAssets,
    pub particles: CampaignParticles,
}

pub const SEASONAL_CAMPAIGN: SeasonalCampaign = SeasonalCampaign {
    name: "Christmas",
    enabled: true,
    assets: CampaignAssets {
        logo: "/seasonal/christmas/logo.png",
        home_avatar: "/seasonal/christmas/avatar.png",
    },
    particles: CampaignParticles {
        kind: ParticleKind::Snow,
        full_count: 50,
        low_power_count: 20,
    },
};

impl SeasonalCampaign {
    /// Snowflake budget for this device; 0 when the campaign is switched off.
    pub fn particle_count(&self, profile: &DeviceProfile) -> usize {
        if !self.enabled {
            return 0;
        }
        if profile.is_low_power() {
            self.particles.low_power_count
        } else {
            self.particles.full_count
        }
    }
}
