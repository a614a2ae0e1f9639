//! Particle simulation: spawn, fall, wrap, respawn.
//!
//! The field owns a fixed number of slots. A particle that leaves through the
//! bottom is overwritten in place by a fresh one entering from above, so the
//! collection never grows or shrinks while the animation runs.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::f64::consts::TAU;

use super::renderer::Surface;
use super::ParticleKind;
use crate::theme::record::ParticleConfig;

/// Distance past an edge before a particle wraps or respawns.
pub const EDGE_MARGIN: f64 = 20.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub size: f64,
    /// Vertical pixels per frame.
    pub speed: f64,
    /// Horizontal drift per frame.
    pub wind: f64,
    pub opacity: f64,
    pub rotation: f64,
    pub rotation_speed: f64,
    pub color: String,
    pub sway_phase: f64,
    pub sway_amplitude: f64,
}

pub struct ParticleField {
    particles: Vec<Particle>,
    config: ParticleConfig,
    width: f64,
    height: f64,
    elapsed: f64,
    rng: StdRng,
}

impl ParticleField {
    /// Returns `None` when there is nothing to animate: no config, or type `none`.
    pub fn new(config: Option<&ParticleConfig>, count: usize, width: f64, height: f64) -> Option<Self> {
        Self::with_rng(config, count, width, height, StdRng::from_entropy())
    }

    /// Deterministic field for reproducible runs.
    pub fn with_seed(
        config: Option<&ParticleConfig>,
        count: usize,
        width: f64,
        height: f64,
        seed: u64,
    ) -> Option<Self> {
        Self::with_rng(config, count, width, height, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        config: Option<&ParticleConfig>,
        count: usize,
        width: f64,
        height: f64,
        mut rng: StdRng,
    ) -> Option<Self> {
        let config = config?;
        if config.kind == ParticleKind::None {
            return None;
        }
        let width = width.max(0.0);
        let height = height.max(0.0);

        let particles = (0..count)
            .map(|_| spawn(&mut rng, config, width, height, true))
            .collect();

        Some(Self {
            particles,
            config: config.clone(),
            width,
            height,
            elapsed: 0.0,
            rng,
        })
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn kind(&self) -> ParticleKind {
        self.config.kind
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    /// Only the surface size changes; particles keep their positions.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
    }

    /// Advance by `dt` seconds. Motion is tuned per 60 Hz frame.
    pub fn step(&mut self, dt: f64) {
        let frames = dt * 60.0;
        self.elapsed += dt;

        for p in self.particles.iter_mut() {
            let sway = (self.elapsed * 2.0 + p.sway_phase).sin() * p.sway_amplitude;
            p.y += p.speed * frames;
            p.x += (p.wind + sway) * frames;
            p.rotation = (p.rotation + p.rotation_speed * frames) % TAU;

            if p.y > self.height + EDGE_MARGIN {
                *p = spawn(&mut self.rng, &self.config, self.width, self.height, false);
                continue;
            }

            if p.x < -EDGE_MARGIN {
                p.x = self.width + 10.0;
            } else if p.x > self.width + EDGE_MARGIN {
                p.x = -10.0;
            }
        }
    }

    pub fn draw<S: Surface + ?Sized>(&self, surface: &mut S) {
        let Some(sprite) = self.config.kind.sprite() else {
            return;
        };
        surface.clear();
        for p in &self.particles {
            surface.draw(sprite, p);
        }
    }
}

/// New particle at a random column. `random_y` scatters it over the canvas
/// (first layout); otherwise it starts just above the top edge.
fn spawn(rng: &mut StdRng, config: &ParticleConfig, width: f64, height: f64, random_y: bool) -> Particle {
    let kind = config.kind;
    let x = rng.gen::<f64>() * width;
    let y = if random_y {
        rng.gen::<f64>() * height
    } else {
        -EDGE_MARGIN - rng.gen::<f64>() * 40.0
    };

    let size = config.size.unwrap_or_else(|| kind.default_size()).lerp(rng.gen());
    let speed = config.speed.lerp(rng.gen()) * kind.speed_factor();
    let wind = config.wind.lerp(rng.gen());

    let spin = kind.spin();
    let rotation_speed = if spin > 0.0 {
        let direction = if rng.gen::<bool>() { 1.0 } else { -1.0 };
        direction * spin * (0.5 + 0.5 * rng.gen::<f64>())
    } else {
        0.0
    };

    let color = config
        .colors
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| kind.default_color().to_string());

    Particle {
        x,
        y,
        size,
        speed,
        wind,
        opacity: 0.4 + 0.5 * rng.gen::<f64>(),
        rotation: rng.gen::<f64>() * TAU,
        rotation_speed,
        color,
        sway_phase: rng.gen::<f64>() * TAU,
        sway_amplitude: kind.sway().lerp(rng.gen()),
    }
}
