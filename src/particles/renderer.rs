use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::field::{Particle, ParticleField};

/// Shape used to draw one particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sprite {
    /// Filled circle (snow).
    Circle,
    /// Rotated ellipse petal (sakura).
    Petal,
    /// Rotated leaf outline (leaves).
    Leaf,
    /// Short vertical line (rain).
    Streak,
}

/// Draw target for the particle loop, e.g. a canvas binding or an offscreen buffer.
pub trait Surface: Send {
    fn clear(&mut self);
    fn draw(&mut self, sprite: Sprite, particle: &Particle);
}

pub struct ParticleRenderer;

impl ParticleRenderer {
    /// Spawn the animation loop. One step and one draw per tick at `fps`.
    pub fn start<S: Surface + 'static>(field: ParticleField, surface: Arc<Mutex<S>>, fps: u32) -> RendererHandle {
        let period = Duration::from_secs_f64(1.0 / f64::from(fps.max(1)));
        let (size_tx, mut size_rx) = watch::channel(field.size());
        let frames = Arc::new(AtomicU64::new(0));
        let frame_counter = Arc::clone(&frames);
        let mut field = field;

        debug!(
            "[Particles] Starting {:?} loop with {} particles at {} fps",
            field.kind(),
            field.particles().len(),
            fps
        );

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut last = Instant::now();

            loop {
                ticker.tick().await;

                if size_rx.has_changed().unwrap_or(false) {
                    let (width, height) = *size_rx.borrow_and_update();
                    field.resize(width, height);
                }

                let now = Instant::now();
                field.step(now.duration_since(last).as_secs_f64());
                last = now;

                match surface.lock() {
                    Ok(mut target) => field.draw(&mut *target),
                    Err(_) => {
                        warn!("[Particles] Surface lock poisoned, stopping loop");
                        break;
                    }
                }
                frame_counter.fetch_add(1, Ordering::Relaxed);
            }
        });

        RendererHandle {
            task,
            size_tx,
            frames,
        }
    }
}

/// Running animation. Dropping the handle stops the loop.
pub struct RendererHandle {
    task: JoinHandle<()>,
    size_tx: watch::Sender<(f64, f64)>,
    frames: Arc<AtomicU64>,
}

impl RendererHandle {
    /// Forward a new surface size, picked up on the next frame.
    pub fn resize(&self, width: f64, height: f64) {
        let _ = self.size_tx.send((width, height));
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for RendererHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particles::ParticleKind;
    use crate::theme::record::{ParticleConfig, Range};
    use std::collections::HashMap;

    #[derive(Default)]
    struct RecordingSurface {
        clears: usize,
        draws: HashMap<Sprite, usize>,
        last_frame: Vec<(f64, f64)>,
    }

    impl Surface for RecordingSurface {
        fn clear(&mut self) {
            self.clears += 1;
            self.last_frame.clear();
        }

        fn draw(&mut self, sprite: Sprite, particle: &Particle) {
            *self.draws.entry(sprite).or_default() += 1;
            self.last_frame.push((particle.x, particle.y));
        }
    }

    fn field(kind: ParticleKind, count: usize) -> ParticleField {
        let cfg = ParticleConfig {
            kind,
            count,
            speed: Range::new(1.0, 2.0),
            wind: Range::new(0.0, 0.0),
            colors: vec![],
            size: None,
            low_power: None,
        };
        ParticleField::with_seed(Some(&cfg), count, 200.0, 200.0, 9).unwrap()
    }

    #[test]
    fn draw_uses_one_sprite_per_particle() {
        let f = field(ParticleKind::Sakura, 12);
        let mut surface = RecordingSurface::default();
        f.draw(&mut surface);
        assert_eq!(surface.clears, 1);
        assert_eq!(surface.draws.get(&Sprite::Petal), Some(&12));
        assert_eq!(surface.last_frame.len(), 12);
    }

    #[tokio::test]
    async fn loop_draws_frames_until_stopped() {
        let surface = Arc::new(Mutex::new(RecordingSurface::default()));
        let handle = ParticleRenderer::start(field(ParticleKind::Snow, 8), Arc::clone(&surface), 200);

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(handle.is_running());
        assert!(handle.frames_drawn() > 0, "no frames drawn");

        handle.stop();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let clears_after_stop = surface.lock().unwrap().clears;
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(surface.lock().unwrap().clears, clears_after_stop);
        assert_eq!(surface.lock().unwrap().draws.get(&Sprite::Circle).copied().unwrap_or(0) % 8, 0);
    }

    #[tokio::test]
    async fn dropping_handle_cancels_loop() {
        let surface = Arc::new(Mutex::new(RecordingSurface::default()));
        {
            let _handle = ParticleRenderer::start(field(ParticleKind::Rain, 4), Arc::clone(&surface), 200);
            tokio::time::sleep(Duration::from_millis(40)).await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        let settled = surface.lock().unwrap().clears;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(surface.lock().unwrap().clears, settled);
    }

    #[tokio::test]
    async fn resize_reaches_the_loop() {
        let surface = Arc::new(Mutex::new(RecordingSurface::default()));
        let handle = ParticleRenderer::start(field(ParticleKind::Snow, 30), Arc::clone(&surface), 200);
        handle.resize(10.0, 10.0);
        tokio::time::sleep(Duration::from_millis(150)).await;

        // Everything still on screen must sit inside the shrunken wrap band.
        let frame = surface.lock().unwrap().last_frame.clone();
        assert!(!frame.is_empty());
        for (x, _) in frame {
            assert!((-20.0..=30.0).contains(&x), "x {} outside resized band", x);
        }
    }
}
