//! Frame-driven animation loop with explicit arm/cancel.
//!
//! The host calls [`AnimationScheduler::tick`] once per display frame. While the
//! scheduler is armed each tick runs one [`step`]; cancelling simply stops the
//! ticks from doing anything. No particle data lives here, so a restart never
//! loses points.

use tracing::{debug, trace};
use trailcast_platform::Canvas;

use crate::config::TrailConfig;
use crate::pool::ParticlePool;
use crate::render;

#[derive(Debug, Default)]
pub struct AnimationScheduler {
    armed: bool,
    generation: u64,
    ticks: u64,
}

impl AnimationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the loop. Starting an armed scheduler is a no-op.
    pub fn start(&mut self) {
        if self.armed {
            return;
        }
        self.armed = true;
        self.generation += 1;
        self.ticks = 0;
        debug!(generation = self.generation, "animation loop armed");
    }

    /// Disarm the loop. Safe to call any number of times.
    pub fn cancel(&mut self) {
        if self.armed {
            debug!(generation = self.generation, ticks = self.ticks, "animation loop cancelled");
        }
        self.armed = false;
    }

    /// Cancel and re-arm with fresh loop state.
    pub fn restart(&mut self) {
        self.cancel();
        self.start();
    }

    pub fn is_running(&self) -> bool {
        self.armed
    }

    /// Incremented on every (re)start.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Steps run since the last (re)start.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one step if armed. Returns the number of points drawn, or `None` when cancelled.
    pub fn tick(
        &mut self,
        pool: &mut ParticlePool,
        config: &TrailConfig,
        canvas: &mut dyn Canvas,
    ) -> Option<usize> {
        if !self.armed {
            return None;
        }
        let drawn = step(self.ticks, pool, config, canvas);
        self.ticks += 1;
        Some(drawn)
    }
}

/// Clear the surface, decay the pool once, and draw every survivor with the current config.
pub fn step(
    tick: u64,
    pool: &mut ParticlePool,
    config: &TrailConfig,
    canvas: &mut dyn Canvas,
) -> usize {
    canvas.clear();
    let survivors = pool.advance(config.fade_rate);
    for point in survivors {
        render::draw(canvas, point, config);
    }
    trace!(tick, live = survivors.len(), "animation step");
    survivors.len()
}
