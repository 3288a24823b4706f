//! Bounded, insertion-ordered pool of live trail points.

use std::collections::VecDeque;
use std::f32::consts::TAU;

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Hard cap on live points; the oldest is evicted first.
pub const MAX_POINTS: usize = 48;

/// Life of a fresh point, in thousandths.
pub const FULL_LIFE: i32 = 1000;

/// One decaying sample of pointer position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailPoint {
    pub pos: Vec2,
    /// Remaining life in thousandths; the point is live while positive.
    pub life_milli: i32,
    /// Angle in `[0, TAU)` fixed at creation, used for per-point rotation.
    pub seed: f32,
}

impl TrailPoint {
    /// Opacity in `(0, 1]` while the point is live.
    pub fn life(&self) -> f32 {
        self.life_milli.max(0) as f32 / FULL_LIFE as f32
    }
}

#[derive(Debug)]
pub struct ParticlePool {
    points: VecDeque<TrailPoint>,
    rng: StdRng,
}

impl Default for ParticlePool {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticlePool {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Pool whose seed draws are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            points: VecDeque::with_capacity(MAX_POINTS + 1),
            rng,
        }
    }

    /// Append a fresh point at full life, evicting the oldest past capacity.
    pub fn add(&mut self, x: f32, y: f32) {
        let seed = self.rng.gen_range(0.0..TAU);
        self.points.push_back(TrailPoint {
            pos: Vec2::new(x, y),
            life_milli: FULL_LIFE,
            seed,
        });
        if self.points.len() > MAX_POINTS {
            self.points.pop_front();
        }
    }

    /// Decay every point by `fade_rate` thousandths and drop the ones that reach zero.
    /// Survivors keep their relative order, oldest first.
    pub fn advance(&mut self, fade_rate: u32) -> &VecDeque<TrailPoint> {
        let decay = i32::try_from(fade_rate).unwrap_or(i32::MAX);
        self.points.retain_mut(|point| {
            point.life_milli = point.life_milli.saturating_sub(decay);
            point.life_milli > 0
        });
        &self.points
    }

    pub fn points(&self) -> &VecDeque<TrailPoint> {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FADE_MAX, FADE_MIN};

    #[test]
    fn test_add_starts_at_full_life() {
        let mut pool = ParticlePool::with_seed(1);
        pool.add(10.0, 20.0);
        let point = pool.points()[0];
        assert_eq!(point.pos, Vec2::new(10.0, 20.0));
        assert_eq!(point.life(), 1.0);
        assert!((0.0..TAU).contains(&point.seed));
    }

    #[test]
    fn test_burst_never_exceeds_capacity() {
        let mut pool = ParticlePool::with_seed(2);
        for i in 0..1_000 {
            pool.add(i as f32, 0.0);
            assert!(pool.len() <= MAX_POINTS);
        }
        assert_eq!(pool.len(), MAX_POINTS);
        // oldest evicted first, so the survivors are the last 48 adds in order
        let xs: Vec<f32> = pool.points().iter().map(|p| p.pos.x).collect();
        let expected: Vec<f32> = (952..1_000).map(|i| i as f32).collect();
        assert_eq!(xs, expected);
    }

    #[test]
    fn test_point_dies_after_exactly_nineteen_steps_at_fade_55() {
        let mut pool = ParticlePool::with_seed(3);
        pool.add(0.0, 0.0);
        for step in 1..19 {
            pool.advance(55);
            assert_eq!(pool.len(), 1, "point removed too early at step {step}");
        }
        pool.advance(55);
        assert!(pool.is_empty());
    }

    fn steps_to_die(fade_rate: u32) -> u32 {
        let mut pool = ParticlePool::with_seed(6);
        pool.add(0.0, 0.0);
        let mut steps = 0;
        while !pool.is_empty() {
            pool.advance(fade_rate);
            steps += 1;
        }
        steps
    }

    #[test]
    fn test_every_fade_rate_removes_after_ceil_thousand_over_rate_steps() {
        for fade in FADE_MIN..=FADE_MAX {
            assert_eq!(steps_to_die(fade), 1000u32.div_ceil(fade), "fade {fade}");
        }
    }

    #[test]
    fn test_life_is_monotonic_and_in_range() {
        let mut pool = ParticlePool::with_seed(4);
        pool.add(0.0, 0.0);
        let mut last = 1.0;
        while !pool.is_empty() {
            for point in pool.advance(37) {
                assert!(point.life() > 0.0 && point.life() <= 1.0);
                assert!(point.life() <= last);
                last = point.life();
            }
        }
    }

    #[test]
    fn test_advance_preserves_order_of_survivors() {
        let mut pool = ParticlePool::with_seed(5);
        pool.add(1.0, 0.0);
        for _ in 0..10 {
            pool.advance(60);
        }
        pool.add(2.0, 0.0);
        pool.add(3.0, 0.0);
        // first point has life 0.4 left; 7 more steps kill it, the others survive
        for _ in 0..7 {
            pool.advance(60);
        }
        let xs: Vec<f32> = pool.points().iter().map(|p| p.pos.x).collect();
        assert_eq!(xs, vec![2.0, 3.0]);
    }

    #[test]
    fn test_seeded_pools_are_deterministic() {
        let mut a = ParticlePool::with_seed(42);
        let mut b = ParticlePool::with_seed(42);
        for i in 0..5 {
            a.add(i as f32, 0.0);
            b.add(i as f32, 0.0);
        }
        assert_eq!(a.points(), b.points());
    }
}
