//! Per-style mapping from a trail point to canvas primitives. Stateless.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::Vec2;
use tracing::trace;
use trailcast_platform::{Canvas, GradientStop};

use crate::config::{TrailConfig, TrailStyle};
use crate::pool::TrailPoint;

const SPARKLE_ARMS: usize = 4;
const SPARKLE_ARM_RATIO: f32 = 0.9;
const BRUSH_ASPECT: f32 = 0.6;
const BRUSH_OPACITY: f32 = 0.35;
const STAR_POINTS: usize = 5;
const STAR_INNER_RATIO: f32 = 0.45;
const GLOW_SPREAD: f32 = 1.6;

pub fn draw(canvas: &mut dyn Canvas, point: &TrailPoint, config: &TrailConfig) {
    let alpha = point.life();
    let radius = config.size as f32 * alpha;
    let color = config.color;
    let center = point.pos;

    match &config.style {
        TrailStyle::Gradient => {
            let stops = [
                GradientStop::new(0.0, color, alpha),
                GradientStop::new(1.0, color, 0.0),
            ];
            canvas.fill_radial_disc(center, radius, &stops);
        }
        TrailStyle::Sparkle => {
            let width = (radius / 6.0).max(1.0);
            for end in sparkle_arms(center, radius, point.seed) {
                canvas.stroke_line(center, end, color, alpha, width);
            }
        }
        TrailStyle::Brush => {
            let radii = Vec2::new(radius, BRUSH_ASPECT * radius);
            canvas.fill_ellipse(center, radii, point.seed, color, BRUSH_OPACITY * alpha);
        }
        TrailStyle::Star => {
            canvas.fill_polygon(&star_vertices(center, radius), color, alpha);
        }
        TrailStyle::Glow => {
            let stops = [
                GradientStop::new(0.0, color, 0.9 * alpha),
                GradientStop::new(0.5, color, 0.45 * alpha),
                GradientStop::new(1.0, color, 0.0),
            ];
            canvas.fill_radial_disc(center, GLOW_SPREAD * radius, &stops);
        }
        TrailStyle::Other(name) => {
            trace!(style = %name, "unknown trail style, skipping draw");
        }
    }
}

/// End points of the four sparkle arms, 90 degrees apart and rotated by `seed`.
pub fn sparkle_arms(center: Vec2, radius: f32, seed: f32) -> [Vec2; SPARKLE_ARMS] {
    let length = SPARKLE_ARM_RATIO * radius;
    std::array::from_fn(|arm| {
        let angle = seed + arm as f32 * FRAC_PI_2;
        center + Vec2::from_angle(angle) * length
    })
}

/// Closed five-point star: outer and inner vertices interleaved, first outer vertex straight up.
pub fn star_vertices(center: Vec2, radius: f32) -> [Vec2; STAR_POINTS * 2] {
    let inner = STAR_INNER_RATIO * radius;
    std::array::from_fn(|index| {
        let angle = -FRAC_PI_2 + index as f32 * PI / STAR_POINTS as f32;
        let r = if index % 2 == 0 { radius } else { inner };
        center + Vec2::from_angle(angle) * r
    })
}
