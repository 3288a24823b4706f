//! CPU raster surface backed by a tiny-skia pixmap.

use glam::Vec2;
use tiny_skia::{
    Color, FillRule, LineCap, Paint, PathBuilder, Pixmap, Point, RadialGradient, Rect, SpreadMode,
    Stroke, Transform,
};
use tracing::debug;
use trailcast_platform::{Canvas, GradientStop, Rgb, Viewport};

use crate::error::{Error, Result};

/// Backing store sized `viewport * dpr`, drawn through a `dpr` scale so callers
/// keep working in logical pixels.
#[derive(Debug)]
pub struct PixmapCanvas {
    pixmap: Pixmap,
    viewport: Viewport,
    transform: Transform,
}

impl PixmapCanvas {
    pub fn new(viewport: Viewport) -> Result<Self> {
        let (width, height) = viewport.backing_size();
        let pixmap = Pixmap::new(width, height).ok_or(Error::InvalidViewport { width, height })?;
        Ok(Self {
            pixmap,
            viewport,
            transform: scale_for(&viewport),
        })
    }

    /// Match a new viewport. Returns true when the backing store was reallocated.
    pub fn resize(&mut self, viewport: Viewport) -> Result<bool> {
        if viewport == self.viewport {
            return Ok(false);
        }
        let (width, height) = viewport.backing_size();
        let reallocated = (width, height) != (self.pixmap.width(), self.pixmap.height());
        if reallocated {
            self.pixmap =
                Pixmap::new(width, height).ok_or(Error::InvalidViewport { width, height })?;
            debug!(width, height, dpr = viewport.device_pixel_ratio, "raster surface resized");
        }
        self.viewport = viewport;
        self.transform = scale_for(&viewport);
        Ok(reallocated)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Physical size of the backing store.
    pub fn size(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }

    /// Premultiplied RGBA8 pixels, row-major.
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }
}

fn scale_for(viewport: &Viewport) -> Transform {
    let dpr = viewport.scale_factor();
    Transform::from_scale(dpr, dpr)
}

fn color(rgb: Rgb, alpha: f32) -> Color {
    Color::from_rgba8(rgb.r, rgb.g, rgb.b, (alpha.clamp(0.0, 1.0) * 255.0).round() as u8)
}

fn solid(rgb: Rgb, alpha: f32) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color(rgb, alpha));
    paint.anti_alias = true;
    paint
}

impl Canvas for PixmapCanvas {
    fn clear(&mut self) {
        self.pixmap.fill(Color::TRANSPARENT);
    }

    fn fill_radial_disc(&mut self, center: Vec2, radius: f32, stops: &[GradientStop]) {
        if radius <= 0.0 || stops.is_empty() {
            return;
        }
        let Some(path) = PathBuilder::from_circle(center.x, center.y, radius) else {
            return;
        };
        let stops = stops
            .iter()
            .map(|stop| tiny_skia::GradientStop::new(stop.offset, color(stop.color, stop.alpha)))
            .collect();
        let origin = Point::from_xy(center.x, center.y);
        let Some(shader) = RadialGradient::new(
            origin,
            origin,
            radius,
            stops,
            SpreadMode::Pad,
            Transform::identity(),
        ) else {
            return;
        };
        let paint = Paint {
            shader,
            anti_alias: true,
            ..Paint::default()
        };
        self.pixmap
            .fill_path(&path, &paint, FillRule::Winding, self.transform, None);
    }

    fn stroke_line(&mut self, from: Vec2, to: Vec2, rgb: Rgb, alpha: f32, width: f32) {
        let mut builder = PathBuilder::new();
        builder.move_to(from.x, from.y);
        builder.line_to(to.x, to.y);
        let Some(path) = builder.finish() else {
            return;
        };
        let stroke = Stroke {
            width,
            line_cap: LineCap::Round,
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(&path, &solid(rgb, alpha), &stroke, self.transform, None);
    }

    fn fill_ellipse(&mut self, center: Vec2, radii: Vec2, rotation: f32, rgb: Rgb, opacity: f32) {
        if radii.x <= 0.0 || radii.y <= 0.0 {
            return;
        }
        let Some(bounds) = Rect::from_xywh(
            center.x - radii.x,
            center.y - radii.y,
            radii.x * 2.0,
            radii.y * 2.0,
        ) else {
            return;
        };
        let Some(path) = PathBuilder::from_oval(bounds) else {
            return;
        };
        let transform = self.transform.pre_concat(Transform::from_rotate_at(
            rotation.to_degrees(),
            center.x,
            center.y,
        ));
        self.pixmap
            .fill_path(&path, &solid(rgb, opacity), FillRule::Winding, transform, None);
    }

    fn fill_polygon(&mut self, points: &[Vec2], rgb: Rgb, alpha: f32) {
        let [first, rest @ ..] = points else {
            return;
        };
        let mut builder = PathBuilder::new();
        builder.move_to(first.x, first.y);
        for point in rest {
            builder.line_to(point.x, point.y);
        }
        builder.close();
        let Some(path) = builder.finish() else {
            return;
        };
        self.pixmap
            .fill_path(&path, &solid(rgb, alpha), FillRule::Winding, self.transform, None);
    }
}
