//! Transparent always-on-top overlay window hosting the trail engine.

use std::path::PathBuf;
use std::time::Instant;

use egui::{Color32, Event, Pos2, Rect, TextureHandle, TextureOptions};
use tracing::{debug, info, warn};
use trailcast_core::{HostBridge, RecordingState, TrailEngine};
use trailcast_native::PixmapCanvas;
use trailcast_platform::Viewport;

use crate::keys;

#[derive(Debug, Clone)]
pub struct OverlayOptions {
    pub title: String,
    pub always_on_top: bool,
    /// Where finished recordings are written.
    pub output_dir: PathBuf,
}

pub struct TrailOverlayApp {
    engine: TrailEngine,
    bridge: HostBridge,
    canvas: PixmapCanvas,
    texture: Option<TextureHandle>,
    /// Points drawn by the previous frame. `None` forces the next upload.
    last_drawn: Option<usize>,
    uploads: u64,
    output_dir: PathBuf,
    last_saved: Option<PathBuf>,
}

impl TrailOverlayApp {
    pub fn new(
        engine: TrailEngine,
        bridge: HostBridge,
        output_dir: PathBuf,
    ) -> trailcast_native::Result<Self> {
        Ok(Self {
            engine,
            bridge,
            canvas: PixmapCanvas::new(Viewport::new(1.0, 1.0, 1.0))?,
            texture: None,
            last_drawn: None,
            uploads: 0,
            output_dir,
            last_saved: None,
        })
    }

    pub fn engine(&self) -> &TrailEngine {
        &self.engine
    }

    pub fn last_saved(&self) -> Option<&PathBuf> {
        self.last_saved.as_ref()
    }

    /// One frame of work: host polling, input, recording, drawing.
    pub fn step(&mut self, ctx: &egui::Context) {
        self.sync_viewport(ctx);

        self.bridge.poll(Instant::now());
        for command in self.bridge.drain_commands() {
            self.engine.handle_control(command);
        }

        self.handle_input(ctx);
        self.collect_recording();

        if let Some(drawn) = self.engine.frame(&mut self.canvas) {
            // Two empty frames in a row leave the texture as it was.
            if drawn > 0 || self.last_drawn != Some(0) {
                self.upload(ctx);
            }
            self.last_drawn = Some(drawn);
        }
        self.paint(ctx);
        ctx.request_repaint();
    }

    fn sync_viewport(&mut self, ctx: &egui::Context) {
        let size = ctx.screen_rect().size();
        let viewport = Viewport::new(size.x, size.y, ctx.pixels_per_point());
        match self.canvas.resize(viewport) {
            Ok(true) => self.last_drawn = None,
            Ok(false) => {}
            Err(err) => warn!("keeping previous raster surface: {err}"),
        }
    }

    fn handle_input(&mut self, ctx: &egui::Context) {
        let in_text_input = ctx.wants_keyboard_input();
        let engine = &mut self.engine;
        ctx.input_mut(|input| {
            input.events.retain(|event| {
                if let Event::PointerMoved(pos) = event {
                    engine.pointer_moved(pos.x, pos.y);
                    return true;
                }
                match keys::key_event(event, in_text_input) {
                    // Handled shortcuts are consumed so nothing else reacts to them.
                    Some(key) => !engine.handle_key(&key),
                    None => true,
                }
            });
        });
    }

    fn collect_recording(&mut self) {
        let Some(artifact) = self.engine.pump_recording() else {
            return;
        };
        match artifact.save_in(&self.output_dir) {
            Ok(path) => {
                info!(path = %path.display(), bytes = artifact.len(), "recording saved");
                self.last_saved = Some(path);
            }
            Err(err) => warn!(
                dir = %self.output_dir.display(),
                "could not save recording {}: {err}",
                artifact.file_name
            ),
        }
    }

    fn upload(&mut self, ctx: &egui::Context) {
        self.uploads += 1;
        let (width, height) = self.canvas.size();
        let image = egui::ColorImage::from_rgba_premultiplied(
            [width as usize, height as usize],
            self.canvas.data(),
        );
        match &mut self.texture {
            Some(texture) => texture.set(image, TextureOptions::LINEAR),
            None => {
                debug!(width, height, "trail texture created");
                self.texture = Some(ctx.load_texture("trail", image, TextureOptions::LINEAR));
            }
        }
    }

    fn paint(&self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                if let Some(texture) = &self.texture {
                    let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
                    ui.painter()
                        .image(texture.id(), ui.max_rect(), uv, Color32::WHITE);
                }
            });
        egui::Area::new(egui::Id::new("trail-status"))
            .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(12.0, -12.0))
            .interactable(false)
            .show(ctx, |ui| {
                ui.label(
                    egui::RichText::new(status_line(&self.engine, self.bridge.is_host_present()))
                        .monospace()
                        .color(Color32::from_white_alpha(200)),
                );
            });
    }
}

/// One-line readout of the engine state.
pub fn status_line(engine: &TrailEngine, host_present: bool) -> String {
    let config = engine.config();
    let mut line = format!(
        "{} | {} {} {}px fade {}",
        if engine.is_active() { "trail on" } else { "trail off" },
        config.style,
        config.color,
        config.size,
        config.fade_rate,
    );
    if let Some(preset) = engine.active_preset_id() {
        line.push_str(&format!(" | preset {preset}"));
    }
    let recorder = engine.recorder();
    match recorder.state() {
        RecordingState::Idle => {}
        RecordingState::Requesting => line.push_str(" | waiting for capture"),
        RecordingState::Recording => line.push_str(" | REC"),
        RecordingState::Processing => line.push_str(" | saving"),
    }
    if let Some(error) = recorder.error().filter(|err| err.is_user_facing()) {
        line.push_str(&format!(" | {error}"));
    }
    if host_present {
        line.push_str(" | host");
    }
    line
}

impl eframe::App for TrailOverlayApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.step(ctx);
    }

    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        egui::Rgba::TRANSPARENT.to_array()
    }
}

impl Drop for TrailOverlayApp {
    fn drop(&mut self) {
        self.bridge.shutdown();
        self.engine.shutdown();
        info!(uploads = self.uploads, "overlay closed");
    }
}

/// Open the overlay window and block until it closes.
pub fn run_overlay(
    options: OverlayOptions,
    engine: TrailEngine,
    bridge: HostBridge,
) -> Result<(), eframe::Error> {
    let mut viewport = egui::ViewportBuilder::default()
        .with_title(options.title.clone())
        .with_transparent(true)
        .with_decorations(false)
        .with_maximized(true);
    if options.always_on_top {
        viewport = viewport.with_window_level(egui::WindowLevel::AlwaysOnTop);
    }
    let native_options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    let output_dir = options.output_dir;
    eframe::run_native(
        &options.title,
        native_options,
        Box::new(move |_creation_context| {
            let app = TrailOverlayApp::new(engine, bridge, output_dir)?;
            Ok(Box::new(app))
        }),
    )
}
