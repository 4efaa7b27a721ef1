// src/app.rs
use crate::ui::{self, Theme};

use eframe::egui;
use hand_sizer::overlay::Recommendation;
use hand_sizer::pipeline::{FrameOutput, LoopHandle, LoopObserver, LoopState};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const ITEM_THUMBNAIL_SIZE: u32 = 160;

pub struct HandSizerApp {
    // Frame loop running on its own thread
    handle: LoopHandle,
    observer: LoopObserver,

    theme: Theme,
    video_texture: Option<egui::TextureHandle>,
    latest: Option<Arc<FrameOutput>>,

    // Last recommendation stays on screen until a new one arrives
    recommendation: Option<Recommendation>,
    show_recommendations: bool,
    assets_dir: PathBuf,
    item_textures: HashMap<String, Option<egui::TextureHandle>>,
}

impl HandSizerApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        handle: LoopHandle,
        assets_dir: PathBuf,
        show_recommendations: bool,
    ) -> Self {
        cc.egui_ctx.set_visuals(ui::create_visuals());

        Self {
            observer: handle.observer(),
            handle,
            theme: Theme::default(),
            video_texture: None,
            latest: None,
            recommendation: None,
            show_recommendations,
            assets_dir,
            item_textures: HashMap::new(),
        }
    }

    fn poll_frames(&mut self, ctx: &egui::Context) {
        if !self.observer.frames.has_changed().unwrap_or(false) {
            return;
        }
        let Some(output) = self.observer.frames.borrow_and_update().clone() else {
            return;
        };

        let image = ui::to_color_image(&output.frame);
        match &mut self.video_texture {
            Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
            None => {
                self.video_texture = Some(ctx.load_texture("video_frame", image, egui::TextureOptions::LINEAR));
            }
        }

        if let Some(recommendation) = output.overlay.recommendation() {
            self.recommendation = Some(recommendation.clone());
        }
        self.latest = Some(output);
    }

    fn render_header(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                ui.heading("Hand Sizer");
                ui.separator();

                let state = *self.observer.state.borrow();
                let (text, color) = match state {
                    LoopState::Stopped => ("Stopped", self.theme.error),
                    LoopState::Idle => ("Starting...", self.theme.warning),
                    _ => ("Live", self.theme.success),
                };
                ui.colored_label(color, text);
            });
            ui.add_space(8.0);
        });
    }

    fn render_status_bar(&self, ctx: &egui::Context) {
        let stats = *self.observer.stats.borrow();
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(format!("{:.1} FPS", stats.fps));
                ui.separator();
                ui.label(format!("Cycle: {:.1} ms", stats.avg_cycle_ms));
                ui.separator();
                ui.label(format!(
                    "Frames: {} processed, {} measured, {} skipped",
                    stats.frames_processed, stats.frames_measured, stats.frames_skipped
                ));
            });
        });
    }

    fn render_recommendations(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("recommendations")
            .min_width(220.0)
            .show(ctx, |ui| {
                ui.heading("Recommended Mice");
                ui.add_space(10.0);

                let Some(recommendation) = self.recommendation.clone() else {
                    ui.colored_label(
                        self.theme.text_secondary,
                        "Hold your hand flat in front of the camera",
                    );
                    return;
                };

                ui.label(
                    egui::RichText::new(recommendation.bucket.to_string().to_uppercase())
                        .size(22.0)
                        .color(self.theme.primary),
                );
                ui.label(format!("Hand length: {:.2} cm", recommendation.hand_length_cm));
                ui.separator();

                egui::ScrollArea::vertical().show(ui, |ui| {
                    for item in &recommendation.items {
                        self.render_item(ui, item);
                        ui.add_space(10.0);
                    }
                });
            });
    }

    fn render_item(&mut self, ui: &mut egui::Ui, item: &str) {
        let ctx = ui.ctx().clone();
        let assets_dir = &self.assets_dir;
        let texture = self
            .item_textures
            .entry(item.to_string())
            .or_insert_with(|| load_item_texture(&ctx, &assets_dir.join(item), item));

        if let Some(texture) = texture {
            let [w, h] = texture.size();
            let width = ui.available_width().min(ITEM_THUMBNAIL_SIZE as f32);
            let size = egui::vec2(width, width * h as f32 / w.max(1) as f32);
            let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
            ui.painter().image(
                texture.id(),
                rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        }
        ui.label(display_name(item));
    }

    fn render_main_content(&self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let overlay = self.latest.as_ref().map(|output| &output.overlay);

            ui.horizontal(|ui| match overlay.map(|o| o.measurements()) {
                Some(measurements) if !measurements.is_empty() => {
                    for m in measurements {
                        ui.label(format!("{} - {}: {}", m.from, m.to, m.cm_label()));
                        ui.separator();
                    }
                }
                _ => {
                    ui.colored_label(self.theme.text_secondary, "No hand measured");
                }
            });
            ui.add_space(6.0);

            ui::show_video(ui, self.video_texture.as_ref(), overlay, &self.theme);
        });
    }
}

fn load_item_texture(ctx: &egui::Context, path: &Path, name: &str) -> Option<egui::TextureHandle> {
    match image::open(path) {
        Ok(image) => {
            let thumbnail = image.thumbnail(ITEM_THUMBNAIL_SIZE, ITEM_THUMBNAIL_SIZE);
            Some(ctx.load_texture(name, ui::to_color_image(&thumbnail), egui::TextureOptions::LINEAR))
        }
        Err(e) => {
            tracing::warn!("Cannot load item image {}: {}", path.display(), e);
            None
        }
    }
}

// "razer-deathadder.jpg" -> "razer deathadder"
fn display_name(item: &str) -> String {
    let stem = Path::new(item)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| item.to_string());
    stem.replace(['-', '_'], " ")
}

impl eframe::App for HandSizerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_frames(ctx);

        self.render_header(ctx);
        self.render_status_bar(ctx);
        if self.show_recommendations {
            self.render_recommendations(ctx);
        }
        self.render_main_content(ctx);

        ctx.request_repaint_after(Duration::from_millis(10));
    }
}

impl Drop for HandSizerApp {
    fn drop(&mut self) {
        tracing::info!("Window closed, stopping frame loop");
        self.handle.cancel();
    }
}
