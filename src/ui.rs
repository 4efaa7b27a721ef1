// src/ui.rs - Theme and painting helpers for the video panel
use eframe::egui::{self, Color32, Pos2, Rect, Stroke, Vec2};
use hand_sizer::overlay::{Overlay, Shape};
use image::{DynamicImage, Rgb};
use nalgebra::Point2;

#[derive(Debug, Clone)]
pub struct Theme {
    pub primary: Color32,
    pub surface: Color32,
    pub error: Color32,
    pub warning: Color32,
    pub success: Color32,
    pub text_secondary: Color32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: Color32::from_rgb(70, 130, 240),
            surface: Color32::from_rgb(30, 30, 35),
            error: Color32::from_rgb(244, 67, 54),
            warning: Color32::from_rgb(255, 152, 0),
            success: Color32::from_rgb(76, 175, 80),
            text_secondary: Color32::from_rgb(200, 200, 200),
        }
    }
}

pub fn create_visuals() -> egui::Visuals {
    let mut visuals = egui::Visuals::dark();

    visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(30, 30, 35);
    visuals.widgets.inactive.bg_fill = Color32::from_rgb(45, 45, 52);
    visuals.widgets.hovered.bg_fill = Color32::from_rgb(55, 55, 65);
    visuals.widgets.active.bg_fill = Color32::from_rgb(70, 130, 240);

    visuals.widgets.noninteractive.rounding = egui::Rounding::same(8.0);
    visuals.widgets.inactive.rounding = egui::Rounding::same(8.0);
    visuals.widgets.hovered.rounding = egui::Rounding::same(8.0);
    visuals.widgets.active.rounding = egui::Rounding::same(8.0);

    visuals.window_rounding = egui::Rounding::same(12.0);
    visuals.menu_rounding = egui::Rounding::same(8.0);

    visuals
}

pub fn to_color_image(image: &DynamicImage) -> egui::ColorImage {
    let size = [image.width() as usize, image.height() as usize];
    let rgba = image.to_rgba8();
    egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw())
}

fn color(rgb: Rgb<u8>) -> Color32 {
    Color32::from_rgb(rgb[0], rgb[1], rgb[2])
}

/// Maps frame pixel coordinates onto the on-screen rectangle the frame is drawn in.
struct FrameMapping {
    rect: Rect,
    scale: Vec2,
}

impl FrameMapping {
    fn new(rect: Rect, frame_size: [usize; 2]) -> Self {
        let scale = Vec2::new(
            rect.width() / frame_size[0].max(1) as f32,
            rect.height() / frame_size[1].max(1) as f32,
        );
        Self { rect, scale }
    }

    fn pos(&self, point: &Point2<f64>) -> Pos2 {
        Pos2::new(
            self.rect.left() + point.x as f32 * self.scale.x,
            self.rect.top() + point.y as f32 * self.scale.y,
        )
    }
}

pub fn paint_overlay(painter: &egui::Painter, rect: Rect, frame_size: [usize; 2], overlay: &Overlay) {
    let mapping = FrameMapping::new(rect, frame_size);
    let painter = painter.with_clip_rect(rect);

    for shape in overlay.shapes() {
        match shape {
            Shape::Point { center, radius, color: c } => {
                painter.circle_filled(mapping.pos(center), *radius as f32 * mapping.scale.x.max(1.0), color(*c));
            }
            Shape::Line { from, to, color: c } => {
                painter.line_segment([mapping.pos(from), mapping.pos(to)], Stroke::new(2.0, color(*c)));
            }
            Shape::Text { anchor, text, color: c } => {
                painter.text(
                    mapping.pos(anchor),
                    egui::Align2::CENTER_CENTER,
                    text,
                    egui::FontId::proportional(14.0),
                    color(*c),
                );
            }
        }
    }
}

/// Video texture scaled to the available width with the overlay painted on top.
pub fn show_video(
    ui: &mut egui::Ui,
    texture: Option<&egui::TextureHandle>,
    overlay: Option<&Overlay>,
    theme: &Theme,
) {
    let available = ui.available_size();
    let aspect = texture
        .map(|t| {
            let [w, h] = t.size();
            w as f32 / h.max(1) as f32
        })
        .unwrap_or(4.0 / 3.0);
    let width = available.x.min(available.y * aspect);
    let size = Vec2::new(width, width / aspect);
    let (rect, _response) = ui.allocate_exact_size(size, egui::Sense::hover());

    match texture {
        Some(texture) => {
            ui.painter().image(
                texture.id(),
                rect,
                Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                Color32::WHITE,
            );
            if let Some(overlay) = overlay {
                paint_overlay(ui.painter(), rect, texture.size(), overlay);
            }
        }
        None => {
            ui.painter().rect_filled(rect, egui::Rounding::same(4.0), theme.surface);
            ui.painter().text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "No Video Signal",
                egui::FontId::proportional(16.0),
                theme.text_secondary,
            );
        }
    }
}
