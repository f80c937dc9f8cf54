use std::sync::{Arc, PoisonError};
use std::time::Duration;

use nalgebra::Point2;

use crate::overlay::canvas::{Canvas, Paint, PaintStyle};
use crate::overlay::GraphicOverlay;
use crate::utils::SharedState;

fn color32(paint: &Paint) -> egui::Color32 {
    let [r, g, b, a] = paint.color.0;
    egui::Color32::from_rgba_unmultiplied(r, g, b, a)
}

/// Draws overlay graphics with an egui painter, offset to the preview rect.
pub struct PainterCanvas<'a> {
    painter: &'a egui::Painter,
    origin: egui::Pos2,
}

impl<'a> PainterCanvas<'a> {
    pub fn new(painter: &'a egui::Painter, origin: egui::Pos2) -> Self {
        Self { painter, origin }
    }

    fn pos(&self, p: Point2<f32>) -> egui::Pos2 {
        self.origin + egui::vec2(p.x, p.y)
    }
}

impl Canvas for PainterCanvas<'_> {
    fn draw_circle(&mut self, center: Point2<f32>, radius: f32, paint: &Paint) {
        let center = self.pos(center);
        match paint.style {
            PaintStyle::Fill => {
                self.painter.circle_filled(center, radius, color32(paint));
            }
            PaintStyle::Stroke => {
                let stroke = egui::Stroke::new(paint.stroke_width, color32(paint));
                self.painter.circle_stroke(center, radius, stroke);
            }
        }
    }

    fn draw_line(&mut self, start: Point2<f32>, end: Point2<f32>, paint: &Paint) {
        self.painter.line_segment(
            [self.pos(start), self.pos(end)],
            egui::Stroke::new(paint.stroke_width, color32(paint)),
        );
    }
}

pub struct PoseOverlayApp {
    shared_state: SharedState,
    overlay: Arc<GraphicOverlay>,
    texture: Option<egui::TextureHandle>,
    texture_generation: u64,
}

impl PoseOverlayApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        shared_state: SharedState,
        overlay: Arc<GraphicOverlay>,
    ) -> Self {
        // new poses arrive from the analysis thread
        let ctx = cc.egui_ctx.clone();
        overlay.set_repaint_callback(Arc::new(move || ctx.request_repaint()));

        Self {
            shared_state,
            overlay,
            texture: None,
            texture_generation: 0,
        }
    }

    fn update_texture(&mut self, ctx: &egui::Context) {
        let (image, generation) = {
            let state = self
                .shared_state
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            (state.image.clone(), state.image_generation)
        };

        let Some(image) = image else {
            return;
        };
        if self.texture.is_some() && generation == self.texture_generation {
            return;
        }

        let rgba = image.to_rgba8();
        let size = [rgba.width() as usize, rgba.height() as usize];
        let ui_image = egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());

        match self.texture.as_mut() {
            Some(texture) => texture.set(ui_image, egui::TextureOptions::default()),
            None => {
                self.texture =
                    Some(ctx.load_texture("preview", ui_image, egui::TextureOptions::default()))
            }
        }
        self.texture_generation = generation;
    }
}

impl eframe::App for PoseOverlayApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_texture(ctx);

        egui::SidePanel::left("side_panel").show(ctx, |ui| {
            let state = self
                .shared_state
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            let resolution = state.resolution.unwrap_or((0, 0));
            ui.label(format!("FPS: {}", state.fps.unwrap_or(0.0)));
            ui.label(format!("Resolution: {}x{}", resolution.0, resolution.1));
            ui.label(format!("Facing: {:?}", state.facing));
            ui.label(format!("Frames: {}", state.frames_captured));
            ui.label(format!("Dropped: {}", state.frames_dropped));
            ui.label(format!("Poses: {}", state.poses_drawn));
            ui.label(format!("Failed detections: {}", state.detection_failures));
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(texture) = self.texture.as_ref() else {
                ui.label("Waiting for frames...");
                return;
            };

            // fit image to panel width, keep aspect ratio
            let [w, h] = texture.size();
            let ui_img_width = ui.available_width();
            let ui_img_height = ui_img_width * h as f32 / w.max(1) as f32;

            let response = ui.image(texture.id(), egui::vec2(ui_img_width, ui_img_height));
            let rect = response.rect;

            let size = (rect.width().round() as u32, rect.height().round() as u32);
            if self.overlay.size() != size {
                self.overlay.on_resized(size.0, size.1);
            }

            let painter = ui.painter_at(rect);
            self.overlay.paint(&mut PainterCanvas::new(&painter, rect.min));
        });

        // keep pulling preview frames at roughly the capture rate
        ctx.request_repaint_after(Duration::from_millis(1000 / 30));
    }
}
