pub mod canvas;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use self::canvas::Canvas;

/// Which way the camera that produced the preview is pointing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    /// Camera looks at the user, the overlay is mirrored horizontally.
    Front,
    #[default]
    Back,
}

/// Snapshot of the preview-to-surface mapping, taken at paint time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    width: f32,
    height: f32,
    width_scale_factor: f32,
    height_scale_factor: f32,
    facing: Facing,
}

impl Transform {
    /// Maps preview space onto a surface of the same size.
    pub fn identity(width: u32, height: u32, facing: Facing) -> Self {
        Self {
            width: width as f32,
            height: height as f32,
            width_scale_factor: 1.0,
            height_scale_factor: 1.0,
            facing,
        }
    }

    pub fn scale_x(&self, horizontal: f32) -> f32 {
        horizontal * self.width_scale_factor
    }

    pub fn scale_y(&self, vertical: f32) -> f32 {
        vertical * self.height_scale_factor
    }

    pub fn translate_x(&self, x: f32) -> f32 {
        match self.facing {
            Facing::Front => self.width - self.scale_x(x),
            Facing::Back => self.scale_x(x),
        }
    }

    pub fn translate_y(&self, y: f32) -> f32 {
        self.scale_y(y)
    }

    pub fn map_point(&self, point: Point2<f32>) -> Point2<f32> {
        Point2::new(self.translate_x(point.x), self.translate_y(point.y))
    }

    pub fn width_scale_factor(&self) -> f32 {
        self.width_scale_factor
    }

    pub fn height_scale_factor(&self) -> f32 {
        self.height_scale_factor
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn surface_size(&self) -> (f32, f32) {
        (self.width, self.height)
    }
}

/// Something that can be drawn on top of the preview.
pub trait Graphic: Send + Sync {
    fn draw(&self, canvas: &mut dyn Canvas, transform: &Transform);
}

pub type RepaintCallback = Arc<dyn Fn() + Send + Sync>;

type Graphics = Arc<Vec<Arc<dyn Graphic>>>;

struct OverlayState {
    preview_width: u32,
    preview_height: u32,
    width: u32,
    height: u32,
    width_scale_factor: f32,
    height_scale_factor: f32,
    facing: Facing,
    // copy-on-write, paint clones the Arc and draws without the lock
    graphics: Graphics,
    repaint_callback: Option<RepaintCallback>,
}

impl OverlayState {
    fn update_scale_factors(&mut self) {
        if self.preview_width == 0
            || self.preview_height == 0
            || self.width == 0
            || self.height == 0
        {
            self.width_scale_factor = 1.0;
            self.height_scale_factor = 1.0;
            return;
        }

        self.width_scale_factor = self.width as f32 / self.preview_width as f32;
        self.height_scale_factor = self.height as f32 / self.preview_height as f32;

        log::debug!(
            "overlay scale factors: width {}, height {}",
            self.width_scale_factor,
            self.height_scale_factor
        );
    }

    fn transform(&self) -> Transform {
        Transform {
            width: self.width as f32,
            height: self.height as f32,
            width_scale_factor: self.width_scale_factor,
            height_scale_factor: self.height_scale_factor,
            facing: self.facing,
        }
    }
}

fn same_graphic(a: &Arc<dyn Graphic>, b: &Arc<dyn Graphic>) -> bool {
    // compare data pointers only, vtable pointers are not unique
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Thread-safe surface holding the graphics drawn over a camera preview.
///
/// The analysis thread updates the camera info and the graphics while the UI
/// thread resizes and paints. Every mutation requests a repaint.
pub struct GraphicOverlay {
    state: Mutex<OverlayState>,
    repaint_requested: AtomicBool,
}

impl Default for GraphicOverlay {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicOverlay {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(OverlayState {
                preview_width: 0,
                preview_height: 0,
                width: 0,
                height: 0,
                width_scale_factor: 1.0,
                height_scale_factor: 1.0,
                facing: Facing::Back,
                graphics: Arc::new(Vec::new()),
                repaint_callback: None,
            }),
            repaint_requested: AtomicBool::new(false),
        }
    }

    fn state(&self) -> MutexGuard<'_, OverlayState> {
        // every critical section leaves the state consistent
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn post_invalidate(&self) {
        self.repaint_requested.store(true, Ordering::Release);
        let callback = self.state().repaint_callback.clone();
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Registers a function that is called whenever the overlay changed.
    pub fn set_repaint_callback(&self, callback: RepaintCallback) {
        self.state().repaint_callback = Some(callback);
    }

    /// Returns whether a repaint was requested since the last call or paint.
    pub fn take_repaint_request(&self) -> bool {
        self.repaint_requested.swap(false, Ordering::AcqRel)
    }

    /// Sets the size of the preview frames and the camera facing.
    pub fn set_camera_info(&self, preview_width: u32, preview_height: u32, facing: Facing) {
        {
            let mut state = self.state();
            state.preview_width = preview_width;
            state.preview_height = preview_height;
            state.facing = facing;
            state.update_scale_factors();
        }
        self.post_invalidate();
    }

    /// Called by the host when the surface size becomes known or changes.
    pub fn on_resized(&self, width: u32, height: u32) {
        {
            let mut state = self.state();
            state.width = width;
            state.height = height;
            state.update_scale_factors();
        }
        self.post_invalidate();
    }

    pub fn add(&self, graphic: Arc<dyn Graphic>) {
        {
            let mut state = self.state();
            if !state.graphics.iter().any(|g| same_graphic(g, &graphic)) {
                Arc::make_mut(&mut state.graphics).push(graphic);
            }
        }
        self.post_invalidate();
    }

    /// Removes the graphic, returns whether it was on the overlay.
    pub fn remove(&self, graphic: &Arc<dyn Graphic>) -> bool {
        let removed = {
            let mut state = self.state();
            let before = state.graphics.len();
            Arc::make_mut(&mut state.graphics).retain(|g| !same_graphic(g, graphic));
            state.graphics.len() != before
        };
        self.post_invalidate();
        removed
    }

    pub fn clear(&self) {
        self.state().graphics = Arc::new(Vec::new());
        self.post_invalidate();
    }

    /// Replaces all graphics with `graphic` in a single step.
    pub fn set_graphic(&self, graphic: Arc<dyn Graphic>) {
        self.state().graphics = Arc::new(vec![graphic]);
        self.post_invalidate();
    }

    /// Draws every graphic with the current transform and returns how many
    /// were drawn.
    pub fn paint(&self, canvas: &mut dyn Canvas) -> usize {
        self.repaint_requested.store(false, Ordering::Release);
        let (graphics, transform) = {
            let state = self.state();
            (Arc::clone(&state.graphics), state.transform())
        };

        for graphic in graphics.iter() {
            graphic.draw(canvas, &transform);
        }
        graphics.len()
    }

    pub fn transform(&self) -> Transform {
        self.state().transform()
    }

    pub fn facing(&self) -> Facing {
        self.state().facing
    }

    pub fn preview_size(&self) -> (u32, u32) {
        let state = self.state();
        (state.preview_width, state.preview_height)
    }

    pub fn size(&self) -> (u32, u32) {
        let state = self.state();
        (state.width, state.height)
    }

    pub fn len(&self) -> usize {
        self.state().graphics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
