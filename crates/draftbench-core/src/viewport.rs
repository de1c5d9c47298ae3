//! Viewport transform between screen and model coordinates.

use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};

/// Pan/zoom state for the infinite canvas.
///
/// `scale` is pixels per model unit; snapping tolerances arrive from the
/// host in pixels and are converted here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    /// Current translation offset (pan), in screen pixels.
    pub offset: Vec2,
    /// Current zoom level.
    pub scale: f64,
    pub min_scale: f64,
    pub max_scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            scale: 1.0,
            min_scale: 0.05,
            max_scale: 20.0,
        }
    }
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    /// The screen-from-model transform.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.scale)
    }

    /// Convert a screen point to model coordinates.
    pub fn screen_to_model(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.offset.x) / self.scale,
            (screen.y - self.offset.y) / self.scale,
        )
    }

    /// Convert a model point to screen coordinates.
    pub fn model_to_screen(&self, model: Point) -> Point {
        Point::new(
            model.x * self.scale + self.offset.x,
            model.y * self.scale + self.offset.y,
        )
    }

    /// Convert a pixel tolerance to model units at the current zoom.
    pub fn pixels_to_model(&self, pixels: f64) -> f64 {
        pixels / self.scale
    }

    /// Pan by a screen-space delta.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Zoom around a screen-space anchor so the anchored model point stays
    /// put.
    pub fn zoom_around(&mut self, anchor: Point, factor: f64) {
        let model = self.screen_to_model(anchor);
        self.scale = (self.scale * factor).clamp(self.min_scale, self.max_scale);
        let back = self.model_to_screen(model);
        self.offset += anchor - back;
    }
}
