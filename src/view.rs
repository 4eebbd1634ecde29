//! Pan/zoom transform between diagram space and screen space.

use crate::constants::{MAX_FIT_SCALE, MAX_ZOOM, MIN_ZOOM};
use eframe::egui::{self, Pos2, Rect, Vec2};

/// Maps diagram coordinates to screen coordinates: `screen = world * scale + translate`.
///
/// Applied once to the whole scene when painting, so panning and zooming cost the
/// same regardless of diagram size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    /// Screen-space offset of the diagram origin
    pub translate: Vec2,
    /// Zoom factor, always within `MIN_ZOOM..=MAX_ZOOM`
    pub scale: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            translate: Vec2::ZERO,
            scale: 1.0,
        }
    }
}

impl ViewTransform {
    /// Creates a transform, clamping the scale.
    pub fn new(translate: Vec2, scale: f32) -> Self {
        Self {
            translate,
            scale: scale.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    /// Diagram space to screen space.
    pub fn world_to_screen(&self, world: Pos2) -> Pos2 {
        world * self.scale + self.translate
    }

    /// Screen space to diagram space.
    pub fn screen_to_world(&self, screen: Pos2) -> Pos2 {
        (screen - self.translate) / self.scale
    }

    /// Diagram-space rectangle in screen space.
    pub fn rect_to_screen(&self, rect: Rect) -> Rect {
        Rect::from_min_max(self.world_to_screen(rect.min), self.world_to_screen(rect.max))
    }

    /// Moves the view by a screen-space delta.
    pub fn pan_by(&mut self, delta: Vec2) {
        self.translate += delta;
    }

    /// Multiplies the scale by `factor` (clamped), keeping the diagram point under
    /// `pointer` fixed on screen. Returns whether the scale changed.
    pub fn zoom_at(&mut self, pointer: Pos2, factor: f32) -> bool {
        let world_before = self.screen_to_world(pointer);
        let old_scale = self.scale;
        self.scale = (self.scale * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        if (self.scale - old_scale).abs() <= f32::EPSILON {
            return false;
        }
        let screen_after = self.world_to_screen(world_before);
        self.translate += pointer - screen_after;
        true
    }

    /// Transform that shows `bounds` centered in `viewport`, never magnifying past
    /// `MAX_FIT_SCALE`.
    pub fn fit(bounds: Rect, viewport: Rect) -> Self {
        let graph = bounds.size();
        let avail = viewport.size();
        if graph.x <= 0.0 || graph.y <= 0.0 || avail.x <= 0.0 || avail.y <= 0.0 {
            return Self {
                translate: viewport.center() - bounds.center(),
                scale: 1.0,
            };
        }
        let scale = (avail.x / graph.x)
            .min(avail.y / graph.y)
            .min(MAX_FIT_SCALE)
            .clamp(MIN_ZOOM, MAX_ZOOM);
        let translate = viewport.center() - bounds.center().to_vec2() * scale;
        Self {
            translate: translate.to_vec2(),
            scale,
        }
    }
}

/// Zoom factor for one frame of scroll input.
pub fn zoom_factor_for_scroll(scroll_y: f32) -> f32 {
    if scroll_y > 0.0 {
        crate::constants::ZOOM_STEP
    } else if scroll_y < 0.0 {
        1.0 / crate::constants::ZOOM_STEP
    } else {
        1.0
    }
}

/// Screen-space position of a tooltip for a pointer position.
pub fn tooltip_anchor(pointer: Pos2) -> Pos2 {
    let (dx, dy) = crate::constants::TOOLTIP_OFFSET;
    pointer + egui::vec2(dx, dy)
}
