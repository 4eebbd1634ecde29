//! Canvas interaction handling.
//!
//! This module handles canvas panning, zooming, node dragging and hover
//! tooltips. Pointer positions are mapped to diagram space through the view
//! transform; the scene itself is never moved to follow the view.

use super::rendering;
use super::state::FlowchartApp;
use crate::constants;
use crate::interaction::DragSession;
use crate::text::EguiMeasure;
use crate::view::{zoom_factor_for_scroll, ViewTransform};
use eframe::egui;

impl FlowchartApp {
    /// Converts screen coordinates to diagram coordinates.
    pub fn screen_to_world(&self, screen_pos: egui::Pos2) -> egui::Pos2 {
        self.view.screen_to_world(screen_pos)
    }

    /// Converts diagram coordinates to screen coordinates.
    pub fn world_to_screen(&self, world_pos: egui::Pos2) -> egui::Pos2 {
        self.view.world_to_screen(world_pos)
    }

    /// Draws the canvas and handles all pointer interaction on it.
    pub fn draw_canvas(&mut self, ui: &mut egui::Ui) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let canvas_rect = response.rect;
        painter.rect_filled(canvas_rect, 0.0, constants::CANVAS_BACKGROUND);

        if let Some(fit) = self.engine.take_fit(canvas_rect) {
            log::debug!("auto-fit to scale {:.3}", fit.scale);
            self.view = fit;
        }
        if response.double_clicked() {
            self.fit_view(canvas_rect);
        }

        self.handle_canvas_zoom(ui, &response);
        self.handle_node_dragging(ui, &response);
        self.handle_canvas_panning(ui, &response);
        self.update_hover(ui, &response);

        let painter = painter.with_clip_rect(canvas_rect);
        match self.engine.scene() {
            Some(scene) => rendering::paint_scene(&painter, scene, &self.view),
            None => {
                let hint = if self.inference.in_flight.is_some() {
                    "Generating…"
                } else {
                    "Describe a process above and press Generate"
                };
                painter.text(
                    canvas_rect.center(),
                    egui::Align2::CENTER_CENTER,
                    hint,
                    egui::FontId::proportional(16.0),
                    egui::Color32::from_gray(120),
                );
            }
        }

        if let Some(tooltip) = &self.interaction.hover.tooltip {
            rendering::paint_tooltip(&painter, tooltip);
        }
    }

    /// Handles canvas panning: primary drag on empty canvas, or middle drag anywhere.
    pub fn handle_canvas_panning(&mut self, ui: &mut egui::Ui, response: &egui::Response) {
        let should_pan = self.interaction.drag.is_none()
            && ui.input(|i| i.pointer.primary_down() || i.pointer.middle_down());

        if should_pan {
            if let Some(current_pos) = response.interact_pointer_pos() {
                if !self.interaction.is_panning {
                    self.interaction.is_panning = true;
                    self.interaction.last_pan_pos = Some(current_pos);
                } else if let Some(last_pos) = self.interaction.last_pan_pos {
                    self.view.pan_by(current_pos - last_pos);
                    self.interaction.last_pan_pos = Some(current_pos);
                }
            }
        } else {
            self.interaction.is_panning = false;
            self.interaction.last_pan_pos = None;
        }
    }

    /// Handles scroll wheel zooming around the pointer. Only zooms if the cursor
    /// is over the canvas.
    pub fn handle_canvas_zoom(&mut self, ui: &mut egui::Ui, response: &egui::Response) {
        let scroll_delta = ui.input(|i| i.smooth_scroll_delta.y);
        if scroll_delta == 0.0 {
            return;
        }
        let mouse_pos = ui
            .input(|i| i.pointer.hover_pos())
            .or_else(|| response.interact_pointer_pos());
        if let Some(mouse_pos) = mouse_pos {
            if response.rect.contains(mouse_pos) {
                self.view.zoom_at(mouse_pos, zoom_factor_for_scroll(scroll_delta));
            }
        }
    }

    /// Handles node dragging with the primary button.
    ///
    /// A press on a node starts a session that owns the node's position until
    /// release; a press on empty canvas leaves the gesture to panning.
    pub fn handle_node_dragging(&mut self, ui: &mut egui::Ui, response: &egui::Response) {
        if !ui.input(|i| i.pointer.primary_down()) {
            if let Some(session) = self.interaction.drag.take() {
                log::debug!("drag end on `{}`", session.node_id);
            }
            return;
        }
        if self.interaction.is_panning {
            return;
        }
        let Some(current_pos) = response.interact_pointer_pos() else {
            return;
        };
        let world_pos = self.screen_to_world(current_pos);

        match &self.interaction.drag {
            None => {
                if let Some(scene) = self.engine.scene() {
                    self.interaction.drag = DragSession::begin(scene, world_pos);
                }
            }
            Some(session) => {
                let node_id = session.node_id.clone();
                let center = session.target_center(world_pos);
                let measure = EguiMeasure::new(ui.ctx());
                self.engine.drag_node(&node_id, center, &measure);
            }
        }
    }

    /// Updates the hovered node and its tooltip from the current pointer.
    pub fn update_hover(&mut self, ui: &mut egui::Ui, response: &egui::Response) {
        let Some(scene) = self.engine.scene() else {
            self.interaction.hover.clear();
            return;
        };
        let pointer = ui
            .input(|i| i.pointer.hover_pos())
            .filter(|p| response.rect.contains(*p))
            .map(|screen| (self.view.screen_to_world(screen), screen));
        self.interaction.hover.update(scene, pointer);
    }

    /// Refits the view to the current scene.
    pub fn fit_view(&mut self, viewport: egui::Rect) {
        if let Some(bounds) = self.engine.scene().and_then(|s| s.content_bounds()) {
            self.view = ViewTransform::fit(bounds, viewport);
        }
    }
}
