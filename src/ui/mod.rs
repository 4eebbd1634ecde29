//! User interface: the egui application around the render engine.
//!
//! # Module Organization
//!
//! - `state` - The `FlowchartApp` controller and its persisted preferences
//! - `canvas` - Pan, zoom, node dragging and hover on the canvas
//! - `rendering` - Painting the scene with egui shapes
//! - `style_editor` - Per-type style panel
//! - `export` - Export menu, save dialogs and clipboard

mod canvas;
mod export;
mod rendering;
mod state;
mod style_editor;

pub use state::{
    parse_stylesheet_list, stylesheets_from_env, ExportMenuState, ExportOutcome, FlowchartApp,
    Notice, NoticeKind, Notices, UiPreferences,
};

use crate::provider::{infer_with_retry, ProviderError, RetryPolicy};
use crate::samples::{all_samples, sample_script, SampleKind};
use crate::style::StyleChange;
use crate::text::{EguiMeasure, TextMeasure};
use crate::types::{Diagram, GraphDocument, NodeKind};
use eframe::egui;
use std::sync::Arc;

/// Storage key of the persisted [`UiPreferences`].
pub const PREFS_KEY: &str = "ui_prefs";

impl eframe::App for FlowchartApp {
    /// Persist UI preferences between restarts.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        match self.prefs.to_json() {
            Ok(json) => storage.set_string(PREFS_KEY, json),
            Err(err) => log::error!("Failed to serialize UI preferences: {err}"),
        }
    }

    /// Main update function called by egui for each frame.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_frame(ctx);
    }
}

impl FlowchartApp {
    /// One frame of the application, independent of the native window.
    pub fn update_frame(&mut self, ctx: &egui::Context) {
        let visuals = if self.prefs.dark_mode {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        };
        ctx.set_visuals(visuals);

        let now = ctx.input(|i| i.time);
        let measure = EguiMeasure::new(ctx);

        // New results are applied before any pointer handler sees the scene.
        self.poll_inference(&measure);
        self.poll_exports(now);
        self.notices.prune(now);

        egui::TopBottomPanel::top("top_toolbar").show(ctx, |ui| {
            self.draw_toolbar(ui);
        });

        if self.prefs.show_style_panel {
            let viewport_width = ctx.input(|i| i.content_rect().width());
            let max_width = (viewport_width * 0.5).max(200.0);
            egui::SidePanel::right("style_panel")
                .resizable(true)
                .default_width(self.prefs.style_panel_width.clamp(200.0, max_width))
                .show(ctx, |ui| {
                    self.prefs.style_panel_width = ui.available_width().clamp(200.0, max_width);
                    self.draw_style_editor(ui);
                });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(error) = &self.error {
                ui.colored_label(ui.visuals().error_fg_color, format!("⚠ {error}"));
            }
            self.draw_canvas(ui);
        });

        if self.export_menu.open {
            self.draw_export_menu(ctx);
        }
        self.draw_notices(ctx);

        let copied = self.export_menu.svg_copied.tick(now) | self.export_menu.png_copied.tick(now);
        if self.inference.in_flight.is_some() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        } else if copied || !self.notices.items.is_empty() {
            ctx.request_repaint_after(std::time::Duration::from_millis(250));
        }
    }

    fn draw_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.add(
                egui::TextEdit::multiline(&mut self.script)
                    .desired_rows(2)
                    .desired_width(420.0)
                    .hint_text("Describe a process, e.g. \"Read input then validate it\""),
            );

            let busy = self.inference.in_flight.is_some();
            let can_generate = !busy && !self.script.trim().is_empty();
            if ui
                .add_enabled(can_generate, egui::Button::new("Generate"))
                .clicked()
            {
                self.request_inference();
            }
            if busy {
                ui.spinner();
            }

            let mut chosen: Option<SampleKind> = None;
            egui::ComboBox::from_id_salt("sample_combo")
                .selected_text("Samples")
                .show_ui(ui, |ui| {
                    for info in all_samples() {
                        if ui.selectable_label(false, info.name).clicked() {
                            chosen = Some(info.kind);
                        }
                    }
                });
            if let Some(kind) = chosen {
                self.load_sample(kind);
            }

            ui.separator();

            let has_scene = self.engine.scene().is_some();
            if ui
                .add_enabled(has_scene, egui::Button::new("Export…"))
                .clicked()
            {
                self.export_menu.open = !self.export_menu.open;
            }
            ui.toggle_value(&mut self.prefs.show_style_panel, "🎨 Style");
            ui.checkbox(&mut self.prefs.dark_mode, "Dark Mode");

            if !self.functions.is_empty() {
                ui.separator();
                ui.label(format!("Functions: {}", self.functions.join(", ")))
                    .on_hover_text("Function names found in the script");
            }
        });
    }

    fn draw_notices(&mut self, ctx: &egui::Context) {
        if self.notices.items.is_empty() {
            return;
        }
        egui::Area::new(egui::Id::new("notices"))
            .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-12.0, -12.0))
            .show(ctx, |ui| {
                for notice in &self.notices.items {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        let color = match notice.kind {
                            NoticeKind::Info => ui.visuals().text_color(),
                            NoticeKind::Error => ui.visuals().error_fg_color,
                        };
                        ui.colored_label(color, &notice.text);
                    });
                }
            });
    }

    /// Starts an inference request for the current script. Earlier requests still
    /// in flight are superseded and their results dropped on arrival.
    pub fn request_inference(&mut self) {
        let tag = self.inference.tracker.next_tag();
        self.inference.in_flight = Some(tag);
        self.error = None;

        let provider = Arc::clone(&self.inference.provider);
        let script = self.script.clone();
        let sender = self.inference.sender.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                log::info!("inference request {:?} via {}", tag, provider.name());
                handle.spawn(async move {
                    let result =
                        infer_with_retry(provider.as_ref(), &script, RetryPolicy::default()).await;
                    let _ = sender.send((tag, result));
                });
            }
            Err(e) => {
                log::error!("No async runtime available for inference: {e}");
                self.inference.in_flight = None;
                self.error = Some("Inference is unavailable: no async runtime".to_string());
            }
        }
    }

    /// Applies finished inference results. Results of superseded requests are discarded.
    pub fn poll_inference(&mut self, measure: &dyn TextMeasure) {
        while let Ok((tag, result)) = self.inference.receiver.try_recv() {
            if !self.inference.tracker.is_current(tag) {
                log::debug!("discarding stale inference result {:?}", tag);
                continue;
            }
            self.inference.in_flight = None;
            match result {
                Ok(doc) => self.apply_document(doc, measure),
                Err(err) => self.reject_document(&err),
            }
        }
    }

    /// Replaces the diagram with a validated document and renders it. The view is
    /// refit on the next canvas frame.
    pub fn apply_document(&mut self, doc: GraphDocument, measure: &dyn TextMeasure) {
        if let Err(e) = doc.flowchart.validate() {
            self.reject_document(&ProviderError::Invalid(e));
            return;
        }
        self.interaction.reset();
        match self
            .engine
            .render_diagram(&doc.flowchart, &self.styles, measure)
        {
            Ok(()) => {
                self.diagram = doc.flowchart;
                self.functions = doc.functions;
                self.error = None;
            }
            Err(e) => {
                log::error!("layout failed: {e}");
                self.diagram = Diagram::default();
                self.functions.clear();
                self.engine.clear();
                self.error = Some(e.to_string());
            }
        }
    }

    /// Resets the canvas to the empty state and shows the failure in the error slot.
    pub fn reject_document(&mut self, err: &ProviderError) {
        log::warn!("rejecting graph: {err}");
        self.diagram = Diagram::default();
        self.functions.clear();
        self.engine.clear();
        self.interaction.reset();
        self.error = Some(err.user_message());
    }

    /// Applies one style edit and repaints with positions and view kept.
    pub fn apply_style_change(
        &mut self,
        kind: NodeKind,
        change: StyleChange,
        measure: &dyn TextMeasure,
    ) {
        if self.styles.apply(kind, change) {
            self.engine.restyle(&self.styles, measure);
        }
    }

    /// Restores the default styles and repaints.
    pub fn reset_styles(&mut self, measure: &dyn TextMeasure) {
        self.styles.reset();
        self.engine.restyle(&self.styles, measure);
    }

    /// Puts a sample into the script box and generates it.
    pub fn load_sample(&mut self, kind: SampleKind) {
        self.script = sample_script(kind);
        self.request_inference();
    }
}
