//! Export menu: file artifacts through save dialogs, and clipboard copies.
//!
//! Every action closes the menu, whatever its outcome. Failures become
//! notifications and never touch the diagram.

use super::state::{ExportOutcome, FlowchartApp, NoticeKind};
use crate::export::{
    copy_png, copy_svg, export_bytes, EguiClipboard, ExportError, ExportFormat, ExportOptions,
    PdfMode,
};
use eframe::egui;

impl FlowchartApp {
    /// Options for the next export, from the current preferences.
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            scale: self.prefs.export_scale,
            extra_stylesheets: self.extra_stylesheets.clone(),
            ..ExportOptions::default()
        }
    }

    pub(super) fn draw_export_menu(&mut self, ctx: &egui::Context) {
        let now = ctx.input(|i| i.time);
        let mut open = self.export_menu.open;
        let mut action: Option<ExportAction> = None;

        egui::Window::new("Export")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-12.0, 48.0))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label("SVG size");
                    ui.selectable_value(&mut self.prefs.export_scale, 1.0, "1×");
                    ui.selectable_value(&mut self.prefs.export_scale, 2.0, "2×");
                });
                ui.horizontal(|ui| {
                    ui.label("PDF page");
                    for mode in [PdfMode::FitToA4, PdfMode::NativeSize] {
                        ui.selectable_value(&mut self.prefs.pdf_mode, mode, mode.label());
                    }
                });
                ui.separator();

                if ui.button("Save SVG…").clicked() {
                    action = Some(ExportAction::File(ExportFormat::Svg));
                }
                if ui.button("Save PNG…").clicked() {
                    action = Some(ExportAction::File(ExportFormat::Png));
                }
                if ui.button("Save PDF…").clicked() {
                    action = Some(ExportAction::File(ExportFormat::Pdf(self.prefs.pdf_mode)));
                }
                ui.separator();

                let svg_label = if self.export_menu.svg_copied.is_active(now) {
                    "✔ Copied"
                } else {
                    "Copy SVG"
                };
                if ui.button(svg_label).clicked() {
                    action = Some(ExportAction::CopySvg);
                }
                let png_label = if self.export_menu.png_copied.is_active(now) {
                    "✔ Copied"
                } else {
                    "Copy PNG"
                };
                if ui.button(png_label).clicked() {
                    action = Some(ExportAction::CopyPng);
                }
            });

        self.export_menu.open = open;
        if let Some(action) = action {
            self.run_export_action(ctx, action, now);
        }
    }

    /// Runs one menu action. The menu is closed whatever the outcome.
    pub(super) fn run_export_action(
        &mut self,
        ctx: &egui::Context,
        action: ExportAction,
        now: f64,
    ) {
        self.export_menu.open = false;
        match action {
            ExportAction::File(format) => self.export_to_file(format),
            ExportAction::CopySvg => {
                let result = self.with_scene(|scene, options| {
                    copy_svg(scene, options, &mut EguiClipboard::new(ctx))
                });
                if self.report_copy(result, "SVG", now) {
                    self.export_menu.svg_copied.set(now);
                }
            }
            ExportAction::CopyPng => {
                let result = self.with_scene(|scene, options| {
                    copy_png(scene, options, &mut EguiClipboard::new(ctx))
                });
                if self.report_copy(result, "PNG", now) {
                    self.export_menu.png_copied.set(now);
                }
            }
        }
    }

    fn with_scene(
        &self,
        f: impl FnOnce(&crate::scene::Scene, &ExportOptions) -> Result<(), ExportError>,
    ) -> Result<(), ExportError> {
        let scene = self.engine.scene().ok_or(ExportError::EmptyScene)?;
        f(scene, &self.export_options())
    }

    // Returns whether the copy succeeded.
    fn report_copy(&mut self, result: Result<(), ExportError>, what: &str, now: f64) -> bool {
        match result {
            Ok(()) => {
                log::info!("copied {what} to clipboard");
                true
            }
            Err(e) => {
                log::error!("clipboard copy of {what} failed: {e}");
                self.notices
                    .push(NoticeKind::Error, format!("Copy failed: {e}"), now);
                false
            }
        }
    }

    /// Renders the artifact in the background and asks where to save it.
    pub fn export_to_file(&mut self, format: ExportFormat) {
        let Some(scene) = self.engine.scene().cloned() else {
            let _ = self
                .export_sender
                .send(ExportOutcome::Failed(ExportError::EmptyScene.to_string()));
            return;
        };
        let options = self.export_options();
        let sender = self.export_sender.clone();

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("No async runtime available for export: {e}");
                let _ = sender.send(ExportOutcome::Failed("no async runtime".to_string()));
                return;
            }
        };
        handle.spawn(async move {
            let rendered =
                tokio::task::spawn_blocking(move || export_bytes(&scene, format, &options)).await;
            let bytes = match rendered {
                Ok(Ok(bytes)) => bytes,
                Ok(Err(e)) => {
                    let _ = sender.send(ExportOutcome::Failed(e.to_string()));
                    return;
                }
                Err(e) => {
                    let _ = sender.send(ExportOutcome::Failed(e.to_string()));
                    return;
                }
            };

            let (filter_name, extension) = format.filter();
            let outcome = match rfd::AsyncFileDialog::new()
                .add_filter(filter_name, &[extension])
                .set_file_name(format.file_name())
                .save_file()
                .await
            {
                Some(handle) => {
                    let path = handle.path().to_path_buf();
                    match std::fs::write(&path, &bytes) {
                        Ok(()) => ExportOutcome::Saved(format, path),
                        Err(e) => ExportOutcome::Failed(ExportError::Io(e).to_string()),
                    }
                }
                None => ExportOutcome::Cancelled,
            };
            let _ = sender.send(outcome);
        });
    }

    /// Turns finished background exports into notifications.
    pub fn poll_exports(&mut self, now: f64) {
        while let Ok(outcome) = self.export_receiver.try_recv() {
            match outcome {
                ExportOutcome::Saved(format, path) => {
                    log::info!("saved {} to {}", format.file_name(), path.display());
                    self.notices
                        .push(NoticeKind::Info, format!("Saved {}", path.display()), now);
                }
                ExportOutcome::Cancelled => log::debug!("export cancelled"),
                ExportOutcome::Failed(message) => {
                    log::error!("export failed: {message}");
                    self.notices
                        .push(NoticeKind::Error, format!("Export failed: {message}"), now);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ExportAction {
    File(ExportFormat),
    CopySvg,
    CopyPng,
}
