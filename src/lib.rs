//! # Flowchart Studio
//!
//! Turns a textual description of a process into an interactive flowchart.
//! A graph provider infers the flowchart, a layered layout places it, and the
//! canvas renders it with per-type styles. Supports:
//! - **Layout**: top-to-bottom layered placement with routed, monotone edges
//! - **Styling**: gradient fills, stroke, text color and font size per node type
//! - **Interaction**: pan, zoom around the pointer, node dragging and description tooltips
//! - **Export**: SVG, PNG and PDF (A4 fit or native size) files, and clipboard copies
//!
//! ## Pipeline
//! 1. [`provider`] infers a [`GraphDocument`] from a script, retrying rate limits
//! 2. [`types`] validates it into a [`Diagram`]
//! 3. [`layout`] places nodes and routes edges
//! 4. [`render`] builds the drawable [`scene::Scene`]
//! 5. the UI paints the scene, and [`export`] serializes it

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod export;
pub mod interaction;
pub mod layout;
pub mod provider;
pub mod render;
pub mod samples;
pub mod scene;
pub mod style;
pub mod text;
pub mod types;
pub mod view;
mod ui;

// Re-export public types and functions
pub use types::*;
pub use ui::{
    parse_stylesheet_list, ExportMenuState, ExportOutcome, FlowchartApp, Notice, NoticeKind,
    Notices, UiPreferences,
};

/// Runs the flowchart application with default settings.
///
/// This function initializes the egui application window and starts the main event loop.
/// UI preferences saved by a previous run are restored. Inference and file export
/// run on the ambient tokio runtime, so call this from within one.
///
/// # Returns
///
/// Returns `Ok(())` if the application runs successfully, or an `eframe::Error` if
/// initialization fails.
///
/// # Example
///
/// ```no_run
/// #[tokio::main]
/// async fn main() -> Result<(), eframe::Error> {
///     flowchart_studio::run_app()
/// }
/// ```
pub fn run_app() -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1280.0, 820.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Flowchart Studio",
        options,
        Box::new(|cc| {
            let prefs = cc
                .storage
                .and_then(|storage| storage.get_string(ui::PREFS_KEY))
                .and_then(|json| match UiPreferences::from_json(&json) {
                    Ok(prefs) => Some(prefs),
                    Err(err) => {
                        log::warn!("Ignoring unreadable UI preferences: {err}");
                        None
                    }
                })
                .unwrap_or_default();
            Ok(Box::new(
                FlowchartApp::with_preferences(prefs).with_stylesheets(ui::stylesheets_from_env()),
            ))
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagram_default() {
        let diagram = Diagram::default();
        assert!(diagram.nodes.is_empty());
        assert!(diagram.edges.is_empty());
        assert!(diagram.validate().is_ok());
    }

    #[test]
    fn app_starts_with_saved_preferences() {
        let prefs = UiPreferences {
            dark_mode: true,
            ..Default::default()
        };
        let app = FlowchartApp::with_preferences(prefs.clone());
        assert_eq!(app.prefs, prefs);
        assert!(app.engine.scene().is_none());
    }
}
