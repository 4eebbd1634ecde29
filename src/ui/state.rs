//! Application state management structures.
//!
//! `FlowchartApp` is the single owner of the diagram, the style set and the view
//! transform. Async work (inference, file export) reports back over mpsc channels
//! that are drained once per frame.

use crate::export::{ExportFormat, PdfMode, TransientFlag};
use crate::interaction::InteractionState;
use crate::provider::{GraphProvider, OutlineProvider, ProviderError, RequestTag, RequestTracker};
use crate::render::RenderEngine;
use crate::style::StyleSet;
use crate::types::{Diagram, GraphDocument};
use crate::view::ViewTransform;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

/// UI settings that survive restarts. Diagram and styles are process-lifetime only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiPreferences {
    /// Whether dark mode visuals are enabled
    pub dark_mode: bool,
    /// Page layout used for PDF export
    pub pdf_mode: PdfMode,
    /// Width multiplier written into exported SVG documents (1 or 2)
    pub export_scale: f32,
    /// Whether the style editor panel is shown
    pub show_style_panel: bool,
    /// Remembered width of the style panel
    pub style_panel_width: f32,
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            dark_mode: false,
            pdf_mode: PdfMode::FitToA4,
            export_scale: 1.0,
            show_style_panel: true,
            style_panel_width: 260.0,
        }
    }
}

impl UiPreferences {
    /// Serializes the preferences to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes preferences from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Something succeeded
    Info,
    /// Something failed; the app keeps running
    Error,
}

/// A non-blocking notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    /// Severity
    pub kind: NoticeKind,
    /// Message
    pub text: String,
    /// Time (seconds, egui clock) after which the notice disappears
    pub expires_at: f64,
}

/// Stack of notifications shown in the bottom corner of the window.
#[derive(Debug, Clone, Default)]
pub struct Notices {
    /// Live notices, oldest first
    pub items: Vec<Notice>,
}

impl Notices {
    /// Adds a notice at time `now`.
    pub fn push(&mut self, kind: NoticeKind, text: impl Into<String>, now: f64) {
        self.items.push(Notice {
            kind,
            text: text.into(),
            expires_at: now + crate::constants::NOTICE_DURATION.as_secs_f64(),
        });
    }

    /// Drops expired notices.
    pub fn prune(&mut self, now: f64) {
        self.items.retain(|n| n.expires_at > now);
    }
}

/// Export menu state.
#[derive(Debug, Clone, Default)]
pub struct ExportMenuState {
    /// Whether the menu window is open
    pub open: bool,
    /// "Copied" indicator of the SVG clipboard action
    pub svg_copied: TransientFlag,
    /// "Copied" indicator of the PNG clipboard action
    pub png_copied: TransientFlag,
}

/// Result of a background file export.
#[derive(Debug)]
pub enum ExportOutcome {
    /// The artifact was written
    Saved(ExportFormat, PathBuf),
    /// The user dismissed the save dialog
    Cancelled,
    /// A step failed; the message is shown as a notification
    Failed(String),
}

/// Result of a background inference request, tagged with the request it answers.
pub type InferenceResult = (RequestTag, Result<GraphDocument, ProviderError>);

/// Inference request bookkeeping.
pub struct InferenceState {
    /// Provider used for new requests
    pub provider: Arc<dyn GraphProvider>,
    /// Tags issued so far
    pub tracker: RequestTracker,
    /// Tag of the request the UI is waiting for
    pub in_flight: Option<RequestTag>,
    /// Sender handed to spawned requests
    pub sender: Sender<InferenceResult>,
    /// Drained once per frame
    pub receiver: Receiver<InferenceResult>,
}

impl Default for InferenceState {
    fn default() -> Self {
        let (sender, receiver) = channel();
        Self {
            provider: Arc::new(OutlineProvider::default()),
            tracker: RequestTracker::default(),
            in_flight: None,
            sender,
            receiver,
        }
    }
}

/// The main application structure: owns the diagram, styles and view, and
/// implements `eframe::App` in the parent module.
pub struct FlowchartApp {
    /// Persisted UI preferences
    pub prefs: UiPreferences,
    /// Script text in the input box
    pub script: String,
    /// The diagram currently shown; replaced wholesale
    pub diagram: Diagram,
    /// Function names reported with the current diagram
    pub functions: Vec<String>,
    /// Per-type styles
    pub styles: StyleSet,
    /// Layout + scene owner
    pub engine: RenderEngine,
    /// Pan/zoom of the canvas
    pub view: ViewTransform,
    /// Pointer interaction state
    pub interaction: InteractionState,
    /// Top-level error slot (ingestion and inference failures)
    pub error: Option<String>,
    /// Non-blocking notifications
    pub notices: Notices,
    /// Export menu state
    pub export_menu: ExportMenuState,
    /// Inference channel and request tags
    pub inference: InferenceState,
    /// Sender handed to spawned export tasks
    pub export_sender: Sender<ExportOutcome>,
    /// Drained once per frame
    pub export_receiver: Receiver<ExportOutcome>,
    /// Stylesheets appended to exported documents
    pub extra_stylesheets: Vec<PathBuf>,
}

impl Default for FlowchartApp {
    fn default() -> Self {
        let (export_sender, export_receiver) = channel();
        Self {
            prefs: UiPreferences::default(),
            script: String::new(),
            diagram: Diagram::default(),
            functions: Vec::new(),
            styles: StyleSet::defaults(),
            engine: RenderEngine::default(),
            view: ViewTransform::default(),
            interaction: InteractionState::default(),
            error: None,
            notices: Notices::default(),
            export_menu: ExportMenuState::default(),
            inference: InferenceState::default(),
            export_sender,
            export_receiver,
            extra_stylesheets: Vec::new(),
        }
    }
}

impl FlowchartApp {
    /// Creates the app with restored preferences.
    pub fn with_preferences(prefs: UiPreferences) -> Self {
        Self {
            prefs,
            ..Default::default()
        }
    }

    /// Sets the stylesheets appended to exported documents.
    pub fn with_stylesheets(mut self, stylesheets: Vec<PathBuf>) -> Self {
        self.extra_stylesheets = stylesheets;
        self
    }

    /// Replaces the inference provider.
    pub fn with_provider(mut self, provider: Arc<dyn GraphProvider>) -> Self {
        self.inference.provider = provider;
        self
    }
}

/// Parses a path list such as the value of [`EXPORT_STYLESHEETS_ENV`]. Empty
/// entries are dropped.
///
/// [`EXPORT_STYLESHEETS_ENV`]: crate::constants::EXPORT_STYLESHEETS_ENV
pub fn parse_stylesheet_list(value: Option<&OsStr>) -> Vec<PathBuf> {
    value
        .map(|v| {
            std::env::split_paths(v)
                .filter(|p| !p.as_os_str().is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Stylesheets configured through the environment for this process.
pub fn stylesheets_from_env() -> Vec<PathBuf> {
    let value = std::env::var_os(crate::constants::EXPORT_STYLESHEETS_ENV);
    let sheets = parse_stylesheet_list(value.as_deref());
    if !sheets.is_empty() {
        log::info!("appending {} stylesheet(s) to exports", sheets.len());
    }
    sheets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stylesheet_list_splits_and_skips_empty_entries() {
        let joined = std::env::join_paths(["a.css", "", "themes/b.css"]).unwrap();
        assert_eq!(
            parse_stylesheet_list(Some(joined.as_os_str())),
            vec![PathBuf::from("a.css"), PathBuf::from("themes/b.css")]
        );
        assert!(parse_stylesheet_list(None).is_empty());
    }

    #[test]
    fn configured_stylesheets_reach_export_options() {
        let app = FlowchartApp::default().with_stylesheets(vec![PathBuf::from("print.css")]);
        assert_eq!(
            app.export_options().extra_stylesheets,
            vec![PathBuf::from("print.css")]
        );
    }
}
