//! Shared application-wide constants.
//! Centralizes tweakable values used across layout, rendering, interaction and export.

use eframe::egui::Color32;
use std::time::Duration;

// Node geometry
/// Fixed node box width in diagram units.
pub const NODE_WIDTH: f32 = 150.0;
/// Fixed node box height in diagram units.
pub const NODE_HEIGHT: f32 = 60.0;
/// Stroke width used for every node outline.
pub const NODE_STROKE_WIDTH: f32 = 3.0;

// Layout oracle
/// Horizontal separation between neighbouring nodes in the same rank.
pub const NODE_SEPARATION: f32 = 50.0;
/// Vertical separation between consecutive ranks.
pub const RANK_SEPARATION: f32 = 80.0;
/// Width reserved for a virtual node carrying a long edge through a rank.
pub const VIRTUAL_NODE_WIDTH: f32 = 10.0;
/// Number of down/up barycenter sweeps used to reduce crossings.
pub const ORDERING_SWEEPS: usize = 4;

// Labels
/// Horizontal room subtracted from the node width before wrapping a label.
pub const LABEL_WRAP_PADDING: f32 = 25.0;
/// Line height of wrapped labels, in em.
pub const LINE_HEIGHT_EM: f32 = 1.1;
/// Font stack written into exported documents for every label.
pub const LABEL_FONT_FAMILY: &str = "Helvetica, Arial, sans-serif";
/// Font weight of node labels.
pub const NODE_LABEL_FONT_WEIGHT: u32 = 600;

// Edges (fixed style, independent of the node StyleSet)
/// Edge stroke color.
pub const EDGE_COLOR: Color32 = Color32::from_rgb(100, 116, 139);
/// Edge stroke width.
pub const EDGE_STROKE_WIDTH: f32 = 2.0;
/// Arrowhead length along the edge direction.
pub const ARROW_LENGTH: f32 = 10.0;
/// Half of the arrowhead base width.
pub const ARROW_HALF_WIDTH: f32 = 5.0;
/// Edge label font size.
pub const EDGE_LABEL_FONT_SIZE: f32 = 12.0;
/// Edge label text color.
pub const EDGE_LABEL_COLOR: Color32 = Color32::from_rgb(51, 65, 85);
/// Horizontal padding of the plate drawn behind edge labels.
pub const EDGE_LABEL_PLATE_PADDING: f32 = 3.0;

// Canvas
/// Background color of the diagram canvas (also the raster export background).
pub const CANVAS_BACKGROUND: Color32 = Color32::from_rgb(248, 250, 252);
/// Smallest zoom factor of the view transform.
pub const MIN_ZOOM: f32 = 0.1;
/// Largest zoom factor of the view transform.
pub const MAX_ZOOM: f32 = 4.0;
/// Auto-fit never renders a diagram larger than this factor.
pub const MAX_FIT_SCALE: f32 = 1.5;
/// Multiplicative zoom change per scroll notch.
pub const ZOOM_STEP: f32 = 1.1;
/// Screen offset of the hover tooltip from the pointer.
pub const TOOLTIP_OFFSET: (f32, f32) = (12.0, 12.0);

// Style editor
/// Smallest font size accepted by the style editor.
pub const MIN_FONT_SIZE: u32 = 8;
/// Largest font size accepted by the style editor.
pub const MAX_FONT_SIZE: u32 = 24;

// Export
/// Padding added around the content bounds of every exported document.
pub const EXPORT_PADDING: f32 = 20.0;
/// Oversampling factor used when rasterizing.
pub const RASTER_SCALE: f32 = 2.0;
/// A4 page width in millimetres (portrait).
pub const A4_WIDTH_MM: f32 = 210.0;
/// A4 page height in millimetres (portrait).
pub const A4_HEIGHT_MM: f32 = 297.0;
/// Margin kept free on every side of a fit-to-page PDF.
pub const PAGE_MARGIN_MM: f32 = 10.0;
/// Points per millimetre.
pub const PT_PER_MM: f32 = 72.0 / 25.4;
/// Points per CSS pixel.
pub const PT_PER_PX: f32 = 0.75;
/// How long a clipboard "copied" indicator stays visible.
pub const COPY_FEEDBACK_DURATION: Duration = Duration::from_secs(2);
/// How long a notification toast stays visible.
pub const NOTICE_DURATION: Duration = Duration::from_secs(5);
/// Environment variable listing stylesheets appended to exports (platform path-list syntax).
pub const EXPORT_STYLESHEETS_ENV: &str = "FLOWCHART_EXPORT_STYLESHEETS";

// Graph provider
/// Maximum number of attempts against the inference provider.
pub const MAX_PROVIDER_ATTEMPTS: u32 = 3;
/// Backoff before the first retry; doubles on every further retry.
pub const INITIAL_BACKOFF: Duration = Duration::from_millis(2000);
