//! Export pipeline: scene snapshot to SVG, PNG, PDF and the clipboard.
//!
//! Every artifact starts from the same standalone SVG document produced by
//! [`snapshot_svg`]. The document carries its own `<style>` block and gradient
//! definitions, so rasterizing or paginating it never depends on the live canvas.
//!
//! Notes:
//! - PNG and PDF rasterize at `RASTER_SCALE` onto the canvas background.
//! - PDF pages embed the raster as a base64 data URL and go through `svg2pdf`.

use crate::constants::{
    A4_HEIGHT_MM, A4_WIDTH_MM, ARROW_HALF_WIDTH, ARROW_LENGTH, CANVAS_BACKGROUND,
    EDGE_COLOR, EDGE_LABEL_COLOR, EDGE_LABEL_FONT_SIZE, EDGE_LABEL_PLATE_PADDING,
    EDGE_STROKE_WIDTH, EXPORT_PADDING, LABEL_FONT_FAMILY, NODE_LABEL_FONT_WEIGHT,
    NODE_STROKE_WIDTH, PAGE_MARGIN_MM, PT_PER_MM, PT_PER_PX, RASTER_SCALE,
};
use crate::scene::{NodeShape, Scene};
use crate::style::to_hex;
use crate::text::TextBlock;
use crate::types::NodeKind;
use base64::Engine as _;
use eframe::egui::{self, Color32, Vec2};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Failures of any export step. None of them touch the live diagram.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Nothing is rendered
    #[error("nothing to export: the canvas is empty")]
    EmptyScene,
    /// The snapshot could not be parsed back for rasterization
    #[error("failed to parse SVG snapshot: {0}")]
    SvgParse(String),
    /// The raster target could not be allocated
    #[error("failed to allocate a {width}x{height} pixmap")]
    PixmapAlloc {
        /// Requested width in pixels
        width: u32,
        /// Requested height in pixels
        height: u32,
    },
    /// PNG encoding failed
    #[error("failed to encode PNG: {0}")]
    PngEncode(String),
    /// PDF conversion failed
    #[error("failed to convert to PDF: {0}")]
    PdfConvert(String),
    /// Writing the artifact failed
    #[error("failed to write file: {0}")]
    Io(#[from] std::io::Error),
    /// The clipboard refused the write
    #[error("clipboard write failed: {0}")]
    Clipboard(String),
}

/// PDF page layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum PdfMode {
    /// Scale the image into an A4 page with margins
    #[default]
    FitToA4,
    /// One page exactly the size of the raster
    NativeSize,
}

impl PdfMode {
    /// Menu label.
    pub fn label(&self) -> &'static str {
        match self {
            PdfMode::FitToA4 => "Fit to A4",
            PdfMode::NativeSize => "Native size",
        }
    }
}

/// Artifact kinds written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Standalone SVG document
    Svg,
    /// 2x raster
    Png,
    /// Single-page PDF
    Pdf(PdfMode),
}

impl ExportFormat {
    /// Default file name of the artifact.
    pub fn file_name(&self) -> &'static str {
        match self {
            ExportFormat::Svg => "flowchart.svg",
            ExportFormat::Png => "flowchart.png",
            ExportFormat::Pdf(PdfMode::FitToA4) => "flowchart-a4.pdf",
            ExportFormat::Pdf(PdfMode::NativeSize) => "flowchart.pdf",
        }
    }

    /// Save-dialog filter name and extension.
    pub fn filter(&self) -> (&'static str, &'static str) {
        match self {
            ExportFormat::Svg => ("SVG", "svg"),
            ExportFormat::Png => ("PNG", "png"),
            ExportFormat::Pdf(_) => ("PDF", "pdf"),
        }
    }
}

/// Options shared by every artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// Multiplier applied to the SVG width/height attributes (1 or 2)
    pub scale: f32,
    /// Raster background
    pub background: Color32,
    /// Stylesheets whose rules are appended to the inline style block, best effort
    pub extra_stylesheets: Vec<PathBuf>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            background: CANVAS_BACKGROUND,
            extra_stylesheets: Vec::new(),
        }
    }
}

/// A serialized snapshot of the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgDocument {
    /// Complete SVG markup
    pub markup: String,
    /// viewBox width in diagram units (content + 2 x padding)
    pub view_width: f32,
    /// viewBox height in diagram units (content + 2 x padding)
    pub view_height: f32,
    /// `width` attribute (view width x scale)
    pub width: f32,
    /// `height` attribute (view height x scale)
    pub height: f32,
    /// Translation applied to the content group
    pub offset: Vec2,
}

fn kind_class(kind: NodeKind) -> &'static str {
    kind.as_str()
}

fn opacity(c: Color32) -> f32 {
    c.to_srgba_unmultiplied()[3] as f32 / 255.0
}

/// Serializes the scene into a self-contained SVG document.
///
/// The content is measured tightly, padded by `EXPORT_PADDING` on every side and
/// re-anchored so the padding is uniform.
pub fn snapshot_svg(scene: &Scene, options: &ExportOptions) -> Result<SvgDocument, ExportError> {
    let bounds = scene.content_bounds().ok_or(ExportError::EmptyScene)?;
    let view_width = bounds.width() + 2.0 * EXPORT_PADDING;
    let view_height = bounds.height() + 2.0 * EXPORT_PADDING;
    let scale = if options.scale > 0.0 { options.scale } else { 1.0 };
    let width = view_width * scale;
    let height = view_height * scale;
    let offset = egui::vec2(EXPORT_PADDING - bounds.min.x, EXPORT_PADDING - bounds.min.y);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{:.2}\" height=\"{:.2}\" viewBox=\"0 0 {:.2} {:.2}\">",
        width, height, view_width, view_height
    );

    // Definitions: one gradient per node type, one arrowhead marker
    let _ = writeln!(out, "<defs>");
    for kind in NodeKind::ALL {
        let style = scene.styles.get(kind);
        let _ = writeln!(
            out,
            "  <linearGradient id=\"fill-{}\" x1=\"0\" y1=\"0\" x2=\"0\" y2=\"1\">",
            kind_class(kind)
        );
        let _ = writeln!(
            out,
            "    <stop offset=\"0\" stop-color=\"{}\" stop-opacity=\"{:.3}\" />",
            to_hex(style.fill_top),
            opacity(style.fill_top)
        );
        let _ = writeln!(
            out,
            "    <stop offset=\"1\" stop-color=\"{}\" stop-opacity=\"{:.3}\" />",
            to_hex(style.fill_bottom),
            opacity(style.fill_bottom)
        );
        let _ = writeln!(out, "  </linearGradient>");
    }
    let _ = writeln!(
        out,
        "  <marker id=\"arrowhead\" viewBox=\"0 0 {l} {w}\" refX=\"{l}\" refY=\"{h}\" markerWidth=\"{l}\" markerHeight=\"{w}\" markerUnits=\"userSpaceOnUse\" orient=\"auto\">",
        l = ARROW_LENGTH,
        w = 2.0 * ARROW_HALF_WIDTH,
        h = ARROW_HALF_WIDTH
    );
    let _ = writeln!(
        out,
        "    <path d=\"M0,0 L{l},{h} L0,{w} Z\" fill=\"{c}\" />",
        l = ARROW_LENGTH,
        h = ARROW_HALF_WIDTH,
        w = 2.0 * ARROW_HALF_WIDTH,
        c = to_hex(EDGE_COLOR)
    );
    let _ = writeln!(out, "  </marker>");
    let _ = writeln!(out, "</defs>");

    let _ = writeln!(out, "<style><![CDATA[");
    out.push_str(&inline_stylesheet(scene));
    for extra in read_extra_stylesheets(&options.extra_stylesheets) {
        out.push_str(&extra.replace("]]>", "]]]]><![CDATA[>"));
        out.push('\n');
    }
    let _ = writeln!(out, "]]></style>");

    let _ = writeln!(
        out,
        "<g transform=\"translate({:.2},{:.2})\">",
        offset.x, offset.y
    );

    // Edges below nodes
    for edge in &scene.edges {
        let _ = writeln!(
            out,
            "  <path class=\"edge\" d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" marker-end=\"url(#arrowhead)\" />",
            edge.path.to_svg_d(Vec2::ZERO),
            to_hex(EDGE_COLOR),
            EDGE_STROKE_WIDTH
        );
    }

    for node in &scene.nodes {
        let style = scene.styles.get(node.kind);
        let class = kind_class(node.kind);
        let _ = writeln!(
            out,
            "  <g class=\"node node-{}\" id=\"node-{}\">",
            class,
            escape_xml(&node.id)
        );
        let paint = format!(
            "fill=\"url(#fill-{})\" stroke=\"{}\" stroke-opacity=\"{:.3}\" stroke-width=\"{}\"",
            class,
            to_hex(style.stroke),
            opacity(style.stroke),
            NODE_STROKE_WIDTH
        );
        let r = node.rect;
        match node.shape {
            NodeShape::Stadium => {
                let _ = writeln!(
                    out,
                    "    <rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{:.2}\" ry=\"{:.2}\" {} />",
                    r.min.x,
                    r.min.y,
                    r.width(),
                    r.height(),
                    r.height() / 2.0,
                    r.height() / 2.0,
                    paint
                );
            }
            NodeShape::Rectangle => {
                let _ = writeln!(
                    out,
                    "    <rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" {} />",
                    r.min.x,
                    r.min.y,
                    r.width(),
                    r.height(),
                    paint
                );
            }
            NodeShape::Diamond => {
                let points: Vec<String> = node
                    .outline()
                    .iter()
                    .map(|p| format!("{:.2},{:.2}", p.x, p.y))
                    .collect();
                let _ = writeln!(out, "    <polygon points=\"{}\" {} />", points.join(" "), paint);
            }
        }
        write_text(&mut out, &node.label, &format!("node-label label-{}", class));
        let _ = writeln!(out, "  </g>");
    }

    // Edge labels on top, each on a plate
    for label in scene.edges.iter().filter_map(|e| e.label.as_ref()) {
        let plate = label.bounds().expand2(egui::vec2(EDGE_LABEL_PLATE_PADDING, 1.0));
        let _ = writeln!(out, "  <g class=\"edge-label-group\">");
        let _ = writeln!(
            out,
            "    <rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"2\" fill=\"{}\" />",
            plate.min.x,
            plate.min.y,
            plate.width(),
            plate.height(),
            to_hex(CANVAS_BACKGROUND)
        );
        write_text(&mut out, label, "edge-label");
        let _ = writeln!(out, "  </g>");
    }

    let _ = writeln!(out, "</g>");
    let _ = writeln!(out, "</svg>");

    Ok(SvgDocument {
        markup: out,
        view_width,
        view_height,
        width,
        height,
        offset,
    })
}

fn write_text(out: &mut String, block: &TextBlock, class: &str) {
    let _ = writeln!(out, "    <text class=\"{}\">", class);
    for line in &block.lines {
        let _ = writeln!(
            out,
            "      <tspan x=\"{:.2}\" y=\"{:.2}\">{}</tspan>",
            block.x,
            line.y,
            escape_xml(&line.text)
        );
    }
    let _ = writeln!(out, "    </text>");
}

/// Rules that reproduce the live label styling without any external stylesheet.
fn inline_stylesheet(scene: &Scene) -> String {
    let mut css = String::new();
    let _ = writeln!(
        css,
        ".node-label {{ font-family: {}; font-weight: {}; text-anchor: middle; dominant-baseline: central; }}",
        LABEL_FONT_FAMILY, NODE_LABEL_FONT_WEIGHT
    );
    for kind in NodeKind::ALL {
        let style = scene.styles.get(kind);
        let _ = writeln!(
            css,
            ".label-{} {{ fill: {}; fill-opacity: {:.3}; font-size: {}px; }}",
            kind_class(kind),
            to_hex(style.text),
            opacity(style.text),
            style.font_size
        );
    }
    let _ = writeln!(
        css,
        ".edge-label {{ font-family: {}; font-size: {}px; fill: {}; text-anchor: middle; dominant-baseline: central; }}",
        LABEL_FONT_FAMILY,
        EDGE_LABEL_FONT_SIZE,
        to_hex(EDGE_LABEL_COLOR)
    );
    css
}

/// Reads every stylesheet that can be read; the others are logged and skipped.
fn read_extra_stylesheets(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .filter_map(|path| match std::fs::read_to_string(path) {
            Ok(css) => Some(css),
            Err(e) => {
                log::warn!("skipping stylesheet {}: {}", path.display(), e);
                None
            }
        })
        .collect()
}

fn escape_xml(input: &str) -> String {
    let mut s = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => s.push_str("&amp;"),
            '<' => s.push_str("&lt;"),
            '>' => s.push_str("&gt;"),
            '"' => s.push_str("&quot;"),
            '\'' => s.push_str("&apos;"),
            _ => s.push(ch),
        }
    }
    s
}

/// Rasterizes a snapshot at `RASTER_SCALE` onto a pixmap pre-filled with `background`.
pub fn rasterize(doc: &SvgDocument, background: Color32) -> Result<tiny_skia::Pixmap, ExportError> {
    let mut opt = usvg::Options::default();
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    opt.fontdb = Arc::new(db);

    let tree = usvg::Tree::from_data(doc.markup.as_bytes(), &opt)
        .map_err(|e| ExportError::SvgParse(e.to_string()))?;

    let out_w = (doc.view_width * RASTER_SCALE).ceil().max(1.0) as u32;
    let out_h = (doc.view_height * RASTER_SCALE).ceil().max(1.0) as u32;
    let mut pixmap = tiny_skia::Pixmap::new(out_w, out_h).ok_or(ExportError::PixmapAlloc {
        width: out_w,
        height: out_h,
    })?;
    pixmap.fill(tiny_skia::Color::from_rgba8(
        background.r(),
        background.g(),
        background.b(),
        background.a(),
    ));

    // The tree is sized by the width/height attributes, which may already be scaled.
    let size = tree.size();
    let transform = tiny_skia::Transform::from_scale(
        out_w as f32 / size.width(),
        out_h as f32 / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());
    log::debug!("rasterized snapshot to {}x{}", out_w, out_h);
    Ok(pixmap)
}

/// Encodes a pixmap as PNG.
pub fn encode_png(pixmap: &tiny_skia::Pixmap) -> Result<Vec<u8>, ExportError> {
    pixmap
        .encode_png()
        .map_err(|e| ExportError::PngEncode(e.to_string()))
}

/// Page size and image placement of a single-page PDF, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePlacement {
    /// Page width
    pub page_width: f32,
    /// Page height
    pub page_height: f32,
    /// Image left edge
    pub x: f32,
    /// Image top edge
    pub y: f32,
    /// Image width
    pub width: f32,
    /// Image height
    pub height: f32,
}

impl PagePlacement {
    /// Whether the page is wider than tall.
    pub fn is_landscape(&self) -> bool {
        self.page_width > self.page_height
    }
}

/// Centers an image of the given pixel size on an A4 page, preserving its aspect
/// ratio inside the margins. The page is landscape when the image is wider than tall.
pub fn fit_to_a4(image_width: u32, image_height: u32) -> PagePlacement {
    let ratio = image_width.max(1) as f32 / image_height.max(1) as f32;
    let (page_w, page_h) = if ratio > 1.0 {
        (A4_HEIGHT_MM, A4_WIDTH_MM)
    } else {
        (A4_WIDTH_MM, A4_HEIGHT_MM)
    };
    let avail_w = page_w - 2.0 * PAGE_MARGIN_MM;
    let avail_h = page_h - 2.0 * PAGE_MARGIN_MM;

    let mut w = avail_w;
    let mut h = w / ratio;
    if h > avail_h {
        h = avail_h;
        w = h * ratio;
    }
    let x = (page_w - w) / 2.0;
    let y = (page_h - h) / 2.0;

    PagePlacement {
        page_width: page_w * PT_PER_MM,
        page_height: page_h * PT_PER_MM,
        x: x * PT_PER_MM,
        y: y * PT_PER_MM,
        width: w * PT_PER_MM,
        height: h * PT_PER_MM,
    }
}

/// A page exactly the size of the image, with the image at the origin.
pub fn native_page(image_width: u32, image_height: u32) -> PagePlacement {
    let w = image_width as f32 * PT_PER_PX;
    let h = image_height as f32 * PT_PER_PX;
    PagePlacement {
        page_width: w,
        page_height: h,
        x: 0.0,
        y: 0.0,
        width: w,
        height: h,
    }
}

/// Builds a one-page PDF with the raster placed according to `mode`.
pub fn build_pdf(pixmap: &tiny_skia::Pixmap, mode: PdfMode) -> Result<Vec<u8>, ExportError> {
    let placement = match mode {
        PdfMode::FitToA4 => fit_to_a4(pixmap.width(), pixmap.height()),
        PdfMode::NativeSize => native_page(pixmap.width(), pixmap.height()),
    };
    let png = encode_png(pixmap)?;
    let data = base64::engine::general_purpose::STANDARD.encode(png);

    // svg2pdf maps one user unit to one point.
    let mut page = String::new();
    let _ = writeln!(
        page,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" width=\"{w:.3}\" height=\"{h:.3}\" viewBox=\"0 0 {w:.3} {h:.3}\">",
        w = placement.page_width,
        h = placement.page_height
    );
    let _ = writeln!(
        page,
        "<image x=\"{:.3}\" y=\"{:.3}\" width=\"{:.3}\" height=\"{:.3}\" preserveAspectRatio=\"none\" xlink:href=\"data:image/png;base64,{}\" />",
        placement.x, placement.y, placement.width, placement.height, data
    );
    let _ = writeln!(page, "</svg>");

    let mut opt = svg2pdf::usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    let tree = svg2pdf::usvg::Tree::from_str(&page, &opt)
        .map_err(|e| ExportError::SvgParse(e.to_string()))?;
    let pdf = svg2pdf::to_pdf(
        &tree,
        svg2pdf::ConversionOptions::default(),
        svg2pdf::PageOptions::default(),
    )
    .map_err(|e| ExportError::PdfConvert(e.to_string()))?;
    log::debug!(
        "built {} PDF page {:.0}x{:.0}pt",
        mode.label(),
        placement.page_width,
        placement.page_height
    );
    Ok(pdf)
}

/// Produces the bytes of an artifact from the live scene.
pub fn export_bytes(
    scene: &Scene,
    format: ExportFormat,
    options: &ExportOptions,
) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Svg => Ok(snapshot_svg(scene, options)?.markup.into_bytes()),
        ExportFormat::Png => {
            let doc = snapshot_svg(scene, options)?;
            encode_png(&rasterize(&doc, options.background)?)
        }
        ExportFormat::Pdf(mode) => {
            let doc = snapshot_svg(scene, options)?;
            build_pdf(&rasterize(&doc, options.background)?, mode)
        }
    }
}

/// Destination of clipboard exports.
pub trait ClipboardSink {
    /// Writes SVG markup as text.
    fn write_svg(&mut self, svg: &str) -> Result<(), ExportError>;
    /// Writes a raster image.
    fn write_image(&mut self, pixmap: &tiny_skia::Pixmap) -> Result<(), ExportError>;
}

/// Clipboard backed by the egui platform integration.
pub struct EguiClipboard<'a> {
    ctx: &'a egui::Context,
}

impl<'a> EguiClipboard<'a> {
    /// Wraps an egui context.
    pub fn new(ctx: &'a egui::Context) -> Self {
        Self { ctx }
    }
}

impl ClipboardSink for EguiClipboard<'_> {
    fn write_svg(&mut self, svg: &str) -> Result<(), ExportError> {
        self.ctx.copy_text(svg.to_owned());
        Ok(())
    }

    fn write_image(&mut self, pixmap: &tiny_skia::Pixmap) -> Result<(), ExportError> {
        let size = [pixmap.width() as usize, pixmap.height() as usize];
        // The raster is opaque (pre-filled background), so premultiplied equals straight alpha.
        let image = egui::ColorImage::from_rgba_unmultiplied(size, pixmap.data());
        self.ctx.copy_image(image);
        Ok(())
    }
}

/// Copies the SVG snapshot to the clipboard.
pub fn copy_svg(
    scene: &Scene,
    options: &ExportOptions,
    sink: &mut dyn ClipboardSink,
) -> Result<(), ExportError> {
    let doc = snapshot_svg(scene, options)?;
    sink.write_svg(&doc.markup)
}

/// Copies the 2x raster to the clipboard.
pub fn copy_png(
    scene: &Scene,
    options: &ExportOptions,
    sink: &mut dyn ClipboardSink,
) -> Result<(), ExportError> {
    let doc = snapshot_svg(scene, options)?;
    let pixmap = rasterize(&doc, options.background)?;
    sink.write_image(&pixmap)
}

/// A flag that switches itself off a fixed time after being set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransientFlag {
    set_at: Option<f64>,
}

impl TransientFlag {
    /// Turns the flag on at time `now` (seconds).
    pub fn set(&mut self, now: f64) {
        self.set_at = Some(now);
    }

    /// Whether the flag is still on at `now`.
    pub fn is_active(&self, now: f64) -> bool {
        self.set_at
            .is_some_and(|t| now - t < crate::constants::COPY_FEEDBACK_DURATION.as_secs_f64())
    }

    /// Clears the flag once it expired. Returns whether it is still on.
    pub fn tick(&mut self, now: f64) -> bool {
        let active = self.is_active(now);
        if !active {
            self.set_at = None;
        }
        active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderEngine;
    use crate::style::{ColorField, StyleChange, StyleSet};
    use crate::text::ApproxMeasure;
    use crate::types::{Diagram, Edge, Node};

    fn scene_with(styles: &StyleSet) -> Scene {
        let diagram = Diagram {
            nodes: vec![
                Node::new("s", "Start", NodeKind::Start),
                Node::new("c", "Is <it> ok?", NodeKind::Decision),
                Node::new("e", "End", NodeKind::End),
            ],
            edges: vec![Edge::new("s", "c"), Edge::new("c", "e").with_label("yes & done")],
        };
        let mut engine = RenderEngine::default();
        engine
            .render_diagram(&diagram, styles, &ApproxMeasure::default())
            .unwrap();
        engine.scene().unwrap().clone()
    }

    #[test]
    fn document_is_content_plus_uniform_padding() {
        let scene = scene_with(&StyleSet::defaults());
        let bounds = scene.content_bounds().unwrap();
        for scale in [1.0, 2.0] {
            let options = ExportOptions {
                scale,
                ..ExportOptions::default()
            };
            let doc = snapshot_svg(&scene, &options).unwrap();
            assert!((doc.view_width - (bounds.width() + 2.0 * EXPORT_PADDING)).abs() < 1e-3);
            assert!((doc.view_height - (bounds.height() + 2.0 * EXPORT_PADDING)).abs() < 1e-3);
            assert!((doc.width - doc.view_width * scale).abs() < 1e-3);
            assert!((doc.height - doc.view_height * scale).abs() < 1e-3);

            let placed = bounds.translate(doc.offset);
            assert!((placed.min.x - EXPORT_PADDING).abs() < 1e-3);
            assert!((placed.min.y - EXPORT_PADDING).abs() < 1e-3);
            assert!((doc.view_width - placed.max.x - EXPORT_PADDING).abs() < 1e-3);
            assert!((doc.view_height - placed.max.y - EXPORT_PADDING).abs() < 1e-3);
        }
    }

    #[test]
    fn document_carries_its_own_styles() {
        let mut styles = StyleSet::defaults();
        styles.apply(
            NodeKind::Decision,
            StyleChange::Color(ColorField::Text, Color32::from_rgb(0x12, 0x34, 0x56)),
        );
        styles.apply(NodeKind::Decision, StyleChange::FontSize(18));
        let doc = snapshot_svg(&scene_with(&styles), &ExportOptions::default()).unwrap();
        assert!(doc.markup.contains(".label-decision { fill: #123456; fill-opacity: 1.000; font-size: 18px; }"));
        assert!(doc.markup.contains("id=\"fill-start\""));
        assert!(doc.markup.contains("marker-end=\"url(#arrowhead)\""));
        assert!(doc.markup.contains("Is &lt;it&gt; ok?"));
        assert!(doc.markup.contains("yes &amp; done"));
    }

    #[test]
    fn translucent_colors_export_straight_channels() {
        let mut styles = StyleSet::defaults();
        let red = Color32::from_rgba_unmultiplied(255, 0, 0, 128);
        styles.apply(NodeKind::Process, StyleChange::Color(ColorField::FillTop, red));
        styles.apply(NodeKind::Decision, StyleChange::Color(ColorField::Stroke, red));
        styles.apply(NodeKind::Decision, StyleChange::Color(ColorField::Text, red));
        let doc = snapshot_svg(&scene_with(&styles), &ExportOptions::default()).unwrap();

        // Alpha is carried once, by the opacity attribute, never baked into the rgb.
        assert!(doc
            .markup
            .contains("<stop offset=\"0\" stop-color=\"#ff0000\" stop-opacity=\"0.502\" />"));
        assert!(doc
            .markup
            .contains("stroke=\"#ff0000\" stroke-opacity=\"0.502\""));
        assert!(doc
            .markup
            .contains(".label-decision { fill: #ff0000; fill-opacity: 0.502;"));
        assert!(!doc.markup.contains("#800000"));
    }

    #[test]
    fn unreadable_stylesheet_is_skipped() {
        let options = ExportOptions {
            extra_stylesheets: vec![PathBuf::from("/definitely/not/here.css")],
            ..ExportOptions::default()
        };
        let doc = snapshot_svg(&scene_with(&StyleSet::defaults()), &options).unwrap();
        assert!(doc.markup.contains(".node-label"));
    }

    #[test]
    fn empty_scene_is_an_error() {
        let scene = Scene {
            styles: StyleSet::defaults(),
            nodes: Vec::new(),
            edges: Vec::new(),
        };
        assert!(matches!(
            snapshot_svg(&scene, &ExportOptions::default()),
            Err(ExportError::EmptyScene)
        ));
    }

    #[test]
    fn wide_image_fits_landscape_a4() {
        let p = fit_to_a4(2000, 1000);
        assert!(p.is_landscape());
        assert!((p.page_width - A4_HEIGHT_MM * PT_PER_MM).abs() < 1e-2);
        // Width-bound: fills the available width, centered vertically.
        let avail_w = (A4_HEIGHT_MM - 2.0 * PAGE_MARGIN_MM) * PT_PER_MM;
        assert!((p.width - avail_w).abs() < 1e-2);
        assert!((p.width / p.height - 2.0).abs() < 1e-4);
        assert!((p.x - PAGE_MARGIN_MM * PT_PER_MM).abs() < 1e-2);
        assert!((p.y * 2.0 + p.height - p.page_height).abs() < 1e-2);
    }

    #[test]
    fn tall_image_fits_portrait_a4() {
        let p = fit_to_a4(500, 2000);
        assert!(!p.is_landscape());
        let avail_h = (A4_HEIGHT_MM - 2.0 * PAGE_MARGIN_MM) * PT_PER_MM;
        assert!((p.height - avail_h).abs() < 1e-2);
        assert!((p.width / p.height - 0.25).abs() < 1e-4);
        assert!((p.x * 2.0 + p.width - p.page_width).abs() < 1e-2);
    }

    #[test]
    fn native_page_matches_image() {
        let p = native_page(800, 600);
        assert_eq!((p.x, p.y), (0.0, 0.0));
        assert_eq!((p.width, p.height), (600.0, 450.0));
        assert!(p.is_landscape());
    }

    #[test]
    fn raster_and_pdf_signatures() {
        let scene = scene_with(&StyleSet::defaults());
        let png = export_bytes(&scene, ExportFormat::Png, &ExportOptions::default()).unwrap();
        assert!(png.starts_with(b"\x89PNG\r\n\x1a\n"));
        let pdf = export_bytes(
            &scene,
            ExportFormat::Pdf(PdfMode::FitToA4),
            &ExportOptions::default(),
        )
        .unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
    }

    #[test]
    fn raster_is_oversampled_and_opaque() {
        let scene = scene_with(&StyleSet::defaults());
        let doc = snapshot_svg(&scene, &ExportOptions::default()).unwrap();
        let pixmap = rasterize(&doc, CANVAS_BACKGROUND).unwrap();
        assert_eq!(pixmap.width(), (doc.view_width * RASTER_SCALE).ceil() as u32);
        let corner = pixmap.pixel(0, 0).unwrap();
        assert_eq!(
            (corner.red(), corner.green(), corner.blue(), corner.alpha()),
            (248, 250, 252, 255)
        );
    }

    struct Recorder {
        svg: Option<String>,
        image: Option<(u32, u32)>,
    }

    impl ClipboardSink for Recorder {
        fn write_svg(&mut self, svg: &str) -> Result<(), ExportError> {
            self.svg = Some(svg.to_string());
            Ok(())
        }

        fn write_image(&mut self, pixmap: &tiny_skia::Pixmap) -> Result<(), ExportError> {
            self.image = Some((pixmap.width(), pixmap.height()));
            Ok(())
        }
    }

    #[test]
    fn clipboard_receives_snapshot() {
        let scene = scene_with(&StyleSet::defaults());
        let mut sink = Recorder {
            svg: None,
            image: None,
        };
        copy_svg(&scene, &ExportOptions::default(), &mut sink).unwrap();
        assert!(sink.svg.as_ref().unwrap().starts_with("<svg"));
        copy_png(&scene, &ExportOptions::default(), &mut sink).unwrap();
        assert!(sink.image.is_some());
    }

    #[test]
    fn transient_flag_clears_after_two_seconds() {
        let mut flag = TransientFlag::default();
        assert!(!flag.is_active(0.0));
        flag.set(10.0);
        assert!(flag.tick(11.5));
        assert!(!flag.tick(12.1));
        assert_eq!(flag, TransientFlag::default());
    }
}
