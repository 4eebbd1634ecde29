//! Canvas painting of the scene.
//!
//! Edges are drawn first, then nodes, then edge labels on top. All geometry is
//! mapped through the view transform here; the scene stays in diagram space.

use crate::constants::{
    ARROW_HALF_WIDTH, ARROW_LENGTH, CANVAS_BACKGROUND, EDGE_COLOR, EDGE_LABEL_COLOR,
    EDGE_LABEL_PLATE_PADDING, EDGE_STROKE_WIDTH, NODE_STROKE_WIDTH,
};
use crate::interaction::Tooltip;
use crate::scene::{Scene, SceneEdge, SceneNode};
use crate::style::NodeStyle;
use crate::text::TextBlock;
use crate::view::ViewTransform;
use eframe::egui;
use eframe::epaint::StrokeKind;

/// Paints every element of the scene.
pub fn paint_scene(painter: &egui::Painter, scene: &Scene, view: &ViewTransform) {
    for edge in &scene.edges {
        paint_edge(painter, edge, view);
    }
    for node in &scene.nodes {
        paint_node(painter, node, scene.styles.get(node.kind), view);
    }
    for label in scene.edges.iter().filter_map(|e| e.label.as_ref()) {
        paint_edge_label(painter, label, view);
    }
}

fn paint_node(painter: &egui::Painter, node: &SceneNode, style: &NodeStyle, view: &ViewTransform) {
    let outline: Vec<egui::Pos2> = node
        .outline()
        .into_iter()
        .map(|p| view.world_to_screen(p))
        .collect();
    let screen_rect = view.rect_to_screen(node.rect);

    painter.add(egui::Shape::mesh(gradient_mesh(
        &outline,
        screen_rect,
        style.fill_top,
        style.fill_bottom,
    )));
    painter.add(egui::Shape::closed_line(
        outline,
        egui::Stroke::new(NODE_STROKE_WIDTH * view.scale, style.stroke),
    ));
    paint_text(painter, &node.label, style.text, view);
}

// Fan-triangulates a convex outline, coloring every vertex by its height in `rect`.
fn gradient_mesh(
    outline: &[egui::Pos2],
    rect: egui::Rect,
    top: egui::Color32,
    bottom: egui::Color32,
) -> egui::Mesh {
    let mut mesh = egui::Mesh::default();
    if outline.len() < 3 {
        return mesh;
    }
    let color_at = |p: egui::Pos2| {
        let t = if rect.height() > 0.0 {
            ((p.y - rect.min.y) / rect.height()).clamp(0.0, 1.0)
        } else {
            0.0
        };
        lerp_color(top, bottom, t)
    };
    let center = rect.center();
    mesh.colored_vertex(center, color_at(center));
    for p in outline {
        mesh.colored_vertex(*p, color_at(*p));
    }
    let n = outline.len() as u32;
    for i in 0..n {
        mesh.add_triangle(0, 1 + i, 1 + (i + 1) % n);
    }
    mesh
}

fn lerp_color(a: egui::Color32, b: egui::Color32, t: f32) -> egui::Color32 {
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    egui::Color32::from_rgba_premultiplied(
        mix(a.r(), b.r()),
        mix(a.g(), b.g()),
        mix(a.b(), b.b()),
        mix(a.a(), b.a()),
    )
}

fn paint_edge(painter: &egui::Painter, edge: &SceneEdge, view: &ViewTransform) {
    let points: Vec<egui::Pos2> = edge
        .path
        .flatten()
        .into_iter()
        .map(|p| view.world_to_screen(p))
        .collect();
    if points.len() < 2 {
        return;
    }
    painter.add(egui::Shape::line(
        points,
        egui::Stroke::new(EDGE_STROKE_WIDTH * view.scale, EDGE_COLOR),
    ));

    if let Some((tip, dir)) = edge.path.end_direction() {
        let base = tip - dir * ARROW_LENGTH;
        let side = dir.rot90() * ARROW_HALF_WIDTH;
        let arrow = vec![tip, base + side, base - side]
            .into_iter()
            .map(|p| view.world_to_screen(p))
            .collect();
        painter.add(egui::Shape::convex_polygon(
            arrow,
            EDGE_COLOR,
            egui::Stroke::NONE,
        ));
    }
}

fn paint_edge_label(painter: &egui::Painter, label: &TextBlock, view: &ViewTransform) {
    let plate = label
        .bounds()
        .expand2(egui::vec2(EDGE_LABEL_PLATE_PADDING, 1.0));
    painter.rect_filled(view.rect_to_screen(plate), 2.0 * view.scale, CANVAS_BACKGROUND);
    paint_text(painter, label, EDGE_LABEL_COLOR, view);
}

fn paint_text(painter: &egui::Painter, block: &TextBlock, color: egui::Color32, view: &ViewTransform) {
    let font = egui::FontId::proportional(block.font_size * view.scale);
    for line in &block.lines {
        painter.text(
            view.world_to_screen(egui::pos2(block.x, line.y)),
            egui::Align2::CENTER_CENTER,
            &line.text,
            font.clone(),
            color,
        );
    }
}

/// Paints a description tooltip with its top-left corner at the tooltip anchor.
pub fn paint_tooltip(painter: &egui::Painter, tooltip: &Tooltip) {
    let style = painter.ctx().style();
    let visuals = &style.visuals;
    let galley = painter.layout(
        tooltip.text.clone(),
        egui::FontId::proportional(13.0),
        visuals.text_color(),
        280.0,
    );
    let padding = egui::vec2(8.0, 6.0);
    let rect = egui::Rect::from_min_size(tooltip.anchor, galley.size() + padding * 2.0);
    painter.rect_filled(rect, 4.0, visuals.window_fill);
    painter.rect_stroke(rect, 4.0, visuals.window_stroke, StrokeKind::Inside);
    painter.galley(rect.min + padding, galley, visuals.text_color());
}
