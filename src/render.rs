//! Render engine: turns a laid-out diagram into the live [`Scene`].
//!
//! A render is a full rebuild. Nothing from the previous scene survives except
//! what the caller explicitly keeps (the layout for a restyle, the view transform
//! for anything that is not a new diagram).

use crate::constants::{EDGE_LABEL_FONT_SIZE, LABEL_WRAP_PADDING};
use crate::layout::{GraphLayout, LayoutAdapter, LayoutEdge, LayoutError};
use crate::scene::{EdgePath, NodeShape, Scene, SceneEdge, SceneNode};
use crate::style::StyleSet;
use crate::text::{TextBlock, TextMeasure};
use crate::types::Diagram;
use crate::view::ViewTransform;
use eframe::egui::{self, Pos2, Rect};

/// Bisection steps when clipping an edge end to a node outline.
const CLIP_ITERATIONS: usize = 24;

/// Builds the scene for a layout with the given styles.
pub fn build_scene(layout: &GraphLayout, styles: &StyleSet, measure: &dyn TextMeasure) -> Scene {
    let nodes: Vec<SceneNode> = layout
        .nodes
        .values()
        .map(|node| {
            let style = styles.get(node.kind);
            let rect = node.rect();
            SceneNode {
                id: node.id.clone(),
                kind: node.kind,
                shape: NodeShape::for_kind(node.kind),
                rect,
                label: TextBlock::wrapped(
                    &node.label,
                    rect.center(),
                    node.width - LABEL_WRAP_PADDING,
                    style.font_size as f32,
                    measure,
                ),
                description: node.description.clone(),
            }
        })
        .collect();

    let mut scene = Scene {
        styles: styles.clone(),
        nodes,
        edges: Vec::with_capacity(layout.edges.len()),
    };
    for edge in &layout.edges {
        let built = build_edge(&scene, edge, measure);
        scene.edges.push(built);
    }
    scene
}

/// Builds one edge: a monotone curve through the routing points, trimmed so
/// that it leaves the source outline and ends on the target outline.
pub fn build_edge(scene: &Scene, edge: &LayoutEdge, measure: &dyn TextMeasure) -> SceneEdge {
    let mut points = edge.points.clone();
    if let Some(source) = scene.node(&edge.source) {
        clip_start(&mut points, source);
    }
    if let Some(target) = scene.node(&edge.target) {
        points.reverse();
        clip_start(&mut points, target);
        points.reverse();
    }

    let label = edge.label.as_deref().filter(|l| !l.is_empty()).map(|text| {
        let anchor = edge.label_anchor - egui::vec2(0.0, 0.5 * EDGE_LABEL_FONT_SIZE);
        TextBlock::single_line(text, anchor, EDGE_LABEL_FONT_SIZE, measure)
    });

    SceneEdge {
        source: edge.source.clone(),
        target: edge.target.clone(),
        path: EdgePath::monotone_y(&points),
        label,
    }
}

// Replaces points[0] with the point where the first segment crosses the node outline,
// if it starts inside the node and leaves it.
fn clip_start(points: &mut [Pos2], node: &SceneNode) {
    let [first, second, ..] = points else {
        return;
    };
    if !node.contains(*first) || node.contains(*second) {
        return;
    }
    let (mut inside, mut outside) = (*first, *second);
    for _ in 0..CLIP_ITERATIONS {
        let mid = inside + (outside - inside) * 0.5;
        if node.contains(mid) {
            inside = mid;
        } else {
            outside = mid;
        }
    }
    *first = inside;
}

/// Owns the current layout and scene, and decides when the view must be refit.
#[derive(Default)]
pub struct RenderEngine {
    adapter: LayoutAdapter,
    layout: Option<GraphLayout>,
    scene: Option<Scene>,
    pending_fit: bool,
}

impl RenderEngine {
    /// Creates an engine around a layout adapter.
    pub fn new(adapter: LayoutAdapter) -> Self {
        Self {
            adapter,
            layout: None,
            scene: None,
            pending_fit: false,
        }
    }

    /// Lays out and renders a new diagram, replacing all prior content.
    /// An empty diagram clears the canvas. The next [`take_fit`](Self::take_fit) refits the view.
    pub fn render_diagram(
        &mut self,
        diagram: &Diagram,
        styles: &StyleSet,
        measure: &dyn TextMeasure,
    ) -> Result<(), LayoutError> {
        self.clear();
        let Some(layout) = self.adapter.run(diagram)? else {
            log::info!("empty diagram, canvas cleared");
            return Ok(());
        };
        let scene = build_scene(&layout, styles, measure);
        log::info!(
            "rendered {} nodes and {} edges",
            scene.nodes.len(),
            scene.edges.len()
        );
        self.layout = Some(layout);
        self.scene = Some(scene);
        self.pending_fit = true;
        Ok(())
    }

    /// Rebuilds the scene from the current layout with new styles. Node positions,
    /// including dragged ones, and the view transform are kept.
    pub fn restyle(&mut self, styles: &StyleSet, measure: &dyn TextMeasure) {
        if let Some(layout) = &self.layout {
            self.scene = Some(build_scene(layout, styles, measure));
        }
    }

    /// Drops the layout and scene.
    pub fn clear(&mut self) {
        self.layout = None;
        self.scene = None;
        self.pending_fit = false;
    }

    /// Current layout, if a diagram is rendered.
    pub fn layout(&self) -> Option<&GraphLayout> {
        self.layout.as_ref()
    }

    /// Current scene, if a diagram is rendered.
    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    /// Returns the auto-fit transform for `viewport` once per new diagram.
    pub fn take_fit(&mut self, viewport: Rect) -> Option<ViewTransform> {
        if !self.pending_fit {
            return None;
        }
        let bounds = self.scene.as_ref()?.content_bounds()?;
        self.pending_fit = false;
        Some(ViewTransform::fit(bounds, viewport))
    }

    /// Moves a node to `center` and rebuilds only the affected part of the scene.
    pub fn drag_node(&mut self, node_id: &str, center: Pos2, measure: &dyn TextMeasure) {
        let (Some(layout), Some(scene)) = (self.layout.as_mut(), self.scene.as_mut()) else {
            return;
        };
        let touched = crate::interaction::move_node(layout, node_id, center);
        if let Some(node) = scene.node_mut(node_id) {
            node.move_to(center);
        }
        for i in touched {
            let rebuilt = build_edge(scene, &layout.edges[i], measure);
            scene.edges[i] = rebuilt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MAX_FIT_SCALE;
    use crate::scene::PathSegment;
    use crate::style::StyleChange;
    use crate::text::ApproxMeasure;
    use crate::types::{Edge, Node, NodeKind};

    fn linear() -> Diagram {
        Diagram {
            nodes: vec![
                Node::new("s", "Start", NodeKind::Start),
                Node::new("p", "Do the thing", NodeKind::Process),
                Node::new("d", "Done?", NodeKind::Decision),
                Node::new("e", "End", NodeKind::End),
            ],
            edges: vec![
                Edge::new("s", "p"),
                Edge::new("p", "d"),
                Edge::new("d", "e").with_label("yes"),
            ],
        }
    }

    #[test]
    fn renders_one_shape_per_node_and_one_path_per_edge() {
        let mut engine = RenderEngine::default();
        let m = ApproxMeasure::default();
        engine.render_diagram(&linear(), &StyleSet::defaults(), &m).unwrap();
        let scene = engine.scene().unwrap();

        let shapes: Vec<NodeShape> = scene.nodes.iter().map(|n| n.shape).collect();
        assert_eq!(
            shapes,
            vec![
                NodeShape::Stadium,
                NodeShape::Rectangle,
                NodeShape::Diamond,
                NodeShape::Stadium
            ]
        );
        assert_eq!(scene.edges.len(), 3);
        assert!(scene.edges[2].label.is_some());
        assert!(scene.edges[0].label.is_none());

        let viewport = Rect::from_min_size(Pos2::ZERO, egui::vec2(1200.0, 900.0));
        let fit = engine.take_fit(viewport).unwrap();
        assert!(fit.scale <= MAX_FIT_SCALE);
        assert!(engine.take_fit(viewport).is_none());
    }

    #[test]
    fn render_is_deterministic() {
        let m = ApproxMeasure::default();
        let mut a = RenderEngine::default();
        let mut b = RenderEngine::default();
        a.render_diagram(&linear(), &StyleSet::defaults(), &m).unwrap();
        b.render_diagram(&linear(), &StyleSet::defaults(), &m).unwrap();
        a.render_diagram(&linear(), &StyleSet::defaults(), &m).unwrap();
        assert_eq!(a.scene(), b.scene());
    }

    #[test]
    fn empty_diagram_clears_canvas() {
        let m = ApproxMeasure::default();
        let mut engine = RenderEngine::default();
        engine.render_diagram(&linear(), &StyleSet::defaults(), &m).unwrap();
        engine.render_diagram(&Diagram::default(), &StyleSet::defaults(), &m).unwrap();
        assert!(engine.scene().is_none());
        assert!(engine.layout().is_none());
        assert!(engine.take_fit(Rect::from_min_size(Pos2::ZERO, egui::vec2(10.0, 10.0))).is_none());
    }

    #[test]
    fn restyle_keeps_dragged_positions() {
        let m = ApproxMeasure::default();
        let mut engine = RenderEngine::default();
        let mut styles = StyleSet::defaults();
        engine.render_diagram(&linear(), &styles, &m).unwrap();
        let viewport = Rect::from_min_size(Pos2::ZERO, egui::vec2(800.0, 600.0));
        engine.take_fit(viewport);

        let moved = egui::pos2(500.0, 40.0);
        engine.drag_node("p", moved, &m);
        styles.apply(NodeKind::Process, StyleChange::FontSize(20));
        engine.restyle(&styles, &m);

        let scene = engine.scene().unwrap();
        let p = scene.node("p").unwrap();
        assert_eq!(p.rect.center(), moved);
        assert_eq!(p.label.font_size, 20.0);
        assert_eq!(scene.styles, styles);
        assert!(engine.take_fit(viewport).is_none());
    }

    #[test]
    fn edges_end_on_target_outline() {
        let m = ApproxMeasure::default();
        let mut engine = RenderEngine::default();
        engine.render_diagram(&linear(), &StyleSet::defaults(), &m).unwrap();
        engine.drag_node("e", egui::pos2(600.0, 600.0), &m);
        let scene = engine.scene().unwrap();
        let edge = &scene.edges[2];
        assert!(matches!(edge.path.segments.last(), Some(PathSegment::LineTo(_))));
        let (tip, _) = edge.path.end_direction().unwrap();
        let target = scene.node("e").unwrap();
        assert!(target.rect.expand(0.5).contains(tip));
        assert!((tip - target.rect.center()).length() > 20.0);
    }
}
