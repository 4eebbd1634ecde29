//! In-memory scene graph of the live canvas.
//!
//! The render engine produces a [`Scene`]; the egui canvas paints it and the export
//! pipeline snapshots and serializes it. Keeping both consumers on the same scene
//! is what makes exported artifacts match the screen.

use crate::style::StyleSet;
use crate::text::TextBlock;
use crate::types::{NodeId, NodeKind};
use eframe::egui::{self, Pos2, Rect, Vec2};
use std::f32::consts::PI;

/// Number of segments used to approximate each semicircular cap of a stadium.
const CAP_SEGMENTS: usize = 12;
/// Number of samples per cubic segment when flattening a path.
const CUBIC_SAMPLES: usize = 12;

/// Outline of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    /// Rounded rectangle with semicircular caps
    Stadium,
    /// Diamond with vertices at the box edge midpoints
    Diamond,
    /// Plain rectangle
    Rectangle,
}

impl NodeShape {
    /// Shape used for a node type.
    pub fn for_kind(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Start | NodeKind::End => NodeShape::Stadium,
            NodeKind::Decision => NodeShape::Diamond,
            NodeKind::Process => NodeShape::Rectangle,
        }
    }

    /// Convex outline polygon of the shape in the given box, clockwise from the top.
    pub fn outline(&self, rect: Rect) -> Vec<Pos2> {
        match self {
            NodeShape::Rectangle => vec![
                rect.left_top(),
                rect.right_top(),
                rect.right_bottom(),
                rect.left_bottom(),
            ],
            NodeShape::Diamond => vec![
                rect.center_top(),
                rect.right_center(),
                rect.center_bottom(),
                rect.left_center(),
            ],
            NodeShape::Stadium => {
                let r = rect.height().min(rect.width()) / 2.0;
                let right_c = egui::pos2(rect.right() - r, rect.center().y);
                let left_c = egui::pos2(rect.left() + r, rect.center().y);
                let mut points = Vec::with_capacity(2 * (CAP_SEGMENTS + 1));
                // Right cap from top to bottom, then left cap from bottom to top.
                for i in 0..=CAP_SEGMENTS {
                    let a = -PI / 2.0 + PI * i as f32 / CAP_SEGMENTS as f32;
                    points.push(right_c + r * Vec2::angled(a));
                }
                for i in 0..=CAP_SEGMENTS {
                    let a = PI / 2.0 + PI * i as f32 / CAP_SEGMENTS as f32;
                    points.push(left_c + r * Vec2::angled(a));
                }
                points
            }
        }
    }

    /// Whether `p` lies inside the shape drawn in `rect`.
    pub fn contains(&self, rect: Rect, p: Pos2) -> bool {
        match self {
            NodeShape::Rectangle => rect.contains(p),
            NodeShape::Diamond => {
                let c = rect.center();
                let dx = (p.x - c.x).abs() / (rect.width() / 2.0);
                let dy = (p.y - c.y).abs() / (rect.height() / 2.0);
                dx + dy <= 1.0
            }
            NodeShape::Stadium => {
                if !rect.contains(p) {
                    return false;
                }
                let r = rect.height().min(rect.width()) / 2.0;
                let cx = p.x.clamp(rect.left() + r, rect.right() - r);
                (p - egui::pos2(cx, rect.center().y)).length() <= r
            }
        }
    }
}

/// One drawing command of an edge path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    /// Start a new subpath
    MoveTo(Pos2),
    /// Straight line
    LineTo(Pos2),
    /// Cubic bezier with two control points
    CubicTo(Pos2, Pos2, Pos2),
}

/// An open path made of lines and cubic curves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgePath {
    /// Drawing commands in order
    pub segments: Vec<PathSegment>,
}

impl EdgePath {
    /// Smooth curve through `points` that stays monotone along the y axis.
    ///
    /// This is the monotone cubic interpolation of Steffen (d3 `curveMonotoneY`),
    /// computed with x and y swapped so that top-to-bottom edges never overshoot
    /// between ranks.
    pub fn monotone_y(points: &[Pos2]) -> Self {
        // Work in the swapped system: u = y (monotone axis), v = x.
        let mut pts: Vec<(f32, f32)> = Vec::with_capacity(points.len());
        for p in points {
            if pts.last() != Some(&(p.y, p.x)) {
                pts.push((p.y, p.x));
            }
        }
        let to_pos = |u: f32, v: f32| egui::pos2(v, u);

        let mut segments = Vec::with_capacity(pts.len());
        match pts.len() {
            0 => return Self { segments },
            1 => {
                segments.push(PathSegment::MoveTo(to_pos(pts[0].0, pts[0].1)));
                return Self { segments };
            }
            2 => {
                segments.push(PathSegment::MoveTo(to_pos(pts[0].0, pts[0].1)));
                segments.push(PathSegment::LineTo(to_pos(pts[1].0, pts[1].1)));
                return Self { segments };
            }
            _ => {}
        }

        let n = pts.len();
        let mut tangents = vec![0.0f32; n];
        for i in 1..n - 1 {
            tangents[i] = slope3(pts[i - 1], pts[i], pts[i + 1]);
        }
        tangents[0] = slope2(pts[0], pts[1], tangents[1]);
        tangents[n - 1] = slope2(pts[n - 2], pts[n - 1], tangents[n - 2]);

        segments.push(PathSegment::MoveTo(to_pos(pts[0].0, pts[0].1)));
        for i in 0..n - 1 {
            let (u0, v0) = pts[i];
            let (u1, v1) = pts[i + 1];
            let du = (u1 - u0) / 3.0;
            segments.push(PathSegment::CubicTo(
                to_pos(u0 + du, v0 + du * tangents[i]),
                to_pos(u1 - du, v1 - du * tangents[i + 1]),
                to_pos(u1, v1),
            ));
        }
        Self { segments }
    }

    /// Straight polyline through `points`.
    pub fn polyline(points: &[Pos2]) -> Self {
        let segments = points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                if i == 0 {
                    PathSegment::MoveTo(*p)
                } else {
                    PathSegment::LineTo(*p)
                }
            })
            .collect();
        Self { segments }
    }

    /// Approximates the path by a polyline.
    pub fn flatten(&self) -> Vec<Pos2> {
        let mut out = Vec::new();
        let mut cursor = Pos2::ZERO;
        for seg in &self.segments {
            match *seg {
                PathSegment::MoveTo(p) | PathSegment::LineTo(p) => {
                    out.push(p);
                    cursor = p;
                }
                PathSegment::CubicTo(c1, c2, p) => {
                    for s in 1..=CUBIC_SAMPLES {
                        let t = s as f32 / CUBIC_SAMPLES as f32;
                        out.push(cubic_point(cursor, c1, c2, p, t));
                    }
                    cursor = p;
                }
            }
        }
        out
    }

    /// End point and unit direction of travel at the end of the path.
    pub fn end_direction(&self) -> Option<(Pos2, Vec2)> {
        let mut prev = None;
        let mut last = None;
        for seg in &self.segments {
            match *seg {
                PathSegment::MoveTo(p) | PathSegment::LineTo(p) => {
                    prev = last;
                    last = Some(p);
                }
                PathSegment::CubicTo(_, c2, p) => {
                    // The tangent at t=1 points from the second control point to the end.
                    prev = if c2 != p { Some(c2) } else { last };
                    last = Some(p);
                }
            }
        }
        let (from, to) = (prev?, last?);
        let dir = to - from;
        (dir.length() > f32::EPSILON).then(|| (to, dir.normalized()))
    }

    /// Bounding box of the flattened path.
    pub fn bounds(&self) -> Rect {
        Rect::from_points(&self.flatten())
    }

    /// SVG path data (`d` attribute) with coordinates shifted by `offset`.
    pub fn to_svg_d(&self, offset: Vec2) -> String {
        use std::fmt::Write as _;
        let mut d = String::new();
        for seg in &self.segments {
            let _ = match *seg {
                PathSegment::MoveTo(p) => {
                    let p = p + offset;
                    write!(d, "M{:.2},{:.2}", p.x, p.y)
                }
                PathSegment::LineTo(p) => {
                    let p = p + offset;
                    write!(d, "L{:.2},{:.2}", p.x, p.y)
                }
                PathSegment::CubicTo(c1, c2, p) => {
                    let (c1, c2, p) = (c1 + offset, c2 + offset, p + offset);
                    write!(
                        d,
                        "C{:.2},{:.2},{:.2},{:.2},{:.2},{:.2}",
                        c1.x, c1.y, c2.x, c2.y, p.x, p.y
                    )
                }
            };
        }
        d
    }
}

fn sign(x: f32) -> f32 {
    if x < 0.0 {
        -1.0
    } else {
        1.0
    }
}

// Tangent at the middle of three points (Steffen 1990).
fn slope3(p0: (f32, f32), p1: (f32, f32), p2: (f32, f32)) -> f32 {
    let h0 = p1.0 - p0.0;
    let h1 = p2.0 - p1.0;
    let s0 = (p1.1 - p0.1) / h0;
    let s1 = (p2.1 - p1.1) / h1;
    let p = (s0 * h1 + s1 * h0) / (h0 + h1);
    let v = (sign(s0) + sign(s1)) * s0.abs().min(s1.abs()).min(0.5 * p.abs());
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

// One-sided tangent at an end point, given the neighbouring tangent.
fn slope2(p0: (f32, f32), p1: (f32, f32), t: f32) -> f32 {
    let h = p1.0 - p0.0;
    if h != 0.0 {
        (3.0 * (p1.1 - p0.1) / h - t) / 2.0
    } else {
        t
    }
}

fn cubic_point(p0: Pos2, c1: Pos2, c2: Pos2, p1: Pos2, t: f32) -> Pos2 {
    let omt = 1.0 - t;
    let a = omt * omt * omt;
    let b = 3.0 * omt * omt * t;
    let c = 3.0 * omt * t * t;
    let d = t * t * t;
    egui::pos2(
        a * p0.x + b * c1.x + c * c2.x + d * p1.x,
        a * p0.y + b * c1.y + c * c2.y + d * p1.y,
    )
}

/// A node as drawn on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    /// Id of the diagram node
    pub id: NodeId,
    /// Type, selecting shape and style
    pub kind: NodeKind,
    /// Outline shape
    pub shape: NodeShape,
    /// Node box in diagram space
    pub rect: Rect,
    /// Wrapped, centered label
    pub label: TextBlock,
    /// Tooltip text, if any
    pub description: Option<String>,
}

impl SceneNode {
    /// Outline polygon in diagram space.
    pub fn outline(&self) -> Vec<Pos2> {
        self.shape.outline(self.rect)
    }

    /// Whether a diagram-space point hits this node.
    pub fn contains(&self, p: Pos2) -> bool {
        self.shape.contains(self.rect, p)
    }

    /// Moves the node (box and label) so that its center is `center`.
    pub fn move_to(&mut self, center: Pos2) {
        let delta = center - self.rect.center();
        self.rect = self.rect.translate(delta);
        self.label.translate(delta);
    }
}

/// An edge as drawn on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneEdge {
    /// Source node id
    pub source: NodeId,
    /// Target node id
    pub target: NodeId,
    /// Curve from source to target, ending at the target outline
    pub path: EdgePath,
    /// Label drawn in the fixed edge-label style
    pub label: Option<TextBlock>,
}

/// Everything the canvas shows for one rendered diagram.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// Style snapshot the scene was built with
    pub styles: StyleSet,
    /// Nodes in paint order
    pub nodes: Vec<SceneNode>,
    /// Edges in diagram order
    pub edges: Vec<SceneEdge>,
}

impl Scene {
    /// Topmost node under a diagram-space point.
    pub fn node_at(&self, p: Pos2) -> Option<&SceneNode> {
        self.nodes.iter().rev().find(|n| n.contains(p))
    }

    /// Node by id.
    pub fn node(&self, id: &str) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Mutable node by id.
    pub fn node_mut(&mut self, id: &str) -> Option<&mut SceneNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Tight bounds of everything drawn, including stroke overhang and labels.
    /// `None` for a scene without content.
    pub fn content_bounds(&self) -> Option<Rect> {
        let mut rect = Rect::NOTHING;
        for node in &self.nodes {
            rect = rect.union(node.rect.expand(crate::constants::NODE_STROKE_WIDTH / 2.0));
            rect = rect.union(node.label.bounds());
        }
        for edge in &self.edges {
            rect = rect.union(edge.path.bounds());
            if let Some(label) = &edge.label {
                rect = rect.union(label.bounds());
            }
        }
        (rect.is_positive() && rect.is_finite()).then_some(rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diamond_vertices_are_edge_midpoints() {
        let rect = Rect::from_center_size(egui::pos2(0.0, 0.0), egui::vec2(150.0, 60.0));
        let outline = NodeShape::Diamond.outline(rect);
        assert_eq!(
            outline,
            vec![
                egui::pos2(0.0, -30.0),
                egui::pos2(75.0, 0.0),
                egui::pos2(0.0, 30.0),
                egui::pos2(-75.0, 0.0)
            ]
        );
        assert!(NodeShape::Diamond.contains(rect, egui::pos2(0.0, 0.0)));
        assert!(!NodeShape::Diamond.contains(rect, egui::pos2(70.0, 25.0)));
    }

    #[test]
    fn stadium_stays_inside_box_and_excludes_corners() {
        let rect = Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(150.0, 60.0));
        for p in NodeShape::Stadium.outline(rect) {
            assert!(rect.expand(1e-3).contains(p));
        }
        assert!(!NodeShape::Stadium.contains(rect, egui::pos2(1.0, 1.0)));
        assert!(NodeShape::Stadium.contains(rect, egui::pos2(75.0, 1.0)));
    }

    #[test]
    fn monotone_curve_passes_through_points() {
        let pts = [
            egui::pos2(0.0, 0.0),
            egui::pos2(40.0, 100.0),
            egui::pos2(40.0, 200.0),
        ];
        let path = EdgePath::monotone_y(&pts);
        assert_eq!(path.segments[0], PathSegment::MoveTo(pts[0]));
        assert_eq!(path.segments.len(), 3);
        let flat = path.flatten();
        assert_eq!(*flat.last().unwrap(), pts[2]);
        // Monotone in y: never goes back up.
        for w in flat.windows(2) {
            assert!(w[1].y >= w[0].y - 1e-3);
        }
    }

    #[test]
    fn two_point_curve_is_a_line() {
        let path = EdgePath::monotone_y(&[egui::pos2(0.0, 0.0), egui::pos2(0.0, 50.0)]);
        assert_eq!(
            path.segments,
            vec![
                PathSegment::MoveTo(egui::pos2(0.0, 0.0)),
                PathSegment::LineTo(egui::pos2(0.0, 50.0))
            ]
        );
        let (end, dir) = path.end_direction().unwrap();
        assert_eq!(end, egui::pos2(0.0, 50.0));
        assert!((dir.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn svg_path_data_applies_offset() {
        let path = EdgePath::polyline(&[egui::pos2(1.0, 2.0), egui::pos2(3.0, 4.0)]);
        assert_eq!(path.to_svg_d(egui::vec2(10.0, 10.0)), "M11.00,12.00L13.00,14.00");
    }
}
