//! Layout adapter and the built-in layered layout oracle.
//!
//! The adapter registers every node (with its label/type/description as an opaque
//! payload) and every edge with a [`LayoutOracle`], runs it, and reads the absolute
//! centers and routing polylines back into [`GraphLayout`], the render-ready form
//! consumed by the render engine and mutated by node dragging.

use crate::constants;
use crate::types::{Diagram, NodeId, NodeKind};
use eframe::egui::{self, Pos2, Rect};
use indexmap::IndexMap;
use std::collections::HashMap;
use thiserror::Error;

/// Rank direction of the layout. Only top-to-bottom is used by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankDirection {
    /// Ranks grow downwards
    #[default]
    TopToBottom,
}

/// Geometry settings handed to the oracle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    /// Rank direction
    pub direction: RankDirection,
    /// Horizontal gap between nodes of the same rank
    pub node_separation: f32,
    /// Vertical gap between ranks
    pub rank_separation: f32,
    /// Width of every node box
    pub node_width: f32,
    /// Height of every node box
    pub node_height: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            direction: RankDirection::TopToBottom,
            node_separation: constants::NODE_SEPARATION,
            rank_separation: constants::RANK_SEPARATION,
            node_width: constants::NODE_WIDTH,
            node_height: constants::NODE_HEIGHT,
        }
    }
}

/// Data carried through the oracle untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct NodePayload {
    /// Node label
    pub label: String,
    /// Node type
    pub kind: NodeKind,
    /// Tooltip description
    pub description: Option<String>,
}

/// A node registered with the oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleNode {
    /// Node id
    pub id: NodeId,
    /// Box width
    pub width: f32,
    /// Box height
    pub height: f32,
    /// Opaque payload read back after layout
    pub payload: NodePayload,
}

/// An edge registered with the oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleEdge {
    /// Source node id
    pub source: NodeId,
    /// Target node id
    pub target: NodeId,
    /// Optional label; labeled edges get a label anchor
    pub label: Option<String>,
}

/// Everything the oracle needs.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleInput {
    /// Geometry settings
    pub config: LayoutConfig,
    /// Nodes in registration order
    pub nodes: Vec<OracleNode>,
    /// Edges in registration order
    pub edges: Vec<OracleEdge>,
}

/// A node placed by the oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedNode {
    /// Node id
    pub id: NodeId,
    /// Center of the node box
    pub center: Pos2,
    /// Payload as registered
    pub payload: NodePayload,
}

/// An edge routed by the oracle, in registration order.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedEdge {
    /// Routing polyline from source to target
    pub points: Vec<Pos2>,
    /// Label anchor for labeled edges
    pub label_anchor: Option<Pos2>,
}

/// Result of one oracle run.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleOutput {
    /// Placed nodes
    pub nodes: Vec<PlacedNode>,
    /// Routed edges, parallel to the input edges
    pub edges: Vec<RoutedEdge>,
    /// Overall width of the graph
    pub width: f32,
    /// Overall height of the graph
    pub height: f32,
}

/// Failures of the layout step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// An edge names a node that was never registered
    #[error("edge {source_id} -> {target_id} references an unregistered node")]
    UnknownEndpoint {
        /// Source id of the edge
        source_id: NodeId,
        /// Target id of the edge
        target_id: NodeId,
    },
    /// The oracle did not place a registered node
    #[error("layout oracle dropped node `{0}`")]
    MissingNode(NodeId),
    /// The oracle returned a different number of edges than registered
    #[error("layout oracle returned {got} edges, expected {expected}")]
    EdgeCountMismatch {
        /// Number of registered edges
        expected: usize,
        /// Number of routed edges
        got: usize,
    },
}

/// An external layout algorithm: node/edge registration in, absolute coordinates
/// and routing polylines out.
pub trait LayoutOracle: Send + Sync {
    /// Computes ranks, positions and edge routes.
    fn layout(&self, input: &OracleInput) -> Result<OracleOutput, LayoutError>;
}

/// Render-ready node: a diagram node plus its center and fixed size.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    /// Node id
    pub id: NodeId,
    /// Node label
    pub label: String,
    /// Node type
    pub kind: NodeKind,
    /// Tooltip description
    pub description: Option<String>,
    /// Center x in diagram space
    pub x: f32,
    /// Center y in diagram space
    pub y: f32,
    /// Box width
    pub width: f32,
    /// Box height
    pub height: f32,
}

impl LayoutNode {
    /// Center of the node.
    pub fn center(&self) -> Pos2 {
        egui::pos2(self.x, self.y)
    }

    /// Node box.
    pub fn rect(&self) -> Rect {
        Rect::from_center_size(self.center(), egui::vec2(self.width, self.height))
    }
}

/// Render-ready edge: a diagram edge plus its routing points and label anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutEdge {
    /// Source node id
    pub source: NodeId,
    /// Target node id
    pub target: NodeId,
    /// Edge label
    pub label: Option<String>,
    /// Routing points from source to target
    pub points: Vec<Pos2>,
    /// Where the label is centered
    pub label_anchor: Pos2,
}

impl LayoutEdge {
    /// Whether the edge touches the given node.
    pub fn is_incident_to(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }
}

/// The laid-out form of one diagram.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphLayout {
    /// Nodes by id, in diagram order
    pub nodes: IndexMap<NodeId, LayoutNode>,
    /// Edges in diagram order
    pub edges: Vec<LayoutEdge>,
    /// Graph width reported by the oracle
    pub width: f32,
    /// Graph height reported by the oracle
    pub height: f32,
}

impl GraphLayout {
    /// Bounding box of node boxes and routing points.
    pub fn bounds(&self) -> Rect {
        let mut rect = Rect::NOTHING;
        for node in self.nodes.values() {
            rect = rect.union(node.rect());
        }
        for edge in &self.edges {
            for p in &edge.points {
                rect.extend_with(*p);
            }
        }
        rect
    }
}

/// Arc-length midpoint of a polyline.
pub fn polyline_midpoint(points: &[Pos2]) -> Option<Pos2> {
    let first = *points.first()?;
    let total: f32 = points.windows(2).map(|w| (w[1] - w[0]).length()).sum();
    if total <= f32::EPSILON {
        return Some(first);
    }
    let mut remaining = total / 2.0;
    for w in points.windows(2) {
        let len = (w[1] - w[0]).length();
        if remaining <= len {
            return Some(w[0] + (w[1] - w[0]) * (remaining / len.max(f32::EPSILON)));
        }
        remaining -= len;
    }
    points.last().copied()
}

/// Converts a [`Diagram`] to oracle input, runs the oracle and imports the result.
pub struct LayoutAdapter {
    config: LayoutConfig,
    oracle: Box<dyn LayoutOracle>,
}

impl Default for LayoutAdapter {
    fn default() -> Self {
        Self::new(LayoutConfig::default(), Box::new(LayeredOracle))
    }
}

impl LayoutAdapter {
    /// Creates an adapter around an oracle.
    pub fn new(config: LayoutConfig, oracle: Box<dyn LayoutOracle>) -> Self {
        Self { config, oracle }
    }

    /// Geometry settings in use.
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Lays out a diagram. An empty diagram never reaches the oracle and yields `None`.
    pub fn run(&self, diagram: &Diagram) -> Result<Option<GraphLayout>, LayoutError> {
        if diagram.is_empty() {
            return Ok(None);
        }
        let input = OracleInput {
            config: self.config,
            nodes: diagram
                .nodes
                .iter()
                .map(|n| OracleNode {
                    id: n.id.clone(),
                    width: self.config.node_width,
                    height: self.config.node_height,
                    payload: NodePayload {
                        label: n.label.clone(),
                        kind: n.kind,
                        description: n.description.clone(),
                    },
                })
                .collect(),
            edges: diagram
                .edges
                .iter()
                .map(|e| OracleEdge {
                    source: e.source.clone(),
                    target: e.target.clone(),
                    label: e.label.clone(),
                })
                .collect(),
        };

        let output = self.oracle.layout(&input)?;
        log::debug!(
            "layout: {} nodes, {} edges, {:.0}x{:.0}",
            output.nodes.len(),
            output.edges.len(),
            output.width,
            output.height
        );

        let mut placed: HashMap<NodeId, PlacedNode> =
            output.nodes.into_iter().map(|p| (p.id.clone(), p)).collect();
        let mut nodes = IndexMap::with_capacity(input.nodes.len());
        for registered in &input.nodes {
            let p = placed
                .remove(&registered.id)
                .ok_or_else(|| LayoutError::MissingNode(registered.id.clone()))?;
            nodes.insert(
                p.id.clone(),
                LayoutNode {
                    id: p.id,
                    label: p.payload.label,
                    kind: p.payload.kind,
                    description: p.payload.description,
                    x: p.center.x,
                    y: p.center.y,
                    width: registered.width,
                    height: registered.height,
                },
            );
        }

        if output.edges.len() != input.edges.len() {
            return Err(LayoutError::EdgeCountMismatch {
                expected: input.edges.len(),
                got: output.edges.len(),
            });
        }
        let edges = input
            .edges
            .into_iter()
            .zip(output.edges)
            .map(|(e, routed)| {
                let label_anchor = match routed
                    .label_anchor
                    .or_else(|| polyline_midpoint(&routed.points))
                {
                    Some(anchor) => anchor,
                    None => {
                        let (Some(a), Some(b)) = (nodes.get(&e.source), nodes.get(&e.target))
                        else {
                            return Err(LayoutError::UnknownEndpoint {
                                source_id: e.source,
                                target_id: e.target,
                            });
                        };
                        a.center() + (b.center() - a.center()) * 0.5
                    }
                };
                Ok(LayoutEdge {
                    source: e.source,
                    target: e.target,
                    label: e.label,
                    points: routed.points,
                    label_anchor,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(GraphLayout {
            nodes,
            edges,
            width: output.width,
            height: output.height,
        }))
    }
}

/// Built-in layered (Sugiyama-style) oracle.
///
/// Ranks by longest path over the edges left after removing DFS back edges,
/// inserts virtual nodes for edges spanning several ranks, reduces crossings with
/// barycenter sweeps and packs every rank around a shared vertical axis.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayeredOracle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Slot {
    Real(usize),
    // (edge index, rank)
    Virtual(usize, usize),
}

impl LayoutOracle for LayeredOracle {
    fn layout(&self, input: &OracleInput) -> Result<OracleOutput, LayoutError> {
        let cfg = &input.config;
        let n = input.nodes.len();
        let index: HashMap<&str, usize> = input
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id.as_str(), i))
            .collect();

        let mut ends = Vec::with_capacity(input.edges.len());
        for e in &input.edges {
            match (index.get(e.source.as_str()), index.get(e.target.as_str())) {
                (Some(&s), Some(&t)) => ends.push((s, t)),
                _ => {
                    return Err(LayoutError::UnknownEndpoint {
                        source_id: e.source.clone(),
                        target_id: e.target.clone(),
                    })
                }
            }
        }

        let back = back_edges(n, &ends);
        let ranks = longest_path_ranks(n, &ends, &back);
        let max_rank = ranks.iter().copied().max().unwrap_or(0);

        // Build layers with virtual nodes along every multi-rank edge.
        let mut layers: Vec<Vec<Slot>> = vec![Vec::new(); max_rank + 1];
        for (i, &r) in ranks.iter().enumerate() {
            layers[r].push(Slot::Real(i));
        }
        // chains[e] = slots from the upper end to the lower end of edge e
        let mut chains: Vec<Vec<Slot>> = Vec::with_capacity(ends.len());
        for (ei, &(s, t)) in ends.iter().enumerate() {
            if s == t {
                chains.push(Vec::new());
                continue;
            }
            let (upper, lower) = if ranks[s] <= ranks[t] { (s, t) } else { (t, s) };
            let mut chain = vec![Slot::Real(upper)];
            for r in ranks[upper] + 1..ranks[lower] {
                let slot = Slot::Virtual(ei, r);
                layers[r].push(slot);
                chain.push(slot);
            }
            chain.push(Slot::Real(lower));
            chains.push(chain);
        }

        // Neighbours of each slot in the rank above / below.
        let mut up: HashMap<Slot, Vec<Slot>> = HashMap::new();
        let mut down: HashMap<Slot, Vec<Slot>> = HashMap::new();
        for chain in &chains {
            for w in chain.windows(2) {
                down.entry(w[0]).or_default().push(w[1]);
                up.entry(w[1]).or_default().push(w[0]);
            }
        }

        for sweep in 0..constants::ORDERING_SWEEPS {
            if sweep % 2 == 0 {
                for r in 1..layers.len() {
                    let (done, rest) = layers.split_at_mut(r);
                    reorder_by_barycenter(&mut rest[0], &done[r - 1], &up);
                }
            } else {
                for r in (0..layers.len().saturating_sub(1)).rev() {
                    let (rest, done) = layers.split_at_mut(r + 1);
                    reorder_by_barycenter(&mut rest[r], &done[0], &down);
                }
            }
        }

        // Coordinates: every rank is packed left to right and centered on x = 0.
        let slot_width = |slot: &Slot| match slot {
            Slot::Real(i) => input.nodes[*i].width,
            Slot::Virtual(..) => constants::VIRTUAL_NODE_WIDTH,
        };
        let rank_pitch = cfg.node_height + cfg.rank_separation;
        let mut centers: HashMap<Slot, Pos2> = HashMap::new();
        for (r, layer) in layers.iter().enumerate() {
            let total: f32 = layer.iter().map(slot_width).sum::<f32>()
                + cfg.node_separation * layer.len().saturating_sub(1) as f32;
            let mut x = -total / 2.0;
            let y = r as f32 * rank_pitch + cfg.node_height / 2.0;
            for slot in layer {
                let w = slot_width(slot);
                centers.insert(*slot, egui::pos2(x + w / 2.0, y));
                x += w + cfg.node_separation;
            }
        }

        // Shift so that the left-most box edge sits at x = 0.
        let min_x = layers
            .iter()
            .flatten()
            .map(|s| centers[s].x - slot_width(s) / 2.0)
            .fold(f32::INFINITY, f32::min);
        let shift = egui::vec2(-min_x, 0.0);
        for c in centers.values_mut() {
            *c += shift;
        }

        let nodes: Vec<PlacedNode> = input
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| PlacedNode {
                id: node.id.clone(),
                center: centers[&Slot::Real(i)],
                payload: node.payload.clone(),
            })
            .collect();

        let half_h = cfg.node_height / 2.0;
        let edges: Vec<RoutedEdge> = ends
            .iter()
            .zip(&chains)
            .zip(&input.edges)
            .map(|((&(s, t), chain), edge)| {
                let points = if s == t {
                    let c = centers[&Slot::Real(s)];
                    let right = c.x + input.nodes[s].width / 2.0;
                    vec![
                        egui::pos2(right, c.y - half_h / 2.0),
                        egui::pos2(right + cfg.node_separation / 2.0, c.y),
                        egui::pos2(right, c.y + half_h / 2.0),
                    ]
                } else {
                    let mut pts: Vec<Pos2> = chain.iter().map(|slot| centers[slot]).collect();
                    // Leave the upper node at its bottom and enter the lower at its top.
                    if let Some(first) = pts.first_mut() {
                        first.y += half_h;
                    }
                    if let Some(last) = pts.last_mut() {
                        last.y -= half_h;
                    }
                    if ranks[s] > ranks[t] {
                        pts.reverse();
                    }
                    pts
                };
                let label_anchor = edge
                    .label
                    .as_ref()
                    .and_then(|_| polyline_midpoint(&points));
                RoutedEdge {
                    points,
                    label_anchor,
                }
            })
            .collect();

        let mut far = egui::Pos2::ZERO;
        for (node, placed) in input.nodes.iter().zip(&nodes) {
            far = far.max(placed.center + egui::vec2(node.width, node.height) / 2.0);
        }
        for edge in &edges {
            for p in &edge.points {
                far = far.max(*p);
            }
        }
        let (width, height) = (far.x, far.y);

        Ok(OracleOutput {
            nodes,
            edges,
            width,
            height,
        })
    }
}

// Edges that close a cycle in a depth-first traversal started from nodes in input order.
fn back_edges(n: usize, ends: &[(usize, usize)]) -> Vec<bool> {
    let mut out_edges: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (ei, &(s, _)) in ends.iter().enumerate() {
        out_edges[s].push(ei);
    }
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }
    let mut mark = vec![Mark::New; n];
    let mut back = vec![false; ends.len()];
    for root in 0..n {
        if mark[root] != Mark::New {
            continue;
        }
        // Explicit stack of (node, next out-edge position).
        let mut stack = vec![(root, 0usize)];
        mark[root] = Mark::Active;
        while let Some(top) = stack.last_mut() {
            let v = top.0;
            if let Some(&ei) = out_edges[v].get(top.1) {
                top.1 += 1;
                let t = ends[ei].1;
                match mark[t] {
                    Mark::New => {
                        mark[t] = Mark::Active;
                        stack.push((t, 0));
                    }
                    Mark::Active => back[ei] = true,
                    Mark::Done => {}
                }
            } else {
                mark[v] = Mark::Done;
                stack.pop();
            }
        }
    }
    back
}

// Longest-path ranking over the acyclic edge set (Kahn order).
fn longest_path_ranks(n: usize, ends: &[(usize, usize)], back: &[bool]) -> Vec<usize> {
    let mut indegree = vec![0usize; n];
    let mut succ: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (ei, &(s, t)) in ends.iter().enumerate() {
        if back[ei] || s == t {
            continue;
        }
        succ[s].push(t);
        indegree[t] += 1;
    }
    let mut ranks = vec![0usize; n];
    let mut queue: std::collections::VecDeque<usize> =
        (0..n).filter(|&i| indegree[i] == 0).collect();
    while let Some(v) = queue.pop_front() {
        for &t in &succ[v] {
            ranks[t] = ranks[t].max(ranks[v] + 1);
            indegree[t] -= 1;
            if indegree[t] == 0 {
                queue.push_back(t);
            }
        }
    }
    ranks
}

// Stable sort of `layer` by the mean position of each slot's neighbours in `fixed`.
// Slots without neighbours keep their current position as key.
fn reorder_by_barycenter(layer: &mut [Slot], fixed: &[Slot], neighbours: &HashMap<Slot, Vec<Slot>>) {
    let pos: HashMap<Slot, usize> = fixed.iter().enumerate().map(|(i, s)| (*s, i)).collect();
    let mut keyed: Vec<(f32, Slot)> = layer
        .iter()
        .enumerate()
        .map(|(i, slot)| {
            let ns: Vec<usize> = neighbours
                .get(slot)
                .map(|v| v.iter().filter_map(|n| pos.get(n).copied()).collect())
                .unwrap_or_default();
            let key = if ns.is_empty() {
                i as f32
            } else {
                ns.iter().sum::<usize>() as f32 / ns.len() as f32
            };
            (key, *slot)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    for (dst, (_, slot)) in layer.iter_mut().zip(keyed) {
        *dst = slot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Edge, Node};
    use std::collections::HashSet;

    fn branching() -> Diagram {
        Diagram {
            nodes: vec![
                Node::new("start", "Start", NodeKind::Start),
                Node::new("check", "Valid?", NodeKind::Decision),
                Node::new("ok", "Save record", NodeKind::Process),
                Node::new("fail", "Report error", NodeKind::Process),
                Node::new("end", "End", NodeKind::End),
            ],
            edges: vec![
                Edge::new("start", "check"),
                Edge::new("check", "ok").with_label("yes"),
                Edge::new("check", "fail").with_label("no"),
                Edge::new("ok", "end"),
                Edge::new("fail", "end"),
                Edge::new("start", "end"),
            ],
        }
    }

    #[test]
    fn empty_diagram_is_not_laid_out() {
        let adapter = LayoutAdapter::default();
        assert_eq!(adapter.run(&Diagram::default()).unwrap(), None);
    }

    #[test]
    fn layout_returns_one_entry_per_node_and_edge() {
        let diagram = branching();
        let layout = LayoutAdapter::default().run(&diagram).unwrap().unwrap();
        assert_eq!(layout.nodes.len(), diagram.nodes.len());
        assert_eq!(layout.edges.len(), diagram.edges.len());
        let ids: HashSet<&str> = layout.nodes.keys().map(String::as_str).collect();
        let expected: HashSet<&str> = diagram.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn payload_survives_layout() {
        let mut diagram = branching();
        diagram.nodes[2].description = Some("writes to the db".into());
        let layout = LayoutAdapter::default().run(&diagram).unwrap().unwrap();
        let ok = &layout.nodes["ok"];
        assert_eq!(ok.label, "Save record");
        assert_eq!(ok.kind, NodeKind::Process);
        assert_eq!(ok.description.as_deref(), Some("writes to the db"));
        assert_eq!((ok.width, ok.height), (constants::NODE_WIDTH, constants::NODE_HEIGHT));
    }

    #[test]
    fn ranks_flow_top_to_bottom_with_fixed_spacing() {
        let layout = LayoutAdapter::default().run(&branching()).unwrap().unwrap();
        let pitch = constants::NODE_HEIGHT + constants::RANK_SEPARATION;
        let y = |id: &str| layout.nodes[id].y;
        assert!((y("check") - y("start") - pitch).abs() < 1e-3);
        assert!((y("ok") - y("check") - pitch).abs() < 1e-3);
        assert_eq!(y("ok"), y("fail"));
        assert!((y("end") - y("ok") - pitch).abs() < 1e-3);

        let gap = (layout.nodes["ok"].x - layout.nodes["fail"].x).abs();
        assert!(gap >= constants::NODE_WIDTH + constants::NODE_SEPARATION - 1e-3);
    }

    #[test]
    fn edges_run_from_source_bottom_to_target_top() {
        let layout = LayoutAdapter::default().run(&branching()).unwrap().unwrap();
        let e = &layout.edges[0];
        let start = &layout.nodes["start"];
        let check = &layout.nodes["check"];
        assert_eq!(e.points.first().unwrap().y, start.y + start.height / 2.0);
        assert_eq!(e.points.last().unwrap().y, check.y - check.height / 2.0);

        // start -> end spans three ranks and gets two intermediate waypoints.
        let long = &layout.edges[5];
        assert_eq!(long.points.len(), 4);
    }

    #[test]
    fn labeled_edges_get_midpoint_anchor() {
        let layout = LayoutAdapter::default().run(&branching()).unwrap().unwrap();
        let e = &layout.edges[1];
        let mid = polyline_midpoint(&e.points).unwrap();
        assert!((e.label_anchor - mid).length() < 1e-3);
    }

    #[test]
    fn cycles_are_tolerated() {
        let diagram = Diagram {
            nodes: vec![
                Node::new("a", "A", NodeKind::Start),
                Node::new("b", "B", NodeKind::Process),
                Node::new("c", "C", NodeKind::Decision),
            ],
            edges: vec![
                Edge::new("a", "b"),
                Edge::new("b", "c"),
                Edge::new("c", "b").with_label("retry"),
                Edge::new("c", "c"),
            ],
        };
        let layout = LayoutAdapter::default().run(&diagram).unwrap().unwrap();
        assert!(layout.nodes["c"].y > layout.nodes["b"].y);
        // The back edge is routed upwards, from c to b.
        let back = &layout.edges[2];
        assert!(back.points.first().unwrap().y > back.points.last().unwrap().y);
        assert_eq!(layout.edges[3].points.len(), 3);
    }

    #[test]
    fn unknown_endpoint_is_an_error() {
        let input = OracleInput {
            config: LayoutConfig::default(),
            nodes: vec![],
            edges: vec![OracleEdge {
                source: "x".into(),
                target: "y".into(),
                label: None,
            }],
        };
        assert!(matches!(
            LayeredOracle.layout(&input),
            Err(LayoutError::UnknownEndpoint { .. })
        ));
    }

    #[test]
    fn graph_size_covers_all_nodes() {
        let layout = LayoutAdapter::default().run(&branching()).unwrap().unwrap();
        let bounds = layout.bounds();
        assert!(bounds.min.x >= -1e-3);
        assert!((bounds.max.x - layout.width).abs() < 1e-3);
        assert!((bounds.max.y - layout.height).abs() < 1e-3);
    }

    #[test]
    fn midpoint_of_polyline() {
        let pts = [egui::pos2(0.0, 0.0), egui::pos2(0.0, 10.0), egui::pos2(10.0, 10.0)];
        assert_eq!(polyline_midpoint(&pts), Some(egui::pos2(0.0, 10.0)));
        assert_eq!(polyline_midpoint(&[]), None);
    }

    // Places every node on a diagonal and routes nothing.
    struct UnroutedOracle;

    impl LayoutOracle for UnroutedOracle {
        fn layout(&self, input: &OracleInput) -> Result<OracleOutput, LayoutError> {
            Ok(OracleOutput {
                nodes: input
                    .nodes
                    .iter()
                    .enumerate()
                    .map(|(i, n)| PlacedNode {
                        id: n.id.clone(),
                        center: egui::pos2(100.0 * i as f32, 100.0 * i as f32),
                        payload: n.payload.clone(),
                    })
                    .collect(),
                edges: input
                    .edges
                    .iter()
                    .map(|_| RoutedEdge {
                        points: Vec::new(),
                        label_anchor: None,
                    })
                    .collect(),
                width: 0.0,
                height: 0.0,
            })
        }
    }

    #[test]
    fn unrouted_edge_anchors_between_node_centers() {
        let adapter = LayoutAdapter::new(LayoutConfig::default(), Box::new(UnroutedOracle));
        let diagram = Diagram {
            nodes: vec![
                Node::new("a", "A", NodeKind::Start),
                Node::new("b", "B", NodeKind::End),
            ],
            edges: vec![Edge::new("a", "b")],
        };
        let layout = adapter.run(&diagram).unwrap().unwrap();
        assert_eq!(layout.edges[0].label_anchor, egui::pos2(50.0, 50.0));
    }

    #[test]
    fn unrouted_edge_to_unknown_node_is_an_error() {
        let adapter = LayoutAdapter::new(LayoutConfig::default(), Box::new(UnroutedOracle));
        let diagram = Diagram {
            nodes: vec![Node::new("a", "A", NodeKind::Start)],
            edges: vec![Edge::new("a", "ghost")],
        };
        assert_eq!(
            adapter.run(&diagram),
            Err(LayoutError::UnknownEndpoint {
                source_id: "a".into(),
                target_id: "ghost".into(),
            })
        );
    }
}
