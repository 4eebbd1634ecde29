//! Drag sessions and hover tracking.
//!
//! Both operate purely on diagram-space data; the canvas maps pointer positions
//! through the [`ViewTransform`](crate::view::ViewTransform) before calling in.

use crate::layout::GraphLayout;
use crate::scene::Scene;
use crate::types::NodeId;
use eframe::egui::{Pos2, Vec2};

/// A node drag in progress. Owns the dragged node's position from press to release.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    /// Node being dragged
    pub node_id: NodeId,
    /// Node center minus pointer position at press time, in diagram space
    pub grab_offset: Vec2,
}

impl DragSession {
    /// Starts a session if `pointer` (diagram space) is over a node.
    pub fn begin(scene: &Scene, pointer: Pos2) -> Option<Self> {
        let node = scene.node_at(pointer)?;
        log::debug!("drag start on `{}`", node.id);
        Some(Self {
            node_id: node.id.clone(),
            grab_offset: node.rect.center() - pointer,
        })
    }

    /// New center for the dragged node given the current pointer (diagram space).
    pub fn target_center(&self, pointer: Pos2) -> Pos2 {
        pointer + self.grab_offset
    }
}

/// Moves one node's center and straightens its incident edges.
///
/// Every edge touching the node becomes a two-point line between the current
/// centers of its endpoints with the label anchor at the midpoint. All other edges
/// and nodes are left as they are. Returns the indices of the rewritten edges, or
/// an empty list if the node is unknown.
pub fn move_node(layout: &mut GraphLayout, node_id: &str, center: Pos2) -> Vec<usize> {
    let Some(node) = layout.nodes.get_mut(node_id) else {
        return Vec::new();
    };
    node.x = center.x;
    node.y = center.y;

    let mut touched = Vec::new();
    for (i, edge) in layout.edges.iter_mut().enumerate() {
        if !edge.is_incident_to(node_id) {
            continue;
        }
        let (Some(source), Some(target)) =
            (layout.nodes.get(&edge.source), layout.nodes.get(&edge.target))
        else {
            continue;
        };
        let a = source.center();
        let b = target.center();
        edge.points = vec![a, b];
        edge.label_anchor = a + (b - a) * 0.5;
        touched.push(i);
    }
    touched
}

/// Tooltip content and position for the hovered node.
#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    /// Node the tooltip belongs to
    pub node_id: NodeId,
    /// Description text
    pub text: String,
    /// Screen position of the tooltip's top-left corner
    pub anchor: Pos2,
}

/// Tracks which node is under the pointer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HoverState {
    /// Node under the pointer, if any
    pub hovered: Option<NodeId>,
    /// Tooltip to show this frame
    pub tooltip: Option<Tooltip>,
}

impl HoverState {
    /// Updates hover from a pointer position given in both spaces.
    /// `None` means the pointer left the canvas.
    pub fn update(&mut self, scene: &Scene, pointer: Option<(Pos2, Pos2)>) {
        let hit = pointer.and_then(|(world, screen)| scene.node_at(world).map(|n| (n, screen)));
        match hit {
            Some((node, screen)) => {
                self.hovered = Some(node.id.clone());
                self.tooltip = node
                    .description
                    .as_deref()
                    .filter(|d| !d.trim().is_empty())
                    .map(|text| Tooltip {
                        node_id: node.id.clone(),
                        text: text.to_string(),
                        anchor: crate::view::tooltip_anchor(screen),
                    });
            }
            None => self.clear(),
        }
    }

    /// Hides any tooltip.
    pub fn clear(&mut self) {
        self.hovered = None;
        self.tooltip = None;
    }
}

/// Per-frame pointer interaction state of the canvas.
#[derive(Debug, Clone, Default)]
pub struct InteractionState {
    /// Active drag, if any
    pub drag: Option<DragSession>,
    /// Pan in progress (pressed on empty canvas)
    pub is_panning: bool,
    /// Last pointer position while panning, in screen space
    pub last_pan_pos: Option<Pos2>,
    /// Hovered node and tooltip
    pub hover: HoverState,
}

impl InteractionState {
    /// Drops every in-flight gesture, used when the scene is replaced.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
