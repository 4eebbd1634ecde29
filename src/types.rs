//! Core data types of the diagram model.
//!
//! This module defines the canonical node/edge graph handed over by the graph
//! provider, and the validation that has to pass before a diagram reaches the
//! layout adapter. Nothing here carries positions: those live in
//! [`crate::layout`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifier of a node, unique within one diagram.
pub type NodeId = String;

/// The kinds of node a flowchart can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Entry point of the flow
    Start,
    /// A plain processing step
    Process,
    /// A branching point
    Decision,
    /// Terminal point of the flow
    End,
}

impl NodeKind {
    /// Every kind, in the order the style editor lists them.
    pub const ALL: [NodeKind; 4] = [
        NodeKind::Start,
        NodeKind::Process,
        NodeKind::Decision,
        NodeKind::End,
    ];

    /// The wire name of this kind (`"start"`, `"process"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Start => "start",
            NodeKind::Process => "process",
            NodeKind::Decision => "decision",
            NodeKind::End => "end",
        }
    }

    /// Human-friendly name used in the UI.
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeKind::Start => "Start",
            NodeKind::Process => "Process",
            NodeKind::Decision => "Decision",
            NodeKind::End => "End",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(NodeKind::Start),
            "process" => Ok(NodeKind::Process),
            "decision" => Ok(NodeKind::Decision),
            "end" => Ok(NodeKind::End),
            other => Err(other.to_string()),
        }
    }
}

/// A single node of the diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier within the diagram
    pub id: NodeId,
    /// Text drawn inside the node
    pub label: String,
    /// Shape and style selector
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Optional longer text shown as a hover tooltip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Node {
    /// Creates a node without a description.
    pub fn new(id: impl Into<NodeId>, label: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
            description: None,
        }
    }

    /// Attaches a tooltip description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A directed connection between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Id of the node the edge leaves
    pub source: NodeId,
    /// Id of the node the edge points at
    pub target: NodeId,
    /// Optional text drawn at the middle of the edge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Edge {
    /// Creates an unlabeled edge.
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            label: None,
        }
    }

    /// Attaches a label to the edge.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// The canonical node/edge graph. A new diagram always replaces the previous one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    /// Nodes in provider order
    pub nodes: Vec<Node>,
    /// Edges in provider order
    pub edges: Vec<Edge>,
}

impl Diagram {
    /// Creates an empty diagram.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this is the canonical "no diagram yet" state.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Looks up a node by id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Checks the invariants the render core relies on: non-empty ids and labels,
    /// unique ids, and edges whose endpoints resolve to declared nodes.
    pub fn validate(&self) -> Result<(), IngestError> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(self.nodes.len());
        for (index, node) in self.nodes.iter().enumerate() {
            if node.id.trim().is_empty() {
                return Err(IngestError::EmptyField { index, field: "id" });
            }
            if node.label.trim().is_empty() {
                return Err(IngestError::EmptyField {
                    index,
                    field: "label",
                });
            }
            if !seen.insert(node.id.as_str()) {
                return Err(IngestError::DuplicateNodeId(node.id.clone()));
            }
        }
        for (index, edge) in self.edges.iter().enumerate() {
            for (endpoint, id) in [("source", &edge.source), ("target", &edge.target)] {
                if !seen.contains(id.as_str()) {
                    return Err(IngestError::DanglingEdge {
                        index,
                        endpoint,
                        id: id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Serializes the diagram to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Payload returned by the graph provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// The inferred flowchart
    pub flowchart: Diagram,
    /// Function names found in the script, in source order
    #[serde(default)]
    pub functions: Vec<String>,
}

impl GraphDocument {
    /// Parses and validates a provider payload.
    ///
    /// Missing arrays, unknown node types and dangling edge references are reported
    /// as [`IngestError`]s; a document returned from here is safe to lay out.
    pub fn from_json(json: &str) -> Result<Self, IngestError> {
        let raw: RawDocument =
            serde_json::from_str(json).map_err(|e| IngestError::Malformed(e.to_string()))?;
        raw.into_document()
    }

    /// Serializes the document to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Reasons a provider payload is rejected before layout. None of these are retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// The payload is not valid JSON or has the wrong shape
    #[error("malformed graph payload: {0}")]
    Malformed(String),
    /// A required top-level field is absent
    #[error("graph payload is missing `{0}`")]
    MissingField(&'static str),
    /// A node lacks a required field
    #[error("node #{index} is missing `{field}`")]
    MissingNodeField {
        /// Position of the node in the payload
        index: usize,
        /// Name of the absent field
        field: &'static str,
    },
    /// A node field that must carry text is blank
    #[error("node #{index} has an empty `{field}`")]
    EmptyField {
        /// Position of the node in the payload
        index: usize,
        /// Name of the blank field
        field: &'static str,
    },
    /// A node type outside start/process/decision/end
    #[error("node `{id}` has unknown type `{kind}`")]
    UnknownNodeType {
        /// Offending node
        id: NodeId,
        /// The type string as received
        kind: String,
    },
    /// Two nodes share an id
    #[error("duplicate node id `{0}`")]
    DuplicateNodeId(NodeId),
    /// An edge lacks a required endpoint
    #[error("edge #{index} is missing `{field}`")]
    MissingEdgeField {
        /// Position of the edge in the payload
        index: usize,
        /// Name of the absent field
        field: &'static str,
    },
    /// An edge endpoint does not name a declared node
    #[error("edge #{index} {endpoint} `{id}` does not match any node")]
    DanglingEdge {
        /// Position of the edge in the payload
        index: usize,
        /// `"source"` or `"target"`
        endpoint: &'static str,
        /// The unresolved id
        id: NodeId,
    },
}

// Permissive mirror of the wire format so that every violation can be reported
// with a precise error instead of a generic serde message.
#[derive(Deserialize)]
struct RawDocument {
    flowchart: Option<RawDiagram>,
    #[serde(default)]
    functions: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct RawDiagram {
    nodes: Option<Vec<RawNode>>,
    edges: Option<Vec<RawEdge>>,
}

#[derive(Deserialize)]
struct RawNode {
    id: Option<String>,
    label: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct RawEdge {
    source: Option<String>,
    target: Option<String>,
    label: Option<String>,
}

impl RawDocument {
    fn into_document(self) -> Result<GraphDocument, IngestError> {
        let raw = self.flowchart.ok_or(IngestError::MissingField("flowchart"))?;
        let raw_nodes = raw.nodes.ok_or(IngestError::MissingField("nodes"))?;
        let raw_edges = raw.edges.ok_or(IngestError::MissingField("edges"))?;

        let mut nodes = Vec::with_capacity(raw_nodes.len());
        for (index, n) in raw_nodes.into_iter().enumerate() {
            let id = n.id.ok_or(IngestError::MissingNodeField { index, field: "id" })?;
            let label = n.label.ok_or(IngestError::MissingNodeField {
                index,
                field: "label",
            })?;
            let kind_str = n.kind.ok_or(IngestError::MissingNodeField {
                index,
                field: "type",
            })?;
            let kind = kind_str
                .parse::<NodeKind>()
                .map_err(|kind| IngestError::UnknownNodeType { id: id.clone(), kind })?;
            nodes.push(Node {
                id,
                label,
                kind,
                description: n.description.filter(|d| !d.trim().is_empty()),
            });
        }

        let mut edges = Vec::with_capacity(raw_edges.len());
        for (index, e) in raw_edges.into_iter().enumerate() {
            let source = e.source.ok_or(IngestError::MissingEdgeField {
                index,
                field: "source",
            })?;
            let target = e.target.ok_or(IngestError::MissingEdgeField {
                index,
                field: "target",
            })?;
            edges.push(Edge {
                source,
                target,
                label: e.label.filter(|l| !l.trim().is_empty()),
            });
        }

        let flowchart = Diagram { nodes, edges };
        flowchart.validate()?;
        Ok(GraphDocument {
            flowchart,
            functions: self.functions.unwrap_or_default(),
        })
    }
}
