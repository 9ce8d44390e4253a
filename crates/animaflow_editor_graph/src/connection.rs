// SPDX-License-Identifier: MIT OR Apache-2.0
//! Edge (connection) definitions for the graph.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl EdgeId {
    /// Wrap an existing id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh id
    pub fn generate() -> Self {
        Self(format!("edge_{}", Uuid::new_v4()))
    }

    /// Get the raw id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EdgeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A requested connection, not yet in the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeCandidate {
    /// Id to use; generated when `None`
    pub id: Option<EdgeId>,
    /// Source node
    pub source: NodeId,
    /// Output port on the source
    pub source_port: String,
    /// Target node
    pub target: NodeId,
    /// Input port on the target
    pub target_port: String,
}

impl EdgeCandidate {
    /// Create a candidate with a generated id
    pub fn new(
        source: impl Into<NodeId>,
        source_port: impl Into<String>,
        target: impl Into<NodeId>,
        target_port: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            source: source.into(),
            source_port: source_port.into(),
            target: target.into(),
            target_port: target_port.into(),
        }
    }

    /// Use an explicit id
    pub fn with_id(mut self, id: impl Into<EdgeId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// A directed link from an output port to an input port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// Unique edge ID
    pub id: EdgeId,
    /// Source node ID
    pub source: NodeId,
    /// Source port name
    pub source_port: String,
    /// Target node ID
    pub target: NodeId,
    /// Target port name
    pub target_port: String,
    /// Set when the last render blamed one of the endpoints
    pub flagged: bool,
}

impl Edge {
    /// Build an edge from a candidate
    pub fn from_candidate(candidate: EdgeCandidate) -> Self {
        Self {
            id: candidate.id.unwrap_or_else(EdgeId::generate),
            source: candidate.source,
            source_port: candidate.source_port,
            target: candidate.target,
            target_port: candidate.target_port,
            flagged: false,
        }
    }

    /// Check if this edge touches a specific node
    pub fn involves_node(&self, node_id: &NodeId) -> bool {
        self.source == *node_id || self.target == *node_id
    }

    /// Check if this edge feeds the given input
    pub fn targets(&self, node_id: &NodeId, port: &str) -> bool {
        self.target == *node_id && self.target_port == port
    }
}
