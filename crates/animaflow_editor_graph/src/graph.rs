// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes, frames and edges.
//!
//! Every mutation goes through a method on [`Graph`]. Mutations are total:
//! unknown ids are ignored rather than reported, and each successful change is
//! recorded as a [`GraphChange`] for observers (see [`crate::store`]).

use crate::connection::{Edge, EdgeCandidate, EdgeId};
use crate::geometry::{Point, Size};
use crate::node::{keys, Attributes, Element, Frame, Node, NodeId, ViewState};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Offset applied to duplicated elements
pub const DUPLICATE_OFFSET: Point = Point::new(40.0, 40.0);

/// Suffix appended to the name of duplicated nodes and frames
pub const DUPLICATE_SUFFIX: &str = "_copy";

/// Default graph name
pub const DEFAULT_GRAPH_NAME: &str = "Untitled Animation";

/// Saved canvas viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Horizontal pan
    pub x: f64,
    /// Vertical pan
    pub y: f64,
    /// Zoom factor
    pub zoom: f64,
}

/// Graph-level settings. Unknown keys are preserved verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSettings {
    /// Last viewport, if saved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
    /// Everything else (resolution, fps, background color, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single recorded mutation
#[derive(Debug, Clone, PartialEq)]
pub enum GraphChange {
    /// A node or frame was inserted
    ElementAdded(NodeId),
    /// A node or frame was removed
    ElementRemoved(NodeId),
    /// A node or frame changed position
    ElementMoved(NodeId),
    /// Attributes, label or view state changed
    ElementUpdated(NodeId),
    /// A node entered or left a frame
    Reparented {
        /// The node that moved
        node: NodeId,
        /// Its new parent
        frame: Option<NodeId>,
    },
    /// A frame was resized
    FrameResized(NodeId),
    /// An edge was inserted
    EdgeAdded(EdgeId),
    /// An edge was removed
    EdgeRemoved(EdgeId),
    /// Selection flags changed
    SelectionChanged,
    /// Render diagnostics changed
    DiagnosticsChanged,
    /// The whole graph was replaced
    Replaced,
}

impl GraphChange {
    /// True if this change is a user edit (as opposed to selection or render feedback)
    pub fn is_edit(&self) -> bool {
        !matches!(self, Self::SelectionChanged | Self::DiagnosticsChanged)
    }
}

/// A node graph
#[derive(Debug, Clone)]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Graph settings
    pub settings: GraphSettings,
    /// Document fields the engine does not interpret (`id`, `description`, ...)
    pub extra: Map<String, Value>,
    /// Nodes and frames, in insertion order
    elements: IndexMap<NodeId, Element>,
    /// Edges, in insertion order
    edges: IndexMap<EdgeId, Edge>,
    /// Unsaved edits exist
    dirty: bool,
    /// Changes not yet drained by an observer
    changes: Vec<GraphChange>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: GraphSettings::default(),
            extra: Map::new(),
            elements: IndexMap::new(),
            edges: IndexMap::new(),
            dirty: false,
            changes: Vec::new(),
        }
    }

    fn record(&mut self, change: GraphChange) {
        if change.is_edit() {
            self.dirty = true;
        }
        self.changes.push(change);
    }

    /// Drain the changes recorded since the last call
    pub fn take_changes(&mut self) -> Vec<GraphChange> {
        std::mem::take(&mut self.changes)
    }

    /// Whether there are unsaved edits
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Forget unsaved edits (after load or save)
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Get a node or frame by ID
    pub fn element(&self, id: &NodeId) -> Option<&Element> {
        self.elements.get(id)
    }

    /// Get an ordinary node by ID
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.elements.get(id).and_then(Element::as_node)
    }

    /// Get a frame by ID
    pub fn frame(&self, id: &NodeId) -> Option<&Frame> {
        self.elements.get(id).and_then(Element::as_frame)
    }

    /// All nodes and frames in insertion order
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    /// All ordinary nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.elements.values().filter_map(Element::as_node)
    }

    /// All frames, in stable iteration order
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.elements.values().filter_map(Element::as_frame)
    }

    /// Nodes whose parent is `frame`
    pub fn children_of<'a>(&'a self, frame: &'a NodeId) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes()
            .filter(move |node| node.parent_frame.as_ref() == Some(frame))
    }

    /// Number of nodes and frames
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Number of ordinary nodes
    pub fn node_count(&self) -> usize {
        self.nodes().count()
    }

    /// Number of ordinary nodes of a kind
    pub fn count_of_kind(&self, kind: &str) -> usize {
        self.nodes().filter(|node| node.kind == kind).count()
    }

    /// Get an edge by ID
    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    /// All edges in insertion order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edges touching a node
    pub fn edges_for_node<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.values().filter(move |edge| edge.involves_node(id))
    }

    /// The edge feeding an input, if any
    pub fn edge_into(&self, node: &NodeId, port: &str) -> Option<&Edge> {
        self.edges.values().find(|edge| edge.targets(node, port))
    }

    /// Absolute canvas position, translating through the parent frame
    pub fn absolute_position(&self, id: &NodeId) -> Option<Point> {
        let element = self.elements.get(id)?;
        let parent_origin = element
            .parent_frame()
            .and_then(|frame| self.frame(frame))
            .map_or(Point::ZERO, |frame| frame.position);
        Some(parent_origin + element.position())
    }

    /// IDs of selected nodes and frames, in graph order
    pub fn selected_ids(&self) -> Vec<NodeId> {
        self.elements
            .values()
            .filter(|element| element.is_selected())
            .map(|element| element.id().clone())
            .collect()
    }

    // ---------------------------------------------------------------------
    // Structural mutations
    // ---------------------------------------------------------------------

    /// Add a node. Ignored if the id is taken.
    pub fn add_node(&mut self, node: Node) -> Option<NodeId> {
        self.add_element(Element::Node(node))
    }

    /// Add a frame. Ignored if the id is taken.
    pub fn add_frame(&mut self, frame: Frame) -> Option<NodeId> {
        self.add_element(Element::Frame(frame))
    }

    /// Add a node or frame. Ignored if the id is taken.
    ///
    /// A node whose parent is not an existing frame is placed at top level.
    pub fn add_element(&mut self, mut element: Element) -> Option<NodeId> {
        let id = element.id().clone();
        if self.elements.contains_key(&id) {
            tracing::warn!("Ignoring node with duplicate id {id}");
            return None;
        }

        if let Element::Node(node) = &mut element {
            if let Some(parent) = &node.parent_frame {
                if self.frame(parent).is_none() {
                    tracing::warn!(
                        "Node {id} references missing frame {parent}; placing at top level"
                    );
                    node.parent_frame = None;
                }
            }
        }

        tracing::debug!("Adding {} {id}", element.kind());
        self.elements.insert(id.clone(), element);
        self.record(GraphChange::ElementAdded(id.clone()));
        Some(id)
    }

    /// Remove a node or frame.
    ///
    /// Incident edges are removed. Removing a frame detaches its children to
    /// top level, converting their positions to absolute coordinates.
    pub fn remove_node(&mut self, id: &NodeId) -> Option<Element> {
        let element = self.elements.shift_remove(id)?;

        let incident: Vec<EdgeId> = self
            .edges
            .values()
            .filter(|edge| edge.involves_node(id))
            .map(|edge| edge.id.clone())
            .collect();
        for edge_id in incident {
            self.edges.shift_remove(&edge_id);
            self.record(GraphChange::EdgeRemoved(edge_id));
        }

        if let Element::Frame(frame) = &element {
            let mut detached = Vec::new();
            for child in self.elements.values_mut() {
                if let Element::Node(node) = child {
                    if node.parent_frame.as_ref() == Some(&frame.id) {
                        node.parent_frame = None;
                        node.position = frame.position + node.position;
                        detached.push(node.id.clone());
                    }
                }
            }
            for node in detached {
                self.record(GraphChange::Reparented { node, frame: None });
            }
        }

        tracing::debug!("Removed {id}");
        self.record(GraphChange::ElementRemoved(id.clone()));
        Some(element)
    }

    /// Remove several nodes or frames
    pub fn remove_nodes(&mut self, ids: &[NodeId]) -> usize {
        ids.iter().filter(|id| self.remove_node(id).is_some()).count()
    }

    /// Add an edge.
    ///
    /// Any edge already feeding the same target port is removed first, so an
    /// input never has more than one incoming edge. Ignored when either
    /// endpoint is missing or is a frame.
    pub fn add_edge(&mut self, candidate: EdgeCandidate) -> Option<EdgeId> {
        if self.node(&candidate.source).is_none() || self.node(&candidate.target).is_none() {
            tracing::debug!(
                "Ignoring edge {} -> {}: endpoint missing or not connectable",
                candidate.source,
                candidate.target
            );
            return None;
        }

        let superseded: Vec<EdgeId> = self
            .edges
            .values()
            .filter(|edge| edge.targets(&candidate.target, &candidate.target_port))
            .map(|edge| edge.id.clone())
            .collect();
        for edge_id in superseded {
            tracing::debug!(
                "Edge {edge_id} superseded on {}.{}",
                candidate.target,
                candidate.target_port
            );
            self.edges.shift_remove(&edge_id);
            self.record(GraphChange::EdgeRemoved(edge_id));
        }

        let edge = Edge::from_candidate(candidate);
        let id = edge.id.clone();
        if self.edges.shift_remove(&id).is_some() {
            self.record(GraphChange::EdgeRemoved(id.clone()));
        }
        self.edges.insert(id.clone(), edge);
        self.record(GraphChange::EdgeAdded(id.clone()));
        Some(id)
    }

    /// Remove edges by id; unknown ids are skipped. Returns how many were removed.
    pub fn remove_edges<'a>(&mut self, ids: impl IntoIterator<Item = &'a EdgeId>) -> usize {
        let mut removed = 0;
        for id in ids {
            if self.edges.shift_remove(id).is_some() {
                self.record(GraphChange::EdgeRemoved(id.clone()));
                removed += 1;
            }
        }
        removed
    }

    /// Shallow-merge attributes into a node. Never touches kind or ports.
    ///
    /// Engine-recognized keys are coerced: `viewState`, `error` and `debug`
    /// are lifted out of the bag, `name`, `order` and the boolean toggles are
    /// normalized. Values that cannot be coerced are dropped with a warning.
    /// On a frame only `label` is honored. Returns false for unknown ids.
    pub fn update_node_attributes(&mut self, id: &NodeId, partial: Attributes) -> bool {
        let Some(element) = self.elements.get_mut(id) else {
            return false;
        };

        match element {
            Element::Node(node) => {
                for (key, value) in partial {
                    apply_attribute(node, key, value);
                }
            }
            Element::Frame(frame) => {
                if let Some(label) = partial.get("label").and_then(Value::as_str) {
                    frame.label = label.to_string();
                }
            }
        }

        self.record(GraphChange::ElementUpdated(id.clone()));
        true
    }

    /// Move a node or frame. The position is parent-relative for contained nodes.
    pub fn move_node(&mut self, id: &NodeId, position: Point) -> bool {
        let Some(element) = self.elements.get_mut(id) else {
            return false;
        };
        element.set_position(position);
        self.record(GraphChange::ElementMoved(id.clone()));
        true
    }

    /// Set or clear a node's parent frame together with its new stored position
    pub(crate) fn set_parent(
        &mut self,
        id: &NodeId,
        frame: Option<NodeId>,
        position: Point,
    ) -> bool {
        if let Some(frame_id) = &frame {
            if self.frame(frame_id).is_none() {
                return false;
            }
        }
        let Some(Element::Node(node)) = self.elements.get_mut(id) else {
            return false;
        };
        node.parent_frame = frame.clone();
        node.position = position;
        self.record(GraphChange::Reparented { node: id.clone(), frame });
        true
    }

    /// Set a node's view state
    pub fn set_view_state(&mut self, id: &NodeId, view_state: ViewState) -> bool {
        let Some(Element::Node(node)) = self.elements.get_mut(id) else {
            return false;
        };
        node.view_state = view_state;
        self.record(GraphChange::ElementUpdated(id.clone()));
        true
    }

    /// Set a frame's size (callers apply snapping)
    pub fn resize_frame(&mut self, id: &NodeId, size: Size) -> bool {
        let Some(Element::Frame(frame)) = self.elements.get_mut(id) else {
            return false;
        };
        frame.size = size;
        self.record(GraphChange::FrameResized(id.clone()));
        true
    }

    /// Rename a frame
    pub fn set_frame_label(&mut self, id: &NodeId, label: impl Into<String>) -> bool {
        let Some(Element::Frame(frame)) = self.elements.get_mut(id) else {
            return false;
        };
        frame.label = label.into();
        self.record(GraphChange::ElementUpdated(id.clone()));
        true
    }

    /// Duplicate elements with the default offset
    pub fn duplicate(&mut self, ids: &[NodeId]) -> Vec<NodeId> {
        self.duplicate_with_offset(ids, DUPLICATE_OFFSET)
    }

    /// Duplicate elements.
    ///
    /// Copies get fresh ids, are offset by `offset`, are deselected and have
    /// [`DUPLICATE_SUFFIX`] appended to their name. Only edges with both
    /// endpoints inside the set are copied. A contained node whose frame is
    /// copied too moves into the frame copy and keeps its relative position.
    /// Frame copies are inserted before node copies.
    pub fn duplicate_with_offset(&mut self, ids: &[NodeId], offset: Point) -> Vec<NodeId> {
        let wanted: HashSet<&NodeId> = ids.iter().collect();
        let originals: Vec<Element> = self
            .elements
            .values()
            .filter(|element| wanted.contains(element.id()))
            .cloned()
            .collect();
        if originals.is_empty() {
            return Vec::new();
        }

        let remap: HashMap<NodeId, NodeId> = originals
            .iter()
            .map(|element| (element.id().clone(), NodeId::generate(element.kind())))
            .collect();

        // Frame copies go first so child copies find their new parent
        let (frames, nodes): (Vec<Element>, Vec<Element>) =
            originals.into_iter().partition(Element::is_frame);
        let mut created = Vec::with_capacity(remap.len());
        for original in frames.into_iter().chain(nodes) {
            let copy = match original {
                Element::Node(mut node) => {
                    node.id = remap[&node.id].clone();
                    match node.parent_frame.as_ref().and_then(|parent| remap.get(parent)) {
                        Some(parent_copy) => node.parent_frame = Some(parent_copy.clone()),
                        None => node.position = node.position + offset,
                    }
                    if let Some(name) = node.name().map(str::to_owned) {
                        node.attributes.insert(
                            keys::NAME.to_string(),
                            Value::String(format!("{name}{DUPLICATE_SUFFIX}")),
                        );
                    }
                    node.diagnostics = Default::default();
                    node.selected = false;
                    Element::Node(node)
                }
                Element::Frame(mut frame) => {
                    frame.id = remap[&frame.id].clone();
                    frame.position = frame.position + offset;
                    frame.label.push_str(DUPLICATE_SUFFIX);
                    frame.selected = false;
                    Element::Frame(frame)
                }
            };
            if let Some(id) = self.add_element(copy) {
                created.push(id);
            }
        }

        let copied_edges: Vec<EdgeCandidate> = self
            .edges
            .values()
            .filter_map(|edge| {
                let source = remap.get(&edge.source)?;
                let target = remap.get(&edge.target)?;
                Some(EdgeCandidate::new(
                    source.clone(),
                    edge.source_port.clone(),
                    target.clone(),
                    edge.target_port.clone(),
                ))
            })
            .collect();
        for candidate in copied_edges {
            self.add_edge(candidate);
        }

        tracing::debug!("Duplicated {} element(s)", created.len());
        created
    }

    /// Replace the whole graph (bulk load).
    ///
    /// Elements with duplicate ids are dropped, dangling parent references
    /// fall back to top level, and edges go through [`Graph::add_edge`] so the
    /// single-incoming-edge rule holds for loaded data as well.
    pub fn replace_all(&mut self, elements: Vec<Element>, edges: Vec<EdgeCandidate>) {
        let mark = self.changes.len();
        self.elements.clear();
        self.edges.clear();

        for element in elements {
            let id = element.id().clone();
            if self.elements.contains_key(&id) {
                tracing::warn!("Dropping element with duplicate id {id}");
                continue;
            }
            self.elements.insert(id, element);
        }

        let frame_ids: HashSet<NodeId> = self.frames().map(|frame| frame.id.clone()).collect();
        for element in self.elements.values_mut() {
            if let Element::Node(node) = element {
                if let Some(parent) = &node.parent_frame {
                    if !frame_ids.contains(parent) {
                        tracing::warn!(
                            "Node {} references missing frame {parent}; placing at top level",
                            node.id
                        );
                        node.parent_frame = None;
                    }
                }
            }
        }

        for candidate in edges {
            self.add_edge(candidate);
        }

        self.changes.truncate(mark);
        self.record(GraphChange::Replaced);
        tracing::debug!(
            "Replaced graph: {} element(s), {} edge(s)",
            self.elements.len(),
            self.edges.len()
        );
    }

    // ---------------------------------------------------------------------
    // Selection
    // ---------------------------------------------------------------------

    /// Set the selection flag of one element
    pub fn set_selected(&mut self, id: &NodeId, selected: bool) -> bool {
        let Some(element) = self.elements.get_mut(id) else {
            return false;
        };
        element.set_selected(selected);
        self.record(GraphChange::SelectionChanged);
        true
    }

    /// Select exactly the given elements
    pub fn select_only(&mut self, ids: &[NodeId]) {
        let wanted: HashSet<&NodeId> = ids.iter().collect();
        for element in self.elements.values_mut() {
            let selected = wanted.contains(element.id());
            element.set_selected(selected);
        }
        self.record(GraphChange::SelectionChanged);
    }

    /// Deselect everything
    pub fn clear_selection(&mut self) {
        self.select_only(&[]);
    }

    // ---------------------------------------------------------------------
    // Render diagnostics
    // ---------------------------------------------------------------------

    /// Clear every node's diagnostics and every edge's error flag
    pub fn clear_diagnostics(&mut self) {
        for element in self.elements.values_mut() {
            if let Element::Node(node) = element {
                node.diagnostics = Default::default();
            }
        }
        for edge in self.edges.values_mut() {
            edge.flagged = false;
        }
        self.record(GraphChange::DiagnosticsChanged);
    }

    /// Attach an error message to a node
    pub fn set_node_error(&mut self, id: &NodeId, message: impl Into<String>) -> bool {
        let Some(Element::Node(node)) = self.elements.get_mut(id) else {
            return false;
        };
        node.diagnostics.error_message = Some(message.into());
        self.record(GraphChange::DiagnosticsChanged);
        true
    }

    /// Attach a debug annotation to a node
    pub fn set_node_debug(&mut self, id: &NodeId, message: impl Into<String>) -> bool {
        let Some(Element::Node(node)) = self.elements.get_mut(id) else {
            return false;
        };
        node.diagnostics.debug_message = Some(message.into());
        self.record(GraphChange::DiagnosticsChanged);
        true
    }

    /// Flag every edge touching a node. Returns how many were flagged.
    pub fn flag_edges_for_node(&mut self, id: &NodeId) -> usize {
        let mut flagged = 0;
        for edge in self.edges.values_mut() {
            if edge.involves_node(id) {
                edge.flagged = true;
                flagged += 1;
            }
        }
        if flagged > 0 {
            self.record(GraphChange::DiagnosticsChanged);
        }
        flagged
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new(DEFAULT_GRAPH_NAME)
    }
}

fn apply_attribute(node: &mut Node, key: String, value: Value) {
    match key.as_str() {
        keys::VIEW_STATE => match value.as_str().and_then(ViewState::parse) {
            Some(view_state) => node.view_state = view_state,
            None => tracing::warn!("Ignoring invalid view state {value} on {}", node.id),
        },
        keys::ERROR => node.diagnostics.error_message = value.as_str().map(str::to_owned),
        keys::DEBUG => node.diagnostics.debug_message = value.as_str().map(str::to_owned),
        _ => match coerce_attribute(&key, value) {
            Some(value) => {
                node.attributes.insert(key, value);
            }
            None => tracing::warn!("Ignoring attribute {key} on {}: wrong type", node.id),
        },
    }
}

/// Normalize the value of an engine-recognized key; other keys pass through.
pub(crate) fn coerce_attribute(key: &str, value: Value) -> Option<Value> {
    if key == keys::NAME {
        return match value {
            Value::String(_) => Some(value),
            Value::Number(number) => Some(Value::String(number.to_string())),
            _ => None,
        };
    }

    if key == keys::ORDER {
        return match value {
            Value::Number(number) => match number.as_i64() {
                Some(int) => Some(Value::from(int)),
                None => number
                    .as_f64()
                    .filter(|float| float.fract() == 0.0)
                    .map(|float| Value::from(float as i64)),
            },
            Value::String(text) => text.trim().parse::<i64>().ok().map(Value::from),
            _ => None,
        };
    }

    if keys::TOGGLES.contains(&key) {
        return match value {
            Value::Bool(flag) => Some(Value::Bool(flag)),
            Value::Number(number) => match number.as_i64() {
                Some(0) => Some(Value::Bool(false)),
                Some(1) => Some(Value::Bool(true)),
                _ => None,
            },
            Value::String(text) => match text.as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        };
    }

    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::Ports;
    use serde_json::json;

    fn circle(id: &str) -> Node {
        Node::new("Circle", Ports::new().with_output("shape", "Mobject"))
            .with_id(id)
            .with_attribute("name", "circle_1")
    }

    fn fade_in(id: &str) -> Node {
        Node::new(
            "FadeIn",
            Ports::new()
                .with_input("target", "Mobject")
                .with_output("animation", "Animation"),
        )
        .with_id(id)
    }

    #[test]
    fn test_add_edge_supersedes_same_target_port() {
        let mut graph = Graph::default();
        graph.add_node(circle("n1"));
        graph.add_node(fade_in("n2"));
        graph.add_node(circle("n3"));

        let first = graph.add_edge(EdgeCandidate::new("n1", "shape", "n2", "target"));
        assert!(first.is_some());
        graph.add_edge(EdgeCandidate::new("n3", "shape", "n2", "target"));

        assert_eq!(graph.edge_count(), 1);
        let edge = graph.edges().next().unwrap();
        assert_eq!(edge.source, NodeId::new("n3"));
        assert!(graph.edge(&first.unwrap()).is_none());
    }

    #[test]
    fn test_fan_out_is_allowed() {
        let mut graph = Graph::default();
        graph.add_node(circle("n1"));
        graph.add_node(fade_in("n2"));
        graph.add_node(fade_in("n3"));

        graph.add_edge(EdgeCandidate::new("n1", "shape", "n2", "target"));
        graph.add_edge(EdgeCandidate::new("n1", "shape", "n3", "target"));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_add_edge_ignores_missing_and_frames() {
        let mut graph = Graph::default();
        graph.add_node(circle("n1"));
        graph.add_frame(Frame::new(Point::ZERO, Size::new(400.0, 300.0)).with_id("f1"));

        assert!(graph.add_edge(EdgeCandidate::new("n1", "shape", "ghost", "target")).is_none());
        assert!(graph.add_edge(EdgeCandidate::new("n1", "shape", "f1", "target")).is_none());
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_remove_node_cascades_edges() {
        let mut graph = Graph::default();
        graph.add_node(circle("n1"));
        graph.add_node(fade_in("n2"));
        graph.add_node(circle("n3"));
        graph.add_node(fade_in("n4"));
        graph.add_edge(EdgeCandidate::new("n1", "shape", "n2", "target"));
        let kept = graph
            .add_edge(EdgeCandidate::new("n3", "shape", "n4", "target"))
            .unwrap();

        assert!(graph.remove_node(&NodeId::new("n2")).is_some());
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.edge(&kept).is_some());
        assert!(graph.remove_node(&NodeId::new("n2")).is_none());
    }

    #[test]
    fn test_remove_frame_detaches_children_to_absolute() {
        let mut graph = Graph::default();
        graph.add_frame(Frame::new(Point::new(50.0, 60.0), Size::new(400.0, 300.0)).with_id("f1"));
        graph.add_node(circle("inside").with_position(10.0, 20.0).with_parent(NodeId::new("f1")));
        graph.add_node(circle("outside").with_position(500.0, 500.0));

        graph.remove_node(&NodeId::new("f1"));

        let inside = graph.node(&NodeId::new("inside")).unwrap();
        assert_eq!(inside.parent_frame, None);
        assert_eq!(inside.position, Point::new(60.0, 80.0));
        let outside = graph.node(&NodeId::new("outside")).unwrap();
        assert_eq!(outside.position, Point::new(500.0, 500.0));
    }

    #[test]
    fn test_absolute_position_translates_through_parent() {
        let mut graph = Graph::default();
        graph.add_frame(
            Frame::new(Point::new(100.0, 100.0), Size::new(400.0, 300.0)).with_id("f1"),
        );
        graph.add_node(circle("n1").with_position(5.0, 5.0).with_parent(NodeId::new("f1")));
        assert_eq!(
            graph.absolute_position(&NodeId::new("n1")),
            Some(Point::new(105.0, 105.0))
        );
    }

    #[test]
    fn test_add_node_with_missing_parent_goes_top_level() {
        let mut graph = Graph::default();
        graph.add_node(circle("n1").with_parent(NodeId::new("nope")));
        assert_eq!(graph.node(&NodeId::new("n1")).unwrap().parent_frame, None);
    }

    #[test]
    fn test_duplicate_id_is_ignored() {
        let mut graph = Graph::default();
        assert!(graph.add_node(circle("n1")).is_some());
        assert!(graph.add_node(fade_in("n1")).is_none());
        assert_eq!(graph.node(&NodeId::new("n1")).unwrap().kind, "Circle");
    }

    #[test]
    fn test_update_attributes_merges_and_coerces() {
        let mut graph = Graph::default();
        graph.add_node(circle("n1").with_attribute("radius", 1.0));
        let id = NodeId::new("n1");

        let mut partial = Attributes::new();
        partial.insert("radius".into(), json!(2.5));
        partial.insert("order".into(), json!("3"));
        partial.insert("animate".into(), json!("false"));
        partial.insert("viewState".into(), json!("collapsed"));
        partial.insert("error".into(), json!("bad radius"));
        assert!(graph.update_node_attributes(&id, partial));

        let node = graph.node(&id).unwrap();
        assert_eq!(node.attributes["radius"], json!(2.5));
        assert_eq!(node.attributes["order"], json!(3));
        assert_eq!(node.attributes["animate"], json!(false));
        assert_eq!(node.attributes["name"], json!("circle_1"));
        assert!(!node.attributes.contains_key("viewState"));
        assert_eq!(node.view_state, ViewState::Collapsed);
        assert_eq!(node.diagnostics.error_message.as_deref(), Some("bad radius"));
        assert_eq!(node.kind, "Circle");
        assert_eq!(node.ports.outputs.len(), 1);
    }

    #[test]
    fn test_update_attributes_drops_bad_values() {
        let mut graph = Graph::default();
        graph.add_node(circle("n1"));
        let id = NodeId::new("n1");

        let mut partial = Attributes::new();
        partial.insert("order".into(), json!("first"));
        partial.insert("name".into(), json!([1, 2]));
        graph.update_node_attributes(&id, partial);

        let node = graph.node(&id).unwrap();
        assert!(!node.attributes.contains_key("order"));
        assert_eq!(node.name(), Some("circle_1"));
        assert!(!graph.update_node_attributes(&NodeId::new("ghost"), Attributes::new()));
    }

    #[test]
    fn test_duplicate_copies_internal_edges_only() {
        let mut graph = Graph::default();
        graph.add_node(circle("n1").with_position(0.0, 0.0));
        graph.add_node(fade_in("n2").with_position(200.0, 0.0));
        graph.add_node(fade_in("n3").with_position(400.0, 0.0));
        graph.add_edge(EdgeCandidate::new("n1", "shape", "n2", "target"));
        graph.add_edge(EdgeCandidate::new("n1", "shape", "n3", "target"));
        graph.set_selected(&NodeId::new("n1"), true);

        let copies = graph.duplicate(&[NodeId::new("n1"), NodeId::new("n2")]);
        assert_eq!(copies.len(), 2);
        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.edge_count(), 3);

        let circle_copy = graph.node(&copies[0]).unwrap();
        assert_eq!(circle_copy.position, DUPLICATE_OFFSET);
        assert_eq!(circle_copy.name(), Some("circle_1_copy"));
        assert!(!circle_copy.selected);

        let copied_edge = graph.edges().find(|edge| edge.source == copies[0]).unwrap();
        assert_eq!(copied_edge.target, copies[1]);
    }

    #[test]
    fn test_duplicate_empty_selection_is_noop() {
        let mut graph = Graph::default();
        graph.add_node(circle("n1"));
        graph.take_changes();

        assert!(graph.duplicate(&[]).is_empty());
        assert!(graph.duplicate(&[NodeId::new("ghost")]).is_empty());
        assert_eq!(graph.element_count(), 1);
        assert!(graph.take_changes().is_empty());
    }

    #[test]
    fn test_duplicate_frame_with_child() {
        let mut graph = Graph::default();
        graph.add_frame(Frame::new(Point::new(0.0, 0.0), Size::new(400.0, 300.0)).with_id("f1"));
        graph.add_node(circle("n1").with_position(10.0, 10.0).with_parent(NodeId::new("f1")));

        let copies = graph.duplicate(&[NodeId::new("f1"), NodeId::new("n1")]);
        let frame_copy = graph.frame(&copies[0]).unwrap();
        assert_eq!(frame_copy.label, "Frame_copy");
        assert_eq!(frame_copy.position, DUPLICATE_OFFSET);

        let child_copy = graph.node(&copies[1]).unwrap();
        assert_eq!(child_copy.parent_frame.as_ref(), Some(&copies[0]));
        assert_eq!(child_copy.position, Point::new(10.0, 10.0));
    }

    #[test]
    fn test_duplicate_frame_created_after_child() {
        let mut graph = Graph::default();
        graph.add_node(circle("n1").with_position(100.0, 100.0));
        graph.add_frame(Frame::new(Point::new(0.0, 0.0), Size::new(400.0, 300.0)).with_id("f1"));
        graph.set_parent(&NodeId::new("n1"), Some(NodeId::new("f1")), Point::new(100.0, 100.0));

        let copies = graph.duplicate(&[NodeId::new("n1"), NodeId::new("f1")]);
        assert_eq!(copies.len(), 2);
        let frame_copy = copies.iter().find(|id| graph.frame(id).is_some()).unwrap();
        let child_copy = copies.iter().find_map(|id| graph.node(id)).unwrap();
        assert_eq!(child_copy.parent_frame.as_ref(), Some(frame_copy));
        assert_eq!(child_copy.position, Point::new(100.0, 100.0));
        assert_eq!(graph.absolute_position(&child_copy.id), Some(Point::new(140.0, 140.0)));
    }

    #[test]
    fn test_replace_all_enforces_invariants() {
        let mut graph = Graph::default();
        graph.add_node(circle("old"));

        graph.replace_all(
            vec![
                circle("n1").into(),
                circle("n3").into(),
                fade_in("n2").with_parent(NodeId::new("missing")).into(),
            ],
            vec![
                EdgeCandidate::new("n1", "shape", "n2", "target").with_id("e1"),
                EdgeCandidate::new("n3", "shape", "n2", "target").with_id("e2"),
                EdgeCandidate::new("n1", "shape", "ghost", "target").with_id("e3"),
            ],
        );

        assert!(graph.node(&NodeId::new("old")).is_none());
        assert_eq!(graph.element_count(), 3);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.edge(&EdgeId::new("e2")).is_some());
        assert_eq!(graph.node(&NodeId::new("n2")).unwrap().parent_frame, None);
        assert_eq!(graph.take_changes().last(), Some(&GraphChange::Replaced));
    }

    #[test]
    fn test_selection() {
        let mut graph = Graph::default();
        graph.add_node(circle("n1"));
        graph.add_node(circle("n2"));
        graph.add_frame(Frame::new(Point::ZERO, Size::new(10.0, 10.0)).with_id("f1"));

        graph.select_only(&[NodeId::new("n2"), NodeId::new("f1")]);
        assert_eq!(graph.selected_ids(), vec![NodeId::new("n2"), NodeId::new("f1")]);

        graph.clear_selection();
        assert!(graph.selected_ids().is_empty());
    }

    #[test]
    fn test_diagnostics_and_flags() {
        let mut graph = Graph::default();
        graph.add_node(circle("n1"));
        graph.add_node(fade_in("n2"));
        graph.add_edge(EdgeCandidate::new("n1", "shape", "n2", "target"));

        assert!(graph.set_node_error(&NodeId::new("n2"), "boom"));
        assert_eq!(graph.flag_edges_for_node(&NodeId::new("n2")), 1);
        assert!(graph.edges().all(|edge| edge.flagged));

        graph.clear_diagnostics();
        assert!(graph.nodes().all(|node| node.diagnostics.is_empty()));
        assert!(graph.edges().all(|edge| !edge.flagged));
    }

    #[test]
    fn test_dirty_tracking() {
        let mut graph = Graph::default();
        assert!(!graph.is_dirty());
        graph.add_node(circle("n1"));
        assert!(graph.is_dirty());
        graph.mark_clean();
        graph.set_selected(&NodeId::new("n1"), true);
        graph.set_node_error(&NodeId::new("n1"), "x");
        assert!(!graph.is_dirty());
    }
}
