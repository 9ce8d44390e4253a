// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node and frame definitions for the graph.

use crate::geometry::{Point, Size};
use crate::port::{PortDirection, PortType, Ports};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Type tag used on the wire for frame nodes
pub const FRAME_KIND: &str = "__groupFrame";

/// Default frame label
pub const DEFAULT_FRAME_LABEL: &str = "Frame";

/// Attribute keys the engine understands. Everything else in the attribute
/// bag is opaque and only round-tripped.
pub mod keys {
    /// Display/variable name
    pub const NAME: &str = "name";
    /// Ordering index used by sequencing nodes
    pub const ORDER: &str = "order";
    /// View state (lifted into [`super::ViewState`])
    pub const VIEW_STATE: &str = "viewState";
    /// Error diagnostic (lifted into [`super::Diagnostics`])
    pub const ERROR: &str = "error";
    /// Debug diagnostic (lifted into [`super::Diagnostics`])
    pub const DEBUG: &str = "debug";
    /// Boolean toggles coerced to `bool`
    pub const TOGGLES: &[&str] = &["animate", "copy", "write_label"];
}

/// Ordered attribute bag of a node
pub type Attributes = IndexMap<String, Value>;

/// Unique identifier for a node or frame
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Wrap an existing id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh id prefixed with the lowercased kind
    pub fn generate(kind: &str) -> Self {
        let prefix = if kind == FRAME_KIND {
            "frame".to_string()
        } else {
            kind.to_lowercase()
        };
        Self(format!("{prefix}_{}", Uuid::new_v4()))
    }

    /// Get the raw id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// How much of a node body is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewState {
    /// Header only
    Collapsed,
    /// Ports and primary attributes
    #[default]
    Normal,
    /// Every attribute
    Expanded,
}

impl ViewState {
    /// Parse the wire spelling
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "collapsed" => Some(Self::Collapsed),
            "normal" => Some(Self::Normal),
            "expanded" => Some(Self::Expanded),
            _ => None,
        }
    }

    /// Wire spelling
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Collapsed => "collapsed",
            Self::Normal => "normal",
            Self::Expanded => "expanded",
        }
    }
}

/// Transient feedback from the render service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Error attributed to this node by the last render
    pub error_message: Option<String>,
    /// Debug annotation routed to this node by the last render
    pub debug_message: Option<String>,
}

impl Diagnostics {
    /// True if nothing is set
    pub fn is_empty(&self) -> bool {
        self.error_message.is_none() && self.debug_message.is_none()
    }
}

/// Which optional metadata entries a node writes into its wire `data`.
///
/// Nodes created in the editor carry all of them; loaded nodes keep what
/// their file had.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataKeys {
    /// `type`
    pub kind: bool,
    /// `inputs`
    pub inputs: bool,
    /// `outputs`
    pub outputs: bool,
}

impl Default for DataKeys {
    fn default() -> Self {
        Self {
            kind: true,
            inputs: true,
            outputs: true,
        }
    }
}

/// An ordinary (connectable) node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Node type name, e.g. `Circle`
    pub kind: String,
    /// Registry category, if known
    pub category: Option<String>,
    /// Canvas position; relative to the parent frame when contained
    pub position: Point,
    /// Containing frame
    pub parent_frame: Option<NodeId>,
    /// Display state
    pub view_state: ViewState,
    /// Attribute bag, typed per the kind's schema
    pub attributes: Attributes,
    /// Typed ports
    pub ports: Ports,
    /// Render feedback
    pub diagnostics: Diagnostics,
    /// Whether the node is selected on the canvas
    pub selected: bool,
    /// Metadata entries written to the wire `data`
    pub data_keys: DataKeys,
    /// Wire fields the engine does not interpret (`style`, `zIndex`, ...)
    pub extra: Map<String, Value>,
}

impl Node {
    /// Create a node with a fresh id
    pub fn new(kind: impl Into<String>, ports: Ports) -> Self {
        let kind = kind.into();
        Self {
            id: NodeId::generate(&kind),
            kind,
            category: None,
            position: Point::ZERO,
            parent_frame: None,
            view_state: ViewState::Normal,
            attributes: Attributes::new(),
            ports,
            diagnostics: Diagnostics::default(),
            selected: false,
            data_keys: DataKeys::default(),
            extra: Map::new(),
        }
    }

    /// Use an explicit id
    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the position
    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Point::new(x, y);
        self
    }

    /// Set the category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Place inside a frame (position is then frame-relative)
    pub fn with_parent(mut self, frame: NodeId) -> Self {
        self.parent_frame = Some(frame);
        self
    }

    /// Set an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// The `name` attribute, if it is a string
    pub fn name(&self) -> Option<&str> {
        self.attributes.get(keys::NAME).and_then(Value::as_str)
    }

    /// Type of a named port
    pub fn port_type(&self, direction: PortDirection, port: &str) -> Option<&PortType> {
        self.ports.port_type(direction, port)
    }
}

/// A visual grouping container. Frames have no ports and are never nested.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Unique instance ID
    pub id: NodeId,
    /// Top-level canvas position
    pub position: Point,
    /// Extent
    pub size: Size,
    /// Title shown in the frame header
    pub label: String,
    /// Whether the frame is selected on the canvas
    pub selected: bool,
    /// `data` entries besides label and size
    pub extra_data: Map<String, Value>,
    /// Wire fields the engine does not interpret
    pub extra: Map<String, Value>,
}

impl Frame {
    /// Create a frame with a fresh id
    pub fn new(position: Point, size: Size) -> Self {
        Self {
            id: NodeId::generate(FRAME_KIND),
            position,
            size,
            label: DEFAULT_FRAME_LABEL.to_string(),
            selected: false,
            extra_data: Map::new(),
            extra: Map::new(),
        }
    }

    /// Use an explicit id
    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Anything that lives in the node collection: an ordinary node or a frame
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// Connectable node
    Node(Node),
    /// Grouping frame
    Frame(Frame),
}

impl Element {
    /// Element id
    pub fn id(&self) -> &NodeId {
        match self {
            Self::Node(node) => &node.id,
            Self::Frame(frame) => &frame.id,
        }
    }

    /// Stored position (relative for contained nodes)
    pub fn position(&self) -> Point {
        match self {
            Self::Node(node) => node.position,
            Self::Frame(frame) => frame.position,
        }
    }

    /// Containing frame, always `None` for frames
    pub fn parent_frame(&self) -> Option<&NodeId> {
        match self {
            Self::Node(node) => node.parent_frame.as_ref(),
            Self::Frame(_) => None,
        }
    }

    /// Selection flag
    pub fn is_selected(&self) -> bool {
        match self {
            Self::Node(node) => node.selected,
            Self::Frame(frame) => frame.selected,
        }
    }

    /// Wire type tag
    pub fn kind(&self) -> &str {
        match self {
            Self::Node(node) => &node.kind,
            Self::Frame(_) => FRAME_KIND,
        }
    }

    /// Borrow as a node
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Node(node) => Some(node),
            Self::Frame(_) => None,
        }
    }

    /// Borrow as a frame
    pub fn as_frame(&self) -> Option<&Frame> {
        match self {
            Self::Frame(frame) => Some(frame),
            Self::Node(_) => None,
        }
    }

    /// True for frames
    pub fn is_frame(&self) -> bool {
        matches!(self, Self::Frame(_))
    }

    pub(crate) fn set_position(&mut self, position: Point) {
        match self {
            Self::Node(node) => node.position = position,
            Self::Frame(frame) => frame.position = position,
        }
    }

    pub(crate) fn set_selected(&mut self, selected: bool) {
        match self {
            Self::Node(node) => node.selected = selected,
            Self::Frame(frame) => frame.selected = selected,
        }
    }
}

impl From<Node> for Element {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<Frame> for Element {
    fn from(frame: Frame) -> Self {
        Self::Frame(frame)
    }
}

/// Derive a variable-friendly base name from a kind: `MathTex` → `mathtex`
pub fn base_name(kind: &str) -> String {
    kind.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_prefixed() {
        let id = NodeId::generate("FadeIn");
        assert!(id.as_str().starts_with("fadein_"));
        assert!(NodeId::generate(FRAME_KIND).as_str().starts_with("frame_"));
        assert_ne!(NodeId::generate("Circle"), NodeId::generate("Circle"));
    }

    #[test]
    fn test_view_state_spelling() {
        for state in [ViewState::Collapsed, ViewState::Normal, ViewState::Expanded] {
            assert_eq!(ViewState::parse(state.as_str()), Some(state));
        }
        assert_eq!(ViewState::parse("huge"), None);
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("MathTex"), "mathtex");
        assert_eq!(base_name("Vec3-Split"), "vec3_split");
    }

    #[test]
    fn test_frames_have_no_parent() {
        let frame = Element::from(Frame::new(Point::ZERO, Size::new(10.0, 10.0)));
        assert!(frame.parent_frame().is_none());
        assert_eq!(frame.kind(), FRAME_KIND);
    }
}
