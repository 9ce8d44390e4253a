// SPDX-License-Identifier: MIT OR Apache-2.0
//! Wire (JSON) graph format used for files and render requests.
//!
//! ```json
//! {
//!   "name": "Intro",
//!   "nodes": [{"id": "circle_1", "type": "Circle", "position": {"x": 0, "y": 0}, "data": {...}}],
//!   "edges": [{"id": "e1", "source": "circle_1", "target": "fadein_1",
//!              "sourceHandle": "shape", "targetHandle": "target"}],
//!   "settings": {"viewport": {"x": 0, "y": 0, "zoom": 1}}
//! }
//! ```
//!
//! Loading is all-or-nothing: the document is fully decoded before the
//! graph is touched, so a [`LoadError`] leaves the model unchanged.

use crate::connection::EdgeCandidate;
use crate::containment::ContainmentConfig;
use crate::geometry::{Point, Size};
use crate::graph::{coerce_attribute, Graph, GraphSettings, DEFAULT_GRAPH_NAME};
use crate::node::{
    keys, Attributes, DataKeys, Diagnostics, Element, Frame, Node, NodeId, ViewState,
    DEFAULT_FRAME_LABEL, FRAME_KIND,
};
use crate::port::{PortType, Ports};
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

/// Handle name used when an edge names no port and the node has none
pub const DEFAULT_HANDLE: &str = "default";

/// Stacking index written for frames so they render behind nodes
pub const FRAME_Z_INDEX: i64 = -1;

/// Generic node tag some front ends write instead of the kind; the kind is
/// then only in `data.type`
pub const GENERIC_NODE_TAG: &str = "custom";

const DATA_TYPE: &str = "type";
const DATA_CATEGORY: &str = "category";
const DATA_INPUTS: &str = "inputs";
const DATA_OUTPUTS: &str = "outputs";
const DATA_LABEL: &str = "label";
const DATA_WIDTH: &str = "width";
const DATA_HEIGHT: &str = "height";
const FIELD_STYLE: &str = "style";
const FIELD_Z_INDEX: &str = "zIndex";

/// Errors when loading a wire graph
#[derive(Debug, Error)]
pub enum LoadError {
    /// Not JSON, or missing the `nodes`/`edges` collections
    #[error("Invalid graph file: {0}")]
    Parse(#[from] serde_json::Error),
    /// A node's port table could not be read
    #[error("Node {node} has invalid {side}: {source}")]
    InvalidPorts {
        /// Offending node
        node: String,
        /// `inputs` or `outputs`
        side: &'static str,
        /// Decoding error
        source: serde_json::Error,
    },
}

/// A node or frame on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireNode {
    /// Node id
    pub id: String,
    /// Kind, or `__groupFrame`
    #[serde(rename = "type")]
    pub kind: String,
    /// Stored position
    #[serde(serialize_with = "serialize_point")]
    pub position: Point,
    /// Attributes plus kind metadata
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Parent frame id
    #[serde(rename = "parentNode", default, skip_serializing_if = "Option::is_none")]
    pub parent_node: Option<String>,
    /// `style`, `zIndex` and anything else, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An edge on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEdge {
    /// Edge id
    pub id: String,
    /// Source node
    pub source: String,
    /// Target node
    pub target: String,
    /// Source port
    #[serde(rename = "sourceHandle", default)]
    pub source_handle: Option<String>,
    /// Target port
    #[serde(rename = "targetHandle", default)]
    pub target_handle: Option<String>,
}

/// A whole graph on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireGraph {
    /// Graph name
    #[serde(default = "default_name")]
    pub name: String,
    /// Nodes and frames
    pub nodes: Vec<WireNode>,
    /// Edges
    pub edges: Vec<WireEdge>,
    /// Settings
    #[serde(default)]
    pub settings: GraphSettings,
    /// Document fields such as `id`, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_name() -> String {
    DEFAULT_GRAPH_NAME.to_string()
}

/// A decoded graph, ready to replace the model
#[derive(Debug, Clone)]
pub struct LoadedGraph {
    /// Graph name
    pub name: String,
    /// Settings
    pub settings: GraphSettings,
    /// Uninterpreted document fields
    pub extra: Map<String, Value>,
    /// Nodes and frames
    pub elements: Vec<Element>,
    /// Edges with resolved handles
    pub edges: Vec<EdgeCandidate>,
}

impl LoadedGraph {
    /// Replace the contents of `graph`
    pub fn apply(self, graph: &mut Graph) {
        graph.name = self.name;
        graph.settings = self.settings;
        graph.extra = self.extra;
        graph.replace_all(self.elements, self.edges);
        graph.mark_clean();
    }
}

impl WireGraph {
    /// Parse a JSON document
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Snapshot a graph. Frames are written before nodes so parents always
    /// precede their children.
    pub fn from_graph(graph: &Graph) -> Self {
        let frames = graph.elements().filter(|element| element.is_frame());
        let nodes = graph.elements().filter(|element| !element.is_frame());
        Self {
            name: graph.name.clone(),
            nodes: frames.chain(nodes).map(save_element).collect(),
            edges: graph
                .edges()
                .map(|edge| WireEdge {
                    id: edge.id.to_string(),
                    source: edge.source.to_string(),
                    target: edge.target.to_string(),
                    source_handle: Some(edge.source_port.clone()),
                    target_handle: Some(edge.target_port.clone()),
                })
                .collect(),
            settings: graph.settings.clone(),
            extra: graph.extra.clone(),
        }
    }

    /// Decode into model elements
    pub fn decode(self) -> Result<LoadedGraph, LoadError> {
        let elements = self
            .nodes
            .into_iter()
            .map(load_element)
            .collect::<Result<Vec<_>, _>>()?;

        let ports: HashMap<&NodeId, &Ports> = elements
            .iter()
            .filter_map(Element::as_node)
            .map(|node| (&node.id, &node.ports))
            .collect();

        let edges = self
            .edges
            .into_iter()
            .map(|edge| {
                let source = NodeId::new(edge.source);
                let target = NodeId::new(edge.target);
                let source_port = edge
                    .source_handle
                    .unwrap_or_else(|| first_port(ports.get(&source).map(|p| &p.outputs)));
                let target_port = edge
                    .target_handle
                    .unwrap_or_else(|| first_port(ports.get(&target).map(|p| &p.inputs)));
                EdgeCandidate::new(source, source_port, target, target_port)
                    .with_id(edge.id.as_str())
            })
            .collect();

        Ok(LoadedGraph {
            name: self.name,
            settings: self.settings,
            extra: self.extra,
            elements,
            edges,
        })
    }
}

/// Parse and load a JSON document into `graph`, replacing its contents
pub fn load_into(graph: &mut Graph, json: &str) -> Result<(), LoadError> {
    let loaded = WireGraph::from_json(json)?.decode()?;
    loaded.apply(graph);
    Ok(())
}

/// Serialize `graph` to pretty JSON
pub fn save(graph: &Graph) -> serde_json::Result<String> {
    WireGraph::from_graph(graph).to_json()
}

/// A coordinate or size as JSON. Whole values are written without a
/// fractional part, the way the browser front end writes them.
fn number(value: f64) -> Value {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if value.fract() == 0.0 && value.abs() < MAX_EXACT {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

fn serialize_point<S: Serializer>(point: &Point, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(2))?;
    map.serialize_entry("x", &number(point.x))?;
    map.serialize_entry("y", &number(point.y))?;
    map.end()
}

fn first_port(side: Option<&IndexMap<String, PortType>>) -> String {
    side.and_then(|ports| ports.keys().next().cloned())
        .unwrap_or_else(|| DEFAULT_HANDLE.to_string())
}

fn save_element(element: &Element) -> WireNode {
    match element {
        Element::Node(node) => {
            let mut data = Map::new();
            if node.data_keys.kind {
                data.insert(DATA_TYPE.into(), Value::String(node.kind.clone()));
            }
            if let Some(category) = &node.category {
                data.insert(DATA_CATEGORY.into(), Value::String(category.clone()));
            }
            if node.data_keys.inputs {
                data.insert(DATA_INPUTS.into(), port_table(&node.ports.inputs));
            }
            if node.data_keys.outputs {
                data.insert(DATA_OUTPUTS.into(), port_table(&node.ports.outputs));
            }
            data.extend(node.attributes.iter().map(|(key, value)| (key.clone(), value.clone())));
            if node.view_state != ViewState::Normal {
                data.insert(
                    keys::VIEW_STATE.into(),
                    Value::String(node.view_state.as_str().into()),
                );
            }
            WireNode {
                id: node.id.to_string(),
                kind: node.kind.clone(),
                position: node.position,
                data,
                parent_node: node.parent_frame.as_ref().map(NodeId::to_string),
                extra: node.extra.clone(),
            }
        }
        Element::Frame(frame) => {
            let width = number(frame.size.width);
            let height = number(frame.size.height);

            let mut data = Map::new();
            data.insert(DATA_LABEL.into(), Value::String(frame.label.clone()));
            data.insert(DATA_WIDTH.into(), width.clone());
            data.insert(DATA_HEIGHT.into(), height.clone());
            data.extend(frame.extra_data.clone());

            let mut style = Map::new();
            style.insert(DATA_WIDTH.into(), width);
            style.insert(DATA_HEIGHT.into(), height);
            let mut extra = frame.extra.clone();
            extra.insert(FIELD_STYLE.into(), Value::Object(style));
            extra.insert(FIELD_Z_INDEX.into(), Value::from(FRAME_Z_INDEX));

            WireNode {
                id: frame.id.to_string(),
                kind: FRAME_KIND.to_string(),
                position: frame.position,
                data,
                parent_node: None,
                extra,
            }
        }
    }
}

fn port_table(ports: &IndexMap<String, PortType>) -> Value {
    Value::Object(
        ports
            .iter()
            .map(|(name, port_type)| (name.clone(), Value::String(port_type.to_string())))
            .collect(),
    )
}

fn load_element(wire: WireNode) -> Result<Element, LoadError> {
    let WireNode {
        id,
        kind,
        position,
        mut data,
        parent_node,
        mut extra,
    } = wire;

    if kind == FRAME_KIND {
        let style = extra.remove(FIELD_STYLE);
        extra.remove(FIELD_Z_INDEX);
        let dimension = |key: &str, fallback: f64| {
            data.get(key)
                .and_then(Value::as_f64)
                .or_else(|| style.as_ref().and_then(|style| style.get(key)).and_then(Value::as_f64))
                .unwrap_or(fallback)
        };
        let default_size = ContainmentConfig::default().default_frame_size;
        let size = Size::new(
            dimension(DATA_WIDTH, default_size.width),
            dimension(DATA_HEIGHT, default_size.height),
        );
        let label = match data.remove(DATA_LABEL) {
            Some(Value::String(label)) => label,
            _ => DEFAULT_FRAME_LABEL.to_string(),
        };
        data.remove(DATA_WIDTH);
        data.remove(DATA_HEIGHT);
        if parent_node.is_some() {
            tracing::warn!("Frame {id} has a parent; frames are never nested");
        }

        let mut frame = Frame::new(position, size).with_id(id.as_str()).with_label(label);
        frame.extra_data = data;
        frame.extra = extra;
        return Ok(frame.into());
    }

    let data_keys = DataKeys {
        kind: data.contains_key(DATA_TYPE),
        inputs: data.contains_key(DATA_INPUTS),
        outputs: data.contains_key(DATA_OUTPUTS),
    };
    let kind = match data.remove(DATA_TYPE) {
        Some(Value::String(data_kind)) if kind == GENERIC_NODE_TAG => data_kind,
        _ => kind,
    };
    let category = data
        .remove(DATA_CATEGORY)
        .and_then(|value| value.as_str().map(str::to_owned));
    let inputs = take_ports(&mut data, &id, DATA_INPUTS)?;
    let outputs = take_ports(&mut data, &id, DATA_OUTPUTS)?;
    let view_state = match data.remove(keys::VIEW_STATE) {
        Some(value) => value.as_str().and_then(ViewState::parse).unwrap_or_else(|| {
            tracing::warn!("Node {id} has invalid view state {value}");
            ViewState::Normal
        }),
        None => ViewState::Normal,
    };
    let diagnostics = Diagnostics {
        error_message: take_string(&mut data, keys::ERROR),
        debug_message: take_string(&mut data, keys::DEBUG),
    };

    let mut attributes = Attributes::new();
    for (key, value) in data {
        match coerce_attribute(&key, value) {
            Some(value) => {
                attributes.insert(key, value);
            }
            None => tracing::warn!("Dropping attribute {key} on {id}: wrong type"),
        }
    }

    let mut node = Node::new(kind, Ports { inputs, outputs }).with_id(id.as_str());
    node.category = category;
    node.position = position;
    node.parent_frame = parent_node.map(NodeId::new);
    node.view_state = view_state;
    node.attributes = attributes;
    node.diagnostics = diagnostics;
    node.data_keys = data_keys;
    node.extra = extra;
    Ok(node.into())
}

fn take_ports(
    data: &mut Map<String, Value>,
    id: &str,
    side: &'static str,
) -> Result<IndexMap<String, PortType>, LoadError> {
    match data.remove(side) {
        None | Some(Value::Null) => Ok(IndexMap::new()),
        Some(value) => serde_json::from_value(value).map_err(|source| LoadError::InvalidPorts {
            node: id.to_string(),
            side,
            source,
        }),
    }
}

fn take_string(data: &mut Map<String, Value>, key: &str) -> Option<String> {
    data.remove(key)
        .and_then(|value| value.as_str().map(str::to_owned))
}
