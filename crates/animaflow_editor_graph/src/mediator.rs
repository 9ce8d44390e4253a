// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection mediation.
//!
//! Dragging from a port and releasing over empty canvas opens a picker of
//! node kinds that can accept the dragged connection. Picking one creates the
//! node under the cursor and wires it to the port the drag started from.
//!
//! ```text
//! Idle --begin_drag--> Pending --open_picker--> Resolved --select--> Idle
//!                         |                        |
//!                         +--end_over_port/cancel--+--cancel-------> Idle
//! ```

use crate::catalog::{CatalogError, NodeCatalog, NodeDefinition};
use crate::connection::{EdgeCandidate, EdgeId};
use crate::geometry::Point;
use crate::graph::Graph;
use crate::node::{base_name, keys, NodeId};
use crate::port::{PortDirection, PortType, Ports};
use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

/// Subtracted from the cursor so a new node appears centered under it
pub const PLACEMENT_OFFSET: Point = Point::new(75.0, 40.0);

/// Mediator errors. The mediator is back in `Idle` whenever one is returned
/// from a registry call.
#[derive(Debug, Error)]
pub enum MediatorError {
    /// No connection drag is in progress
    #[error("No pending connection")]
    NotPending,
    /// The picker is not open
    #[error("No node picker is open")]
    NotResolved,
    /// The node the drag started from no longer exists
    #[error("Connection endpoint {0} no longer exists")]
    EndpointMissing(NodeId),
    /// Registry lookup failed
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// The fixed end of a connection being dragged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConnection {
    /// Node the drag started from
    pub node: NodeId,
    /// Port the drag started from
    pub port: String,
    /// Direction of that port
    pub direction: PortDirection,
    /// Type of that port
    pub port_type: PortType,
}

impl PendingConnection {
    /// First port in `ports` that can take the other end of this connection
    pub fn compatible_port<'a>(&self, ports: &'a Ports) -> Option<&'a str> {
        ports.first_compatible(self.direction.opposite(), &self.port_type)
    }

    fn accepts(&self, definition: &NodeDefinition) -> bool {
        let side = match self.direction {
            PortDirection::Output => &definition.inputs,
            PortDirection::Input => &definition.outputs,
        };
        side.values().any(|port_type| match self.direction {
            PortDirection::Output => self.port_type.can_connect_to(port_type),
            PortDirection::Input => port_type.can_connect_to(&self.port_type),
        })
    }
}

/// Open node-kind picker
#[derive(Debug, Clone)]
pub struct ConnectionPicker {
    /// The connection that will be completed
    pub pending: PendingConnection,
    /// Canvas position where the drag ended
    pub position: Point,
    /// Live text filter
    pub filter: String,
    candidates: Vec<NodeDefinition>,
}

impl ConnectionPicker {
    /// Every compatible kind, unfiltered
    pub fn candidates(&self) -> &[NodeDefinition] {
        &self.candidates
    }

    /// Compatible kinds matching the filter
    pub fn visible(&self) -> impl Iterator<Item = &NodeDefinition> {
        let needle = self.filter.to_lowercase();
        self.candidates.iter().filter(move |definition| {
            needle.is_empty()
                || definition.display_name.to_lowercase().contains(&needle)
                || definition.category_or_default().to_lowercase().contains(&needle)
        })
    }

    /// Visible kinds grouped by category, in first-seen order
    pub fn grouped(&self) -> IndexMap<String, Vec<&NodeDefinition>> {
        let mut groups: IndexMap<String, Vec<&NodeDefinition>> = IndexMap::new();
        for definition in self.visible() {
            groups
                .entry(definition.category_or_default().to_string())
                .or_default()
                .push(definition);
        }
        groups
    }
}

/// Mediator state
#[derive(Debug, Clone, Default)]
pub enum MediatorState {
    /// Nothing in progress
    #[default]
    Idle,
    /// A connection is being dragged from a port
    Pending(PendingConnection),
    /// The drag ended on empty canvas and the picker is open
    Resolved(ConnectionPicker),
}

/// What [`ConnectionMediator::place`] created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// The new node
    pub node: NodeId,
    /// The auto-wired edge, if a compatible port was found
    pub edge: Option<EdgeId>,
}

/// Drives the drag-to-create workflow
#[derive(Debug, Default)]
pub struct ConnectionMediator {
    state: MediatorState,
}

impl ConnectionMediator {
    /// Create an idle mediator
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> &MediatorState {
        &self.state
    }

    /// True when idle
    pub fn is_idle(&self) -> bool {
        matches!(self.state, MediatorState::Idle)
    }

    /// The open picker, if any
    pub fn picker(&self) -> Option<&ConnectionPicker> {
        match &self.state {
            MediatorState::Resolved(picker) => Some(picker),
            _ => None,
        }
    }

    /// Start dragging from a port. Ignored if the port does not exist.
    pub fn begin_drag(
        &mut self,
        graph: &Graph,
        node: &NodeId,
        port: &str,
        direction: PortDirection,
    ) -> bool {
        let Some(port_type) = graph.node(node).and_then(|n| n.port_type(direction, port)) else {
            return false;
        };
        self.state = MediatorState::Pending(PendingConnection {
            node: node.clone(),
            port: port.to_string(),
            direction,
            port_type: port_type.clone(),
        });
        true
    }

    /// The drag ended over a port: connect directly if compatible, then go idle
    pub fn end_over_port(
        &mut self,
        graph: &mut Graph,
        node: &NodeId,
        port: &str,
        direction: PortDirection,
    ) -> Option<EdgeId> {
        let MediatorState::Pending(pending) = std::mem::take(&mut self.state) else {
            return None;
        };
        connect_ports(
            graph,
            (&pending.node, pending.port.as_str(), pending.direction),
            (node, port, direction),
        )
    }

    /// The drag ended over empty canvas: fetch compatible kinds and open the picker
    pub async fn open_picker(
        &mut self,
        catalog: &dyn NodeCatalog,
        position: Point,
    ) -> Result<usize, MediatorError> {
        let MediatorState::Pending(pending) = &self.state else {
            return Err(MediatorError::NotPending);
        };
        let pending = pending.clone();

        let definitions = match catalog.list().await {
            Ok(definitions) => definitions,
            Err(err) => {
                tracing::error!("Failed to list node types: {err}");
                self.state = MediatorState::Idle;
                return Err(err.into());
            }
        };

        let candidates: Vec<NodeDefinition> = definitions
            .into_iter()
            .filter(|definition| pending.accepts(definition))
            .collect();
        let count = candidates.len();
        tracing::debug!(
            "Picker opened with {count} compatible kind(s) for {}.{}",
            pending.node,
            pending.port
        );

        self.state = MediatorState::Resolved(ConnectionPicker {
            pending,
            position,
            filter: String::new(),
            candidates,
        });
        Ok(count)
    }

    /// Update the picker's text filter
    pub fn set_filter(&mut self, filter: impl Into<String>) {
        if let MediatorState::Resolved(picker) = &mut self.state {
            picker.filter = filter.into();
        }
    }

    /// Fetch the full definition of a picked kind.
    ///
    /// On failure the picker closes and nothing is created.
    pub async fn fetch_selection(
        &mut self,
        catalog: &dyn NodeCatalog,
        kind: &str,
    ) -> Result<NodeDefinition, MediatorError> {
        if self.picker().is_none() {
            return Err(MediatorError::NotResolved);
        }
        match catalog.get(kind).await {
            Ok(definition) => Ok(definition),
            Err(err) => {
                tracing::error!("Failed to fetch node type {kind}: {err}");
                self.state = MediatorState::Idle;
                Err(err.into())
            }
        }
    }

    /// Create the picked node under the cursor and wire it to the pending port
    pub fn place(
        &mut self,
        graph: &mut Graph,
        definition: &NodeDefinition,
    ) -> Result<Placement, MediatorError> {
        let MediatorState::Resolved(picker) = std::mem::take(&mut self.state) else {
            return Err(MediatorError::NotResolved);
        };
        let pending = picker.pending;
        if graph.node(&pending.node).is_none() {
            return Err(MediatorError::EndpointMissing(pending.node));
        }

        let mut node = definition.instantiate();
        node.position = picker.position - PLACEMENT_OFFSET;
        let name = format!(
            "{}_{}",
            base_name(&definition.kind),
            graph.count_of_kind(&definition.kind) + 1
        );
        node.attributes.insert(keys::NAME.to_string(), Value::String(name));
        let new_port = pending.compatible_port(&node.ports).map(str::to_owned);

        let Some(node_id) = graph.add_node(node) else {
            return Err(MediatorError::EndpointMissing(pending.node));
        };

        let edge = match new_port {
            Some(new_port) => {
                let candidate = match pending.direction {
                    PortDirection::Output => {
                        EdgeCandidate::new(pending.node, pending.port, node_id.clone(), new_port)
                    }
                    PortDirection::Input => {
                        EdgeCandidate::new(node_id.clone(), new_port, pending.node, pending.port)
                    }
                };
                graph.add_edge(candidate)
            }
            None => {
                tracing::warn!(
                    "{} has no port compatible with {}",
                    definition.kind,
                    pending.port_type
                );
                None
            }
        };

        tracing::debug!("Placed {} as {node_id}", definition.kind);
        Ok(Placement { node: node_id, edge })
    }

    /// Fetch and place in one step
    pub async fn select(
        &mut self,
        catalog: &dyn NodeCatalog,
        graph: &mut Graph,
        kind: &str,
    ) -> Result<Placement, MediatorError> {
        let definition = self.fetch_selection(catalog, kind).await?;
        self.place(graph, &definition)
    }

    /// Abandon whatever is in progress
    pub fn cancel(&mut self) {
        self.state = MediatorState::Idle;
    }
}

/// Connect two existing ports if they face opposite directions and their types match.
///
/// Either end may be the output. Returns `None` without touching the graph otherwise.
pub fn connect_ports(
    graph: &mut Graph,
    a: (&NodeId, &str, PortDirection),
    b: (&NodeId, &str, PortDirection),
) -> Option<EdgeId> {
    if a.2 == b.2 {
        return None;
    }
    let (source, target) = if a.2 == PortDirection::Output { (a, b) } else { (b, a) };

    let source_type = graph.node(source.0)?.port_type(PortDirection::Output, source.1)?;
    let target_type = graph.node(target.0)?.port_type(PortDirection::Input, target.1)?;
    if !source_type.can_connect_to(target_type) {
        tracing::debug!("Rejected {source_type} -> {target_type}");
        return None;
    }

    graph.add_edge(EdgeCandidate::new(
        source.0.clone(),
        source.1,
        target.0.clone(),
        target.1,
    ))
}
