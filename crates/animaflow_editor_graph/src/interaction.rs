// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canvas gesture handling.
//!
//! The host surface hit-tests its own widgets and feeds pointer and key events
//! in canvas coordinates; the controller turns them into graph mutations.
//!
//! Gestures:
//! - Primary drag on a node: move the selection, then re-evaluate containment
//! - Primary drag from a port: connect, or open the node picker on empty canvas
//! - Primary drag on a frame corner: resize with grid snapping
//! - Primary drag on empty canvas: box select
//! - Secondary drag anywhere: cut the edges crossing the line
//! - Delete, Escape, Duplicate keys

use crate::bounds::NodeBounds;
use crate::connection::EdgeId;
use crate::containment::{self, ContainmentChange, ContainmentConfig, FrameResize};
use crate::cutter;
use crate::geometry::{Point, Rect, Segment, Size};
use crate::graph::{Graph, DUPLICATE_OFFSET};
use crate::mediator::ConnectionMediator;
use crate::node::NodeId;
use crate::port::PortDirection;

/// Pointer button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Left button
    Primary,
    /// Right button
    Secondary,
}

/// What lies under the pointer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hit {
    /// A port handle
    Port {
        /// Owning node
        node: NodeId,
        /// Port name
        port: String,
        /// Port direction
        direction: PortDirection,
    },
    /// A node or frame body
    Element(NodeId),
    /// A frame's resize corner
    FrameHandle(NodeId),
    /// Empty canvas
    Canvas,
}

/// Editing shortcuts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKey {
    /// Delete the selection
    Delete,
    /// Cancel the current gesture
    Escape,
    /// Duplicate the selection
    Duplicate,
}

/// Input event in canvas coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    /// Button pressed
    PointerDown {
        /// Canvas position
        position: Point,
        /// Which button
        button: PointerButton,
        /// Hit-test result
        hit: Hit,
        /// Extend the selection instead of replacing it
        additive: bool,
    },
    /// Pointer moved
    PointerMove {
        /// Canvas position
        position: Point,
    },
    /// Button released
    PointerUp {
        /// Canvas position
        position: Point,
        /// Hit-test result
        hit: Hit,
    },
    /// Shortcut pressed
    Key(EditKey),
}

/// Current gesture
#[derive(Debug, Clone, Default)]
pub enum InteractionMode {
    /// Default mode - selecting and dragging
    #[default]
    Normal,
    /// Dragging selected elements
    DraggingNodes {
        /// Pointer position at drag start
        start_pointer: Point,
        /// Stored positions at drag start
        start_positions: Vec<(NodeId, Point)>,
    },
    /// Dragging a connection out of a port
    CreatingConnection {
        /// Current pointer position
        current: Point,
    },
    /// Resizing a frame
    ResizingFrame(FrameResize),
    /// Drawing a cut line
    Cutting {
        /// Line start
        start: Point,
        /// Current pointer position
        current: Point,
    },
    /// Box selection
    BoxSelect {
        /// Corner where the drag started
        start: Point,
        /// Current pointer position
        current: Point,
        /// Keep the previous selection
        additive: bool,
    },
}

/// What a handled event did
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CanvasOutcome {
    /// Nothing worth reporting
    #[default]
    None,
    /// A connection drag ended on empty canvas; the host should call
    /// [`ConnectionMediator::open_picker`] at this position
    OpenPicker(Point),
    /// Two ports were connected directly
    Connected(EdgeId),
    /// Dragged nodes changed frames
    Containment(Vec<(NodeId, ContainmentChange)>),
    /// Edges removed by a cut
    EdgesCut(Vec<EdgeId>),
    /// Number of elements deleted
    Deleted(usize),
    /// Ids of duplicated elements
    Duplicated(Vec<NodeId>),
}

/// Turns canvas events into graph edits
#[derive(Debug)]
pub struct CanvasController {
    /// Current interaction mode
    pub mode: InteractionMode,
    /// Frame sizing rules
    pub containment: ContainmentConfig,
    /// Offset for duplicated elements
    pub duplicate_offset: Point,
    mediator: ConnectionMediator,
}

impl Default for CanvasController {
    fn default() -> Self {
        Self::new(ContainmentConfig::default())
    }
}

impl CanvasController {
    /// Create a controller with the given frame rules
    pub fn new(containment: ContainmentConfig) -> Self {
        Self {
            mode: InteractionMode::Normal,
            containment,
            duplicate_offset: DUPLICATE_OFFSET,
            mediator: ConnectionMediator::new(),
        }
    }

    /// Set the duplicate offset
    pub fn with_duplicate_offset(mut self, offset: Point) -> Self {
        self.duplicate_offset = offset;
        self
    }

    /// Connection mediator, for the asynchronous picker steps
    pub fn mediator(&self) -> &ConnectionMediator {
        &self.mediator
    }

    /// Mutable connection mediator
    pub fn mediator_mut(&mut self) -> &mut ConnectionMediator {
        &mut self.mediator
    }

    /// Handle one event
    pub fn handle(
        &mut self,
        graph: &mut Graph,
        bounds: &impl NodeBounds,
        event: CanvasEvent,
    ) -> CanvasOutcome {
        match event {
            CanvasEvent::PointerDown {
                position,
                button,
                hit,
                additive,
            } => {
                self.pointer_down(graph, position, button, hit, additive);
                CanvasOutcome::None
            }
            CanvasEvent::PointerMove { position } => {
                self.pointer_move(graph, position);
                CanvasOutcome::None
            }
            CanvasEvent::PointerUp { position, hit } => {
                self.pointer_up(graph, bounds, position, hit)
            }
            CanvasEvent::Key(key) => self.key(graph, key),
        }
    }

    fn pointer_down(
        &mut self,
        graph: &mut Graph,
        position: Point,
        button: PointerButton,
        hit: Hit,
        additive: bool,
    ) {
        if button == PointerButton::Secondary {
            self.mode = InteractionMode::Cutting {
                start: position,
                current: position,
            };
            return;
        }

        // Any primary click closes an open picker
        if self.mediator.picker().is_some() {
            self.mediator.cancel();
        }

        match hit {
            Hit::Port { node, port, direction } => {
                if self.mediator.begin_drag(graph, &node, &port, direction) {
                    self.mode = InteractionMode::CreatingConnection { current: position };
                }
            }
            Hit::FrameHandle(frame) => {
                if let Some(resize) = FrameResize::begin(graph, &frame, position) {
                    self.mode = InteractionMode::ResizingFrame(resize);
                }
            }
            Hit::Element(id) => {
                let selected = graph.element(&id).is_some_and(|element| element.is_selected());
                if additive {
                    graph.set_selected(&id, true);
                } else if !selected {
                    graph.select_only(std::slice::from_ref(&id));
                }
                self.mode = InteractionMode::DraggingNodes {
                    start_pointer: position,
                    start_positions: drag_set(graph),
                };
            }
            Hit::Canvas => {
                if !additive {
                    graph.clear_selection();
                }
                self.mode = InteractionMode::BoxSelect {
                    start: position,
                    current: position,
                    additive,
                };
            }
        }
    }

    fn pointer_move(&mut self, graph: &mut Graph, position: Point) {
        match &mut self.mode {
            InteractionMode::Normal => {}
            InteractionMode::DraggingNodes {
                start_pointer,
                start_positions,
            } => {
                let delta = position - *start_pointer;
                for (id, start) in start_positions.iter() {
                    graph.move_node(id, *start + delta);
                }
            }
            InteractionMode::CreatingConnection { current }
            | InteractionMode::Cutting { current, .. }
            | InteractionMode::BoxSelect { current, .. } => *current = position,
            InteractionMode::ResizingFrame(resize) => {
                resize.update(graph, &self.containment, position);
            }
        }
    }

    fn pointer_up(
        &mut self,
        graph: &mut Graph,
        bounds: &impl NodeBounds,
        position: Point,
        hit: Hit,
    ) -> CanvasOutcome {
        match std::mem::take(&mut self.mode) {
            InteractionMode::Normal | InteractionMode::ResizingFrame(_) => CanvasOutcome::None,
            InteractionMode::DraggingNodes { start_positions, .. } => {
                let mut changes = Vec::new();
                for (id, _) in start_positions {
                    match containment::on_drag_end(graph, bounds, &id) {
                        ContainmentChange::Unchanged => {}
                        change => changes.push((id, change)),
                    }
                }
                if changes.is_empty() {
                    CanvasOutcome::None
                } else {
                    CanvasOutcome::Containment(changes)
                }
            }
            InteractionMode::CreatingConnection { .. } => match hit {
                Hit::Port { node, port, direction } => self
                    .mediator
                    .end_over_port(graph, &node, &port, direction)
                    .map_or(CanvasOutcome::None, CanvasOutcome::Connected),
                Hit::Canvas => CanvasOutcome::OpenPicker(position),
                Hit::Element(_) | Hit::FrameHandle(_) => {
                    self.mediator.cancel();
                    CanvasOutcome::None
                }
            },
            InteractionMode::Cutting { start, .. } => {
                let removed = cutter::cut_edges(graph, bounds, &Segment::new(start, position));
                if removed.is_empty() {
                    CanvasOutcome::None
                } else {
                    CanvasOutcome::EdgesCut(removed)
                }
            }
            InteractionMode::BoxSelect { start, additive, .. } => {
                let area = Rect::new(
                    Point::new(start.x.min(position.x), start.y.min(position.y)),
                    Size::new((start.x - position.x).abs(), (start.y - position.y).abs()),
                );
                let mut inside: Vec<NodeId> = graph
                    .elements()
                    .filter(|element| {
                        graph
                            .absolute_position(element.id())
                            .is_some_and(|origin| area.contains(origin))
                    })
                    .map(|element| element.id().clone())
                    .collect();
                if additive {
                    inside.extend(graph.selected_ids());
                }
                graph.select_only(&inside);
                CanvasOutcome::None
            }
        }
    }

    fn key(&mut self, graph: &mut Graph, key: EditKey) -> CanvasOutcome {
        match key {
            EditKey::Escape => {
                self.mediator.cancel();
                self.mode = InteractionMode::Normal;
                CanvasOutcome::None
            }
            EditKey::Delete => {
                let selected = graph.selected_ids();
                CanvasOutcome::Deleted(graph.remove_nodes(&selected))
            }
            EditKey::Duplicate => {
                let selected = graph.selected_ids();
                let copies = graph.duplicate_with_offset(&selected, self.duplicate_offset);
                CanvasOutcome::Duplicated(copies)
            }
        }
    }
}

/// Selected elements to move, minus nodes whose frame moves with them
fn drag_set(graph: &Graph) -> Vec<(NodeId, Point)> {
    let selected = graph.selected_ids();
    selected
        .iter()
        .filter_map(|id| graph.element(id))
        .filter(|element| {
            !matches!(element.parent_frame(), Some(frame) if selected.contains(frame))
        })
        .map(|element| (element.id().clone(), element.position()))
        .collect()
}
