// SPDX-License-Identifier: MIT OR Apache-2.0
//! Parent/child relationships between nodes and frames.
//!
//! Membership is decided by the node's center: when a drag ends, the first
//! frame (in graph order) whose box contains the center becomes the parent.
//! Resizing a frame never re-evaluates membership.

use crate::bounds::NodeBounds;
use crate::geometry::{Point, Rect, Size};
use crate::graph::Graph;
use crate::node::{Frame, NodeId};
use serde::{Deserialize, Serialize};

/// Frame sizing rules
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainmentConfig {
    /// Resize snapping increment
    pub grid: f64,
    /// Smallest allowed frame
    pub min_frame_size: Size,
    /// Size of newly created frames
    pub default_frame_size: Size,
}

impl Default for ContainmentConfig {
    fn default() -> Self {
        Self {
            grid: 15.0,
            min_frame_size: Size::new(200.0, 150.0),
            default_frame_size: Size::new(400.0, 300.0),
        }
    }
}

impl ContainmentConfig {
    /// Snap a size to the grid, clamped to the minimum
    pub fn snap_frame_size(&self, size: Size) -> Size {
        let snap = |value: f64| {
            if self.grid > 0.0 {
                (value / self.grid).round() * self.grid
            } else {
                value
            }
        };
        Size::new(
            snap(size.width).max(self.min_frame_size.width),
            snap(size.height).max(self.min_frame_size.height),
        )
    }
}

/// Result of re-evaluating a node's membership
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainmentChange {
    /// The node now belongs to this frame
    Entered(NodeId),
    /// The node left this frame and is now top level
    Left(NodeId),
    /// Nothing changed
    Unchanged,
}

/// Re-evaluate membership after a drag ends.
///
/// Frames and unknown ids are left alone. The node's absolute position is
/// preserved; only its stored (relative) position and parent change.
pub fn on_drag_end(graph: &mut Graph, bounds: &impl NodeBounds, id: &NodeId) -> ContainmentChange {
    if graph.node(id).is_none() {
        return ContainmentChange::Unchanged;
    }
    let Some(rect) = bounds.absolute_rect(graph, id) else {
        return ContainmentChange::Unchanged;
    };
    let center = rect.center();
    let current = graph.node(id).and_then(|node| node.parent_frame.clone());

    let target = graph
        .frames()
        .find(|frame| frame_rect(frame).contains(center))
        .map(|frame| (frame.id.clone(), frame.position));

    match (target, current) {
        (Some((frame_id, _)), Some(current)) if frame_id == current => ContainmentChange::Unchanged,
        (Some((frame_id, frame_origin)), _) => {
            let relative = rect.origin - frame_origin;
            graph.set_parent(id, Some(frame_id.clone()), relative);
            tracing::debug!("Node {id} entered frame {frame_id}");
            ContainmentChange::Entered(frame_id)
        }
        (None, Some(current)) => {
            graph.set_parent(id, None, rect.origin);
            tracing::debug!("Node {id} left frame {current}");
            ContainmentChange::Left(current)
        }
        (None, None) => ContainmentChange::Unchanged,
    }
}

/// Insert a frame of the default size at `position`
pub fn create_frame(
    graph: &mut Graph,
    config: &ContainmentConfig,
    position: Point,
) -> Option<NodeId> {
    graph.add_frame(Frame::new(position, config.default_frame_size))
}

fn frame_rect(frame: &Frame) -> Rect {
    Rect::new(frame.position, frame.size)
}

/// An in-progress corner-handle resize
#[derive(Debug, Clone, PartialEq)]
pub struct FrameResize {
    /// Frame being resized
    pub frame: NodeId,
    start_size: Size,
    start_pointer: Point,
}

impl FrameResize {
    /// Start resizing; `None` if `frame` is not a frame
    pub fn begin(graph: &Graph, frame: &NodeId, pointer: Point) -> Option<Self> {
        let start_size = graph.frame(frame)?.size;
        Some(Self {
            frame: frame.clone(),
            start_size,
            start_pointer: pointer,
        })
    }

    /// Apply the pointer's current position
    pub fn update(&self, graph: &mut Graph, config: &ContainmentConfig, pointer: Point) -> bool {
        let delta = pointer - self.start_pointer;
        let size = config.snap_frame_size(Size::new(
            self.start_size.width + delta.x,
            self.start_size.height + delta.y,
        ));
        graph.resize_frame(&self.frame, size)
    }
}
