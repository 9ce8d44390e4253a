// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node geometry, independent of any drawing surface.

use crate::geometry::{Rect, Size};
use crate::graph::Graph;
use crate::node::{Element, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Supplies the on-canvas size of elements
pub trait NodeBounds {
    /// Size of a node or frame
    fn size(&self, element: &Element) -> Size;

    /// Absolute bounding box of an element
    fn absolute_rect(&self, graph: &Graph, id: &NodeId) -> Option<Rect> {
        let element = graph.element(id)?;
        let origin = graph.absolute_position(id)?;
        Some(Rect::new(origin, self.size(element)))
    }
}

/// Size estimate from the port row count
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatedBounds {
    /// Node width
    pub node_width: f64,
    /// Header height
    pub header_height: f64,
    /// Height of one port row
    pub row_height: f64,
    /// Bottom padding
    pub padding: f64,
}

impl Default for EstimatedBounds {
    fn default() -> Self {
        Self {
            node_width: 180.0,
            header_height: 24.0,
            row_height: 22.0,
            padding: 8.0,
        }
    }
}

impl NodeBounds for EstimatedBounds {
    fn size(&self, element: &Element) -> Size {
        match element {
            Element::Node(node) => Size::new(
                self.node_width,
                self.header_height + node.ports.row_count() as f64 * self.row_height + self.padding,
            ),
            Element::Frame(frame) => frame.size,
        }
    }
}

/// Sizes reported by the host surface, falling back to an estimate
#[derive(Debug, Clone, Default)]
pub struct MeasuredBounds {
    measured: HashMap<NodeId, Size>,
    fallback: EstimatedBounds,
}

impl MeasuredBounds {
    /// Create with a fallback estimate
    pub fn new(fallback: EstimatedBounds) -> Self {
        Self {
            measured: HashMap::new(),
            fallback,
        }
    }

    /// Record the measured size of a node
    pub fn report(&mut self, id: NodeId, size: Size) {
        self.measured.insert(id, size);
    }

    /// Forget a node
    pub fn forget(&mut self, id: &NodeId) {
        self.measured.remove(id);
    }
}

impl NodeBounds for MeasuredBounds {
    fn size(&self, element: &Element) -> Size {
        if let Element::Frame(frame) = element {
            return frame.size;
        }
        self.measured
            .get(element.id())
            .copied()
            .unwrap_or_else(|| self.fallback.size(element))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::node::{Frame, Node};
    use crate::port::Ports;

    #[test]
    fn test_estimate_uses_port_rows() {
        let ports = Ports::new()
            .with_input("a", "Mobject")
            .with_input("b", "Mobject")
            .with_output("out", "Animation");
        let node = Element::from(Node::new("FadeIn", ports));
        assert_eq!(EstimatedBounds::default().size(&node), Size::new(180.0, 76.0));
    }

    #[test]
    fn test_measured_falls_back() {
        let node = Node::new("Circle", Ports::new()).with_id("n1");
        let other = Element::from(Node::new("Circle", Ports::new()).with_id("n2"));
        let mut bounds = MeasuredBounds::default();
        bounds.report(NodeId::new("n1"), Size::new(220.0, 90.0));

        assert_eq!(bounds.size(&Element::from(node)), Size::new(220.0, 90.0));
        assert_eq!(bounds.size(&other), Size::new(180.0, 32.0));
    }

    #[test]
    fn test_absolute_rect_of_contained_node() {
        let mut graph = Graph::default();
        graph.add_frame(Frame::new(Point::new(100.0, 50.0), Size::new(400.0, 300.0)).with_id("f1"));
        graph.add_node(
            Node::new("Circle", Ports::new())
                .with_id("n1")
                .with_position(10.0, 10.0)
                .with_parent(NodeId::new("f1")),
        );

        let rect = EstimatedBounds::default()
            .absolute_rect(&graph, &NodeId::new("n1"))
            .unwrap();
        assert_eq!(rect.origin, Point::new(110.0, 60.0));
    }
}
