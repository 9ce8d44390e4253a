// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cutting edges with a drawn line.

use crate::bounds::NodeBounds;
use crate::connection::EdgeId;
use crate::geometry::Segment;
use crate::graph::Graph;

/// Edges whose center-to-center segment crosses `cut`
pub fn edges_crossing(graph: &Graph, bounds: &impl NodeBounds, cut: &Segment) -> Vec<EdgeId> {
    graph
        .edges()
        .filter(|edge| {
            let source = bounds.absolute_rect(graph, &edge.source);
            let target = bounds.absolute_rect(graph, &edge.target);
            match (source, target) {
                (Some(source), Some(target)) => {
                    Segment::new(source.center(), target.center()).intersects(cut)
                }
                _ => false,
            }
        })
        .map(|edge| edge.id.clone())
        .collect()
}

/// Remove every edge crossing `cut`. Returns the removed ids.
pub fn cut_edges(graph: &mut Graph, bounds: &impl NodeBounds, cut: &Segment) -> Vec<EdgeId> {
    let crossing = edges_crossing(graph, bounds, cut);
    if !crossing.is_empty() {
        graph.remove_edges(&crossing);
        tracing::debug!("Cut {} edge(s)", crossing.len());
    }
    crossing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::EstimatedBounds;
    use crate::connection::EdgeCandidate;
    use crate::geometry::Point;
    use crate::node::Node;
    use crate::port::Ports;

    fn graph() -> Graph {
        let ports = Ports::new().with_input("in", "Any").with_output("out", "Any");
        let mut graph = Graph::default();
        graph.add_node(Node::new("Junction", ports.clone()).with_id("a").with_position(0.0, 0.0));
        graph.add_node(Node::new("Junction", ports.clone()).with_id("b").with_position(400.0, 0.0));
        graph.add_node(Node::new("Junction", ports).with_id("c").with_position(400.0, 400.0));
        graph.add_edge(EdgeCandidate::new("a", "out", "b", "in").with_id("ab"));
        graph.add_edge(EdgeCandidate::new("b", "out", "c", "in").with_id("bc"));
        graph
    }

    #[test]
    fn test_cut_missing_everything() {
        let mut graph = graph();
        let cut = Segment::new(Point::new(-100.0, 500.0), Point::new(-50.0, 600.0));
        assert!(cut_edges(&mut graph, &EstimatedBounds::default(), &cut).is_empty());
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_cut_one_edge() {
        let mut graph = graph();
        let cut = Segment::new(Point::new(200.0, -100.0), Point::new(200.0, 100.0));
        let removed = cut_edges(&mut graph, &EstimatedBounds::default(), &cut);
        assert_eq!(removed, vec![EdgeId::new("ab")]);
        assert!(graph.edge(&EdgeId::new("bc")).is_some());
    }

    #[test]
    fn test_cut_several_edges_at_once() {
        let mut graph = graph();
        let cut = Segment::new(Point::new(100.0, -100.0), Point::new(700.0, 300.0));
        let removed = cut_edges(&mut graph, &EstimatedBounds::default(), &cut);
        assert_eq!(removed.len(), 2);
        assert_eq!(graph.edge_count(), 0);
    }
}
