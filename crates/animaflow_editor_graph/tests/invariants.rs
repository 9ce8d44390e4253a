// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structural invariants that must hold after arbitrary edit sequences.

use animaflow_editor_graph::wire::{load_into, save, WireGraph};
use animaflow_editor_graph::{
    is_compatible, EdgeCandidate, Frame, Graph, GraphStore, Node, NodeId, Point, Ports, Size,
    ViewState,
};
use pretty_assertions::assert_eq;
use std::collections::HashSet;

const TAGS: &[&str] = &["Mobject", "Animation", "Color", "Number", "shape", "text", "Any"];

/// Small deterministic generator so the edit sequences are reproducible
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound
    }
}

fn junction(id: &str) -> Node {
    Node::new(
        "Junction",
        Ports::new()
            .with_input("a", "Any")
            .with_input("b", "Any")
            .with_output("out", "Any"),
    )
    .with_id(id)
}

fn sample_graph() -> Graph {
    let mut graph = Graph::new("Sample");
    graph.add_frame(
        Frame::new(Point::new(0.0, 0.0), Size::new(600.0, 450.0))
            .with_id("frame_a")
            .with_label("Intro"),
    );
    graph.add_node(
        Node::new("Circle", Ports::new().with_output("shape", "Mobject"))
            .with_id("circle_1")
            .with_position(30.0, 45.0)
            .with_parent(NodeId::new("frame_a"))
            .with_category("Shapes")
            .with_attribute("name", "circle_1")
            .with_attribute("radius", 1.5),
    );
    for (index, id) in ["fadein_1", "fadein_2"].iter().enumerate() {
        graph.add_node(
            Node::new(
                "FadeIn",
                Ports::new()
                    .with_input("target", "Mobject")
                    .with_output("animation", "Animation"),
            )
            .with_id(*id)
            .with_position(700.0, 200.0 * index as f64)
            .with_attribute("name", *id),
        );
    }
    graph.set_view_state(&NodeId::new("fadein_2"), ViewState::Collapsed);
    graph.add_edge(EdgeCandidate::new("circle_1", "shape", "fadein_1", "target").with_id("e1"));
    graph.add_edge(EdgeCandidate::new("circle_1", "shape", "fadein_2", "target").with_id("e2"));
    graph
}

#[test]
fn test_one_edge_per_input_under_random_edits() {
    let ids: Vec<String> = (0..6).map(|i| format!("j{i}")).collect();
    let mut graph = Graph::default();
    for id in &ids {
        graph.add_node(junction(id));
    }

    let mut rng = Lcg(7);
    for _ in 0..500 {
        let source = &ids[rng.next(ids.len())];
        let target = &ids[rng.next(ids.len())];
        let port = ["a", "b"][rng.next(2)];
        graph.add_edge(EdgeCandidate::new(source.as_str(), "out", target.as_str(), port));
        if rng.next(10) == 0 {
            let first = graph.edges().next().map(|edge| edge.id.clone());
            graph.remove_edges(first.iter());
        }

        let mut seen = HashSet::new();
        for edge in graph.edges() {
            assert!(seen.insert((edge.target.clone(), edge.target_port.clone())));
        }
    }
}

#[test]
fn test_delete_removes_exactly_incident_edges_and_children() {
    let mut graph = sample_graph();
    graph.add_node(Node::new("Square", Ports::new()).with_id("loose").with_position(900.0, 900.0));

    graph.remove_node(&NodeId::new("frame_a"));
    let circle = graph.node(&NodeId::new("circle_1")).unwrap();
    assert_eq!(circle.parent_frame, None);
    assert_eq!(circle.position, Point::new(30.0, 45.0));
    assert_eq!(graph.node(&NodeId::new("loose")).unwrap().position, Point::new(900.0, 900.0));
    assert_eq!(graph.edge_count(), 2);

    graph.remove_node(&NodeId::new("fadein_1"));
    let remaining: Vec<_> = graph.edges().map(|edge| edge.id.as_str().to_string()).collect();
    assert_eq!(remaining, vec!["e2".to_string()]);
}

#[test]
fn test_duplicating_twice_gives_disjoint_isomorphic_copies() {
    let mut graph = sample_graph();
    let selection = vec![
        NodeId::new("frame_a"),
        NodeId::new("circle_1"),
        NodeId::new("fadein_1"),
    ];

    let first = graph.duplicate(&selection);
    let second = graph.duplicate(&selection);

    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 3);
    let first_set: HashSet<_> = first.iter().collect();
    assert!(second.iter().all(|id| !first_set.contains(id)));

    let shape = |copies: &[NodeId]| {
        let mut edges: Vec<(usize, usize)> = graph
            .edges()
            .filter_map(|edge| {
                let source = copies.iter().position(|id| *id == edge.source)?;
                let target = copies.iter().position(|id| *id == edge.target)?;
                Some((source, target))
            })
            .collect();
        edges.sort_unstable();
        let parents: Vec<Option<usize>> = copies
            .iter()
            .map(|id| {
                graph
                    .element(id)
                    .and_then(|element| element.parent_frame())
                    .and_then(|parent| copies.iter().position(|copy| copy == parent))
            })
            .collect();
        (edges, parents)
    };
    assert_eq!(shape(&first), shape(&second));
    assert_eq!(shape(&first), (vec![(1, 2)], vec![None, Some(0), None]));
}

#[test]
fn test_save_load_save_is_stable() {
    let graph = sample_graph();
    let first = save(&graph).unwrap();

    let mut reloaded = Graph::default();
    load_into(&mut reloaded, &first).unwrap();
    let second = save(&reloaded).unwrap();

    assert_eq!(first, second);
    let wire = WireGraph::from_json(&second).unwrap();
    assert_eq!(wire.nodes[0].id, "frame_a");
    assert_eq!(wire.nodes[1].parent_node.as_deref(), Some("frame_a"));
}

#[test]
fn test_save_load_save_is_stable_with_child_before_frame() {
    let mut graph = Graph::new("Late frame");
    graph.add_node(junction("j1").with_position(60.0, 75.0));
    graph.add_frame(
        Frame::new(Point::new(30.0, 30.0), Size::new(300.0, 200.0)).with_id("frame_late"),
    );

    // Child listed ahead of its frame, as an older file might have it
    let mut wire = WireGraph::from_graph(&graph);
    wire.nodes.reverse();
    wire.nodes[0].parent_node = Some("frame_late".to_string());
    let document = wire.to_json().unwrap();

    let mut reloaded = Graph::default();
    load_into(&mut reloaded, &document).unwrap();
    assert_eq!(reloaded.absolute_position(&NodeId::new("j1")), Some(Point::new(90.0, 105.0)));

    let first = save(&reloaded).unwrap();
    let mut again = Graph::default();
    load_into(&mut again, &first).unwrap();
    assert_eq!(save(&again).unwrap(), first);
}

#[test]
fn test_compatibility_reflexive_and_wildcard() {
    for tag in TAGS {
        assert!(is_compatible(tag, tag));
        assert!(is_compatible("Any", tag));
        assert!(is_compatible(tag, "Any"));
    }
}

#[test]
fn test_store_publishes_load_as_single_change() {
    let mut store = GraphStore::default();
    let json = save(&sample_graph()).unwrap();

    let (result, changes) = store.apply(|graph| load_into(graph, &json));
    assert!(result.is_ok());
    assert_eq!(changes.len(), 1);
    assert_eq!(store.graph().element_count(), 4);
    assert!(!store.graph().is_dirty());
}
