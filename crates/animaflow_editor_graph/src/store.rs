// SPDX-License-Identifier: MIT OR Apache-2.0
//! Observable wrapper around [`Graph`].
//!
//! Mutations are applied through [`GraphStore::apply`]; once the closure
//! returns, the recorded changes are drained and handed to every subscriber
//! together with the updated graph.

use crate::graph::{Graph, GraphChange};
use indexmap::IndexMap;

/// Handle returned by [`GraphStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&[GraphChange], &Graph) + Send>;

/// Owns the graph and notifies observers after each mutation
pub struct GraphStore {
    graph: Graph,
    subscribers: IndexMap<SubscriptionId, Subscriber>,
    next_subscription: u64,
}

impl GraphStore {
    /// Wrap a graph
    pub fn new(graph: Graph) -> Self {
        Self {
            graph,
            subscribers: IndexMap::new(),
            next_subscription: 0,
        }
    }

    /// Read-only access
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Register an observer
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&[GraphChange], &Graph) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.insert(id, Box::new(callback));
        id
    }

    /// Remove an observer. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.shift_remove(&id).is_some()
    }

    /// Run a mutation and notify observers of what changed
    pub fn apply<R>(&mut self, mutate: impl FnOnce(&mut Graph) -> R) -> (R, Vec<GraphChange>) {
        let result = mutate(&mut self.graph);
        let changes = self.graph.take_changes();
        if !changes.is_empty() {
            tracing::trace!(
                "Notifying {} subscriber(s) of {} change(s)",
                self.subscribers.len(),
                changes.len()
            );
            for subscriber in self.subscribers.values_mut() {
                subscriber(&changes, &self.graph);
            }
        }
        (result, changes)
    }

    /// Take the graph back
    pub fn into_inner(self) -> Graph {
        self.graph
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new(Graph::default())
    }
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore")
            .field("graph", &self.graph)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Node, NodeId};
    use crate::port::Ports;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_subscribers_see_changes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut store = GraphStore::default();
        let sink = Arc::clone(&seen);
        let id = store.subscribe(move |changes, graph| {
            sink.lock().unwrap().push((changes.to_vec(), graph.element_count()));
        });

        let (added, changes) =
            store.apply(|graph| graph.add_node(Node::new("Circle", Ports::new()).with_id("n1")));
        assert_eq!(added, Some(NodeId::new("n1")));
        assert_eq!(changes, vec![GraphChange::ElementAdded(NodeId::new("n1"))]);
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(seen.lock().unwrap()[0].1, 1);

        // No-op mutations do not notify
        store.apply(|graph| graph.remove_node(&NodeId::new("ghost")));
        assert_eq!(seen.lock().unwrap().len(), 1);

        assert!(store.unsubscribe(id));
        store.apply(|graph| graph.remove_node(&NodeId::new("n1")));
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert!(!store.unsubscribe(id));
    }
}
