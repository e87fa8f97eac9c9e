//! Dependency Graph
//!
//! A directed graph over node identities. An edge `u -> v` means "v depends
//! on u": whenever `u` changes, `v` has to be evaluated after it.
//!
//! # Ordering
//!
//! [`DependencyGraph::topological_sort`] runs a depth-first traversal from a
//! list of seeds, marking nodes *visiting* on entry and *visited* on exit, and
//! returns the reverse post-order. Every node reachable from a seed appears
//! exactly once, and for every edge whose endpoints are both in the result the
//! source comes first.
//!
//! Cycles are tolerated. Running into a node that is still *visiting* is a
//! back-edge; the traversal skips it and carries on. Which edge of a cycle
//! ends up as the back-edge depends on traversal order, which follows
//! adjacency insertion order, so for two cells bound to each other only one
//! direction is honored per pass.

use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};
use tracing::trace;

use super::node::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Visited,
}

/// Adjacency-set graph keyed by [`NodeId`].
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// Node -> nodes that depend on it, in insertion order.
    adjacency: IndexMap<NodeId, IndexSet<NodeId>>,
}

impl DependencyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node with no edges. No-op if it is already present.
    pub fn add_node(&mut self, node: NodeId) {
        self.adjacency.entry(node).or_default();
    }

    /// Record that `dependent` depends on `dependency`.
    ///
    /// Both nodes are inserted if absent. Adding an existing edge is a no-op.
    pub fn add_edge(&mut self, dependency: NodeId, dependent: NodeId) {
        self.add_node(dependent);
        self.adjacency
            .entry(dependency)
            .or_default()
            .insert(dependent);
    }

    /// Remove the edge `dependency -> dependent` if present.
    ///
    /// The nodes themselves stay in the graph.
    pub fn remove_edge(&mut self, dependency: NodeId, dependent: NodeId) -> bool {
        self.adjacency
            .get_mut(&dependency)
            .map(|dependents| dependents.shift_remove(&dependent))
            .unwrap_or(false)
    }

    /// Whether the edge `dependency -> dependent` exists.
    pub fn has_edge(&self, dependency: NodeId, dependent: NodeId) -> bool {
        self.adjacency
            .get(&dependency)
            .is_some_and(|dependents| dependents.contains(&dependent))
    }

    /// Whether the node is present.
    pub fn contains(&self, node: NodeId) -> bool {
        self.adjacency.contains_key(&node)
    }

    /// Direct dependents of `node`, in edge insertion order.
    pub fn adjacent(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency
            .get(&node)
            .into_iter()
            .flat_map(|dependents| dependents.iter().copied())
    }

    /// All nodes, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency.keys().copied()
    }

    /// All edges as `(dependency, dependent)` pairs, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.adjacency
            .iter()
            .flat_map(|(from, dependents)| dependents.iter().map(move |to| (*from, *to)))
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(IndexSet::len).sum()
    }

    /// Whether `to` can be reached from `from` by following edges forward.
    ///
    /// A node always reaches itself.
    pub fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![from];

        while let Some(node) = stack.pop() {
            if node == to {
                return true;
            }
            if seen.insert(node) {
                stack.extend(self.adjacent(node));
            }
        }

        false
    }

    /// Order the subgraph reachable from `seeds` so dependencies come first.
    ///
    /// Seeds are included in the result. Seeds are traversed in the order
    /// given, dependents in edge insertion order.
    pub fn topological_sort(&self, seeds: &[NodeId]) -> Vec<NodeId> {
        let mut marks: HashMap<NodeId, Mark> = HashMap::new();
        let mut post_order = Vec::new();

        // (node, index of the next dependent to visit)
        let mut stack: Vec<(NodeId, usize)> = Vec::new();

        for &seed in seeds {
            if marks.contains_key(&seed) {
                continue;
            }
            marks.insert(seed, Mark::Visiting);
            stack.push((seed, 0));

            while let Some(&(node, next)) = stack.last() {
                let child = self
                    .adjacency
                    .get(&node)
                    .and_then(|dependents| dependents.get_index(next))
                    .copied();

                let Some(child) = child else {
                    stack.pop();
                    marks.insert(node, Mark::Visited);
                    post_order.push(node);
                    continue;
                };

                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }

                match marks.get(&child) {
                    None => {
                        marks.insert(child, Mark::Visiting);
                        stack.push((child, 0));
                    }
                    Some(Mark::Visiting) => {
                        trace!(from = %node, to = %child, "skipping back-edge");
                    }
                    Some(Mark::Visited) => {}
                }
            }
        }

        post_order.reverse();
        post_order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> NodeId {
        NodeId::from(raw)
    }

    fn position(order: &[NodeId], node: u64) -> usize {
        order
            .iter()
            .position(|&n| n == id(node))
            .expect("node missing from order")
    }

    #[test]
    fn add_and_remove_edges() {
        let mut graph = DependencyGraph::new();

        graph.add_edge(id(1), id(2));
        graph.add_edge(id(1), id(2));
        assert!(graph.has_edge(id(1), id(2)));
        assert_eq!(graph.edge_count(), 1);

        assert!(graph.remove_edge(id(1), id(2)));
        assert!(!graph.has_edge(id(1), id(2)));

        // Nodes survive edge removal
        assert!(graph.contains(id(1)));
        assert!(graph.contains(id(2)));

        // Removing a missing edge is a no-op
        assert!(!graph.remove_edge(id(1), id(2)));
        assert!(!graph.remove_edge(id(7), id(8)));
    }

    #[test]
    fn sort_orders_a_chain() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(id(1), id(2));
        graph.add_edge(id(2), id(3));

        assert_eq!(graph.topological_sort(&[id(1)]), vec![id(1), id(2), id(3)]);
    }

    #[test]
    fn sort_orders_a_diamond() {
        //      1
        //     / \
        //    2   |
        //    |   4
        //    3   |
        //     \ /
        //      5
        let mut graph = DependencyGraph::new();
        graph.add_edge(id(1), id(2));
        graph.add_edge(id(2), id(3));
        graph.add_edge(id(1), id(4));
        graph.add_edge(id(3), id(5));
        graph.add_edge(id(4), id(5));

        let order = graph.topological_sort(&[id(1)]);
        assert_eq!(order.len(), 5);

        for (from, to) in graph.edges() {
            assert!(position(&order, from.raw()) < position(&order, to.raw()));
        }
    }

    #[test]
    fn sort_is_restricted_to_reachable_nodes() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(id(1), id(2));
        graph.add_edge(id(3), id(4));

        assert_eq!(graph.topological_sort(&[id(3)]), vec![id(3), id(4)]);
        assert!(graph.topological_sort(&[]).is_empty());
    }

    #[test]
    fn sort_includes_unknown_seeds() {
        let graph = DependencyGraph::new();
        assert_eq!(graph.topological_sort(&[id(9)]), vec![id(9)]);
    }

    #[test]
    fn sort_is_deterministic() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(id(1), id(3));
        graph.add_edge(id(2), id(3));
        graph.add_edge(id(1), id(4));

        let first = graph.topological_sort(&[id(1), id(2)]);
        for _ in 0..10 {
            assert_eq!(graph.topological_sort(&[id(1), id(2)]), first);
        }
    }

    #[test]
    fn sort_tolerates_cycles() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(id(1), id(2));
        graph.add_edge(id(2), id(1));

        // The edge 2 -> 1 is the back-edge when starting at 1
        assert_eq!(graph.topological_sort(&[id(1), id(2)]), vec![id(1), id(2)]);
        assert_eq!(graph.topological_sort(&[id(1)]), vec![id(1), id(2)]);
        assert_eq!(graph.topological_sort(&[id(2)]), vec![id(2), id(1)]);
    }

    #[test]
    fn reachability() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(id(1), id(2));
        graph.add_edge(id(2), id(3));

        assert!(graph.reaches(id(1), id(3)));
        assert!(graph.reaches(id(2), id(2)));
        assert!(!graph.reaches(id(3), id(1)));
    }

    #[test]
    fn edges_follow_insertion_order() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(id(2), id(3));
        graph.add_edge(id(1), id(3));
        graph.add_edge(id(2), id(4));

        let edges: Vec<_> = graph.edges().collect();
        assert_eq!(
            edges,
            vec![(id(2), id(3)), (id(2), id(4)), (id(1), id(3))]
        );
        assert_eq!(graph.nodes().collect::<Vec<_>>(), vec![id(3), id(2), id(1), id(4)]);
    }
}
