//! Dirty Set
//!
//! Identities of cells that changed since the last digest. Membership is the
//! only information kept; marking a cell twice is the same as marking it once.
//! The set is drained as a whole when a digest starts and iterated in
//! ascending identity order.

use std::collections::BTreeSet;

use super::node::NodeId;

/// Pending changes awaiting the next digest.
#[derive(Debug, Default, Clone)]
pub struct DirtySet {
    nodes: BTreeSet<NodeId>,
}

impl DirtySet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a node as changed. Returns `true` if it was not already marked.
    pub fn mark(&mut self, node: NodeId) -> bool {
        self.nodes.insert(node)
    }

    /// Whether the node is marked.
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    /// Remove every mark and return the marked nodes in ascending order.
    pub fn drain(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.nodes).into_iter().collect()
    }

    /// Mark every node in `nodes`.
    pub fn restore(&mut self, nodes: impl IntoIterator<Item = NodeId>) {
        self.nodes.extend(nodes);
    }

    /// Number of marked nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether nothing is marked.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_accumulate_and_drain_in_order() {
        let mut dirty = DirtySet::new();

        assert!(dirty.mark(NodeId::from(3)));
        assert!(dirty.mark(NodeId::from(1)));
        assert!(!dirty.mark(NodeId::from(3)));
        assert_eq!(dirty.len(), 2);

        let drained = dirty.drain();
        assert_eq!(drained, vec![NodeId::from(1), NodeId::from(3)]);
        assert!(dirty.is_empty());
    }

    #[test]
    fn restore_merges_with_new_marks() {
        let mut dirty = DirtySet::new();
        dirty.mark(NodeId::from(2));
        let drained = dirty.drain();

        dirty.mark(NodeId::from(5));
        dirty.restore(drained);

        assert!(dirty.contains(NodeId::from(2)));
        assert!(dirty.contains(NodeId::from(5)));
    }
}
