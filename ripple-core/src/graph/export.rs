//! Graph Export
//!
//! A diagnostic snapshot of the nodes and edges an engine currently knows
//! about, shaped for force-directed graph viewers:
//!
//! ```json
//! { "nodes": [{ "id": 1, "label": "a" }, { "id": 2 }],
//!   "links": [{ "source": 1, "target": 2 }] }
//! ```
//!
//! Nothing in the engine reads a snapshot back; it exists for debugging.

use serde::{Deserialize, Serialize};

use super::node::NodeId;

/// A node entry in a [`GraphSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub id: NodeId,

    /// Human readable label attached to the cell, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// An edge entry in a [`GraphSnapshot`]: `target` depends on `source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub source: NodeId,
    pub target: NodeId,
}

/// Nodes in registry order and links in adjacency insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<NodeEntry>,
    pub links: Vec<Link>,
}

impl GraphSnapshot {
    /// Encode as JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Encode as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Encode as MessagePack with named fields.
    pub fn to_msgpack(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec_named(self)
    }

    /// Decode a MessagePack snapshot produced by [`GraphSnapshot::to_msgpack`].
    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, rmp_serde::decode::Error> {
        rmp_serde::from_slice(bytes)
    }

    /// Label of the node with the given identity, if it has one.
    pub fn label_of(&self, id: NodeId) -> Option<&str> {
        self.nodes
            .iter()
            .find(|node| node.id == id)
            .and_then(|node| node.label.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GraphSnapshot {
        GraphSnapshot {
            nodes: vec![
                NodeEntry {
                    id: NodeId::from(1),
                    label: Some("a".to_string()),
                },
                NodeEntry {
                    id: NodeId::from(2),
                    label: None,
                },
            ],
            links: vec![Link {
                source: NodeId::from(1),
                target: NodeId::from(2),
            }],
        }
    }

    #[test]
    fn json_shape_omits_missing_labels() {
        let json = sample().to_json().unwrap();
        assert_eq!(
            json,
            r#"{"nodes":[{"id":1,"label":"a"},{"id":2}],"links":[{"source":1,"target":2}]}"#
        );
    }

    #[test]
    fn msgpack_decodes_to_the_same_snapshot() {
        let snapshot = sample();
        let bytes = snapshot.to_msgpack().unwrap();
        assert_eq!(GraphSnapshot::from_msgpack(&bytes).unwrap(), snapshot);
    }

    #[test]
    fn label_lookup() {
        let snapshot = sample();
        assert_eq!(snapshot.label_of(NodeId::from(1)), Some("a"));
        assert_eq!(snapshot.label_of(NodeId::from(2)), None);
        assert_eq!(snapshot.label_of(NodeId::from(3)), None);
    }
}
