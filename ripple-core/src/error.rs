//! Error types.
//!
//! Binding validation fails eagerly at bind time. Callback failures abort the
//! digest pass they occur in and surface to whoever ran it. The two
//! `*NotFound` variants mean the engine's own bookkeeping is broken; they are
//! never expected in a correct program.

use crate::graph::NodeId;
use crate::reactive::BindingId;

/// Error produced by a binding callback.
pub type CallbackError = Box<dyn std::error::Error + 'static>;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed arguments to `bind`.
    #[error("invalid binding: {reason}")]
    InvalidBinding { reason: String },

    /// Attempt to write through a computed value.
    #[error("cannot set the value of a computed node directly")]
    NotASetter,

    /// A callback failed while the node was being evaluated.
    #[error("evaluating node {node} (binding {binding}) failed: {source}")]
    Propagation {
        node: NodeId,
        binding: BindingId,
        #[source]
        source: CallbackError,
    },

    /// Adding the edge would close a cycle under `CyclePolicy::Reject`.
    #[error("edge {from} -> {to} would create a dependency cycle")]
    Cycle { from: NodeId, to: NodeId },

    /// Identity lookup miss.
    #[error("node {0} is not registered")]
    NodeNotFound(NodeId),

    /// A cell refers to a binding the engine does not know.
    #[error("binding {0} is not registered")]
    BindingNotFound(BindingId),
}

impl Error {
    pub(crate) fn invalid_binding(reason: impl Into<String>) -> Self {
        Self::InvalidBinding {
            reason: reason.into(),
        }
    }

    /// Whether this error reports a bookkeeping bug rather than a usage or
    /// callback problem. Such errors should be treated as fatal.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::NodeNotFound(_) | Self::BindingNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let err = Error::invalid_binding("no callback");
        assert_eq!(err.to_string(), "invalid binding: no callback");

        let err = Error::NodeNotFound(NodeId::from(4));
        assert_eq!(err.to_string(), "node #4 is not registered");
        assert!(err.is_internal());

        assert!(!Error::NotASetter.is_internal());
    }

    #[test]
    fn propagation_keeps_its_source() {
        use std::error::Error as _;

        let err = Error::Propagation {
            node: NodeId::from(2),
            binding: BindingId::from(1),
            source: "boom".into(),
        };
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("boom"));
    }
}
