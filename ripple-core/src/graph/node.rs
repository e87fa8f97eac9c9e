//! Node Identity
//!
//! This module defines node identities and the registry that hands them out.
//!
//! Every cell that takes part in a binding is given a [`NodeId`] the first
//! time an engine encounters it. Identities start at 1, grow strictly, and are
//! never reused for the lifetime of the engine. The registry keeps only weak
//! back-references: it never decides how long a cell lives.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::reactive::{Cell, WeakCell};

/// Unique identifier for a node in the dependency graph.
///
/// Identities are scoped to the engine that assigned them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of an engine instance.
///
/// Cells remember which engine registered them so that one cell can never be
/// wired into two independent graphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineId(u64);

impl EngineId {
    /// Generate a new unique engine ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for EngineId {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps node identities back to the cells that own them.
#[derive(Debug)]
pub struct IdentityRegistry {
    engine: EngineId,

    /// Next identity to hand out. Starts at 1.
    next: u64,

    /// Identity -> cell, in assignment order.
    nodes: IndexMap<NodeId, WeakCell>,
}

impl IdentityRegistry {
    /// Create an empty registry for the given engine.
    pub fn new(engine: EngineId) -> Self {
        Self {
            engine,
            next: 1,
            nodes: IndexMap::new(),
        }
    }

    /// Assign an identity to `cell` unless it already has one.
    ///
    /// Fails if the cell was registered by a different engine.
    pub fn assign_id(&mut self, cell: &Cell) -> Result<NodeId> {
        self.check_owner(cell)?;
        match cell.identity() {
            Some((_, id)) => Ok(id),
            None => {
                let id = NodeId(self.next);
                self.next += 1;
                cell.set_identity(self.engine, id);
                self.nodes.insert(id, cell.downgrade());
                Ok(id)
            }
        }
    }

    /// Fail unless `cell` is unregistered or registered with this engine.
    pub fn check_owner(&self, cell: &Cell) -> Result<()> {
        match cell.identity() {
            Some((engine, id)) if engine != self.engine => Err(Error::InvalidBinding {
                reason: format!("cell {id} is already registered with another engine"),
            }),
            _ => Ok(()),
        }
    }

    /// Resolve an identity to its cell.
    ///
    /// Returns `Ok(None)` if the cell has been dropped since it was
    /// registered. An identity this registry never assigned is an internal
    /// invariant violation.
    pub fn lookup(&self, id: NodeId) -> Result<Option<Cell>> {
        self.nodes
            .get(&id)
            .map(WeakCell::upgrade)
            .ok_or(Error::NodeNotFound(id))
    }

    /// Whether `id` was assigned by this registry.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Live cells in assignment order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Cell)> + '_ {
        self.nodes
            .iter()
            .filter_map(|(id, weak)| weak.upgrade().map(|cell| (*id, cell)))
    }

    /// Number of identities assigned so far, live or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no identity has been assigned yet.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
