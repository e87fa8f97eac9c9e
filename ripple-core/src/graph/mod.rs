//! Dependency Graph
//!
//! This module implements the bookkeeping behind propagation: who is who,
//! who depends on whom, and what changed since the last pass.
//!
//! # Overview
//!
//! - [`IdentityRegistry`] gives every participating cell a [`NodeId`] and
//!   maps identities back to cells through weak references.
//! - [`DependencyGraph`] stores edges `u -> v` meaning "v depends on u" and
//!   produces a dependency-first ordering of the subgraph reachable from a
//!   set of seeds.
//! - [`DirtySet`] accumulates the identities of changed cells between digests.
//! - [`GraphSnapshot`] is a debug export of nodes and edges.
//!
//! # Design Decisions
//!
//! 1. The graph is not required to be acyclic. Two cells bound to each other
//!    form a cycle; ordering breaks it at whichever edge the depth-first
//!    traversal meets as a back-edge.
//!
//! 2. Adjacency is insertion ordered so that ordering, and therefore the
//!    outcome of cyclic bindings, is reproducible.
//!
//! 3. None of these types is shared or global. An engine owns one of each.

mod dependency;
mod dirty;
mod export;
mod node;

pub use dependency::DependencyGraph;
pub use dirty::DirtySet;
pub use export::{GraphSnapshot, Link, NodeEntry};
pub use node::{EngineId, IdentityRegistry, NodeId};
