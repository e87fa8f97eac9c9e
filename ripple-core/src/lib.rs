//! Ripple Core
//!
//! This crate provides a dependency-driven reactive computation engine. It
//! implements:
//!
//! - Observable cells holding JSON values
//! - Bindings from ordered inputs to an output through a callback
//! - A dependency graph ordered by depth-first topological sort, with cycles
//!   tolerated
//! - Batched propagation: changes mark cells dirty and a digest evaluates the
//!   affected bindings once, dependencies first
//! - Pluggable scheduling of digests, including a Tokio local-task scheduler
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: cells, bindings, computed values, the engine and schedulers
//! - `graph`: node identities, the dependency graph, the dirty set and graph
//!   export
//! - `config`: engine configuration
//! - `error`: the crate error type
//!
//! # Example
//!
//! ```rust
//! use ripple_core::{Binding, Cell, Engine, ManualScheduler};
//! use serde_json::json;
//!
//! let engine = Engine::new(ManualScheduler::new());
//!
//! let (a, b, c) = (Cell::new(5), Cell::new(10), Cell::empty());
//! engine.bind(
//!     Binding::new()
//!         .inputs([&a, &b])
//!         .output(&c)
//!         .callback(|v| json!(v[0].as_i64().unwrap_or(0) + v[1].as_i64().unwrap_or(0))),
//! )?;
//!
//! engine.digest()?;
//! assert_eq!(c.get(), Some(json!(15)));
//!
//! a.set(20);
//! engine.digest()?;
//! assert_eq!(c.get(), Some(json!(30)));
//! # Ok::<(), ripple_core::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;

pub use config::{CyclePolicy, EngineConfig};
pub use error::{CallbackError, Error, Result};
pub use graph::{GraphSnapshot, NodeId};
pub use reactive::{
    Binding, BindingHandle, BindingId, Cell, Computed, DeferredPass, Engine, Input,
    ManualScheduler, Scheduler, SubscriptionId, TokioScheduler, Value,
};
