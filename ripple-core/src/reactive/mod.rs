//! Reactive Primitives
//!
//! This module implements the user-facing side of propagation: cells that hold
//! values, bindings that derive values from other values, and the engine that
//! runs them in dependency order.
//!
//! # Concepts
//!
//! ## Cells
//!
//! A [`Cell`] is a container for mutable state. It knows nothing about the
//! graph; it stores a value and notifies its listeners when the value is set.
//! A cell that has never been given a value is undefined.
//!
//! ## Bindings
//!
//! A [`Binding`] reads an ordered list of inputs, runs a callback, and writes
//! the result to an output cell. Bindings are installed with
//! [`Engine::bind`] and torn down with [`BindingHandle::destroy`].
//!
//! ## Computed Values
//!
//! A [`Computed`] is a binding output owned by the engine. It can be read and
//! used as an input, but not written.
//!
//! # Implementation Notes
//!
//! Dependencies are declared, not tracked: a binding lists its inputs up
//! front, and the engine turns that list into graph edges. Propagation is
//! batched. Changes only mark cells dirty; the work happens in a digest,
//! which a [`Scheduler`] runs once per burst of changes.
//!
//! Everything here is single-threaded. Cells and engines are reference
//! counted with `Rc` and are neither `Send` nor `Sync`.

mod binding;
mod cell;
mod computed;
mod context;
mod runtime;
mod scheduler;
mod subscriber;

pub use binding::{Binding, BindingHandle, BindingId};
pub use cell::{Cell, Value};
pub use computed::{Computed, Input};
pub use runtime::Engine;
pub use scheduler::{DeferredPass, ManualScheduler, Scheduler, TokioScheduler};
pub use subscriber::SubscriptionId;

pub(crate) use cell::WeakCell;
