//! Computed Values
//!
//! A [`Computed`] is a read-only view of a binding's output. The engine owns
//! the underlying cell; application code can read it, subscribe to it, and use
//! it as an input to further bindings, but cannot write it. Passing a computed
//! value where a writable output is expected fails with
//! [`Error::NotASetter`](crate::Error::NotASetter).
//!
//! [`Input`] is the tagged variant bindings accept. Cell inputs are observed
//! through subscriptions; computed inputs only change during a digest, so
//! they are wired through graph edges alone.

use std::fmt;

use serde::de::DeserializeOwned;

use super::binding::BindingHandle;
use super::cell::{Cell, Value};
use super::subscriber::SubscriptionId;
use crate::graph::NodeId;

/// A value derived from other values by a binding.
///
/// # Example
///
/// ```rust
/// use ripple_core::{Cell, Engine, ManualScheduler};
/// use serde_json::json;
///
/// let engine = Engine::new(ManualScheduler::new());
/// let a = Cell::new(5);
///
/// let doubled = engine.computed([&a], |v| json!(v[0].as_i64().unwrap_or(0) * 2))?;
/// let halved = engine.computed([&doubled], |v| json!(v[0].as_i64().unwrap_or(0) / 2))?;
///
/// engine.digest()?;
/// assert_eq!(doubled.get(), Some(json!(10)));
/// assert_eq!(halved.get(), Some(json!(5)));
/// # Ok::<(), ripple_core::Error>(())
/// ```
#[derive(Clone)]
pub struct Computed {
    cell: Cell,
    binding: BindingHandle,
}

impl Computed {
    pub(crate) fn new(cell: Cell, binding: BindingHandle) -> Self {
        Self { cell, binding }
    }

    /// Current value, or `None` until the binding has produced one.
    pub fn get(&self) -> Option<Value> {
        self.cell.get()
    }

    /// Current value deserialized as `T`.
    pub fn get_as<T: DeserializeOwned>(&self) -> serde_json::Result<Option<T>> {
        self.cell.get_as()
    }

    pub fn is_defined(&self) -> bool {
        self.cell.is_defined()
    }

    pub fn id(&self) -> Option<NodeId> {
        self.cell.id()
    }

    /// Attach a label used by graph exports.
    pub fn with_label(self, label: impl Into<String>) -> Self {
        self.cell.set_label(label);
        self
    }

    /// Observe every value the binding writes.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Value) + 'static,
    {
        self.cell.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.cell.unsubscribe(id)
    }

    /// The binding that produces this value.
    pub fn binding(&self) -> &BindingHandle {
        &self.binding
    }

    /// Tear down the producing binding. The last value stays readable.
    pub fn destroy(&self) {
        self.binding.destroy();
    }

    pub(crate) fn cell(&self) -> &Cell {
        &self.cell
    }
}

impl fmt::Debug for Computed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.id())
            .field("value", &self.get())
            .field("binding", &self.binding)
            .finish()
    }
}

/// Something a binding can read from.
#[derive(Debug, Clone)]
pub enum Input {
    /// A writable cell, observed through a subscription.
    Cell(Cell),
    /// The output of another binding, ordered through the graph.
    Computed(Computed),
}

impl Input {
    pub fn get(&self) -> Option<Value> {
        self.cell().get()
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, Self::Computed(_))
    }

    pub(crate) fn cell(&self) -> &Cell {
        match self {
            Self::Cell(cell) => cell,
            Self::Computed(computed) => computed.cell(),
        }
    }
}

impl From<Cell> for Input {
    fn from(cell: Cell) -> Self {
        Self::Cell(cell)
    }
}

impl From<&Cell> for Input {
    fn from(cell: &Cell) -> Self {
        Self::Cell(cell.clone())
    }
}

impl From<Computed> for Input {
    fn from(computed: Computed) -> Self {
        Self::Computed(computed)
    }
}

impl From<&Computed> for Input {
    fn from(computed: &Computed) -> Self {
        Self::Computed(computed.clone())
    }
}
