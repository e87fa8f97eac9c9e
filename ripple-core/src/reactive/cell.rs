//! Cell Implementation
//!
//! A Cell is a mutable slot with change notification. It is the only kind of
//! state the engine reads and writes.
//!
//! # How Cells Work
//!
//! 1. A cell holds an optional [`Value`]. `None` means the cell has no value
//!    yet; `Some(Value::Null)` is an explicit null and counts as defined.
//!
//! 2. [`Cell::set`] stores the new value first and then calls every listener
//!    synchronously, in subscription order.
//!
//! 3. Clones share state. A cell lives as long as any clone of it does.
//!
//! # Engine Bookkeeping
//!
//! Besides the value, a cell carries the identity an engine assigned to it
//! and, when it is the output of a binding, the id of the binding whose
//! evaluator writes it. [`Cell::has_evaluator`] exposes the latter so callers
//! can check whether a binding on the cell is still live.

use std::cell::{Cell as StdCell, RefCell};
use std::fmt::{self, Debug};
use std::rc::{Rc, Weak};

use serde::de::DeserializeOwned;

use super::binding::BindingId;
use super::subscriber::SubscriptionId;
use crate::graph::{EngineId, NodeId};

/// Values stored in cells.
pub type Value = serde_json::Value;

type Listener = Rc<dyn Fn(&Value)>;

struct CellInner {
    value: RefCell<Option<Value>>,
    listeners: RefCell<Vec<(SubscriptionId, Listener)>>,
    identity: StdCell<Option<(EngineId, NodeId)>>,
    evaluator: StdCell<Option<BindingId>>,
    label: RefCell<Option<String>>,
}

/// A shared, observable value slot.
///
/// # Example
///
/// ```rust
/// use ripple_core::Cell;
///
/// let count = Cell::new(1);
/// count.set(5);
/// assert_eq!(count.get_as::<i64>().unwrap(), Some(5));
///
/// let pending = Cell::empty();
/// assert!(!pending.is_defined());
/// ```
#[derive(Clone)]
pub struct Cell {
    inner: Rc<CellInner>,
}

impl Cell {
    /// Create a cell holding `value`.
    pub fn new(value: impl Into<Value>) -> Self {
        Self::from_option(Some(value.into()))
    }

    /// Create a cell with no value.
    pub fn empty() -> Self {
        Self::from_option(None)
    }

    fn from_option(value: Option<Value>) -> Self {
        Self {
            inner: Rc::new(CellInner {
                value: RefCell::new(value),
                listeners: RefCell::new(Vec::new()),
                identity: StdCell::new(None),
                evaluator: StdCell::new(None),
                label: RefCell::new(None),
            }),
        }
    }

    /// Attach a label used by graph exports.
    pub fn with_label(self, label: impl Into<String>) -> Self {
        self.set_label(label);
        self
    }

    pub fn set_label(&self, label: impl Into<String>) {
        *self.inner.label.borrow_mut() = Some(label.into());
    }

    pub fn label(&self) -> Option<String> {
        self.inner.label.borrow().clone()
    }

    /// Get a clone of the current value, or `None` if the cell has none.
    pub fn get(&self) -> Option<Value> {
        self.inner.value.borrow().clone()
    }

    /// Get the current value deserialized as `T`.
    pub fn get_as<T: DeserializeOwned>(&self) -> serde_json::Result<Option<T>> {
        self.get().map(serde_json::from_value).transpose()
    }

    /// Whether the cell holds a value. An explicit null counts.
    pub fn is_defined(&self) -> bool {
        self.inner.value.borrow().is_some()
    }

    /// Store a new value and notify listeners.
    pub fn set(&self, value: impl Into<Value>) {
        let value = value.into();
        *self.inner.value.borrow_mut() = Some(value.clone());
        self.notify(&value);
    }

    /// Replace the value with one derived from the current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(Option<&Value>) -> Value,
    {
        let next = f(self.inner.value.borrow().as_ref());
        self.set(next);
    }

    /// Register a listener called with the new value after every `set`.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Value) + 'static,
    {
        let id = SubscriptionId::new();
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.inner.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(sub, _)| *sub != id);
        listeners.len() != before
    }

    /// Get the number of listeners.
    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    fn notify(&self, value: &Value) {
        // Snapshot so listeners may subscribe or unsubscribe while running.
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();

        for listener in listeners {
            listener(value);
        }
    }

    /// Identity assigned by the engine this cell is registered with.
    pub fn id(&self) -> Option<NodeId> {
        self.identity().map(|(_, id)| id)
    }

    /// Whether a live binding currently writes this cell.
    pub fn has_evaluator(&self) -> bool {
        self.inner.evaluator.get().is_some()
    }

    /// Whether both handles refer to the same cell.
    pub fn ptr_eq(&self, other: &Cell) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn identity(&self) -> Option<(EngineId, NodeId)> {
        self.inner.identity.get()
    }

    pub(crate) fn set_identity(&self, engine: EngineId, id: NodeId) {
        self.inner.identity.set(Some((engine, id)));
    }

    pub(crate) fn evaluator(&self) -> Option<BindingId> {
        self.inner.evaluator.get()
    }

    pub(crate) fn install_evaluator(&self, binding: BindingId) {
        self.inner.evaluator.set(Some(binding));
    }

    /// Remove the evaluator if `binding` still owns it.
    pub(crate) fn remove_evaluator(&self, binding: BindingId) -> bool {
        if self.inner.evaluator.get() == Some(binding) {
            self.inner.evaluator.set(None);
            true
        } else {
            false
        }
    }

    pub(crate) fn downgrade(&self) -> WeakCell {
        WeakCell(Rc::downgrade(&self.inner))
    }
}

impl Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("id", &self.id())
            .field("label", &self.label())
            .field("value", &self.get())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Non-owning reference to a [`Cell`].
#[derive(Debug, Clone)]
pub(crate) struct WeakCell(Weak<CellInner>);

impl WeakCell {
    pub(crate) fn upgrade(&self) -> Option<Cell> {
        self.0.upgrade().map(|inner| Cell { inner })
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
