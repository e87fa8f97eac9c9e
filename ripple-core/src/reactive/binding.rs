//! Binding Implementation
//!
//! A binding ties an ordered list of inputs to a callback and, optionally, an
//! output cell. During a digest the engine evaluates it: the inputs are read
//! in order, the callback runs, and its result is written to the output.
//!
//! # Lifecycle
//!
//! 1. [`Engine::bind`](super::Engine::bind) validates a [`Binding`], wires one
//!    graph edge per input, subscribes to the input cells, and installs the
//!    binding as the output cell's evaluator.
//!
//! 2. Every change to an input marks it dirty and asks the scheduler for a
//!    pass. The binding runs in that pass, after everything it depends on.
//!
//! 3. [`BindingHandle::destroy`] undoes all of it. Dropping the handle does
//!    not: edges and listeners outlive the handle until `destroy` is called.
//!
//! # Definedness
//!
//! If any input has no value the callback is skipped and the output is left
//! as it is. A null input is a value and does not block the callback.
//!
//! # Bindings Without Output
//!
//! A binding built without an output runs only for its side effects. The
//! engine gives it a private sentinel cell so that it still has a place in
//! the graph and gets scheduled.

use std::cell::{Cell as StdCell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;
use tracing::trace;

use super::cell::{Cell, Value};
use super::computed::Input;
use super::runtime::Shared;
use super::subscriber::SubscriptionId;
use crate::error::CallbackError;
use crate::graph::NodeId;

/// Identifier of a binding within its engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BindingId(u64);

impl BindingId {
    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for BindingId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// Callback stored by a binding.
///
/// `Ok(Some(value))` is written to the output, `Ok(None)` leaves it alone
/// (the callback may write it later through a captured cell).
pub(crate) type Callback = Box<dyn FnMut(&[Value]) -> Result<Option<Value>, CallbackError>>;

pub(crate) fn boxed<F>(callback: F) -> Callback
where
    F: FnMut(&[Value]) -> Result<Option<Value>, CallbackError> + 'static,
{
    Box::new(callback)
}

/// Description of a binding, consumed by [`Engine::bind`](super::Engine::bind).
///
/// # Example
///
/// ```rust
/// use ripple_core::{Binding, Cell, Engine, ManualScheduler};
/// use serde_json::json;
///
/// let engine = Engine::new(ManualScheduler::new());
/// let (a, b, sum) = (Cell::new(5), Cell::new(10), Cell::empty());
///
/// engine.bind(
///     Binding::new()
///         .inputs([&a, &b])
///         .output(&sum)
///         .callback(|v| json!(v[0].as_i64().unwrap_or(0) + v[1].as_i64().unwrap_or(0))),
/// )?;
///
/// engine.digest()?;
/// assert_eq!(sum.get(), Some(json!(15)));
/// # Ok::<(), ripple_core::Error>(())
/// ```
#[derive(Default)]
pub struct Binding {
    pub(crate) inputs: SmallVec<[Input; 4]>,
    pub(crate) output: Option<Input>,
    pub(crate) callback: Option<Callback>,
}

impl Binding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one input.
    pub fn input(mut self, input: impl Into<Input>) -> Self {
        self.inputs.push(input.into());
        self
    }

    /// Append several inputs, in order.
    pub fn inputs<I, T>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Input>,
    {
        self.inputs.extend(inputs.into_iter().map(Into::into));
        self
    }

    /// Cell the callback's result is written to.
    pub fn output(mut self, output: impl Into<Input>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Infallible callback whose result is written to the output.
    pub fn callback<F>(mut self, mut callback: F) -> Self
    where
        F: FnMut(&[Value]) -> Value + 'static,
    {
        self.callback = Some(boxed(move |values| Ok(Some(callback(values)))));
        self
    }

    /// Fallible callback. An error aborts the digest pass it happens in.
    pub fn try_callback<F, E>(mut self, mut callback: F) -> Self
    where
        F: FnMut(&[Value]) -> Result<Option<Value>, E> + 'static,
        E: Into<CallbackError>,
    {
        self.callback = Some(boxed(move |values| callback(values).map_err(Into::into)));
        self
    }

    /// Callback run only for its side effects; nothing is written.
    pub fn effect<F>(mut self, mut effect: F) -> Self
    where
        F: FnMut(&[Value]) + 'static,
    {
        self.callback = Some(boxed(move |values| {
            effect(values);
            Ok(None)
        }));
        self
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("inputs", &self.inputs)
            .field("output", &self.output)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Result of evaluating a computation.
#[derive(Debug, PartialEq)]
pub(crate) enum Evaluation {
    /// An input was undefined; the callback did not run.
    Gated,
    /// The callback ran and returned this value.
    Ran(Option<Value>),
}

/// A live binding as stored by the engine.
pub(crate) struct Computation {
    id: BindingId,
    inputs: SmallVec<[(Input, NodeId); 4]>,
    output: Cell,
    output_id: NodeId,
    /// False when `output` is the sentinel.
    writes_output: bool,
    callback: RefCell<Callback>,
    subscriptions: RefCell<SmallVec<[(Cell, SubscriptionId); 4]>>,
    runs: StdCell<usize>,
    live: StdCell<bool>,
}

impl Computation {
    pub(crate) fn new(
        id: BindingId,
        inputs: SmallVec<[(Input, NodeId); 4]>,
        output: Cell,
        output_id: NodeId,
        writes_output: bool,
        callback: Callback,
    ) -> Self {
        Self {
            id,
            inputs,
            output,
            output_id,
            writes_output,
            callback: RefCell::new(callback),
            subscriptions: RefCell::new(SmallVec::new()),
            runs: StdCell::new(0),
            live: StdCell::new(true),
        }
    }

    pub(crate) fn id(&self) -> BindingId {
        self.id
    }

    pub(crate) fn inputs(&self) -> &[(Input, NodeId)] {
        &self.inputs
    }

    pub(crate) fn has_input(&self, node: NodeId) -> bool {
        self.inputs.iter().any(|(_, id)| *id == node)
    }

    pub(crate) fn output(&self) -> &Cell {
        &self.output
    }

    pub(crate) fn output_id(&self) -> NodeId {
        self.output_id
    }

    pub(crate) fn writes_output(&self) -> bool {
        self.writes_output
    }

    pub(crate) fn run_count(&self) -> usize {
        self.runs.get()
    }

    pub(crate) fn has_run(&self) -> bool {
        self.runs.get() > 0
    }

    pub(crate) fn is_live(&self) -> bool {
        self.live.get()
    }

    pub(crate) fn add_subscription(&self, cell: Cell, subscription: SubscriptionId) {
        self.subscriptions.borrow_mut().push((cell, subscription));
    }

    /// Remove every listener this binding installed and mark it dead.
    pub(crate) fn retire(&self) {
        let subscriptions = std::mem::take(&mut *self.subscriptions.borrow_mut());
        for (cell, subscription) in subscriptions {
            cell.unsubscribe(subscription);
        }
        self.live.set(false);
    }

    /// Read the inputs and run the callback if all of them are defined.
    pub(crate) fn evaluate(&self) -> Result<Evaluation, CallbackError> {
        let mut values: SmallVec<[Value; 4]> = SmallVec::with_capacity(self.inputs.len());
        for (input, id) in &self.inputs {
            match input.get() {
                Some(value) => values.push(value),
                None => {
                    trace!(binding = %self.id, input = %id, "input undefined; callback skipped");
                    return Ok(Evaluation::Gated);
                }
            }
        }

        let result = {
            let mut callback = self.callback.borrow_mut();
            (&mut **callback)(values.as_slice())?
        };
        self.runs.set(self.runs.get() + 1);

        Ok(Evaluation::Ran(result))
    }
}

impl fmt::Debug for Computation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computation")
            .field("id", &self.id)
            .field("inputs", &self.inputs.iter().map(|(_, id)| *id).collect::<Vec<_>>())
            .field("output", &self.output_id)
            .field("writes_output", &self.writes_output)
            .field("runs", &self.runs.get())
            .field("live", &self.live.get())
            .finish()
    }
}

/// Handle to a live binding.
///
/// Clones refer to the same binding. Dropping every handle leaves the binding
/// running; call [`destroy`](Self::destroy) to tear it down.
#[derive(Clone)]
pub struct BindingHandle {
    engine: Weak<Shared>,
    computation: Rc<Computation>,
}

impl BindingHandle {
    pub(crate) fn new(engine: Weak<Shared>, computation: Rc<Computation>) -> Self {
        Self {
            engine,
            computation,
        }
    }

    pub fn id(&self) -> BindingId {
        self.computation.id()
    }

    /// Remove the binding's listeners, edges and evaluator.
    ///
    /// Calling it again is a no-op.
    pub fn destroy(&self) {
        match self.engine.upgrade() {
            Some(engine) => {
                engine.destroy_binding(self.id());
            }
            None => self.computation.retire(),
        }
    }

    /// Whether `destroy` has not been called yet.
    pub fn is_live(&self) -> bool {
        self.computation.is_live()
    }

    /// Number of times the callback has run.
    pub fn run_count(&self) -> usize {
        self.computation.run_count()
    }

    /// The output cell, unless the binding runs only for side effects.
    pub fn output(&self) -> Option<&Cell> {
        self.computation
            .writes_output()
            .then(|| self.computation.output())
    }
}

impl fmt::Debug for BindingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingHandle")
            .field("id", &self.id())
            .field("live", &self.is_live())
            .field("run_count", &self.run_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn computation(inputs: &[&Cell], callback: Callback) -> Computation {
        let inputs = inputs
            .iter()
            .enumerate()
            .map(|(i, cell)| (Input::from(*cell), NodeId::from(i as u64 + 1)))
            .collect();
        Computation::new(
            BindingId::from(1),
            inputs,
            Cell::empty(),
            NodeId::from(100),
            true,
            callback,
        )
    }

    fn sum() -> Callback {
        boxed(|values| Ok(Some(json!(values.iter().filter_map(Value::as_i64).sum::<i64>()))))
    }

    #[test]
    fn evaluate_passes_values_in_order() {
        let (a, b) = (Cell::new("x"), Cell::new("y"));
        let node = computation(
            &[&a, &b],
            boxed(|values| {
                let joined: String = values.iter().filter_map(Value::as_str).collect();
                Ok(Some(json!(joined)))
            }),
        );

        assert_eq!(node.evaluate().unwrap(), Evaluation::Ran(Some(json!("xy"))));
        assert_eq!(node.run_count(), 1);
    }

    #[test]
    fn undefined_input_gates_the_callback() {
        let (a, b) = (Cell::empty(), Cell::new(10));
        let node = computation(&[&a, &b], sum());

        assert_eq!(node.evaluate().unwrap(), Evaluation::Gated);
        assert!(!node.has_run());

        a.set(5);
        assert_eq!(node.evaluate().unwrap(), Evaluation::Ran(Some(json!(15))));
        assert!(node.has_run());
    }

    #[test]
    fn null_input_does_not_gate() {
        let (a, b) = (Cell::new(Value::Null), Cell::new(10));
        let node = computation(&[&a, &b], sum());

        assert_eq!(node.evaluate().unwrap(), Evaluation::Ran(Some(json!(10))));
    }

    #[test]
    fn callback_errors_are_returned() {
        let a = Cell::new(1);
        let node = computation(&[&a], boxed(|_| Err("nope".into())));

        let err = node.evaluate().unwrap_err();
        assert_eq!(err.to_string(), "nope");
        assert_eq!(node.run_count(), 0);
    }

    #[test]
    fn retire_removes_subscriptions() {
        let a = Cell::new(1);
        let node = computation(&[&a], sum());
        let sub = a.subscribe(|_| {});
        node.add_subscription(a.clone(), sub);

        assert_eq!(a.subscriber_count(), 1);
        node.retire();
        assert_eq!(a.subscriber_count(), 0);
        assert!(!node.is_live());
    }

    #[test]
    fn builder_collects_inputs_in_order() {
        let (a, b, c) = (Cell::new(1), Cell::new(2), Cell::new(3));
        let binding = Binding::new().input(&a).inputs([&b, &c]).effect(|_| {});

        assert_eq!(binding.inputs.len(), 3);
        assert!(binding.inputs[0].cell().ptr_eq(&a));
        assert!(binding.inputs[2].cell().ptr_eq(&c));
        assert!(binding.output.is_none());
        assert!(binding.callback.is_some());
    }
}
