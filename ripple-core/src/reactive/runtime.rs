//! Reactive Runtime
//!
//! The [`Engine`] connects cells, bindings, and the dependency graph, and
//! runs digests.
//!
//! # How It Works
//!
//! 1. `bind` registers identities for the inputs and the output, adds one
//!    edge per input, subscribes to the input cells, and installs the binding
//!    as the output's evaluator.
//!
//! 2. When an input cell changes, its listener marks the cell dirty and asks
//!    the scheduler for a pass.
//!
//! 3. A digest takes the dirty set as its seeds and:
//!    a. Orders the subgraph reachable from the seeds, dependencies first
//!    b. Evaluates every node in that order that has an evaluator
//!    c. Writes each callback result to its output
//!
//! # Seeds
//!
//! A seed whose binding has already run changed from the outside since the
//! last pass. That value stands for the pass as long as none of the binding's
//! inputs is a seed or has been written earlier in the same pass. Otherwise
//! the binding is evaluated like any other node.
//!
//! # Writes During a Pass
//!
//! Writes the engine makes to outputs do not dirty anything: the dependents
//! of an output come after it in the order. Every other write made while a
//! pass runs dirties the cell as usual and is handled by the next pass. A
//! pass never loops until nothing changes.
//!
//! # Failures
//!
//! A callback error stops the pass. The seeds go back into the dirty set and
//! the error is returned to whoever ran the digest. Nothing is retried.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;
use tracing::{debug, error, trace, warn};

use super::binding::{Binding, BindingHandle, BindingId, Computation, Evaluation};
use super::cell::{Cell, Value};
use super::computed::{Computed, Input};
use super::context::EvaluationContext;
use super::scheduler::{DeferredPass, Scheduler};
use crate::config::{CyclePolicy, EngineConfig};
use crate::error::{CallbackError, Error, Result};
use crate::graph::{
    DependencyGraph, DirtySet, EngineId, GraphSnapshot, IdentityRegistry, Link, NodeEntry, NodeId,
};

struct State {
    registry: IdentityRegistry,
    graph: DependencyGraph,
    dirty: DirtySet,
    bindings: IndexMap<BindingId, Rc<Computation>>,
    next_binding: u64,
}

impl State {
    fn next_binding_id(&mut self) -> BindingId {
        self.next_binding += 1;
        BindingId::from(self.next_binding)
    }
}

/// Engine internals shared by handles, listeners and deferred passes.
pub(crate) struct Shared {
    config: EngineConfig,
    state: RefCell<State>,
    context: EvaluationContext,
    scheduler: Box<dyn Scheduler>,
}

impl Shared {
    fn request_pass(self: &Rc<Self>) {
        self.scheduler
            .request_pass(DeferredPass::new(Rc::downgrade(self)));
    }

    /// Listener body for input cells.
    fn mark_changed(self: &Rc<Self>, node: NodeId) {
        if self.context.writing() == Some(node) {
            trace!(node = %node, "output written by the engine; not marked");
            return;
        }

        if self.state.borrow_mut().dirty.mark(node) {
            trace!(node = %node, "marked dirty");
        }
        self.request_pass();
    }

    pub(crate) fn digest(self: &Rc<Self>) -> Result<()> {
        if self.context.is_digesting() {
            warn!(engine = %self.config.name, "digest requested while digesting; deferring");
            self.request_pass();
            return Ok(());
        }

        let (seeds, order) = {
            let mut state = self.state.borrow_mut();
            let seeds = state.dirty.drain();
            let order = state.graph.topological_sort(&seeds);
            (seeds, order)
        };
        if seeds.is_empty() {
            return Ok(());
        }

        debug!(
            engine = %self.config.name,
            seeds = seeds.len(),
            nodes = order.len(),
            "digest started"
        );

        let _digesting = self.context.enter_digest();
        let mut evaluated = 0;
        let mut touched: IndexSet<NodeId> = seeds.iter().copied().collect();

        for &node in &order {
            match self.evaluate_node(node, &seeds, &mut touched) {
                Ok(true) => evaluated += 1,
                Ok(false) => {}
                Err(err) => {
                    if err.is_internal() {
                        error!(engine = %self.config.name, error = %err, "graph invariant violated");
                    } else {
                        debug!(engine = %self.config.name, error = %err, "digest aborted");
                    }
                    self.state.borrow_mut().dirty.restore(seeds);
                    return Err(err);
                }
            }
        }

        debug!(engine = %self.config.name, evaluated, "digest finished");
        Ok(())
    }

    /// Evaluate one node of a pass. Returns whether its callback ran.
    ///
    /// `touched` holds the seeds and every output written so far in the pass.
    fn evaluate_node(
        &self,
        node: NodeId,
        seeds: &[NodeId],
        touched: &mut IndexSet<NodeId>,
    ) -> Result<bool> {
        let computation = {
            let state = self.state.borrow();
            let Some(cell) = state.registry.lookup(node)? else {
                return Ok(false);
            };
            let Some(binding) = cell.evaluator() else {
                return Ok(false);
            };
            state
                .bindings
                .get(&binding)
                .cloned()
                .ok_or(Error::BindingNotFound(binding))?
        };

        let inputs_touched = computation
            .inputs()
            .iter()
            .any(|(_, input)| touched.contains(input));
        if computation.has_run() && !inputs_touched && seeds.binary_search(&node).is_ok() {
            trace!(node = %node, "changed since the last pass; keeping its value");
            return Ok(false);
        }

        trace!(node = %node, binding = %computation.id(), "evaluating");
        let evaluation = computation
            .evaluate()
            .map_err(|source| Error::Propagation {
                node,
                binding: computation.id(),
                source,
            })?;

        match evaluation {
            Evaluation::Gated => Ok(false),
            Evaluation::Ran(value) => {
                if let Some(value) = value {
                    if computation.writes_output() && computation.is_live() {
                        let _writing = self.context.enter_write(node);
                        computation.output().set(value);
                        touched.insert(node);
                    }
                }
                Ok(true)
            }
        }
    }

    pub(crate) fn destroy_binding(&self, id: BindingId) -> bool {
        let (computation, successor) = {
            let mut state = self.state.borrow_mut();
            let Some(computation) = state.bindings.shift_remove(&id) else {
                return false;
            };

            let output = computation.output_id();
            for (_, input) in computation.inputs() {
                let still_wired = state
                    .bindings
                    .values()
                    .any(|other| other.output_id() == output && other.has_input(*input));
                if !still_wired {
                    state.graph.remove_edge(*input, output);
                }
            }

            // Newest remaining writer of the same output takes over
            let successor = state
                .bindings
                .values()
                .rev()
                .find(|other| other.output_id() == output)
                .map(|other| other.id());
            (computation, successor)
        };

        if computation.output().remove_evaluator(id) {
            if let Some(successor) = successor {
                trace!(
                    binding = %successor,
                    output = %computation.output_id(),
                    "evaluator handed back"
                );
                computation.output().install_evaluator(successor);
            }
        }
        computation.retire();

        debug!(engine = %self.config.name, binding = %id, "binding destroyed");
        true
    }
}

/// A dependency graph of cells and the bindings between them.
///
/// Cloning an engine yields another handle to the same graph.
///
/// # Example
///
/// ```rust
/// use ripple_core::{Cell, Engine, ManualScheduler};
/// use serde_json::json;
///
/// let scheduler = ManualScheduler::new();
/// let engine = Engine::new(scheduler.clone());
///
/// let (a, b) = (Cell::new(5), Cell::empty());
/// engine.link(&a, &b)?;
///
/// // Binding replays `a`, so a pass is already pending.
/// assert!(scheduler.is_pending());
/// scheduler.run_pending()?;
/// assert_eq!(b.get(), Some(json!(5)));
///
/// a.set(8);
/// engine.digest()?;
/// assert_eq!(b.get(), Some(json!(8)));
/// # Ok::<(), ripple_core::Error>(())
/// ```
#[derive(Clone)]
pub struct Engine {
    shared: Rc<Shared>,
}

impl Engine {
    /// Create an engine with the default configuration.
    pub fn new(scheduler: impl Scheduler + 'static) -> Self {
        Self::with_config(EngineConfig::default(), scheduler)
    }

    pub fn with_config(config: EngineConfig, scheduler: impl Scheduler + 'static) -> Self {
        let id = EngineId::new();
        debug!(engine = %config.name, "engine created");
        Self {
            shared: Rc::new(Shared {
                config,
                state: RefCell::new(State {
                    registry: IdentityRegistry::new(id),
                    graph: DependencyGraph::new(),
                    dirty: DirtySet::new(),
                    bindings: IndexMap::new(),
                    next_binding: 0,
                }),
                context: EvaluationContext::default(),
                scheduler: Box::new(scheduler),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Validate and install a binding.
    ///
    /// Every input that currently holds a value is marked dirty, so the new
    /// binding is evaluated by the next pass.
    pub fn bind(&self, binding: Binding) -> Result<BindingHandle> {
        let Binding {
            inputs,
            output,
            callback,
        } = binding;

        let callback = callback.ok_or_else(|| Error::invalid_binding("binding has no callback"))?;
        if inputs.is_empty() {
            return Err(Error::invalid_binding("binding has no inputs"));
        }
        let output = match output {
            None => None,
            Some(Input::Computed(_)) => return Err(Error::NotASetter),
            Some(Input::Cell(cell)) => Some(cell),
        };
        if let Some(output) = &output {
            if inputs.iter().any(|input| input.cell().ptr_eq(output)) {
                return Err(Error::invalid_binding("output cell is also an input"));
            }
        }

        let mut state = self.shared.state.borrow_mut();

        for cell in inputs.iter().map(Input::cell).chain(output.iter()) {
            state.registry.check_owner(cell)?;
        }
        if self.shared.config.cycle_policy == CyclePolicy::Reject {
            if let Some(output_id) = output.as_ref().and_then(Cell::id) {
                for input_id in inputs.iter().filter_map(|input| input.cell().id()) {
                    if state.graph.reaches(output_id, input_id) {
                        return Err(Error::Cycle {
                            from: input_id,
                            to: output_id,
                        });
                    }
                }
            }
        }

        let writes_output = output.is_some();
        let output = output.unwrap_or_else(Cell::empty);

        let id = state.next_binding_id();
        let inputs = inputs
            .into_iter()
            .map(|input| {
                let node = state.registry.assign_id(input.cell())?;
                Ok((input, node))
            })
            .collect::<Result<SmallVec<[(Input, NodeId); 4]>>>()?;
        let output_id = state.registry.assign_id(&output)?;

        for (_, input) in &inputs {
            state.graph.add_edge(*input, output_id);
        }

        output.install_evaluator(id);
        let computation = Rc::new(Computation::new(
            id,
            inputs,
            output,
            output_id,
            writes_output,
            callback,
        ));
        state.bindings.insert(id, Rc::clone(&computation));

        let mut replayed = false;
        for (input, node) in computation.inputs() {
            if let Input::Cell(cell) = input {
                let engine = Rc::downgrade(&self.shared);
                let node = *node;
                let subscription = cell.subscribe(move |_| {
                    if let Some(engine) = engine.upgrade() {
                        engine.mark_changed(node);
                    }
                });
                computation.add_subscription(cell.clone(), subscription);
            }
            if input.get().is_some() {
                state.dirty.mark(*node);
                replayed = true;
            }
        }
        drop(state);

        debug!(
            engine = %self.shared.config.name,
            binding = %id,
            output = %output_id,
            inputs = computation.inputs().len(),
            writes_output,
            "binding installed"
        );

        if replayed {
            self.shared.request_pass();
        }

        Ok(BindingHandle::new(Rc::downgrade(&self.shared), computation))
    }

    /// Bind a callback to a new, engine-owned output and return it read-only.
    pub fn computed<I, T, F>(&self, inputs: I, callback: F) -> Result<Computed>
    where
        I: IntoIterator<Item = T>,
        T: Into<Input>,
        F: FnMut(&[Value]) -> Value + 'static,
    {
        let cell = Cell::empty();
        let handle = self.bind(
            Binding::new()
                .inputs(inputs)
                .output(cell.clone())
                .callback(callback),
        )?;
        Ok(Computed::new(cell, handle))
    }

    /// Copy `source` onto `target` whenever `source` changes.
    pub fn link(&self, source: impl Into<Input>, target: impl Into<Input>) -> Result<BindingHandle> {
        self.bind(
            Binding::new()
                .input(source)
                .output(target)
                .try_callback(|values| Ok::<_, CallbackError>(values.first().cloned())),
        )
    }

    /// Run a propagation pass now.
    ///
    /// Called from inside a callback, it requests a scheduled pass instead and
    /// returns immediately.
    pub fn digest(&self) -> Result<()> {
        self.shared.digest()
    }

    /// Whether a digest is running.
    pub fn is_digesting(&self) -> bool {
        self.shared.context.is_digesting()
    }

    /// Whether any change is waiting for a digest.
    pub fn has_pending_changes(&self) -> bool {
        !self.shared.state.borrow().dirty.is_empty()
    }

    /// Whether `dependent` currently depends on `dependency` in the graph.
    pub fn has_edge(&self, dependency: &Cell, dependent: &Cell) -> bool {
        match (dependency.id(), dependent.id()) {
            (Some(from), Some(to)) => self.shared.state.borrow().graph.has_edge(from, to),
            _ => false,
        }
    }

    /// Number of identities assigned so far.
    pub fn node_count(&self) -> usize {
        self.shared.state.borrow().registry.len()
    }

    pub fn edge_count(&self) -> usize {
        self.shared.state.borrow().graph.edge_count()
    }

    /// Number of live bindings.
    pub fn binding_count(&self) -> usize {
        self.shared.state.borrow().bindings.len()
    }

    /// Snapshot of live nodes and current edges, for debugging.
    pub fn serialize_graph(&self) -> GraphSnapshot {
        let state = self.shared.state.borrow();
        GraphSnapshot {
            nodes: state
                .registry
                .iter()
                .map(|(id, cell)| NodeEntry {
                    id,
                    label: cell.label(),
                })
                .collect(),
            links: state
                .graph
                .edges()
                .map(|(source, target)| Link { source, target })
                .collect(),
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("Engine")
            .field("name", &self.shared.config.name)
            .field("nodes", &state.registry.len())
            .field("edges", &state.graph.edge_count())
            .field("bindings", &state.bindings.len())
            .field("dirty", &state.dirty.len())
            .finish()
    }
}
