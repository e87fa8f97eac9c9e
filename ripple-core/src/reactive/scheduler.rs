//! Digest Scheduling
//!
//! Every change notification asks the engine's [`Scheduler`] for a pass. A
//! scheduler decides when that pass runs; whatever it picks, requests that
//! arrive before the pass runs must collapse into that single pass.
//!
//! Two implementations are provided:
//!
//! - [`ManualScheduler`] only remembers that a pass is pending. Tests and
//!   hosts with their own loop step it explicitly.
//! - [`TokioScheduler`] arms a local task on the current
//!   [`LocalSet`](tokio::task::LocalSet). Each new request aborts the armed
//!   task and arms a fresh one, so the pass runs once, on the first turn of
//!   the task queue after the last request.

use std::cell::{Cell as StdCell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::error;

use super::runtime::Shared;
use crate::error::{Error, Result};

/// Host hook that runs digests later.
pub trait Scheduler {
    /// Arrange for `pass` to run once, replacing any pass still pending.
    fn request_pass(&self, pass: DeferredPass);
}

/// A digest waiting to run.
///
/// Holds the engine weakly: running a pass for an engine that has been
/// dropped does nothing.
pub struct DeferredPass {
    engine: Weak<Shared>,
}

impl DeferredPass {
    pub(crate) fn new(engine: Weak<Shared>) -> Self {
        Self { engine }
    }

    /// Run the digest now.
    pub fn run(self) -> Result<()> {
        match self.engine.upgrade() {
            Some(engine) => engine.digest(),
            None => Ok(()),
        }
    }

    /// Whether the engine this pass belongs to still exists.
    pub fn is_alive(&self) -> bool {
        self.engine.strong_count() > 0
    }
}

impl fmt::Debug for DeferredPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredPass")
            .field("alive", &self.is_alive())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Manual
// ----------------------------------------------------------------------------

#[derive(Default)]
struct ManualInner {
    pending: RefCell<Option<DeferredPass>>,
    requests: StdCell<usize>,
}

/// Scheduler stepped by hand.
///
/// Clones share state, so keep one clone and hand another to the engine.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    inner: Rc<ManualInner>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a pass has been requested and not yet run.
    pub fn is_pending(&self) -> bool {
        self.inner.pending.borrow().is_some()
    }

    /// Total number of requests received.
    pub fn request_count(&self) -> usize {
        self.inner.requests.get()
    }

    /// Run the pending pass, if any. Returns whether one ran.
    pub fn run_pending(&self) -> Result<bool> {
        let pass = self.inner.pending.borrow_mut().take();
        match pass {
            Some(pass) => {
                pass.run()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run pending passes until none is left or `max_passes` have run.
    ///
    /// Returns the number of passes run.
    pub fn run_until_idle(&self, max_passes: usize) -> Result<usize> {
        let mut passes = 0;
        while passes < max_passes && self.run_pending()? {
            passes += 1;
        }
        Ok(passes)
    }
}

impl Scheduler for ManualScheduler {
    fn request_pass(&self, pass: DeferredPass) {
        self.inner.requests.set(self.inner.requests.get() + 1);
        *self.inner.pending.borrow_mut() = Some(pass);
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.is_pending())
            .field("requests", &self.request_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tokio
// ----------------------------------------------------------------------------

#[derive(Default)]
struct TokioInner {
    armed: RefCell<Option<JoinHandle<()>>>,
    delay: Option<Duration>,
    passes: StdCell<usize>,
    failures: RefCell<Vec<Error>>,
}

/// Scheduler that runs passes as local tasks on a Tokio runtime.
///
/// Requests must be made from inside a [`LocalSet`](tokio::task::LocalSet);
/// `spawn_local` panics anywhere else. A pass that fails has nobody to return
/// its error to, so the error is logged and kept until
/// [`take_failures`](Self::take_failures) is called.
#[derive(Clone, Default)]
pub struct TokioScheduler {
    inner: Rc<TokioInner>,
}

impl TokioScheduler {
    /// Run each pass after yielding once to the task queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run each pass `delay` after the last request.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            inner: Rc::new(TokioInner {
                delay: Some(delay),
                ..TokioInner::default()
            }),
        }
    }

    /// Number of passes that have run.
    pub fn pass_count(&self) -> usize {
        self.inner.passes.get()
    }

    /// Whether a pass is armed and has not finished.
    pub fn is_pending(&self) -> bool {
        self.inner
            .armed
            .borrow()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Errors from passes that failed since the last call.
    pub fn take_failures(&self) -> Vec<Error> {
        std::mem::take(&mut *self.inner.failures.borrow_mut())
    }
}

impl Scheduler for TokioScheduler {
    fn request_pass(&self, pass: DeferredPass) {
        if let Some(previous) = self.inner.armed.borrow_mut().take() {
            previous.abort();
        }

        let delay = self.inner.delay;
        let inner = Rc::downgrade(&self.inner);
        let handle = tokio::task::spawn_local(async move {
            match delay {
                Some(delay) => tokio::time::sleep(delay).await,
                None => tokio::task::yield_now().await,
            }

            let result = pass.run();
            if let Err(err) = &result {
                error!(error = %err, internal = err.is_internal(), "scheduled digest failed");
            }

            if let Some(inner) = inner.upgrade() {
                inner.passes.set(inner.passes.get() + 1);
                if let Err(err) = result {
                    inner.failures.borrow_mut().push(err);
                }
            }
        });

        *self.inner.armed.borrow_mut() = Some(handle);
    }
}

impl fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioScheduler")
            .field("delay", &self.inner.delay)
            .field("passes", &self.pass_count())
            .field("pending", &self.is_pending())
            .finish()
    }
}
