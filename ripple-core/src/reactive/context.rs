//! Evaluation Context
//!
//! Per-engine state describing what a digest is doing right now.
//!
//! # Implementation
//!
//! Two guards maintain it. [`DigestGuard`] marks the engine as digesting for
//! the duration of a pass; a nested `digest()` call sees the flag and defers
//! to the scheduler instead of recursing. [`WriteGuard`] records which output
//! the engine is currently writing, so the change notifications that write
//! triggers are not counted as new changes: the dependents of that output
//! already come later in the same pass.
//!
//! Both guards restore the previous state when dropped, including when a
//! callback error unwinds the pass early.

use std::cell::Cell as StdCell;

use crate::graph::NodeId;

#[derive(Debug, Default)]
pub(crate) struct EvaluationContext {
    digesting: StdCell<bool>,
    writing: StdCell<Option<NodeId>>,
}

impl EvaluationContext {
    pub(crate) fn is_digesting(&self) -> bool {
        self.digesting.get()
    }

    /// Mark a digest as running until the guard is dropped.
    pub(crate) fn enter_digest(&self) -> DigestGuard<'_> {
        debug_assert!(!self.digesting.get(), "digest entered twice");
        self.digesting.set(true);
        DigestGuard { context: self }
    }

    /// Output cell the engine is writing, if any.
    pub(crate) fn writing(&self) -> Option<NodeId> {
        self.writing.get()
    }

    /// Record that the engine is writing `node` until the guard is dropped.
    pub(crate) fn enter_write(&self, node: NodeId) -> WriteGuard<'_> {
        let previous = self.writing.replace(Some(node));
        WriteGuard {
            context: self,
            previous,
        }
    }
}

pub(crate) struct DigestGuard<'a> {
    context: &'a EvaluationContext,
}

impl Drop for DigestGuard<'_> {
    fn drop(&mut self) {
        self.context.digesting.set(false);
    }
}

pub(crate) struct WriteGuard<'a> {
    context: &'a EvaluationContext,
    previous: Option<NodeId>,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.context.writing.set(self.previous);
    }
}
