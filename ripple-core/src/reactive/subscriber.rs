//! Subscription handles for cell listeners.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Handle returned by [`Cell::subscribe`](super::Cell::subscribe).
///
/// Pass it back to [`Cell::unsubscribe`](super::Cell::unsubscribe) to remove
/// exactly the listener it was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Generate a new unique subscription ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}
