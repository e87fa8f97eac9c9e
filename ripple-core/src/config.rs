//! Engine configuration.

use serde::{Deserialize, Serialize};

/// How `bind` treats an edge that would close a dependency cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    /// Accept the edge. Ordering breaks the cycle at its back-edge, so the
    /// most recently wired direction wins within a pass.
    #[default]
    Tolerate,

    /// Refuse the binding with `Error::Cycle`.
    Reject,
}

/// Settings for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Name reported in log records.
    pub name: String,

    pub cycle_policy: CyclePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "ripple".to_string(),
            cycle_policy: CyclePolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.cycle_policy = policy;
        self
    }
}
