use serde::{Deserialize, Serialize};

use crate::config::WorkflowConfig;

/// Renewal gate configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewalPolicy {
    pub window_days: i64,
}

impl Default for RenewalPolicy {
    fn default() -> Self {
        Self { window_days: 30 }
    }
}

impl From<&WorkflowConfig> for RenewalPolicy {
    fn from(config: &WorkflowConfig) -> Self {
        Self {
            window_days: config.renewal_window_days,
        }
    }
}
