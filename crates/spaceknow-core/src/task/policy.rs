//! Polling bounds for `retrieve`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Optional limits on how long a flow keeps polling a pending job.
///
/// The default is unbounded: polling continues for as long as the service
/// keeps reporting a non-terminal status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Maximum number of status checks before giving up.
    pub max_attempts: Option<u32>,
    /// Maximum total time spent in `retrieve` before giving up.
    pub deadline: Option<Duration>,
}

impl PollPolicy {
    /// No attempt cap and no deadline.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_attempts.is_none() && self.deadline.is_none()
    }

    /// Whether another status check is allowed after `attempts` checks.
    pub fn allows_attempt(&self, attempts: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempts < max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unbounded() {
        let policy = PollPolicy::default();
        assert!(policy.is_unbounded());
        assert!(policy.allows_attempt(u32::MAX - 1));
    }

    #[test]
    fn test_attempt_cap() {
        let policy = PollPolicy::unbounded().with_max_attempts(2);
        assert!(policy.allows_attempt(0));
        assert!(policy.allows_attempt(1));
        assert!(!policy.allows_attempt(2));
        assert!(!policy.is_unbounded());
    }
}
