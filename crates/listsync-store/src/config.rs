//! Store configuration.

use std::time::Duration;

/// Where an optimistic insert places its placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    /// End of the list (chat feeds displayed oldest first).
    #[default]
    Append,
    /// Start of the list (newest-first feeds).
    Prepend,
    /// Where the display ordering puts it; append when unordered.
    Ordered,
}

/// Configuration for store behavior.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Period of the background refresh. `None` disables polling.
    pub poll_interval: Option<Duration>,
    /// Upper bound on every gateway call. Expiry rolls back like a failure.
    /// `None` waits forever.
    pub call_timeout: Option<Duration>,
    /// Placeholder position for optimistic inserts.
    pub placement: Placement,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            poll_interval: Some(Duration::from_secs(5)),
            call_timeout: Some(Duration::from_secs(30)),
            placement: Placement::Append,
        }
    }
}

impl StoreConfig {
    /// No background polling; refresh only on explicit calls.
    pub fn manual() -> Self {
        Self {
            poll_interval: None,
            ..Self::default()
        }
    }

    pub fn with_poll_interval(mut self, interval: Option<Duration>) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.poll_interval, Some(Duration::from_secs(5)));
        assert_eq!(config.call_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.placement, Placement::Append);
    }

    #[test]
    fn test_manual_disables_polling_only() {
        let config = StoreConfig::manual().with_placement(Placement::Ordered);
        assert!(config.poll_interval.is_none());
        assert!(config.call_timeout.is_some());
        assert_eq!(config.placement, Placement::Ordered);
    }
}
