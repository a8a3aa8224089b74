use std::time::Duration;

/// Default bound on back-to-back failed receives within one read.
pub const DEFAULT_MAX_CONSECUTIVE_ERRORS: u32 = 8;

/// Connection runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Failed receive attempts tolerated in a row inside a single `read`
    /// before it gives up and returns what it has. `None` retries forever.
    pub max_consecutive_errors: Option<u32>,
    /// Pause between failed receive attempts inside a single `read`.
    pub error_backoff: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_consecutive_errors: Some(DEFAULT_MAX_CONSECUTIVE_ERRORS),
            error_backoff: Duration::ZERO,
        }
    }
}

impl ConnectionConfig {
    /// Configuration that retries failed receives without bound.
    pub fn unbounded() -> Self {
        Self {
            max_consecutive_errors: None,
            ..Self::default()
        }
    }
}
