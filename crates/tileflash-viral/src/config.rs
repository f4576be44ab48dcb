//! Timing configuration for a propagation run.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Timer budgets driving the propagation loop, all in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViralConfig {
    /// Spacing between unsolicited offers while hunting for neighbors.
    pub probe_interval_ms: u32,

    /// How long to wait for a page before asking the source again.
    /// Also the cadence of liveness requests toward the source.
    pub retry_interval_ms: u32,

    /// How long a single pull from a child keeps this node counted as
    /// active. Must lie strictly between one and two retry intervals.
    pub active_window_ms: u32,

    /// Budget without useful activity before a node gives up.
    pub startup_budget_ms: u32,

    /// Minimum delay before the next probe after serving a page, leaving
    /// the requester room to ask for the following one.
    pub serve_backoff_ms: u32,

    /// Number of passes spent flooding the go signal.
    pub go_repeats: u8,
}

impl Default for ViralConfig {
    fn default() -> Self {
        Self {
            probe_interval_ms: 100,
            retry_interval_ms: 400,
            active_window_ms: 750,
            startup_budget_ms: 3_000,
            serve_backoff_ms: 450,
            go_repeats: 3,
        }
    }
}

impl ViralConfig {
    /// A config with every budget scaled down tenfold, for tests and
    /// simulations that do not care about IR timing.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            probe_interval_ms: 10,
            retry_interval_ms: 40,
            active_window_ms: 75,
            startup_budget_ms: 300,
            serve_backoff_ms: 45,
            go_repeats: 3,
        }
    }

    #[must_use]
    pub fn with_probe_interval(mut self, ms: u32) -> Self {
        self.probe_interval_ms = ms;
        self
    }

    #[must_use]
    pub fn with_retry_interval(mut self, ms: u32) -> Self {
        self.retry_interval_ms = ms;
        self
    }

    #[must_use]
    pub fn with_active_window(mut self, ms: u32) -> Self {
        self.active_window_ms = ms;
        self
    }

    #[must_use]
    pub fn with_startup_budget(mut self, ms: u32) -> Self {
        self.startup_budget_ms = ms;
        self
    }

    #[must_use]
    pub fn with_serve_backoff(mut self, ms: u32) -> Self {
        self.serve_backoff_ms = ms;
        self
    }

    #[must_use]
    pub fn with_go_repeats(mut self, repeats: u8) -> Self {
        self.go_repeats = repeats;
        self
    }

    /// Check the relationships the protocol relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe_interval_ms == 0 {
            return Err(ConfigError::Zero("probe_interval_ms"));
        }
        if self.retry_interval_ms == 0 {
            return Err(ConfigError::Zero("retry_interval_ms"));
        }
        if self.startup_budget_ms == 0 {
            return Err(ConfigError::Zero("startup_budget_ms"));
        }
        if self.go_repeats == 0 {
            return Err(ConfigError::NoGoRepeats);
        }
        let retry = self.retry_interval_ms;
        if self.active_window_ms <= retry || self.active_window_ms >= retry.saturating_mul(2) {
            return Err(ConfigError::ActiveWindow {
                active_ms: self.active_window_ms,
                retry_ms: retry,
            });
        }
        Ok(())
    }
}
