//! Factory configuration
//!
//! ```
//! use action_thunk_core::config::ThunkConfig;
//! use action_thunk_core::environment::SystemClock;
//! use std::sync::Arc;
//!
//! let config = ThunkConfig::default()
//!     .with_clock(Arc::new(SystemClock))
//!     .with_metrics(false);
//!
//! assert!(!config.metrics_enabled());
//! ```

use crate::environment::{Clock, SystemClock};
use std::fmt;
use std::sync::Arc;

/// Configuration shared by every run of one factory
#[derive(Clone)]
pub struct ThunkConfig {
    clock: Arc<dyn Clock>,
    metrics: bool,
}

impl ThunkConfig {
    /// Create a configuration with custom values
    ///
    /// # Arguments
    ///
    /// - `clock`: Source of the start and end timestamps behind `elapsed`
    /// - `metrics`: Whether runs record counters and the elapsed histogram
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, metrics: bool) -> Self {
        Self { clock, metrics }
    }

    /// Set the clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Enable or disable metric recording
    #[must_use]
    pub const fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics = enabled;
        self
    }

    /// The configured clock
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Whether metric recording is enabled
    #[must_use]
    pub const fn metrics_enabled(&self) -> bool {
        self.metrics
    }
}

impl Default for ThunkConfig {
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            metrics: true,
        }
    }
}

impl fmt::Debug for ThunkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThunkConfig")
            .field("clock", &"<dyn Clock>")
            .field("metrics", &self.metrics)
            .finish()
    }
}
