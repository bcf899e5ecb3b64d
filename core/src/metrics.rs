//! Metrics recorded by thunk runs.
//!
//! Runs report through the [`metrics`] facade. Nothing is exported until the
//! host installs a recorder (Prometheus, statsd, ...); without one every call
//! is a no-op.
//!
//! | Metric | Kind | Labels |
//! |---|---|---|
//! | `action_thunk_started_total` | counter | `action` |
//! | `action_thunk_succeeded_total` | counter | `action` |
//! | `action_thunk_failed_total` | counter | `action` |
//! | `action_thunk_elapsed_ms` | histogram | `action`, `outcome` |

use metrics::{Unit, counter, describe_counter, describe_histogram, histogram};

/// Counter incremented on every STARTED dispatch
pub const STARTED_TOTAL: &str = "action_thunk_started_total";

/// Counter incremented on every SUCCEEDED dispatch
pub const SUCCEEDED_TOTAL: &str = "action_thunk_succeeded_total";

/// Counter incremented on every FAILED dispatch
pub const FAILED_TOTAL: &str = "action_thunk_failed_total";

/// Histogram of the ENDED `elapsed` value
pub const ELAPSED_MS: &str = "action_thunk_elapsed_ms";

/// Register all metric descriptions.
///
/// Call once after installing a recorder so exporters can show units and
/// help text.
pub fn register_metrics() {
    describe_counter!(STARTED_TOTAL, "Total number of thunk runs started");
    describe_counter!(
        SUCCEEDED_TOTAL,
        "Total number of thunk runs whose operation succeeded"
    );
    describe_counter!(
        FAILED_TOTAL,
        "Total number of thunk runs whose operation failed"
    );
    describe_histogram!(
        ELAPSED_MS,
        Unit::Milliseconds,
        "Time from operation start to the ENDED dispatch"
    );
}

pub(crate) fn record_started(action: &str) {
    counter!(STARTED_TOTAL, "action" => action.to_owned()).increment(1);
}

#[allow(clippy::cast_precision_loss)] // Millisecond counts stay far below 2^52
pub(crate) fn record_outcome(action: &str, succeeded: bool, elapsed_ms: u64) {
    let (total, outcome) = if succeeded {
        (SUCCEEDED_TOTAL, "succeeded")
    } else {
        (FAILED_TOTAL, "failed")
    };

    counter!(total, "action" => action.to_owned()).increment(1);
    histogram!(ELAPSED_MS, "action" => action.to_owned(), "outcome" => outcome)
        .record(elapsed_ms as f64);
}
