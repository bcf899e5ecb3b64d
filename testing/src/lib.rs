//! # Action Thunk Testing
//!
//! Testing utilities and helpers for lifecycle action thunks.
//!
//! This crate provides:
//! - Deterministic [`Clock`] implementations
//! - A dispatcher that records every action it receives
//! - A fluent Given-When-Then harness for running thunks
//! - Assertion helpers for lifecycle action sequences
//!
//! ## Example
//!
//! ```ignore
//! use action_thunk_testing::{ThunkTest, assertions};
//!
//! ThunkTest::new(fetch_user)
//!     .given_state(AppState::default())
//!     .when_called(42)
//!     .then_actions(|actions| {
//!         assertions::assert_succeeded(actions);
//!     })
//!     .then_output(|user| {
//!         assert_eq!(user.map(|u| u.id), Some(42));
//!     })
//!     .run_async()
//!     .await;
//! ```

use action_thunk_core::environment::{Clock, SharedDispatch, ThunkApi};
use chrono::{DateTime, Utc};


pub use thunk_test::{ThunkTest, assertions};

/// The [`ThunkApi`] shape used by [`ThunkTest`] and [`test_api`]
///
/// State is read through a boxed accessor, actions go to a
/// [`RecordingDispatcher`] through a [`SharedDispatch`].
pub type TestApi<S, A, X = ()> =
    ThunkApi<Box<dyn Fn() -> S + Send + Sync>, SharedDispatch<A>, X>;

/// Build a [`TestApi`] whose accessor always returns a clone of `state`
pub fn test_api<S, A, X>(
    state: S,
    recorder: &mocks::RecordingDispatcher<A>,
    extra: X,
) -> TestApi<S, A, X>
where
    S: Clone + Send + Sync + 'static,
    A: Send + 'static,
{
    ThunkApi::new(Box::new(move || state.clone()), recorder.dispatcher(), extra)
}

/// Mock implementations of environment traits
pub mod mocks {
    use super::{Clock, DateTime, SharedDispatch, Utc};
    use chrono::TimeDelta;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, so every run reports `elapsed: 0`.
    ///
    /// # Example
    ///
    /// ```
    /// use action_thunk_testing::mocks::FixedClock;
    /// use action_thunk_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that advances by a fixed step on every reading
    ///
    /// A run reads the clock twice (after STARTED and before ENDED), so with
    /// a step of `n` milliseconds every run reports `elapsed: n`.
    ///
    /// ```
    /// use action_thunk_testing::mocks::StepClock;
    /// use action_thunk_core::environment::Clock;
    ///
    /// let clock = StepClock::millis(250);
    /// let first = clock.now();
    /// let second = clock.now();
    /// assert_eq!((second - first).num_milliseconds(), 250);
    /// ```
    #[derive(Debug)]
    pub struct StepClock {
        origin: DateTime<Utc>,
        step_ms: i64,
        readings: AtomicI64,
    }

    impl StepClock {
        /// Start at `origin` and advance `step_ms` per reading
        #[must_use]
        pub const fn new(origin: DateTime<Utc>, step_ms: i64) -> Self {
            Self {
                origin,
                step_ms,
                readings: AtomicI64::new(0),
            }
        }

        /// Start at the [`test_clock`] origin and advance `step_ms` per reading
        #[must_use]
        pub fn millis(step_ms: i64) -> Self {
            Self::new(test_clock().now(), step_ms)
        }

        /// How many times the clock has been read
        #[must_use]
        pub fn readings(&self) -> i64 {
            self.readings.load(Ordering::SeqCst)
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            let reading = self.readings.fetch_add(1, Ordering::SeqCst);
            self.origin + TimeDelta::milliseconds(self.step_ms * reading)
        }
    }

    /// Clock moved forward explicitly by the test
    ///
    /// Use it to interleave concurrent runs and check that each one measures
    /// its own start.
    #[derive(Debug)]
    pub struct ManualClock {
        origin: DateTime<Utc>,
        offset_ms: AtomicI64,
    }

    impl ManualClock {
        /// Start at `origin`
        #[must_use]
        pub const fn new(origin: DateTime<Utc>) -> Self {
            Self {
                origin,
                offset_ms: AtomicI64::new(0),
            }
        }

        /// Move the clock forward
        pub fn advance_millis(&self, millis: i64) {
            self.offset_ms.fetch_add(millis, Ordering::SeqCst);
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new(test_clock().now())
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            self.origin + TimeDelta::milliseconds(self.offset_ms.load(Ordering::SeqCst))
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + TimeDelta::days(20_089))
    }

    /// Dispatcher that keeps every action it receives, in order
    ///
    /// Clones share the same log.
    #[derive(Debug)]
    pub struct RecordingDispatcher<A> {
        actions: Arc<Mutex<Vec<A>>>,
    }

    impl<A> RecordingDispatcher<A> {
        /// Create an empty recorder
        #[must_use]
        pub fn new() -> Self {
            Self {
                actions: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn log(&self) -> MutexGuard<'_, Vec<A>> {
            // A panicking assertion elsewhere must not hide the log.
            self.actions.lock().unwrap_or_else(PoisonError::into_inner)
        }

        /// A dispatcher appending to this recorder
        #[must_use]
        pub fn dispatcher(&self) -> SharedDispatch<A>
        where
            A: Send + 'static,
        {
            let actions = Arc::clone(&self.actions);
            SharedDispatch::new(move |action| {
                actions
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(action);
            })
        }

        /// Copy of the recorded actions
        #[must_use]
        pub fn actions(&self) -> Vec<A>
        where
            A: Clone,
        {
            self.log().clone()
        }

        /// Inspect the recorded actions without cloning
        pub fn with_actions<R>(&self, inspect: impl FnOnce(&[A]) -> R) -> R {
            inspect(&self.log())
        }

        /// Number of recorded actions
        #[must_use]
        pub fn len(&self) -> usize {
            self.log().len()
        }

        /// Whether nothing was recorded
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.log().is_empty()
        }

        /// Take the recorded actions, leaving the log empty
        #[must_use]
        pub fn drain(&self) -> Vec<A> {
            std::mem::take(&mut *self.log())
        }
    }

    impl<A> Clone for RecordingDispatcher<A> {
        fn clone(&self) -> Self {
            Self {
                actions: Arc::clone(&self.actions),
            }
        }
    }

    impl<A> Default for RecordingDispatcher<A> {
        fn default() -> Self {
            Self::new()
        }
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, RecordingDispatcher, StepClock, test_clock};
