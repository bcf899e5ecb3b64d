//! # Action Thunk Core
//!
//! Lifecycle action thunks for centralized state stores.
//!
//! An [`ActionThunk`](thunk::ActionThunk) wraps an operation (synchronous or
//! asynchronous) and, every time it runs, dispatches a fixed sequence of
//! lifecycle actions into the caller's store:
//!
//! ```text
//! <NAME>_STARTED  ──►  <NAME>_SUCCEEDED ──►  <NAME>_ENDED
//!                 └─►  <NAME>_FAILED    ──►  <NAME>_ENDED
//! ```
//!
//! ## Core Concepts
//!
//! - **Action types**: the four tag strings derived from an operation name
//! - **Lifecycle action**: a tagged record carrying the arguments, the success
//!   payload and meta, the failure payload, or the elapsed time
//! - **Completion**: what an operation returns, either an immediate `Result` or
//!   a deferred future resolving to one
//! - **Thunk API**: the `get_state` / `dispatch` / `extra` triple supplied by
//!   the host store
//!
//! ## Example
//!
//! ```ignore
//! use action_thunk_core::prelude::*;
//!
//! type Api = ThunkApi<fn() -> AppState, SharedDispatch<AppAction>, HttpClient>;
//! type FetchUser = ActionThunk<u64, User, TransportError<ApiError>, Api>;
//!
//! let fetch_user = FetchUser::deferred("FETCH_USER", |id, api| async move {
//!     api.extra().get_user(id).await
//! })?;
//!
//! // Dispatches FETCH_USER_STARTED, then FETCH_USER_SUCCEEDED or
//! // FETCH_USER_FAILED, then FETCH_USER_ENDED.
//! let user = fetch_user.call(42).run(api).await;
//!
//! // Reducers match on the exact tags.
//! assert_eq!(fetch_user.succeeded(), "FETCH_USER_SUCCEEDED");
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};

/// Lifecycle action types, kinds and the lifecycle action record
pub mod action;

/// Payload conventions for success values and failures
pub mod payload;

/// The lifecycle action factory and its dispatchable thunks
pub mod thunk;

/// Configuration for lifecycle action factories
pub mod config;

/// Metric names and descriptions for thunk runs
pub mod metrics;

/// Error types for factory construction
pub mod error {
    use thiserror::Error;

    /// Errors that can occur while building an action thunk
    ///
    /// Operation failures are never reported through this type. They are
    /// dispatched as `<NAME>_FAILED` actions instead.
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum ThunkError {
        /// The operation name was empty or contained only whitespace
        ///
        /// Every action type is derived from the name, so an empty name
        /// would produce tags like `_STARTED` that collide across factories.
        #[error("Action thunk name must not be empty")]
        EmptyName,
    }
}

/// Environment module - host collaborators injected into thunks
///
/// The host store supplies a dispatch function, a state accessor and an
/// arbitrary extra context. The factory itself only needs a [`Clock`].
///
/// [`Clock`]: environment::Clock
pub mod environment {
    use chrono::{DateTime, Utc};
    use std::fmt;
    use std::sync::Arc;

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Production - uses system clock
    /// let clock = SystemClock;
    ///
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock backed by [`Utc::now`]
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Something that accepts actions and forwards them into a store
    ///
    /// Implemented for every `Fn(A)` closure, so a store's dispatch method
    /// can be passed as `move |action| store.dispatch(action)`.
    pub trait Dispatch<A> {
        /// Forward an action into the store
        fn dispatch(&self, action: A);
    }

    impl<A, F> Dispatch<A> for F
    where
        F: Fn(A),
    {
        fn dispatch(&self, action: A) {
            self(action);
        }
    }

    /// A type-erased, cheaply clonable dispatcher
    ///
    /// Closures cannot be named in type signatures; wrap one in a
    /// `SharedDispatch` to spell out a concrete [`ThunkApi`] type.
    pub struct SharedDispatch<A>(Arc<dyn Fn(A) + Send + Sync>);

    impl<A> SharedDispatch<A> {
        /// Wrap a dispatch function
        pub fn new<F>(dispatch: F) -> Self
        where
            F: Fn(A) + Send + Sync + 'static,
        {
            Self(Arc::new(dispatch))
        }
    }

    impl<A> Clone for SharedDispatch<A> {
        fn clone(&self) -> Self {
            Self(Arc::clone(&self.0))
        }
    }

    impl<A> Dispatch<A> for SharedDispatch<A> {
        fn dispatch(&self, action: A) {
            (self.0)(action);
        }
    }

    impl<A> fmt::Debug for SharedDispatch<A> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "SharedDispatch(<fn>)")
        }
    }

    /// The `{ get_state, dispatch, extra }` triple handed to every thunk
    ///
    /// The same value is passed, unmodified, as the last argument of the
    /// wrapped operation, so the operation can read state, dispatch its own
    /// actions, or reach injected services through `extra`.
    ///
    /// # Type Parameters
    ///
    /// - `G`: State accessor, any `Fn() -> S`
    /// - `D`: Dispatcher, any [`Dispatch`] implementation
    /// - `X`: Extra context (API clients, configuration, ...)
    #[derive(Clone)]
    pub struct ThunkApi<G, D, X = ()> {
        get_state: G,
        dispatch: D,
        extra: X,
    }

    impl<G, D, X> ThunkApi<G, D, X> {
        /// Bundle the host collaborators
        #[must_use]
        pub const fn new(get_state: G, dispatch: D, extra: X) -> Self {
            Self {
                get_state,
                dispatch,
                extra,
            }
        }

        /// Read the current state through the accessor
        pub fn state<S>(&self) -> S
        where
            G: Fn() -> S,
        {
            (self.get_state)()
        }

        /// Dispatch an action through the host dispatcher
        pub fn dispatch<A>(&self, action: A)
        where
            D: Dispatch<A>,
        {
            self.dispatch.dispatch(action);
        }

        /// The state accessor
        #[must_use]
        pub const fn get_state(&self) -> &G {
            &self.get_state
        }

        /// The dispatcher
        #[must_use]
        pub const fn dispatcher(&self) -> &D {
            &self.dispatch
        }

        /// The extra context
        #[must_use]
        pub const fn extra(&self) -> &X {
            &self.extra
        }
    }

    impl<G, D, X> fmt::Debug for ThunkApi<G, D, X>
    where
        X: fmt::Debug,
    {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("ThunkApi")
                .field("get_state", &"<fn>")
                .field("dispatch", &"<fn>")
                .field("extra", &self.extra)
                .finish()
        }
    }
}

/// Convenience re-exports for building and running thunks
pub mod prelude {
    pub use crate::action::{ActionType, ActionTypes, Elapsed, LifecycleAction, LifecycleKind};
    pub use crate::config::ThunkConfig;
    pub use crate::environment::{Clock, Dispatch, SharedDispatch, SystemClock, ThunkApi};
    pub use crate::error::ThunkError;
    pub use crate::payload::{
        FailureBody, FailurePayload, SuccessPayload, TransportError, TransportResponse, WithMeta,
    };
    pub use crate::thunk::{ActionThunk, Completion, Thunk, ThunkAction, ThunkOutput};
}
