//! The lifecycle action factory
//!
//! [`ActionThunk`] wraps an operation. Calling it with arguments yields a
//! [`Thunk`]; running the thunk against a [`ThunkApi`] performs one
//! lifecycle run:
//!
//! 1. Dispatch `<NAME>_STARTED` with the arguments
//! 2. Invoke the operation with the arguments and the API
//! 3. On success, dispatch `<NAME>_SUCCEEDED`; on failure, `<NAME>_FAILED`
//! 4. Dispatch `<NAME>_ENDED` with the elapsed milliseconds
//!
//! Failures are absorbed: the run reports them only through the dispatched
//! actions and returns `None` to the caller. Successes return the value.

use crate::action::{ActionType, ActionTypes, Elapsed, LifecycleAction};
use crate::config::ThunkConfig;
use crate::environment::{Clock, Dispatch, ThunkApi};
use crate::error::ThunkError;
use crate::metrics;
use crate::payload::{FailurePayload, SuccessPayload};
use chrono::{DateTime, Utc};
use futures::future::{self, BoxFuture, FutureExt};
use std::fmt;
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use tracing::Instrument;

/// The lifecycle action type dispatched by an `ActionThunk<Args, T, E, _>`
///
/// Payload and meta types come from the success value's [`SuccessPayload`]
/// split and the failure's [`FailurePayload`] normalisation.
pub type ThunkAction<Args, T, E> = LifecycleAction<
    Args,
    <T as SuccessPayload>::Payload,
    <T as SuccessPayload>::Meta,
    <E as FailurePayload>::Payload,
>;

type Operation<Args, Api, T, E> = dyn Fn(Args, Api) -> Completion<T, E> + Send + Sync;

/// What an operation returns
///
/// The caller declares up front whether the result is available now or
/// later. A synchronous failure is an `Immediate(Err(_))` and takes the same
/// failure path as a deferred one.
pub enum Completion<T, E> {
    /// The result is already known
    Immediate(Result<T, E>),

    /// The result arrives when the future resolves
    Deferred(BoxFuture<'static, Result<T, E>>),
}

impl<T, E> Completion<T, E> {
    /// An immediate success
    #[must_use]
    pub const fn ok(value: T) -> Self {
        Self::Immediate(Ok(value))
    }

    /// An immediate failure
    #[must_use]
    pub const fn err(error: E) -> Self {
        Self::Immediate(Err(error))
    }

    /// A result produced by `future`
    #[must_use]
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::Deferred(future.boxed())
    }

    /// Whether the result is still pending
    #[must_use]
    pub const fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }
}

impl<T, E> From<Result<T, E>> for Completion<T, E> {
    fn from(result: Result<T, E>) -> Self {
        Self::Immediate(result)
    }
}

impl<T, E> fmt::Debug for Completion<T, E>
where
    T: fmt::Debug,
    E: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate(result) => {
                f.debug_tuple("Completion::Immediate").field(result).finish()
            }
            Self::Deferred(_) => write!(f, "Completion::Deferred(<future>)"),
        }
    }
}

/// What a thunk run hands back to its caller
///
/// `Some(value)` after a success, `None` after a failure. Immediate
/// operations settle before `run` returns; deferred ones settle on the tokio
/// runtime. Either way the output can be `.await`ed for the value.
#[must_use]
pub enum ThunkOutput<T> {
    /// The run has already settled
    Immediate(Option<T>),

    /// The run settles when this future resolves
    Deferred(BoxFuture<'static, Option<T>>),
}

impl<T> ThunkOutput<T> {
    /// Whether the run is still pending
    #[must_use]
    pub const fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }

    /// The settled value of an immediate run
    ///
    /// # Errors
    ///
    /// Returns the output unchanged if the run is deferred.
    pub fn into_immediate(self) -> Result<Option<T>, Self> {
        match self {
            Self::Immediate(value) => Ok(value),
            deferred @ Self::Deferred(_) => Err(deferred),
        }
    }
}

impl<T: Send + 'static> IntoFuture for ThunkOutput<T> {
    type Output = Option<T>;
    type IntoFuture = BoxFuture<'static, Option<T>>;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            Self::Immediate(value) => future::ready(value).boxed(),
            Self::Deferred(pending) => pending,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ThunkOutput<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate(value) => {
                f.debug_tuple("ThunkOutput::Immediate").field(value).finish()
            }
            Self::Deferred(_) => write!(f, "ThunkOutput::Deferred(<future>)"),
        }
    }
}

/// Lifecycle action factory
///
/// Holds the derived action types, the wrapped operation and the
/// configuration. Cloning is cheap and every clone shares the same
/// operation. No state is kept between runs.
///
/// # Type Parameters
///
/// - `Args`: Arguments the thunk is called with (use a tuple for several)
/// - `T`: Success value of the operation
/// - `E`: Failure of the operation
/// - `Api`: The [`ThunkApi`] type the host store supplies
///
/// # Example
///
/// ```
/// use action_thunk_core::prelude::*;
/// use std::sync::{Arc, Mutex};
///
/// type Action = ThunkAction<u32, u32, String>;
/// type Api = ThunkApi<fn(), SharedDispatch<Action>>;
///
/// let double = ActionThunk::<u32, u32, String, Api>::immediate("DOUBLE", |n, _api| Ok(n * 2))
///     .unwrap();
///
/// let log = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&log);
/// let dispatch = SharedDispatch::new(move |action: Action| {
///     sink.lock().unwrap().push(action.action_type().to_string());
/// });
/// let api: Api = ThunkApi::new((|| ()) as fn(), dispatch, ());
///
/// let output = double.run(21, api);
/// assert_eq!(output.into_immediate().ok(), Some(Some(42)));
/// assert_eq!(
///     *log.lock().unwrap(),
///     ["DOUBLE_STARTED", "DOUBLE_SUCCEEDED", "DOUBLE_ENDED"]
/// );
/// ```
pub struct ActionThunk<Args, T, E, Api> {
    types: Arc<ActionTypes>,
    operation: Arc<Operation<Args, Api, T, E>>,
    config: ThunkConfig,
}

impl<Args, T, E, Api> ActionThunk<Args, T, E, Api> {
    /// Create a factory from an operation returning a [`Completion`]
    ///
    /// # Errors
    ///
    /// Returns [`ThunkError::EmptyName`] if `name` is empty or whitespace.
    pub fn new<F>(name: impl Into<String>, operation: F) -> Result<Self, ThunkError>
    where
        F: Fn(Args, Api) -> Completion<T, E> + Send + Sync + 'static,
    {
        Ok(Self {
            types: Arc::new(ActionTypes::new(name)?),
            operation: Arc::new(operation),
            config: ThunkConfig::default(),
        })
    }

    /// Create a factory from a synchronous operation
    ///
    /// An `Err` takes the failure path exactly like a rejected future.
    ///
    /// # Errors
    ///
    /// Returns [`ThunkError::EmptyName`] if `name` is empty or whitespace.
    pub fn immediate<F>(name: impl Into<String>, operation: F) -> Result<Self, ThunkError>
    where
        F: Fn(Args, Api) -> Result<T, E> + Send + Sync + 'static,
    {
        Self::new(name, move |args, api| Completion::Immediate(operation(args, api)))
    }

    /// Create a factory from an asynchronous operation
    ///
    /// # Errors
    ///
    /// Returns [`ThunkError::EmptyName`] if `name` is empty or whitespace.
    pub fn deferred<F, Fut>(name: impl Into<String>, operation: F) -> Result<Self, ThunkError>
    where
        F: Fn(Args, Api) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::new(name, move |args, api| {
            Completion::Deferred(operation(args, api).boxed())
        })
    }

    /// Replace the configuration
    #[must_use]
    pub fn with_config(mut self, config: ThunkConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace only the clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.config = self.config.with_clock(clock);
        self
    }

    /// The operation name (`NAME`)
    #[must_use]
    pub fn name(&self) -> &str {
        self.types.name()
    }

    /// All four action types
    #[must_use]
    pub fn types(&self) -> &ActionTypes {
        &self.types
    }

    /// `<NAME>_STARTED`
    #[must_use]
    pub fn started(&self) -> &ActionType {
        self.types.started()
    }

    /// Alias of [`started`](Self::started)
    #[must_use]
    pub fn start(&self) -> &ActionType {
        self.types.start()
    }

    /// `<NAME>_SUCCEEDED`
    #[must_use]
    pub fn succeeded(&self) -> &ActionType {
        self.types.succeeded()
    }

    /// `<NAME>_FAILED`
    #[must_use]
    pub fn failed(&self) -> &ActionType {
        self.types.failed()
    }

    /// `<NAME>_ENDED`
    #[must_use]
    pub fn ended(&self) -> &ActionType {
        self.types.ended()
    }

    /// The active configuration
    #[must_use]
    pub const fn config(&self) -> &ThunkConfig {
        &self.config
    }

    /// Capture arguments into a dispatchable thunk
    pub fn call(&self, args: Args) -> Thunk<Args, T, E, Api> {
        Thunk {
            factory: self.clone(),
            args,
        }
    }
}

impl<Args, T, E, G, D, X> ActionThunk<Args, T, E, ThunkApi<G, D, X>> {
    /// Shorthand for `self.call(args).run(api)`
    pub fn run<A>(&self, args: Args, api: ThunkApi<G, D, X>) -> ThunkOutput<T>
    where
        A: From<ThunkAction<Args, T, E>> + 'static,
        D: Dispatch<A> + Clone + Send + 'static,
        G: 'static,
        X: 'static,
        Args: Clone + 'static,
        T: SuccessPayload + Send + 'static,
        E: FailurePayload + Send + 'static,
    {
        self.call(args).run(api)
    }
}

impl<Args, T, E, Api> Clone for ActionThunk<Args, T, E, Api> {
    fn clone(&self) -> Self {
        Self {
            types: Arc::clone(&self.types),
            operation: Arc::clone(&self.operation),
            config: self.config.clone(),
        }
    }
}

impl<Args, T, E, Api> fmt::Debug for ActionThunk<Args, T, E, Api> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionThunk")
            .field("types", &self.types)
            .field("operation", &"<fn>")
            .field("config", &self.config)
            .finish()
    }
}

/// A factory call with its arguments captured, ready to run
#[must_use = "a thunk does nothing until it is run"]
pub struct Thunk<Args, T, E, Api> {
    factory: ActionThunk<Args, T, E, Api>,
    args: Args,
}

impl<Args, T, E, Api> Thunk<Args, T, E, Api> {
    /// The captured arguments
    pub const fn args(&self) -> &Args {
        &self.args
    }

    /// The factory this thunk came from
    pub const fn factory(&self) -> &ActionThunk<Args, T, E, Api> {
        &self.factory
    }
}

impl<Args, T, E, G, D, X> Thunk<Args, T, E, ThunkApi<G, D, X>> {
    /// Execute one lifecycle run
    ///
    /// STARTED is dispatched before the operation is invoked. For an
    /// immediate operation SUCCEEDED/FAILED and ENDED are dispatched before
    /// this returns. A deferred one is spawned onto the current tokio runtime
    /// and settles whether or not the returned output is awaited; without a
    /// runtime it settles when the output is awaited.
    pub fn run<A>(self, api: ThunkApi<G, D, X>) -> ThunkOutput<T>
    where
        A: From<ThunkAction<Args, T, E>> + 'static,
        D: Dispatch<A> + Clone + Send + 'static,
        G: 'static,
        X: 'static,
        Args: Clone + 'static,
        T: SuccessPayload + Send + 'static,
        E: FailurePayload + Send + 'static,
    {
        let Self { factory, args } = self;
        let span = tracing::debug_span!("action_thunk", action = %factory.types.name());
        let _enter = span.enter();

        let started: ThunkAction<Args, T, E> = LifecycleAction::Started {
            action_type: factory.types.started().clone(),
            args: args.clone(),
        };
        tracing::trace!(action_type = %factory.types.started(), "Dispatching");
        api.dispatch(A::from(started));

        let invocation = Invocation {
            started_at: factory.config.clock().now(),
            types: Arc::clone(&factory.types),
            config: factory.config.clone(),
            dispatcher: api.dispatcher().clone(),
        };
        if invocation.config.metrics_enabled() {
            metrics::record_started(factory.types.name());
        }

        match (factory.operation)(args, api) {
            Completion::Immediate(outcome) => {
                ThunkOutput::Immediate(invocation.settle::<A, Args, T, E>(outcome))
            }
            Completion::Deferred(pending) => {
                let settle = async move {
                    let outcome = pending.await;
                    invocation.settle::<A, Args, T, E>(outcome)
                }
                .instrument(span.clone());
                ThunkOutput::Deferred(drive(settle))
            }
        }
    }
}

/// Drive a deferred settle to completion independently of the caller
///
/// Inside a tokio runtime the settle is spawned, so SUCCEEDED/FAILED and
/// ENDED are dispatched even if the output is dropped. Outside one the
/// caller must poll the output.
fn drive<T, F>(settle: F) -> BoxFuture<'static, Option<T>>
where
    T: Send + 'static,
    F: Future<Output = Option<T>> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            tracing::trace!("Spawning deferred operation");
            let handle = runtime.spawn(settle);
            async move {
                handle.await.unwrap_or_else(|error| {
                    tracing::warn!(%error, "Deferred settle did not complete");
                    None
                })
            }
            .boxed()
        }
        Err(_) => {
            tracing::trace!("No runtime, deferred operation settles when awaited");
            settle.boxed()
        }
    }
}

impl<Args: fmt::Debug, T, E, Api> fmt::Debug for Thunk<Args, T, E, Api> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thunk")
            .field("name", &self.factory.name())
            .field("args", &self.args)
            .finish()
    }
}

/// State of one run between STARTED and ENDED
struct Invocation<D> {
    types: Arc<ActionTypes>,
    config: ThunkConfig,
    dispatcher: D,
    started_at: DateTime<Utc>,
}

impl<D> Invocation<D> {
    fn settle<A, Args, T, E>(&self, outcome: Result<T, E>) -> Option<T>
    where
        D: Dispatch<A>,
        A: From<ThunkAction<Args, T, E>>,
        T: SuccessPayload,
        E: FailurePayload,
    {
        match outcome {
            Ok(data) => Some(self.succeeded::<A, Args, T, E>(data)),
            Err(error) => {
                self.failed::<A, Args, T, E>(error);
                None
            }
        }
    }

    fn succeeded<A, Args, T, E>(&self, data: T) -> T
    where
        D: Dispatch<A>,
        A: From<ThunkAction<Args, T, E>>,
        T: SuccessPayload,
        E: FailurePayload,
    {
        let (payload, meta) = data.split_payload();
        tracing::trace!(
            action_type = %self.types.succeeded(),
            has_meta = meta.is_some(),
            "Dispatching"
        );
        let action: ThunkAction<Args, T, E> = LifecycleAction::Succeeded {
            action_type: self.types.succeeded().clone(),
            payload,
            meta,
        };
        self.dispatcher.dispatch(A::from(action));
        self.ended::<A, Args, T, E>(true);
        data
    }

    fn failed<A, Args, T, E>(&self, error: E)
    where
        D: Dispatch<A>,
        A: From<ThunkAction<Args, T, E>>,
        T: SuccessPayload,
        E: FailurePayload,
    {
        tracing::debug!(action_type = %self.types.failed(), "Operation failed");
        let action: ThunkAction<Args, T, E> = LifecycleAction::Failed {
            action_type: self.types.failed().clone(),
            payload: error.into_payload(),
        };
        self.dispatcher.dispatch(A::from(action));
        self.ended::<A, Args, T, E>(false);
    }

    fn ended<A, Args, T, E>(&self, succeeded: bool)
    where
        D: Dispatch<A>,
        A: From<ThunkAction<Args, T, E>>,
        T: SuccessPayload,
        E: FailurePayload,
    {
        let elapsed = Elapsed::between(self.started_at, self.config.clock().now());
        let action: ThunkAction<Args, T, E> = LifecycleAction::Ended {
            action_type: self.types.ended().clone(),
            payload: elapsed,
        };
        self.dispatcher.dispatch(A::from(action));

        tracing::debug!(elapsed_ms = elapsed.elapsed, succeeded, "Run ended");
        if self.config.metrics_enabled() {
            metrics::record_outcome(self.types.name(), succeeded, elapsed.elapsed);
        }
    }
}
