//! # User Profile Example
//!
//! A profile screen backed by a small store, driven by lifecycle thunks.
//!
//! This example showcases:
//! - A deferred thunk calling an injected service (`FETCH_PROFILE`)
//! - An immediate thunk validating against current state (`RENAME_PROFILE`)
//! - A reducer reacting to STARTED / SUCCEEDED / FAILED / ENDED
//! - Transport errors surfacing their response body as the FAILED payload
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use user_profile::{ProfileStore, UserDirectory, fetch_profile};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = ProfileStore::new();
//! let directory = Arc::new(UserDirectory::with_sample_users());
//!
//! let user = fetch_profile()?.run(1, store.api(directory)).await;
//! assert!(user.is_some());
//! assert!(!store.state().loading);
//! # Ok(())
//! # }
//! ```

use action_thunk_core::environment::{SharedDispatch, ThunkApi};
use action_thunk_core::error::ThunkError;
use action_thunk_core::impl_plain_success_payload;
use action_thunk_core::prelude::{
    ActionThunk, FailureBody, LifecycleAction, ThunkAction, TransportError,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A user profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Directory identifier
    pub id: u64,
    /// Display name
    pub name: String,
    /// Contact address
    pub email: String,
}

impl_plain_success_payload!(User);

/// Profile screen state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileState {
    /// The loaded profile
    pub user: Option<User>,
    /// A fetch is in flight
    pub loading: bool,
    /// Message from the last failure
    pub error: Option<String>,
    /// Duration of the last completed fetch
    pub last_fetch_ms: Option<u64>,
    /// Number of successful renames
    pub renames: u32,
}

/// Lifecycle actions of [`fetch_profile`]
pub type FetchAction = ThunkAction<u64, User, TransportError<String>>;

/// Lifecycle actions of [`rename_profile`]
pub type RenameAction = ThunkAction<String, User, String>;

/// Everything the profile store reduces
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileAction {
    /// `FETCH_PROFILE_*`
    Fetch(FetchAction),
    /// `RENAME_PROFILE_*`
    Rename(RenameAction),
    /// Clear the error banner
    DismissError,
}

impl From<FetchAction> for ProfileAction {
    fn from(action: FetchAction) -> Self {
        Self::Fetch(action)
    }
}

impl From<RenameAction> for ProfileAction {
    fn from(action: RenameAction) -> Self {
        Self::Rename(action)
    }
}

/// Apply one action to the state
pub fn reduce(state: &mut ProfileState, action: &ProfileAction) {
    match action {
        ProfileAction::Fetch(LifecycleAction::Started { .. }) => {
            state.loading = true;
            state.error = None;
        }
        ProfileAction::Fetch(LifecycleAction::Succeeded { payload, .. })
        | ProfileAction::Rename(LifecycleAction::Succeeded { payload, .. }) => {
            if matches!(action, ProfileAction::Rename(_)) {
                state.renames += 1;
            }
            state.user = Some(payload.clone());
        }
        ProfileAction::Fetch(LifecycleAction::Failed { payload, .. }) => {
            state.error = Some(match payload {
                FailureBody::Data(body) => body.clone(),
                FailureBody::Error(error) => error.to_string(),
            });
        }
        ProfileAction::Fetch(LifecycleAction::Ended { payload, .. }) => {
            state.loading = false;
            state.last_fetch_ms = Some(payload.elapsed);
        }
        ProfileAction::Rename(LifecycleAction::Failed { payload, .. }) => {
            state.error = Some(payload.clone());
        }
        ProfileAction::Rename(LifecycleAction::Started { .. } | LifecycleAction::Ended { .. }) => {}
        ProfileAction::DismissError => {
            state.error = None;
        }
    }
}

/// State accessor handed to thunks by [`ProfileStore::api`]
pub type StateReader = Box<dyn Fn() -> ProfileState + Send + Sync>;

/// The API shape thunks receive from [`ProfileStore`]
pub type ProfileApi = ThunkApi<StateReader, SharedDispatch<ProfileAction>, Arc<UserDirectory>>;

/// Minimal synchronous store: state behind a mutex plus an action log
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    state: Arc<Mutex<ProfileState>>,
    history: Arc<Mutex<Vec<String>>>,
}

impl ProfileStore {
    /// Create a store with empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_state(&self) -> MutexGuard<'_, ProfileState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reduce an action into the state
    pub fn dispatch(&self, action: ProfileAction) {
        let tag = match &action {
            ProfileAction::Fetch(lifecycle) => lifecycle.action_type().to_string(),
            ProfileAction::Rename(lifecycle) => lifecycle.action_type().to_string(),
            ProfileAction::DismissError => "DISMISS_ERROR".to_string(),
        };
        tracing::debug!(action_type = %tag, "Reducing");

        reduce(&mut self.lock_state(), &action);
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tag);
    }

    /// Snapshot of the current state
    #[must_use]
    pub fn state(&self) -> ProfileState {
        self.lock_state().clone()
    }

    /// Action types reduced so far, in order
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The `get_state` / `dispatch` / `extra` triple for running thunks
    #[must_use]
    pub fn api(&self, directory: Arc<UserDirectory>) -> ProfileApi {
        let reader = self.clone();
        let writer = self.clone();
        ThunkApi::new(
            Box::new(move || reader.state()),
            SharedDispatch::new(move |action| writer.dispatch(action)),
            directory,
        )
    }
}

/// In-memory user directory standing in for an HTTP API
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: HashMap<u64, User>,
    latency: Duration,
}

impl UserDirectory {
    /// An empty directory answering immediately
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A directory with two users
    #[must_use]
    pub fn with_sample_users() -> Self {
        Self::new()
            .with_user(User {
                id: 1,
                name: "Ada Lovelace".to_string(),
                email: "ada@example.com".to_string(),
            })
            .with_user(User {
                id: 2,
                name: "Grace Hopper".to_string(),
                email: "grace@example.com".to_string(),
            })
    }

    /// Add or replace a user
    #[must_use]
    pub fn with_user(mut self, user: User) -> Self {
        self.users.insert(user.id, user);
        self
    }

    /// Simulated round-trip time
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Look a user up
    ///
    /// # Errors
    ///
    /// Returns a 404 [`TransportError`] whose response body names the
    /// missing id, or a bodiless error for id `0` (rejected before sending).
    pub async fn fetch(&self, id: u64) -> Result<User, TransportError<String>> {
        if id == 0 {
            return Err(TransportError::new("invalid user id"));
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.users.get(&id).cloned().ok_or_else(|| {
            TransportError::with_response("Not Found", 404, format!("No user with id {id}"))
        })
    }
}

/// Factory type of [`fetch_profile`]
pub type FetchProfile<G, D> =
    ActionThunk<u64, User, TransportError<String>, ThunkApi<G, D, Arc<UserDirectory>>>;

/// Factory type of [`rename_profile`]
pub type RenameProfile<Api> = ActionThunk<String, User, String, Api>;

/// Load a profile from the [`UserDirectory`] in `extra`
///
/// Dispatches `FETCH_PROFILE_STARTED`, then `FETCH_PROFILE_SUCCEEDED` with
/// the user or `FETCH_PROFILE_FAILED` with the response body, then
/// `FETCH_PROFILE_ENDED`.
///
/// # Errors
///
/// Never fails in practice; the name is a non-empty constant.
pub fn fetch_profile<G, D>() -> Result<FetchProfile<G, D>, ThunkError>
where
    G: 'static,
    D: 'static,
{
    ActionThunk::deferred("FETCH_PROFILE", |id, api: ThunkApi<G, D, Arc<UserDirectory>>| {
        let directory = Arc::clone(api.extra());
        async move { directory.fetch(id).await }
    })
}

/// Rename the loaded profile
///
/// Fails with a message when nothing is loaded or the name is blank.
///
/// # Errors
///
/// Never fails in practice; the name is a non-empty constant.
pub fn rename_profile<G, D, X>() -> Result<RenameProfile<ThunkApi<G, D, X>>, ThunkError>
where
    G: Fn() -> ProfileState + 'static,
    D: 'static,
    X: 'static,
{
    ActionThunk::immediate("RENAME_PROFILE", |name: String, api: ThunkApi<G, D, X>| {
        let name = name.trim();
        if name.is_empty() {
            return Err("Name must not be blank".to_string());
        }
        let Some(user) = api.state().user else {
            return Err("No profile loaded".to_string());
        };
        Ok(User {
            name: name.to_string(),
            ..user
        })
    })
}
