//! Lifecycle action types and records
//!
//! An operation name such as `FETCH_USER` yields four action types by suffix:
//! `FETCH_USER_STARTED`, `FETCH_USER_SUCCEEDED`, `FETCH_USER_FAILED` and
//! `FETCH_USER_ENDED`. The strings are computed once, when the factory is
//! built, and exposed so reducers can match on them without re-deriving the
//! convention.

use crate::error::ThunkError;
use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Phase of a single thunk run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleKind {
    /// The run has begun; always dispatched first
    Started,
    /// The operation produced a value
    Succeeded,
    /// The operation failed
    Failed,
    /// The run is over; always dispatched last
    Ended,
}

impl LifecycleKind {
    /// All kinds, in dispatch order
    pub const ALL: [Self; 4] = [Self::Started, Self::Succeeded, Self::Failed, Self::Ended];

    /// Suffix appended to the operation name
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Started => "_STARTED",
            Self::Succeeded => "_SUCCEEDED",
            Self::Failed => "_FAILED",
            Self::Ended => "_ENDED",
        }
    }

    /// Whether this kind reports the outcome of the operation
    #[must_use]
    pub const fn is_outcome(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for LifecycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix().trim_start_matches('_'))
    }
}

/// An action type tag, e.g. `FETCH_USER_SUCCEEDED`
///
/// Cheap to clone. Compares equal to plain strings so reducers can write
/// `action.action_type() == "FETCH_USER_SUCCEEDED"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionType(Arc<str>);

impl ActionType {
    fn derive(name: &str, kind: LifecycleKind) -> Self {
        Self(Arc::from(format!("{name}{}", kind.suffix())))
    }

    /// The tag as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ActionType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ActionType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ActionType {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for ActionType {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl PartialEq<ActionType> for &str {
    fn eq(&self, other: &ActionType) -> bool {
        *self == &*other.0
    }
}

impl Serialize for ActionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ActionType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|tag| Self(Arc::from(tag)))
    }
}

/// The four action types derived from one operation name
///
/// # Example
///
/// ```
/// use action_thunk_core::action::{ActionTypes, LifecycleKind};
///
/// let types = ActionTypes::new("FETCH_USER").unwrap();
/// assert_eq!(types.started(), "FETCH_USER_STARTED");
/// assert_eq!(types.start(), types.started());
/// assert_eq!(types.kind_of("FETCH_USER_ENDED"), Some(LifecycleKind::Ended));
/// assert_eq!(types.kind_of("FETCH_POST_ENDED"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionTypes {
    name: Arc<str>,
    started: ActionType,
    succeeded: ActionType,
    failed: ActionType,
    ended: ActionType,
}

impl ActionTypes {
    /// Derive the action types for `name`
    ///
    /// # Errors
    ///
    /// Returns [`ThunkError::EmptyName`] if `name` is empty or whitespace.
    pub fn new(name: impl Into<String>) -> Result<Self, ThunkError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ThunkError::EmptyName);
        }

        Ok(Self {
            started: ActionType::derive(&name, LifecycleKind::Started),
            succeeded: ActionType::derive(&name, LifecycleKind::Succeeded),
            failed: ActionType::derive(&name, LifecycleKind::Failed),
            ended: ActionType::derive(&name, LifecycleKind::Ended),
            name: Arc::from(name),
        })
    }

    /// The operation name the tags were derived from
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<NAME>_STARTED`
    #[must_use]
    pub const fn started(&self) -> &ActionType {
        &self.started
    }

    /// Alias of [`started`](Self::started)
    #[must_use]
    pub const fn start(&self) -> &ActionType {
        &self.started
    }

    /// `<NAME>_SUCCEEDED`
    #[must_use]
    pub const fn succeeded(&self) -> &ActionType {
        &self.succeeded
    }

    /// `<NAME>_FAILED`
    #[must_use]
    pub const fn failed(&self) -> &ActionType {
        &self.failed
    }

    /// `<NAME>_ENDED`
    #[must_use]
    pub const fn ended(&self) -> &ActionType {
        &self.ended
    }

    /// The tag for `kind`
    #[must_use]
    pub const fn get(&self, kind: LifecycleKind) -> &ActionType {
        match kind {
            LifecycleKind::Started => &self.started,
            LifecycleKind::Succeeded => &self.succeeded,
            LifecycleKind::Failed => &self.failed,
            LifecycleKind::Ended => &self.ended,
        }
    }

    /// Map a tag back to its lifecycle kind
    ///
    /// Returns `None` for tags that belong to another operation.
    #[must_use]
    pub fn kind_of(&self, tag: &str) -> Option<LifecycleKind> {
        LifecycleKind::ALL
            .into_iter()
            .find(|kind| self.get(*kind) == tag)
    }

    /// Whether `tag` is one of this operation's four action types
    #[must_use]
    pub fn matches(&self, tag: &str) -> bool {
        self.kind_of(tag).is_some()
    }

    /// Iterate over `(kind, tag)` pairs in dispatch order
    pub fn iter(&self) -> impl Iterator<Item = (LifecycleKind, &ActionType)> {
        LifecycleKind::ALL
            .into_iter()
            .map(move |kind| (kind, self.get(kind)))
    }
}

/// Payload of the `<NAME>_ENDED` action
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Elapsed {
    /// Milliseconds between the start of the operation and the end of the run
    pub elapsed: u64,
}

impl Elapsed {
    /// Wrap a millisecond count
    #[must_use]
    pub const fn from_millis(elapsed: u64) -> Self {
        Self { elapsed }
    }

    /// Time between two clock readings, clamped at zero if the clock went
    /// backwards
    #[must_use]
    pub fn between(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> Self {
        let millis = (ended_at - started_at).num_milliseconds();
        Self {
            elapsed: u64::try_from(millis).unwrap_or(0),
        }
    }

    /// As a [`Duration`]
    #[must_use]
    pub const fn as_duration(self) -> Duration {
        Duration::from_millis(self.elapsed)
    }
}

/// A lifecycle action dispatched by a thunk run
///
/// # Type Parameters
///
/// - `Args`: The captured call arguments (STARTED payload)
/// - `P`: The success payload (SUCCEEDED payload)
/// - `M`: The success meta (SUCCEEDED meta)
/// - `F`: The failure payload (FAILED payload)
///
/// Serializes to the flux-standard-action shape
/// `{ "type", "payload", "meta"?, "error"? }`, with `error: true` on FAILED.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleAction<Args, P, M, F> {
    /// `<NAME>_STARTED`, carrying the call arguments
    Started {
        /// The action type tag
        action_type: ActionType,
        /// Arguments the thunk was called with
        args: Args,
    },

    /// `<NAME>_SUCCEEDED`, carrying the success payload and optional meta
    Succeeded {
        /// The action type tag
        action_type: ActionType,
        /// The success payload
        payload: P,
        /// Meta split off the success value, if any
        meta: Option<M>,
    },

    /// `<NAME>_FAILED`, carrying the normalised failure
    Failed {
        /// The action type tag
        action_type: ActionType,
        /// The failure payload
        payload: F,
    },

    /// `<NAME>_ENDED`, carrying the elapsed time
    Ended {
        /// The action type tag
        action_type: ActionType,
        /// Elapsed time of the run
        payload: Elapsed,
    },
}

impl<Args, P, M, F> LifecycleAction<Args, P, M, F> {
    /// The action type tag
    #[must_use]
    pub const fn action_type(&self) -> &ActionType {
        match self {
            Self::Started { action_type, .. }
            | Self::Succeeded { action_type, .. }
            | Self::Failed { action_type, .. }
            | Self::Ended { action_type, .. } => action_type,
        }
    }

    /// The lifecycle phase this action marks
    #[must_use]
    pub const fn kind(&self) -> LifecycleKind {
        match self {
            Self::Started { .. } => LifecycleKind::Started,
            Self::Succeeded { .. } => LifecycleKind::Succeeded,
            Self::Failed { .. } => LifecycleKind::Failed,
            Self::Ended { .. } => LifecycleKind::Ended,
        }
    }

    /// Whether this action belongs to the terminal pair (SUCCEEDED, FAILED or ENDED)
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Started { .. })
    }

    /// The elapsed time, for ENDED actions
    #[must_use]
    pub const fn elapsed(&self) -> Option<Elapsed> {
        match self {
            Self::Ended { payload, .. } => Some(*payload),
            _ => None,
        }
    }
}

impl<Args, P, M, F> Serialize for LifecycleAction<Args, P, M, F>
where
    Args: Serialize,
    P: Serialize,
    M: Serialize,
    F: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Started { action_type, args } => {
                let mut state = serializer.serialize_struct("LifecycleAction", 2)?;
                state.serialize_field("type", action_type)?;
                state.serialize_field("payload", args)?;
                state.end()
            }
            Self::Succeeded {
                action_type,
                payload,
                meta,
            } => {
                let len = 2 + usize::from(meta.is_some());
                let mut state = serializer.serialize_struct("LifecycleAction", len)?;
                state.serialize_field("type", action_type)?;
                state.serialize_field("payload", payload)?;
                if let Some(meta) = meta {
                    state.serialize_field("meta", meta)?;
                }
                state.end()
            }
            Self::Failed {
                action_type,
                payload,
            } => {
                let mut state = serializer.serialize_struct("LifecycleAction", 3)?;
                state.serialize_field("type", action_type)?;
                state.serialize_field("payload", payload)?;
                state.serialize_field("error", &true)?;
                state.end()
            }
            Self::Ended {
                action_type,
                payload,
            } => {
                let mut state = serializer.serialize_struct("LifecycleAction", 2)?;
                state.serialize_field("type", action_type)?;
                state.serialize_field("payload", payload)?;
                state.end()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use serde_json::json;

    type TestAction = LifecycleAction<Vec<u32>, String, String, String>;

    #[test]
    fn test_derived_tags() {
        let types = ActionTypes::new("FETCH_USER").unwrap();

        assert_eq!(types.name(), "FETCH_USER");
        assert_eq!(types.started(), "FETCH_USER_STARTED");
        assert_eq!(types.start(), "FETCH_USER_STARTED");
        assert_eq!(types.succeeded(), "FETCH_USER_SUCCEEDED");
        assert_eq!(types.failed(), "FETCH_USER_FAILED");
        assert_eq!(types.ended(), "FETCH_USER_ENDED");
    }

    #[test]
    fn test_empty_name_rejected() {
        assert_eq!(ActionTypes::new(""), Err(ThunkError::EmptyName));
        assert_eq!(ActionTypes::new("   "), Err(ThunkError::EmptyName));
    }

    #[test]
    fn test_kind_of_rejects_foreign_tags() {
        let types = ActionTypes::new("SAVE").unwrap();

        assert_eq!(types.kind_of("SAVE_FAILED"), Some(LifecycleKind::Failed));
        assert_eq!(types.kind_of("SAVE"), None);
        assert_eq!(types.kind_of("LOAD_FAILED"), None);
        assert!(!types.matches("SAVE_STARTED_STARTED"));
    }

    #[test]
    fn test_iter_in_dispatch_order() {
        let types = ActionTypes::new("X").unwrap();
        let tags: Vec<&str> = types.iter().map(|(_, tag)| tag.as_str()).collect();

        assert_eq!(tags, ["X_STARTED", "X_SUCCEEDED", "X_FAILED", "X_ENDED"]);
    }

    #[test]
    fn test_elapsed_clamps_clock_regression() {
        let later = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 1).unwrap();
        let earlier = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        assert_eq!(Elapsed::between(earlier, later), Elapsed::from_millis(1000));
        assert_eq!(Elapsed::between(later, earlier), Elapsed::from_millis(0));
    }

    #[test]
    fn test_serializes_as_flux_standard_action() {
        let types = ActionTypes::new("LOAD").unwrap();

        let started = TestAction::Started {
            action_type: types.started().clone(),
            args: vec![1, 2],
        };
        assert_eq!(
            serde_json::to_value(&started).unwrap(),
            json!({ "type": "LOAD_STARTED", "payload": [1, 2] })
        );

        let succeeded = TestAction::Succeeded {
            action_type: types.succeeded().clone(),
            payload: "ok".to_string(),
            meta: None,
        };
        assert_eq!(
            serde_json::to_value(&succeeded).unwrap(),
            json!({ "type": "LOAD_SUCCEEDED", "payload": "ok" })
        );

        let failed = TestAction::Failed {
            action_type: types.failed().clone(),
            payload: "boom".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({ "type": "LOAD_FAILED", "payload": "boom", "error": true })
        );

        let ended = TestAction::Ended {
            action_type: types.ended().clone(),
            payload: Elapsed::from_millis(12),
        };
        assert_eq!(
            serde_json::to_value(&ended).unwrap(),
            json!({ "type": "LOAD_ENDED", "payload": { "elapsed": 12 } })
        );
        assert_eq!(ended.elapsed(), Some(Elapsed::from_millis(12)));
        assert!(!started.is_terminal());
        assert!(succeeded.is_terminal() && failed.is_terminal() && ended.is_terminal());
    }

    #[test]
    fn test_failed_is_flagged_whatever_the_payload() {
        let types = ActionTypes::new("SAVE").unwrap();
        let failed: LifecycleAction<(), (), (), serde_json::Value> = LifecycleAction::Failed {
            action_type: types.failed().clone(),
            payload: json!({ "email": "taken" }),
        };

        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({ "type": "SAVE_FAILED", "payload": { "email": "taken" }, "error": true })
        );
    }

    proptest! {
        #[test]
        fn prop_tags_are_name_plus_suffix(name in "[A-Z][A-Z0-9_]{0,24}") {
            let types = ActionTypes::new(name.clone()).unwrap();

            for (kind, tag) in types.iter() {
                prop_assert_eq!(tag.as_str(), format!("{name}{}", kind.suffix()));
                prop_assert_eq!(types.kind_of(tag.as_str()), Some(kind));
            }
        }
    }
}
