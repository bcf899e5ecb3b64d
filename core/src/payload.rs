//! Payload conventions for success values and failures
//!
//! A thunk does not dispatch the operation's value or error verbatim. Two
//! conventions are applied first:
//!
//! - **Payload/meta splitting**: a success value that carries a `payload` and a
//!   `meta` is dispatched as that pair instead of as a whole
//!   ([`SuccessPayload`]).
//! - **Transport errors**: a failure that carries an HTTP-style response is
//!   dispatched as the response body rather than the error wrapper
//!   ([`FailurePayload`]).
//!
//! Both conventions are selected by type. For dynamically shaped data,
//! [`serde_json::Value`] implements both traits by inspecting the value's keys.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// How a success value becomes the SUCCEEDED payload and meta
///
/// Plain values dispatch a clone of themselves with no meta. Use
/// [`impl_plain_success_payload!`](crate::impl_plain_success_payload) for
/// your own types, or return a [`WithMeta`] to split.
pub trait SuccessPayload {
    /// Type of the SUCCEEDED payload
    type Payload;

    /// Type of the SUCCEEDED meta
    type Meta;

    /// Split the value into payload and optional meta
    ///
    /// Borrows the value: the original is still returned to the caller of
    /// the thunk after the SUCCEEDED action is dispatched.
    fn split_payload(&self) -> (Self::Payload, Option<Self::Meta>);
}

/// How a failure becomes the FAILED payload
///
/// Plain errors are dispatched as themselves. Use
/// [`impl_plain_failure_payload!`](crate::impl_plain_failure_payload) for
/// your own types.
pub trait FailurePayload {
    /// Type of the FAILED payload
    type Payload;

    /// Normalise the failure into its dispatched form
    fn into_payload(self) -> Self::Payload;
}

/// Implement [`SuccessPayload`] for types dispatched as themselves
///
/// ```
/// use action_thunk_core::impl_plain_success_payload;
///
/// #[derive(Clone)]
/// struct User { id: u64 }
///
/// impl_plain_success_payload!(User);
/// ```
#[macro_export]
macro_rules! impl_plain_success_payload {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::payload::SuccessPayload for $ty {
                type Payload = $ty;
                type Meta = ();

                fn split_payload(&self) -> (Self::Payload, ::std::option::Option<Self::Meta>) {
                    (::std::clone::Clone::clone(self), ::std::option::Option::None)
                }
            }
        )*
    };
}

/// Implement [`FailurePayload`] for errors dispatched as themselves
///
/// ```
/// use action_thunk_core::impl_plain_failure_payload;
///
/// #[derive(Debug)]
/// enum ApiError { NotFound }
///
/// impl_plain_failure_payload!(ApiError);
/// ```
#[macro_export]
macro_rules! impl_plain_failure_payload {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::payload::FailurePayload for $ty {
                type Payload = $ty;

                fn into_payload(self) -> Self::Payload {
                    self
                }
            }
        )*
    };
}

impl_plain_success_payload!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
    String,
    &'static str,
);

impl_plain_failure_payload!(
    (),
    String,
    &'static str,
    std::io::Error,
    Box<dyn std::error::Error + Send + Sync>,
);

impl<T: Clone> SuccessPayload for Vec<T> {
    type Payload = Self;
    type Meta = ();

    fn split_payload(&self) -> (Self::Payload, Option<Self::Meta>) {
        (self.clone(), None)
    }
}

impl<T: Clone> SuccessPayload for Option<T> {
    type Payload = Self;
    type Meta = ();

    fn split_payload(&self) -> (Self::Payload, Option<Self::Meta>) {
        (self.clone(), None)
    }
}

impl<A: Clone, B: Clone> SuccessPayload for (A, B) {
    type Payload = Self;
    type Meta = ();

    fn split_payload(&self) -> (Self::Payload, Option<Self::Meta>) {
        (self.clone(), None)
    }
}

/// Splits objects carrying a truthy `payload` key
///
/// `{ "payload": P, "meta": M }` dispatches payload `P` with meta `M`; a
/// missing or null `meta` dispatches no meta. Any other value is dispatched
/// whole, including objects whose `payload` is `null`, `false`, `0` or `""`.
impl SuccessPayload for Value {
    type Payload = Self;
    type Meta = Self;

    fn split_payload(&self) -> (Self::Payload, Option<Self::Meta>) {
        match self.get("payload") {
            Some(payload) if is_truthy(payload) => {
                let meta = self.get("meta").filter(|meta| !meta.is_null()).cloned();
                (payload.clone(), meta)
            }
            _ => (self.clone(), None),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n.abs() > 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Unwraps `response.data` when present
///
/// `{ "response": { "data": D } }` dispatches `D`; any other value is
/// dispatched whole.
impl FailurePayload for Value {
    type Payload = Self;

    fn into_payload(self) -> Self::Payload {
        if let Some(data) = self.get("response").and_then(|response| response.get("data")) {
            return data.clone();
        }
        self
    }
}

/// A success value carrying an explicit payload/meta pair
///
/// # Example
///
/// ```
/// use action_thunk_core::payload::{SuccessPayload, WithMeta};
///
/// let page = WithMeta::new(vec![1, 2, 3], "page=1");
/// let (payload, meta) = page.split_payload();
///
/// assert_eq!(payload, vec![1, 2, 3]);
/// assert_eq!(meta, Some("page=1"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithMeta<P, M> {
    /// Dispatched as the SUCCEEDED payload
    pub payload: P,
    /// Dispatched as the SUCCEEDED meta
    pub meta: M,
}

impl<P, M> WithMeta<P, M> {
    /// Pair a payload with its meta
    #[must_use]
    pub const fn new(payload: P, meta: M) -> Self {
        Self { payload, meta }
    }
}

impl<P: Clone, M: Clone> SuccessPayload for WithMeta<P, M> {
    type Payload = P;
    type Meta = M;

    fn split_payload(&self) -> (Self::Payload, Option<Self::Meta>) {
        (self.payload.clone(), Some(self.meta.clone()))
    }
}

/// Response attached to a [`TransportError`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportResponse<D> {
    /// Status code reported by the transport
    pub status: u16,
    /// Decoded response body
    pub data: D,
}

/// An HTTP-client style error, optionally carrying the server's response
///
/// When a response is attached, the FAILED payload is the response body
/// (`response.data`), which is usually what a reducer wants to show.
/// Without one (connection refused, timeout, ...) the error itself is
/// dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportError<D> {
    /// Human readable description
    pub message: String,
    /// Response received before the failure, if any
    pub response: Option<TransportResponse<D>>,
}

impl<D> TransportError<D> {
    /// An error with no response (the request never completed)
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            response: None,
        }
    }

    /// An error carrying the server's response
    #[must_use]
    pub fn with_response(message: impl Into<String>, status: u16, data: D) -> Self {
        Self {
            message: message.into(),
            response: Some(TransportResponse { status, data }),
        }
    }

    /// Status code of the attached response
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|response| response.status)
    }
}

impl<D> fmt::Display for TransportError<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status() {
            Some(status) => write!(f, "{} (status {status})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl<D: fmt::Debug> std::error::Error for TransportError<D> {}

/// FAILED payload produced by a [`TransportError`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FailureBody<D> {
    /// The response body
    Data(D),
    /// The error itself, when no response was received
    Error(TransportError<D>),
}

impl<D> FailurePayload for TransportError<D> {
    type Payload = FailureBody<D>;

    fn into_payload(self) -> Self::Payload {
        match self.response {
            Some(response) => FailureBody::Data(response.data),
            None => FailureBody::Error(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_values_dispatch_whole() {
        assert_eq!(42_u32.split_payload(), (42, None));
        assert_eq!("done".to_string().split_payload(), ("done".to_string(), None));
        assert_eq!(vec![1, 2].split_payload(), (vec![1, 2], None));
    }

    #[test]
    fn test_json_payload_meta_split() {
        let value = json!({ "payload": { "id": 1 }, "meta": { "page": 2 } });

        assert_eq!(
            value.split_payload(),
            (json!({ "id": 1 }), Some(json!({ "page": 2 })))
        );
    }

    #[test]
    fn test_json_payload_without_meta() {
        let value = json!({ "payload": [1, 2, 3] });

        assert_eq!(value.split_payload(), (json!([1, 2, 3]), None));
    }

    #[test]
    fn test_json_null_payload_dispatched_whole() {
        let value = json!({ "payload": null, "meta": "m" });

        assert_eq!(value.split_payload(), (value.clone(), None));
        assert_eq!(json!(null).split_payload(), (json!(null), None));
        assert_eq!(json!("text").split_payload(), (json!("text"), None));
    }

    #[test]
    fn test_json_falsy_payload_dispatched_whole() {
        for value in [
            json!({ "payload": false, "meta": 1 }),
            json!({ "payload": 0, "meta": 1 }),
            json!({ "payload": 0.0 }),
            json!({ "payload": "" }),
        ] {
            assert_eq!(value.split_payload(), (value.clone(), None));
        }
    }

    #[test]
    fn test_json_truthy_scalar_payload_splits() {
        assert_eq!(
            json!({ "payload": true, "meta": 1 }).split_payload(),
            (json!(true), Some(json!(1)))
        );
        assert_eq!(json!({ "payload": -3 }).split_payload(), (json!(-3), None));
        assert_eq!(json!({ "payload": "x" }).split_payload(), (json!("x"), None));
        assert_eq!(json!({ "payload": [] }).split_payload(), (json!([]), None));
    }

    #[test]
    fn test_json_failure_unwraps_response_data() {
        let error = json!({ "message": "400", "response": { "data": { "field": "email" } } });

        assert_eq!(error.into_payload(), json!({ "field": "email" }));
    }

    #[test]
    fn test_json_failure_without_response_data() {
        let error = json!({ "message": "offline" });
        assert_eq!(error.clone().into_payload(), error);

        let error = json!({ "response": { "status": 500 } });
        assert_eq!(error.clone().into_payload(), error);
    }

    #[test]
    fn test_with_meta_split() {
        let value = WithMeta::new("payload", 7_u8);

        assert_eq!(value.split_payload(), ("payload", Some(7)));
    }

    #[test]
    fn test_transport_error_with_response() {
        let error = TransportError::with_response("Bad Request", 400, "invalid email");

        assert_eq!(error.status(), Some(400));
        assert_eq!(error.to_string(), "Bad Request (status 400)");
        assert_eq!(error.into_payload(), FailureBody::Data("invalid email"));
    }

    #[test]
    fn test_transport_error_without_response() {
        let error: TransportError<String> = TransportError::new("connection refused");

        assert_eq!(error.to_string(), "connection refused");
        assert_eq!(error.clone().into_payload(), FailureBody::Error(error));
    }

    #[test]
    fn test_failure_body_serializes_untagged() {
        let data: FailureBody<&str> = FailureBody::Data("nope");
        assert_eq!(serde_json::to_value(&data).ok(), Some(json!("nope")));
    }
}
