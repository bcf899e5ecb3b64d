//! End-to-end lifecycle runs against a recording dispatcher

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use action_thunk_core::prelude::*;
use action_thunk_testing::{
    ManualClock, RecordingDispatcher, StepClock, TestApi, ThunkTest, assertions, test_api,
};
use proptest::prelude::*;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::oneshot;

type JsonAction = ThunkAction<Vec<Value>, Value, Value>;
type JsonThunk = ActionThunk<Vec<Value>, Value, Value, TestApi<(), JsonAction>>;

/// Store-level action: lifecycle actions plus markers dispatched by the test
#[derive(Debug, Clone, PartialEq)]
enum AppAction {
    Lifecycle(JsonAction),
    Marker(&'static str),
}

impl From<JsonAction> for AppAction {
    fn from(action: JsonAction) -> Self {
        Self::Lifecycle(action)
    }
}

type AppThunk = ActionThunk<Vec<Value>, Value, Value, TestApi<(), AppAction>>;

fn echo_args() -> JsonThunk {
    JsonThunk::immediate("ECHO", |args, _api| Ok(Value::Array(args))).unwrap()
}

#[test]
fn test_immediate_value_dispatches_three_actions_and_returns_value() {
    let thunk = echo_args().with_clock(Arc::new(StepClock::millis(5)));
    let recorder = RecordingDispatcher::new();

    let output = thunk.run(vec![json!(1), json!("two")], test_api((), &recorder, ()));

    assert_eq!(
        output.into_immediate().ok(),
        Some(Some(json!([1, "two"])))
    );
    assert_eq!(
        recorder.actions(),
        vec![
            LifecycleAction::Started {
                action_type: thunk.started().clone(),
                args: vec![json!(1), json!("two")],
            },
            LifecycleAction::Succeeded {
                action_type: thunk.succeeded().clone(),
                payload: json!([1, "two"]),
                meta: None,
            },
            LifecycleAction::Ended {
                action_type: thunk.ended().clone(),
                payload: Elapsed::from_millis(5),
            },
        ]
    );
}

#[tokio::test]
async fn test_deferred_outcome_dispatched_after_settling() {
    let (release, gate) = oneshot::channel::<Value>();
    let gate = Arc::new(std::sync::Mutex::new(Some(gate)));
    let thunk = AppThunk::deferred("LOAD", move |_args, _api| {
        let gate = gate.lock().unwrap().take();
        async move {
            let gate = gate.expect("LOAD runs once");
            Ok(gate.await.unwrap_or(Value::Null))
        }
    })
    .unwrap();
    let recorder = RecordingDispatcher::new();

    let output = thunk.run(vec![], test_api((), &recorder, ()));
    recorder.dispatcher().dispatch(AppAction::Marker("after call"));
    release.send(json!({ "id": 7 })).unwrap();

    assert_eq!(output.await, Some(json!({ "id": 7 })));
    let actions = recorder.actions();
    assert!(matches!(
        actions.as_slice(),
        [
            AppAction::Lifecycle(LifecycleAction::Started { .. }),
            AppAction::Marker("after call"),
            AppAction::Lifecycle(LifecycleAction::Succeeded { .. }),
            AppAction::Lifecycle(LifecycleAction::Ended { .. }),
        ]
    ));
}

#[test]
fn test_synchronous_failure_returns_none() {
    let thunk =
        JsonThunk::immediate("PARSE", |_args, _api| Err(json!("unexpected token"))).unwrap();
    let recorder = RecordingDispatcher::new();

    let output = thunk.run(vec![json!("{")], test_api((), &recorder, ()));

    assert_eq!(output.into_immediate().ok(), Some(None));
    recorder.with_actions(|actions| {
        assertions::assert_failed(actions);
        assert_eq!(
            assertions::failed_payload(actions),
            Some(&json!("unexpected token"))
        );
    });
}

#[test]
fn test_rejection_with_response_dispatches_response_data() {
    let thunk = JsonThunk::deferred("SUBMIT", |_args, _api| async {
        Err(json!({
            "message": "Request failed with status code 422",
            "response": { "status": 422, "data": { "errors": ["email taken"] } }
        }))
    })
    .unwrap();
    let recorder = RecordingDispatcher::new();

    let output = thunk.run(vec![], test_api((), &recorder, ()));

    assert_eq!(tokio_test::block_on(output.into_future()), None);
    recorder.with_actions(|actions| {
        assertions::assert_failed(actions);
        assert_eq!(
            assertions::failed_payload(actions),
            Some(&json!({ "errors": ["email taken"] }))
        );
    });
}

#[tokio::test]
async fn test_typed_transport_error_without_response_dispatches_error() {
    type Fetch = ActionThunk<u64, String, TransportError<String>, TestApi<(), FetchAction>>;
    type FetchAction = ThunkAction<u64, String, TransportError<String>>;

    let fetch = Fetch::deferred("FETCH", |id, _api| async move {
        if id == 0 {
            Err(TransportError::new("connection refused"))
        } else {
            Err(TransportError::with_response("Not Found", 404, format!("no user {id}")))
        }
    })
    .unwrap();

    ThunkTest::without_extra(fetch.clone())
        .given_state(())
        .when_called(0)
        .then_actions(|actions| {
            assert_eq!(
                assertions::failed_payload(actions),
                Some(&FailureBody::Error(TransportError::new("connection refused")))
            );
        })
        .run_async()
        .await;

    ThunkTest::without_extra(fetch)
        .given_state(())
        .when_called(9)
        .then_actions(|actions| {
            assert_eq!(
                assertions::failed_payload(actions),
                Some(&FailureBody::Data("no user 9".to_string()))
            );
        })
        .then_output(|value| assert!(value.is_none()))
        .run_async()
        .await;
}

#[test]
fn test_payload_meta_value_is_split() {
    let thunk = JsonThunk::immediate("PAGE", |_args, _api| {
        Ok(json!({ "payload": [1, 2], "meta": { "cursor": "abc" } }))
    })
    .unwrap();

    ThunkTest::without_extra(thunk)
        .given_state(())
        .when_called(vec![])
        .then_actions(|actions| {
            assert_eq!(
                assertions::succeeded_payload(actions),
                Some((&json!([1, 2]), Some(&json!({ "cursor": "abc" }))))
            );
        })
        .then_output(|value| {
            // The caller still receives the whole value.
            assert_eq!(
                value,
                Some(&json!({ "payload": [1, 2], "meta": { "cursor": "abc" } }))
            );
        })
        .run();
}

#[test]
fn test_falsy_payload_value_is_dispatched_whole() {
    let thunk = JsonThunk::immediate("FLAG", |_args, _api| {
        Ok(json!({ "payload": false, "meta": 1 }))
    })
    .unwrap();

    ThunkTest::without_extra(thunk)
        .given_state(())
        .when_called(vec![])
        .then_actions(|actions| {
            assert_eq!(
                assertions::succeeded_payload(actions),
                Some((&json!({ "payload": false, "meta": 1 }), None))
            );
        })
        .run();
}

#[test]
fn test_factory_exposes_exact_tags() {
    let thunk = echo_args();

    assert_eq!(thunk.name(), "ECHO");
    assert_eq!(thunk.start().as_str(), "ECHO_STARTED");
    assert_eq!(thunk.started().as_str(), "ECHO_STARTED");
    assert_eq!(thunk.succeeded().as_str(), "ECHO_SUCCEEDED");
    assert_eq!(thunk.failed().as_str(), "ECHO_FAILED");
    assert_eq!(thunk.ended().as_str(), "ECHO_ENDED");
    assert_eq!(thunk.types().kind_of("ECHO_FAILED"), Some(LifecycleKind::Failed));
}

#[tokio::test]
async fn test_concurrent_runs_measure_their_own_start() {
    let clock = Arc::new(ManualClock::default());
    let (first_tx, first_rx) = oneshot::channel::<Value>();
    let (second_tx, second_rx) = oneshot::channel::<Value>();
    let gates = Arc::new(std::sync::Mutex::new(vec![second_rx, first_rx]));

    let thunk = JsonThunk::deferred("SLOW", move |_args, _api| {
        let gate = gates.lock().unwrap().pop();
        async move { Ok(gate.expect("two runs").await.unwrap_or(Value::Null)) }
    })
    .unwrap()
    .with_clock(clock.clone());

    let first_recorder = RecordingDispatcher::new();
    let second_recorder = RecordingDispatcher::new();

    let first = thunk.run(vec![json!("first")], test_api((), &first_recorder, ()));
    clock.advance_millis(100);
    let second = thunk.run(vec![json!("second")], test_api((), &second_recorder, ()));
    clock.advance_millis(50);

    let first = tokio::spawn(first.into_future());
    let second = tokio::spawn(second.into_future());

    first_tx.send(json!(1)).unwrap();
    assert_eq!(first.await.unwrap(), Some(json!(1)));
    clock.advance_millis(25);
    second_tx.send(json!(2)).unwrap();
    assert_eq!(second.await.unwrap(), Some(json!(2)));

    first_recorder.with_actions(|actions| {
        assertions::assert_succeeded(actions);
        assert_eq!(assertions::elapsed(actions), Some(Elapsed::from_millis(150)));
    });
    second_recorder.with_actions(|actions| {
        assertions::assert_succeeded(actions);
        assert_eq!(assertions::elapsed(actions), Some(Elapsed::from_millis(75)));
    });
}

#[test]
fn test_operation_can_read_state_and_dispatch() {
    type Counter = ActionThunk<u32, u32, String, TestApi<u32, CounterAction>>;
    type CounterAction = ThunkAction<u32, u32, String>;

    let bump = Counter::immediate("BUMP", |by, api| {
        let current = api.state();
        api.dispatch(CounterAction::Ended {
            action_type: ActionTypes::new("NESTED").unwrap().ended().clone(),
            payload: Elapsed::default(),
        });
        Ok(current + by)
    })
    .unwrap();
    let recorder = RecordingDispatcher::new();

    let output = bump.run(2, test_api(40, &recorder, ()));

    assert_eq!(output.into_immediate().ok(), Some(Some(42)));
    let tags: Vec<String> = recorder
        .actions()
        .iter()
        .map(|action| action.action_type().to_string())
        .collect();
    assert_eq!(
        tags,
        ["BUMP_STARTED", "NESTED_ENDED", "BUMP_SUCCEEDED", "BUMP_ENDED"]
    );
}

proptest! {
    #[test]
    fn prop_every_run_is_started_outcome_ended(
        name in "[A-Z][A-Z_]{0,16}",
        fail in any::<bool>(),
        step in 0_i64..10_000,
    ) {
        let thunk = JsonThunk::immediate(name.clone(), move |args, _api| {
            if fail { Err(Value::Array(args)) } else { Ok(Value::Array(args)) }
        })
        .unwrap()
        .with_clock(Arc::new(StepClock::millis(step)));
        let recorder = RecordingDispatcher::new();

        let output = thunk.run(vec![json!(step)], test_api((), &recorder, ()));

        prop_assert_eq!(output.into_immediate().ok().flatten().is_none(), fail);
        let actions = recorder.actions();
        assertions::assert_single_run(&actions);
        let tags: Vec<String> =
            actions.iter().map(|action| action.action_type().to_string()).collect();
        let outcome = if fail { "FAILED" } else { "SUCCEEDED" };
        prop_assert_eq!(
            tags,
            vec![format!("{name}_STARTED"), format!("{name}_{outcome}"), format!("{name}_ENDED")]
        );
        prop_assert_eq!(
            assertions::elapsed(&actions),
            Some(Elapsed::from_millis(u64::try_from(step).unwrap()))
        );
    }
}
