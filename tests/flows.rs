//! Behavioural tests for the public flow API.

use std::time::Duration;

use flowcast::{BufferPolicy, ColdFlow, Emitter, Flow, FlowConfig, FlowError, MutableSharedFlow, MutableStateFlow};
use futures::StreamExt;
use tokio::sync::oneshot;

/// Yields until `cond` holds; fails the test after five seconds.
async fn until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async move {
        while !cond() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn registered_subscriber_observes_emitted_value() {
    let flow = MutableSharedFlow::with_policy(BufferPolicy::Unbounded);
    let mut sub = flow.subscribe();
    let consumer = tokio::spawn(async move { sub.next().await });

    until(|| flow.subscription_count() == 1).await;
    flow.emit("V").await;
    assert_eq!(consumer.await.unwrap(), Some("V"));
}

#[tokio::test]
async fn state_flow_starts_with_latest_value() {
    let state = MutableStateFlow::with_policy(0, BufferPolicy::Unbounded);
    for v in 1..=4 {
        state.emit(v).await;
    }

    let mut sub = state.subscribe();
    assert_eq!(sub.next().await, Some(4));

    for v in 5..=7 {
        state.emit(v).await;
    }
    for v in 5..=7 {
        assert_eq!(sub.next().await, Some(v));
    }
    assert_eq!(sub.pending(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stalling_one_delivers_every_value() {
    let flow = MutableSharedFlow::with_policy(BufferPolicy::Stalling { capacity: 1 });
    let mut sub = flow.subscribe();
    let consumer = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(v) = sub.next().await {
            seen.push(v);
        }
        seen
    });

    until(|| flow.subscription_count() == 1).await;
    for v in 1..=10 {
        flow.emit(v).await;
    }
    drop(flow);

    let seen = tokio::time::timeout(Duration::from_secs(5), consumer)
        .await
        .expect("consumer finished")
        .unwrap();
    assert_eq!(seen, (1..=10).collect::<Vec<_>>());
}

#[tokio::test]
async fn sliding_three_keeps_newest() {
    let flow = MutableSharedFlow::with_policy(BufferPolicy::Sliding { capacity: 3 });
    let mut sub = flow.subscribe();
    let (go_tx, go_rx) = oneshot::channel::<()>();

    let consumer = tokio::spawn(async move {
        let first = sub.next().await;
        go_rx.await.unwrap();
        let pending = sub.pending();
        let mut rest = Vec::new();
        for _ in 0..pending {
            rest.extend(sub.next().await);
        }
        (first, rest)
    });

    until(|| flow.subscription_count() == 1).await;
    flow.emit(0).await;
    for v in 1..=4 {
        flow.emit(v).await;
    }
    go_tx.send(()).unwrap();

    let (first, rest) = consumer.await.unwrap();
    assert_eq!(first, Some(0));
    assert_eq!(rest, vec![2, 3, 4]);
}

#[tokio::test]
async fn cold_flow_replays_per_pass() {
    let letters = ColdFlow::new(|out: Emitter<&'static str>| async move {
        out.emit("A").await?;
        out.emit("B").await?;
        Ok::<_, FlowError>(())
    });

    for _ in 0..2 {
        let pass: Vec<_> = letters.subscribe().into_stream().collect().await;
        assert_eq!(pass, ["A", "B"]);
    }
}

#[tokio::test]
async fn cold_flow_composes_as_stream() {
    let numbers = ColdFlow::with_config(
        |out: Emitter<u32>| async move {
            for v in 1..=6 {
                out.emit(v).await?;
            }
            Ok::<_, FlowError>(())
        },
        FlowConfig::new(BufferPolicy::Stalling { capacity: 2 }).with_label("numbers"),
    );

    let evens: Vec<u32> = numbers
        .subscribe()
        .into_stream()
        .filter(|v| futures::future::ready(v % 2 == 0))
        .collect()
        .await;
    assert_eq!(evens, vec![2, 4, 6]);
}

#[tokio::test]
async fn direct_policy_hands_off_only_to_waiting_consumer() {
    let flow = MutableSharedFlow::with_policy(BufferPolicy::Direct);
    let mut sub = flow.subscribe();
    let (go_tx, go_rx) = oneshot::channel::<()>();

    let consumer = tokio::spawn(async move {
        let first = sub.next().await;
        go_rx.await.unwrap();
        let second = sub.next().await;
        (first, second)
    });

    until(|| flow.subscription_count() == 1).await;
    flow.emit(1).await;
    // Consumer is not pulling: dropped.
    flow.emit(2).await;
    go_tx.send(()).unwrap();

    let mut next = 3;
    while !consumer.is_finished() {
        flow.emit(next).await;
        next += 1;
        tokio::task::yield_now().await;
    }
    let (first, second) = consumer.await.unwrap();
    assert_eq!(first, Some(1));
    assert!(second.is_some_and(|v| v >= 3), "got {second:?}");
}

#[tokio::test]
async fn registration_during_fan_out_sees_new_value_once() {
    let state = MutableStateFlow::with_policy(0, BufferPolicy::Stalling { capacity: 1 });
    let mut slow = state.subscribe();
    assert_eq!(slow.next().await, Some(0));
    state.emit(1).await;

    let emitter = {
        let state = state.clone();
        tokio::spawn(async move { state.emit(2).await })
    };
    until(|| state.value() == 2).await;
    assert!(!emitter.is_finished(), "fan-out of 2 should be stalled on the slow subscriber");

    let mut late = state.subscribe();
    assert_eq!(late.next().await, Some(2));

    assert_eq!(slow.next().await, Some(1));
    assert_eq!(slow.next().await, Some(2));
    emitter.await.unwrap();

    state.emit(3).await;
    assert_eq!(late.next().await, Some(3));
    assert_eq!(slow.next().await, Some(3));
}

#[tokio::test]
async fn dropping_subscription_releases_stalled_producer() {
    let state = MutableStateFlow::with_policy(0, BufferPolicy::Stalling { capacity: 1 });
    let mut sub = state.subscribe();
    assert_eq!(sub.next().await, Some(0));
    state.emit(1).await;

    let emitter = {
        let state = state.clone();
        tokio::spawn(async move { state.emit(2).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!emitter.is_finished());

    drop(sub);
    tokio::time::timeout(Duration::from_secs(5), emitter)
        .await
        .expect("producer released")
        .unwrap();
    assert_eq!(state.subscription_count(), 0);
    assert_eq!(state.value(), 2);
}

#[tokio::test]
async fn dropping_flow_ends_consumers() {
    let flow = MutableSharedFlow::with_policy(BufferPolicy::Unbounded);
    let mut sub = flow.subscribe();
    let consumer = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(v) = sub.next().await {
            seen.push(v);
        }
        seen
    });

    until(|| flow.subscription_count() == 1).await;
    flow.emit(1).await;
    flow.emit(2).await;
    drop(flow);
    assert_eq!(consumer.await.unwrap(), vec![1, 2]);
}

#[tokio::test]
async fn cancel_by_id_resumes_waiting_consumer_with_error() {
    let flow = MutableSharedFlow::<u32>::with_policy(BufferPolicy::Unbounded);
    let mut sub = flow.subscribe();
    let id = sub.id();
    let consumer = tokio::spawn(async move {
        let first = sub.recv().await;
        let after = sub.recv().await;
        (first, after)
    });

    until(|| flow.subscription_count() == 1).await;
    assert!(flow.cancel(id));
    let (first, after) = consumer.await.unwrap();
    assert_eq!(first, Err(FlowError::OwnerExited));
    assert_eq!(after, Ok(None));

    assert!(!flow.cancel(id));
    flow.emit(1).await;
}

#[tokio::test]
async fn cancel_before_first_receive_is_honoured() {
    let state = MutableStateFlow::with_policy(0u32, BufferPolicy::Unbounded);
    let mut sub = state.subscribe();
    assert!(state.cancel(sub.id()));

    state.emit(1).await;
    assert_eq!(sub.recv().await, Ok(None));
    assert_eq!(state.subscription_count(), 0);
    assert!(!state.cancel(sub.id()));
}

#[tokio::test]
async fn dropped_emit_does_not_strand_detached_values() {
    let state = MutableStateFlow::with_policy(0u32, BufferPolicy::Stalling { capacity: 1 });
    let mut sub = state.subscribe();
    assert_eq!(sub.next().await, Some(0));

    state.emit(1).await;
    let mut blocked = Box::pin(state.emit(2));
    assert!(futures::poll!(blocked.as_mut()).is_pending());
    state.emit_detached(3);
    drop(blocked);

    assert_eq!(sub.next().await, Some(1));
    let next = tokio::time::timeout(Duration::from_secs(5), sub.next()).await;
    assert_eq!(next, Ok(Some(3)));
    until(|| state.value() == 3).await;
}

#[tokio::test]
async fn subscription_reports_policy_and_closure() {
    let flow = MutableSharedFlow::<u8>::with_policy(BufferPolicy::Sliding { capacity: 0 });
    let sub = flow.subscribe();
    assert_eq!(sub.policy(), BufferPolicy::Sliding { capacity: 1 });
    assert!(!sub.is_closed());

    assert!(flow.cancel(sub.id()));
    assert!(sub.is_closed());
}

#[tokio::test]
async fn detached_emissions_arrive_in_call_order() {
    let state = MutableStateFlow::with_policy(0u32, BufferPolicy::Unbounded);
    let mut sub = state.subscribe();
    assert_eq!(sub.next().await, Some(0));

    for v in 1..=5 {
        state.emit_detached(v);
    }
    for v in 1..=5 {
        assert_eq!(sub.next().await, Some(v));
    }
    assert_eq!(state.value(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn repeated_subscribe_emit_drop_never_double_resumes() {
    let flow = MutableSharedFlow::with_policy(BufferPolicy::Stalling { capacity: 2 });
    for round in 0..200u32 {
        let mut sub = flow.subscribe();
        let consumer = tokio::spawn(async move {
            let v = sub.next().await;
            drop(sub);
            v
        });
        until(|| flow.subscription_count() == 1).await;
        flow.emit(round).await;
        assert_eq!(consumer.await.unwrap(), Some(round));
        until(|| flow.subscription_count() == 0).await;
    }
}
