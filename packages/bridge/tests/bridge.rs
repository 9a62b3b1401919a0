//! End-to-end tests of the dispatcher and the mirror against an in-process
//! peer.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use peerlink_bridge::{Argument, DispatchError, Dispatcher, Mirror, MirrorNode};
use peerlink_peer::{HostProperty, ObjectPeer};
use peerlink_wire::{LoopbackChannel, TransportError};
use serde_json::{json, Value};
use tokio::sync::mpsc;

fn demo_peer() -> ObjectPeer {
    ObjectPeer::from_json(json!({
        "version": "2.1",
        "settings": { "volume": 7 }
    }))
    .unwrap()
    .with("answer", HostProperty::function(|_, _| Ok(json!(42))))
    .unwrap()
    .with("explode", HostProperty::function(|_, _| Err(json!("boom"))))
    .unwrap()
    .with(
        "events.subscribe",
        HostProperty::function(|_, sink| {
            sink.invoke(0, vec![json!("first"), json!(1)]);
            // Not a callback position: never reaches the page side.
            sink.invoke(5, vec![json!("stray")]);
            Ok(Value::Null)
        }),
    )
    .unwrap()
}

fn connect(peer: ObjectPeer) -> (Arc<LoopbackChannel>, Dispatcher) {
    let channel = Arc::new(LoopbackChannel::new(Arc::new(peer)));
    let dispatcher = Dispatcher::new(channel.clone());
    (channel, dispatcher)
}

#[tokio::test]
async fn call_resolves_with_result() {
    let (_, dispatcher) = connect(demo_peer());
    assert_eq!(dispatcher.call("answer", vec![]).await, Ok(json!(42)));
}

#[tokio::test]
async fn call_rejects_with_remote_error() {
    let (_, dispatcher) = connect(demo_peer());
    assert_eq!(
        dispatcher.call("explode", vec![]).await,
        Err(DispatchError::Remote(json!("boom")))
    );
}

#[tokio::test]
async fn property_read_and_write() {
    let (_, dispatcher) = connect(demo_peer());
    assert_eq!(dispatcher.get("settings.volume").await, Ok(json!(7)));

    let written = dispatcher
        .dispatch(
            "settings.volume",
            vec![json!(9).into(), json!(10).into()],
            true,
            true,
        )
        .await;
    assert_eq!(written, Ok(Value::Null));
    assert_eq!(dispatcher.get("settings.volume").await, Ok(json!(9)));
}

#[tokio::test]
async fn callback_is_invoked_once_after_resolving() {
    let (_, dispatcher) = connect(demo_peer());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let resolved = dispatcher
        .dispatch(
            "events.subscribe",
            vec![Argument::callback(move |args| {
                let _ = tx.send(args);
            })],
            true,
            false,
        )
        .await;
    assert_eq!(resolved, Ok(Value::Null));

    let first = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap();
    assert_eq!(first, Some(vec![json!("first"), json!(1)]));

    // The callback table is dropped once the peer closes the request.
    assert_eq!(
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn transport_error_rejects() {
    let (channel, dispatcher) = connect(demo_peer());
    channel.disconnect();
    assert_eq!(
        dispatcher.call("answer", vec![]).await,
        Err(DispatchError::Transport(TransportError::Disconnected))
    );
    assert!(Mirror::build(&dispatcher, true).await.is_err());
}

#[tokio::test]
async fn mirror_matches_peer_shape() {
    let (_, dispatcher) = connect(demo_peer());
    let mirror = Mirror::build(&dispatcher, true).await.unwrap();

    assert_eq!(
        mirror.root().names(),
        vec!["answer", "events", "explode", "settings", "version"]
    );
    let events = mirror.get("events").and_then(MirrorNode::as_object).unwrap();
    assert_eq!(events.names(), vec!["subscribe"]);
    assert_eq!(events.get("subscribe").unwrap().path(), "events.subscribe");
}

#[tokio::test]
async fn mirror_values_are_read_fresh() {
    let (_, dispatcher) = connect(demo_peer());
    let mirror = Mirror::build(&dispatcher, false).await.unwrap();
    let volume = mirror
        .resolve("settings.volume")
        .and_then(MirrorNode::as_value)
        .unwrap();

    assert_eq!(volume.get().await, Ok(json!(7)));
    dispatcher.set("settings.volume", json!(3)).await.unwrap();
    assert_eq!(volume.get().await, Ok(json!(3)));
}

#[tokio::test]
async fn mirror_functions_forward_calls() {
    let (_, dispatcher) = connect(demo_peer());
    let mirror = Mirror::build(&dispatcher, true).await.unwrap();
    let answer = mirror.get("answer").and_then(MirrorNode::as_function).unwrap();
    assert_eq!(answer.call(vec![]).await, Ok(json!(42)));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let subscribe = mirror
        .resolve("events.subscribe")
        .and_then(MirrorNode::as_function)
        .unwrap();
    subscribe
        .call(vec![Argument::callback(move |args| {
            sink.lock().unwrap().push(args)
        })])
        .await
        .unwrap();

    for _ in 0..50 {
        if !seen.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(seen.lock().unwrap().len(), 1);
}
