//! The peer the CLI talks to: a JSON object tree plus two built-in
//! functions.
//!
//! - `echo(...)` returns its arguments as an array.
//! - `timer.after(ms, callback)` calls `callback(ms)` once, `ms`
//!   milliseconds later, and returns immediately.

use std::time::Duration;

use peerlink::peer::{CallbackSink, HostProperty, ObjectPeer};
use serde_json::{json, Value};

use crate::error::Result;

pub fn demo_peer(tree: Value) -> Result<ObjectPeer> {
    let peer = ObjectPeer::from_json(tree)?
        .with("echo", HostProperty::function(echo))?
        .with("timer.after", HostProperty::function(after))?;
    Ok(peer)
}

fn echo(args: Vec<Value>, _: CallbackSink) -> std::result::Result<Value, Value> {
    Ok(Value::Array(args))
}

fn after(args: Vec<Value>, sink: CallbackSink) -> std::result::Result<Value, Value> {
    let ms = args
        .first()
        .and_then(Value::as_u64)
        .ok_or_else(|| json!("timer.after expects a delay in milliseconds"))?;
    if !sink.indices().contains(&1) {
        return Err(json!("timer.after expects a callback as its second argument"));
    }
    let handle = tokio::runtime::Handle::try_current()
        .map_err(|_| json!("timer.after needs a running tokio runtime"))?;
    handle.spawn(async move {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        if !sink.invoke(1, vec![json!(ms)]) {
            tracing::debug!(ms, "timer fired after the page side stopped listening");
        }
    });
    Ok(Value::Null)
}
