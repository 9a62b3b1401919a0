//! Ordered delivery of host events to Lua functions.

use std::sync::{Mutex, MutexGuard};

use mlua::{Function, Variadic};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::convert::Json;

/// Calls one Lua function once per pushed argument list.
///
/// Calls run one at a time, in push order, on a drain task that may suspend
/// on remote capabilities. The task starts on the first push and ends once
/// the queue is dropped and every pushed call has run.
pub struct CallQueue {
    function: Function,
    what: &'static str,
    sender: Mutex<Option<UnboundedSender<Vec<Value>>>>,
}

impl CallQueue {
    pub fn new(function: Function, what: &'static str) -> Self {
        Self {
            function,
            what,
            sender: Mutex::new(None),
        }
    }

    fn sender(&self) -> MutexGuard<'_, Option<UnboundedSender<Vec<Value>>>> {
        self.sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a call. Returns false when no tokio runtime can run it.
    pub fn push(&self, args: Vec<Value>) -> bool {
        let mut sender = self.sender();
        // A closed sender means the runtime that ran the drain task is gone.
        if !sender.as_ref().is_some_and(|tx| !tx.is_closed()) {
            let Ok(runtime) = Handle::try_current() else {
                return false;
            };
            let (tx, rx) = mpsc::unbounded_channel();
            runtime.spawn(drain(self.function.clone(), self.what, rx));
            *sender = Some(tx);
        }
        sender
            .as_ref()
            .is_some_and(|sender| sender.send(args).is_ok())
    }
}

async fn drain(function: Function, what: &'static str, mut calls: UnboundedReceiver<Vec<Value>>) {
    while let Some(args) = calls.recv().await {
        let args: Variadic<Json> = args.into_iter().map(Json).collect();
        if let Err(error) = function.call_async::<()>(args).await {
            tracing::warn!(target: "peerlink::script", %error, "script {what} failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlua::Lua;

    #[test]
    fn push_without_runtime_is_refused() {
        let lua = Lua::new();
        let function = lua.create_function(|_, ()| Ok(())).unwrap();
        assert!(!CallQueue::new(function, "callback").push(vec![]));
    }

    #[tokio::test]
    async fn calls_run_in_push_order() {
        let lua = Lua::new();
        let seen = lua.create_table().unwrap();
        let sink = seen.clone();
        let function = lua
            .create_function(move |_, n: i64| sink.push(n))
            .unwrap();

        let queue = CallQueue::new(function, "callback");
        for n in 0..50 {
            assert!(queue.push(vec![Value::from(n)]));
        }
        drop(queue);

        for _ in 0..100 {
            if seen.raw_len() == 50 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        let order: Vec<i64> = seen.sequence_values().collect::<mlua::Result<_>>().unwrap();
        assert_eq!(order, (0..50).collect::<Vec<_>>());
    }
}
