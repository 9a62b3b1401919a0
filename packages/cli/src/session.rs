//! One page context wired to the demo peer.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use peerlink::bridge::Dispatcher;
use peerlink::peer::ObjectPeer;
use peerlink::script::{ExecutionOutcome, ScriptError, ScriptHost, ScriptInjector, ScriptOptions};
use peerlink::storage::{AreaName, Keys, MemoryBackend};
use peerlink::wire::LoopbackChannel;
use serde_json::Value;

use crate::demo::demo_peer;
use crate::error::Result;

/// How long to wait for fire-and-forget log messages after an execution.
const LOG_SETTLE: Duration = Duration::from_millis(10);

/// Prints injected page code instead of running it.
#[derive(Debug, Default)]
pub struct ConsoleInjector {
    injected: Mutex<Vec<String>>,
}

impl ConsoleInjector {
    pub fn injected(&self) -> Vec<String> {
        self.injected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ScriptInjector for ConsoleInjector {
    fn inject(&self, source: &str) {
        tracing::info!(target: "peerlink::inject", "{source}");
        self.injected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(source.to_string());
    }
}

pub struct Session {
    peer: Arc<ObjectPeer>,
    backend: Arc<MemoryBackend>,
    injector: Arc<ConsoleInjector>,
    host: ScriptHost,
    options: ScriptOptions,
    seen_logs: usize,
}

impl Session {
    /// Start a session against a demo peer built from `tree`.
    pub fn new(tree: Value, options: ScriptOptions) -> Result<Self> {
        let peer = Arc::new(demo_peer(tree)?);
        let channel = Arc::new(LoopbackChannel::new(peer.clone()));
        let backend = Arc::new(MemoryBackend::new());
        let injector = Arc::new(ConsoleInjector::default());
        let host = ScriptHost::new(Dispatcher::new(channel), backend.clone(), injector.clone());
        Ok(Self {
            peer,
            backend,
            injector,
            host,
            options,
            seen_logs: 0,
        })
    }

    pub fn options(&self) -> ScriptOptions {
        self.options
    }

    pub async fn execute(&self, code: &str) -> ExecutionOutcome {
        self.host.execute(code, self.options).await
    }

    /// Log entries the peer received since the last call.
    pub async fn new_logs(&mut self) -> Vec<Value> {
        tokio::time::sleep(LOG_SETTLE).await;
        let logs = self.peer.logs();
        let fresh = logs.get(self.seen_logs..).unwrap_or_default().to_vec();
        self.seen_logs = logs.len();
        fresh
    }

    /// The scratch `data` table as JSON.
    pub fn data(&self) -> Result<Value> {
        Ok(self.host.data_snapshot()?)
    }

    /// Both areas of the script storage, without the namespace prefix.
    pub async fn storage(&self) -> Result<Value> {
        let manager = self.host.storage()?;
        let mut areas = serde_json::Map::new();
        for name in [AreaName::Local, AreaName::Sync] {
            let items = manager
                .area(name)
                .get(Keys::All)
                .await
                .map_err(ScriptError::from)?;
            areas.insert(name.as_str().to_string(), Value::Object(items.into_iter().collect()));
        }
        Ok(Value::Object(areas))
    }

    /// Every key of the backend, prefixes included.
    pub fn raw_storage(&self) -> Value {
        let mut areas = serde_json::Map::new();
        for name in [AreaName::Local, AreaName::Sync] {
            let items = self.backend.memory_area(name).snapshot();
            areas.insert(name.as_str().to_string(), Value::Object(items.into_iter().collect()));
        }
        Value::Object(areas)
    }

    /// The peer's object tree as a property read would return it.
    pub fn objects(&self) -> Value {
        self.peer.snapshot()
    }

    pub fn injected(&self) -> Vec<String> {
        self.injector.injected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(flavor = "multi_thread")]
    async fn state_carries_over_between_executions() {
        let mut session = Session::new(json!({}), ScriptOptions::default()).unwrap();
        assert!(session.execute("data.n = 1").await.is_completed());
        assert!(session.execute("data.n = data.n + 1 log(data.n)").await.is_completed());
        assert_eq!(session.data().unwrap(), json!({"n": 2}));
        assert_eq!(session.new_logs().await, vec![json!(2)]);
        assert!(session.new_logs().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn storage_views() {
        let session = Session::new(json!({}), ScriptOptions::default()).unwrap();
        session.execute(r#"storage.sync.set({ theme = "dark" })"#).await;
        assert_eq!(
            session.storage().await.unwrap(),
            json!({"local": {}, "sync": {"theme": "dark"}})
        );
        assert_eq!(
            session.raw_storage(),
            json!({"local": {}, "sync": {"script_theme": "dark"}})
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn builtins_are_callable() {
        let mut session = Session::new(json!({"name": "demo"}), ScriptOptions::default()).unwrap();
        let outcome = session
            .execute(
                r#"
                log(call("echo", 1, "two"))
                call("timer.after", 5, function(ms) data.fired = ms end)
                inject("alert(1)")
                "#,
            )
            .await;
        assert!(outcome.is_completed(), "{outcome:?}");
        assert_eq!(session.new_logs().await, vec![json!([1, "two"])]);
        assert_eq!(session.injected(), vec!["alert(1)".to_string()]);

        for _ in 0..100 {
            if session.data().unwrap()["fired"] == json!(5) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("timer callback never ran");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn objects_leave_out_functions() {
        let session = Session::new(json!({"name": "demo"}), ScriptOptions::default()).unwrap();
        assert_eq!(session.objects(), json!({"name": "demo", "timer": {}}));
    }
}
