//! A peer that serves a tree of host objects.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use peerlink_wire::{
    Message, Peer, RemoteOperationRequest, RemoteOperationResponse, ReplySender, RequestKind,
};
use serde_json::{json, Value};

use crate::error::{PeerError, Result};
use crate::property::{describe_all, CallbackSink, HostProperty, Properties};

/// Answers the wire protocol from an in-memory object tree.
///
/// - `getExtensionProperties` describes the tree.
/// - `backgroundoperation` resolves the dotted property path and reads,
///   writes or calls it. Calls that carry callback arguments get no result
///   reply; their reply stream is left to the function's [`CallbackSink`].
/// - `log` is traced and recorded.
#[derive(Debug, Default)]
pub struct ObjectPeer {
    root: Mutex<Properties>,
    logs: Mutex<Vec<Value>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ObjectPeer {
    pub fn new(root: Properties) -> Self {
        Self {
            root: Mutex::new(root),
            logs: Mutex::default(),
        }
    }

    /// Build a peer whose tree is a JSON object of plain values.
    pub fn from_json(tree: Value) -> Result<Self> {
        match HostProperty::from_json(tree) {
            HostProperty::Object(root) => Ok(Self::new(root)),
            _ => Err(PeerError::InvalidTree),
        }
    }

    /// Add or replace a property at a dotted path. Missing intermediate
    /// objects are created.
    pub fn insert(&self, path: &str, property: HostProperty) -> Result<()> {
        let mut root = lock(&self.root);
        let (parent, name) = split_path(path);
        let mut properties: &mut Properties = &mut root;
        if let Some(parent) = parent {
            for segment in parent.split('.') {
                let entry = properties
                    .entry(segment.to_string())
                    .or_insert_with(|| HostProperty::Object(Properties::new()));
                properties = match entry {
                    HostProperty::Object(children) => children,
                    _ => return Err(PeerError::NotAnObject(segment.to_string())),
                };
            }
        }
        properties.insert(name.to_string(), property);
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(self, path: &str, property: HostProperty) -> Result<Self> {
        self.insert(path, property)?;
        Ok(self)
    }

    /// Values received through `log`, oldest first.
    pub fn logs(&self) -> Vec<Value> {
        lock(&self.logs).clone()
    }

    /// Current JSON value at a dotted path.
    pub fn value_at(&self, path: &str) -> Option<Value> {
        let root = lock(&self.root);
        resolve(&root, path).ok().map(HostProperty::to_json)
    }

    /// JSON form of the whole tree. Functions are left out.
    pub fn snapshot(&self) -> Value {
        HostProperty::Object(lock(&self.root).clone()).to_json()
    }

    fn read(&self, path: &str) -> Result<Value> {
        let root = lock(&self.root);
        resolve(&root, path).map(HostProperty::to_json)
    }

    fn write(&self, path: &str, value: Value) -> Result<()> {
        let mut root = lock(&self.root);
        let (parent, name) = split_path(path);
        let properties = match parent {
            None => &mut *root,
            Some(parent) => match resolve_mut(&mut root, parent)? {
                HostProperty::Object(children) => children,
                _ => return Err(PeerError::NotAnObject(parent.to_string())),
            },
        };
        properties.insert(name.to_string(), HostProperty::Value(value));
        Ok(())
    }

    fn perform(&self, request: RemoteOperationRequest, reply: &ReplySender) {
        let property = request.property.clone();
        let outcome = match request.kind() {
            RequestKind::PropertyAccess => self.read(&property).map_err(PeerError::into_payload),
            RequestKind::PropertySet => {
                let value = request.args.into_iter().next().unwrap_or(Value::Null);
                self.write(&property, value)
                    .map(|()| Value::Null)
                    .map_err(PeerError::into_payload)
            }
            RequestKind::FunctionCall => {
                let function = {
                    let root = lock(&self.root);
                    match resolve(&root, &property) {
                        Ok(HostProperty::Function(function)) => Ok(function.clone()),
                        Ok(_) => Err(PeerError::NotCallable(property.clone())),
                        Err(error) => Err(error),
                    }
                };
                match function {
                    Ok(function) => {
                        let sink = CallbackSink::new(reply.clone(), request.function_args);
                        let has_callbacks = sink.has_callbacks();
                        let result = function.call(request.args, sink);
                        if has_callbacks && result.is_ok() {
                            tracing::debug!(%property, "reply reserved for callback invocations");
                            return;
                        }
                        result
                    }
                    Err(error) => Err(error.into_payload()),
                }
            }
        };

        let response = match outcome {
            Ok(value) => RemoteOperationResponse::Result(value),
            Err(error) => {
                tracing::debug!(%property, %error, "operation failed");
                RemoteOperationResponse::Failure(error)
            }
        };
        reply.send(response.into_reply());
    }
}

impl PeerError {
    fn into_payload(self) -> Value {
        Value::String(self.to_string())
    }
}

#[async_trait]
impl Peer for ObjectPeer {
    async fn handle(&self, message: Message, reply: ReplySender) {
        match message {
            Message::GetProperties => {
                let descriptors = describe_all(&lock(&self.root));
                reply.send(json!({ "extensionObjects": descriptors }));
            }
            Message::Operation(request) => self.perform(request, &reply),
            Message::Log { value } => {
                tracing::info!(target: "peerlink::peer", %value, "log");
                lock(&self.logs).push(value);
            }
        }
    }
}

fn split_path(path: &str) -> (Option<&str>, &str) {
    match path.rsplit_once('.') {
        Some((parent, name)) => (Some(parent), name),
        None => (None, path),
    }
}

fn resolve<'a>(root: &'a Properties, path: &str) -> Result<&'a HostProperty> {
    let mut segments = path.split('.');
    let first = segments.next().unwrap_or_default();
    let mut node = root
        .get(first)
        .ok_or_else(|| PeerError::NotFound(path.to_string()))?;
    for segment in segments {
        node = match node {
            HostProperty::Object(children) => children
                .get(segment)
                .ok_or_else(|| PeerError::NotFound(path.to_string()))?,
            _ => return Err(PeerError::NotFound(path.to_string())),
        };
    }
    Ok(node)
}

fn resolve_mut<'a>(root: &'a mut Properties, path: &str) -> Result<&'a mut HostProperty> {
    let mut segments = path.split('.');
    let first = segments.next().unwrap_or_default();
    let mut node = root
        .get_mut(first)
        .ok_or_else(|| PeerError::NotFound(path.to_string()))?;
    for segment in segments {
        node = match node {
            HostProperty::Object(children) => children
                .get_mut(segment)
                .ok_or_else(|| PeerError::NotFound(path.to_string()))?,
            _ => return Err(PeerError::NotFound(path.to_string())),
        };
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerlink_wire::{reply_pair, DescriptorKind, PeerPropertyDescriptor};

    fn peer() -> ObjectPeer {
        ObjectPeer::from_json(json!({
            "version": "1.0",
            "settings": { "theme": "dark", "size": 3 }
        }))
        .unwrap()
        .with(
            "math.add",
            HostProperty::function(|args, _| {
                let sum: f64 = args.iter().filter_map(Value::as_f64).sum();
                Ok(json!(sum))
            }),
        )
        .unwrap()
        .with("fail", HostProperty::function(|_, _| Err(json!("boom"))))
        .unwrap()
        .with(
            "repeat",
            HostProperty::function(|args, sink| {
                let times = args.first().and_then(Value::as_u64).unwrap_or(0);
                for i in 0..times {
                    sink.invoke(1, vec![json!(i)]);
                }
                Ok(Value::Null)
            }),
        )
        .unwrap()
    }

    async fn ask(peer: &ObjectPeer, message: Message) -> Vec<Value> {
        let (sender, mut replies) = reply_pair();
        peer.handle(message, sender).await;
        let mut out = Vec::new();
        while let Some(Ok(reply)) = replies.next().await {
            out.push(reply);
        }
        out
    }

    #[tokio::test]
    async fn describes_tree() {
        let replies = ask(&peer(), Message::GetProperties).await;
        let descriptors: Vec<PeerPropertyDescriptor> =
            serde_json::from_value(replies[0]["extensionObjects"].clone()).unwrap();
        let names: Vec<&str> = descriptors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["fail", "math", "repeat", "settings", "version"]);
        assert_eq!(descriptors[1].children()[0].kind, DescriptorKind::Function);
        assert_eq!(descriptors[4].kind, DescriptorKind::Value);
    }

    #[tokio::test]
    async fn reads_and_writes() {
        let peer = peer();
        let read = ask(
            &peer,
            Message::Operation(RemoteOperationRequest::get("settings.theme")),
        )
        .await;
        assert_eq!(read, vec![json!({"result": "dark"})]);

        let write = ask(
            &peer,
            Message::Operation(RemoteOperationRequest::set("settings.theme", json!("light"))),
        )
        .await;
        assert_eq!(write, vec![json!({"result": null})]);
        assert_eq!(peer.value_at("settings.theme"), Some(json!("light")));
        assert_eq!(peer.value_at("settings"), Some(json!({"theme": "light", "size": 3})));
    }

    #[tokio::test]
    async fn calls_and_failures() {
        let peer = peer();
        let sum = ask(
            &peer,
            Message::Operation(RemoteOperationRequest::call("math.add", vec![json!(2), json!(3)])),
        )
        .await;
        assert_eq!(sum, vec![json!({"result": 5.0})]);

        let failed = ask(
            &peer,
            Message::Operation(RemoteOperationRequest::call("fail", vec![])),
        )
        .await;
        assert_eq!(failed, vec![json!({"error": "boom"})]);

        let missing = ask(
            &peer,
            Message::Operation(RemoteOperationRequest::call("nope.nothing", vec![])),
        )
        .await;
        assert_eq!(
            missing,
            vec![json!({"error": "property not found: nope.nothing"})]
        );

        let not_callable = ask(
            &peer,
            Message::Operation(RemoteOperationRequest::call("version", vec![])),
        )
        .await;
        assert_eq!(not_callable, vec![json!({"error": "version is not a function"})]);
    }

    #[tokio::test]
    async fn callback_calls_stream_invocations_only() {
        let mut request = RemoteOperationRequest::call("repeat", vec![json!(2), Value::Null]);
        request.function_args = vec![1];
        let replies = ask(&peer(), Message::Operation(request)).await;
        assert_eq!(
            replies,
            vec![
                json!({"calledArg": 1, "args": [0]}),
                json!({"calledArg": 1, "args": [1]}),
            ]
        );
    }

    #[tokio::test]
    async fn sink_refuses_non_callback_positions() {
        let (sender, _replies) = reply_pair();
        let sink = CallbackSink::new(sender, vec![2]);
        assert!(!sink.invoke(0, vec![]));
        assert!(sink.invoke(2, vec![]));
    }

    #[tokio::test]
    async fn logs_are_recorded() {
        let peer = peer();
        let replies = ask(&peer, Message::Log { value: json!("hi") }).await;
        assert!(replies.is_empty());
        assert_eq!(peer.logs(), vec![json!("hi")]);
    }

    #[test]
    fn non_object_tree_rejected() {
        assert_eq!(
            ObjectPeer::from_json(json!([1, 2])).unwrap_err(),
            PeerError::InvalidTree
        );
    }

    #[test]
    fn insert_through_value_fails() {
        let peer = peer();
        assert_eq!(
            peer.insert("version.inner", HostProperty::Value(json!(1))),
            Err(PeerError::NotAnObject("version".into()))
        );
    }

    #[test]
    fn snapshot_leaves_out_functions() {
        assert_eq!(
            peer().snapshot(),
            json!({
                "math": {},
                "settings": { "theme": "dark", "size": 3 },
                "version": "1.0"
            })
        );
    }
}
