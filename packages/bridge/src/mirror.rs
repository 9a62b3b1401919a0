//! Local proxies for the peer's object graph.
//!
//! A [`Mirror`] is built from the descriptor forest the peer reports. Each
//! node becomes a [`MirrorNode`] that knows its dotted path on the peer:
//!
//! ```text
//! [{name: "tabs", type: "object", properties: [      mirror.root()
//!     {name: "query", type: "function"},                └─ tabs         Object("tabs")
//!     {name: "count", type: "number"}]}]                    ├─ query    Function("tabs.query")
//!                                                           └─ count    Value("tabs.count")
//! ```
//!
//! Values are not cached: every [`RemoteValue::get`] is a fresh round trip.

use serde_json::Value;

use peerlink_wire::{DescriptorKind, PeerPropertyDescriptor};

use crate::argument::Argument;
use crate::dispatcher::Dispatcher;
use crate::error::Result;

/// A remote value, read on demand.
#[derive(Debug, Clone)]
pub struct RemoteValue {
    path: String,
    dispatcher: Dispatcher,
    allow_callback_arguments: bool,
}

impl RemoteValue {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Read the current value from the peer.
    pub async fn get(&self) -> Result<Value> {
        self.dispatcher
            .dispatch(&self.path, Vec::new(), self.allow_callback_arguments, true)
            .await
    }

    /// Write a new value on the peer.
    pub async fn set(&self, value: Value) -> Result<Value> {
        self.dispatcher
            .dispatch(
                &self.path,
                vec![Argument::Value(value)],
                self.allow_callback_arguments,
                true,
            )
            .await
    }
}

/// A remote function.
#[derive(Debug, Clone)]
pub struct RemoteFunction {
    path: String,
    dispatcher: Dispatcher,
    allow_callback_arguments: bool,
}

impl RemoteFunction {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn allows_callback_arguments(&self) -> bool {
        self.allow_callback_arguments
    }

    pub async fn call(&self, arguments: Vec<Argument>) -> Result<Value> {
        self.dispatcher
            .dispatch(&self.path, arguments, self.allow_callback_arguments, false)
            .await
    }
}

/// One mirrored property.
#[derive(Debug, Clone)]
pub enum MirrorNode {
    Value(RemoteValue),
    Function(RemoteFunction),
    Object(MirrorObject),
}

impl MirrorNode {
    pub fn path(&self) -> &str {
        match self {
            MirrorNode::Value(value) => value.path(),
            MirrorNode::Function(function) => function.path(),
            MirrorNode::Object(object) => object.path(),
        }
    }

    pub fn as_object(&self) -> Option<&MirrorObject> {
        match self {
            MirrorNode::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&RemoteFunction> {
        match self {
            MirrorNode::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&RemoteValue> {
        match self {
            MirrorNode::Value(value) => Some(value),
            _ => None,
        }
    }
}

/// A mirrored object: named properties in descriptor order.
#[derive(Debug, Clone, Default)]
pub struct MirrorObject {
    path: String,
    entries: Vec<(String, MirrorNode)>,
}

impl MirrorObject {
    /// Dotted path of the object, empty for the root.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&MirrorNode> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, node)| node)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MirrorNode)> {
        self.entries.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a node by a dotted path relative to this object.
    pub fn resolve(&self, dotted: &str) -> Option<&MirrorNode> {
        let mut segments = dotted.split('.');
        let mut node = self.get(segments.next()?)?;
        for segment in segments {
            node = node.as_object()?.get(segment)?;
        }
        Some(node)
    }

    fn insert(&mut self, name: String, node: MirrorNode) {
        // Later descriptors with the same name win, keeping the first position.
        match self.entries.iter_mut().find(|(entry, _)| *entry == name) {
            Some((_, existing)) => *existing = node,
            None => self.entries.push((name, node)),
        }
    }
}

/// The local proxy tree of the peer's exposed objects.
#[derive(Debug, Clone)]
pub struct Mirror {
    root: MirrorObject,
}

impl Mirror {
    /// Fetch the descriptor forest and build the mirror.
    pub async fn build(dispatcher: &Dispatcher, allow_callback_arguments: bool) -> Result<Self> {
        let descriptors = dispatcher.fetch_properties().await?;
        tracing::debug!(roots = descriptors.len(), "building remote object mirror");
        Ok(Self::from_descriptors(
            dispatcher,
            &descriptors,
            allow_callback_arguments,
        ))
    }

    /// Build a mirror from an already fetched descriptor forest.
    pub fn from_descriptors(
        dispatcher: &Dispatcher,
        descriptors: &[PeerPropertyDescriptor],
        allow_callback_arguments: bool,
    ) -> Self {
        let builder = Builder {
            dispatcher,
            allow_callback_arguments,
        };
        Self {
            root: builder.object(String::new(), descriptors),
        }
    }

    pub fn root(&self) -> &MirrorObject {
        &self.root
    }

    pub fn get(&self, name: &str) -> Option<&MirrorNode> {
        self.root.get(name)
    }

    pub fn resolve(&self, dotted: &str) -> Option<&MirrorNode> {
        self.root.resolve(dotted)
    }
}

struct Builder<'a> {
    dispatcher: &'a Dispatcher,
    allow_callback_arguments: bool,
}

impl Builder<'_> {
    fn object(&self, path: String, descriptors: &[PeerPropertyDescriptor]) -> MirrorObject {
        let mut object = MirrorObject {
            path,
            entries: Vec::with_capacity(descriptors.len()),
        };
        for descriptor in descriptors {
            let path = if object.path.is_empty() {
                descriptor.name.clone()
            } else {
                format!("{}.{}", object.path, descriptor.name)
            };
            let node = self.materialize(path, descriptor);
            object.insert(descriptor.name.clone(), node);
        }
        object
    }

    fn materialize(&self, path: String, descriptor: &PeerPropertyDescriptor) -> MirrorNode {
        match &descriptor.kind {
            DescriptorKind::Object { properties } => {
                MirrorNode::Object(self.object(path, properties))
            }
            DescriptorKind::Function => MirrorNode::Function(RemoteFunction {
                path,
                dispatcher: self.dispatcher.clone(),
                allow_callback_arguments: self.allow_callback_arguments,
            }),
            DescriptorKind::Value => MirrorNode::Value(RemoteValue {
                path,
                dispatcher: self.dispatcher.clone(),
                allow_callback_arguments: self.allow_callback_arguments,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerlink_wire::{Channel, Message, Replies, TransportError};
    use std::sync::Arc;

    struct NullChannel;

    impl Channel for NullChannel {
        fn send(&self, _: Message) -> std::result::Result<Replies, TransportError> {
            Err(TransportError::Disconnected)
        }

        fn post(&self, _: Message) -> std::result::Result<(), TransportError> {
            Ok(())
        }
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Arc::new(NullChannel))
    }

    fn forest() -> Vec<PeerPropertyDescriptor> {
        vec![
            PeerPropertyDescriptor::object(
                "tabs",
                vec![
                    PeerPropertyDescriptor::function("query"),
                    PeerPropertyDescriptor::value("count"),
                    PeerPropertyDescriptor::object(
                        "nested",
                        vec![PeerPropertyDescriptor::function("deep")],
                    ),
                ],
            ),
            PeerPropertyDescriptor::value("version"),
            PeerPropertyDescriptor::object("empty", vec![]),
        ]
    }

    #[test]
    fn paths_are_dotted_ancestor_chains() {
        let mirror = Mirror::from_descriptors(&dispatcher(), &forest(), true);

        assert_eq!(mirror.resolve("tabs").unwrap().path(), "tabs");
        assert_eq!(mirror.resolve("tabs.query").unwrap().path(), "tabs.query");
        assert_eq!(
            mirror.resolve("tabs.nested.deep").unwrap().path(),
            "tabs.nested.deep"
        );
        assert_eq!(mirror.resolve("version").unwrap().path(), "version");
        assert!(mirror.resolve("tabs.missing").is_none());
        assert!(mirror.resolve("version.inner").is_none());
    }

    #[test]
    fn shape_matches_descriptors() {
        let mirror = Mirror::from_descriptors(&dispatcher(), &forest(), false);
        assert_eq!(mirror.root().names(), vec!["tabs", "version", "empty"]);

        let tabs = mirror.get("tabs").unwrap().as_object().unwrap();
        assert_eq!(tabs.names(), vec!["query", "count", "nested"]);
        assert!(tabs.get("query").unwrap().as_function().is_some());
        assert!(tabs.get("count").unwrap().as_value().is_some());
        assert!(mirror.get("empty").unwrap().as_object().unwrap().is_empty());
        assert!(!tabs
            .get("query")
            .unwrap()
            .as_function()
            .unwrap()
            .allows_callback_arguments());
    }

    #[test]
    fn duplicate_names_keep_last_descriptor() {
        let descriptors = vec![
            PeerPropertyDescriptor::value("x"),
            PeerPropertyDescriptor::value("y"),
            PeerPropertyDescriptor::function("x"),
        ];
        let mirror = Mirror::from_descriptors(&dispatcher(), &descriptors, true);
        assert_eq!(mirror.root().names(), vec!["x", "y"]);
        assert!(mirror.get("x").unwrap().as_function().is_some());
    }

    #[tokio::test]
    async fn leaf_reads_go_to_the_peer() {
        let mirror = Mirror::from_descriptors(&dispatcher(), &forest(), true);
        let version = mirror.get("version").unwrap().as_value().unwrap();
        assert_eq!(
            version.get().await,
            Err(crate::DispatchError::Transport(TransportError::Disconnected))
        );
    }
}
