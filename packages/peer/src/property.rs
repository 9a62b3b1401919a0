//! The host object tree.

use std::collections::BTreeMap;
use std::sync::Arc;

use peerlink_wire::{PeerPropertyDescriptor, ReplySender, RemoteOperationResponse};
use serde_json::{Map, Value};

/// Properties of a host object, by name.
pub type Properties = BTreeMap<String, HostProperty>;

type HostFn = dyn Fn(Vec<Value>, CallbackSink) -> Result<Value, Value> + Send + Sync;

/// A function exposed to the page side.
///
/// It receives the call's arguments (callback arguments arrive as `null`)
/// and a [`CallbackSink`] for invoking them. `Err` is sent back as the
/// operation's error payload.
#[derive(Clone)]
pub struct HostFunction(Arc<HostFn>);

impl HostFunction {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Vec<Value>, CallbackSink) -> Result<Value, Value> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, args: Vec<Value>, sink: CallbackSink) -> Result<Value, Value> {
        (self.0)(args, sink)
    }
}

impl std::fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HostFunction(..)")
    }
}

/// Invokes the callback arguments of one function call.
///
/// May be cloned and kept for as long as the function wants to keep calling
/// back; the request stays open until every clone is dropped.
#[derive(Debug, Clone)]
pub struct CallbackSink {
    reply: ReplySender,
    indices: Vec<usize>,
}

impl CallbackSink {
    pub(crate) fn new(reply: ReplySender, indices: Vec<usize>) -> Self {
        Self { reply, indices }
    }

    /// Argument positions that hold callbacks.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn has_callbacks(&self) -> bool {
        !self.indices.is_empty()
    }

    /// Invoke the callback at argument position `index`.
    ///
    /// Returns `false` if that argument is not a callback or the page side
    /// has stopped listening.
    pub fn invoke(&self, index: usize, args: Vec<Value>) -> bool {
        if !self.indices.contains(&index) {
            return false;
        }
        self.reply
            .send(RemoteOperationResponse::CallbackInvocation { index, args }.into_reply())
    }
}

/// A node of the host object tree.
#[derive(Debug, Clone)]
pub enum HostProperty {
    Value(Value),
    Function(HostFunction),
    Object(Properties),
}

impl HostProperty {
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(Vec<Value>, CallbackSink) -> Result<Value, Value> + Send + Sync + 'static,
    {
        HostProperty::Function(HostFunction::new(f))
    }

    /// Convert JSON into a tree: objects become [`HostProperty::Object`],
    /// everything else a value.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => HostProperty::Object(
                map.into_iter()
                    .map(|(name, value)| (name, HostProperty::from_json(value)))
                    .collect(),
            ),
            other => HostProperty::Value(other),
        }
    }

    /// JSON form of the node, as a property read returns it. Functions have
    /// no JSON form and read as `null`; inside objects they are left out.
    pub fn to_json(&self) -> Value {
        match self {
            HostProperty::Value(value) => value.clone(),
            HostProperty::Function(_) => Value::Null,
            HostProperty::Object(properties) => {
                let map: Map<String, Value> = properties
                    .iter()
                    .filter(|(_, property)| !matches!(property, HostProperty::Function(_)))
                    .map(|(name, property)| (name.clone(), property.to_json()))
                    .collect();
                Value::Object(map)
            }
        }
    }

    /// Describe this node under `name`.
    pub fn describe(&self, name: &str) -> PeerPropertyDescriptor {
        match self {
            HostProperty::Value(_) => PeerPropertyDescriptor::value(name),
            HostProperty::Function(_) => PeerPropertyDescriptor::function(name),
            HostProperty::Object(properties) => {
                PeerPropertyDescriptor::object(name, describe_all(properties))
            }
        }
    }
}

/// Describe every property of an object, in name order.
pub fn describe_all(properties: &Properties) -> Vec<PeerPropertyDescriptor> {
    properties
        .iter()
        .map(|(name, property)| property.describe(name))
        .collect()
}
