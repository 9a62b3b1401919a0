//! Turning local calls into remote operations.
//!
//! [`Dispatcher::dispatch`] builds a [`RemoteOperationRequest`], sends it over
//! the channel and resolves from the reply. Requests that carry callback
//! arguments resolve immediately with `null`; their reply stream is handed
//! to a background task that invokes the callbacks whenever the peer asks.

use std::collections::BTreeMap;
use std::sync::Arc;

use peerlink_wire::{
    Channel, Message, OperationKind, PeerPropertyDescriptor, PropertiesReply,
    RemoteOperationRequest, RemoteOperationResponse, Replies, TransportError,
};
use serde_json::Value;

use crate::argument::{Argument, Callback};
use crate::error::{DispatchError, Result};

/// Sends remote operations over a channel.
///
/// Holds no state besides the channel; cloning is cheap.
#[derive(Clone)]
pub struct Dispatcher {
    channel: Arc<dyn Channel>,
}

impl Dispatcher {
    pub fn new(channel: Arc<dyn Channel>) -> Self {
        Self { channel }
    }

    pub fn channel(&self) -> &Arc<dyn Channel> {
        &self.channel
    }

    /// Perform a function call, property read or property write on the peer.
    ///
    /// A property access with arguments is a write and only its first
    /// argument is sent. Callback arguments are replaced by `null` on the
    /// wire; when `allow_callback_arguments` is set they are kept locally and
    /// invoked for every callback invocation the peer sends, otherwise they
    /// are dropped.
    pub async fn dispatch(
        &self,
        property: &str,
        mut arguments: Vec<Argument>,
        allow_callback_arguments: bool,
        is_property_access: bool,
    ) -> Result<Value> {
        if is_property_access {
            arguments.truncate(1);
        }

        let mut args = Vec::with_capacity(arguments.len());
        let mut callbacks = CallbackTable::default();
        for (index, argument) in arguments.into_iter().enumerate() {
            match argument {
                Argument::Value(value) => args.push(value),
                Argument::Callback(callback) => {
                    args.push(Value::Null);
                    if allow_callback_arguments {
                        callbacks.insert(index, callback);
                    } else {
                        tracing::debug!(property, index, "dropping callback argument");
                    }
                }
            }
        }

        let request = RemoteOperationRequest {
            property: property.to_string(),
            operation: if is_property_access {
                OperationKind::PropertyAccess
            } else {
                OperationKind::FunctionCall
            },
            args,
            function_args: callbacks.indices(),
        };
        tracing::debug!(
            property,
            kind = ?request.kind(),
            callbacks = request.function_args.len(),
            "dispatching remote operation"
        );

        if callbacks.is_empty() {
            let reply = self.channel.send(Message::Operation(request))?.first().await?;
            return interpret(property, &reply);
        }

        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| TransportError::NoRuntime)?;
        let replies = self.channel.send(Message::Operation(request))?;
        runtime.spawn(callbacks.pump(property.to_string(), replies));
        Ok(Value::Null)
    }

    /// Call a function without callback arguments.
    pub async fn call(&self, property: &str, args: Vec<Value>) -> Result<Value> {
        let arguments = args.into_iter().map(Argument::Value).collect();
        self.dispatch(property, arguments, false, false).await
    }

    /// Read a property.
    pub async fn get(&self, property: &str) -> Result<Value> {
        self.dispatch(property, Vec::new(), false, true).await
    }

    /// Write a property.
    pub async fn set(&self, property: &str, value: Value) -> Result<Value> {
        self.dispatch(property, vec![Argument::Value(value)], false, true)
            .await
    }

    /// Log a value on the peer. Fire-and-forget: failures are only traced.
    pub fn log(&self, value: Value) {
        if let Err(error) = self.channel.post(Message::Log { value }) {
            tracing::debug!(%error, "remote log could not be sent");
        }
    }

    /// Fetch the descriptor forest of the peer's exposed objects.
    pub async fn fetch_properties(&self) -> Result<Vec<PeerPropertyDescriptor>> {
        let reply = self.channel.send(Message::GetProperties)?.first().await?;
        let parsed: PropertiesReply = serde_json::from_value(reply)
            .map_err(|error| DispatchError::MalformedReply(error.to_string()))?;
        Ok(parsed.extension_objects)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

fn interpret(property: &str, reply: &Value) -> Result<Value> {
    match RemoteOperationResponse::from_reply(reply) {
        Some(RemoteOperationResponse::Result(value)) => Ok(value),
        Some(RemoteOperationResponse::Failure(error)) => Err(DispatchError::Remote(error)),
        Some(RemoteOperationResponse::CallbackInvocation { index, .. }) => {
            tracing::debug!(property, index, "callback invocation on a request without callbacks");
            Ok(Value::Null)
        }
        None => Err(DispatchError::MalformedReply(format!(
            "expected an object, got {reply}"
        ))),
    }
}

/// Callbacks of one request, by argument position.
#[derive(Default)]
struct CallbackTable {
    callbacks: BTreeMap<usize, Callback>,
}

impl CallbackTable {
    fn insert(&mut self, index: usize, callback: Callback) {
        self.callbacks.insert(index, callback);
    }

    fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    fn indices(&self) -> Vec<usize> {
        self.callbacks.keys().copied().collect()
    }

    /// Serve callback invocations until the peer closes the request.
    async fn pump(self, property: String, mut replies: Replies) {
        while let Some(item) = replies.next().await {
            let reply = match item {
                Ok(reply) => reply,
                Err(error) => {
                    tracing::debug!(%property, %error, "callback request failed");
                    continue;
                }
            };
            match RemoteOperationResponse::from_reply(&reply) {
                Some(RemoteOperationResponse::CallbackInvocation { index, args }) => {
                    match self.callbacks.get(&index) {
                        Some(callback) => {
                            tracing::trace!(%property, index, "invoking callback argument");
                            callback(args);
                        }
                        None => {
                            tracing::debug!(%property, index, "ignoring unknown callback index")
                        }
                    }
                }
                other => tracing::trace!(%property, reply = ?other, "ignoring reply"),
            }
        }
        tracing::trace!(%property, "callback request closed");
    }
}
