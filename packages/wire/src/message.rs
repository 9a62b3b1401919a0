//! Messages sent from the page side to the peer, and the replies that come
//! back.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Operation field of a [`RemoteOperationRequest`] as it appears on the wire.
///
/// Property reads and writes share `propertyAccess`; a write is a property
/// access that carries exactly one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    FunctionCall,
    PropertyAccess,
}

/// What a request actually asks the peer to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    FunctionCall,
    PropertyAccess,
    PropertySet,
}

/// A call, read or write of a property on the peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteOperationRequest {
    /// Dotted path of the property on the peer, e.g. `tabs.query`.
    pub property: String,

    pub operation: OperationKind,

    /// Arguments. Callback arguments are sent as `null` placeholders.
    #[serde(default)]
    pub args: Vec<Value>,

    /// Positions in `args` that were callbacks on the page side.
    #[serde(default, rename = "functionArgs")]
    pub function_args: Vec<usize>,
}

impl RemoteOperationRequest {
    /// Build a function call request without callback arguments.
    pub fn call(property: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            property: property.into(),
            operation: OperationKind::FunctionCall,
            args,
            function_args: Vec::new(),
        }
    }

    /// Build a property read request.
    pub fn get(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            operation: OperationKind::PropertyAccess,
            args: Vec::new(),
            function_args: Vec::new(),
        }
    }

    /// Build a property write request.
    pub fn set(property: impl Into<String>, value: Value) -> Self {
        Self {
            property: property.into(),
            operation: OperationKind::PropertyAccess,
            args: vec![value],
            function_args: Vec::new(),
        }
    }

    /// Classify the request.
    pub fn kind(&self) -> RequestKind {
        match self.operation {
            OperationKind::FunctionCall => RequestKind::FunctionCall,
            OperationKind::PropertyAccess if self.args.is_empty() => RequestKind::PropertyAccess,
            OperationKind::PropertyAccess => RequestKind::PropertySet,
        }
    }

    /// Check whether the argument at `index` was a callback.
    pub fn is_callback_argument(&self, index: usize) -> bool {
        self.function_args.contains(&index)
    }
}

/// A message from the page side to the peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Message {
    /// Call, read or write a property.
    #[serde(rename = "backgroundoperation")]
    Operation(RemoteOperationRequest),

    /// Ask for the descriptor forest of the peer's exposed objects.
    #[serde(rename = "getExtensionProperties")]
    GetProperties,

    /// Log a value on the peer. Fire-and-forget.
    #[serde(rename = "log")]
    Log { value: Value },
}

impl Message {
    /// Wire name of the message's action.
    pub fn action(&self) -> &'static str {
        match self {
            Message::Operation(_) => "backgroundoperation",
            Message::GetProperties => "getExtensionProperties",
            Message::Log { .. } => "log",
        }
    }
}

/// A reply to a [`RemoteOperationRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOperationResponse {
    /// The operation succeeded with this value.
    Result(Value),

    /// The peer failed to perform the operation.
    Failure(Value),

    /// The peer invoked the callback argument at `index`.
    CallbackInvocation { index: usize, args: Vec<Value> },
}

#[derive(Debug, Default, Deserialize)]
struct ReplyFields {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default, rename = "calledArg")]
    called_arg: Option<usize>,
    #[serde(default)]
    args: Option<Vec<Value>>,
}

impl RemoteOperationResponse {
    /// Interpret a raw reply.
    ///
    /// `{calledArg, args}` is a callback invocation, a non-null `error` is a
    /// failure, and anything else resolves with `result` (`null` if absent).
    /// Returns `None` if the reply is not an object.
    pub fn from_reply(reply: &Value) -> Option<Self> {
        if !reply.is_object() {
            return None;
        }
        let fields: ReplyFields = serde_json::from_value(reply.clone()).ok()?;

        if let (Some(index), Some(args)) = (fields.called_arg, fields.args) {
            return Some(Self::CallbackInvocation { index, args });
        }
        match fields.error {
            Some(error) if !error.is_null() => Some(Self::Failure(error)),
            _ => Some(Self::Result(fields.result.unwrap_or(Value::Null))),
        }
    }

    /// Encode as the raw reply the peer sends.
    pub fn into_reply(self) -> Value {
        let mut map = Map::new();
        match self {
            Self::Result(value) => {
                map.insert("result".into(), value);
            }
            Self::Failure(error) => {
                map.insert("error".into(), error);
            }
            Self::CallbackInvocation { index, args } => {
                map.insert("calledArg".into(), Value::from(index));
                map.insert("args".into(), Value::Array(args));
            }
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn operation_message_wire_shape() {
        let message = Message::Operation(RemoteOperationRequest {
            property: "tabs.query".into(),
            operation: OperationKind::FunctionCall,
            args: vec![json!({"active": true}), Value::Null],
            function_args: vec![1],
        });

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "action": "backgroundoperation",
                "property": "tabs.query",
                "operation": "functionCall",
                "args": [{"active": true}, null],
                "functionArgs": [1]
            })
        );
    }

    #[test]
    fn control_messages_wire_shape() {
        assert_eq!(
            serde_json::to_value(Message::GetProperties).unwrap(),
            json!({"action": "getExtensionProperties"})
        );
        assert_eq!(
            serde_json::to_value(Message::Log { value: json!("hi") }).unwrap(),
            json!({"action": "log", "value": "hi"})
        );
    }

    #[test]
    fn parse_incoming_operation() {
        let message: Message = serde_json::from_value(json!({
            "action": "backgroundoperation",
            "property": "settings.theme",
            "operation": "propertyAccess",
            "args": ["dark"]
        }))
        .unwrap();

        match message {
            Message::Operation(request) => {
                assert_eq!(request.kind(), RequestKind::PropertySet);
                assert!(request.function_args.is_empty());
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn request_kinds() {
        assert_eq!(RemoteOperationRequest::get("a").kind(), RequestKind::PropertyAccess);
        assert_eq!(
            RemoteOperationRequest::set("a", json!(1)).kind(),
            RequestKind::PropertySet
        );
        assert_eq!(
            RemoteOperationRequest::call("a", vec![]).kind(),
            RequestKind::FunctionCall
        );
    }

    #[test]
    fn reply_interpretation() {
        assert_eq!(
            RemoteOperationResponse::from_reply(&json!({"result": 42})),
            Some(RemoteOperationResponse::Result(json!(42)))
        );
        assert_eq!(
            RemoteOperationResponse::from_reply(&json!({"error": "boom"})),
            Some(RemoteOperationResponse::Failure(json!("boom")))
        );
        assert_eq!(
            RemoteOperationResponse::from_reply(&json!({"calledArg": 0, "args": ["fired"]})),
            Some(RemoteOperationResponse::CallbackInvocation {
                index: 0,
                args: vec![json!("fired")]
            })
        );
    }

    #[test]
    fn null_error_is_not_a_failure() {
        assert_eq!(
            RemoteOperationResponse::from_reply(&json!({"error": null, "result": "ok"})),
            Some(RemoteOperationResponse::Result(json!("ok")))
        );
        assert_eq!(
            RemoteOperationResponse::from_reply(&json!({})),
            Some(RemoteOperationResponse::Result(Value::Null))
        );
    }

    #[test]
    fn non_object_reply_is_rejected() {
        assert_eq!(RemoteOperationResponse::from_reply(&json!(42)), None);
        assert_eq!(RemoteOperationResponse::from_reply(&Value::Null), None);
    }

    #[test]
    fn reply_encoding() {
        let reply = RemoteOperationResponse::CallbackInvocation {
            index: 2,
            args: vec![json!(1)],
        }
        .into_reply();
        assert_eq!(reply, json!({"calledArg": 2, "args": [1]}));
    }
}
