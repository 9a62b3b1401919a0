//! Arguments of a remote operation.

use std::sync::Arc;

use serde_json::Value;

/// A local function the peer may invoke later with its own arguments.
pub type Callback = Arc<dyn Fn(Vec<Value>) + Send + Sync>;

/// One argument of a remote call: a marshaled value or a callback.
#[derive(Clone)]
pub enum Argument {
    Value(Value),
    Callback(Callback),
}

impl Argument {
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(Vec<Value>) + Send + Sync + 'static,
    {
        Argument::Callback(Arc::new(f))
    }

    pub fn is_callback(&self) -> bool {
        matches!(self, Argument::Callback(_))
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Argument::Value(value)
    }
}

impl std::fmt::Debug for Argument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Argument::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Argument::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}
