//! Descriptions of the peer's object graph.

use serde::{Deserialize, Serialize};

/// One node in the description of the peer's exposed objects.
///
/// On the wire a node is `{"name": .., "type": .., "properties": [..]}`.
/// `type` is `"object"` or `"function"`; any other type names a plain value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerPropertyDescriptor {
    pub name: String,

    #[serde(flatten)]
    pub kind: DescriptorKind,
}

/// Kind of a [`PeerPropertyDescriptor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DescriptorKind {
    /// A nested object with its own properties.
    Object {
        #[serde(default)]
        properties: Vec<PeerPropertyDescriptor>,
    },

    /// A callable property.
    Function,

    /// A readable value.
    #[serde(other)]
    Value,
}

impl PeerPropertyDescriptor {
    pub fn value(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DescriptorKind::Value,
        }
    }

    pub fn function(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DescriptorKind::Function,
        }
    }

    pub fn object(name: impl Into<String>, properties: Vec<PeerPropertyDescriptor>) -> Self {
        Self {
            name: name.into(),
            kind: DescriptorKind::Object { properties },
        }
    }

    /// Children of an object node; empty for values and functions.
    pub fn children(&self) -> &[PeerPropertyDescriptor] {
        match &self.kind {
            DescriptorKind::Object { properties } => properties,
            _ => &[],
        }
    }
}

/// Reply to a [`crate::Message::GetProperties`] request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertiesReply {
    #[serde(rename = "extensionObjects")]
    pub extension_objects: Vec<PeerPropertyDescriptor>,
}
