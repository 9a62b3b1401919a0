//! Key prefixing for namespaced storage.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::backend::Items;
use crate::error::{Result, StorageError};

/// Which keys an operation addresses.
#[derive(Debug, Clone, PartialEq)]
pub enum Keys {
    /// Every key (the `null` form).
    All,

    /// A single key.
    One(String),

    /// A list of keys.
    Many(Vec<String>),

    /// Keys with default values to return when absent.
    Defaults(Items),
}

impl Keys {
    pub fn is_all(&self) -> bool {
        matches!(self, Keys::All)
    }

    /// The explicit keys named, in order. Empty for [`Keys::All`].
    pub fn names(&self) -> Vec<String> {
        match self {
            Keys::All => Vec::new(),
            Keys::One(key) => vec![key.clone()],
            Keys::Many(keys) => keys.clone(),
            Keys::Defaults(items) => items.keys().cloned().collect(),
        }
    }
}

impl From<&str> for Keys {
    fn from(key: &str) -> Self {
        Keys::One(key.to_string())
    }
}

impl From<String> for Keys {
    fn from(key: String) -> Self {
        Keys::One(key)
    }
}

impl From<Vec<String>> for Keys {
    fn from(keys: Vec<String>) -> Self {
        Keys::Many(keys)
    }
}

impl From<Vec<&str>> for Keys {
    fn from(keys: Vec<&str>) -> Self {
        Keys::Many(keys.into_iter().map(String::from).collect())
    }
}

impl From<Items> for Keys {
    fn from(defaults: Items) -> Self {
        Keys::Defaults(defaults)
    }
}

impl From<Option<Keys>> for Keys {
    fn from(keys: Option<Keys>) -> Self {
        keys.unwrap_or(Keys::All)
    }
}

/// A namespace prefix. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPrefix(Arc<str>);

impl KeyPrefix {
    pub fn new(prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        if prefix.is_empty() {
            return Err(StorageError::InvalidPrefix(prefix));
        }
        Ok(Self(prefix.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix a key. The empty key is left alone.
    pub fn apply(&self, key: &str) -> String {
        if key.is_empty() {
            String::new()
        } else {
            format!("{}{}", self.0, key)
        }
    }

    /// Strip the prefix from a key in this namespace.
    ///
    /// Returns `None` for keys outside the namespace and for the bare prefix
    /// itself.
    pub fn strip<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(&*self.0).filter(|rest| !rest.is_empty())
    }

    pub fn apply_keys(&self, keys: &Keys) -> Keys {
        match keys {
            Keys::All => Keys::All,
            Keys::One(key) => Keys::One(self.apply(key)),
            Keys::Many(keys) => Keys::Many(keys.iter().map(|k| self.apply(k)).collect()),
            Keys::Defaults(items) => Keys::Defaults(self.apply_map(items.clone())),
        }
    }

    /// Prefix every key of a map.
    pub fn apply_map<V>(&self, map: BTreeMap<String, V>) -> BTreeMap<String, V> {
        map.into_iter()
            .map(|(key, value)| (self.apply(&key), value))
            .collect()
    }

    /// Keep only this namespace's entries and strip their prefix.
    pub fn strip_map<V>(&self, map: BTreeMap<String, V>) -> BTreeMap<String, V> {
        map.into_iter()
            .filter_map(|(key, value)| self.strip(&key).map(|k| (k.to_string(), value)))
            .collect()
    }
}

impl std::fmt::Display for KeyPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
