//! Key/value storage areas.
//!
//! Mirrors the `chrome.storage.<area>` object shape: reads take an optional
//! list of keys and answer with an object of the entries found, writes take
//! an object of entries.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

use crate::{Effect, HostError};

/// A `chrome.storage` area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageArea {
    /// Ephemeral; cleared when the browser session ends.
    Session,
    /// Durable; persisted across restarts.
    Local,
    /// Read-only administrator policy.
    Managed,
}

impl StorageArea {
    /// The area's name under `chrome.storage`.
    pub fn name(&self) -> &'static str {
        match self {
            StorageArea::Session => "session",
            StorageArea::Local => "local",
            StorageArea::Managed => "managed",
        }
    }
}

impl Display for StorageArea {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "chrome.storage.{}", self.name())
    }
}

/// `chrome.storage.<area>.get`
#[derive(Debug, Clone, PartialEq)]
pub struct Get {
    /// The area to read from.
    pub area: StorageArea,
    /// Keys to read; `None` reads every entry.
    pub keys: Option<Vec<String>>,
}

impl Get {
    /// Read a single key.
    pub fn key(area: StorageArea, key: impl Into<String>) -> Self {
        Self {
            area,
            keys: Some(vec![key.into()]),
        }
    }

    /// Read the given keys, or everything when `keys` is `None`.
    pub fn keys(area: StorageArea, keys: Option<Vec<String>>) -> Self {
        Self { area, keys }
    }
}

impl Effect for Get {
    type Output = Result<Map<String, Value>, HostError>;
}

/// `chrome.storage.<area>.set`
#[derive(Debug, Clone, PartialEq)]
pub struct Set {
    /// The area to write to.
    pub area: StorageArea,
    /// Entries to write.
    pub items: Map<String, Value>,
}

impl Set {
    /// Write a single entry.
    pub fn entry(area: StorageArea, key: impl Into<String>, value: Value) -> Self {
        let mut items = Map::new();
        items.insert(key.into(), value);
        Self { area, items }
    }
}

impl Effect for Set {
    type Output = Result<(), HostError>;
}
