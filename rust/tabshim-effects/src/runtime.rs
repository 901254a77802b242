//! Extension runtime: metadata, messaging, uninstall URL.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Effect, HostError};

/// The parts of `manifest.json` tabshim reads, plus everything else verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionManifest {
    #[allow(missing_docs)]
    pub name: String,
    #[allow(missing_docs)]
    pub version: String,
    /// `2` for the legacy platform, `3` for the capability-scoped one.
    #[serde(rename = "manifest_version")]
    pub manifest_version: u8,
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Remaining manifest keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `chrome.runtime.getManifest`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GetManifest;

impl Effect for GetManifest {
    type Output = Result<ExtensionManifest, HostError>;
}

/// `chrome.runtime.sendMessage`
///
/// Resolves to the first listener's reply, if any listener replied.
#[derive(Debug, Clone, PartialEq)]
pub struct SendMessage {
    #[allow(missing_docs)]
    pub message: Value,
}

impl Effect for SendMessage {
    type Output = Result<Option<Value>, HostError>;
}

/// `chrome.runtime.setUninstallURL`
#[derive(Debug, Clone, PartialEq)]
pub struct SetUninstallUrl {
    #[allow(missing_docs)]
    pub url: String,
}

impl Effect for SetUninstallUrl {
    type Output = Result<(), HostError>;
}
