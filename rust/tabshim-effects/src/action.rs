//! Toolbar icon.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::tabs::TabId;
use crate::{Effect, HostError};

/// Icon image path(s), relative to the extension root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IconPath {
    /// One image, scaled by the host.
    Single(String),
    /// Images keyed by pixel size (`"16"`, `"32"`, ...).
    Sized(BTreeMap<String, String>),
}

impl From<&str> for IconPath {
    fn from(path: &str) -> Self {
        IconPath::Single(path.to_owned())
    }
}

/// Arguments for `setIcon`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IconDetails {
    #[allow(missing_docs)]
    pub path: IconPath,
    /// Limit the change to one tab.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<TabId>,
}

/// `chrome.action.setIcon`, or `chrome.browserAction.setIcon` on hosts
/// without [`HostApi::Action`](crate::HostApi::Action).
#[derive(Debug, Clone, PartialEq)]
pub struct SetIcon {
    #[allow(missing_docs)]
    pub details: IconDetails,
}

impl Effect for SetIcon {
    type Output = Result<(), HostError>;
}
