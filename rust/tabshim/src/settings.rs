use serde::{Deserialize, Serialize};

use crate::ShimError;

/// Quota the host applies to `chrome.storage.session`, in bytes.
///
/// The in-process fallback does not enforce anything by default; set
/// [`ShimSettings::session_fallback_quota`] to this value for parity.
pub const HOST_SESSION_QUOTA_BYTES: usize = 10 * 1024 * 1024;

/// Knobs for an [`Extension`](crate::Extension).
///
/// Deserializes from a camelCase record with every field optional:
///
/// ```
/// use tabshim::ShimSettings;
///
/// let settings = ShimSettings::from_json(r#"{ "sessionFallbackQuota": 1024 }"#).unwrap();
/// assert_eq!(settings.session_fallback_quota, Some(1024));
/// assert!(!settings.force_legacy_scripting);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShimSettings {
    /// Use the legacy tabs API even when the scripting API is present.
    pub force_legacy_scripting: bool,
    /// Byte quota for the in-process session store. `None` means unlimited.
    pub session_fallback_quota: Option<usize>,
}

impl ShimSettings {
    /// Parse settings from a JSON record.
    pub fn from_json(json: &str) -> Result<Self, ShimError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Settings that cap the fallback session store at the host's quota.
    pub fn with_host_session_quota(mut self) -> Self {
        self.session_fallback_quota = Some(HOST_SESSION_QUOTA_BYTES);
        self
    }
}
