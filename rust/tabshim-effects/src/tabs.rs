//! Legacy per-tab API.
//!
//! The older injection surface addresses a whole tab, with at most one frame
//! and one resource per call, and accepts only pre-serialized code:
//!
//! ```text
//! chrome.tabs.executeScript(tabId, { file?, frameId?, allFrames?, runAt?, code? })
//! chrome.tabs.insertCSS(tabId, { file?, frameId?, allFrames?, runAt?, code? })
//! ```
//!
//! Tab query and update live here too since they share the namespace.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Effect, HostError};

/// Host-assigned tab identifier.
pub type TabId = i32;

/// Host-assigned frame identifier; `0` is the top frame.
pub type FrameId = i32;

/// Identifier of the top-level frame of a tab.
pub const TOP_FRAME: FrameId = 0;

/// When the legacy API runs injected code relative to document loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunAt {
    /// Before any DOM is constructed.
    DocumentStart,
    /// After the DOM is complete, before subresources.
    DocumentEnd,
    /// Some time after `DocumentEnd` (the host default).
    DocumentIdle,
}

/// Options record accepted by `chrome.tabs.executeScript` / `insertCSS`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LegacyOptions {
    /// A single file to inject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// A single frame to inject into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<FrameId>,
    /// Inject into every frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_frames: Option<bool>,
    /// Injection timing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_at: Option<RunAt>,
    /// JavaScript (or CSS, for `insertCSS`) source text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Remaining fields carried over from the caller's request.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A complete legacy call: the tab plus its options record.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyInjection {
    /// The tab to inject into.
    pub tab_id: TabId,
    /// Everything else.
    pub options: LegacyOptions,
}

/// `chrome.tabs.executeScript`
///
/// The host answers with the completion value of the script in each frame,
/// without saying which frame produced which value.
#[derive(Debug, Clone, PartialEq)]
pub struct TabsExecuteScript(pub LegacyInjection);

impl Effect for TabsExecuteScript {
    type Output = Result<Vec<Value>, HostError>;
}

/// `chrome.tabs.insertCSS`
#[derive(Debug, Clone, PartialEq)]
pub struct TabsInsertCss(pub LegacyInjection);

impl Effect for TabsInsertCss {
    type Output = Result<(), HostError>;
}

/// The subset of `tabs.Tab` tabshim reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TabId>,
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_id: Option<i32>,
    #[allow(missing_docs)]
    #[serde(default)]
    pub index: i32,
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[allow(missing_docs)]
    #[serde(default)]
    pub active: bool,
    #[allow(missing_docs)]
    #[serde(default)]
    pub pinned: bool,
}

/// Filter for `chrome.tabs.query`. Unset fields match everything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TabQuery {
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_window: Option<bool>,
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_id: Option<i32>,
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    /// Match patterns the tab URL must satisfy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Vec<String>>,
}

/// Properties for `chrome.tabs.update`. Unset fields are left alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TabUpdate {
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muted: Option<bool>,
}

/// `chrome.tabs.query`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryTabs {
    #[allow(missing_docs)]
    pub query: TabQuery,
}

impl Effect for QueryTabs {
    type Output = Result<Vec<Tab>, HostError>;
}

/// `chrome.tabs.update`
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateTab {
    #[allow(missing_docs)]
    pub tab_id: TabId,
    #[allow(missing_docs)]
    pub update: TabUpdate,
}

impl Effect for UpdateTab {
    /// The host may answer without a tab when the extension lacks the
    /// `tabs` permission.
    type Output = Result<Option<Tab>, HostError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use testresult::TestResult;

    #[test]
    fn it_writes_the_legacy_options_record() -> TestResult {
        let options = LegacyOptions {
            file: Some("inject.js".into()),
            frame_id: Some(2),
            run_at: Some(RunAt::DocumentStart),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&options)?,
            json!({ "file": "inject.js", "frameId": 2, "runAt": "document_start" })
        );
        Ok(())
    }
}
