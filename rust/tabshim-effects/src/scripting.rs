//! Capability-scoped injection API.
//!
//! This is the request shape callers construct, modelled on
//! `chrome.scripting.executeScript` / `chrome.scripting.insertCSS`.
//!
//! ```text
//! InjectionRequest
//!   ├── target { tabId, frameIds?, allFrames? }
//!   ├── files? | func (+ args?) | css?
//!   ├── injectImmediately?
//!   └── world?
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tabs::{FrameId, TabId};
use crate::{Effect, HostError};

/// Where an injection lands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InjectionTarget {
    /// The tab to inject into.
    pub tab_id: TabId,
    /// Specific frames within the tab.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_ids: Option<Vec<FrameId>>,
    /// Inject into every frame of the tab.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_frames: Option<bool>,
}

impl InjectionTarget {
    /// Target the top frame of `tab_id`.
    pub fn tab(tab_id: TabId) -> Self {
        Self {
            tab_id,
            frame_ids: None,
            all_frames: None,
        }
    }
}

/// JavaScript execution environment for injected code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionWorld {
    /// The extension's isolated world.
    Isolated,
    /// The page's own world.
    Main,
}

/// A function to run in the target, held as its source text.
///
/// Closures cannot cross into another JavaScript context with their captured
/// environment, so only the text of the function travels. Arguments are
/// supplied separately as JSON values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptFunction {
    source: String,
}

impl ScriptFunction {
    /// Wrap the source text of a function expression.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// The function's source text.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl From<&str> for ScriptFunction {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

/// A capability-scoped injection request.
///
/// Fields the caller supplies beyond the known ones are kept in
/// [`extra`](Self::extra) rather than discarded, so that a translation layer
/// can detect and refuse shapes it does not understand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionRequest {
    /// Where to inject.
    pub target: InjectionTarget,
    /// Script or stylesheet paths, relative to the extension root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
    /// A function to run in the target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub func: Option<ScriptFunction>,
    /// Arguments bound positionally to [`func`](Self::func).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<Value>>,
    /// Inline CSS text (CSS insertion only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
    /// Request the earliest possible injection timing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inject_immediately: Option<bool>,
    /// Execution world for the injected code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world: Option<ExecutionWorld>,
    /// Any other fields present on the request.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InjectionRequest {
    /// Start a request targeting the top frame of `tab_id`.
    pub fn for_tab(tab_id: TabId) -> Self {
        Self::new(InjectionTarget::tab(tab_id))
    }

    /// Start a request with an explicit target.
    pub fn new(target: InjectionTarget) -> Self {
        Self {
            target,
            files: None,
            func: None,
            args: None,
            css: None,
            inject_immediately: None,
            world: None,
            extra: Map::new(),
        }
    }

    /// Restrict the injection to the given frames.
    pub fn with_frames(mut self, frame_ids: Vec<FrameId>) -> Self {
        self.target.frame_ids = Some(frame_ids);
        self
    }

    /// Inject into every frame of the tab.
    pub fn with_all_frames(mut self, all_frames: bool) -> Self {
        self.target.all_frames = Some(all_frames);
        self
    }

    /// Inject the given files.
    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files = Some(files.into_iter().map(Into::into).collect());
        self
    }

    /// Run the given function.
    pub fn with_function(mut self, func: impl Into<ScriptFunction>) -> Self {
        self.func = Some(func.into());
        self
    }

    /// Bind these arguments to the function.
    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = Some(args);
        self
    }

    /// Insert this CSS text.
    pub fn with_css(mut self, css: impl Into<String>) -> Self {
        self.css = Some(css.into());
        self
    }

    /// Ask for the earliest possible injection.
    pub fn with_inject_immediately(mut self, inject_immediately: bool) -> Self {
        self.inject_immediately = Some(inject_immediately);
        self
    }

    /// Run in a specific execution world.
    pub fn in_world(mut self, world: ExecutionWorld) -> Self {
        self.world = Some(world);
        self
    }

    /// Attach an arbitrary extra field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }
}

/// The outcome of an injection in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InjectionResult {
    /// The frame the result came from, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<FrameId>,
    /// The document the result came from, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    /// The value the injected script evaluated to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

/// `chrome.scripting.executeScript`
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteScript {
    /// The request, passed to the host as-is.
    pub request: InjectionRequest,
}

impl ExecuteScript {
    /// Create a new ExecuteScript effect.
    pub fn new(request: InjectionRequest) -> Self {
        Self { request }
    }
}

impl Effect for ExecuteScript {
    type Output = Result<Vec<InjectionResult>, HostError>;
}

/// `chrome.scripting.insertCSS`
#[derive(Debug, Clone, PartialEq)]
pub struct InsertCss {
    /// The request, passed to the host as-is.
    pub request: InjectionRequest,
}

impl InsertCss {
    /// Create a new InsertCss effect.
    pub fn new(request: InjectionRequest) -> Self {
        Self { request }
    }
}

impl Effect for InsertCss {
    type Output = Result<(), HostError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use testresult::TestResult;

    #[test]
    fn it_reads_the_capability_scoped_shape() -> TestResult {
        let request: InjectionRequest = serde_json::from_value(json!({
            "target": { "tabId": 3, "frameIds": [0] },
            "files": ["content.js"],
            "injectImmediately": true,
            "world": "MAIN"
        }))?;

        assert_eq!(
            request,
            InjectionRequest::for_tab(3)
                .with_frames(vec![0])
                .with_files(["content.js"])
                .with_inject_immediately(true)
                .in_world(ExecutionWorld::Main)
        );
        Ok(())
    }

    #[test]
    fn it_keeps_unrecognized_fields() -> TestResult {
        let request: InjectionRequest = serde_json::from_value(json!({
            "target": { "tabId": 1 },
            "code": "alert(1)"
        }))?;

        assert_eq!(request.extra.get("code"), Some(&json!("alert(1)")));
        Ok(())
    }

    #[test]
    fn it_refuses_unknown_target_fields() {
        let result = serde_json::from_value::<InjectionRequest>(json!({
            "target": { "tabId": 1, "documentIds": ["abc"] }
        }));

        assert!(result.is_err());
    }

    #[test]
    fn it_holds_functions_as_source_text() -> TestResult {
        let request = InjectionRequest::for_tab(1).with_function("() => 1");
        let value = serde_json::to_value(&request)?;

        assert_eq!(value, json!({ "target": { "tabId": 1 }, "func": "() => 1" }));
        Ok(())
    }
}
