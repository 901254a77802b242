use std::fmt::{Display, Formatter};

/// Optional host APIs whose presence decides how tabshim routes a call.
///
/// Only APIs that some supported host lacks are listed here. The legacy
/// `tabs` injection API, durable storage and alarms are assumed present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostApi {
    /// `chrome.scripting` (capability-scoped injection).
    Scripting,
    /// `chrome.storage.session` (ephemeral key/value store).
    SessionStorage,
    /// `chrome.storage.managed` (administrator policy).
    ManagedStorage,
    /// `chrome.action`, as opposed to the older `chrome.browserAction`.
    Action,
}

impl HostApi {
    /// The dotted path of this API below the `chrome` namespace.
    pub fn path(&self) -> &'static [&'static str] {
        match self {
            HostApi::Scripting => &["scripting"],
            HostApi::SessionStorage => &["storage", "session"],
            HostApi::ManagedStorage => &["storage", "managed"],
            HostApi::Action => &["action"],
        }
    }
}

impl Display for HostApi {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "chrome.{}", self.path().join("."))
    }
}

/// Runtime probe for optional host APIs.
///
/// The answer for a given host must not change while the process is alive;
/// components probe once when they are constructed and keep the result.
pub trait Capabilities {
    /// Returns `true` if the host exposes `api`.
    fn supports(&self, api: HostApi) -> bool;
}

impl<T: Capabilities> Capabilities for &T {
    fn supports(&self, api: HostApi) -> bool {
        T::supports(self, api)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_renders_api_paths() {
        assert_eq!(HostApi::Scripting.to_string(), "chrome.scripting");
        assert_eq!(HostApi::SessionStorage.to_string(), "chrome.storage.session");
        assert_eq!(HostApi::Action.path(), &["action"]);
    }
}
