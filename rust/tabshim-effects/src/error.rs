use thiserror::Error;

/// Message Chromium reports when a broadcast has no listener on the other end.
pub const NO_RECEIVER_MESSAGE: &str = "Receiving end does not exist";

/// Errors reported by the extension host.
///
/// These are carried to the caller unchanged; nothing in tabshim retries a
/// failed host call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    /// The host does not expose the API that was called.
    #[error("Host API unavailable: {api}")]
    Unavailable {
        /// Dotted name of the missing API.
        api: String,
    },

    /// A message was sent but nothing was listening for it.
    #[error("Could not establish connection. Receiving end does not exist.")]
    NoReceiver,

    /// The host rejected the call (e.g. `chrome.runtime.lastError`).
    #[error("{message}")]
    Rejected {
        /// The host-provided failure message.
        message: String,
    },
}

impl HostError {
    /// Classify a raw host failure message.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains(NO_RECEIVER_MESSAGE) {
            HostError::NoReceiver
        } else {
            HostError::Rejected { message }
        }
    }

    /// Shorthand for [`HostError::Unavailable`].
    pub fn unavailable(api: impl Into<String>) -> Self {
        HostError::Unavailable { api: api.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_recognizes_missing_receivers() {
        let error = HostError::from_message(
            "Could not establish connection. Receiving end does not exist.",
        );
        assert_eq!(error, HostError::NoReceiver);
    }

    #[test]
    fn it_keeps_other_messages_verbatim() {
        let error = HostError::from_message("Cannot access contents of url");
        assert_eq!(error.to_string(), "Cannot access contents of url");
    }
}
