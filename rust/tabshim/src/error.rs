use tabshim_effects::HostError;
use thiserror::Error;

/// Reasons a scripting request cannot be expressed as a legacy tabs call.
///
/// All of these are caller-input errors: they are raised before any host
/// call is made, and retrying will not help.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranslateError {
    /// The options were not a record, or a field had the wrong type.
    #[error("Malformed injection options: {0}")]
    MalformedRequest(String),

    /// The request mixes in a field that only exists in the legacy shape.
    #[error("`{0}` is a legacy tabs API option and cannot be used in a scripting request")]
    LegacyField(String),

    /// `world` was requested; the legacy API always runs in the isolated world.
    #[error("`world` targeting is not supported by the legacy tabs API")]
    WorldUnsupported,

    /// More than one frame was targeted.
    #[error("The legacy tabs API targets exactly one frame, but {count} were requested")]
    MultipleFrames {
        /// Number of frames requested.
        count: usize,
    },

    /// More than one file was named.
    #[error("The legacy tabs API injects exactly one file per call, but {count} were requested")]
    MultipleFiles {
        /// Number of files requested.
        count: usize,
    },

    /// CSS insertion named both inline `css` and `files`.
    #[error("CSS insertion takes either `css` or `files`, not both")]
    MixedContent,

    /// CSS insertion was given a function to run.
    #[error("`func` cannot be used to insert CSS")]
    FunctionInStylesheet,
}

/// The common error type used by this crate
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShimError {
    /// The request could not be translated for the legacy host.
    #[error(transparent)]
    Translate(#[from] TranslateError),

    /// A storage key was not a string.
    #[error("Invalid storage key, string expected.")]
    InvalidStorageKey,

    /// A write to the in-process session store would exceed its quota.
    #[error("Session storage quota exceeded: {required} bytes required, {quota} allowed")]
    QuotaExceeded {
        /// Bytes the store would hold after the write.
        required: usize,
        /// The configured quota.
        quota: usize,
    },

    /// Settings or values could not be (de)serialized.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// The host rejected the call.
    #[error(transparent)]
    Host(#[from] HostError),
}

impl From<serde_json::Error> for ShimError {
    fn from(error: serde_json::Error) -> Self {
        ShimError::Serialization(error.to_string())
    }
}
