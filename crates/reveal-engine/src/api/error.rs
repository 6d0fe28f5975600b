use crate::api::types::{AnimHandle, ElementId};

/// Result alias carrying [`RevealError`].
pub type Result<T> = std::result::Result<T, RevealError>;

/// Errors surfaced synchronously to the caller.
///
/// Detached-element events and repeated teardown are not errors; they are
/// handled where they occur and only logged.
#[derive(Debug, thiserror::Error)]
pub enum RevealError {
    /// Malformed animation declaration (mismatched property sets,
    /// non-positive duration, bad stagger or tick interval, short marquee track).
    #[error("invalid animation spec: {reason}")]
    InvalidSpec { reason: String },
    /// A handle that the registry does not know.
    #[error("unknown animation handle {0:?}")]
    UnknownHandle(AnimHandle),
    /// An element the surface does not know.
    #[error("unknown element {0:?}")]
    UnknownElement(ElementId),
    /// Config or manifest JSON failed to parse.
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
}

impl RevealError {
    pub fn invalid_spec(reason: impl Into<String>) -> Self {
        Self::InvalidSpec { reason: reason.into() }
    }

    pub fn is_invalid_spec(&self) -> bool {
        matches!(self, Self::InvalidSpec { .. })
    }
}
