use thiserror::Error;

use crate::state::Axis;

/// Outcomes a controller resolves locally instead of letting them escape
/// to the rendering host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// No credential available; nothing was sent.
    #[error("sign in to personalize or translate this chapter")]
    Unauthenticated,
    /// Network, status or body failure while talking to the remote service.
    #[error("{0}")]
    TransformFailed(String),
    /// A toggle arrived while a request for this chapter was still in flight.
    #[error("{0} request already in flight")]
    InvalidState(Axis),
    /// The response belonged to a chapter state that has since been reset.
    #[error("response superseded by a newer chapter state")]
    Superseded,
}

impl TransformError {
    pub fn failed(msg: impl Into<String>) -> Self {
        TransformError::TransformFailed(msg.into())
    }
}
