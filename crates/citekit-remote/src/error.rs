//! Error types for the single-instance channel.
//!
//! Most of these are control-flow signals rather than failures: `AddressInUse`
//! and `Unreachable` are the two expected outcomes of the delegate-or-become-
//! primary decision and never surface to the end user.

use std::time::Duration;
use thiserror::Error;

/// Main error type for single-instance coordination.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The listen port is already bound, most likely by another primary
    /// instance of the application.
    #[error("port {port} is already in use")]
    AddressInUse { port: u16 },

    /// Nothing accepted the connection on the target port.
    #[error("no instance reachable on port {port}")]
    Unreachable { port: u16 },

    /// A bounded socket wait elapsed.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The peer sent a structurally invalid frame.
    #[error("protocol framing violation: {reason}")]
    ProtocolFraming { reason: String },

    /// The kind tag is not one this build understands.
    #[error("unknown message kind tag {tag:#04x}")]
    UnknownMessageKind { tag: u8 },

    /// The peer closed the connection before the exchange completed.
    #[error("connection closed mid-exchange")]
    ConnectionClosed,

    /// Any other socket-level failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for single-instance coordination operations.
pub type Result<T> = std::result::Result<T, RemoteError>;

impl RemoteError {
    /// Create a framing violation with a human-readable reason.
    pub(crate) fn framing(reason: impl Into<String>) -> Self {
        RemoteError::ProtocolFraming {
            reason: reason.into(),
        }
    }

    /// Whether this error means "no primary instance is present".
    ///
    /// The coordinator treats these as the signal to become the primary;
    /// everything else is an actual failure worth logging.
    pub fn means_no_instance(&self) -> bool {
        matches!(
            self,
            RemoteError::Unreachable { .. } | RemoteError::Timeout(_)
        )
    }
}
