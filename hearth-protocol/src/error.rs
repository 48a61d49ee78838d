use crate::session::DisconnectReason;

/// The error taxonomy of the session layer.
///
/// Codec failures bubble up from `hearth-packets` and are folded into
/// [`SessionError::Protocol`]; the session itself never propagates an error
/// past its task boundary. Every failure is translated into a disconnect
/// with the matching [`DisconnectReason`].
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    /// A malformed packet, an unknown id in a strict state, a bounds
    /// violation or an invalid field value.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An I/O failure, a peer reset or an unexpected end of stream.
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    /// The idle threshold was exceeded.
    #[error("session idle timeout exceeded")]
    Timeout,

    /// The global or per-peer admission cap was hit.
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(&'static str),

    /// An encryption or authentication attempt was rejected.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// An invariant violation inside the server itself.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<hearth_packets::Error> for SessionError {
    fn from(err: hearth_packets::Error) -> Self {
        SessionError::Protocol(err.to_string())
    }
}

impl From<SessionError> for DisconnectReason {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Protocol(msg) => DisconnectReason::ProtocolError(msg),
            SessionError::Network(err) => DisconnectReason::NetworkError(err.to_string()),
            SessionError::Timeout => DisconnectReason::Timeout,
            SessionError::CapacityExceeded(_) => DisconnectReason::ServerFull,
            SessionError::AuthFailed(msg) => DisconnectReason::AuthFailed(msg),
            SessionError::Internal(msg) => DisconnectReason::InternalError(msg),
        }
    }
}
