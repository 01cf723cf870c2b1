use thiserror::Error;

/// A frame that could not be turned into a [`crate::sse::ServerEvent`].
///
/// Only the offending frame is lost; decoding continues with the next one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed `{kind}` event: {reason}")]
    MalformedEvent { kind: String, reason: String },
}

impl DecodeError {
    pub(crate) fn malformed(kind: &str, reason: impl Into<String>) -> Self {
        Self::MalformedEvent {
            kind: kind.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    /// Network, DNS or connection failure, including a body that breaks off mid-stream.
    #[error("transport failure: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The service answered with a non-success status or without a body.
    #[error("request rejected ({status}): {reason}")]
    Rejected { status: u16, reason: String },

    #[error(transparent)]
    Malformed(#[from] DecodeError),
}

impl ChatError {
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Box::new(err))
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        Self::transport(err)
    }
}

/// How a generation session ended.
#[derive(Debug)]
pub enum EndReason {
    Completed,
    UserCancelled,
    Failed(ChatError),
}

impl EndReason {
    pub fn is_completed(&self) -> bool {
        matches!(self, EndReason::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_display_includes_status() {
        let err = ChatError::Rejected {
            status: 503,
            reason: "Service Unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "request rejected (503): Service Unavailable");
    }

    #[test]
    fn test_malformed_converts_from_decode_error() {
        let err: ChatError = DecodeError::malformed("message", "invalid JSON").into();
        assert!(matches!(err, ChatError::Malformed(_)));
        assert_eq!(err.to_string(), "malformed `message` event: invalid JSON");
    }

    #[test]
    fn test_transport_wraps_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = ChatError::transport(io);
        assert_eq!(err.to_string(), "transport failure: reset by peer");
    }
}
