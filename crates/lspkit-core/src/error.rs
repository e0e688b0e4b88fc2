//! Error taxonomy for lspkit.
//!
//! One variant per failure mode named in the transport/lifecycle design:
//! framing and codec failures poison the transport, RPC/timeout/cancellation
//! errors are returned to the caller, and supervisor/capability errors only
//! ever surface during the handshake or the fallback chain.

use thiserror::Error;

/// The primary error type for lspkit operations.
#[derive(Error, Debug)]
pub enum Error {
    // ===== Framing / codec (poison the transport) =====
    #[error("malformed LSP frame header: {0}")]
    Framing(String),

    #[error("unexpected end of stream while reading a frame")]
    Eof,

    #[error("invalid JSON-RPC message: {0}")]
    Codec(String),

    #[error("transport closed: {0}")]
    TransportClosed(String),

    // ===== Caller-visible request errors =====
    #[error("server returned error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("request was cancelled")]
    Cancelled,

    #[error("operation attempted outside the Ready state: {0}")]
    State(String),

    // ===== Handshake / supervisor =====
    #[error("server runtime failed to start: {0}")]
    ServerRuntime(String),

    #[error("auto-install of the server binary failed: {0}")]
    ServerInstallation(String),

    #[error("all server candidates failed: {0}")]
    AllCandidatesFailed(String),

    #[error("server lacks required capability: {0}")]
    CapabilityAssertion(String),

    // ===== Generic =====
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Coarse category of an [`Error`], used for logging and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Framing,
    Rpc,
    Timeout,
    Cancelled,
    State,
    Supervisor,
    Capability,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Framing(_) | Error::Eof | Error::Codec(_) | Error::TransportClosed(_) => {
                ErrorKind::Framing
            }
            Error::Rpc { .. } => ErrorKind::Rpc,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::State(_) => ErrorKind::State,
            Error::ServerRuntime(_)
            | Error::ServerInstallation(_)
            | Error::AllCandidatesFailed(_) => ErrorKind::Supervisor,
            Error::CapabilityAssertion(_) => ErrorKind::Capability,
            Error::Io(_) | Error::Json(_) | Error::Internal(_) | Error::Other(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether the transport must be poisoned as a result of this error.
    pub fn poisons_transport(&self) -> bool {
        matches!(self.kind(), ErrorKind::Framing)
    }
}

/// Extension trait for attaching context to a foreign error, backed by
/// `anyhow`'s context chaining.
pub trait ErrorContext<T> {
    fn context<C>(self, context: C) -> crate::Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<C>(self, context: C) -> crate::Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| Error::Other(anyhow::Error::from(e).context(context)))
    }
}
