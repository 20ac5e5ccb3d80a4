//! Error types for host capability calls.

use std::io;

use thiserror::Error;

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;

/// Errors raised by the CAD host or the bridge that reaches it.
#[derive(Debug, Error)]
pub enum HostError {
    /// The host executed the call and reported a failure.
    #[error("Host rejected {operation}: {message}")]
    Rejected {
        /// Capability that failed (e.g. `executeTextCommand`).
        operation: String,
        /// Message reported by the host.
        message: String,
    },

    /// The requested item does not exist in the host's data store.
    #[error("Not found in host data store: {what}")]
    NotFound {
        /// Description of what was looked up.
        what: String,
    },

    /// Reading from or writing to the bridge failed.
    #[error("Host bridge I/O failed")]
    Transport {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The host did not answer in time.
    #[error("Host did not answer {operation} within {seconds}s")]
    Timeout {
        /// Capability that timed out.
        operation: String,
        /// Configured timeout in seconds.
        seconds: u64,
    },

    /// The host answered with something that could not be decoded.
    #[error("Malformed host reply to {operation}: {message}")]
    Malformed {
        /// Capability whose reply was malformed.
        operation: String,
        /// Description of what's wrong.
        message: String,
    },

    /// The bridge connection closed while a reply was pending.
    #[error("Host bridge closed")]
    Disconnected,
}

impl HostError {
    /// Creates a rejection error.
    pub fn rejected(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Creates a transport error.
    #[must_use]
    pub const fn transport(source: io::Error) -> Self {
        Self::Transport { source }
    }

    /// Creates a malformed-reply error.
    pub fn malformed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Malformed {
            operation: operation.into(),
            message: message.into(),
        }
    }
}
