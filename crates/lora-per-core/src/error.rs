//! Error types for the PER test rig.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Serial-link failures, command parameter
//! rejections, and radio driver failures are all captured here.
//!
//! The variants fall into two classes with very different handling:
//!
//! - Parameter errors ([`Error::InvalidParameter`], [`Error::MissingParameter`])
//!   are recoverable. The command dispatcher logs them and moves on.
//! - Radio errors ([`Error::Radio`]) are fatal for the current test run and
//!   are propagated to the caller untouched.

/// The error type for all PER test rig operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error on the command link (serial port, stdin).
    #[error("transport error: {0}")]
    Transport(String),

    /// Timed out waiting for bytes on the command link.
    #[error("timeout waiting for data")]
    Timeout,

    /// The command link has not been opened or was closed.
    #[error("not connected")]
    NotConnected,

    /// The command link was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// A command parameter was present but could not be accepted
    /// (not a number, out of range, not in the allowed set).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A command that requires a parameter was issued without one.
    #[error("missing parameter: {0}")]
    MissingParameter(String),

    /// A radio driver call failed. Always fatal for the current run.
    #[error("radio error: {0}")]
    Radio(String),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error must terminate the current test run.
    ///
    /// Command parameter errors are recovered locally by the dispatcher;
    /// radio driver failures are not.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Radio(_))
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
