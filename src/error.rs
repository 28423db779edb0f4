//! Error types for the lockbus library.

use thiserror::Error;

/// The main error type for lockbus operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Serial port error.
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame encoding/decoding error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// No serial channel could be found or opened. Fatal at startup;
    /// there is no reconnect logic.
    #[error("channel unavailable: {reason}")]
    ChannelUnavailable { reason: String },

    /// An exchange produced no reply within the read window.
    #[error("no reply within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Connection is not established.
    #[error("not connected")]
    NotConnected,
}

/// Frame codec errors.
///
/// `Empty` is deliberately part of this taxonomy: a read buffer full of NUL
/// padding decodes to `Empty`, and the caller decides whether that means
/// "no data yet" or a real problem.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The command cannot be represented in the selected profile.
    #[error("invalid command: {reason}")]
    InvalidCommand { reason: String },

    /// Recomputed checksum does not match the received field.
    #[error("checksum mismatch: computed {computed:02x?}, received {received:02x?}")]
    ChecksumMismatch { computed: Vec<u8>, received: Vec<u8> },

    /// Structurally invalid frame (missing terminator, wrong field count).
    #[error("malformed frame: {reason}")]
    Malformed { reason: String },

    /// Zero meaningful bytes after stripping padding.
    #[error("empty frame")]
    Empty,
}

/// Result type alias for lockbus operations.
pub type Result<T> = std::result::Result<T, Error>;
