//! Error types for tar decoding.

/// Result wrapper
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while decoding an archive or one of its payloads.
///
/// Every decoding error is terminal: the iterator that produced it yields
/// nothing afterwards.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A fixed-width or length-prefixed read would run past the end of the input.
    #[error("truncated archive: need {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A PAX record does not have the `length key=value\n` shape.
    #[error("invalid PAX header data format: {0}")]
    Format(String),

    /// Invalid or incomplete UTF-8 sequence.
    #[error("UTF-8 decode: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The background decode reported a failure or went away.
    #[error("worker: {0}")]
    Worker(String),

    #[error("refusing to unpack unsafe path `{0}`")]
    UnsafePath(String),
}
