//! Errors from talking to the expense API.

/// Why a request to the expense API failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The request could not be sent or the connection failed.
    #[error("could not reach the server: {0}")]
    Http(String),

    /// The server responded with a non-success status.
    #[error("the server responded with {status}: {message}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The `error` field of the response body, or the status' reason.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("could not read the server's response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Whether the server rejected the request because the session is missing or expired.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Status { status: 401, .. })
    }
}
