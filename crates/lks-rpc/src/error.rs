use std::fmt;

/// Failures that prevent a call from producing an [`crate::ApiResult`].
#[derive(Debug)]
pub enum ApiError {
    /// Connection, TLS or timeout failure that outlived the retry budget.
    Transport { path: String, message: String },
    /// A success response whose body did not match the expected shape.
    Decode {
        path: String,
        status: u16,
        message: String,
    },
    /// The request could not be built (bad base url, invalid content type).
    Request(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Transport { path, message } => {
                write!(f, "transport error on {path}: {message}")
            }
            ApiError::Decode {
                path,
                status,
                message,
            } => write!(f, "decode error on {path} (status {status}): {message}"),
            ApiError::Request(msg) => write!(f, "request build error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}
