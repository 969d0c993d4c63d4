use thiserror::Error;

/// Errors that can occur when talking to the invoice processor.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport failure, timeout, or malformed/non-success response.
    /// Retryable; no local state was mutated.
    #[error("Invoice processor unavailable: {0}")]
    Unavailable(String),

    /// The processor logically refused the request (bad amount, bad
    /// description). Not retryable without correcting the input.
    #[error("Invoice processor rejected the request: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Unavailable(e.to_string())
    }
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
