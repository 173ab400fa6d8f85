//! Provider error type.
//!
//! Every provider failure is a `ProviderError`. Each variant renders a
//! human-readable message; HTTP failures also keep the status code so the
//! retry policy does not have to dig it out of the text.

use thiserror::Error;

/// Client-side status codes that are not expected to resolve by retrying
pub const NON_RETRYABLE_STATUS: [u16; 3] = [400, 401, 404];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    /// Free-form error carrying only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// HTTP status code, when the failure came from a non-2xx response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure is client-side (400, 401, 404).
    ///
    /// HTTP failures are judged by their status code. Message-only errors
    /// are judged by whether the text mentions one of those codes. Other 4xx
    /// codes (403, 429) are not client-side for this purpose and stay
    /// retryable.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Http { status, .. } => NON_RETRYABLE_STATUS.contains(status),
            Self::Other(message) => NON_RETRYABLE_STATUS
                .iter()
                .any(|code| message.contains(&code.to_string())),
            Self::Network(_) | Self::Parse(_) => false,
        }
    }

    pub fn is_retryable(&self) -> bool {
        !self.is_client_error()
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        // The request URL carries the API key
        let e = e.without_url();
        if e.is_decode() {
            Self::Parse(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Http {
                status: status.as_u16(),
                message: format!("HTTP {}: {}", status.as_u16(), e),
            }
        } else {
            Self::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}
