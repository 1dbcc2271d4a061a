//! The seam between the conversation and whatever model answers it.

use async_trait::async_trait;
use std::time::Duration;

/// Phrase shown for any connectivity-class failure.
pub const NETWORK_ERROR_MESSAGE: &str =
    "A network error occurred. Please check your connection and try again.";

/// Why a chat request failed.
///
/// `Display` is the human-readable text shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connectivity problem (DNS, refused connection, dropped socket, ...)
    #[error("{}", NETWORK_ERROR_MESSAGE)]
    Network(String),

    /// The provider answered with an error status
    #[error("Failed to get response from AI: {0}")]
    Api(String),

    /// No session could be established (usually a missing API key)
    #[error("Chat could not be initialized: {0}")]
    NotInitialized(String),

    /// Client-side deadline elapsed
    #[error("The request timed out after {}. Please try again.", describe_limit(.0))]
    TimedOut(Duration),

    /// The user stopped the request
    #[error("The request was cancelled.")]
    Cancelled,

    #[error("Failed to get response from AI: {0}")]
    Other(String),
}

/// "250 ms", "1 second", "120 seconds". Partial seconds round up.
fn describe_limit(limit: &Duration) -> String {
    if limit.as_millis() < 1000 {
        return format!("{} ms", limit.as_millis());
    }
    let secs = limit.as_secs() + u64::from(limit.subsec_nanos() > 0);
    if secs == 1 {
        "1 second".to_string()
    } else {
        format!("{} seconds", secs)
    }
}

impl TransportError {
    /// Classify a free-form failure message.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("xhr error")
            || lower.contains("connection")
            || lower.contains("network")
            || lower.contains("dns")
            || lower.contains("could not resolve")
        {
            TransportError::Network(message)
        } else {
            TransportError::Other(message)
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, TransportError::Network(_))
    }

    /// Underlying detail, for logs.
    pub fn detail(&self) -> String {
        match self {
            TransportError::Network(d)
            | TransportError::Api(d)
            | TransportError::NotInitialized(d)
            | TransportError::Other(d) => d.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        // The request URL never goes into user-visible or logged text
        let e = e.without_url();
        if e.is_connect() || e.is_timeout() || e.is_request() {
            TransportError::Network(e.to_string())
        } else if let Some(status) = e.status() {
            TransportError::Api(format!("{}: {}", status, e))
        } else {
            TransportError::from_message(e.to_string())
        }
    }
}

/// Sends one user turn and returns the model's raw reply.
///
/// Implementations own whatever session state the backend needs; callers
/// only ever pass the new user text.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<String, TransportError>;
}
