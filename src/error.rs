//! Error types for MindMate

use thiserror::Error;

/// Result type alias for MindMate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in MindMate
#[derive(Debug, Error)]
pub enum Error {
    /// No identity is signed in
    #[error("no authenticated user")]
    Unauthenticated,

    /// Chat endpoint credential or address is missing
    #[error("chat endpoint misconfigured: {0}")]
    Misconfigured(String),

    /// Endpoint kept answering 429 after every retry
    #[error("chat endpoint rate limit exceeded")]
    RateLimited,

    /// Endpoint failure (non-2xx status, malformed reply, or exhausted retries)
    #[error("chat endpoint error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Endpoint {
        status: Option<u16>,
        message: String,
    },

    /// Conversation or mood store failure
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Caller supplied something unusable
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl Error {
    /// Whether the chat pipeline may retry after this failure
    ///
    /// Rate limits, 5xx responses and transport failures (connect, timeout)
    /// are transient. Everything else fails the request immediately.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited => true,
            Self::Endpoint {
                status: Some(status),
                ..
            } => *status == 429 || (500..600).contains(status),
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Whether this failure means "too many requests"
    #[must_use]
    pub const fn is_too_many_requests(&self) -> bool {
        matches!(
            self,
            Self::RateLimited
                | Self::Endpoint {
                    status: Some(429),
                    ..
                }
        )
    }

    /// Human-readable message suitable for showing in a chat transcript
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "Please sign in (or continue as a guest) to chat.",
            Self::RateLimited
            | Self::Endpoint {
                status: Some(429),
                ..
            } => "Too many requests. Please wait a moment.",
            Self::Misconfigured(_)
            | Self::Endpoint {
                status: Some(401),
                ..
            } => "API authentication failed. Please check configuration.",
            _ => "Oops, something went wrong!",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(status: Option<u16>) -> Error {
        Error::Endpoint {
            status,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn transient_statuses() {
        assert!(endpoint(Some(429)).is_transient());
        assert!(endpoint(Some(500)).is_transient());
        assert!(endpoint(Some(503)).is_transient());
        assert!(Error::RateLimited.is_transient());
    }

    #[test]
    fn fatal_statuses() {
        assert!(!endpoint(Some(400)).is_transient());
        assert!(!endpoint(Some(401)).is_transient());
        assert!(!endpoint(None).is_transient());
        assert!(!Error::Unauthenticated.is_transient());
        assert!(!Error::Misconfigured("no key".into()).is_transient());
    }

    #[test]
    fn too_many_requests_detection() {
        assert!(endpoint(Some(429)).is_too_many_requests());
        assert!(Error::RateLimited.is_too_many_requests());
        assert!(!endpoint(Some(503)).is_too_many_requests());
    }

    #[test]
    fn user_messages_are_distinct() {
        let rate = Error::RateLimited.user_message();
        let transient = endpoint(Some(502)).user_message();
        let auth = Error::Unauthenticated.user_message();

        assert_ne!(rate, transient);
        assert_ne!(rate, auth);
        assert_ne!(transient, auth);
        assert_eq!(
            endpoint(Some(401)).user_message(),
            "API authentication failed. Please check configuration."
        );
    }

    #[test]
    fn endpoint_display_includes_status() {
        assert_eq!(
            endpoint(Some(502)).to_string(),
            "chat endpoint error (502): boom"
        );
        assert_eq!(endpoint(None).to_string(), "chat endpoint error: boom");
    }
}
