//! Error types for machine translation

use std::fmt;

use thiserror::Error;

/// Provider failure classes, as reported in logs and run reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NetworkError,
    RateLimit,
    AuthError,
    QualityLow,
    ConfigError,
    StoreError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::RateLimit => "RATE_LIMIT",
            ErrorKind::AuthError => "AUTH_ERROR",
            ErrorKind::QualityLow => "QUALITY_LOW",
            ErrorKind::ConfigError => "CONFIG_ERROR",
            ErrorKind::StoreError => "STORE_ERROR",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum MtError {
    /// Connection failures, timeouts and 5xx responses
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Rate limited: {0}")]
    RateLimit(String),

    /// Rejected credentials (401/403 or a provider auth failure code)
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// The provider answered, but the answer is unusable
    #[error("Translation quality check failed: {0}")]
    QualityLow(String),

    /// Missing credentials, unsupported languages and other 4xx responses
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Reading or writing dictionaries and the ledger
    #[error(transparent)]
    Store(#[from] marki18n::Error),
}

impl MtError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MtError::NetworkError(_) => ErrorKind::NetworkError,
            MtError::RateLimit(_) => ErrorKind::RateLimit,
            MtError::AuthError(_) => ErrorKind::AuthError,
            MtError::QualityLow(_) => ErrorKind::QualityLow,
            MtError::ConfigError(_) => ErrorKind::ConfigError,
            MtError::Store(_) => ErrorKind::StoreError,
        }
    }

    /// Whether another attempt with the same provider may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NetworkError | ErrorKind::RateLimit | ErrorKind::QualityLow
        )
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = format!("HTTP {}: {}", status, body);
        match status {
            429 => MtError::RateLimit(message),
            401 | 403 => MtError::AuthError(message),
            400..=499 => MtError::ConfigError(message),
            _ => MtError::NetworkError(message),
        }
    }
}

impl From<reqwest::Error> for MtError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() || error.is_connect() {
            return MtError::NetworkError(error.to_string());
        }
        match error.status() {
            Some(status) => MtError::from_status(status.as_u16(), &error.to_string()),
            None if error.is_decode() => MtError::QualityLow(error.to_string()),
            None => MtError::NetworkError(error.to_string()),
        }
    }
}

/// Result type for MT operations
pub type MtResult<T> = Result<T, MtError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(ErrorKind::NetworkError.to_string(), "NETWORK_ERROR");
        assert_eq!(ErrorKind::RateLimit.to_string(), "RATE_LIMIT");
        assert_eq!(ErrorKind::AuthError.to_string(), "AUTH_ERROR");
        assert_eq!(ErrorKind::QualityLow.to_string(), "QUALITY_LOW");
        assert_eq!(ErrorKind::ConfigError.to_string(), "CONFIG_ERROR");
    }

    #[test]
    fn test_retryable() {
        assert!(MtError::NetworkError("x".into()).is_retryable());
        assert!(MtError::RateLimit("x".into()).is_retryable());
        assert!(MtError::QualityLow("x".into()).is_retryable());
        assert!(!MtError::AuthError("x".into()).is_retryable());
        assert!(!MtError::ConfigError("x".into()).is_retryable());
        assert!(!MtError::Store(marki18n::Error::validation("x")).is_retryable());
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(MtError::from_status(429, "").kind(), ErrorKind::RateLimit);
        assert_eq!(MtError::from_status(401, "").kind(), ErrorKind::AuthError);
        assert_eq!(MtError::from_status(403, "").kind(), ErrorKind::AuthError);
        assert_eq!(MtError::from_status(400, "").kind(), ErrorKind::ConfigError);
        assert_eq!(MtError::from_status(503, "").kind(), ErrorKind::NetworkError);

        let err = MtError::from_status(500, "boom");
        assert!(err.to_string().contains("HTTP 500: boom"));
    }
}
