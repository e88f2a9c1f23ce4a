//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
///
/// Session operations surface these to the caller unchanged; the HTTP
/// layer never retries or rewrites them.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad credentials, cancelled popup, or a failed exchange during login
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Duplicate or invalid account creation, or a failed exchange during registration
    #[error("Registration failed: {0}")]
    Registration(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    /// The backend rejected or failed to issue a token for a verified email
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx backend response, body passed through untouched
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an authentication error
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a registration error
    pub fn registration(msg: impl Into<String>) -> Self {
        Self::Registration(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// HTTP status code carried by this error, if it came from a backend response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the backend refused the request for lack of credentials
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::NotAuthenticated) || matches!(self.status(), Some(401 | 403))
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Network(format!("request timed out: {}", error))
        } else if error.is_connect() {
            Self::Network(format!("unable to connect: {}", error))
        } else if error.is_decode() {
            Self::Network(format!("invalid response body: {}", error))
        } else {
            Self::Network(error.to_string())
        }
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_only_for_http_errors() {
        let err = Error::HttpStatus { status: 404, body: "missing".to_string() };
        assert_eq!(err.status(), Some(404));
        assert_eq!(Error::NotAuthenticated.status(), None);
    }

    #[test]
    fn test_is_unauthorized() {
        assert!(Error::NotAuthenticated.is_unauthorized());
        assert!(Error::HttpStatus { status: 401, body: String::new() }.is_unauthorized());
        assert!(!Error::HttpStatus { status: 500, body: String::new() }.is_unauthorized());
        assert!(!Error::not_found("query").is_unauthorized());
    }

    #[test]
    fn test_display_keeps_backend_body() {
        let err = Error::HttpStatus { status: 400, body: "{\"message\":\"bad\"}".to_string() };
        assert_eq!(err.to_string(), "HTTP 400: {\"message\":\"bad\"}");
    }
}
