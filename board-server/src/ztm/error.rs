//! ZTM client error types.

use std::fmt;

/// Errors from the ZTM open-data HTTP client.
#[derive(Debug)]
pub enum ZtmError {
    /// HTTP request failed (network error, timeout, etc.)
    Http(reqwest::Error),

    /// JSON deserialization failed
    Json {
        message: String,
        body: Option<String>,
    },

    /// API returned an error status code
    Api { status: u16, message: String },

    /// The upstream document had an unrecognized shape
    Shape(String),

    /// The request could not even be constructed. Unlike a per-request
    /// failure this means the client itself is unusable, and the whole
    /// refresh cycle is aborted.
    Client(String),
}

impl ZtmError {
    /// Whether this error indicates a broken client rather than a failure
    /// of one individual request. Per-stop fan-out branches degrade on
    /// ordinary errors but propagate these.
    pub fn is_session_error(&self) -> bool {
        match self {
            ZtmError::Client(_) => true,
            ZtmError::Http(e) => e.is_builder(),
            _ => false,
        }
    }
}

impl fmt::Display for ZtmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZtmError::Http(e) => write!(f, "HTTP error: {e}"),
            ZtmError::Json { message, body } => {
                write!(f, "JSON parse error: {message}")?;
                if let Some(body) = body {
                    write!(f, " (body: {body})")?;
                }
                Ok(())
            }
            ZtmError::Api { status, message } => {
                write!(f, "API error {status}: {message}")
            }
            ZtmError::Shape(msg) => write!(f, "unexpected document shape: {msg}"),
            ZtmError::Client(msg) => write!(f, "client error: {msg}"),
        }
    }
}

impl std::error::Error for ZtmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ZtmError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ZtmError {
    fn from(err: reqwest::Error) -> Self {
        ZtmError::Http(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ZtmError::Api {
            status: 502,
            message: "Bad Gateway".into(),
        };
        assert_eq!(err.to_string(), "API error 502: Bad Gateway");

        let err = ZtmError::Json {
            message: "expected object".into(),
            body: Some("[]".into()),
        };
        assert!(err.to_string().contains("JSON parse error"));
        assert!(err.to_string().contains("[]"));

        let err = ZtmError::Shape("no dataset key".into());
        assert_eq!(err.to_string(), "unexpected document shape: no dataset key");
    }

    #[test]
    fn session_classification() {
        assert!(ZtmError::Client("bad base url".into()).is_session_error());
        assert!(
            !ZtmError::Api {
                status: 500,
                message: String::new()
            }
            .is_session_error()
        );
        assert!(!ZtmError::Shape("x".into()).is_session_error());
    }
}
