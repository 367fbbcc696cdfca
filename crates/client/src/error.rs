use std::borrow::Cow;

use crate::status::describe_status;

fn status_text(code: &u16) -> Cow<'static, str> {
    describe_status(*code)
}

/// Why authentication failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The service rejected the credentials. Retrying with the same
    /// credentials will not help.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authentication server unreachable: {0}")]
    Unreachable(String),

    #[error("Authentication timed out")]
    Timeout,

    #[error("Authentication failed ({}): {}", .0, status_text(.0))]
    ServerError(u16),

    #[error("Malformed login response: {0}")]
    MalformedResponse(String),
}

impl AuthError {
    /// `true` when the same credentials must not be retried.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AuthError::InvalidCredentials)
    }

    pub(crate) fn from_status(code: u16) -> Self {
        match code {
            400 | 401 | 403 => AuthError::InvalidCredentials,
            other => AuthError::ServerError(other),
        }
    }

    pub(crate) fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            AuthError::Timeout
        } else {
            AuthError::Unreachable(err.to_string())
        }
    }
}

/// Why a snapshot fetch failed. Every kind is retryable on the next cycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Data server unreachable: {0}")]
    Unreachable(String),

    #[error("Data request timed out")]
    Timeout,

    /// The token was rejected; the caller should authenticate again.
    #[error("Data request unauthorized ({}): {}", .0, status_text(.0))]
    Unauthorized(u16),

    #[error("Data request failed ({}): {}", .0, status_text(.0))]
    ServerError(u16),

    #[error("Data response body was empty")]
    EmptyBody,

    #[error("Data response could not be decoded: {0}")]
    Decode(String),
}

impl FetchError {
    pub(crate) fn from_status(code: u16) -> Self {
        match code {
            401 | 403 => FetchError::Unauthorized(code),
            other => FetchError::ServerError(other),
        }
    }

    pub(crate) fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_decode() || err.is_body() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Unreachable(err.to_string())
        }
    }

    /// Short machine-readable kind for logs and status payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Unreachable(_) => "unreachable",
            FetchError::Timeout => "timeout",
            FetchError::Unauthorized(_) => "unauthorized",
            FetchError::ServerError(_) => "server_error",
            FetchError::EmptyBody => "empty_body",
            FetchError::Decode(_) => "decode",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_invalid_credentials_is_terminal() {
        assert!(AuthError::InvalidCredentials.is_terminal());
        assert!(!AuthError::Timeout.is_terminal());
        assert!(!AuthError::Unreachable("refused".into()).is_terminal());
        assert!(!AuthError::ServerError(500).is_terminal());
    }

    #[test]
    fn status_codes_map_to_kinds() {
        assert_eq!(AuthError::from_status(401), AuthError::InvalidCredentials);
        assert_eq!(AuthError::from_status(502), AuthError::ServerError(502));
        assert_eq!(FetchError::from_status(403), FetchError::Unauthorized(403));
        assert_eq!(FetchError::from_status(500), FetchError::ServerError(500));
    }

    #[test]
    fn messages_include_status_description() {
        assert_eq!(
            FetchError::ServerError(503).to_string(),
            "Data request failed (503): Service Unavailable"
        );
    }
}
