use std::fmt;

use serde::{Deserialize, Serialize};

/// Login credentials. The secret never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user_id: String,
    secret: String,
}

impl Credentials {
    pub fn new(user_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            secret: secret.into(),
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Bearer token returned by the login endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

/// Characters of the token shown in logs.
const TOKEN_LOG_PREFIX: usize = 8;

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading characters of the token, for log lines.
    pub fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(TOKEN_LOG_PREFIX).collect();
        format!("{prefix}...")
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AuthToken").field(&self.redacted()).finish()
    }
}

#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub user_id: &'a str,
    pub password: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
}
