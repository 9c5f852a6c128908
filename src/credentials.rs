//! Tencent Cloud credential resolution.
//!
//! Credentials are read from the process environment exactly once at startup
//! and shared read-only by every collector for the lifetime of the process.
//! A missing or empty variable is unrecoverable: the exporter has no degraded
//! mode without credentials.

use std::env;
use std::fmt;

use thiserror::Error;

/// Environment variable holding the API secret id.
pub const SECRET_ID_VAR: &str = "TENCENTCLOUD_SECRET_ID";

/// Environment variable holding the API secret key.
pub const SECRET_KEY_VAR: &str = "TENCENTCLOUD_SECRET_KEY";

/// Environment variable holding an optional session token.
pub const TOKEN_VAR: &str = "TENCENTCLOUD_TOKEN";

/// Errors raised while resolving credentials from the environment.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),

    #[error("Environment variable {0} is empty")]
    Empty(&'static str),
}

/// Immutable Tencent Cloud API credentials.
///
/// Secret material never appears in `Debug` output.
#[derive(Clone)]
pub struct Credentials {
    secret_id: String,
    secret_key: String,
    token: Option<String>,
}

impl Credentials {
    pub fn new(
        secret_id: impl Into<String>,
        secret_key: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            secret_id: secret_id.into(),
            secret_key: secret_key.into(),
            token,
        }
    }

    /// Resolve credentials from the process environment.
    pub fn from_env() -> Result<Self, CredentialError> {
        let secret_id = require(SECRET_ID_VAR)?;
        let secret_key = require(SECRET_KEY_VAR)?;
        let token = env::var(TOKEN_VAR).ok().filter(|t| !t.is_empty());

        Ok(Self {
            secret_id,
            secret_key,
            token,
        })
    }

    pub fn secret_id(&self) -> &str {
        &self.secret_id
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("secret_id", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn require(name: &'static str) -> Result<String, CredentialError> {
    match env::var(name) {
        Ok(value) if value.is_empty() => Err(CredentialError::Empty(name)),
        Ok(value) => Ok(value),
        Err(_) => Err(CredentialError::Missing(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let creds = Credentials::new("id", "key", Some("token".to_string()));

        assert_eq!(creds.secret_id(), "id");
        assert_eq!(creds.secret_key(), "key");
        assert_eq!(creds.token(), Some("token"));
    }

    #[test]
    fn test_debug_redacts_secret_material() {
        let creds = Credentials::new("AKIDexample", "secretvalue", Some("tok".to_string()));
        let output = format!("{:?}", creds);

        assert!(!output.contains("AKIDexample"));
        assert!(!output.contains("secretvalue"));
        assert!(!output.contains("tok\""));
        assert!(output.contains("<redacted>"));
    }

    #[test]
    fn test_from_env_lifecycle() {
        // Env mutation is process-global, so the whole lifecycle lives in one
        // test to avoid interleaving with parallel tests.
        unsafe {
            env::remove_var(SECRET_ID_VAR);
            env::remove_var(SECRET_KEY_VAR);
            env::remove_var(TOKEN_VAR);
        }

        let err = Credentials::from_env().unwrap_err();
        assert!(matches!(err, CredentialError::Missing(SECRET_ID_VAR)));

        unsafe {
            env::set_var(SECRET_ID_VAR, "id");
            env::set_var(SECRET_KEY_VAR, "");
        }
        let err = Credentials::from_env().unwrap_err();
        assert!(matches!(err, CredentialError::Empty(SECRET_KEY_VAR)));

        unsafe {
            env::set_var(SECRET_KEY_VAR, "key");
        }
        let creds = Credentials::from_env().expect("credentials should resolve");
        assert_eq!(creds.secret_id(), "id");
        assert_eq!(creds.secret_key(), "key");
        assert_eq!(creds.token(), None);

        unsafe {
            env::remove_var(SECRET_ID_VAR);
            env::remove_var(SECRET_KEY_VAR);
        }
    }
}
