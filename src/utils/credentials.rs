//! Credential sources
//!
//! Probes never read the environment themselves. The run configuration asks a
//! [`CredentialSource`] for the variable named by each probe's `api_key_env`,
//! which keeps secrets injectable in tests and when embedding the library.

use crate::probes::Credential;
use std::collections::HashMap;

/// Resolves a credential by its variable name.
pub trait CredentialSource: Send + Sync {
    fn lookup(&self, name: &str) -> Option<Credential>;
}

/// Reads credentials from process environment variables.
///
/// Blank values count as unset. `.env` files are loaded into the
/// environment by the binary at startup.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn lookup(&self, name: &str) -> Option<Credential> {
        std::env::var(name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(Credential::new)
    }
}

/// A fixed set of credentials.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    values: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl CredentialSource for StaticCredentials {
    fn lookup(&self, name: &str) -> Option<Credential> {
        self.values
            .get(name)
            .filter(|v| !v.trim().is_empty())
            .map(|v| Credential::new(v.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_credentials() {
        let source = StaticCredentials::new()
            .with("HIBP", "abc123")
            .with("EMPTY", "  ");

        assert_eq!(source.lookup("HIBP").unwrap().expose(), "abc123");
        assert!(source.lookup("EMPTY").is_none());
        assert!(source.lookup("MISSING").is_none());
    }

    #[test]
    fn test_env_credentials_missing_var() {
        assert!(
            EnvCredentials
                .lookup("FOOTPRINT_TEST_VARIABLE_THAT_IS_NEVER_SET")
                .is_none()
        );
    }
}
