//! Secret resolution for source credentials.
//!
//! Descriptors name secrets (`HUNTER_API_KEY`); resolvers look them up at
//! dispatch time so credentials never land in the catalog files.

use std::collections::HashMap;

pub trait SecretResolver: Send + Sync {
    /// Look up a secret by name. Empty values count as missing.
    fn resolve(&self, name: &str) -> Option<String>;
}

/// Resolves secrets from process environment variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecretResolver;

impl SecretResolver for EnvSecretResolver {
    fn resolve(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }
}

/// Fixed map of secrets, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticSecrets(HashMap<String, String>);

impl StaticSecrets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }
}

impl SecretResolver for StaticSecrets {
    fn resolve(&self, name: &str) -> Option<String> {
        self.0.get(name).filter(|v| !v.is_empty()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_secrets_ignore_empty_values() {
        let secrets = StaticSecrets::new().with("A", "x").with("B", "");
        assert_eq!(secrets.resolve("A").as_deref(), Some("x"));
        assert_eq!(secrets.resolve("B"), None);
        assert_eq!(secrets.resolve("C"), None);
    }

    #[test]
    fn env_resolver_misses_unset_variable() {
        assert_eq!(
            EnvSecretResolver.resolve("ARGUS_TEST_SURELY_UNSET_SECRET_9F2C"),
            None
        );
    }
}
