//! Secret provider backed by loaded configuration.

use secrecy::{ExposeSecret, SecretString};

use crate::ports::SecretProvider;

/// Serves the webhook secret read at startup.
pub struct ConfigSecretProvider {
    secret: SecretString,
}

impl ConfigSecretProvider {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }
}

impl SecretProvider for ConfigSecretProvider {
    fn secret(&self) -> SecretString {
        SecretString::new(self.secret.expose_secret().clone())
    }
}

impl std::fmt::Debug for ConfigSecretProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigSecretProvider")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
