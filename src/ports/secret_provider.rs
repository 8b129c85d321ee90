//! SecretProvider port - Source of the shared webhook signing secret.
//!
//! The secret is the value passed to the platform when the subscription was
//! created. Where it lives (environment, secret store) is up to the adapter.

use secrecy::SecretString;

/// Port for reading the webhook signing secret.
pub trait SecretProvider: Send + Sync {
    /// Returns the current signing secret.
    fn secret(&self) -> SecretString;
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    struct FixedSecret;

    impl SecretProvider for FixedSecret {
        fn secret(&self) -> SecretString {
            SecretString::new("fixed".to_string())
        }
    }

    // Compile-time check that trait is object-safe
    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn SecretProvider) {}

    #[test]
    fn provider_is_usable_behind_arc() {
        let provider: std::sync::Arc<dyn SecretProvider> = std::sync::Arc::new(FixedSecret);
        assert_eq!(provider.secret().expose_secret(), "fixed");
    }
}
