//! Secret adapters.

mod config_secret_provider;

pub use config_secret_provider::ConfigSecretProvider;
