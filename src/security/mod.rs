//! Credential handling for the consensus store
//!
//! - `credential`: token and recovery material, zeroized on drop
//! - `resolver`: static and secret-store resolution strategies
//! - `secrets_manager`: SigV4-signed AWS Secrets Manager client

pub mod credential;
pub mod resolver;
pub mod secrets_manager;

// Re-export main types
pub use credential::{Credential, CredentialProvenance, RecoveryKeys};
pub use resolver::{CredentialResolver, SecretStoreResolver, StaticTokenResolver};
pub use secrets_manager::{AwsCredentials, AwsSecretsManager, SecretStore, SecretsManagerSettings};
