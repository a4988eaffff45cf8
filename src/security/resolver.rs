//! Credential resolution strategies
//!
//! The orchestrator never sees where a token came from; deployments pick a
//! static token or a fetch from the secret store.

use async_trait::async_trait;
use log::{debug, info};

use crate::error::{ResolutionError, ResolutionResult};
use crate::security::credential::Credential;
use crate::security::secrets_manager::SecretStore;

/// Obtains the bearer credential for the consensus store
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    async fn resolve(&self) -> ResolutionResult<Credential>;

    /// Strategy name for logs
    fn strategy(&self) -> &'static str;
}

/// Token supplied directly through configuration
pub struct StaticTokenResolver {
    token: Option<String>,
    source_name: &'static str,
}

impl StaticTokenResolver {
    pub fn new(token: Option<String>) -> Self {
        StaticTokenResolver { token, source_name: "VAULT_TOKEN" }
    }
}

#[async_trait]
impl CredentialResolver for StaticTokenResolver {
    async fn resolve(&self) -> ResolutionResult<Credential> {
        match self.token.as_deref() {
            Some(token) if !token.trim().is_empty() => Ok(Credential::from_static(token)),
            _ => Err(ResolutionError::MissingConfig(self.source_name.to_string())),
        }
    }

    fn strategy(&self) -> &'static str {
        "static"
    }
}

/// Token unmarshalled from a secret store document
pub struct SecretStoreResolver<S> {
    store: S,
    region: String,
    secret_id: String,
}

impl<S: SecretStore> SecretStoreResolver<S> {
    pub fn new(store: S, region: impl Into<String>, secret_id: impl Into<String>) -> Self {
        SecretStoreResolver {
            store,
            region: region.into(),
            secret_id: secret_id.into(),
        }
    }
}

#[async_trait]
impl<S: SecretStore> CredentialResolver for SecretStoreResolver<S> {
    async fn resolve(&self) -> ResolutionResult<Credential> {
        if self.region.trim().is_empty() {
            return Err(ResolutionError::MissingConfig("awsRegion".to_string()));
        }
        if self.secret_id.trim().is_empty() {
            return Err(ResolutionError::MissingConfig("secretID".to_string()));
        }

        debug!("Resolving credential from secret {} in {}", self.secret_id, self.region);
        let payload = self.store.get_secret_string(&self.region, &self.secret_id).await?;
        let credential = Credential::from_secret_string(&payload)?;
        info!(
            "Resolved store credential from secret {} ({} recovery keys withheld)",
            self.secret_id,
            credential.recovery_keys().len()
        );
        Ok(credential)
    }

    fn strategy(&self) -> &'static str {
        "secret-store"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedStore {
        payload: Result<String, String>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SecretStore for FixedStore {
        async fn get_secret_string(&self, _region: &str, _secret_id: &str) -> ResolutionResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.payload.clone().map_err(ResolutionError::FetchFailed)
        }
    }

    fn store(payload: Result<&str, &str>) -> (FixedStore, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let store = FixedStore {
            payload: payload.map(str::to_string).map_err(str::to_string),
            calls: calls.clone(),
        };
        (store, calls)
    }

    #[tokio::test]
    async fn test_static_token() {
        let credential = StaticTokenResolver::new(Some("s.xyz".to_string())).resolve().await.unwrap();
        assert_eq!(credential.token(), "s.xyz");
    }

    #[tokio::test]
    async fn test_static_token_missing_or_empty() {
        for token in [None, Some(String::new()), Some("  ".to_string())] {
            let result = StaticTokenResolver::new(token).resolve().await;
            assert!(matches!(result, Err(ResolutionError::MissingConfig(name)) if name == "VAULT_TOKEN"));
        }
    }

    #[tokio::test]
    async fn test_secret_store_resolution() {
        let (store, calls) = store(Ok(r#"{"RootToken":"t1","RecoveryKeys":["k1","k2"]}"#));
        let resolver = SecretStoreResolver::new(store, "us-east-1", "vault/root");
        let credential = resolver.resolve().await.unwrap();
        assert_eq!(credential.token(), "t1");
        assert_eq!(credential.recovery_keys().len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_secret_store_fetch_failure() {
        let (store, _) = store(Err("AccessDeniedException"));
        let result = SecretStoreResolver::new(store, "us-east-1", "vault/root").resolve().await;
        assert!(matches!(result, Err(ResolutionError::FetchFailed(_))));
    }

    #[tokio::test]
    async fn test_secret_store_malformed_payload() {
        let (store, _) = store(Ok(r#"["not","a","document"]"#));
        let result = SecretStoreResolver::new(store, "us-east-1", "vault/root").resolve().await;
        assert!(matches!(result, Err(ResolutionError::MalformedSecret(_))));
    }

    #[tokio::test]
    async fn test_secret_store_missing_region_skips_fetch() {
        let (store, calls) = store(Ok(r#"{"RootToken":"t1"}"#));
        let result = SecretStoreResolver::new(store, "", "vault/root").resolve().await;
        assert!(matches!(result, Err(ResolutionError::MissingConfig(name)) if name == "awsRegion"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
