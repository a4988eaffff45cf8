//! Per-event removal pipeline: decode → resolve credential → remove peer
//!
//! Each invocation builds its own resolver and store client from the
//! configuration; no state is carried from one event to the next.

use log::{error, info};

use crate::config::{CredentialSource, HandlerConfig};
use crate::consensus::{PeerRemover, StoreConnector, VaultConnector};
use crate::error::{ReaperError, ReaperResult};
use crate::event;
use crate::security::{AwsSecretsManager, CredentialResolver, SecretStore, SecretStoreResolver, StaticTokenResolver};
use crate::types::RemovalOutcome;

/// Removal handler with injectable store and secret-store collaborators
pub struct RemovalHandler<C, S> {
    config: HandlerConfig,
    connector: C,
    secret_store: S,
}

/// Handler wired to Vault and AWS Secrets Manager
pub type DefaultHandler = RemovalHandler<VaultConnector, AwsSecretsManager>;

impl DefaultHandler {
    pub fn from_config(config: HandlerConfig) -> Self {
        let connector = VaultConnector::new(config.vault.clone());
        let secret_store = AwsSecretsManager::new(config.secrets_manager.clone());
        RemovalHandler::new(config, connector, secret_store)
    }
}

impl<C, S> RemovalHandler<C, S>
where
    C: StoreConnector + Clone,
    S: SecretStore + Clone + 'static,
{
    pub fn new(config: HandlerConfig, connector: C, secret_store: S) -> Self {
        RemovalHandler { config, connector, secret_store }
    }

    fn resolver(&self) -> Box<dyn CredentialResolver> {
        match &self.config.credentials {
            CredentialSource::StaticToken(token) => Box::new(StaticTokenResolver::new(token.clone())),
            CredentialSource::SecretStore { region, secret_id } => Box::new(SecretStoreResolver::new(
                self.secret_store.clone(),
                region.clone(),
                secret_id.clone(),
            )),
        }
    }

    /// Run the pipeline and report the removal outcome.
    ///
    /// Errors are returned for anything that stops the pipeline before the
    /// store call; a failed store call comes back as `RemovalOutcome::Failure`.
    pub async fn handle(&self, payload: &[u8]) -> ReaperResult<RemovalOutcome> {
        info!("removePeerHandler has been initiated...");

        let (event, request) = event::decode(payload)?;
        if let Some(detail) = &event.detail {
            info!(
                "Lifecycle hook {} on group {} terminating {}",
                display_or_dash(&detail.lifecycle_hook_name),
                display_or_dash(&detail.auto_scaling_group_name),
                display_or_dash(&detail.ec2_instance_id)
            );
        }

        // Fail before spending a secret fetch on an unusable request
        request.validate()?;

        let resolver = self.resolver();
        let credential = resolver.resolve().await?;
        info!("Store credential resolved via {} strategy", resolver.strategy());

        let remover = PeerRemover::new(self.connector.clone(), self.config.vault_addr.clone())
            .with_verification(self.config.verify_removal);
        remover.remove_peer(&request, &credential).await
    }

    /// Run the pipeline and collapse the outcome into the invocation result.
    pub async fn invoke(&self, payload: &[u8]) -> ReaperResult<()> {
        let result = match self.handle(payload).await {
            Ok(outcome) => outcome.into_result(),
            Err(e) => Err(e),
        };
        match &result {
            Ok(()) => info!("removePeerHandler is now finished"),
            Err(e) => log_failure(e),
        }
        result
    }
}

fn log_failure(error: &ReaperError) {
    error!(
        "removePeerHandler failed ({}; fatal={}, retryable={}): {}",
        error.kind(),
        error.is_fatal(),
        error.can_retry(),
        error
    );
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}
