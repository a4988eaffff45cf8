//! Handler configuration
//!
//! Read once from environment-style variables through an injectable lookup
//! and passed by value into each invocation. Nothing here is global.

use std::fmt;
use std::time::Duration;

use crate::consensus::VaultClientOptions;
use crate::error::ConfigError;
use crate::security::SecretsManagerSettings;

/// How the store credential is obtained
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// `VAULT_TOKEN`; `None` when unset, which fails at resolution time
    StaticToken(Option<String>),
    /// Fetch `secret_id` from the secret store in `region`
    SecretStore { region: String, secret_id: String },
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::StaticToken(token) => f
                .debug_tuple("StaticToken")
                .field(&token.as_ref().map(|_| "[REDACTED]"))
                .finish(),
            CredentialSource::SecretStore { region, secret_id } => f
                .debug_struct("SecretStore")
                .field("region", region)
                .field("secret_id", secret_id)
                .finish(),
        }
    }
}

/// Configuration for the removal handler
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// Consensus store address (`VAULT_ADDR`)
    pub vault_addr: String,
    pub credentials: CredentialSource,
    pub vault: VaultClientOptions,
    pub secrets_manager: SecretsManagerSettings,
    /// Read the raft configuration back after removal
    pub verify_removal: bool,
}

impl HandlerConfig {
    pub fn new(vault_addr: impl Into<String>, credentials: CredentialSource) -> Self {
        let vault = VaultClientOptions::default();
        HandlerConfig {
            vault_addr: vault_addr.into(),
            credentials,
            secrets_manager: SecretsManagerSettings {
                endpoint: None,
                timeout: Some(vault.timeout),
            },
            vault,
            verify_removal: false,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let vault_addr = get("VAULT_ADDR").ok_or(ConfigError::Missing("VAULT_ADDR"))?;

        // AWS_REGION is always present inside Lambda, so it only fills in the
        // region once secretID has selected the secret store
        let secret_id = get("secretID");
        let region = get("awsRegion");
        let credentials = match (get("VAULT_TOKEN"), region, secret_id) {
            (Some(token), _, _) => CredentialSource::StaticToken(Some(token)),
            (None, None, None) => CredentialSource::StaticToken(None),
            (None, region, secret_id) => CredentialSource::SecretStore {
                region: region
                    .or_else(|| secret_id.as_ref().and_then(|_| get("AWS_REGION")))
                    .unwrap_or_default(),
                secret_id: secret_id.unwrap_or_default(),
            },
        };

        let timeout = match get("VAULT_CLIENT_TIMEOUT") {
            Some(raw) => parse_duration(&raw).ok_or(ConfigError::Invalid { name: "VAULT_CLIENT_TIMEOUT", value: raw })?,
            None => VaultClientOptions::default().timeout,
        };

        let vault = VaultClientOptions {
            namespace: get("VAULT_NAMESPACE"),
            ca_cert: get("VAULT_CACERT"),
            skip_verify: parse_flag("VAULT_SKIP_VERIFY", get("VAULT_SKIP_VERIFY"))?,
            timeout,
        };

        Ok(HandlerConfig {
            vault_addr,
            credentials,
            vault,
            secrets_manager: SecretsManagerSettings {
                endpoint: get("AWS_ENDPOINT_URL_SECRETS_MANAGER"),
                timeout: Some(timeout),
            },
            verify_removal: parse_flag("REAPER_VERIFY_REMOVAL", get("REAPER_VERIFY_REMOVAL"))?,
        })
    }
}

/// Accepts the spellings the Vault CLI takes (`1`, `t`, `TRUE`, `0`, `f`, `False`) plus yes/no/on/off.
fn parse_flag(name: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("0") | Some("f") | Some("false") | Some("no") | Some("off") => Ok(false),
        Some("1") | Some("t") | Some("true") | Some("yes") | Some("on") => Ok(true),
        Some(_) => Err(ConfigError::Invalid { name, value: value.unwrap_or_default() }),
    }
}

/// Accepts `30`, `30s` or `2m`.
fn parse_duration(raw: &str) -> Option<Duration> {
    let (digits, scale) = if let Some(d) = raw.strip_suffix('m') {
        (d, 60)
    } else if let Some(d) = raw.strip_suffix('s') {
        (d, 1)
    } else {
        (raw, 1)
    };
    let value: u64 = digits.parse().ok()?;
    if value == 0 {
        return None;
    }
    value.checked_mul(scale).map(Duration::from_secs)
}
