//! Consensus store client seam and its Vault HTTP implementation
//!
//! `StoreConnector` builds an authenticated `LogicalClient` for one
//! invocation; nothing is pooled or reused across invocations.

use std::time::Duration;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ClientConstructionError, RemovalCallError};
use crate::security::Credential;

/// Logical read/write against `/v1/{path}`
#[async_trait]
pub trait LogicalClient: Send + Sync {
    /// Write `body` to `path`; returns the response document if one was sent.
    async fn write<B>(&self, path: &str, body: &B) -> Result<Option<Value>, RemovalCallError>
    where
        B: Serialize + Sync + ?Sized;

    /// Read `path`; `None` when the store returns no document.
    async fn read(&self, path: &str) -> Result<Option<Value>, RemovalCallError>;
}

/// Builds an authenticated client bound to an endpoint
pub trait StoreConnector: Send + Sync {
    type Client: LogicalClient;

    fn connect(&self, endpoint: &str, credential: &Credential) -> Result<Self::Client, ClientConstructionError>;
}

/// Transport options mirroring the standard `VAULT_*` client variables
#[derive(Debug, Clone)]
pub struct VaultClientOptions {
    pub namespace: Option<String>,
    /// PEM bundle used in place of the system roots
    pub ca_cert: Option<String>,
    pub skip_verify: bool,
    pub timeout: Duration,
}

impl Default for VaultClientOptions {
    fn default() -> Self {
        VaultClientOptions {
            namespace: None,
            ca_cert: None,
            skip_verify: false,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Connector producing `VaultClient`s
#[derive(Debug, Clone, Default)]
pub struct VaultConnector {
    options: VaultClientOptions,
}

impl VaultConnector {
    pub fn new(options: VaultClientOptions) -> Self {
        VaultConnector { options }
    }
}

impl StoreConnector for VaultConnector {
    type Client = VaultClient;

    fn connect(&self, endpoint: &str, credential: &Credential) -> Result<VaultClient, ClientConstructionError> {
        let base = reqwest::Url::parse(endpoint.trim()).map_err(|e| ClientConstructionError::InvalidAddress {
            address: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        match base.scheme() {
            "http" | "https" => {}
            other => return Err(ClientConstructionError::UnsupportedScheme(other.to_string())),
        }
        if base.host_str().is_none() {
            return Err(ClientConstructionError::InvalidAddress {
                address: endpoint.to_string(),
                reason: "missing host".to_string(),
            });
        }

        let mut headers = HeaderMap::new();
        let mut token = HeaderValue::from_str(credential.token())
            .map_err(|_| ClientConstructionError::InvalidHeader("X-Vault-Token"))?;
        token.set_sensitive(true);
        headers.insert("x-vault-token", token);
        headers.insert("x-vault-request", HeaderValue::from_static("true"));
        if let Some(namespace) = &self.options.namespace {
            let value = HeaderValue::from_str(namespace)
                .map_err(|_| ClientConstructionError::InvalidHeader("X-Vault-Namespace"))?;
            headers.insert("x-vault-namespace", value);
        }

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(self.options.timeout);

        if let Some(path) = &self.options.ca_cert {
            let pem = std::fs::read(path).map_err(|e| ClientConstructionError::CaCertificate {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            let certificate = reqwest::Certificate::from_pem(&pem).map_err(|e| ClientConstructionError::CaCertificate {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            builder = builder.add_root_certificate(certificate);
        }
        if self.options.skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder
            .build()
            .map_err(|e| ClientConstructionError::Builder(e.to_string()))?;

        Ok(VaultClient { base, http })
    }
}

/// Authenticated Vault API client
#[derive(Debug)]
pub struct VaultClient {
    base: reqwest::Url,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct VaultErrors {
    #[serde(default)]
    errors: Vec<String>,
}

impl VaultClient {
    fn url(&self, path: &str) -> String {
        format!(
            "{}/v1/{}",
            self.base.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn finish(response: reqwest::Response) -> Result<Option<Value>, RemovalCallError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RemovalCallError::Transport(e.to_string()))?;

        if status.is_success() {
            if text.trim().is_empty() {
                return Ok(None);
            }
            let document = serde_json::from_str(&text)
                .map_err(|e| RemovalCallError::InvalidResponse(e.to_string()))?;
            return Ok(Some(document));
        }

        let message = serde_json::from_str::<VaultErrors>(&text)
            .ok()
            .filter(|body| !body.errors.is_empty())
            .map(|body| body.errors.join("; "))
            .unwrap_or_else(|| text.trim().to_string());

        Err(match status.as_u16() {
            401 | 403 => RemovalCallError::Unauthorized { status: status.as_u16(), message },
            code => RemovalCallError::Rejected { status: code, message },
        })
    }
}

#[async_trait]
impl LogicalClient for VaultClient {
    async fn write<B>(&self, path: &str, body: &B) -> Result<Option<Value>, RemovalCallError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let response = self
            .http
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| RemovalCallError::Transport(e.to_string()))?;
        Self::finish(response).await
    }

    async fn read(&self, path: &str) -> Result<Option<Value>, RemovalCallError> {
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| RemovalCallError::Transport(e.to_string()))?;
        Self::finish(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential() -> Credential {
        Credential::from_static("s.xyz")
    }

    #[test]
    fn test_connect_builds_versioned_urls() {
        let client = VaultConnector::default()
            .connect("https://vault.example:8200/", &credential())
            .unwrap();
        assert_eq!(
            client.url("sys/storage/raft/remove-peer"),
            "https://vault.example:8200/v1/sys/storage/raft/remove-peer"
        );
    }

    #[test]
    fn test_connect_rejects_malformed_address() {
        let result = VaultConnector::default().connect("not a url", &credential());
        assert!(matches!(result, Err(ClientConstructionError::InvalidAddress { .. })));

        let result = VaultConnector::default().connect("", &credential());
        assert!(matches!(result, Err(ClientConstructionError::InvalidAddress { .. })));

        let result = VaultConnector::default().connect("ftp://vault.example", &credential());
        assert!(matches!(result, Err(ClientConstructionError::UnsupportedScheme(s)) if s == "ftp"));
    }

    #[test]
    fn test_connect_rejects_unprintable_token() {
        let result = VaultConnector::default().connect("https://vault.example:8200", &Credential::from_static("bad\ntoken"));
        assert!(matches!(result, Err(ClientConstructionError::InvalidHeader("X-Vault-Token"))));
    }

    #[test]
    fn test_connect_rejects_unreadable_ca_cert() {
        let connector = VaultConnector::new(VaultClientOptions {
            ca_cert: Some("/nonexistent/ca.pem".to_string()),
            ..VaultClientOptions::default()
        });
        let result = connector.connect("https://vault.example:8200", &credential());
        assert!(matches!(result, Err(ClientConstructionError::CaCertificate { .. })));
    }
}
