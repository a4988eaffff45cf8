//! AWS Secrets Manager client
//!
//! Issues `GetSecretValue` over the JSON 1.1 protocol, signed with Signature
//! Version 4. A fresh HTTP client is built per fetch so nothing survives
//! between invocations.

use std::fmt;
use std::time::Duration;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use ring::{digest, hmac};
use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{ResolutionError, ResolutionResult};

const SERVICE: &str = "secretsmanager";
const TARGET: &str = "secretsmanager.GetSecretValue";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Source of a secret payload, keyed by region and secret identifier
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret_string(&self, region: &str, secret_id: &str) -> ResolutionResult<String>;
}

/// Signing credentials for AWS requests
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl AwsCredentials {
    /// Read the standard `AWS_*` variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> ResolutionResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ResolutionError::MissingConfig(name.to_string()))
        };
        Ok(AwsCredentials {
            access_key_id: required("AWS_ACCESS_KEY_ID")?,
            secret_access_key: required("AWS_SECRET_ACCESS_KEY")?,
            session_token: lookup("AWS_SESSION_TOKEN").filter(|v| !v.is_empty()),
        })
    }
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("session_token", &self.session_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Connection settings for Secrets Manager
#[derive(Debug, Clone, Default)]
pub struct SecretsManagerSettings {
    /// Overrides `https://secretsmanager.{region}.amazonaws.com`
    pub endpoint: Option<String>,
    pub timeout: Option<Duration>,
}

/// HTTP implementation of `SecretStore`
#[derive(Debug, Clone, Default)]
pub struct AwsSecretsManager {
    settings: SecretsManagerSettings,
    /// When unset, credentials are read from the environment per fetch
    credentials: Option<AwsCredentials>,
}

#[derive(Deserialize)]
struct GetSecretValueResponse {
    #[serde(rename = "SecretString")]
    secret_string: Option<String>,
}

#[derive(Deserialize)]
struct AwsErrorBody {
    #[serde(rename = "__type", default)]
    error_type: Option<String>,
    #[serde(alias = "Message", default)]
    message: Option<String>,
}

impl AwsSecretsManager {
    pub fn new(settings: SecretsManagerSettings) -> Self {
        AwsSecretsManager { settings, credentials: None }
    }

    pub fn with_credentials(mut self, credentials: AwsCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    fn endpoint(&self, region: &str) -> String {
        match &self.settings.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://{}.{}.amazonaws.com", SERVICE, region),
        }
    }

    fn credentials(&self) -> ResolutionResult<AwsCredentials> {
        match &self.credentials {
            Some(credentials) => Ok(credentials.clone()),
            None => AwsCredentials::from_lookup(|name| std::env::var(name).ok()),
        }
    }
}

#[async_trait]
impl SecretStore for AwsSecretsManager {
    async fn get_secret_string(&self, region: &str, secret_id: &str) -> ResolutionResult<String> {
        if region.is_empty() {
            return Err(ResolutionError::MissingConfig("awsRegion".to_string()));
        }
        if secret_id.is_empty() {
            return Err(ResolutionError::MissingConfig("secretID".to_string()));
        }

        let credentials = self.credentials()?;
        let url = reqwest::Url::parse(&self.endpoint(region))
            .map_err(|e| ResolutionError::FetchFailed(format!("invalid secrets manager endpoint: {}", e)))?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(ResolutionError::FetchFailed("secrets manager endpoint has no host".to_string())),
        };

        let body = serde_json::json!({ "SecretId": secret_id }).to_string();
        let signed = sign_request(&credentials, region, &host, url.path(), body.as_bytes(), Utc::now());

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.settings.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ResolutionError::FetchFailed(e.to_string()))?;

        debug!("Fetching secret {} from {} in {}", secret_id, host, region);

        let mut request = client
            .post(url)
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-target", TARGET)
            .header("x-amz-date", &signed.amz_date)
            .header("authorization", &signed.authorization)
            .body(body);
        if let Some(token) = &credentials.session_token {
            request = request.header("x-amz-security-token", token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ResolutionError::FetchFailed(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ResolutionError::FetchFailed(e.to_string()))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<AwsErrorBody>(&text).ok();
            let kind = detail.as_ref().and_then(|d| d.error_type.clone()).unwrap_or_else(|| "UnknownError".to_string());
            let message = detail.and_then(|d| d.message).unwrap_or_default();
            return Err(ResolutionError::FetchFailed(format!("{} (status {}): {}", kind, status.as_u16(), message)));
        }

        let parsed: GetSecretValueResponse = serde_json::from_str(&text)
            .map_err(|e| ResolutionError::FetchFailed(format!("unreadable GetSecretValue response: {}", e)))?;
        parsed
            .secret_string
            .ok_or_else(|| ResolutionError::MalformedSecret("secret has no SecretString".to_string()))
    }
}

/// Headers produced by SigV4 signing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub amz_date: String,
    pub authorization: String,
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(digest::digest(&digest::SHA256, data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let key = hmac::Key::new(hmac::HMAC_SHA256, key);
    hmac::sign(&key, data).as_ref().to_vec()
}

/// Sign a `GetSecretValue` POST with AWS Signature Version 4.
pub fn sign_request(
    credentials: &AwsCredentials,
    region: &str,
    host: &str,
    path: &str,
    body: &[u8],
    now: DateTime<Utc>,
) -> SignedHeaders {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = now.format("%Y%m%d").to_string();
    let path = if path.is_empty() { "/" } else { path };

    // Header names must be lowercase and sorted
    let mut headers = vec![
        ("content-type", CONTENT_TYPE.to_string()),
        ("host", host.to_string()),
        ("x-amz-date", amz_date.clone()),
    ];
    if let Some(token) = &credentials.session_token {
        headers.push(("x-amz-security-token", token.clone()));
    }
    headers.push(("x-amz-target", TARGET.to_string()));

    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "POST\n{}\n\n{}\n{}\n{}",
        path,
        canonical_headers,
        signed_headers,
        sha256_hex(body)
    );

    let scope = format!("{}/{}/{}/aws4_request", date_stamp, region, SERVICE);
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{}",
        amz_date,
        scope,
        sha256_hex(canonical_request.as_bytes())
    );

    let k_date = hmac_sha256(format!("AWS4{}", credentials.secret_access_key).as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, SERVICE.as_bytes());
    let k_signing = hmac_sha256(&k_service, b"aws4_request");
    let signature = hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes()));

    SignedHeaders {
        amz_date,
        authorization: format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            credentials.access_key_id, scope, signed_headers, signature
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_credentials() -> AwsCredentials {
        AwsCredentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
            session_token: None,
        }
    }

    #[test]
    fn test_sign_request_known_vector() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let body = br#"{"SecretId":"vault/unseal"}"#;
        let signed = sign_request(
            &test_credentials(),
            "us-east-1",
            "secretsmanager.us-east-1.amazonaws.com",
            "/",
            body,
            now,
        );

        assert_eq!(signed.amz_date, "20261019T120000Z");
        assert_eq!(
            signed.authorization,
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20261019/us-east-1/secretsmanager/aws4_request, \
             SignedHeaders=content-type;host;x-amz-date;x-amz-target, \
             Signature=69cfb3d35581e97efbad6e6e0c22df6d5787fc81f18de2b95f79b9304fd250b2"
        );
    }

    #[test]
    fn test_session_token_is_signed() {
        let mut credentials = test_credentials();
        credentials.session_token = Some("session".to_string());
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let signed = sign_request(&credentials, "eu-west-1", "localhost:4566", "/", b"{}", now);
        assert!(signed
            .authorization
            .contains("SignedHeaders=content-type;host;x-amz-date;x-amz-security-token;x-amz-target"));
        assert!(signed.authorization.contains("/20261019/eu-west-1/secretsmanager/aws4_request"));
    }

    #[test]
    fn test_credentials_from_lookup() {
        let missing = AwsCredentials::from_lookup(|_| None);
        assert!(matches!(missing, Err(ResolutionError::MissingConfig(name)) if name == "AWS_ACCESS_KEY_ID"));

        let credentials = AwsCredentials::from_lookup(|name| match name {
            "AWS_ACCESS_KEY_ID" => Some("AKID".to_string()),
            "AWS_SECRET_ACCESS_KEY" => Some("secret".to_string()),
            "AWS_SESSION_TOKEN" => Some(String::new()),
            _ => None,
        })
        .unwrap();
        assert_eq!(credentials.session_token, None);
        assert!(!format!("{:?}", credentials).contains("secret\""));
    }

    #[tokio::test]
    async fn test_missing_secret_id_fails_before_fetch() {
        let store = AwsSecretsManager::default().with_credentials(test_credentials());
        let result = store.get_secret_string("us-east-1", "").await;
        assert!(matches!(result, Err(ResolutionError::MissingConfig(name)) if name == "secretID"));
    }
}
