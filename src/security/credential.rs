//! Credential material for the consensus store
//!
//! Values are zeroized on drop and never reach `Debug` output.

use std::fmt;
use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{ResolutionError, ResolutionResult};

/// Where a credential came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialProvenance {
    Static,
    SecretStore,
}

/// Recovery keys carried alongside the root token.
///
/// Reserved for out-of-band disaster recovery; the removal path never reads them.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct RecoveryKeys(Vec<String>);

impl RecoveryKeys {
    pub fn new(keys: Vec<String>) -> Self {
        RecoveryKeys(keys)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn expose(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Debug for RecoveryKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecoveryKeys([REDACTED; {}])", self.0.len())
    }
}

/// Bearer token plus optional recovery material, scoped to one invocation
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Credential {
    token: String,
    recovery_keys: RecoveryKeys,
    #[zeroize(skip)]
    provenance: CredentialProvenance,
}

impl Credential {
    pub fn from_static(token: impl Into<String>) -> Self {
        Credential {
            token: token.into(),
            recovery_keys: RecoveryKeys::default(),
            provenance: CredentialProvenance::Static,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn recovery_keys(&self) -> &RecoveryKeys {
        &self.recovery_keys
    }

    pub fn provenance(&self) -> CredentialProvenance {
        self.provenance
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"[REDACTED]")
            .field("recovery_keys", &self.recovery_keys)
            .field("provenance", &self.provenance)
            .finish()
    }
}

/// Secret document stored by the cluster bootstrap tooling
#[derive(Deserialize, Zeroize, ZeroizeOnDrop)]
struct SecretDocument {
    #[serde(rename = "RootToken")]
    root_token: String,
    #[serde(rename = "RecoveryKeys", default)]
    recovery_keys: Vec<String>,
}

impl Credential {
    /// Unmarshal a secret payload of the form
    /// `{"RootToken": "...", "RecoveryKeys": ["..."]}`.
    pub fn from_secret_string(payload: &str) -> ResolutionResult<Self> {
        // serde_json errors quote only position and type, never the input
        let document: SecretDocument = serde_json::from_str(payload)
            .map_err(|e| ResolutionError::MalformedSecret(e.to_string()))?;

        if document.root_token.is_empty() {
            return Err(ResolutionError::MalformedSecret("RootToken is empty".to_string()));
        }

        Ok(Credential {
            token: document.root_token.clone(),
            recovery_keys: RecoveryKeys::new(document.recovery_keys.clone()),
            provenance: CredentialProvenance::SecretStore,
        })
    }
}
