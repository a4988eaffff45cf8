//! Peer removal orchestration
//!
//! validate → connect → one remove-peer write → (optional) read-back.
//! There is no internal retry; redelivery of the termination event is the
//! retry mechanism.

use log::{debug, error, info, warn};
use serde_json::Value;

use crate::consensus::client::{LogicalClient, StoreConnector};
use crate::error::{ReaperResult, RemovalCallError};
use crate::security::Credential;
use crate::types::{NodeRemovalRequest, RemovalOutcome, RemovePeerBody};

/// Logical path of the raft remove-peer operation
pub const REMOVE_PEER_PATH: &str = "sys/storage/raft/remove-peer";

/// Logical path listing the current raft configuration
pub const RAFT_CONFIGURATION_PATH: &str = "sys/storage/raft/configuration";

/// Removes a single peer per call
pub struct PeerRemover<C> {
    connector: C,
    endpoint: String,
    verify: bool,
}

impl<C: StoreConnector> PeerRemover<C> {
    pub fn new(connector: C, endpoint: impl Into<String>) -> Self {
        PeerRemover {
            connector,
            endpoint: endpoint.into(),
            verify: false,
        }
    }

    /// Read the raft configuration back after a successful removal.
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Remove `request.node_id` from the peer set.
    ///
    /// Validation and client construction failures are returned as errors
    /// before any call reaches the store. A failed write is reported through
    /// `RemovalOutcome::Failure`.
    pub async fn remove_peer(
        &self,
        request: &NodeRemovalRequest,
        credential: &Credential,
    ) -> ReaperResult<RemovalOutcome> {
        request.validate()?;

        let client = self.connector.connect(&self.endpoint, credential).map_err(|e| {
            error!("Cannot build store client for {}: {}", self.endpoint, e);
            e
        })?;

        let node_id = request.node_id.clone();
        info!("Vault node ID to be removed: {}", node_id);

        let body = RemovePeerBody::from(request);
        if let Err(e) = client.write(REMOVE_PEER_PATH, &body).await {
            let cause = classify(&node_id, e);
            match &cause {
                RemovalCallError::PeerNotFound { .. } => warn!("{}; nothing to remove", cause),
                _ => error!("Removing {} failed: {}", node_id, cause),
            }
            return Ok(RemovalOutcome::Failure { node_id, cause });
        }

        let verified = if self.verify {
            verify_removed(&client, &node_id).await
        } else {
            None
        };

        let outcome = RemovalOutcome::Success { node_id, verified };
        match verified {
            Some(false) => warn!("{}", outcome),
            _ => info!("{}", outcome),
        }
        Ok(outcome)
    }
}

/// Map store rejections that mean "already gone" onto `PeerNotFound`.
fn classify(node_id: &str, error: RemovalCallError) -> RemovalCallError {
    match error {
        RemovalCallError::Rejected { status, message } => {
            let lowered = message.to_lowercase();
            if status == 404
                || lowered.contains("not found")
                || lowered.contains("unknown peer")
                || lowered.contains("could not find")
            {
                RemovalCallError::PeerNotFound { node_id: node_id.to_string() }
            } else {
                RemovalCallError::Rejected { status, message }
            }
        }
        other => other,
    }
}

/// `Some(true)` when the node is absent from the configuration.
async fn verify_removed<L: LogicalClient>(client: &L, node_id: &str) -> Option<bool> {
    let document = match client.read(RAFT_CONFIGURATION_PATH).await {
        Ok(Some(document)) => document,
        Ok(None) => {
            warn!("Raft configuration read returned no document; skipping verification");
            return None;
        }
        Err(e) => {
            warn!("Raft configuration read failed, removal of {} unverified: {}", node_id, e);
            return None;
        }
    };

    let servers = match document.pointer("/data/config/servers").and_then(Value::as_array) {
        Some(servers) => servers,
        None => {
            warn!("Raft configuration has no server list; skipping verification");
            return None;
        }
    };

    let listed = servers
        .iter()
        .any(|server| server.get("node_id").and_then(Value::as_str) == Some(node_id));
    debug!("Raft configuration lists {} servers after removal", servers.len());
    Some(!listed)
}
