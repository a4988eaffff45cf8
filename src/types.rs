//! Core data types shared by the removal pipeline

use std::fmt;
use serde::{Deserialize, Serialize};

use crate::error::{ReaperResult, RemovalCallError, ValidationError};

/// Request to drop one peer from the raft configuration.
///
/// Node IDs are provisioned to equal the EC2 instance ID, so the request is a
/// direct projection of the termination event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRemovalRequest {
    /// Raft server ID of the departing node
    pub node_id: String,
    /// Autoscaling group that terminated the instance
    pub auto_scaling_group: Option<String>,
    /// Lifecycle hook that delivered the event
    pub lifecycle_hook: Option<String>,
}

impl NodeRemovalRequest {
    pub fn new(node_id: impl Into<String>) -> Self {
        NodeRemovalRequest {
            node_id: node_id.into(),
            auto_scaling_group: None,
            lifecycle_hook: None,
        }
    }

    /// Fails when there is no node to remove.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.node_id.trim().is_empty() {
            return Err(ValidationError::EmptyNodeId);
        }
        Ok(())
    }
}

/// Body of `sys/storage/raft/remove-peer`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovePeerBody {
    pub server_id: String,
}

impl From<&NodeRemovalRequest> for RemovePeerBody {
    fn from(request: &NodeRemovalRequest) -> Self {
        RemovePeerBody { server_id: request.node_id.clone() }
    }
}

/// Observed outcome of one removal attempt.
///
/// A failure is reported, not raised: the caller decides whether it becomes an
/// invocation error.
#[derive(Debug)]
pub enum RemovalOutcome {
    Success {
        node_id: String,
        /// Present only when post-removal verification ran; `Some(true)`
        /// means the node is no longer listed
        verified: Option<bool>,
    },
    Failure {
        node_id: String,
        cause: RemovalCallError,
    },
}

impl RemovalOutcome {
    pub fn node_id(&self) -> &str {
        match self {
            RemovalOutcome::Success { node_id, .. } | RemovalOutcome::Failure { node_id, .. } => node_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RemovalOutcome::Success { .. })
    }

    /// Convert into the invocation result handed back to the host.
    pub fn into_result(self) -> ReaperResult<()> {
        match self {
            RemovalOutcome::Success { .. } => Ok(()),
            RemovalOutcome::Failure { cause, .. } => Err(cause.into()),
        }
    }
}

impl fmt::Display for RemovalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalOutcome::Success { node_id, verified: Some(false) } => {
                write!(f, "{} removed but still listed in raft configuration", node_id)
            }
            RemovalOutcome::Success { node_id, .. } => {
                write!(f, "{} has been purged from raft peer list", node_id)
            }
            RemovalOutcome::Failure { node_id, cause } => {
                write!(f, "failed to remove {}: {}", node_id, cause)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_blank_node_id() {
        assert_eq!(NodeRemovalRequest::new("").validate(), Err(ValidationError::EmptyNodeId));
        assert_eq!(NodeRemovalRequest::new("   ").validate(), Err(ValidationError::EmptyNodeId));
        assert!(NodeRemovalRequest::new("i-0123456789abcdef0").validate().is_ok());
    }

    #[test]
    fn test_remove_peer_body_shape() {
        let body = RemovePeerBody::from(&NodeRemovalRequest::new("i-0123456789abcdef0"));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({"server_id": "i-0123456789abcdef0"}));
    }

    #[test]
    fn test_outcome_into_result() {
        let ok = RemovalOutcome::Success { node_id: "i-1".to_string(), verified: None };
        assert_eq!(ok.to_string(), "i-1 has been purged from raft peer list");
        assert!(ok.into_result().is_ok());

        let failed = RemovalOutcome::Failure {
            node_id: "i-1".to_string(),
            cause: RemovalCallError::PeerNotFound { node_id: "i-1".to_string() },
        };
        assert!(!failed.is_success());
        assert_eq!(failed.node_id(), "i-1");
        let err = failed.into_result().unwrap_err();
        assert!(!err.is_fatal());
    }
}
