//! Termination event adapter
//!
//! Decodes the EventBridge envelope for an EC2 Auto Scaling
//! `EC2 Instance-terminate Lifecycle Action` into a `NodeRemovalRequest`.
//! Pure; no I/O.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DecodeError;
use crate::types::NodeRemovalRequest;

/// Lifecycle action fields delivered under `detail`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleActionDetail {
    #[serde(rename = "EC2InstanceId", default, deserialize_with = "null_as_empty")]
    pub ec2_instance_id: String,
    #[serde(rename = "AutoScalingGroupName", default, deserialize_with = "null_as_empty")]
    pub auto_scaling_group_name: String,
    /// Used by the provider to acknowledge hook completion; carried, never consumed
    #[serde(rename = "LifecycleActionToken", default, deserialize_with = "null_as_empty")]
    pub lifecycle_action_token: String,
    #[serde(rename = "LifecycleHookName", default, deserialize_with = "null_as_empty")]
    pub lifecycle_hook_name: String,
    #[serde(rename = "NotificationMetadata", default, deserialize_with = "null_as_empty")]
    pub notification_metadata: String,
}

/// Raw inbound notification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "detail-type", default)]
    pub detail_type: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    /// `None` only when the key is absent; `"detail": null` decodes as an empty detail
    #[serde(default, deserialize_with = "null_as_empty_detail")]
    pub detail: Option<LifecycleActionDetail>,
}

impl TerminationEvent {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Project onto the removal request.
    ///
    /// An absent, null or empty instance ID decodes to an empty node ID; the
    /// orchestrator rejects it before any network call.
    pub fn to_request(&self) -> Result<NodeRemovalRequest, DecodeError> {
        let detail = self.detail.as_ref().ok_or(DecodeError::MissingDetail)?;
        Ok(NodeRemovalRequest {
            node_id: detail.ec2_instance_id.clone(),
            auto_scaling_group: non_empty(&detail.auto_scaling_group_name),
            lifecycle_hook: non_empty(&detail.lifecycle_hook_name),
        })
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_empty_detail<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<LifecycleActionDetail>, D::Error> {
    Ok(Some(Option::<LifecycleActionDetail>::deserialize(deserializer)?.unwrap_or_default()))
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Decode raw event bytes into a removal request.
pub fn decode(bytes: &[u8]) -> Result<(TerminationEvent, NodeRemovalRequest), DecodeError> {
    let event = TerminationEvent::from_slice(bytes)?;
    let request = event.to_request()?;
    Ok((event, request))
}
