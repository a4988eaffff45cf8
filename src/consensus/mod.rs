//! Consensus store membership management
//!
//! Only the administrative remove-peer call is issued here; safe membership
//! change is the store's own responsibility.

pub mod client;
pub mod orchestrator;

pub use client::{LogicalClient, StoreConnector, VaultClient, VaultClientOptions, VaultConnector};
pub use orchestrator::{PeerRemover, RAFT_CONFIGURATION_PATH, REMOVE_PEER_PATH};
