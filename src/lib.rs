//! # Raft Peer Reaper
//!
//! Removes a terminated autoscaling instance from a Vault integrated-storage
//! (Raft) peer set. One termination event drives one pipeline:
//! decode the lifecycle event, resolve a store credential, then issue a
//! single `sys/storage/raft/remove-peer` write.

#![warn(clippy::all)]

pub mod config;
pub mod consensus;
pub mod error;
pub mod event;
pub mod runtime;
pub mod security;
pub mod types;
/// Command-line interface and argument parsing
pub mod cli;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types
pub use config::{CredentialSource, HandlerConfig};
pub use consensus::{PeerRemover, VaultConnector};
pub use error::{ReaperError, ReaperResult};
pub use event::TerminationEvent;
pub use runtime::{DefaultHandler, LambdaRuntime, RemovalHandler};
pub use security::{Credential, CredentialResolver};
pub use types::{NodeRemovalRequest, RemovalOutcome};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
