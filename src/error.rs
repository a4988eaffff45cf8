//! Error types for the peer reaper
//!
//! Each pipeline stage owns its error enum; `ReaperError` unifies them and
//! carries the fatal/retryable classification the invocation host acts on.

use thiserror::Error;

/// Main error type for a removal invocation
#[derive(Error, Debug)]
pub enum ReaperError {
    /// Inbound event could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Removal request failed validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Credential could not be obtained
    #[error("Credential resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// Consensus store client could not be built
    #[error("Client construction error: {0}")]
    ClientConstruction(#[from] ClientConstructionError),

    /// Administrative write against the consensus store failed
    #[error("Removal call error: {0}")]
    RemovalCall(#[from] RemovalCallError),

    /// Configuration surface is incomplete or invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ReaperError {
    /// Errors that cannot succeed without operator intervention.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ReaperError::ClientConstruction(_) | ReaperError::Config(_))
    }

    /// Whether redelivering the same event could plausibly succeed.
    pub fn can_retry(&self) -> bool {
        match self {
            ReaperError::Resolution(ResolutionError::FetchFailed(_)) => true,
            ReaperError::RemovalCall(e) => e.can_retry(),
            _ => false,
        }
    }

    /// Short machine-readable kind, reported as `errorType` to the runtime.
    pub fn kind(&self) -> &'static str {
        match self {
            ReaperError::Decode(_) => "DecodeError",
            ReaperError::Validation(_) => "ValidationError",
            ReaperError::Resolution(ResolutionError::MissingConfig(_)) => "ResolutionError.MissingConfig",
            ReaperError::Resolution(ResolutionError::FetchFailed(_)) => "ResolutionError.FetchFailed",
            ReaperError::Resolution(ResolutionError::MalformedSecret(_)) => "ResolutionError.MalformedSecret",
            ReaperError::ClientConstruction(_) => "ClientConstructionError",
            ReaperError::RemovalCall(RemovalCallError::PeerNotFound { .. }) => "RemovalCallError.PeerNotFound",
            ReaperError::RemovalCall(_) => "RemovalCallError",
            ReaperError::Config(_) => "ConfigError",
        }
    }
}

/// Termination event decoding errors
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Payload is not valid JSON or fields have the wrong type
    #[error("Invalid event payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Envelope has no `detail` object
    #[error("Event has no lifecycle detail")]
    MissingDetail,
}

/// Removal request validation errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Node identifier is empty or whitespace
    #[error("Node ID to remove is empty")]
    EmptyNodeId,
}

/// Credential resolution errors
#[derive(Error, Debug)]
pub enum ResolutionError {
    /// A required configuration value is absent or empty
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    /// Secret store transport or authorization failure
    #[error("Secret fetch failed: {0}")]
    FetchFailed(String),

    /// Secret payload is not the expected document
    #[error("Malformed secret: {0}")]
    MalformedSecret(String),
}

/// Consensus store client construction errors
#[derive(Error, Debug)]
pub enum ClientConstructionError {
    /// Endpoint address does not parse as a URL
    #[error("Invalid store address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// Endpoint address uses something other than http/https
    #[error("Unsupported scheme in store address: {0}")]
    UnsupportedScheme(String),

    /// CA bundle could not be read or parsed
    #[error("CA certificate {path}: {reason}")]
    CaCertificate { path: String, reason: String },

    /// Token or namespace is not a valid header value
    #[error("Invalid header value for {0}")]
    InvalidHeader(&'static str),

    /// HTTP client builder rejected the configuration
    #[error("HTTP client build failed: {0}")]
    Builder(String),
}

/// Administrative write errors
#[derive(Error, Debug)]
pub enum RemovalCallError {
    /// Connection, TLS or timeout failure
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Token rejected by the store
    #[error("Permission denied (status {status}): {message}")]
    Unauthorized { status: u16, message: String },

    /// Target peer is not in the peer set
    #[error("Peer {node_id} not found in raft configuration")]
    PeerNotFound { node_id: String },

    /// Any other non-success response
    #[error("Store rejected request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    /// Response body could not be interpreted
    #[error("Invalid response from store: {0}")]
    InvalidResponse(String),
}

impl RemovalCallError {
    pub fn can_retry(&self) -> bool {
        match self {
            RemovalCallError::Transport(_) => true,
            RemovalCallError::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required variable is absent or empty
    #[error("Required variable {0} is not set")]
    Missing(&'static str),

    /// Variable is present but cannot be interpreted
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Lambda Runtime API errors
#[derive(Error, Debug)]
pub enum RuntimeApiError {
    /// `AWS_LAMBDA_RUNTIME_API` is not set
    #[error("AWS_LAMBDA_RUNTIME_API is not set; not running inside Lambda?")]
    MissingEndpoint,

    /// Runtime API could not be reached
    #[error("Runtime API transport failure: {0}")]
    Transport(String),

    /// Runtime API answered with an unexpected status
    #[error("Runtime API returned status {status} for {operation}")]
    Status { operation: &'static str, status: u16 },

    /// Next-invocation response carried no request ID
    #[error("Invocation is missing the Lambda-Runtime-Aws-Request-Id header")]
    MissingRequestId,

    /// A fatal handler error ends the runtime loop
    #[error("Fatal error in invocation {request_id}: {source}")]
    Fatal {
        request_id: String,
        #[source]
        source: ReaperError,
    },
}

/// Result type for reaper operations
pub type ReaperResult<T> = Result<T, ReaperError>;

/// Result type for credential resolution
pub type ResolutionResult<T> = Result<T, ResolutionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let err: ReaperError = ClientConstructionError::UnsupportedScheme("ftp".to_string()).into();
        assert!(err.is_fatal());
        assert!(!err.can_retry());

        let err: ReaperError = RemovalCallError::PeerNotFound { node_id: "i-1".to_string() }.into();
        assert!(!err.is_fatal());
        assert!(!err.can_retry());
        assert_eq!(err.kind(), "RemovalCallError.PeerNotFound");
    }

    #[test]
    fn test_retry_classification() {
        let err: ReaperError = RemovalCallError::Transport("connection reset".to_string()).into();
        assert!(err.can_retry());

        let err: ReaperError = RemovalCallError::Rejected { status: 503, message: "sealed".to_string() }.into();
        assert!(err.can_retry());

        let err: ReaperError = RemovalCallError::Rejected { status: 400, message: "bad".to_string() }.into();
        assert!(!err.can_retry());

        let err: ReaperError = ResolutionError::FetchFailed("timeout".to_string()).into();
        assert!(err.can_retry());
        assert_eq!(err.kind(), "ResolutionError.FetchFailed");
    }
}
