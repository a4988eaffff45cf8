//! Recording stand-ins for the external collaborators, shared by unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::consensus::{LogicalClient, StoreConnector};
use crate::error::{ClientConstructionError, RemovalCallError, ResolutionError, ResolutionResult};
use crate::security::{Credential, SecretStore};

/// Everything the store saw
#[derive(Debug, Clone, Default)]
pub struct StoreCalls {
    /// (endpoint, token)
    pub connects: Vec<(String, String)>,
    /// (path, body)
    pub writes: Vec<(String, Value)>,
    pub reads: Vec<String>,
}

impl StoreCalls {
    pub fn network_calls(&self) -> usize {
        self.writes.len() + self.reads.len()
    }
}

#[derive(Clone, Default)]
pub struct RecordingConnector {
    calls: Arc<Mutex<StoreCalls>>,
    write_results: Arc<Mutex<VecDeque<Result<Option<Value>, RemovalCallError>>>>,
    read_document: Arc<Mutex<Option<Value>>>,
    refuse_connect: bool,
}

impl RecordingConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector whose `connect` always fails
    pub fn refusing() -> Self {
        RecordingConnector { refuse_connect: true, ..Self::default() }
    }

    /// Queue the result of the next write; unqueued writes succeed with no body.
    pub fn push_write_result(&self, result: Result<Option<Value>, RemovalCallError>) {
        self.write_results.lock().unwrap().push_back(result);
    }

    pub fn set_read_document(&self, document: Value) {
        *self.read_document.lock().unwrap() = Some(document);
    }

    pub fn calls(&self) -> StoreCalls {
        self.calls.lock().unwrap().clone()
    }
}

impl StoreConnector for RecordingConnector {
    type Client = RecordingClient;

    fn connect(&self, endpoint: &str, credential: &Credential) -> Result<RecordingClient, ClientConstructionError> {
        if self.refuse_connect {
            return Err(ClientConstructionError::InvalidAddress {
                address: endpoint.to_string(),
                reason: "refused by test connector".to_string(),
            });
        }
        self.calls
            .lock()
            .unwrap()
            .connects
            .push((endpoint.to_string(), credential.token().to_string()));
        Ok(RecordingClient { connector: self.clone() })
    }
}

pub struct RecordingClient {
    connector: RecordingConnector,
}

#[async_trait]
impl LogicalClient for RecordingClient {
    async fn write<B>(&self, path: &str, body: &B) -> Result<Option<Value>, RemovalCallError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let body = serde_json::to_value(body).unwrap();
        self.connector.calls.lock().unwrap().writes.push((path.to_string(), body));
        self.connector
            .write_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(None))
    }

    async fn read(&self, path: &str) -> Result<Option<Value>, RemovalCallError> {
        self.connector.calls.lock().unwrap().reads.push(path.to_string());
        Ok(self.connector.read_document.lock().unwrap().clone())
    }
}

/// Secret store returning a fixed payload
#[derive(Clone)]
pub struct FixedSecretStore {
    payload: Result<String, String>,
    calls: Arc<AtomicUsize>,
}

impl FixedSecretStore {
    pub fn returning(payload: &str) -> Self {
        FixedSecretStore { payload: Ok(payload.to_string()), calls: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn failing(reason: &str) -> Self {
        FixedSecretStore { payload: Err(reason.to_string()), calls: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn fetches(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for FixedSecretStore {
    async fn get_secret_string(&self, _region: &str, _secret_id: &str) -> ResolutionResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payload.clone().map_err(ResolutionError::FetchFailed)
    }
}
