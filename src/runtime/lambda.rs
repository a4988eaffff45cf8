//! AWS Lambda Runtime API loop
//!
//! Polls `/runtime/invocation/next`, runs the removal handler on each event
//! and reports the result. Fatal handler errors are reported and then end
//! the loop so the execution environment is discarded.

use log::{debug, error, info, warn};
use serde::Serialize;

use crate::consensus::StoreConnector;
use crate::error::{ReaperError, ReaperResult, RuntimeApiError};
use crate::runtime::handler::RemovalHandler;
use crate::security::SecretStore;

const API_VERSION: &str = "2018-06-01";
const REQUEST_ID_HEADER: &str = "lambda-runtime-aws-request-id";
const DEADLINE_HEADER: &str = "lambda-runtime-deadline-ms";
const ERROR_TYPE_HEADER: &str = "lambda-runtime-function-error-type";

/// One event handed out by the runtime API
#[derive(Debug, Clone)]
pub struct Invocation {
    pub request_id: String,
    pub deadline_ms: Option<u64>,
    pub payload: Vec<u8>,
}

/// A finished invocation and the result that was reported for it
#[derive(Debug)]
pub struct Completed {
    pub request_id: String,
    pub result: ReaperResult<()>,
}

#[derive(Serialize)]
struct ErrorReport<'a> {
    #[serde(rename = "errorMessage")]
    error_message: String,
    #[serde(rename = "errorType")]
    error_type: &'a str,
}

/// Client for the Lambda Runtime API
pub struct LambdaRuntime {
    base: String,
    http: reqwest::Client,
}

impl LambdaRuntime {
    /// `api` is the `host:port` from `AWS_LAMBDA_RUNTIME_API`.
    pub fn new(api: &str) -> Self {
        LambdaRuntime {
            base: format!("http://{}/{}/runtime", api.trim_end_matches('/'), API_VERSION),
            http: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> Result<Self, RuntimeApiError> {
        match std::env::var("AWS_LAMBDA_RUNTIME_API") {
            Ok(api) if !api.is_empty() => Ok(Self::new(&api)),
            _ => Err(RuntimeApiError::MissingEndpoint),
        }
    }

    pub async fn next_invocation(&self) -> Result<Invocation, RuntimeApiError> {
        let response = self
            .http
            .get(format!("{}/invocation/next", self.base))
            .send()
            .await
            .map_err(|e| RuntimeApiError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(RuntimeApiError::Status { operation: "next", status: response.status().as_u16() });
        }

        let headers = response.headers();
        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(RuntimeApiError::MissingRequestId)?;
        let deadline_ms = headers
            .get(DEADLINE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());

        let payload = response
            .bytes()
            .await
            .map_err(|e| RuntimeApiError::Transport(e.to_string()))?
            .to_vec();

        Ok(Invocation { request_id, deadline_ms, payload })
    }

    /// Report success; the handler has no response payload.
    pub async fn respond(&self, request_id: &str) -> Result<(), RuntimeApiError> {
        let response = self
            .http
            .post(format!("{}/invocation/{}/response", self.base, request_id))
            .body("null")
            .send()
            .await
            .map_err(|e| RuntimeApiError::Transport(e.to_string()))?;
        check(response, "response")
    }

    pub async fn report_error(&self, request_id: &str, error_type: &str, message: String) -> Result<(), RuntimeApiError> {
        let url = format!("{}/invocation/{}/error", self.base, request_id);
        self.post_error(url, "error", error_type, message).await
    }

    /// Report a failure that happened before the first poll; the platform
    /// then fails the pending invocation instead of seeing a bare crash.
    pub async fn report_init_error(&self, error: &ReaperError) -> Result<(), RuntimeApiError> {
        let url = format!("{}/init/error", self.base);
        self.post_error(url, "init/error", error.kind(), error.to_string()).await
    }

    async fn post_error(
        &self,
        url: String,
        operation: &'static str,
        error_type: &str,
        message: String,
    ) -> Result<(), RuntimeApiError> {
        let report = ErrorReport { error_message: message, error_type };
        let response = self
            .http
            .post(url)
            .header(ERROR_TYPE_HEADER, error_type)
            .json(&report)
            .send()
            .await
            .map_err(|e| RuntimeApiError::Transport(e.to_string()))?;
        check(response, operation)
    }

    /// Handle exactly one invocation.
    pub async fn poll_once<C, S>(&self, handler: &RemovalHandler<C, S>) -> Result<Completed, RuntimeApiError>
    where
        C: StoreConnector + Clone,
        S: SecretStore + Clone + 'static,
    {
        let invocation = self.next_invocation().await?;
        debug!(
            "Invocation {} received (deadline {:?}, {} bytes)",
            invocation.request_id,
            invocation.deadline_ms,
            invocation.payload.len()
        );

        let result = handler.invoke(&invocation.payload).await;
        match &result {
            Ok(()) => self.respond(&invocation.request_id).await?,
            Err(e) => {
                self.report_error(&invocation.request_id, e.kind(), e.to_string())
                    .await?
            }
        }

        Ok(Completed { request_id: invocation.request_id, result })
    }

    /// Poll until a fatal handler error or a runtime API failure.
    pub async fn run<C, S>(&self, handler: &RemovalHandler<C, S>) -> Result<(), RuntimeApiError>
    where
        C: StoreConnector + Clone,
        S: SecretStore + Clone + 'static,
    {
        info!("Polling Lambda runtime API at {}", self.base);
        loop {
            let completed = self.poll_once(handler).await?;
            if let Err(e) = completed.result {
                if e.is_fatal() {
                    error!("Stopping runtime after fatal error in {}", completed.request_id);
                    return Err(RuntimeApiError::Fatal { request_id: completed.request_id, source: e });
                }
                warn!("Invocation {} reported failure; awaiting redelivery", completed.request_id);
            }
        }
    }
}

fn check(response: reqwest::Response, operation: &'static str) -> Result<(), RuntimeApiError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(RuntimeApiError::Status { operation, status: response.status().as_u16() })
    }
}
