//! Trac JSON-RPC client.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::{TicketRecord, TicketTracker, TrackerError};

/// Public Django Trac endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://code.djangoproject.com/jsonrpc";

/// JSON-RPC request body.
#[derive(Serialize)]
struct RpcRequest<'a> {
    method: &'static str,
    params: [&'a str; 1],
}

/// JSON-RPC response body.
#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Trac client speaking the `ticket.get` JSON-RPC method.
pub struct TracClient {
    /// HTTP client for RPC calls.
    client: Client,
    /// JSON-RPC endpoint.
    endpoint: Url,
}

impl TracClient {
    /// Creates a client for `endpoint` with a per-request timeout.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("Invalid tracker endpoint: {endpoint}"))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, endpoint })
    }

    /// Returns the RPC endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Extracts the ticket attributes from a `ticket.get` response.
///
/// Trac answers `[id, created, changed, attributes]`; the attributes are the
/// last element of the result.
fn parse_response(response: RpcResponse) -> Result<TicketRecord, TrackerError> {
    if let Some(error) = response.error.filter(|e| !e.is_null()) {
        return Err(TrackerError::Rpc(error.to_string()));
    }

    let attributes = response
        .result
        .and_then(|mut result| result.pop())
        .ok_or_else(|| TrackerError::InvalidResponse("empty result".to_string()))?;

    serde_json::from_value(attributes).map_err(|e| TrackerError::InvalidResponse(e.to_string()))
}

impl TicketTracker for TracClient {
    fn fetch_ticket<'a>(
        &'a self,
        ticket: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<TicketRecord, TrackerError>> + Send + 'a>> {
        Box::pin(async move {
            let request = RpcRequest {
                method: "ticket.get",
                params: [ticket],
            };

            debug!(url = %self.endpoint, ticket, "Sending ticket.get request");

            let response = self
                .client
                .post(self.endpoint.clone())
                .json(&request)
                .send()
                .await
                .map_err(|e| TrackerError::Network(e.to_string()))?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_else(|e| {
                    debug!("Failed to read error response body: {e}");
                    String::new()
                });
                return Err(TrackerError::RequestFailed(format!(
                    "HTTP {status}: {error_text}"
                )));
            }

            let body: RpcResponse = response
                .json()
                .await
                .map_err(|e| TrackerError::InvalidResponse(e.to_string()))?;

            parse_response(body)
        })
    }
}
