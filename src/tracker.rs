//! Issue tracker lookups.

pub mod trac;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub use trac::TracClient;

/// Default HTTP request timeout for tracker calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Ticket fields the classifier relies on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TicketRecord {
    /// Free-text ticket type, e.g. `Bug` or `New feature`.
    #[serde(rename = "type")]
    pub category: String,
    /// Free-text severity, e.g. `Normal` or `Release blocker`.
    pub severity: String,
}

impl TicketRecord {
    /// Creates a record.
    pub fn new(category: impl Into<String>, severity: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            severity: severity.into(),
        }
    }
}

/// Failures looking up a single ticket.
///
/// None of these are fatal: the ticket is left unclassified and retried on
/// the next run.
#[derive(Error, Debug, Clone)]
pub enum TrackerError {
    /// Connection, TLS or timeout failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The tracker answered with a non-success HTTP status.
    #[error("Tracker request failed: {0}")]
    RequestFailed(String),

    /// The tracker returned an RPC-level error.
    #[error("Tracker RPC error: {0}")]
    Rpc(String),

    /// The response body did not have the expected shape.
    #[error("Invalid response format from tracker: {0}")]
    InvalidResponse(String),
}

/// Trait for issue tracker clients.
pub trait TicketTracker: Send + Sync {
    /// Fetches the current record of a ticket.
    fn fetch_ticket<'a>(
        &'a self,
        ticket: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<TicketRecord, TrackerError>> + Send + 'a>>;
}
