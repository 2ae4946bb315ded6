//! Shared test doubles for the pipeline collaborators.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::git::{VersionControl, WindowHistory};
use crate::release::Window;
use crate::tracker::{TicketRecord, TicketTracker, TrackerError};

/// In-memory tracker with canned answers per ticket.
///
/// Tickets without an answer fail with an HTTP 404. Every lookup is recorded
/// so tests can assert which tickets were queried.
#[derive(Default)]
pub(crate) struct FakeTracker {
    answers: Mutex<HashMap<String, Result<TicketRecord, TrackerError>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_ticket(self, ticket: &str, category: &str, severity: &str) -> Self {
        self.set_ticket(ticket, category, severity);
        self
    }

    pub(crate) fn with_failure(self, ticket: &str, error: TrackerError) -> Self {
        self.answers
            .lock()
            .unwrap()
            .insert(ticket.to_string(), Err(error));
        self
    }

    /// Replaces the answer for `ticket`.
    pub(crate) fn set_ticket(&self, ticket: &str, category: &str, severity: &str) {
        self.answers
            .lock()
            .unwrap()
            .insert(ticket.to_string(), Ok(TicketRecord::new(category, severity)));
    }

    /// Returns the tickets looked up so far, in order.
    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl TicketTracker for FakeTracker {
    fn fetch_ticket<'a>(
        &'a self,
        ticket: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<TicketRecord, TrackerError>> + Send + 'a>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(ticket.to_string());
            self.answers
                .lock()
                .unwrap()
                .get(ticket)
                .cloned()
                .unwrap_or_else(|| Err(TrackerError::RequestFailed("HTTP 404 Not Found".to_string())))
        })
    }
}

/// In-memory repository keyed by revision range.
///
/// Counts history queries so tests can assert each window is walked once.
#[derive(Default)]
pub(crate) struct FakeRepository {
    tags: Vec<String>,
    windows: HashMap<String, WindowHistory>,
    queries: Mutex<Vec<String>>,
}

impl FakeRepository {
    pub(crate) fn new(tags: &[&str]) -> Self {
        Self {
            tags: tags.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    /// Adds history for the range `range` (e.g. `1.0..1.1`).
    pub(crate) fn with_window(mut self, range: &str, authors: &[(&str, usize)], subjects: &[&str]) -> Self {
        self.windows.insert(
            range.to_string(),
            WindowHistory {
                authors: authors
                    .iter()
                    .map(|(author, count)| ((*author).to_string(), *count))
                    .collect(),
                subjects: subjects.iter().map(ToString::to_string).collect(),
            },
        );
        self
    }

    /// Returns the revision ranges queried so far, in order.
    pub(crate) fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl VersionControl for FakeRepository {
    fn tag_names(&self) -> Result<Vec<String>> {
        Ok(self.tags.clone())
    }

    fn window_history(&self, window: &Window, _path: &str) -> Result<WindowHistory> {
        let range = window.revision_range();
        self.queries.lock().unwrap().push(range.clone());
        Ok(self.windows.get(&range).cloned().unwrap_or_default())
    }
}
