//! Contribution classification from tracker metadata.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::ContributionStore;
use crate::release::ReleaseTag;
use crate::tickets::TicketReference;
use crate::tracker::{TicketRecord, TicketTracker};

/// Severity Trac reports for tickets that hold up a release.
const RELEASE_BLOCKER_SEVERITY: &str = "release blocker";

/// Classification errors that abort the run.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ClassifyError {
    /// The tracker used a category outside the known taxonomy.
    #[error("Unknown tracker category {category:?} on ticket #{ticket}")]
    UnknownCategory {
        /// Ticket carrying the category.
        ticket: String,
        /// Category as reported by the tracker.
        category: String,
    },
}

/// Kind of change a ticket represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributionType {
    /// Defect fix.
    Bugfix,
    /// New functionality.
    Feature,
    /// Cleanup or improvement of existing functionality.
    Optimization,
    /// Explicitly uncategorized on the tracker.
    Uncategorized,
}

impl ContributionType {
    /// Maps a tracker category onto a contribution type.
    ///
    /// The table is closed: a category it does not list is an error rather
    /// than a fallback, so tracker taxonomy changes surface immediately.
    pub fn from_tracker(category: &str) -> Option<Self> {
        match category {
            "Bug" | "defect" => Some(Self::Bugfix),
            "New feature" => Some(Self::Feature),
            "enhancement" | "Cleanup/optimization" => Some(Self::Optimization),
            "Uncategorized" | "" => Some(Self::Uncategorized),
            _ => None,
        }
    }
}

/// A classified ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    /// Contribution type.
    #[serde(rename = "type")]
    pub kind: ContributionType,
    /// Whether the fix was backported onto a release branch.
    pub backport: bool,
    /// Whether the ticket was a release blocker.
    pub release_blocker: bool,
}

impl Contribution {
    /// Builds a contribution from a tracker record.
    pub fn from_record(
        reference: &TicketReference,
        record: &TicketRecord,
    ) -> Result<Self, ClassifyError> {
        let kind = ContributionType::from_tracker(&record.category).ok_or_else(|| {
            ClassifyError::UnknownCategory {
                ticket: reference.ticket.clone(),
                category: record.category.clone(),
            }
        })?;

        Ok(Self {
            kind,
            backport: reference.backport,
            release_blocker: record.severity.eq_ignore_ascii_case(RELEASE_BLOCKER_SEVERITY),
        })
    }
}

/// Resolves ticket references into contributions through a tracker.
pub struct ContributionClassifier<'a> {
    tracker: &'a dyn TicketTracker,
}

impl<'a> ContributionClassifier<'a> {
    /// Creates a classifier backed by `tracker`.
    pub fn new(tracker: &'a dyn TicketTracker) -> Self {
        Self { tracker }
    }

    /// Classifies one ticket.
    ///
    /// Returns `Ok(None)` when the tracker lookup fails; the ticket is left
    /// for a later run. An unknown category is an error.
    pub async fn classify(
        &self,
        reference: &TicketReference,
    ) -> Result<Option<Contribution>, ClassifyError> {
        let record = match self.tracker.fetch_ticket(&reference.ticket).await {
            Ok(record) => record,
            Err(e) => {
                warn!(ticket = %reference.ticket, error = %e, "Skipping ticket, tracker lookup failed");
                return Ok(None);
            }
        };

        Contribution::from_record(reference, &record).map(Some)
    }

    /// Classifies one ticket and records it under `release`.
    ///
    /// Returns whether a contribution was stored.
    pub async fn classify_into(
        &self,
        release: ReleaseTag,
        reference: &TicketReference,
        store: &mut ContributionStore,
    ) -> Result<bool, ClassifyError> {
        let Some(contribution) = self.classify(reference).await? else {
            return Ok(false);
        };

        debug!(
            %release,
            ticket = %reference.ticket,
            kind = ?contribution.kind,
            backport = contribution.backport,
            "Classified ticket"
        );

        Ok(store.put(release, &reference.ticket, contribution))
    }
}
