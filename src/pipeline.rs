//! Release-by-release aggregation.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cache::ContributionStore;
use crate::contribution::ContributionClassifier;
use crate::contributors::ContributorHistory;
use crate::git::VersionControl;
use crate::release::{sequence_windows, Window, DEFAULT_CUTOFF, DEFAULT_TIP};
use crate::report::ReleaseRecord;
use crate::tickets::pending_tickets;
use crate::tracker::TicketTracker;

/// Pipeline parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Path the statistics are restricted to; empty for the whole tree.
    pub path_filter: String,
    /// Number of earliest releases to skip.
    pub cutoff: usize,
    /// Revision closing the newest window.
    pub tip: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            path_filter: String::new(),
            cutoff: DEFAULT_CUTOFF,
            tip: DEFAULT_TIP.to_string(),
        }
    }
}

/// Builds the release report from version control and the tracker.
pub struct Pipeline<'a> {
    vcs: &'a dyn VersionControl,
    classifier: ContributionClassifier<'a>,
    options: &'a PipelineOptions,
}

impl<'a> Pipeline<'a> {
    /// Creates a pipeline over the given collaborators.
    pub fn new(
        vcs: &'a dyn VersionControl,
        tracker: &'a dyn TicketTracker,
        options: &'a PipelineOptions,
    ) -> Self {
        Self {
            vcs,
            classifier: ContributionClassifier::new(tracker),
            options,
        }
    }

    /// Produces one record per window, oldest release first.
    ///
    /// Newly classified tickets are added to `store`; existing entries are
    /// never queried again.
    pub async fn run(&self, store: &mut ContributionStore) -> Result<Vec<ReleaseRecord>> {
        let tags = self.vcs.tag_names()?;
        let windows = sequence_windows(&tags, self.options.cutoff, &self.options.tip)?;
        info!(windows = windows.len(), "Processing release windows");

        let mut history = ContributorHistory::default();
        let mut records = Vec::with_capacity(windows.len());
        for window in &windows {
            let (next, record) = self
                .process_window(window, history, store)
                .await
                .with_context(|| format!("Failed to process release {}", window.release()))?;
            history = next;
            records.push(record);
        }

        Ok(records)
    }

    async fn process_window(
        &self,
        window: &Window,
        history: ContributorHistory,
        store: &mut ContributionStore,
    ) -> Result<(ContributorHistory, ReleaseRecord)> {
        let release = window.release();
        let path = self.options.path_filter.as_str();

        let commits = self.vcs.window_history(window, path)?;
        let (history, stats) = history.observe(&commits.authors);

        let pending = pending_tickets(commits.subjects.iter().map(String::as_str), |ticket| {
            store.contains(release, ticket)
        });
        debug!(%release, pending = pending.len(), "Tickets to classify");

        let mut classified = 0;
        for reference in &pending {
            if self.classifier.classify_into(release, reference, store).await? {
                classified += 1;
            }
        }

        info!(
            %release,
            range = %window.revision_range(),
            contributions = stats.contributions,
            classified,
            skipped = pending.len() - classified,
            "Processed release"
        );

        let record = ReleaseRecord::build(window, &stats, store.bucket(release));
        Ok((history, record))
    }
}
