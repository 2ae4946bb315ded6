//! Per-author commit activity within a window.

use std::collections::{BTreeMap, BTreeSet};

/// Commit counts keyed by author name.
pub type AuthorCounts = BTreeMap<String, usize>;

/// Commit count at which an author counts as a repeat contributor.
pub const REPEAT_THRESHOLD: usize = 2;

/// Commit count at which an author counts as a heavy contributor.
pub const HEAVY_THRESHOLD: usize = 10;

/// Contributor statistics for one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContributorStats {
    /// Total commits in the window.
    pub contributions: usize,
    /// Distinct authors with at least one commit.
    pub contributors: usize,
    /// Authors never seen in an earlier window of this run.
    pub new_contributors: usize,
    /// Authors with at least [`REPEAT_THRESHOLD`] commits.
    pub over_2_contributions: usize,
    /// Authors with at least [`HEAVY_THRESHOLD`] commits.
    pub over_10_contributions: usize,
}

impl ContributorStats {
    /// Derives the window totals from its author counts.
    ///
    /// Authors with a zero count are ignored.
    pub fn from_counts(counts: &AuthorCounts, new_contributors: usize) -> Self {
        let active = || counts.values().copied().filter(|count| *count > 0);

        Self {
            contributions: active().sum(),
            contributors: active().count(),
            new_contributors,
            over_2_contributions: active().filter(|c| *c >= REPEAT_THRESHOLD).count(),
            over_10_contributions: active().filter(|c| *c >= HEAVY_THRESHOLD).count(),
        }
    }
}

/// Every author seen so far in a run, in window order.
///
/// Windows must be observed oldest first; the accumulator is threaded
/// through the run by value.
#[derive(Debug, Clone, Default)]
pub struct ContributorHistory {
    seen: BTreeSet<String>,
    windows: usize,
}

impl ContributorHistory {
    /// Records a window's authors and returns its statistics.
    ///
    /// The first window observed has no baseline, so it reports zero new
    /// contributors whoever is present.
    pub fn observe(mut self, counts: &AuthorCounts) -> (Self, ContributorStats) {
        let authors = counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(author, _)| author);

        let new_contributors = if self.windows == 0 {
            0
        } else {
            authors.clone().filter(|a| !self.seen.contains(*a)).count()
        };

        self.seen.extend(authors.cloned());
        self.windows += 1;

        let stats = ContributorStats::from_counts(counts, new_contributors);
        (self, stats)
    }

    /// Returns the number of distinct authors seen so far.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns whether no author has been seen yet.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
