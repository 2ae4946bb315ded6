//! Git history queries.

pub mod repository;

use anyhow::Result;

use crate::contributors::AuthorCounts;
use crate::release::Window;

pub use repository::GitRepository;

/// Commits of one window, as the report consumes them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowHistory {
    /// Commits per author.
    pub authors: AuthorCounts,
    /// Commit subject lines, newest first.
    pub subjects: Vec<String>,
}

/// History queries the report needs from version control.
///
/// Every query over a window covers the half-open range `start..end`,
/// limited to commits touching `path` (an empty path means the whole tree).
pub trait VersionControl {
    /// Lists every tag name in the repository.
    fn tag_names(&self) -> Result<Vec<String>>;

    /// Collects author counts and subjects in a single pass over the window.
    fn window_history(&self, window: &Window, path: &str) -> Result<WindowHistory>;

    /// Counts commits per author.
    fn author_counts(&self, window: &Window, path: &str) -> Result<AuthorCounts> {
        Ok(self.window_history(window, path)?.authors)
    }

    /// Lists commit subject lines, newest first.
    fn commit_subjects(&self, window: &Window, path: &str) -> Result<Vec<String>> {
        Ok(self.window_history(window, path)?.subjects)
    }
}
