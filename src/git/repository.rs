//! Git repository operations

use std::path::Path;

use anyhow::{Context, Result};
use git2::{Commit, DiffOptions, Mailmap, Repository, Sort};
use tracing::debug;

use super::{VersionControl, WindowHistory};
use crate::release::Window;

/// Git repository wrapper
pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    /// Open repository at specified path
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::open(path).context("Failed to open git repository")?;

        Ok(Self { repo })
    }

    /// Resolve a revision to a commit
    fn resolve_commit(&self, spec: &str) -> Result<Commit<'_>> {
        self.repo
            .revparse_single(spec)
            .with_context(|| format!("Failed to parse revision: {spec}"))?
            .peel_to_commit()
            .with_context(|| format!("Revision is not a commit: {spec}"))
    }

    /// Commits in the window touching `path`, newest first
    fn window_commits(&self, window: &Window, path: &str) -> Result<Vec<Commit<'_>>> {
        let start = self.resolve_commit(&window.start.name)?;
        let end = self.resolve_commit(&window.end.to_string())?;

        let mut walker = self.repo.revwalk().context("Failed to create revwalk")?;
        walker
            .set_sorting(Sort::TIME)
            .context("Failed to set revwalk sorting")?;
        walker.push(end.id()).context("Failed to push end commit")?;
        walker
            .hide(start.id())
            .context("Failed to hide start commit")?;

        let mut commits = Vec::new();
        for oid in walker {
            let oid = oid.context("Failed to get commit OID from walker")?;
            let commit = self
                .repo
                .find_commit(oid)
                .context("Failed to find commit")?;

            if self.touches_path(&commit, path)? {
                commits.push(commit);
            }
        }

        debug!(
            range = %window.revision_range(),
            path,
            commits = commits.len(),
            "Walked window"
        );

        Ok(commits)
    }

    /// Whether the commit changes anything under `path`.
    ///
    /// A merge only counts when it differs from every parent under `path`.
    /// Side branches behind such merges are still walked.
    fn touches_path(&self, commit: &Commit<'_>, path: &str) -> Result<bool> {
        if path.is_empty() {
            return Ok(true);
        }

        let tree = commit.tree().context("Failed to get commit tree")?;
        let mut opts = DiffOptions::new();
        opts.pathspec(path);

        if commit.parent_count() == 0 {
            let diff = self
                .repo
                .diff_tree_to_tree(None, Some(&tree), Some(&mut opts))
                .context("Failed to create diff for root commit")?;
            return Ok(diff.deltas().len() > 0);
        }

        for parent in commit.parents() {
            let parent_tree = parent.tree().context("Failed to get parent tree")?;
            let diff = self
                .repo
                .diff_tree_to_tree(Some(&parent_tree), Some(&tree), Some(&mut opts))
                .context("Failed to create diff")?;
            if diff.deltas().len() == 0 {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Author name after mailmap resolution
    fn author_name(commit: &Commit<'_>, mailmap: &Mailmap) -> Result<String> {
        let author = commit
            .author_with_mailmap(mailmap)
            .context("Failed to resolve commit author")?;

        Ok(String::from_utf8_lossy(author.name_bytes()).into_owned())
    }
}

impl VersionControl for GitRepository {
    fn tag_names(&self) -> Result<Vec<String>> {
        let tags = self
            .repo
            .tag_names(None)
            .context("Failed to list tags")?;

        Ok(tags.iter().flatten().map(ToString::to_string).collect())
    }

    fn window_history(&self, window: &Window, path: &str) -> Result<WindowHistory> {
        let mailmap = self.repo.mailmap().context("Failed to load mailmap")?;

        let mut history = WindowHistory::default();
        for commit in self.window_commits(window, path)? {
            *history
                .authors
                .entry(Self::author_name(&commit, &mailmap)?)
                .or_default() += 1;

            // Subjects that are not valid UTF-8 still carry their ticket reference
            let subject = commit
                .summary_bytes()
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                .unwrap_or_default();
            history.subjects.push(subject);
        }

        Ok(history)
    }
}
