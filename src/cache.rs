//! Permanent store of classified contributions.
//!
//! Classifications are assumed never to change, so entries are only ever
//! added. The in-memory [`ContributionStore`] is the key-value view the
//! pipeline works on; a [`CacheBackend`] loads it at start and saves it in
//! full at the end of a run.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::contribution::{Contribution, ContributionType};
use crate::release::ReleaseTag;

/// Default cache file name.
pub const DEFAULT_CACHE_FILE: &str = "contributions.json";

/// Contributions of one release, keyed by ticket id.
pub type ReleaseBucket = BTreeMap<String, Contribution>;

/// Contributions keyed by release, then ticket id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContributionStore {
    releases: BTreeMap<ReleaseTag, ReleaseBucket>,
}

impl ContributionStore {
    /// Returns the contribution recorded for `ticket` under `release`.
    pub fn get(&self, release: ReleaseTag, ticket: &str) -> Option<&Contribution> {
        self.releases.get(&release)?.get(ticket)
    }

    /// Returns whether `ticket` is already classified under `release`.
    pub fn contains(&self, release: ReleaseTag, ticket: &str) -> bool {
        self.get(release, ticket).is_some()
    }

    /// Records a contribution unless the ticket is already present.
    ///
    /// Existing entries are never overwritten. Returns whether the entry was
    /// inserted.
    pub fn put(&mut self, release: ReleaseTag, ticket: &str, contribution: Contribution) -> bool {
        let bucket = self.releases.entry(release).or_default();
        if bucket.contains_key(ticket) {
            return false;
        }
        bucket.insert(ticket.to_string(), contribution);
        true
    }

    /// Returns all contributions recorded under `release`.
    pub fn bucket(&self, release: ReleaseTag) -> Option<&ReleaseBucket> {
        self.releases.get(&release)
    }

    /// Returns the total number of contributions across releases.
    pub fn len(&self) -> usize {
        self.releases.values().map(BTreeMap::len).sum()
    }

    /// Returns whether the store holds no contributions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Counts the contributions of `kind` in a bucket.
pub fn count_type(bucket: Option<&ReleaseBucket>, kind: ContributionType) -> usize {
    bucket.map_or(0, |bucket| {
        bucket.values().filter(|c| c.kind == kind).count()
    })
}

/// Persistence for a [`ContributionStore`].
pub trait CacheBackend {
    /// Reads the persisted store, or an empty one when nothing was saved yet.
    fn load(&self) -> Result<ContributionStore>;

    /// Persists the full store, replacing whatever was saved before.
    fn save(&self, store: &ContributionStore) -> Result<()>;
}

/// Cache kept as a pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileCache {
    path: PathBuf,
}

impl JsonFileCache {
    /// Creates a cache stored at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the cache file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheBackend for JsonFileCache {
    fn load(&self) -> Result<ContributionStore> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No contribution cache yet, starting empty");
            return Ok(ContributionStore::default());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read cache file: {}", self.path.display()))?;

        let store: ContributionStore = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse cache file: {}", self.path.display()))?;

        debug!(path = %self.path.display(), entries = store.len(), "Loaded contribution cache");
        Ok(store)
    }

    fn save(&self, store: &ContributionStore) -> Result<()> {
        // Write beside the target and rename, so a failed save leaves the old cache intact
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let file = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, store).context("Failed to serialize cache")?;
        writer.write_all(b"\n").context("Failed to write cache")?;

        let file = writer
            .into_inner()
            .map_err(|e| e.into_error())
            .context("Failed to flush cache")?;

        file.persist(&self.path)
            .with_context(|| format!("Failed to write cache file: {}", self.path.display()))?;

        debug!(path = %self.path.display(), entries = store.len(), "Saved contribution cache");
        Ok(())
    }
}
