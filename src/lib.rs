//! # relstats
//!
//! Per-release contribution statistics for a git repository.
//!
//! Release tags (`major.minor`) split history into windows. For each window
//! relstats counts commits per author, picks up the tickets fixed by those
//! commits (`Fixed #1234`), classifies them through the issue tracker and
//! tallies bugfixes, features and optimizations. Classifications are cached
//! permanently, so each ticket is looked up once.
//!
//! ```no_run
//! use relstats::cache::{CacheBackend, JsonFileCache};
//! use relstats::git::GitRepository;
//! use relstats::pipeline::{Pipeline, PipelineOptions};
//! use relstats::tracker::{TracClient, REQUEST_TIMEOUT};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let repository = GitRepository::open_at(".")?;
//! let tracker = TracClient::new("https://code.djangoproject.com/jsonrpc", REQUEST_TIMEOUT)?;
//! let cache = JsonFileCache::new("contributions.json");
//! let options = PipelineOptions::default();
//!
//! let mut store = cache.load()?;
//! let records = Pipeline::new(&repository, &tracker, &options).run(&mut store).await?;
//! cache.save(&store)?;
//! relstats::report::write_csv(&records, std::io::stdout())?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod cache;
pub mod cli;
pub mod contribution;
pub mod contributors;
pub mod git;
pub mod pipeline;
pub mod release;
pub mod report;
pub mod tickets;
pub mod tracker;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_utils;

pub use crate::cli::Cli;

/// The current version of relstats.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
