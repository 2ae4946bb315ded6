//! CLI interface for relstats.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::cache::DEFAULT_CACHE_FILE;
use crate::tracker::trac::DEFAULT_ENDPOINT;
use crate::utils::settings::{Settings, CACHE_VAR, PATH_FILTER_VAR, TRACKER_URL_VAR};

pub mod cache;
pub mod report;

/// relstats: per-release contribution statistics.
#[derive(Parser)]
#[command(name = "relstats")]
#[command(about = "Per-release contribution statistics from git history and tracker metadata", long_about = None)]
#[command(version)]
pub struct Cli {
    /// The main command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Main command categories.
#[derive(Subcommand)]
pub enum Commands {
    /// Computes the per-release report.
    Report(report::ReportCommand),
    /// Contribution cache operations.
    Cache(cache::CacheCommand),
}

impl Cli {
    /// Executes the CLI command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Report(report_cmd) => report_cmd.execute().await,
            Commands::Cache(cache_cmd) => cache_cmd.execute(),
        }
    }
}

/// Resolves a setting: flag, then environment, then the settings file.
pub(crate) fn resolve_setting<T: From<String>>(flag: Option<T>, settings: &Settings, key: &str) -> Option<T> {
    flag.or_else(|| settings.get_env_var(key).map(T::from))
}

/// Resolves the cache file, defaulting to [`DEFAULT_CACHE_FILE`].
pub(crate) fn cache_path(flag: Option<PathBuf>, settings: &Settings) -> PathBuf {
    resolve_setting(flag, settings, CACHE_VAR).unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_FILE))
}

/// Resolves the path filter, defaulting to the whole tree.
pub(crate) fn path_filter(flag: Option<String>, settings: &Settings) -> String {
    resolve_setting(flag, settings, PATH_FILTER_VAR).unwrap_or_default()
}

/// Resolves the tracker endpoint, defaulting to [`DEFAULT_ENDPOINT`].
pub(crate) fn tracker_url(flag: Option<String>, settings: &Settings) -> String {
    resolve_setting(flag, settings, TRACKER_URL_VAR).unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
}
