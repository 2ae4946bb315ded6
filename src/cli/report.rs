//! The `report` command.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use crate::cache::{CacheBackend, JsonFileCache};
use crate::git::GitRepository;
use crate::pipeline::{Pipeline, PipelineOptions};
use crate::release::{DEFAULT_CUTOFF, DEFAULT_TIP};
use crate::report::{write_report, OutputFormat};
use crate::tracker::{TracClient, REQUEST_TIMEOUT};
use crate::utils::settings::Settings;

/// Report command options.
#[derive(Parser)]
pub struct ReportCommand {
    /// Repository to analyze.
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,

    /// Only count commits touching this path (defaults to the whole tree).
    #[arg(long)]
    pub path: Option<String>,

    /// Number of earliest releases to leave out.
    #[arg(long, default_value_t = DEFAULT_CUTOFF)]
    pub cutoff: usize,

    /// Revision closing the newest release window.
    #[arg(long, default_value = DEFAULT_TIP)]
    pub tip: String,

    /// Tracker JSON-RPC endpoint.
    #[arg(long)]
    pub tracker_url: Option<String>,

    /// Tracker request timeout in seconds.
    #[arg(long, default_value_t = REQUEST_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// Contribution cache file.
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl ReportCommand {
    /// Executes the report command.
    pub async fn execute(self) -> Result<()> {
        let settings = Settings::load()?;
        self.run(&settings).await
    }

    /// Runs the report with already loaded settings.
    pub async fn run(self, settings: &Settings) -> Result<()> {
        let options = PipelineOptions {
            path_filter: super::path_filter(self.path, settings),
            cutoff: self.cutoff,
            tip: self.tip,
        };
        let tracker_url = super::tracker_url(self.tracker_url, settings);
        let cache = JsonFileCache::new(super::cache_path(self.cache, settings));

        let repository = GitRepository::open_at(&self.repo)?;
        let tracker = TracClient::new(&tracker_url, Duration::from_secs(self.timeout))?;

        info!(
            repo = %self.repo.display(),
            path = %options.path_filter,
            tracker = %tracker.endpoint(),
            cache = %cache.path().display(),
            "Starting report"
        );

        let mut store = cache.load()?;
        let records = Pipeline::new(&repository, &tracker, &options)
            .run(&mut store)
            .await?;
        cache.save(&store)?;

        match self.output {
            Some(path) => {
                let file = File::create(&path)
                    .with_context(|| format!("Failed to create report file: {}", path.display()))?;
                write_report(self.format, &records, BufWriter::new(file))
            }
            None => {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                write_report(self.format, &records, &mut handle)?;
                handle.flush().context("Failed to flush stdout")
            }
        }
    }
}
