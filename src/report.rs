//! Per-release report records and their output formats.

use std::io::Write;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;

use crate::cache::{count_type, ReleaseBucket};
use crate::contribution::ContributionType;
use crate::contributors::ContributorStats;
use crate::release::{ReleaseTag, Window};

/// CSV header, in record field order.
pub const CSV_HEADER: [&str; 9] = [
    "release",
    "contributions",
    "contributors",
    "new_contributors",
    "over_2_contributions",
    "over_10_contributions",
    "bugfixes",
    "optimizations",
    "features",
];

/// Statistics for one release window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseRecord {
    /// Release the window starts at.
    pub release: ReleaseTag,
    /// Total commits.
    pub contributions: usize,
    /// Distinct authors.
    pub contributors: usize,
    /// Authors not seen in an earlier window.
    pub new_contributors: usize,
    /// Authors with two or more commits.
    pub over_2_contributions: usize,
    /// Authors with ten or more commits.
    pub over_10_contributions: usize,
    /// Bugfix tickets.
    pub bugfixes: usize,
    /// Optimization tickets.
    pub optimizations: usize,
    /// Feature tickets.
    pub features: usize,
}

impl ReleaseRecord {
    /// Assembles a record from a window's contributor stats and cache bucket.
    pub fn build(window: &Window, stats: &ContributorStats, bucket: Option<&ReleaseBucket>) -> Self {
        Self {
            release: window.release(),
            contributions: stats.contributions,
            contributors: stats.contributors,
            new_contributors: stats.new_contributors,
            over_2_contributions: stats.over_2_contributions,
            over_10_contributions: stats.over_10_contributions,
            bugfixes: count_type(bucket, ContributionType::Bugfix),
            optimizations: count_type(bucket, ContributionType::Optimization),
            features: count_type(bucket, ContributionType::Feature),
        }
    }

    fn csv_row(&self) -> String {
        [
            self.release.to_string(),
            self.contributions.to_string(),
            self.contributors.to_string(),
            self.new_contributors.to_string(),
            self.over_2_contributions.to_string(),
            self.over_10_contributions.to_string(),
            self.bugfixes.to_string(),
            self.optimizations.to_string(),
            self.features.to_string(),
        ]
        .join(",")
    }
}

/// Report output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Comma-separated values with a header row.
    #[default]
    Csv,
    /// YAML list of records.
    Yaml,
}

/// Writes records as CSV, header first.
pub fn write_csv<W: Write>(records: &[ReleaseRecord], mut writer: W) -> Result<()> {
    // Every field is a number or a dotted version, so nothing needs quoting
    writeln!(writer, "{}", CSV_HEADER.join(",")).context("Failed to write report header")?;
    for record in records {
        writeln!(writer, "{}", record.csv_row()).context("Failed to write report row")?;
    }
    writer.flush().context("Failed to flush report")
}

/// Writes records as a YAML sequence.
pub fn write_yaml<W: Write>(records: &[ReleaseRecord], mut writer: W) -> Result<()> {
    serde_yaml::to_writer(&mut writer, records).context("Failed to write YAML report")?;
    writer.flush().context("Failed to flush report")
}

/// Writes records in `format`.
pub fn write_report<W: Write>(format: OutputFormat, records: &[ReleaseRecord], writer: W) -> Result<()> {
    match format {
        OutputFormat::Csv => write_csv(records, writer),
        OutputFormat::Yaml => write_yaml(records, writer),
    }
}
