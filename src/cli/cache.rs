//! Contribution cache CLI commands.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::cache::{CacheBackend, JsonFileCache};
use crate::utils::settings::Settings;

/// Cache operations.
#[derive(Parser)]
pub struct CacheCommand {
    /// Cache subcommand to execute.
    #[command(subcommand)]
    pub command: CacheSubcommands,
}

/// Cache subcommands.
#[derive(Subcommand)]
pub enum CacheSubcommands {
    /// Prints the cached classifications as YAML.
    Show(ShowCommand),
}

/// Show command options.
#[derive(Parser)]
pub struct ShowCommand {
    /// Contribution cache file.
    #[arg(long)]
    pub cache: Option<PathBuf>,
}

impl CacheCommand {
    /// Executes the cache command.
    pub fn execute(self) -> Result<()> {
        match self.command {
            CacheSubcommands::Show(show_cmd) => show_cmd.execute(),
        }
    }
}

impl ShowCommand {
    /// Executes the show command.
    pub fn execute(self) -> Result<()> {
        let settings = Settings::load()?;
        let stdout = io::stdout();
        self.write_to(&settings, stdout.lock())
    }

    /// Writes the cache selected by the flag or `settings` as YAML.
    pub fn write_to<W: Write>(&self, settings: &Settings, mut writer: W) -> Result<()> {
        let cache = JsonFileCache::new(super::cache_path(self.cache.clone(), settings));
        let store = cache.load()?;

        serde_yaml::to_writer(&mut writer, &store).context("Failed to serialize cache")?;
        writer.flush().context("Failed to flush output")
    }
}
