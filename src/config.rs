//! CLI surface: shell override, initial demo split, and logging knobs.

use std::path::PathBuf;

use clap::Parser;

/// Which way the first demo split (fired a few seconds after startup,
/// mirroring the original binary's delayed `SplitActivePane` call) divides
/// the initial pane.
#[derive(Debug, Clone, Copy, clap::ValueEnum, PartialEq, Eq)]
pub enum SplitDirection {
    Vertical,
    Horizontal,
}

#[derive(Debug, Parser)]
#[command(name = "sunder", about = "Terminal multiplexer core", version)]
pub struct Cli {
    /// Shell to spawn in the initial pane. Falls back to `$SHELL`, then `/bin/sh`.
    #[arg(long)]
    pub shell: Option<String>,

    /// If set, split the initial pane shortly after startup.
    #[arg(long, value_enum)]
    pub split: Option<SplitDirection>,

    /// Log verbosity when `SUNDER_LOG` isn't set.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Mirror logs to this file in addition to stderr.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    #[must_use]
    pub fn resolve_shell(&self) -> String {
        self.shell
            .clone()
            .or_else(|| std::env::var("SHELL").ok())
            .unwrap_or_else(|| "/bin/sh".to_string())
    }
}
