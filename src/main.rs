//! Binary entry point: parse CLI flags, install logging, size the outer
//! terminal, and hand off to the multiplexer.

use clap::Parser;
use sunder_mux::config::{Cli, SplitDirection};
use sunder_mux::error::MuxError;
use sunder_mux::pane::SplitMode;
use sunder_mux::Multiplexer;

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    let _log_guard = sunder_mux::log::init(&cli.log_level, cli.log_file.as_deref())?;

    let (cols, rows) = crossterm::terminal::size().map_err(MuxError::OuterResize)?;
    tracing::info!(rows, cols, shell = %cli.resolve_shell(), "starting sunder");

    let mux = Multiplexer::new(cli.resolve_shell(), rows, cols);

    if let Some(split) = cli.split {
        let mode = match split {
            SplitDirection::Vertical => SplitMode::Vertical,
            SplitDirection::Horizontal => SplitMode::Horizontal,
        };
        mux.schedule_startup_split(mode);
    }

    mux.run().await
}
