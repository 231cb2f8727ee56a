//! The typed error hierarchy surfaced to `main`.
//!
//! Protocol-level parse errors are never represented here — per the design
//! notes they are dropped or passed through and only logged at `trace`.

use miette::Diagnostic;

#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum MuxError {
    #[error("could not enter raw terminal mode")]
    #[diagnostic(help("is stdin/stdout attached to a real TTY?"))]
    RawModeSetup(#[source] std::io::Error),

    #[error("could not open a PTY for the initial shell '{shell}'")]
    PtySpawn { shell: String, #[source] source: std::io::Error },

    #[error("failed to resize the outer terminal")]
    OuterResize(#[source] std::io::Error),

    #[error("outer terminal I/O failed")]
    OuterIo(#[source] std::io::Error),

    #[error("leaf pane I/O failed")]
    LeafIo { #[source] source: std::io::Error },

    #[error("failed to install the signal handler")]
    SignalSetup(#[source] std::io::Error),
}

pub type MuxResult<T> = miette::Result<T>;
