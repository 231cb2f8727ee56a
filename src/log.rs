//! `tracing` initialisation: an `EnvFilter` read from `SUNDER_LOG`, mirrored
//! to a rolling file when `--log-file` names one.
//!
//! Mirrors the layered-`Option<Layer>` composition the rest of this
//! codebase's binaries use for startup logging, simplified down to the two
//! layers this crate actually needs (no shared-writer/TUI output layer,
//! since this crate's output goes through the pane compositor, not
//! `tracing`).

use miette::IntoDiagnostic;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global `tracing` subscriber. Call once, from `main`, before
/// any other task starts.
///
/// # Errors
///
/// Returns an error if `log_file` is given but the rolling file appender
/// cannot be created.
pub fn init(level: &str, log_file: Option<&std::path::Path>) -> miette::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let env_filter = EnvFilter::try_from_env("SUNDER_LOG")
        .unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("sunder.log"));
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
                .try_init()
                .into_diagnostic()?;
            Ok(Some(guard))
        }
        None => {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()
                .into_diagnostic()?;
            Ok(None)
        }
    }
}
