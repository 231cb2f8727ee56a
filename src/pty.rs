//! PTY session plumbing: spawns a child process behind a `portable_pty`
//! controller and exposes it as two channels — raw output bytes out, write
//! and resize commands in.
//!
//! Follows the task split the teacher's PTY layer uses: a blocking reader
//! task owns a cloned reader half and only ever reads; a second blocking
//! task owns the controller (master) and serialises all writes/resizes
//! through it, fed by a bridge task that moves commands from the async
//! world onto a `std::sync::mpsc` the blocking task can block on.

use std::io::{Read, Write};

use portable_pty::{native_pty_system, CommandBuilder, PtySize};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::error::MuxError;

#[derive(Debug)]
pub enum PtyInput {
    Write(Vec<u8>),
    Resize { cols: u16, rows: u16 },
    Close,
}

#[derive(Debug)]
pub enum PtyOutput {
    Data(Vec<u8>),
    Exit,
}

pub struct PtySession {
    pub input: UnboundedSender<PtyInput>,
    pub output: UnboundedReceiver<PtyOutput>,
}

impl std::fmt::Debug for PtySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtySession").finish_non_exhaustive()
    }
}

/// Spawns `shell` inside a new PTY sized `cols`x`rows`.
///
/// # Errors
///
/// Returns [`MuxError::PtySpawn`] if the PTY pair cannot be opened or the
/// command cannot be spawned.
pub fn spawn(shell: &str, cols: u16, rows: u16) -> miette::Result<PtySession> {
    let pty_system = native_pty_system();
    let pair = pty_system
        .openpty(PtySize { rows, cols, pixel_width: 0, pixel_height: 0 })
        .map_err(|e| MuxError::PtySpawn { shell: shell.to_string(), source: std::io::Error::other(e) })?;

    let cmd = CommandBuilder::new(shell);
    let mut child = pair
        .slave
        .spawn_command(cmd)
        .map_err(|e| MuxError::PtySpawn { shell: shell.to_string(), source: std::io::Error::other(e) })?;
    drop(pair.slave);

    let (input_tx, input_rx) = unbounded_channel::<PtyInput>();
    let (output_tx, output_rx) = unbounded_channel::<PtyOutput>();

    let mut reader = pair
        .master
        .try_clone_reader()
        .map_err(|e| MuxError::PtySpawn { shell: shell.to_string(), source: std::io::Error::other(e) })?;
    let reader_output_tx = output_tx.clone();
    tokio::task::spawn_blocking(move || {
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if reader_output_tx.send(PtyOutput::Data(buf[..n].to_vec())).is_err() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("pty reader task exiting");
    });

    let (bridge_tx, bridge_rx) = std::sync::mpsc::channel::<PtyInput>();
    tokio::task::spawn_blocking(move || {
        let mut writer = match pair.master.take_writer() {
            Ok(w) => w,
            Err(e) => {
                tracing::warn!(error = %e, "could not take pty writer");
                return;
            }
        };
        let master = pair.master;
        while let Ok(cmd) = bridge_rx.recv() {
            match cmd {
                PtyInput::Write(bytes) => {
                    if writer.write_all(&bytes).is_err() {
                        break;
                    }
                }
                PtyInput::Resize { cols, rows } => {
                    let _ = master.resize(PtySize { rows, cols, pixel_width: 0, pixel_height: 0 });
                }
                PtyInput::Close => break,
            }
        }
        tracing::debug!("pty writer task exiting");
    });

    tokio::spawn(async move {
        let mut rx = input_rx;
        while let Some(cmd) = rx.recv().await {
            if bridge_tx.send(cmd).is_err() {
                break;
            }
        }
    });

    tokio::task::spawn_blocking(move || {
        let _ = child.wait();
        let _ = output_tx.send(PtyOutput::Exit);
    });

    Ok(PtySession { input: input_tx, output: output_rx })
}
