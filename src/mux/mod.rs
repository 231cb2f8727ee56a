//! The multiplexer: owns the pane tree, drives the render loop, demuxes
//! stdin into pane input and split shortcuts, and watches for terminal
//! resize.

use std::sync::Arc;

use futures_util::stream::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};

use crate::error::MuxError;
use crate::pane::{Anchor, Container, Leaf, Pane, PaneId, SplitMode, Status};

/// How many dirty-pane notifications can queue before a producer blocks.
/// Render is cheap and frequent; a deep backlog here would only mean stale
/// frames, so this stays small.
const UPDATE_CHANNEL_CAPACITY: usize = 255;
/// How many rendered bytes can queue for the real stdout before the render
/// task blocks. Generous: a burst of output (e.g. `cat` on a big file)
/// shouldn't stall the pane that produced it.
const OUTPUT_CHANNEL_CAPACITY: usize = 65535;

/// The byte that begins a split shortcut: Ctrl-A, chosen to match the
/// convention the embedded shells themselves don't otherwise bind.
const SHORTCUT_PREFIX: u8 = 0x01;

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> miette::Result<Self> {
        crossterm::terminal::enable_raw_mode().map_err(MuxError::RawModeSetup)?;
        Ok(RawModeGuard)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = crossterm::terminal::disable_raw_mode() {
            tracing::warn!(error = %e, "failed to restore cooked terminal mode");
        }
    }
}

/// Demuxes the shortcut-prefix byte out of the stdin stream: `Ctrl-A` then
/// `v`/`h` triggers a split, `Ctrl-A` then anything else (including another
/// `Ctrl-A`) forwards both bytes verbatim, as does any byte seen outside the
/// prefixed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShortcutState {
    Idle,
    Pending,
}

enum Demuxed {
    Forward(u8),
    Split(SplitMode),
}

impl ShortcutState {
    fn feed(&mut self, byte: u8) -> Vec<Demuxed> {
        match (*self, byte) {
            (ShortcutState::Idle, SHORTCUT_PREFIX) => {
                *self = ShortcutState::Pending;
                vec![]
            }
            (ShortcutState::Idle, b) => vec![Demuxed::Forward(b)],
            (ShortcutState::Pending, b'v') => {
                *self = ShortcutState::Idle;
                vec![Demuxed::Split(SplitMode::Vertical)]
            }
            (ShortcutState::Pending, b'h') => {
                *self = ShortcutState::Idle;
                vec![Demuxed::Split(SplitMode::Horizontal)]
            }
            (ShortcutState::Pending, b) => {
                *self = ShortcutState::Idle;
                vec![Demuxed::Forward(SHORTCUT_PREFIX), Demuxed::Forward(b)]
            }
        }
    }
}

/// The pane tree plus the geometry it was last laid out against, bundled
/// under one lock. The spec's separate render/resize mutexes collapse into
/// this single `tokio::sync::Mutex`: every tree-structural operation here
/// (start, resize, split, a render pass, stdin routing) already needs the
/// current geometry in hand, so splitting them across two locks would only
/// add lock-ordering hazards without buying any real concurrency — nothing
/// in this crate holds the tree lock across a slow `.await`.
struct TreeState {
    root: Pane,
    rows: u16,
    cols: u16,
}

/// Owns the pane tree and the tasks that keep it alive: the render loop,
/// the resize watcher, and the stdin demuxer.
pub struct Multiplexer {
    state: Arc<Mutex<TreeState>>,
    shell: String,
    update_tx: mpsc::Sender<PaneId>,
    update_rx: mpsc::Receiver<PaneId>,
}

impl std::fmt::Debug for Multiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Multiplexer").field("shell", &self.shell).finish_non_exhaustive()
    }
}

impl Multiplexer {
    #[must_use]
    pub fn new(shell: impl Into<String>, rows: u16, cols: u16) -> Self {
        let shell = shell.into();
        let mut leaf = Leaf::new(&shell, rows as usize, cols as usize);
        leaf.set_active(true);
        let container = Container::new(SplitMode::Horizontal, vec![Pane::Terminal(leaf)]);
        let status = Status::new(Anchor::Bottom, Pane::Container(container));

        let (update_tx, update_rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);

        Multiplexer {
            state: Arc::new(Mutex::new(TreeState { root: Pane::Status(status), rows, cols })),
            shell,
            update_tx,
            update_rx,
        }
    }

    /// Schedules a one-off split of whichever pane is active a few seconds
    /// after the multiplexer starts running, mirroring the delayed demo
    /// split the original binary fires on startup. No-op until [`run`] is
    /// called — the returned task holds its own clone of the shared state
    /// and simply waits for the tree to exist.
    ///
    /// [`run`]: Multiplexer::run
    pub fn schedule_startup_split(&self, mode: SplitMode) {
        let state = Arc::clone(&self.state);
        let shell = self.shell.clone();
        let update_tx = self.update_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(3)).await;
            if let Err(e) = handle_split(&state, &shell, mode, &update_tx).await {
                tracing::warn!(error = %e, "startup split failed");
            }
        });
    }

    /// Enters raw mode, starts the initial pane tree, and runs the
    /// multiplexer until stdin closes or the root pane has no panes left
    /// alive. Restores cooked mode and resets the outer terminal before
    /// returning, even on error.
    ///
    /// # Errors
    ///
    /// Returns an error if raw mode cannot be entered, the initial shell's
    /// PTY cannot be opened, or the signal handler cannot be installed.
    pub async fn run(mut self) -> miette::Result<()> {
        let _raw = RawModeGuard::enter()?;

        {
            let mut guard = self.state.lock().await;
            let (rows, cols) = (guard.rows, guard.cols);
            guard.root.start(rows as usize, cols as usize, self.update_tx.clone())?;
        }

        let (output_tx, mut output_rx) = mpsc::channel::<Vec<u8>>(OUTPUT_CHANNEL_CAPACITY);

        let stdout_task = tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();
            while let Some(chunk) = output_rx.recv().await {
                if stdout.write_all(&chunk).await.is_err() || stdout.flush().await.is_err() {
                    break;
                }
            }
        });

        let render_task = {
            let state = Arc::clone(&self.state);
            let output_tx = output_tx.clone();
            let mut update_rx = self.update_rx;
            tokio::spawn(async move {
                while let Some(target) = update_rx.recv().await {
                    let mut out = String::new();
                    let still_alive = {
                        let mut guard = state.lock().await;
                        if guard.root.prune() {
                            let (rows, cols) = (guard.rows, guard.cols);
                            guard.root.resize(rows as usize, cols as usize);
                        }
                        guard.root.render(target, 0, 0, guard.rows, guard.cols, &mut out);
                        if let Some(active) = guard.root.find_active() {
                            if active != target {
                                guard.root.render(active, 0, 0, guard.rows, guard.cols, &mut out);
                            }
                        }
                        guard.root.exists()
                    };
                    if !out.is_empty() && output_tx.send(out.into_bytes()).await.is_err() {
                        break;
                    }
                    if !still_alive {
                        break;
                    }
                }
            })
        };

        let signal_task = {
            let state = Arc::clone(&self.state);
            let update_tx = self.update_tx.clone();
            tokio::spawn(async move {
                if let Err(e) = watch_resize(state, update_tx).await {
                    tracing::warn!(error = %e, "resize watcher exited");
                }
            })
        };

        let stdin_result = drive_stdin(Arc::clone(&self.state), self.shell.clone(), self.update_tx.clone()).await;

        render_task.abort();
        signal_task.abort();

        {
            let mut guard = self.state.lock().await;
            guard.root.close();
        }
        let mut closer = String::new();
        crate::ansi_writer::full_reset(&mut closer);
        let _ = output_tx.send(closer.into_bytes()).await;
        drop(output_tx);
        let _ = stdout_task.await;

        stdin_result
    }
}

async fn watch_resize(state: Arc<Mutex<TreeState>>, update_tx: mpsc::Sender<PaneId>) -> miette::Result<()> {
    let signals = signal_hook_tokio::Signals::new([signal_hook::consts::SIGWINCH])
        .map_err(MuxError::SignalSetup)?;
    let mut signals = signals.fuse();
    while signals.next().await.is_some() {
        let Ok((cols, rows)) = crossterm::terminal::size() else { continue };
        let root_id = {
            let mut guard = state.lock().await;
            guard.rows = rows;
            guard.cols = cols;
            guard.root.resize(rows as usize, cols as usize);
            guard.root.id()
        };
        let _ = update_tx.try_send(root_id);
    }
    Ok(())
}

/// Reads stdin to completion, demultiplexing the `Ctrl-A` split prefix from
/// ordinary bytes and routing the rest to the active leaf.
async fn drive_stdin(state: Arc<Mutex<TreeState>>, shell: String, update_tx: mpsc::Sender<PaneId>) -> miette::Result<()> {
    let mut stdin = tokio::io::stdin();
    let mut buf = [0u8; 4096];
    let mut demux = ShortcutState::Idle;
    let mut forwarded = Vec::new();

    loop {
        let exists = state.lock().await.root.exists();
        if !exists {
            return Ok(());
        }

        let n = stdin.read(&mut buf).await.map_err(MuxError::OuterIo)?;
        if n == 0 {
            return Ok(());
        }

        forwarded.clear();
        let mut split_requests = Vec::new();
        for &byte in &buf[..n] {
            for event in demux.feed(byte) {
                match event {
                    Demuxed::Forward(b) => forwarded.push(b),
                    Demuxed::Split(mode) => split_requests.push(mode),
                }
            }
        }

        if !forwarded.is_empty() {
            let guard = state.lock().await;
            guard.root.handle_stdin(&forwarded)?;
        }

        for mode in split_requests {
            handle_split(&state, &shell, mode, &update_tx).await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modes(events: Vec<Demuxed>) -> Vec<u8> {
        events
            .into_iter()
            .map(|e| match e {
                Demuxed::Forward(b) => b,
                Demuxed::Split(SplitMode::Vertical) => b'V',
                Demuxed::Split(SplitMode::Horizontal) => b'H',
            })
            .collect()
    }

    #[test]
    fn idle_forwards_ordinary_bytes_untouched() {
        let mut s = ShortcutState::Idle;
        assert_eq!(modes(s.feed(b'x')), b"x");
        assert_eq!(s, ShortcutState::Idle);
    }

    #[test]
    fn idle_prefix_byte_is_swallowed_and_moves_to_pending() {
        let mut s = ShortcutState::Idle;
        assert!(s.feed(SHORTCUT_PREFIX).is_empty());
        assert_eq!(s, ShortcutState::Pending);
    }

    #[test]
    fn pending_v_emits_a_vertical_split_and_returns_to_idle() {
        let mut s = ShortcutState::Pending;
        assert_eq!(modes(s.feed(b'v')), b"V");
        assert_eq!(s, ShortcutState::Idle);
    }

    #[test]
    fn pending_h_emits_a_horizontal_split_and_returns_to_idle() {
        let mut s = ShortcutState::Pending;
        assert_eq!(modes(s.feed(b'h')), b"H");
        assert_eq!(s, ShortcutState::Idle);
    }

    #[test]
    fn pending_repeated_prefix_forwards_both_bytes_and_returns_to_idle() {
        let mut s = ShortcutState::Pending;
        assert_eq!(modes(s.feed(SHORTCUT_PREFIX)), [SHORTCUT_PREFIX, SHORTCUT_PREFIX]);
        assert_eq!(s, ShortcutState::Idle);
    }

    #[test]
    fn pending_other_byte_forwards_both_and_returns_to_idle() {
        let mut s = ShortcutState::Pending;
        assert_eq!(modes(s.feed(b'q')), [SHORTCUT_PREFIX, b'q']);
        assert_eq!(s, ShortcutState::Idle);
    }
}

async fn handle_split(
    state: &Arc<Mutex<TreeState>>,
    shell: &str,
    mode: SplitMode,
    update_tx: &mpsc::Sender<PaneId>,
) -> miette::Result<()> {
    let mut guard = state.lock().await;
    let Some(active) = guard.root.find_active() else { return Ok(()) };
    let Some(new_id) = guard.root.split(active, mode, shell, update_tx)? else { return Ok(()) };
    let (rows, cols) = (guard.rows, guard.cols);
    guard.root.resize(rows as usize, cols as usize);
    guard.root.set_active(new_id);
    let _ = update_tx.try_send(new_id);
    Ok(())
}
