//! Terminal leaf: one embedded [`Emulator`] behind one [`PtySession`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::ansi_writer;
use crate::error::MuxError;
use crate::pty::{self, PtyOutput};
use crate::term::cell::Attr;
use crate::term::emulator::{Emulator, EmulatorWriter, VecWriter};

use super::PaneId;

/// Bridges an [`Emulator`]'s query replies (DA/DSR, OSC colour queries) back
/// onto the PTY that feeds it, once the PTY actually exists.
#[derive(Debug)]
struct PtyWriter {
    input: tokio::sync::mpsc::UnboundedSender<pty::PtyInput>,
}

impl EmulatorWriter for PtyWriter {
    fn write(&mut self, data: &[u8]) {
        let _ = self.input.send(pty::PtyInput::Write(data.to_vec()));
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// One pane that owns exactly one embedded terminal.
///
/// The emulator sits behind a plain [`std::sync::Mutex`], not an async one:
/// every critical section here (`feed`, `resize`, a render snapshot) is
/// short and never crosses an `.await`, so a blocking mutex is both
/// sufficient and avoids forcing every caller onto an async signature. The
/// byte-pump task spawned by [`Leaf::start`] is this emulator's only writer;
/// the render pass and `resize` are its only other lockers, exactly the
/// "exclusive mutator, render-time snapshot reader" split the spec calls
/// for.
#[derive(Debug)]
pub struct Leaf {
    id: PaneId,
    shell: String,
    emulator: Arc<Mutex<Emulator>>,
    pty_input: Option<tokio::sync::mpsc::UnboundedSender<pty::PtyInput>>,
    exists: Arc<AtomicBool>,
    active: bool,
    started: bool,
}

impl Leaf {
    #[must_use]
    pub fn new(shell: impl Into<String>, rows: usize, cols: usize) -> Self {
        let emulator = Emulator::new(cols.max(1), rows.max(1), Box::new(VecWriter::default()));
        Leaf {
            id: PaneId::next(),
            shell: shell.into(),
            emulator: Arc::new(Mutex::new(emulator)),
            pty_input: None,
            exists: Arc::new(AtomicBool::new(true)),
            active: false,
            started: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> PaneId {
        self.id
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.exists.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Opens the PTY, rebinds the emulator's query-reply writer onto it, and
    /// spawns the background task that pumps PTY output into the emulator
    /// until the shell exits. Idempotent: a leaf that's already started is
    /// left alone.
    ///
    /// # Errors
    ///
    /// Returns [`MuxError::PtySpawn`] if the PTY pair cannot be opened.
    pub fn start(&mut self, rows: usize, cols: usize, update_tx: mpsc::Sender<PaneId>) -> miette::Result<()> {
        if self.started {
            return Ok(());
        }

        let session = match pty::spawn(&self.shell, cols.max(1) as u16, rows.max(1) as u16) {
            Ok(session) => session,
            Err(e) => {
                self.exists.store(false, Ordering::Release);
                return Err(e);
            }
        };

        {
            let mut emu = self.emulator.lock().expect("emulator lock poisoned");
            emu.resize(cols.max(1), rows.max(1));
            emu.set_writer(Box::new(PtyWriter { input: session.input.clone() }));
        }
        self.pty_input = Some(session.input.clone());
        self.started = true;

        let id = self.id;
        let emulator = Arc::clone(&self.emulator);
        let exists = Arc::clone(&self.exists);
        let mut output = session.output;
        let shell = self.shell.clone();

        tokio::spawn(async move {
            tracing::debug!(pane = id.raw(), shell = %shell, "leaf started");
            while let Some(out) = output.recv().await {
                match out {
                    PtyOutput::Data(bytes) => {
                        let dirty = {
                            let mut emu = emulator.lock().expect("emulator lock poisoned");
                            emu.feed(&bytes)
                        };
                        if dirty {
                            let _ = update_tx.try_send(id);
                        }
                    }
                    PtyOutput::Exit => break,
                }
            }
            exists.store(false, Ordering::Release);
            tracing::debug!(pane = id.raw(), shell = %shell, "leaf shell exited");
            let _ = update_tx.try_send(id);
        });

        Ok(())
    }

    pub fn resize(&self, rows: usize, cols: usize) {
        if let Some(tx) = &self.pty_input {
            let _ = tx.send(pty::PtyInput::Resize { cols: cols.max(1) as u16, rows: rows.max(1) as u16 });
        }
        self.emulator.lock().expect("emulator lock poisoned").resize(cols.max(1), rows.max(1));
    }

    pub fn close(&mut self) {
        if let Some(tx) = self.pty_input.take() {
            let _ = tx.send(pty::PtyInput::Close);
        }
        self.exists.store(false, Ordering::Release);
    }

    /// Writes bytes to this leaf's PTY.
    ///
    /// # Errors
    ///
    /// Returns [`MuxError::LeafIo`] if the PTY write endpoint has closed.
    pub fn handle_stdin(&self, bytes: &[u8]) -> miette::Result<()> {
        let Some(tx) = &self.pty_input else { return Ok(()) };
        tx.send(pty::PtyInput::Write(bytes.to_vec()))
            .map_err(|_| MuxError::LeafIo { source: std::io::Error::other("leaf pty write endpoint closed") })?;
        Ok(())
    }

    /// Paints the full `rows`x`cols` rectangle at `(offset_x, offset_y)`:
    /// hides the cursor, disables insert mode, repaints every cell with the
    /// shortest SGR diff from the previous cell, then — only if this leaf is
    /// active — restores the cursor to the emulator's own position and
    /// visibility.
    ///
    /// Moves the cursor before every cell rather than once per row: a blank
    /// continuation cell trailing a double-width rune still occupies one
    /// model column but advances a real terminal's visual cursor by two, so
    /// relying on the terminal's own cursor advance would drift every cell
    /// after it one column to the right.
    pub fn paint(&self, offset_x: u16, offset_y: u16, rows: u16, cols: u16, out: &mut String) {
        ansi_writer::set_cursor_visible(out, false);
        ansi_writer::set_replace_mode(out, true);

        let emu = self.emulator.lock().expect("emulator lock poisoned");
        let buf = emu.active_buffer();
        let mut prev = Attr::default();

        for row in 0..rows {
            for col in 0..cols {
                let (rune, attr) = match buf.cell(col as usize, row as usize) {
                    Some(cell) => (cell.display_rune(), cell.attr.clone()),
                    None => (' ', Attr::default()),
                };
                ansi_writer::move_cursor_to(out, offset_x + col, offset_y + row);
                let diff = attr.diff(&prev);
                if !diff.is_empty() {
                    out.push_str(&diff);
                }
                out.push(rune);
                prev = attr;
            }
        }

        if self.active {
            let cx = offset_x + buf.cursor_x() as u16;
            let cy = offset_y + buf.cursor_y() as u16;
            ansi_writer::move_cursor_to(out, cx, cy);
            ansi_writer::set_cursor_visible(out, buf.modes.show_cursor);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A leaf that never opens a real PTY, for tree/geometry/render tests
    /// that don't need a live shell. Feeds bytes straight into the emulator.
    pub(crate) fn stub(rows: usize, cols: usize) -> Leaf {
        Leaf {
            id: PaneId::next(),
            shell: String::new(),
            emulator: Arc::new(Mutex::new(Emulator::new(cols.max(1), rows.max(1), Box::new(VecWriter::default())))),
            pty_input: None,
            exists: Arc::new(AtomicBool::new(true)),
            active: false,
            started: true,
        }
    }

    /// Marks a stub leaf as exited, for pruning tests that don't want to
    /// wait on a real PTY's background task.
    pub(crate) fn kill(leaf: &Leaf) {
        leaf.exists.store(false, Ordering::Release);
    }

    #[test]
    fn inactive_leaf_paints_without_moving_real_cursor() {
        let mut leaf = stub(3, 10);
        leaf.emulator.lock().unwrap().feed(b"hi");
        let mut out = String::new();
        leaf.paint(0, 0, 3, 10, &mut out);
        assert!(out.contains("hi"));
        assert!(!out.contains("\x1b[?25h"));
    }

    #[test]
    fn wide_rune_does_not_drift_cells_painted_after_it() {
        // A double-width rune occupies one model column plus a blank
        // continuation cell, but advances a real terminal's visual cursor by
        // two columns; paint() must reposition before the following cell
        // rather than trust the terminal to land there on its own.
        let mut leaf = stub(1, 10);
        leaf.emulator.lock().unwrap().feed("\u{4e2d}x".as_bytes());
        let mut out = String::new();
        leaf.paint(0, 0, 1, 10, &mut out);
        assert!(out.contains("\x1b[1;3H"), "missing reposition before the cell after the wide rune: {out:?}");
        let cup_idx = out.find("\x1b[1;3H").unwrap();
        assert_eq!(out[cup_idx + "\x1b[1;3H".len()..].chars().next(), Some('x'));
    }

    #[test]
    fn active_leaf_restores_cursor_at_its_own_position() {
        let mut leaf = stub(3, 10);
        leaf.set_active(true);
        leaf.emulator.lock().unwrap().feed(b"hi");
        let mut out = String::new();
        leaf.paint(5, 2, 3, 10, &mut out);
        assert!(out.ends_with("\x1b[?25h"));
        assert!(out.contains("\x1b[3;8H"));
    }
}
