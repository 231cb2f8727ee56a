//! Status-bar decorator: reserves one row of its wrapped pane's rectangle
//! to show a fixed caption, forwarding everything else straight through.

use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;

use super::{Pane, PaneId, SplitMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Top,
    Bottom,
}

#[derive(Debug)]
pub struct Status {
    id: PaneId,
    child: Box<Pane>,
    anchor: Anchor,
}

impl Status {
    #[must_use]
    pub fn new(anchor: Anchor, child: Pane) -> Self {
        Status { id: PaneId::next(), child: Box::new(child), anchor }
    }

    #[must_use]
    pub fn id(&self) -> PaneId {
        self.id
    }

    pub fn start(&mut self, rows: usize, cols: usize, update_tx: mpsc::Sender<PaneId>) -> miette::Result<()> {
        self.child.start(rows.saturating_sub(1).max(1), cols, update_tx)
    }

    pub fn resize(&mut self, rows: usize, cols: usize) {
        self.child.resize(rows.saturating_sub(1).max(1), cols);
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.child.exists()
    }

    pub fn close(&mut self) {
        self.child.close();
    }

    #[must_use]
    pub fn find_active(&self) -> Option<PaneId> {
        self.child.find_active()
    }

    pub fn set_active(&mut self, target: PaneId) {
        self.child.set_active(target);
    }

    pub fn prune(&mut self) -> bool {
        self.child.prune()
    }

    pub fn handle_stdin(&self, bytes: &[u8]) -> miette::Result<()> {
        self.child.handle_stdin(bytes)
    }

    pub fn render(&self, target: PaneId, offset_x: u16, offset_y: u16, rows: u16, cols: u16, out: &mut String) {
        let child_rows = rows.saturating_sub(1);
        let child_offset_y = match self.anchor {
            Anchor::Top => offset_y + 1,
            Anchor::Bottom => offset_y,
        };
        if target == self.id {
            self.paint_bar(offset_x, offset_y, rows, cols, out);
            self.child.render(self.child.id(), offset_x, child_offset_y, child_rows, cols, out);
        } else {
            self.child.render(target, offset_x, child_offset_y, child_rows, cols, out);
        }
    }

    fn paint_bar(&self, offset_x: u16, offset_y: u16, rows: u16, cols: u16, out: &mut String) {
        let bar_row = match self.anchor {
            Anchor::Top => offset_y,
            Anchor::Bottom => offset_y + rows.saturating_sub(1),
        };
        crate::ansi_writer::move_cursor_to(out, offset_x, bar_row);
        crate::ansi_writer::clear_line(out);
        out.push_str("\x1b[41m\x1b[97m");
        let caption = format!(" Sunder {}", current_timestamp());
        let width = cols as usize;
        if caption.len() >= width {
            out.push_str(&caption[..width]);
        } else {
            out.push_str(&caption);
            out.push_str(&" ".repeat(width - caption.len()));
        }
        crate::ansi_writer::reset_formatting(out);
    }

    pub fn split(
        &mut self,
        target: PaneId,
        mode: SplitMode,
        shell: &str,
        update_tx: &mpsc::Sender<PaneId>,
    ) -> miette::Result<Option<PaneId>> {
        self.child.split(target, mode, shell, update_tx)
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pane::leaf::tests::stub;

    #[test]
    fn bar_reserves_exactly_one_row() {
        let mut leaf = stub(1, 1);
        leaf.set_active(true);
        let status = Status::new(Anchor::Bottom, Pane::Terminal(leaf));
        let mut out = String::new();
        status.render(status.id(), 0, 0, 10, 40, &mut out);
        assert!(out.contains("Sunder"));
    }

    #[test]
    fn non_self_target_skips_the_bar() {
        let mut leaf = stub(1, 1);
        leaf.set_active(true);
        let leaf_id = leaf.id();
        let status = Status::new(Anchor::Bottom, Pane::Terminal(leaf));
        let mut out = String::new();
        status.render(leaf_id, 0, 0, 10, 40, &mut out);
        assert!(!out.contains("Sunder"));
    }
}
