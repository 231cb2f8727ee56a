//! N-way split container: divides its rectangle evenly among children,
//! drawing a one-cell divider between each.

use tokio::sync::mpsc;

use super::{Leaf, Pane, PaneId, SplitMode};

const DIVIDER_SGR: &str = "\x1b[31m";
const RESET_SGR: &str = "\x1b[0m";

#[derive(Debug)]
pub struct Container {
    id: PaneId,
    mode: SplitMode,
    children: Vec<Pane>,
}

impl Container {
    #[must_use]
    pub fn new(mode: SplitMode, children: Vec<Pane>) -> Self {
        Container { id: PaneId::next(), mode, children }
    }

    #[must_use]
    pub fn id(&self) -> PaneId {
        self.id
    }

    /// Divides `(rows, cols)` among the children, reserving one row or
    /// column between each pair as a divider. The final child absorbs
    /// whatever remainder doesn't divide evenly.
    fn geometries(&self, rows: usize, cols: usize) -> Vec<(usize, usize, usize, usize)> {
        let n = self.children.len().max(1);
        let dividers = n.saturating_sub(1);
        let mut out = Vec::with_capacity(n);
        match self.mode {
            SplitMode::Horizontal => {
                let usable = rows.saturating_sub(dividers);
                let each = usable / n;
                let mut row_off = 0;
                for i in 0..n {
                    let h = if i + 1 == n { usable - each * (n - 1) } else { each };
                    out.push((row_off, 0, h.max(1), cols));
                    row_off += h + 1;
                }
            }
            SplitMode::Vertical => {
                let usable = cols.saturating_sub(dividers);
                let each = usable / n;
                let mut col_off = 0;
                for i in 0..n {
                    let w = if i + 1 == n { usable - each * (n - 1) } else { each };
                    out.push((0, col_off, rows, w.max(1)));
                    col_off += w + 1;
                }
            }
        }
        out
    }

    pub fn start(&mut self, rows: usize, cols: usize, update_tx: mpsc::Sender<PaneId>) -> miette::Result<()> {
        let geoms = self.geometries(rows, cols);
        for (child, (_, _, h, w)) in self.children.iter_mut().zip(geoms) {
            child.start(h, w, update_tx.clone())?;
        }
        Ok(())
    }

    pub fn resize(&mut self, rows: usize, cols: usize) {
        let geoms = self.geometries(rows, cols);
        for (child, (_, _, h, w)) in self.children.iter_mut().zip(geoms) {
            child.resize(h, w);
        }
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.children.iter().any(Pane::exists)
    }

    pub fn close(&mut self) {
        for child in &mut self.children {
            child.close();
        }
    }

    #[must_use]
    pub fn find_active(&self) -> Option<PaneId> {
        self.children.iter().find_map(Pane::find_active)
    }

    pub fn set_active(&mut self, target: PaneId) {
        for child in &mut self.children {
            child.set_active(target);
        }
    }

    /// Recursively drops children whose subtree no longer exists, promoting
    /// a new active leaf (the survivor nearest the end of the list) if the
    /// one that died was active. Leaves at least one child untouched even if
    /// every child reports dead, so a container is never left empty. Returns
    /// whether anything was actually removed, so the caller only pays for a
    /// tree-wide resize when the layout genuinely changed.
    pub fn prune(&mut self) -> bool {
        let mut changed = false;
        for child in &mut self.children {
            if let Pane::Container(c) = child {
                changed |= c.prune();
            }
        }
        if self.children.len() > 1 {
            let before = self.children.len();
            let had_active = self.find_active().is_some();
            self.children.retain(Pane::exists);
            changed |= self.children.len() != before;
            if self.children.is_empty() {
                return changed;
            }
            if had_active && self.find_active().is_none() {
                let new_active = self.children.last().map(Pane::id);
                if let Some(id) = new_active {
                    self.set_active(id);
                }
            }
        }
        changed
    }

    /// Routes to whichever child currently holds the active leaf. Harmless
    /// no-op if no child has one.
    pub fn handle_stdin(&self, bytes: &[u8]) -> miette::Result<()> {
        for child in &self.children {
            if child.find_active().is_some() {
                return child.handle_stdin(bytes);
            }
        }
        Ok(())
    }

    pub fn render(&self, target: PaneId, offset_x: u16, offset_y: u16, rows: u16, cols: u16, out: &mut String) {
        let paint_all = target == self.id;
        let geoms = self.geometries(rows as usize, cols as usize);
        for (child, (row_off, col_off, h, w)) in self.children.iter().zip(&geoms) {
            let child_target = if paint_all { child.id() } else { target };
            child.render(
                child_target,
                offset_x + *col_off as u16,
                offset_y + *row_off as u16,
                *h as u16,
                *w as u16,
                out,
            );
        }
        if paint_all {
            self.draw_dividers(offset_x, offset_y, rows, cols, &geoms, out);
        }
    }

    fn draw_dividers(
        &self,
        offset_x: u16,
        offset_y: u16,
        rows: u16,
        cols: u16,
        geoms: &[(usize, usize, usize, usize)],
        out: &mut String,
    ) {
        if geoms.len() < 2 {
            return;
        }
        out.push_str(DIVIDER_SGR);
        match self.mode {
            SplitMode::Horizontal => {
                for (row_off, _, h, _) in &geoms[..geoms.len() - 1] {
                    let divider_row = offset_y + (*row_off + *h) as u16;
                    crate::ansi_writer::move_cursor_to(out, offset_x, divider_row);
                    for _ in 0..cols {
                        out.push('\u{2501}');
                    }
                }
            }
            SplitMode::Vertical => {
                for (_, col_off, _, w) in &geoms[..geoms.len() - 1] {
                    let divider_col = offset_x + (*col_off + *w) as u16;
                    for r in 0..rows {
                        crate::ansi_writer::move_cursor_to(out, divider_col, offset_y + r);
                        out.push('\u{2503}');
                    }
                }
            }
        }
        out.push_str(RESET_SGR);
    }

    /// Finds `target` among this container's direct children and replaces
    /// it with a fresh two-way split holding the original pane plus a newly
    /// spawned leaf. Recurses into child containers/decorators otherwise.
    ///
    /// The new leaf starts at a placeholder size; the caller is expected to
    /// immediately resize the whole tree afterward so it picks up real
    /// geometry, the same way a freshly inserted child gets sized on the
    /// next `resize` pass rather than threading exact dimensions through the
    /// split call itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the new leaf's PTY cannot be opened.
    pub fn split(
        &mut self,
        target: PaneId,
        mode: SplitMode,
        shell: &str,
        update_tx: &mpsc::Sender<PaneId>,
    ) -> miette::Result<Option<PaneId>> {
        if let Some(idx) = self.children.iter().position(|c| c.id() == target) {
            let mut new_leaf = Leaf::new(shell, 24, 80);
            new_leaf.start(24, 80, update_tx.clone())?;
            let new_id = new_leaf.id();
            let old = self.children.remove(idx);
            let mut split = Container::new(mode, vec![old, Pane::Terminal(new_leaf)]);
            split.set_active(new_id);
            self.children.insert(idx, Pane::Container(split));
            return Ok(Some(new_id));
        }
        for child in &mut self.children {
            if let Some(new_id) = child.split(target, mode, shell, update_tx)? {
                return Ok(Some(new_id));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pane::leaf::tests::{kill, stub};

    #[test]
    fn horizontal_geometry_splits_rows_with_one_divider() {
        let c = Container::new(SplitMode::Horizontal, vec![Pane::Terminal(stub(1, 1)), Pane::Terminal(stub(1, 1))]);
        let geoms = c.geometries(21, 80);
        assert_eq!(geoms[0], (0, 0, 10, 80));
        assert_eq!(geoms[1], (11, 0, 10, 80));
    }

    #[test]
    fn vertical_geometry_splits_cols_with_one_divider() {
        let c = Container::new(SplitMode::Vertical, vec![Pane::Terminal(stub(1, 1)), Pane::Terminal(stub(1, 1))]);
        let geoms = c.geometries(24, 41);
        assert_eq!(geoms[0], (0, 0, 24, 20));
        assert_eq!(geoms[1], (0, 21, 24, 20));
    }

    #[test]
    fn render_on_non_self_target_only_reaches_matching_leaf() {
        let mut a = stub(1, 1);
        let mut b = stub(1, 1);
        a.set_active(true);
        let a_id = a.id();
        let b_id = b.id();
        let c = Container::new(SplitMode::Horizontal, vec![Pane::Terminal(a), Pane::Terminal(b)]);
        let mut out = String::new();
        c.render(b_id, 0, 0, 4, 4, &mut out);
        assert!(!out.is_empty());
        let mut out2 = String::new();
        c.render(a_id, 0, 0, 4, 4, &mut out2);
        assert!(!out2.is_empty());
    }

    #[test]
    fn prune_removes_dead_child_and_promotes_new_active() {
        let mut a = stub(1, 1);
        let mut b = stub(1, 1);
        a.set_active(true);
        kill(&a);
        let b_id = b.id();
        let mut c = Container::new(SplitMode::Horizontal, vec![Pane::Terminal(a), Pane::Terminal(b)]);
        assert!(c.prune());
        assert_eq!(c.children.len(), 1);
        assert_eq!(c.find_active(), Some(b_id));
    }

    #[test]
    fn prune_is_a_no_op_when_nothing_died() {
        let mut a = stub(1, 1);
        a.set_active(true);
        let b = stub(1, 1);
        let mut c = Container::new(SplitMode::Horizontal, vec![Pane::Terminal(a), Pane::Terminal(b)]);
        assert!(!c.prune());
        assert_eq!(c.children.len(), 2);
    }
}
