//! The pane tree: terminal leaves, horizontal/vertical split containers,
//! and the status-bar decorator, composited onto the outer TTY.
//!
//! Modeled as a tagged `enum` rather than a trait-object hierarchy, per the
//! design notes — containers, leaves, and the status decorator share a
//! uniform operation set but disjoint internal state, which is exactly what
//! a Rust sum type is for.

pub mod container;
pub mod leaf;
pub mod status;

pub use container::Container;
pub use leaf::Leaf;
pub use status::{Anchor, Status};

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc;

static NEXT_PANE_ID: AtomicUsize = AtomicUsize::new(1);

/// Identifies a pane for the purposes of `target == self` comparisons.
///
/// The original sources compare panes by pointer identity while walking the
/// tree; Rust's `enum` sum type has no stable address to compare by, so an
/// incrementing id plays the same role and is compared by value instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PaneId(usize);

impl PaneId {
    fn next() -> Self {
        PaneId(NEXT_PANE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub fn raw(self) -> usize {
        self.0
    }
}

/// Which way a container divides its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMode {
    Horizontal,
    Vertical,
}

/// A rectangular region of the outer TTY: one embedded terminal, an N-way
/// split, or the status-bar decorator wrapping either.
#[derive(Debug)]
pub enum Pane {
    Terminal(Leaf),
    Container(Container),
    Status(Status),
}

impl Pane {
    #[must_use]
    pub fn id(&self) -> PaneId {
        match self {
            Pane::Terminal(l) => l.id(),
            Pane::Container(c) => c.id(),
            Pane::Status(s) => s.id(),
        }
    }

    /// Launches this pane (and recursively its children): for a leaf, spawns
    /// the PTY and its byte-pump task; for a container or status decorator,
    /// computes child geometry and starts each child in turn.
    ///
    /// # Errors
    ///
    /// Returns an error if a leaf's PTY cannot be opened.
    pub fn start(&mut self, rows: usize, cols: usize, update_tx: mpsc::Sender<PaneId>) -> miette::Result<()> {
        match self {
            Pane::Terminal(l) => l.start(rows, cols, update_tx),
            Pane::Container(c) => c.start(rows, cols, update_tx),
            Pane::Status(s) => s.start(rows, cols, update_tx),
        }
    }

    pub fn resize(&mut self, rows: usize, cols: usize) {
        match self {
            Pane::Terminal(l) => l.resize(rows, cols),
            Pane::Container(c) => c.resize(rows, cols),
            Pane::Status(s) => s.resize(rows, cols),
        }
    }

    pub fn close(&mut self) {
        match self {
            Pane::Terminal(l) => l.close(),
            Pane::Container(c) => c.close(),
            Pane::Status(s) => s.close(),
        }
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        match self {
            Pane::Terminal(l) => l.exists(),
            Pane::Container(c) => c.exists(),
            Pane::Status(s) => s.exists(),
        }
    }

    /// Returns the currently active leaf's id, if any is marked active in
    /// this subtree.
    #[must_use]
    pub fn find_active(&self) -> Option<PaneId> {
        match self {
            Pane::Terminal(l) => l.is_active().then(|| l.id()),
            Pane::Container(c) => c.find_active(),
            Pane::Status(s) => s.find_active(),
        }
    }

    /// Marks the leaf with id `target` active and every other leaf inactive.
    pub fn set_active(&mut self, target: PaneId) {
        match self {
            Pane::Terminal(l) => {
                let is_target = l.id() == target;
                l.set_active(is_target);
            }
            Pane::Container(c) => c.set_active(target),
            Pane::Status(s) => s.set_active(target),
        }
    }

    /// Drops dead leaves out of any container in this subtree, reassigning
    /// the active leaf if it was among them. A lone dying leaf (not inside
    /// any container) is left in place — its parent container is what
    /// removes it — so a root that is itself a single leaf just goes dark
    /// until `exists()` reports false and the multiplexer exits. Returns
    /// whether the tree actually changed shape, so the caller knows whether
    /// a resize pass is warranted.
    #[must_use]
    pub fn prune(&mut self) -> bool {
        match self {
            Pane::Terminal(_) => false,
            Pane::Container(c) => c.prune(),
            Pane::Status(s) => s.prune(),
        }
    }

    /// Routes raw bytes to the active leaf's PTY.
    ///
    /// # Errors
    ///
    /// Returns an error if the active leaf's PTY write endpoint is closed.
    pub fn handle_stdin(&self, bytes: &[u8]) -> miette::Result<()> {
        match self {
            Pane::Terminal(l) => l.handle_stdin(bytes),
            Pane::Container(c) => c.handle_stdin(bytes),
            Pane::Status(s) => s.handle_stdin(bytes),
        }
    }

    /// Paints this pane's subtree onto `out`. A leaf only paints when
    /// `target` equals its own id; a container or status decorator either
    /// paints every child (when `target == self.id()`) or forwards the
    /// request unchanged so only the addressed leaf paints.
    pub fn render(&self, target: PaneId, offset_x: u16, offset_y: u16, rows: u16, cols: u16, out: &mut String) {
        match self {
            Pane::Terminal(l) => {
                if l.id() == target {
                    l.paint(offset_x, offset_y, rows, cols, out);
                }
            }
            Pane::Container(c) => c.render(target, offset_x, offset_y, rows, cols, out),
            Pane::Status(s) => s.render(target, offset_x, offset_y, rows, cols, out),
        }
    }

    /// Splits the leaf `target` into a new container holding the original
    /// leaf plus a freshly spawned one. Returns the new leaf's id, or `None`
    /// if `target` wasn't found in this subtree. Leaves never split
    /// themselves; only containers and the status decorator do.
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
        match self {
            Pane::Terminal(_) => Ok(None),
            Pane::Container(c) => c.split(target, mode, shell, update_tx),
            Pane::Status(s) => s.split(target, mode, shell, update_tx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pane_ids_are_unique() {
        let a = PaneId::next();
        let b = PaneId::next();
        assert_ne!(a, b);
    }
}
