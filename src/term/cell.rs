//! The atomic grid unit and its SGR attribute diffing.

use std::fmt::Write as _;

/// SGR-derived display attributes for a single cell.
///
/// Colours are kept as opaque SGR parameter strings (e.g. `"31"`, `"38;5;200"`)
/// rather than decoded RGB/palette values, so [`Attr::diff`] can replay them
/// verbatim without needing to understand colour spaces.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Attr {
    pub fg: String,
    pub bg: String,
    pub bold: bool,
    pub dim: bool,
    pub underline: bool,
    pub blink: bool,
    pub inverse: bool,
    pub hidden: bool,
}

impl Attr {
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.fg.is_empty()
            && self.bg.is_empty()
            && !self.bold
            && !self.dim
            && !self.underline
            && !self.blink
            && !self.inverse
            && !self.hidden
    }

    /// Returns the shortest SGR escape sequence that transitions the terminal
    /// from `prev` to `self`, or `""` if the two are equal.
    #[must_use]
    pub fn diff(&self, prev: &Attr) -> String {
        if self == prev {
            return String::new();
        }

        let mut params: Vec<String> = Vec::new();

        // Any attribute that turns off forces a full reset-then-reapply: the
        // on/off SGR codes are not composable enough to undo a single
        // attribute in isolation while leaving siblings untouched, so we
        // normalise to "reset, then re-emit everything self needs".
        let any_turned_off = (prev.bold && !self.bold)
            || (prev.dim && !self.dim)
            || (prev.underline && !self.underline)
            || (prev.blink && !self.blink)
            || (prev.inverse && !self.inverse)
            || (prev.hidden && !self.hidden)
            || (!prev.fg.is_empty() && self.fg.is_empty())
            || (!prev.bg.is_empty() && self.bg.is_empty());

        if any_turned_off {
            params.push("0".to_string());
            if self.bold {
                params.push("1".to_string());
            }
            if self.dim {
                params.push("2".to_string());
            }
            if self.underline {
                params.push("4".to_string());
            }
            if self.blink {
                params.push("5".to_string());
            }
            if self.inverse {
                params.push("7".to_string());
            }
            if self.hidden {
                params.push("8".to_string());
            }
            if !self.fg.is_empty() {
                params.push(self.fg.clone());
            }
            if !self.bg.is_empty() {
                params.push(self.bg.clone());
            }
        } else {
            if self.bold && !prev.bold {
                params.push("1".to_string());
            }
            if self.dim && !prev.dim {
                params.push("2".to_string());
            }
            if self.underline && !prev.underline {
                params.push("4".to_string());
            }
            if self.blink && !prev.blink {
                params.push("5".to_string());
            }
            if self.inverse && !prev.inverse {
                params.push("7".to_string());
            }
            if self.hidden && !prev.hidden {
                params.push("8".to_string());
            }
            if self.fg != prev.fg && !self.fg.is_empty() {
                params.push(self.fg.clone());
            }
            if self.bg != prev.bg && !self.bg.is_empty() {
                params.push(self.bg.clone());
            }
        }

        if params.is_empty() {
            return String::new();
        }

        let mut out = String::from("\x1b[");
        for (i, p) in params.iter().enumerate() {
            if i > 0 {
                out.push(';');
            }
            let _ = write!(out, "{p}");
        }
        out.push('m');
        out
    }
}

/// A single character cell in a [`crate::term::buffer::Buffer`].
///
/// A rune of `0` (NUL) represents an unset/blank cell. Display code must
/// substitute a space for any rune below `0x20`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub rune: char,
    pub attr: Attr,
}

impl Cell {
    #[must_use]
    pub fn blank() -> Self {
        Cell { rune: '\0', attr: Attr::default() }
    }

    #[must_use]
    pub fn new(rune: char, attr: Attr) -> Self {
        Cell { rune, attr }
    }

    /// Erase this cell, keeping only the current background colour — mirrors
    /// the original's `cell.erase(bgColour)`.
    pub fn erase(&mut self, bg: &str) {
        self.rune = '\0';
        self.attr = Attr { bg: bg.to_string(), ..Attr::default() };
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.rune == '\0' && self.attr.is_default()
    }

    /// The rune to actually display: control characters render as a space.
    #[must_use]
    pub fn display_rune(&self) -> char {
        if (self.rune as u32) < 0x20 { ' ' } else { self.rune }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn diff_of_equal_attrs_is_empty() {
        let a = Attr { fg: "31".into(), bold: true, ..Attr::default() };
        assert_eq!(a.diff(&a), "");
    }

    #[test]
    fn diff_turning_everything_off_resets() {
        let a = Attr { fg: "31".into(), bold: true, underline: true, ..Attr::default() };
        let b = Attr::default();
        assert_eq!(b.diff(&a), "\x1b[0m");
    }

    #[test]
    fn diff_changing_fg_only_appends_param() {
        let prev = Attr { fg: "31".into(), ..Attr::default() };
        let next = Attr { fg: "32".into(), ..Attr::default() };
        assert_eq!(next.diff(&prev), "\x1b[32m");
    }

    #[test]
    fn diff_dropping_fg_resets_then_reapplies_bg() {
        let prev = Attr { fg: "31".into(), bg: "44".into(), ..Attr::default() };
        let next = Attr { bg: "44".into(), ..Attr::default() };
        assert_eq!(next.diff(&prev), "\x1b[0;44m");
    }

    #[test]
    fn blank_cell_has_nul_rune_and_default_attr() {
        let c = Cell::blank();
        assert_eq!(c.rune, '\0');
        assert!(c.attr.is_default());
        assert!(c.is_blank());
    }

    #[test]
    fn erase_preserves_background_only() {
        let mut c = Cell::new('x', Attr { fg: "31".into(), bold: true, ..Attr::default() });
        c.erase("44");
        assert_eq!(c.rune, '\0');
        assert_eq!(c.attr.bg, "44");
        assert!(c.attr.fg.is_empty());
        assert!(!c.attr.bold);
    }

    #[test]
    fn display_rune_substitutes_control_chars_with_space() {
        let mut c = Cell::blank();
        c.rune = '\t';
        assert_eq!(c.display_rune(), ' ');
        c.rune = 'z';
        assert_eq!(c.display_rune(), 'z');
    }
}
