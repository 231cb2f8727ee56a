//! Shift-in/shift-out charset translation tables.

/// Either the identity mapping or an explicit rune→rune translation table,
/// selected by Shift-In (`0x0F`, slot 0) / Shift-Out (`0x0E`, slot 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Charset {
    Identity,
    /// DEC Special Graphics (the classic line-drawing set selected by
    /// `ESC ( 0`).
    DecSpecialGraphics,
}

impl Default for Charset {
    fn default() -> Self {
        Charset::Identity
    }
}

impl Charset {
    #[must_use]
    pub fn translate(&self, r: char) -> char {
        match self {
            Charset::Identity => r,
            Charset::DecSpecialGraphics => dec_special_graphics(r),
        }
    }
}

/// Maps ASCII `0x5F..=0x7E` to the VT100 line-drawing glyphs; everything
/// else passes through unchanged.
fn dec_special_graphics(r: char) -> char {
    match r {
        '`' => '\u{25c6}', // diamond
        'a' => '\u{2592}', // checkerboard
        'b' => '\u{2409}',
        'c' => '\u{240c}',
        'd' => '\u{240d}',
        'e' => '\u{240a}',
        'f' => '\u{00b0}',
        'g' => '\u{00b1}',
        'h' => '\u{2424}',
        'i' => '\u{240b}',
        'j' => '\u{2518}',
        'k' => '\u{2510}',
        'l' => '\u{250c}',
        'm' => '\u{2514}',
        'n' => '\u{253c}',
        'o' => '\u{23ba}',
        'p' => '\u{23bb}',
        'q' => '\u{2500}',
        'r' => '\u{23bc}',
        's' => '\u{23bd}',
        't' => '\u{251c}',
        'u' => '\u{2524}',
        'v' => '\u{2534}',
        'w' => '\u{252c}',
        'x' => '\u{2502}',
        'y' => '\u{2264}',
        'z' => '\u{2265}',
        '{' => '\u{03c0}',
        '|' => '\u{2260}',
        '}' => '\u{00a3}',
        '~' => '\u{00b7}',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_passes_through() {
        assert_eq!(Charset::Identity.translate('q'), 'q');
    }

    #[test]
    fn dec_special_graphics_maps_q_to_horizontal_line() {
        assert_eq!(Charset::DecSpecialGraphics.translate('q'), '\u{2500}');
    }
}
