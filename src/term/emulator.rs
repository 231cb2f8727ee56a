//! Byte pipeline: decodes PTY bytes into runes, drives the explicit
//! ESC/CSI/OSC state machines, and dispatches into [`Buffer`] primitives.
//!
//! Per the design notes this parser is a hand-rolled, table-driven state
//! machine rather than a callback/visitor-driven one.

use crate::term::buffer::Buffer;

/// Which of the emulator's three buffers is active.
///
/// `Internal` mirrors an unused third buffer slot present in the original
/// sources; it is preserved as state but never selected by any mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Main,
    Alt,
    Internal,
}

/// The PTY-facing write endpoint an [`Emulator`] replies through for DA/DSR
/// queries and title-bar OSC echoes. A real multiplexer implements this over
/// the embedded shell's PTY master; tests implement it over a `Vec<u8>`.
pub trait EmulatorWriter: std::fmt::Debug {
    fn write(&mut self, data: &[u8]);

    /// Lets test code downcast back to a concrete writer to inspect replies,
    /// without requiring every writer to be `'static + Any` at the trait
    /// object level (plain `dyn Trait -> dyn Any` coercion isn't available
    /// for a non-std trait, so each impl hands back its own `&dyn Any`).
    fn as_any(&self) -> &dyn std::any::Any;
}

#[derive(Debug, Default)]
pub struct VecWriter(pub Vec<u8>);

impl EmulatorWriter for VecWriter {
    fn write(&mut self, data: &[u8]) {
        self.0.extend_from_slice(data);
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ParserState {
    Ground,
    Escape,
    Csi { private: bool, secondary: bool, params: Vec<String>, current: String },
    Osc { buf: String },
}

/// Owns up to three [`Buffer`]s and the explicit parser state machine that
/// mutates whichever is active.
pub struct Emulator {
    buffers: [Buffer; 3],
    active: BufferKind,
    title: String,
    writer: Box<dyn EmulatorWriter + Send>,
    state: ParserState,
    utf8_pending: Vec<u8>,
    utf8_need: usize,
    /// Bytes an unrecognised `ESC x` sequence asks to be forwarded, verbatim,
    /// to the outer TTY rather than interpreted. Drained by the owning pane.
    passthrough: Vec<u8>,
}

impl std::fmt::Debug for Emulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emulator")
            .field("active", &self.active)
            .field("title", &self.title)
            .field("state", &self.state)
            .finish()
    }
}

impl Emulator {
    #[must_use]
    pub fn new(width: usize, height: usize, writer: Box<dyn EmulatorWriter + Send>) -> Self {
        Emulator {
            buffers: [
                Buffer::new(width, height),
                Buffer::new(width, height),
                Buffer::new(width, height),
            ],
            active: BufferKind::Main,
            title: String::new(),
            writer,
            state: ParserState::Ground,
            utf8_pending: Vec::new(),
            utf8_need: 0,
            passthrough: Vec::new(),
        }
    }

    #[must_use]
    pub fn active_buffer(&self) -> &Buffer {
        match self.active {
            BufferKind::Main => &self.buffers[0],
            BufferKind::Alt => &self.buffers[1],
            BufferKind::Internal => &self.buffers[2],
        }
    }

    fn active_buffer_mut(&mut self) -> &mut Buffer {
        match self.active {
            BufferKind::Main => &mut self.buffers[0],
            BufferKind::Alt => &mut self.buffers[1],
            BufferKind::Internal => &mut self.buffers[2],
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        for b in &mut self.buffers {
            b.resize_view(width, height);
        }
    }

    /// Rebinds the query-reply endpoint, e.g. once a leaf's real PTY is
    /// open and a placeholder writer can be replaced with one backed by it.
    pub fn set_writer(&mut self, writer: Box<dyn EmulatorWriter + Send>) {
        self.writer = writer;
    }

    pub fn drain_passthrough(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.passthrough)
    }

    fn switch_buffer(&mut self, kind: BufferKind) {
        let (w, h) = (self.active_buffer().view_width(), self.active_buffer().view_height());
        self.active = kind;
        self.active_buffer_mut().resize_view(w, h);
    }

    fn full_reset(&mut self) {
        self.buffers[0].really_clear();
        self.buffers[1].really_clear();
        self.active = BufferKind::Main;
    }

    /// Feed raw PTY bytes through UTF-8 decoding and the state machine.
    /// Returns `true` if any step visibly changed the buffer (render
    /// required).
    pub fn feed(&mut self, bytes: &[u8]) -> bool {
        let mut dirty = false;
        for &byte in bytes {
            if let Some(ch) = self.decode_utf8_byte(byte) {
                dirty |= self.process_char(ch);
            }
        }
        dirty
    }

    fn decode_utf8_byte(&mut self, byte: u8) -> Option<char> {
        if self.utf8_need == 0 {
            if byte < 0x80 {
                return Some(byte as char);
            }
            let need = if byte & 0xE0 == 0xC0 {
                1
            } else if byte & 0xF0 == 0xE0 {
                2
            } else if byte & 0xF8 == 0xF0 {
                3
            } else {
                return None; // invalid leading byte, drop.
            };
            self.utf8_need = need;
            self.utf8_pending = vec![byte];
            None
        } else {
            self.utf8_pending.push(byte);
            self.utf8_need -= 1;
            if self.utf8_need == 0 {
                let bytes = std::mem::take(&mut self.utf8_pending);
                std::str::from_utf8(&bytes).ok().and_then(|s| s.chars().next())
            } else {
                None
            }
        }
    }

    fn process_char(&mut self, ch: char) -> bool {
        match std::mem::replace(&mut self.state, ParserState::Ground) {
            ParserState::Ground => self.process_ground(ch),
            ParserState::Escape => self.process_escape(ch),
            ParserState::Csi { private, secondary, params, current } => {
                self.process_csi(ch, private, secondary, params, current)
            }
            ParserState::Osc { buf } => self.process_osc(ch, buf),
        }
    }

    fn process_ground(&mut self, ch: char) -> bool {
        match ch as u32 {
            0x1B => {
                self.state = ParserState::Escape;
                false
            }
            0x05 | 0x07 => false,
            0x08 => {
                self.active_buffer_mut().backspace();
                true
            }
            0x09 => {
                self.active_buffer_mut().tab();
                true
            }
            0x0A | 0x0C => {
                self.active_buffer_mut().new_line();
                true
            }
            0x0B => {
                self.active_buffer_mut().vertical_tab();
                true
            }
            0x0D => {
                self.active_buffer_mut().carriage_return();
                true
            }
            0x0E => {
                self.active_buffer_mut().shift_out();
                false
            }
            0x0F => {
                self.active_buffer_mut().shift_in();
                false
            }
            c if c < 0x20 => false,
            _ => {
                let translated = self.active_buffer().translate(ch);
                self.active_buffer_mut().write(&[translated]);
                true
            }
        }
    }

    fn process_escape(&mut self, ch: char) -> bool {
        match ch {
            '[' => {
                self.state =
                    ParserState::Csi { private: false, secondary: false, params: Vec::new(), current: String::new() };
                false
            }
            ']' => {
                self.state = ParserState::Osc { buf: String::new() };
                false
            }
            'c' => {
                self.full_reset();
                self.state = ParserState::Ground;
                true
            }
            _ => {
                self.passthrough.push(0x1B);
                let mut buf = [0u8; 4];
                self.passthrough.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                self.state = ParserState::Ground;
                false
            }
        }
    }

    fn process_csi(
        &mut self,
        ch: char,
        mut private: bool,
        mut secondary: bool,
        mut params: Vec<String>,
        mut current: String,
    ) -> bool {
        match ch as u32 {
            0x3F if params.is_empty() && current.is_empty() => {
                // '?' — DEC-private marker, only meaningful as the very
                // first byte of the sequence.
                private = true;
                self.state = ParserState::Csi { private, secondary, params, current };
                false
            }
            0x3E if params.is_empty() && current.is_empty() => {
                // '>' — secondary-DA marker, same positional rule as '?'.
                secondary = true;
                self.state = ParserState::Csi { private, secondary, params, current };
                false
            }
            0x30..=0x39 => {
                current.push(ch);
                self.state = ParserState::Csi { private, secondary, params, current };
                false
            }
            0x3B => {
                params.push(normalise_param(&current));
                current.clear();
                self.state = ParserState::Csi { private, secondary, params, current };
                false
            }
            0x20..=0x2F => {
                // Intermediate byte: not used by any handler in this table;
                // accumulated then dropped at dispatch.
                self.state = ParserState::Csi { private, secondary, params, current };
                false
            }
            0x40..=0x7E => {
                params.push(normalise_param(&current));
                self.state = ParserState::Ground;
                self.dispatch_csi(ch, private, secondary, &params)
            }
            _ => {
                // Malformed CSI byte: drop the whole sequence silently.
                self.state = ParserState::Ground;
                false
            }
        }
    }

    fn process_osc(&mut self, ch: char, mut buf: String) -> bool {
        match ch as u32 {
            0x07 | 0x9C => {
                self.state = ParserState::Ground;
                self.dispatch_osc(&buf);
                false
            }
            0x1B => {
                // Might be the ST (`ESC \`) terminator; treat any further
                // escape as closing the OSC string per the simplified table.
                self.state = ParserState::Ground;
                self.dispatch_osc(&buf);
                false
            }
            _ => {
                buf.push(ch);
                self.state = ParserState::Osc { buf };
                false
            }
        }
    }

    fn dispatch_osc(&mut self, buf: &str) {
        let mut parts = buf.splitn(2, ';');
        let code = parts.next().unwrap_or_default();
        let rest = parts.next().unwrap_or_default();
        match code {
            "0" | "2" => {
                self.title = rest.to_string();
            }
            "10" => {
                self.writer.write(b"\x1b]10;15");
            }
            "11" => {
                self.writer.write(b"\x1b]10;0");
            }
            _ => {}
        }
    }

    fn dispatch_csi(&mut self, finalb: char, private: bool, secondary: bool, params: &[String]) -> bool {
        let p = |i: usize, default: i64| -> i64 {
            params.get(i).and_then(|s| s.parse::<i64>().ok()).filter(|&v| v != 0).unwrap_or(default)
        };
        let buf = self.active_buffer_mut();
        match finalb {
            'A' => {
                let n = p(0, 1);
                buf.move_position(0, -n);
                true
            }
            'B' => {
                let n = p(0, 1);
                buf.move_position(0, n);
                true
            }
            'C' => {
                let n = p(0, 1);
                buf.move_position(n, 0);
                true
            }
            'D' => {
                let n = p(0, 1);
                buf.move_position(-n, 0);
                true
            }
            'E' => {
                let n = p(0, 1);
                buf.move_position(0, n);
                buf.carriage_return();
                true
            }
            'F' => {
                let n = p(0, 1);
                buf.move_position(0, -n);
                buf.carriage_return();
                true
            }
            'G' => {
                let col = p(0, 1) - 1;
                buf.set_position(col.max(0) as usize, buf.cursor_y());
                true
            }
            'H' | 'f' => {
                let row = p(0, 1) - 1;
                let col = p(1, 1) - 1;
                buf.set_position(col.max(0) as usize, row.max(0) as usize);
                true
            }
            'J' => {
                match params.first().map(String::as_str).unwrap_or("0") {
                    "1" => buf.erase_display_to_cursor(),
                    "2" | "3" => buf.erase_display(),
                    _ => buf.erase_display_from_cursor(),
                }
                true
            }
            'K' => {
                match params.first().map(String::as_str).unwrap_or("0") {
                    "1" => buf.erase_line_to_cursor(),
                    "2" => buf.erase_line(),
                    _ => buf.erase_line_from_cursor(),
                }
                true
            }
            'L' => {
                buf.insert_lines(p(0, 1).max(1) as usize);
                true
            }
            'M' => {
                buf.delete_lines(p(0, 1).max(1) as usize);
                true
            }
            'P' => {
                buf.delete_chars(p(0, 1).max(1) as usize);
                true
            }
            'S' => {
                buf.area_scroll_up(p(0, 1).max(1) as usize);
                true
            }
            'T' => {
                buf.area_scroll_down(p(0, 1).max(1) as usize);
                true
            }
            'X' => {
                buf.erase_characters(p(0, 1).max(1) as usize);
                true
            }
            '@' => {
                buf.insert_blank_characters(p(0, 1).max(1) as usize);
                true
            }
            'c' => {
                if secondary {
                    self.writer.write(b"\x1b[>0;0;0c");
                } else {
                    let _ = private;
                    self.writer.write(b"\x1b[?1;2c");
                }
                false
            }
            'n' => {
                match params.first().map(String::as_str).unwrap_or("0") {
                    "5" => self.writer.write(b"\x1b[0n"),
                    "6" => {
                        let row = self.active_buffer().cursor_y() + 1;
                        let col = self.active_buffer().cursor_x() + 1;
                        self.writer.write(format!("\x1b[{row};{col}R").as_bytes());
                    }
                    _ => {}
                }
                false
            }
            'r' => {
                let top = (p(0, 1) - 1).max(0) as usize;
                let bottom = if params.len() > 1 { (p(1, 1) - 1).max(0) as usize } else { buf.view_height() - 1 };
                buf.set_vertical_margins(top, bottom);
                true
            }
            'd' => {
                let row = (p(0, 1) - 1).max(0) as usize;
                let col = buf.cursor_x();
                buf.set_position(col, row);
                true
            }
            'g' => {
                match params.first().map(String::as_str).unwrap_or("0") {
                    "3" => buf.tab_reset(),
                    _ => buf.tab_clear_at_cursor(),
                }
                true
            }
            'h' => {
                self.set_reset_modes(params, private, true);
                true
            }
            'l' => {
                self.set_reset_modes(params, private, false);
                true
            }
            'm' => {
                self.sgr(params);
                true
            }
            _ => {
                tracing::trace!(final_byte = %finalb, ?params, "dropping unrecognised CSI sequence");
                false
            }
        }
    }

    fn set_reset_modes(&mut self, params: &[String], private: bool, set: bool) {
        for raw in params {
            let code = raw.as_str();
            if private {
                match code {
                    "1" => self.active_buffer_mut().modes.application_cursor_keys = set,
                    "3" => {
                        let (w, h) = (if set { 132 } else { 80 }, self.active_buffer().view_height());
                        self.active_buffer_mut().resize_view(w, h);
                        self.active_buffer_mut().really_clear();
                    }
                    "5" => self.active_buffer_mut().modes.screen_mode = set,
                    "6" => self.active_buffer_mut().modes.origin_mode = set,
                    "7" => self.active_buffer_mut().modes.auto_wrap = set,
                    "9" => {
                        self.active_buffer_mut().mouse_mode =
                            if set { crate::term::modes::MouseMode::X10 } else { crate::term::modes::MouseMode::None };
                    }
                    "12" | "13" => self.active_buffer_mut().modes.blinking_cursor = set,
                    "25" => self.active_buffer_mut().modes.show_cursor = set,
                    "47" | "1047" => self.switch_buffer(if set { BufferKind::Alt } else { BufferKind::Main }),
                    "1000" => {
                        self.active_buffer_mut().mouse_mode =
                            if set { crate::term::modes::MouseMode::Vt200 } else { crate::term::modes::MouseMode::None };
                    }
                    "1002" => {
                        self.active_buffer_mut().mouse_mode =
                            if set { crate::term::modes::MouseMode::ButtonEvent } else { crate::term::modes::MouseMode::None };
                    }
                    "1006" => {
                        self.active_buffer_mut().mouse_ext_mode =
                            if set { crate::term::modes::MouseExtMode::Sgr } else { crate::term::modes::MouseExtMode::None };
                    }
                    "1015" => {
                        self.active_buffer_mut().mouse_ext_mode =
                            if set { crate::term::modes::MouseExtMode::Urxvt } else { crate::term::modes::MouseExtMode::None };
                    }
                    "1048" => {
                        if set {
                            self.active_buffer_mut().save_cursor();
                        } else {
                            self.active_buffer_mut().restore_cursor();
                        }
                    }
                    "1049" => {
                        if set {
                            self.active_buffer_mut().save_cursor();
                            self.switch_buffer(BufferKind::Alt);
                        } else {
                            self.switch_buffer(BufferKind::Main);
                            self.active_buffer_mut().restore_cursor();
                        }
                    }
                    "2004" => self.active_buffer_mut().bracketed_paste_mode = set,
                    other => tracing::trace!(mode = other, "dropping unrecognised private mode"),
                }
            } else {
                match code {
                    "4" => self.active_buffer_mut().modes.replace_mode = !set,
                    "20" => self.active_buffer_mut().modes.line_feed_mode = set,
                    other => tracing::trace!(mode = other, "dropping unrecognised mode"),
                }
            }
        }
    }

    fn sgr(&mut self, params: &[String]) {
        let params: Vec<String> =
            if params.is_empty() { vec!["0".to_string()] } else { params.to_vec() };
        let mut attr = self.active_buffer().cursor_attr().clone();
        let mut i = 0;
        while i < params.len() {
            let code: i64 = params[i].parse().unwrap_or(0);
            match code {
                0 => attr = crate::term::cell::Attr::default(),
                1 => attr.bold = true,
                2 => attr.dim = true,
                4 => attr.underline = true,
                5 => attr.blink = true,
                7 => attr.inverse = true,
                8 => attr.hidden = true,
                22 => {
                    attr.bold = false;
                    attr.dim = false;
                }
                24 => attr.underline = false,
                25 => attr.blink = false,
                27 => attr.inverse = false,
                28 => attr.hidden = false,
                30..=37 | 90..=97 => attr.fg = code.to_string(),
                39 => attr.fg = String::new(),
                40..=47 | 100..=107 => attr.bg = code.to_string(),
                49 => attr.bg = String::new(),
                38 | 48 => {
                    let mut token = vec![code.to_string()];
                    i += 1;
                    while i < params.len() {
                        token.push(params[i].clone());
                        i += 1;
                        if token.len() >= 3 && token[1] == "5" {
                            break;
                        }
                        if token.len() >= 5 && token[1] == "2" {
                            break;
                        }
                    }
                    i -= 1;
                    let joined = token.join(";");
                    if code == 38 {
                        attr.fg = joined;
                    } else {
                        attr.bg = joined;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        self.active_buffer_mut().set_cursor_attr(attr);
    }
}

fn normalise_param(s: &str) -> String {
    let trimmed = s.trim_start_matches('0');
    if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    impl Emulator {
        /// Test-only: downcast the boxed writer back to `VecWriter` to
        /// inspect query replies.
        fn written(&self) -> &[u8] {
            &self.writer.as_any().downcast_ref::<VecWriter>().expect("VecWriter").0
        }
    }

    fn emu(w: usize, h: usize) -> Emulator {
        Emulator::new(w, h, Box::new(VecWriter::default()))
    }

    #[test]
    fn printable_text_advances_cursor() {
        let mut e = emu(10, 5);
        e.feed(b"hi");
        assert_eq!(e.active_buffer().cursor_x(), 2);
    }

    #[test]
    fn scenario_5_da1_query_replies() {
        let mut e = emu(10, 5);
        e.feed(b"\x1b[c");
        assert_eq!(e.written(), b"\x1b[?1;2c");
    }

    #[test]
    fn secondary_da_query_replies() {
        let mut e = emu(10, 5);
        e.feed(b"\x1b[>c");
        assert_eq!(e.written(), b"\x1b[>0;0;0c");
    }

    #[test]
    fn sgr_reset_then_bold() {
        let mut e = emu(10, 5);
        e.feed(b"\x1b[1m");
        assert!(e.active_buffer().cursor_attr().bold);
        e.feed(b"\x1b[0m");
        assert!(!e.active_buffer().cursor_attr().bold);
    }

    #[test]
    fn csi_cup_moves_cursor() {
        let mut e = emu(20, 10);
        e.feed(b"\x1b[3;5H");
        assert_eq!(e.active_buffer().cursor_y(), 2);
        assert_eq!(e.active_buffer().cursor_x(), 4);
    }

    #[test]
    fn mode_1049_switches_to_alt_and_back() {
        let mut e = emu(10, 5);
        e.feed(b"hello");
        e.feed(b"\x1b[?1049h");
        assert_eq!(e.active_buffer().cursor_x(), 0);
        e.feed(b"\x1b[?1049l");
        assert_eq!(e.active_buffer().cursor_x(), 5);
    }

    #[test]
    fn unknown_esc_sequence_is_passed_through() {
        let mut e = emu(10, 5);
        e.feed(b"\x1bZ");
        assert_eq!(e.drain_passthrough(), b"\x1bZ");
    }

    #[test]
    fn osc_title_sets_title() {
        let mut e = emu(10, 5);
        e.feed(b"\x1b]0;my title\x07");
        assert_eq!(e.title(), "my title");
    }

    // CSI cursor-movement finals, table-driven over (final byte, expected
    // (x, y) after starting at (5, 5) in a 20x20 buffer with no params.
    #[test_case(b"\x1b[A", (5, 4); "CUU default moves up one")]
    #[test_case(b"\x1b[B", (5, 6); "CUD default moves down one")]
    #[test_case(b"\x1b[C", (6, 5); "CUF default moves right one")]
    #[test_case(b"\x1b[D", (4, 5); "CUB default moves left one")]
    #[test_case(b"\x1b[3A", (5, 2); "CUU honours an explicit count")]
    #[test_case(b"\x1b[E", (0, 6); "CNL moves down and resets column")]
    #[test_case(b"\x1b[F", (0, 4); "CPL moves up and resets column")]
    #[test_case(b"\x1b[10G", (9, 5); "CHA sets the column only")]
    #[test_case(b"\x1b[3d", (5, 2); "VPA sets the row only")]
    fn csi_cursor_movement_table(seq: &[u8], expect: (usize, usize)) {
        let mut e = emu(20, 20);
        e.feed(b"\x1b[6;6H"); // home to (5, 5) 0-indexed
        e.feed(seq);
        assert_eq!((e.active_buffer().cursor_x(), e.active_buffer().cursor_y()), expect);
    }

    // SGR parameter codes, table-driven over (params, expected attr field).
    #[test_case(b"\x1b[1m", true, false, false; "bold on")]
    #[test_case(b"\x1b[1;22m", false, false, false; "bold on then off")]
    #[test_case(b"\x1b[4m", false, true, false; "underline on")]
    #[test_case(b"\x1b[7m", false, false, true; "inverse on")]
    fn sgr_on_off_table(seq: &[u8], bold: bool, underline: bool, inverse: bool) {
        let mut e = emu(10, 5);
        e.feed(seq);
        let attr = e.active_buffer().cursor_attr();
        assert_eq!(attr.bold, bold);
        assert_eq!(attr.underline, underline);
        assert_eq!(attr.inverse, inverse);
    }

    #[test_case(b"\x1b[31m", "31"; "basic fg red")]
    #[test_case(b"\x1b[97m", "97"; "bright fg white")]
    #[test_case(b"\x1b[38;5;200m", "38;5;200"; "256-colour fg")]
    #[test_case(b"\x1b[38;2;10;20;30m", "38;2;10;20;30"; "truecolor fg")]
    fn sgr_extended_fg_colour_table(seq: &[u8], expect_fg: &str) {
        let mut e = emu(10, 5);
        e.feed(seq);
        assert_eq!(e.active_buffer().cursor_attr().fg, expect_fg);
    }
}
