//! Buffer-local mode flags toggled by CSI `h`/`l` (SM/RM).

/// Mouse reporting protocol recorded by `?9`/`?1000`/`?1002`/`?1015`.
///
/// Per the spec's Non-goals, no mouse encoding is ever emitted — these bits
/// are tracked purely so that a future renderer could honour them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseMode {
    #[default]
    None,
    X10,
    Vt200,
    ButtonEvent,
}

/// Mouse coordinate encoding extension recorded by `?1006`/`?1015`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseExtMode {
    #[default]
    None,
    Sgr,
    Urxvt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modes {
    pub show_cursor: bool,
    pub application_cursor_keys: bool,
    pub blinking_cursor: bool,
    pub auto_wrap: bool,
    pub line_feed_mode: bool,
    pub replace_mode: bool,
    pub screen_mode: bool,
    pub origin_mode: bool,
}

impl Default for Modes {
    fn default() -> Self {
        Modes {
            show_cursor: true,
            application_cursor_keys: false,
            blinking_cursor: false,
            auto_wrap: true,
            line_feed_mode: true,
            replace_mode: true,
            screen_mode: false,
            origin_mode: false,
        }
    }
}
