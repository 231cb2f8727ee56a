//! The VT/ANSI terminal emulator: cell grid, line storage, and the byte
//! pipeline that drives them.

pub mod buffer;
pub mod cell;
pub mod charset;
pub mod emulator;
pub mod line;
pub mod modes;

pub use buffer::Buffer;
pub use cell::{Attr, Cell};
pub use emulator::{BufferKind, Emulator, EmulatorWriter};
pub use line::Line;
pub use modes::Modes;
