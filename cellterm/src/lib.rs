//! A terminal UI substrate: a double-buffered cell grid, terminfo-driven
//! capability resolution, and a unified keyboard/mouse/resize event stream.
//!
//! [`Session`] is the entry point: it owns the tty, the raw-mode switch, the
//! alternate screen, and the back/front cell buffers, and exposes the
//! present/poll-event cycle most callers want. The lower layers are split
//! into `cellterm-core` (cell grid, terminfo, rendering) and `cellterm-input`
//! (escape-sequence decoding) for callers who want to drive those pieces
//! directly without a live tty, e.g. in tests.

pub mod session;

pub use cellterm_core::{Attr, CapId, CapabilityStore, Cell, CellBuffer, EitherChar, OutputMode};
pub use cellterm_core::error::{Error, Result};
pub use cellterm_input::{Collision, Event, InputMode, KeyCode, KeyEvent, Modifiers, MouseButton};
pub use session::Session;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
