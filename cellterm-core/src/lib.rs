//! Double-buffered cell grid, terminfo-driven capability resolution, and the
//! minimal-diff renderer that turns one into a terminal escape-sequence
//! stream.
//!
//! This crate has no notion of a live terminal session (raw mode, signal
//! handling, event loop) — that lives in the `cellterm` crate, which
//! composes this crate with `cellterm-input`. `cellterm-core` alone is
//! useful for testing renderer/terminfo logic against byte slices without a
//! real tty.

pub mod attr;
pub mod builtin;
pub mod bytebuf;
pub mod capability;
pub mod cell;
pub mod error;
pub mod render;
pub mod terminfo;

pub use attr::{Attr, OutputMode};
pub use bytebuf::ByteBuffer;
pub use capability::{CapId, CapabilityStore};
pub use cell::{Cell, CellBuffer, EitherChar};
pub use error::{Error, Result};
pub use render::{present, RenderState};

/// Resolve capabilities for the terminal named by `$TERM`: try a compiled
/// terminfo entry first, then fall back to the builtin tables. Mirrors the
/// two-phase resolution §4.3 describes.
pub fn resolve_capabilities(term_name: &str) -> Result<CapabilityStore> {
    if let Ok(Some(store)) = terminfo::load_for_env() {
        return Ok(store);
    }
    let table = builtin::lookup(term_name);
    CapabilityStore::from_strings(builtin::to_owned_table(table))
}
