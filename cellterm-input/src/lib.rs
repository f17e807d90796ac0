//! Escape-sequence trie, mouse-protocol parsers, and the input decoder
//! state machine that turns terminal input bytes into [`event::Event`]s.

pub mod decode;
pub mod event;
pub mod mouse;
pub mod trie;
pub mod utf8;

pub use decode::{Decoded, Decoder, EscHook, InputMode};
pub use event::{Event, KeyCode, KeyEvent, Modifiers, MouseButton};
pub use trie::{Leaf, Trie, TrieMatch};

/// A capability string that named a key already claimed by an earlier
/// insertion. Recorded for introspection rather than failing trie
/// construction; the earlier insertion (always the store's own key
/// capability, since that phase runs before the builtin phase) keeps its
/// leaf.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Collision {
    pub sequence: Vec<u8>,
    pub key: KeyCode,
    pub modifiers: Modifiers,
}

/// Build a trie from a resolved capability store plus the builtin
/// modifier-decorated sequence table, per §4.4. Collisions during the
/// second phase are reported via the returned `Vec<Collision>` plus a
/// `warn!` log line, but are not fatal: the capability store's insertion
/// always wins since it runs first.
pub fn build_trie(caps: &cellterm_core::CapabilityStore) -> (Trie, Vec<Collision>) {
    use cellterm_core::error::Error;
    use cellterm_core::CapId;
    let mut trie = Trie::new();
    let mut collisions = Vec::new();

    let key_code_for = |id: CapId| -> Option<KeyCode> {
        Some(match id {
            CapId::F1 => KeyCode::F1,
            CapId::F2 => KeyCode::F2,
            CapId::F3 => KeyCode::F3,
            CapId::F4 => KeyCode::F4,
            CapId::F5 => KeyCode::F5,
            CapId::F6 => KeyCode::F6,
            CapId::F7 => KeyCode::F7,
            CapId::F8 => KeyCode::F8,
            CapId::F9 => KeyCode::F9,
            CapId::F10 => KeyCode::F10,
            CapId::F11 => KeyCode::F11,
            CapId::F12 => KeyCode::F12,
            CapId::Insert => KeyCode::Insert,
            CapId::Delete => KeyCode::Delete,
            CapId::Home => KeyCode::Home,
            CapId::End => KeyCode::End,
            CapId::PgUp => KeyCode::PgUp,
            CapId::PgDn => KeyCode::PgDn,
            CapId::ArrowUp => KeyCode::ArrowUp,
            CapId::ArrowDown => KeyCode::ArrowDown,
            CapId::ArrowLeft => KeyCode::ArrowLeft,
            CapId::ArrowRight => KeyCode::ArrowRight,
            CapId::BackTab => KeyCode::BackTab,
            _ => return None,
        })
    };

    for (id, seq) in caps.key_caps() {
        if seq.is_empty() {
            continue;
        }
        let Some(key) = key_code_for(id) else { continue };
        let leaf = Leaf { key, modifiers: Modifiers::empty() };
        if let Err(Error::CapCollision(sequence)) = trie.insert(seq, leaf) {
            log::warn!("capability trie collision inserting {sequence:?}");
            collisions.push(Collision { sequence, key, modifiers: leaf.modifiers });
        }
    }

    for m in cellterm_core::builtin::mod_caps() {
        let Some(key) = key_code_for(m.cap) else { continue };
        let mut modifiers = Modifiers::empty();
        if m.modifiers & cellterm_core::builtin::MOD_ALT != 0 {
            modifiers |= Modifiers::ALT;
        }
        if m.modifiers & cellterm_core::builtin::MOD_CTRL != 0 {
            modifiers |= Modifiers::CTRL;
        }
        if m.modifiers & cellterm_core::builtin::MOD_SHIFT != 0 {
            modifiers |= Modifiers::SHIFT;
        }
        let leaf = Leaf { key, modifiers };
        if let Err(Error::CapCollision(sequence)) = trie.insert(m.seq.as_bytes(), leaf) {
            log::warn!("builtin modifier trie collision inserting {sequence:?}");
            collisions.push(Collision { sequence, key, modifiers: leaf.modifiers });
        }
    }

    (trie, collisions)
}
