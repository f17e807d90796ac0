//! Terminal capability identifiers and the resolved capability table.
//!
//! A [`CapId`] names one of the escape sequences a terminal driver needs:
//! either a *key* capability (an input sequence the decoder's trie is seeded
//! from) or an *action* capability (an output sequence the renderer emits).
//! The split matters because keys are looked up by trie and actions by
//! direct index.

use crate::error::{Error, Result};

/// One of the 36 capability slots a terminal description can fill.
///
/// Variants `F1..=BackTab` are key capabilities (fed into the input trie);
/// `EnterCa..=ExitKeypad` are action capabilities (written straight to the
/// output buffer). `COUNT_KEYS` and `COUNT` mark the split and the total,
/// matching the layout a terminfo-backed implementation uses to index its
/// string table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(usize)]
pub enum CapId {
    F1 = 0,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    Insert,
    Delete,
    Home,
    End,
    PgUp,
    PgDn,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    BackTab,
    EnterCa,
    ExitCa,
    ShowCursor,
    HideCursor,
    ClearScreen,
    Sgr0,
    Underline,
    Bold,
    Blink,
    Italic,
    Reverse,
    EnterKeypad,
    ExitKeypad,
}

impl CapId {
    pub const COUNT_KEYS: usize = 23;
    pub const COUNT: usize = 36;

    pub const ALL: [CapId; CapId::COUNT] = [
        CapId::F1,
        CapId::F2,
        CapId::F3,
        CapId::F4,
        CapId::F5,
        CapId::F6,
        CapId::F7,
        CapId::F8,
        CapId::F9,
        CapId::F10,
        CapId::F11,
        CapId::F12,
        CapId::Insert,
        CapId::Delete,
        CapId::Home,
        CapId::End,
        CapId::PgUp,
        CapId::PgDn,
        CapId::ArrowUp,
        CapId::ArrowDown,
        CapId::ArrowLeft,
        CapId::ArrowRight,
        CapId::BackTab,
        CapId::EnterCa,
        CapId::ExitCa,
        CapId::ShowCursor,
        CapId::HideCursor,
        CapId::ClearScreen,
        CapId::Sgr0,
        CapId::Underline,
        CapId::Bold,
        CapId::Blink,
        CapId::Italic,
        CapId::Reverse,
        CapId::EnterKeypad,
        CapId::ExitKeypad,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_key(self) -> bool {
        self.index() < Self::COUNT_KEYS
    }

    /// The terminfo string-table index this capability is read from, in the
    /// order terminfo itself assigns them (not this enum's declaration
    /// order).
    pub fn terminfo_index(self) -> i16 {
        TERMINFO_CAP_INDEXES[self.index()]
    }
}

/// `terminfo`'s numeric string-capability indexes, one per [`CapId`], in the
/// exact order the format assigns them (kf1=66, kf2=68, ... rmkx=88).
pub const TERMINFO_CAP_INDEXES: [i16; CapId::COUNT] = [
    66, 68, 69, 70, 71, 72, 73, 74, 75, 67, 216, 217, // F1..F12
    77, 59, 76, 164, 82, 81, // Insert, Delete, Home, End, PgUp, PgDn
    87, 61, 79, 83, 148, // Arrow Up/Down/Left/Right, BackTab
    28, 40, 16, 13, 5, 39, 36, 27, 26, 311, 34, 89, 88,
];

/// A fully resolved set of capability strings for one terminal, either read
/// from a compiled terminfo entry or copied from a builtin fallback table.
#[derive(Clone, Debug)]
pub struct CapabilityStore {
    strings: Vec<Vec<u8>>,
}

impl CapabilityStore {
    /// Build a store from `CapId::COUNT` strings in `CapId` order. Missing
    /// capabilities are represented as empty strings, same as terminfo does
    /// for capabilities a terminal doesn't support.
    pub fn from_strings(strings: Vec<Vec<u8>>) -> Result<CapabilityStore> {
        if strings.len() != CapId::COUNT {
            return Err(Error::Other(format!(
                "capability table must have {} entries, got {}",
                CapId::COUNT,
                strings.len()
            )));
        }
        Ok(CapabilityStore { strings })
    }

    pub fn get(&self, id: CapId) -> &[u8] {
        &self.strings[id.index()]
    }

    pub fn is_present(&self, id: CapId) -> bool {
        !self.get(id).is_empty()
    }

    pub fn key_caps(&self) -> impl Iterator<Item = (CapId, &[u8])> {
        CapId::ALL
            .iter()
            .copied()
            .filter(|c| c.is_key())
            .map(move |c| (c, self.get(c)))
    }
}
