//! Event and key-code types the decoder produces.

use bitflags::bitflags;

bitflags! {
    /// Modifier bits carried alongside a key or mouse event.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct Modifiers: u8 {
        const ALT    = 0b0001;
        const CTRL   = 0b0010;
        const SHIFT  = 0b0100;
        const MOTION = 0b1000;
    }
}

/// Symbolic (non-printable) key codes: function keys, navigation, and the
/// control characters that have names of their own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyCode {
    CtrlTilde,
    CtrlA,
    CtrlB,
    CtrlC,
    CtrlD,
    CtrlE,
    CtrlF,
    CtrlG,
    Backspace,
    Tab,
    CtrlJ,
    CtrlK,
    CtrlL,
    Enter,
    CtrlN,
    CtrlO,
    CtrlP,
    CtrlQ,
    CtrlR,
    CtrlS,
    CtrlT,
    CtrlU,
    CtrlV,
    CtrlW,
    CtrlX,
    CtrlY,
    CtrlZ,
    Esc,
    Ctrl4,
    Ctrl5,
    Ctrl6,
    Ctrl7,
    Space,
    Backspace2,
    F1,
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
}

impl KeyCode {
    /// Map a C0 control byte (`< 0x20` or `0x7f`) to its named key, if any.
    pub fn from_ctrl_byte(b: u8) -> Option<KeyCode> {
        use KeyCode::*;
        Some(match b {
            0x00 => CtrlTilde,
            0x01 => CtrlA,
            0x02 => CtrlB,
            0x03 => CtrlC,
            0x04 => CtrlD,
            0x05 => CtrlE,
            0x06 => CtrlF,
            0x07 => CtrlG,
            0x08 => Backspace,
            0x09 => Tab,
            0x0a => CtrlJ,
            0x0b => CtrlK,
            0x0c => CtrlL,
            0x0d => Enter,
            0x0e => CtrlN,
            0x0f => CtrlO,
            0x10 => CtrlP,
            0x11 => CtrlQ,
            0x12 => CtrlR,
            0x13 => CtrlS,
            0x14 => CtrlT,
            0x15 => CtrlU,
            0x16 => CtrlV,
            0x17 => CtrlW,
            0x18 => CtrlX,
            0x19 => CtrlY,
            0x1a => CtrlZ,
            0x1b => Esc,
            0x1c => Ctrl4,
            0x1d => Ctrl5,
            0x1e => Ctrl6,
            0x1f => Ctrl7,
            0x7f => Backspace2,
            _ => return None,
        })
    }
}

/// Which mouse button (or release/wheel) an event reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    Release,
    WheelUp,
    WheelDown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyEvent {
    Code(KeyCode),
    Char(char),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Key { key: KeyEvent, modifiers: Modifiers },
    Resize { width: u16, height: u16 },
    Mouse { button: MouseButton, x: u16, y: u16, modifiers: Modifiers },
}
