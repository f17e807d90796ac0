//! Builtin fallback capability tables for terminals without a readable
//! terminfo entry, plus the fixed table of modifier-decorated xterm
//! sequences layered on top of whichever table wins.
//!
//! These are the same six terminal descriptions and the same extended-key
//! table termbox2 ships as `builtin_terms`/`builtin_mod_caps`: transcribed
//! once here so a `cellterm` session works out of the box under `xterm`,
//! `linux`, `screen`/`tmux`, `rxvt-256color`, `rxvt-unicode`/`rxvt` and
//! `Eterm` even when `$TERMINFO` can't be read.

use crate::capability::CapId;

macro_rules! caps {
    ($($s:expr),* $(,)?) => {
        [$($s),*]
    };
}

const XTERM: [&str; CapId::COUNT] = caps![
    "\x1bOP", "\x1bOQ", "\x1bOR", "\x1bOS", "\x1b[15~", "\x1b[17~", "\x1b[18~", "\x1b[19~",
    "\x1b[20~", "\x1b[21~", "\x1b[23~", "\x1b[24~", "\x1b[2~", "\x1b[3~", "\x1bOH", "\x1bOF",
    "\x1b[5~", "\x1b[6~", "\x1bOA", "\x1bOB", "\x1bOD", "\x1bOC", "\x1b[Z",
    "\x1b[?1049h\x1b[22;0;0t", "\x1b[?1049l\x1b[23;0;0t", "\x1b[?12l\x1b[?25h", "\x1b[?25l",
    "\x1b[H\x1b[2J", "\x1b(B\x1b[m", "\x1b[4m", "\x1b[1m", "\x1b[5m", "\x1b[3m", "\x1b[7m",
    "\x1b[?1h\x1b=", "\x1b[?1l\x1b>",
];

const LINUX: [&str; CapId::COUNT] = caps![
    "\x1b[[A", "\x1b[[B", "\x1b[[C", "\x1b[[D", "\x1b[[E", "\x1b[17~", "\x1b[18~", "\x1b[19~",
    "\x1b[20~", "\x1b[21~", "\x1b[23~", "\x1b[24~", "\x1b[2~", "\x1b[3~", "\x1b[1~", "\x1b[4~",
    "\x1b[5~", "\x1b[6~", "\x1b[A", "\x1b[B", "\x1b[D", "\x1b[C", "\x1b[Z", "", "",
    "\x1b[?25h\x1b[?0c", "\x1b[?25l\x1b[?1c", "\x1b[H\x1b[J", "\x1b[m\x0f", "\x1b[4m", "\x1b[1m",
    "\x1b[5m", "", "\x1b[7m", "", "",
];

const SCREEN: [&str; CapId::COUNT] = caps![
    "\x1bOP", "\x1bOQ", "\x1bOR", "\x1bOS", "\x1b[15~", "\x1b[17~", "\x1b[18~", "\x1b[19~",
    "\x1b[20~", "\x1b[21~", "\x1b[23~", "\x1b[24~", "\x1b[2~", "\x1b[3~", "\x1b[1~", "\x1b[4~",
    "\x1b[5~", "\x1b[6~", "\x1bOA", "\x1bOB", "\x1bOD", "\x1bOC", "\x1b[Z", "\x1b[?1049h",
    "\x1b[?1049l", "\x1b[34h\x1b[?25h", "\x1b[?25l", "\x1b[H\x1b[J", "\x1b[m\x0f", "\x1b[4m",
    "\x1b[1m", "\x1b[5m", "", "\x1b[7m", "\x1b[?1h\x1b=", "\x1b[?1l\x1b>",
];

const RXVT_256COLOR: [&str; CapId::COUNT] = caps![
    "\x1b[11~", "\x1b[12~", "\x1b[13~", "\x1b[14~", "\x1b[15~", "\x1b[17~", "\x1b[18~",
    "\x1b[19~", "\x1b[20~", "\x1b[21~", "\x1b[23~", "\x1b[24~", "\x1b[2~", "\x1b[3~", "\x1b[7~",
    "\x1b[8~", "\x1b[5~", "\x1b[6~", "\x1b[A", "\x1b[B", "\x1b[D", "\x1b[C", "\x1b[Z",
    "\x1b7\x1b[?47h", "\x1b[2J\x1b[?47l\x1b8", "\x1b[?25h", "\x1b[?25l", "\x1b[H\x1b[2J",
    "\x1b[m\x0f", "\x1b[4m", "\x1b[1m", "\x1b[5m", "", "\x1b[7m", "\x1b=", "\x1b>",
];

const RXVT_UNICODE: [&str; CapId::COUNT] = caps![
    "\x1b[11~", "\x1b[12~", "\x1b[13~", "\x1b[14~", "\x1b[15~", "\x1b[17~", "\x1b[18~",
    "\x1b[19~", "\x1b[20~", "\x1b[21~", "\x1b[23~", "\x1b[24~", "\x1b[2~", "\x1b[3~", "\x1b[7~",
    "\x1b[8~", "\x1b[5~", "\x1b[6~", "\x1b[A", "\x1b[B", "\x1b[D", "\x1b[C", "\x1b[Z",
    "\x1b[?1049h", "\x1b[r\x1b[?1049l", "\x1b[?12l\x1b[?25h", "\x1b[?25l", "\x1b[H\x1b[2J",
    "\x1b[m\x1b(B", "\x1b[4m", "\x1b[1m", "\x1b[5m", "\x1b[3m", "\x1b[7m", "\x1b=", "\x1b>",
];

const ETERM: [&str; CapId::COUNT] = caps![
    "\x1b[11~", "\x1b[12~", "\x1b[13~", "\x1b[14~", "\x1b[15~", "\x1b[17~", "\x1b[18~",
    "\x1b[19~", "\x1b[20~", "\x1b[21~", "\x1b[23~", "\x1b[24~", "\x1b[2~", "\x1b[3~", "\x1b[7~",
    "\x1b[8~", "\x1b[5~", "\x1b[6~", "\x1b[A", "\x1b[B", "\x1b[D", "\x1b[C", "",
    "\x1b7\x1b[?47h", "\x1b[2J\x1b[?47l\x1b8", "\x1b[?25h", "\x1b[?25l", "\x1b[H\x1b[2J",
    "\x1b[m\x0f", "\x1b[4m", "\x1b[1m", "\x1b[5m", "", "\x1b[7m", "", "",
];

struct BuiltinTerm {
    name: &'static str,
    alias: &'static str,
    caps: &'static [&'static str; CapId::COUNT],
}

const BUILTIN_TERMS: &[BuiltinTerm] = &[
    BuiltinTerm { name: "xterm", alias: "", caps: &XTERM },
    BuiltinTerm { name: "linux", alias: "", caps: &LINUX },
    BuiltinTerm { name: "screen", alias: "tmux", caps: &SCREEN },
    BuiltinTerm { name: "rxvt-256color", alias: "", caps: &RXVT_256COLOR },
    BuiltinTerm { name: "rxvt-unicode", alias: "rxvt", caps: &RXVT_UNICODE },
    BuiltinTerm { name: "Eterm", alias: "", caps: &ETERM },
];

/// Resolve `$TERM` to one of the builtin tables. Matches the exact name or
/// alias first; if nothing matches, falls back to the `xterm` table since
/// most terminals emulate xterm's key sequences closely enough to be
/// usable.
pub fn lookup(term_name: &str) -> &'static [&'static str; CapId::COUNT] {
    for t in BUILTIN_TERMS {
        if t.name == term_name || (!t.alias.is_empty() && t.alias == term_name) {
            return t.caps;
        }
    }
    &XTERM
}

pub fn to_owned_table(table: &[&str; CapId::COUNT]) -> Vec<Vec<u8>> {
    table.iter().map(|s| s.as_bytes().to_vec()).collect()
}

/// One modifier-decorated extended key sequence: xterm's `CSI 1;<mod><final>`
/// family for arrows/Home/End and `CSI <n>;<mod>~` for Insert/Delete/
/// PgUp/PgDn/F-keys. These are layered into the input trie in addition to
/// whichever resolved table is active, since most terminals emit them
/// regardless of the base `TERM` capability strings.
#[derive(Clone, Copy)]
pub struct ModCap {
    pub seq: &'static str,
    pub cap: CapId,
    pub modifiers: u8,
}

pub const MOD_ALT: u8 = 1;
pub const MOD_CTRL: u8 = 2;
pub const MOD_SHIFT: u8 = 4;

macro_rules! mod_caps_for {
    ($prefix:literal, $suffix:literal, $cap:expr) => {
        [
            ModCap { seq: concat!("\x1b[", $prefix, ";2", $suffix), cap: $cap, modifiers: MOD_SHIFT },
            ModCap { seq: concat!("\x1b[", $prefix, ";3", $suffix), cap: $cap, modifiers: MOD_ALT },
            ModCap { seq: concat!("\x1b[", $prefix, ";4", $suffix), cap: $cap, modifiers: MOD_ALT | MOD_SHIFT },
            ModCap { seq: concat!("\x1b[", $prefix, ";5", $suffix), cap: $cap, modifiers: MOD_CTRL },
            ModCap { seq: concat!("\x1b[", $prefix, ";6", $suffix), cap: $cap, modifiers: MOD_CTRL | MOD_SHIFT },
            ModCap { seq: concat!("\x1b[", $prefix, ";7", $suffix), cap: $cap, modifiers: MOD_CTRL | MOD_ALT },
            ModCap { seq: concat!("\x1b[", $prefix, ";8", $suffix), cap: $cap, modifiers: MOD_CTRL | MOD_ALT | MOD_SHIFT },
        ]
    };
}

/// Flattened list of all modifier-decorated builtin key sequences. Built once
/// per call since the per-key arrays can't be const-flattened into a single
/// array literal.
pub fn mod_caps() -> Vec<ModCap> {
    [
        mod_caps_for!("1", "A", CapId::ArrowUp),
        mod_caps_for!("1", "B", CapId::ArrowDown),
        mod_caps_for!("1", "C", CapId::ArrowRight),
        mod_caps_for!("1", "D", CapId::ArrowLeft),
        mod_caps_for!("1", "H", CapId::Home),
        mod_caps_for!("1", "F", CapId::End),
        mod_caps_for!("2", "~", CapId::Insert),
        mod_caps_for!("3", "~", CapId::Delete),
        mod_caps_for!("5", "~", CapId::PgUp),
        mod_caps_for!("6", "~", CapId::PgDn),
        mod_caps_for!("1", "P", CapId::F1),
        mod_caps_for!("1", "Q", CapId::F2),
        mod_caps_for!("1", "R", CapId::F3),
        mod_caps_for!("1", "S", CapId::F4),
        mod_caps_for!("15", "~", CapId::F5),
        mod_caps_for!("17", "~", CapId::F6),
        mod_caps_for!("18", "~", CapId::F7),
        mod_caps_for!("19", "~", CapId::F8),
    ]
    .iter()
    .flatten()
    .copied()
    .collect()
}

/// Terminal mouse-reporting enable/disable sequences: VT200 + button-motion
/// tracking, plus the 1006 (SGR) and 1015 (urxvt) extended coordinate
/// protocols. Written once by `Session::init` when mouse support isn't
/// explicitly disabled.
pub const ENTER_MOUSE_SEQUENCE: &str = "\x1b[?1000h\x1b[?1002h\x1b[?1015h\x1b[?1006h";
pub const EXIT_MOUSE_SEQUENCE: &str = "\x1b[?1006l\x1b[?1015l\x1b[?1002l\x1b[?1000l";
