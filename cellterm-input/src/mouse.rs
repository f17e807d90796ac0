//! Mouse-protocol parsers: VT200/X10, xterm 1006 (SGR), and urxvt 1015.
//!
//! Each tries to match its own fixed prefix; a sequence that matches a
//! prefix but turns out malformed consumes the whole buffer and reports no
//! match rather than partially advancing, per §4.5's "defensive" note.

use std::convert::TryFrom;

use crate::event::{Modifiers, MouseButton};

#[derive(Debug, PartialEq, Eq)]
pub struct MouseEvent {
    pub button: MouseButton,
    pub x: u16,
    pub y: u16,
    pub modifiers: Modifiers,
}

#[derive(Debug, PartialEq, Eq)]
pub enum MouseParse {
    Match { event: MouseEvent, consumed: usize },
    NeedMore,
    NoMatch { consumed: usize },
}

/// Decode `Cb` into a button and the `motion` modifier: low 2 bits select
/// left/middle/right/release, bit 6 (`0x40`) turns left/middle into
/// wheel-up/wheel-down, bit 5 (`0x20`) is the drag-motion flag. None of the
/// three encodings carry shift/ctrl/alt for mouse events.
fn button_from_cb(cb: i64) -> (MouseButton, Modifiers) {
    let modifiers = if cb & 0x20 != 0 { Modifiers::MOTION } else { Modifiers::empty() };

    let button = match cb & 0x03 {
        0 if cb & 0x40 != 0 => MouseButton::WheelUp,
        0 => MouseButton::Left,
        1 if cb & 0x40 != 0 => MouseButton::WheelDown,
        1 => MouseButton::Middle,
        2 => MouseButton::Right,
        _ => MouseButton::Release,
    };

    (button, modifiers)
}

/// `"\x1b[M" + Cb Cx Cy`, each offset by `0x20`.
pub fn parse_vt200(buf: &[u8]) -> MouseParse {
    const PREFIX: &[u8] = b"\x1b[M";
    if !buf.starts_with(PREFIX) {
        return MouseParse::NoMatch { consumed: 0 };
    }
    if buf.len() < PREFIX.len() + 3 {
        return MouseParse::NeedMore;
    }

    let cb = i64::from(buf[3].wrapping_sub(0x20));
    let cx = i64::from(buf[4].wrapping_sub(0x20));
    let cy = i64::from(buf[5].wrapping_sub(0x20));

    if cx < 1 || cy < 1 {
        return MouseParse::NoMatch { consumed: buf.len() };
    }

    let (button, modifiers) = button_from_cb(cb);
    MouseParse::Match {
        event: MouseEvent {
            button,
            x: u16::try_from(cx - 1).unwrap_or(0),
            y: u16::try_from(cy - 1).unwrap_or(0),
            modifiers,
        },
        consumed: PREFIX.len() + 3,
    }
}

/// Parse the decimal `Cb;Cx;Cy` body shared by the 1006 and 1015 encodings,
/// starting at `buf[start]`. Returns `(cb, cx, cy, bytes consumed from
/// start, terminator byte)` or `None` if the body is malformed or the
/// buffer ends before a terminator is seen.
fn parse_decimal_triplet(buf: &[u8], start: usize) -> Option<(i64, i64, i64, usize)> {
    let mut pos = start;
    let mut fields = [0i64; 3];
    for field in fields.iter_mut() {
        let field_start = pos;
        while pos < buf.len() && buf[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos == field_start {
            return None;
        }
        *field = std::str::from_utf8(&buf[field_start..pos]).ok()?.parse().ok()?;
        if pos >= buf.len() {
            return None;
        }
        let sep = buf[pos];
        if sep == b';' {
            pos += 1;
        } else {
            break;
        }
    }
    Some((fields[0], fields[1], fields[2], pos))
}

/// `"\x1b[<" + Cb;Cx;Cy` followed by `M` (press/motion) or `m` (release).
pub fn parse_1006(buf: &[u8]) -> MouseParse {
    const PREFIX: &[u8] = b"\x1b[<";
    if !buf.starts_with(PREFIX) {
        return MouseParse::NoMatch { consumed: 0 };
    }

    let Some((cb, cx, cy, after)) = parse_decimal_triplet(buf, PREFIX.len()) else {
        return if buf.len() < PREFIX.len() + 6 {
            MouseParse::NeedMore
        } else {
            MouseParse::NoMatch { consumed: buf.len() }
        };
    };

    let Some(&term) = buf.get(after) else {
        return MouseParse::NeedMore;
    };
    if term != b'M' && term != b'm' {
        return MouseParse::NoMatch { consumed: buf.len() };
    }
    if cx < 1 || cy < 1 {
        return MouseParse::NoMatch { consumed: after + 1 };
    }

    let (mut button, modifiers) = button_from_cb(cb);
    if term == b'm' {
        button = MouseButton::Release;
    }

    MouseParse::Match {
        event: MouseEvent {
            button,
            x: u16::try_from(cx - 1).unwrap_or(0),
            y: u16::try_from(cy - 1).unwrap_or(0),
            modifiers,
        },
        consumed: after + 1,
    }
}

/// `"\x1b[" + Cb;Cx;Cy` followed by a literal `M`, with `Cb` offset by
/// `0x20` like the VT200 encoding (unlike 1006, which sends `Cb` raw).
pub fn parse_1015(buf: &[u8]) -> MouseParse {
    const PREFIX: &[u8] = b"\x1b[";
    if !buf.starts_with(PREFIX) || buf.get(2).is_some_and(|&b| b == b'<') {
        return MouseParse::NoMatch { consumed: 0 };
    }
    if !buf.get(2).is_some_and(u8::is_ascii_digit) {
        return MouseParse::NoMatch { consumed: 0 };
    }

    let Some((cb, cx, cy, after)) = parse_decimal_triplet(buf, PREFIX.len()) else {
        return if buf.len() < PREFIX.len() + 6 {
            MouseParse::NeedMore
        } else {
            MouseParse::NoMatch { consumed: buf.len() }
        };
    };

    let Some(&term) = buf.get(after) else {
        return MouseParse::NeedMore;
    };
    if term != b'M' {
        return MouseParse::NoMatch { consumed: buf.len() };
    }
    if cx < 1 || cy < 1 {
        return MouseParse::NoMatch { consumed: after + 1 };
    }

    let (button, modifiers) = button_from_cb(cb - 0x20);
    MouseParse::Match {
        event: MouseEvent {
            button,
            x: u16::try_from(cx - 1).unwrap_or(0),
            y: u16::try_from(cy - 1).unwrap_or(0),
            modifiers,
        },
        consumed: after + 1,
    }
}

/// Try the three encodings in order against `buf`, which is expected to
/// start with ESC.
pub fn parse(buf: &[u8]) -> MouseParse {
    match parse_vt200(buf) {
        MouseParse::NoMatch { consumed: 0 } => {}
        other => return other,
    }
    match parse_1006(buf) {
        MouseParse::NoMatch { consumed: 0 } => {}
        other => return other,
    }
    parse_1015(buf)
}
