//! The diff renderer: walks back vs. front buffer, emits the minimal SGR +
//! cursor-motion + character stream that brings the terminal in sync.

use std::convert::TryFrom;
use unicode_width::UnicodeWidthChar;

use crate::attr::{self, Attr, OutputMode};
use crate::bytebuf::ByteBuffer;
use crate::capability::{CapId, CapabilityStore};
use crate::cell::{CellBuffer, EitherChar};

/// Tracks what the terminal was last told, so `present` only emits what
/// changed since the previous call.
#[derive(Debug)]
pub struct RenderState {
    pub last_fg: Attr,
    pub last_bg: Attr,
    /// Position of the last emitted character, for cursor elision. `None`
    /// means "nothing emitted yet this present, or last present ended
    /// off-grid".
    last_pos: Option<(u16, u16)>,
    attrs_dirty: bool,
}

impl Default for RenderState {
    fn default() -> RenderState {
        RenderState {
            last_fg: attr::ATTR_DEFAULT_BIT,
            last_bg: attr::ATTR_DEFAULT_BIT,
            last_pos: None,
            attrs_dirty: true,
        }
    }
}

impl RenderState {
    /// Force the next `present` to re-emit SGR even if colors match,
    /// because the terminal state was reset out from under us (e.g. after
    /// a resize clear).
    pub fn force_attrs_dirty(&mut self) {
        self.attrs_dirty = true;
    }
}

fn display_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

fn cluster_width(cluster: &[char]) -> usize {
    cluster.iter().map(|&c| display_width(c).max(1)).sum::<usize>().max(1)
}

/// Diff `back` against `front`, write the minimal update into `out`, then
/// copy `back` into `front` so they match on return (whether or not the
/// caller goes on to flush `out`).
pub fn present(
    caps: &CapabilityStore,
    mode: OutputMode,
    back: &CellBuffer,
    front: &mut CellBuffer,
    state: &mut RenderState,
    cursor: Option<(u16, u16)>,
    out: &mut ByteBuffer,
) {
    let width = back.width();
    let height = back.height();

    for y in 0..height {
        let mut x: u16 = 0;
        while x < width {
            let back_cell = back.get(x, y).expect("in-bounds by loop construction");
            let front_cell = front.get(x, y).expect("in-bounds by loop construction");

            let w = match back_cell.rendered() {
                EitherChar::Single(c) => display_width(c).max(1),
                EitherChar::Cluster(cl) => cluster_width(cl),
            };

            if back_cell == front_cell {
                x += u16::try_from(w).unwrap_or(1).max(1);
                continue;
            }

            let back_cell = back_cell.clone();
            *front.get_mut(x, y).unwrap() = back_cell.clone();

            send_attr(back_cell.fg, back_cell.bg, mode, state, out);

            let elided = matches!(state.last_pos, Some((lx, ly)) if ly == y && lx + 1 == x);
            if !elided {
                emit_cursor_move(out, x, y);
            }

            let overflow = u32::from(x) + w as u32 > u32::from(width);
            if overflow {
                // `front[x,y]` already holds `back_cell` (set above) and must stay
                // that way: the wide/cluster char doesn't fit, so we paint spaces
                // over it, but the front buffer keeps tracking the real character
                // so the next `present` sees `back == front` here and doesn't
                // re-fill. Matches `tb_present`'s single `cell_copy` before this
                // branch, which never re-touches the front cell it just copied.
                for _ in x..width {
                    out.append_bytes(b" ");
                }
                state.last_pos = None;
                x = width;
                continue;
            }

            match back_cell.rendered() {
                EitherChar::Single(c) => {
                    let mut buf = [0u8; 4];
                    out.append_bytes(c.encode_utf8(&mut buf).as_bytes());
                }
                EitherChar::Cluster(cl) => {
                    for &c in cl {
                        let mut buf = [0u8; 4];
                        out.append_bytes(c.encode_utf8(&mut buf).as_bytes());
                    }
                }
            }

            for i in 1..w {
                let fx = x + u16::try_from(i).unwrap_or(0);
                if fx < width {
                    if let Ok(cell) = front.get_mut(fx, y) {
                        *cell = crate::cell::Cell::new('\0', back_cell.fg, back_cell.bg);
                    }
                }
            }

            state.last_pos = Some((x, y));
            x += u16::try_from(w).unwrap_or(1).max(1);
        }
    }

    match cursor {
        Some((cx, cy)) => {
            emit_cursor_move(out, cx, cy);
            out.append_cstr(caps.get(CapId::ShowCursor));
        }
        None => {
            out.append_cstr(caps.get(CapId::HideCursor));
        }
    }
}

fn emit_cursor_move(out: &mut ByteBuffer, x: u16, y: u16) {
    out.append_bytes(format!("\x1b[{};{}H", y + 1, x + 1).as_bytes());
}

/// §4.7 SGR coalescing: no-op if `(fg,bg)` match the last-emitted pair,
/// otherwise reset then re-apply style bits and color per the active
/// output mode.
fn send_attr(fg: Attr, bg: Attr, mode: OutputMode, state: &mut RenderState, out: &mut ByteBuffer) {
    if !state.attrs_dirty && fg == state.last_fg && bg == state.last_bg {
        return;
    }
    state.attrs_dirty = false;
    state.last_fg = fg;
    state.last_bg = bg;

    out.append_bytes(b"\x1b[0");
    if attr::is_bold(fg) {
        out.append_bytes(b";1");
    }
    if attr::is_blink(fg) {
        out.append_bytes(b";5");
    }
    if attr::is_underline(fg) {
        out.append_bytes(b";4");
    }
    if attr::is_italic(fg) {
        out.append_bytes(b";3");
    }
    if attr::is_reverse(fg) || attr::is_reverse(bg) {
        out.append_bytes(b";7");
    }
    out.append_bytes(b"m");

    if !is_effectively_default(fg, mode) {
        emit_color(attr::color(fg), mode, true, out);
    }
    if !is_effectively_default(bg, mode) {
        emit_color(attr::color(bg), mode, false, out);
    }
}

/// A color counts as "default" either via the explicit default bit, or
/// (normal/256/cube/grayscale only) via a zero color value, per §4.7's
/// "caller convenience" rule.
fn is_effectively_default(a: Attr, mode: OutputMode) -> bool {
    if attr::is_default(a) {
        return true;
    }
    match mode {
        #[cfg(feature = "truecolor")]
        OutputMode::Truecolor => false,
        _ => attr::color(a) == 0,
    }
}

fn emit_color(color: Attr, mode: OutputMode, is_fg: bool, out: &mut ByteBuffer) {
    match mode {
        OutputMode::Normal => {
            let n = (color & 0x0f).saturating_sub(1).min(7);
            let base: u32 = if is_fg { 30 } else { 40 };
            out.append_bytes(format!("\x1b[{}m", base + u32::from(n)).as_bytes());
        }
        OutputMode::Ansi256 => {
            let n = color & 0xff;
            out.append_bytes(
                format!("\x1b[{};5;{}m", if is_fg { 38 } else { 48 }, n).as_bytes(),
            );
        }
        OutputMode::Cube216 => {
            let n = (color & 0xff).min(215) + 0x10;
            out.append_bytes(
                format!("\x1b[{};5;{}m", if is_fg { 38 } else { 48 }, n).as_bytes(),
            );
        }
        OutputMode::Grayscale => {
            let n = (color & 0xff).min(23) + 0xe8;
            out.append_bytes(
                format!("\x1b[{};5;{}m", if is_fg { 38 } else { 48 }, n).as_bytes(),
            );
        }
        #[cfg(feature = "truecolor")]
        OutputMode::Truecolor => {
            let r = (color >> 16) & 0xff;
            let g = (color >> 8) & 0xff;
            let b = color & 0xff;
            out.append_bytes(
                format!("\x1b[{};2;{};{};{}m", if is_fg { 38 } else { 48 }, r, g, b).as_bytes(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin;

    fn xterm_caps() -> CapabilityStore {
        CapabilityStore::from_strings(builtin::to_owned_table(builtin::lookup("xterm"))).unwrap()
    }

    #[test]
    fn unchanged_grid_emits_no_character_payload() {
        let caps = xterm_caps();
        let mut back = CellBuffer::new(3, 1);
        back.set(0, 0, &['a'], 0, 0).unwrap();
        let mut front = back.clone();
        let mut state = RenderState { attrs_dirty: false, ..RenderState::default() };
        let mut out = ByteBuffer::new();
        present(&caps, OutputMode::Normal, &back, &mut front, &mut state, None, &mut out);
        assert!(!out.as_slice().contains(&b'a'));
    }

    #[test]
    fn single_cell_change_emits_its_character() {
        let caps = xterm_caps();
        let mut back = CellBuffer::new(3, 1);
        back.set(0, 0, &['a'], 0, 0).unwrap();
        back.set(1, 0, &['a'], 0, 0).unwrap();
        back.set(2, 0, &['a'], 0, 0).unwrap();
        let mut front = back.clone();
        back.set(1, 0, &['b'], 0, 0).unwrap();

        let mut state = RenderState { attrs_dirty: false, ..RenderState::default() };
        let mut out = ByteBuffer::new();
        present(&caps, OutputMode::Normal, &back, &mut front, &mut state, None, &mut out);
        assert!(out.as_slice().windows(1).any(|w| w == b"b"));
        assert_eq!(front.get(1, 0).unwrap().ch, 'b');
    }

    #[test]
    fn cursor_elision_skips_position_command_for_adjacent_writes() {
        let caps = xterm_caps();
        let mut back = CellBuffer::new(3, 1);
        back.set(0, 0, &['x'], 0, 0).unwrap();
        back.set(1, 0, &['y'], 0, 0).unwrap();
        let mut front = CellBuffer::new(3, 1);
        let mut state = RenderState { attrs_dirty: false, ..RenderState::default() };
        let mut out = ByteBuffer::new();
        present(&caps, OutputMode::Normal, &back, &mut front, &mut state, None, &mut out);

        let moves = out
            .as_slice()
            .windows(2)
            .filter(|w| *w == b"1;")
            .count();
        assert_eq!(moves, 1, "second adjacent cell shouldn't re-home the cursor");
    }

    /// Scenario 6 from spec.md §8: a 3x1 grid filled with 'a', presented,
    /// then cell (1,0) changed to 'b' and presented again. With fg/bg
    /// unchanged across both presents no SGR is re-emitted, so the second
    /// present's output is exactly the cursor-position move to (1,0) in
    /// 1-based row;col form, the character 'b', then the hide-cursor cap.
    #[test]
    fn present_diff_scenario_emits_exact_position_and_char() {
        let caps = xterm_caps();
        let mut back = CellBuffer::new(3, 1);
        for x in 0..3 {
            back.set(x, 0, &['a'], 0, 0).unwrap();
        }
        let mut front = CellBuffer::new(3, 1);
        let mut state = RenderState::default();
        let mut out = ByteBuffer::new();
        present(&caps, OutputMode::Normal, &back, &mut front, &mut state, None, &mut out);

        back.set(1, 0, &['b'], 0, 0).unwrap();
        let mut out2 = ByteBuffer::new();
        present(&caps, OutputMode::Normal, &back, &mut front, &mut state, None, &mut out2);

        let hide_cursor = caps.get(CapId::HideCursor).to_vec();
        let mut expected = b"\x1b[1;2H".to_vec();
        expected.push(b'b');
        expected.extend_from_slice(&hide_cursor);
        assert_eq!(out2.as_slice(), expected.as_slice());
    }

    /// Regression for the resize path (spec.md §4.8, "On resize"): growing
    /// `back` without growing `front` to match used to make `present` index
    /// past the end of `front` and panic. Both buffers must end up the same
    /// size after a resize, whatever each one's own resize policy does with
    /// the newly-added cells.
    #[test]
    fn present_does_not_panic_after_grow_when_both_buffers_resized() {
        let caps = xterm_caps();
        let mut back = CellBuffer::new(3, 1);
        let mut front = CellBuffer::new(3, 1);
        back.set(0, 0, &['a'], 0, 0).unwrap();
        let mut state = RenderState::default();
        let mut out = ByteBuffer::new();
        present(&caps, OutputMode::Normal, &back, &mut front, &mut state, None, &mut out);

        back.resize(5, 2, 0, 0);
        front.resize(5, 2, 0, 0);
        front.clear(0, 0);
        back.set(4, 1, &['z'], 0, 0).unwrap();

        let mut out2 = ByteBuffer::new();
        present(&caps, OutputMode::Normal, &back, &mut front, &mut state, None, &mut out2);
        assert!(out2.as_slice().windows(1).any(|w| w == b"z"));
    }

    /// Regression for the overflow-fill branch (spec.md §8, "Idempotent
    /// present"): a wide character that doesn't fit in the remaining columns
    /// of a row gets its trailing columns painted with spaces, but
    /// `front[x,y]` itself must keep tracking the real wide character (not a
    /// blank), so a second, unchanged `present` call emits nothing.
    #[test]
    fn overflowing_wide_char_does_not_repaint_on_unchanged_present() {
        let caps = xterm_caps();
        let mut back = CellBuffer::new(3, 1);
        let mut front = CellBuffer::new(3, 1);
        back.set(2, 0, &['中'], 0, 0).unwrap();
        let mut state = RenderState::default();
        let mut out = ByteBuffer::new();
        present(&caps, OutputMode::Normal, &back, &mut front, &mut state, None, &mut out);
        assert!(!out.as_slice().is_empty());

        let mut out2 = ByteBuffer::new();
        present(&caps, OutputMode::Normal, &back, &mut front, &mut state, None, &mut out2);
        assert!(out2.as_slice().is_empty());
    }
}
