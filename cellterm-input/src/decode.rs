//! The input decoder state machine: turns a prefix of the input byte
//! buffer into one [`Event`], or reports that more bytes are needed.

use cellterm_core::error::{Error, Result};

use crate::event::{Event, KeyCode, KeyEvent, Modifiers, MouseButton};
use crate::mouse::{self, MouseParse};
use crate::trie::{Trie, TrieMatch};
use crate::utf8;

bitflags::bitflags! {
    /// How a lone ESC (or an ESC that doesn't match any known sequence) is
    /// interpreted. `ESC` and `ALT` are mutually exclusive; §6 says if both
    /// are set, `ALT` is dropped, and if neither is set, `ESC` is forced.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct InputMode: u8 {
        const ESC   = 0b001;
        const ALT   = 0b010;
        const MOUSE = 0b100;
    }
}

impl InputMode {
    /// Normalize per §6's mutual-exclusion and default rules.
    pub fn normalized(self) -> InputMode {
        let mut m = self;
        if m.contains(InputMode::ESC) && m.contains(InputMode::ALT) {
            m.remove(InputMode::ALT);
        }
        if !m.contains(InputMode::ESC) && !m.contains(InputMode::ALT) {
            m.insert(InputMode::ESC);
        }
        m
    }
}

/// A user-supplied hook that gets first (or last) refusal on an ESC-led
/// sequence before the trie/mouse parsers run. Returns `Some(event,
/// consumed)` on a match.
pub type EscHook<'a> = dyn Fn(&[u8]) -> Option<(Event, usize)> + 'a;

pub struct Decoder {
    trie: Trie,
    mode: InputMode,
}

/// Outcome of one decode attempt.
pub enum Decoded {
    Event(Event, usize),
    NeedMore,
}

impl Decoder {
    pub fn new(trie: Trie, mode: InputMode) -> Decoder {
        Decoder { trie, mode: mode.normalized() }
    }

    pub fn set_mode(&mut self, mode: InputMode) {
        self.mode = mode.normalized();
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Attempt to decode one event from the front of `buf`, per §4.5's
    /// state machine. `pre`/`post` are optional escape-sequence hooks run
    /// before and after the builtin trie/mouse parsers.
    pub fn decode(
        &self,
        buf: &[u8],
        pre: Option<&EscHook>,
        post: Option<&EscHook>,
    ) -> Result<Decoded> {
        if buf.is_empty() {
            return Err(Error::Other("empty input buffer".into()));
        }

        if buf[0] == 0x1b {
            return self.decode_esc(buf, pre, post, Modifiers::empty());
        }

        if buf[0] < 0x20 || buf[0] == 0x7f {
            let key = KeyCode::from_ctrl_byte(buf[0])
                .expect("every byte < 0x20 or == 0x7f has a named key");
            return Ok(Decoded::Event(
                Event::Key { key: KeyEvent::Code(key), modifiers: Modifiers::CTRL },
                1,
            ));
        }

        let len = utf8::utf8_char_length(buf[0]);
        if buf.len() < len {
            return Ok(Decoded::NeedMore);
        }
        let (cp, consumed) = utf8::utf8_decode(&buf[..len])
            .ok_or_else(|| Error::Other("invalid utf-8 lead byte".into()))?;
        let ch = char::from_u32(cp).unwrap_or('\u{fffd}');
        Ok(Decoded::Event(
            Event::Key { key: KeyEvent::Char(ch), modifiers: Modifiers::empty() },
            consumed,
        ))
    }

    fn decode_esc(
        &self,
        buf: &[u8],
        pre: Option<&EscHook>,
        post: Option<&EscHook>,
        extra_mod: Modifiers,
    ) -> Result<Decoded> {
        let lone_esc_returns = self.mode.contains(InputMode::ESC) && buf.len() == 1;
        if !lone_esc_returns {
            if let Some(hook) = pre {
                if let Some((event, consumed)) = hook(buf) {
                    return Ok(Decoded::Event(event, consumed));
                }
            }

            match self.trie.find(buf) {
                TrieMatch::Leaf { leaf, consumed } => {
                    return Ok(Decoded::Event(
                        Event::Key {
                            key: KeyEvent::Code(leaf.key),
                            modifiers: leaf.modifiers | extra_mod,
                        },
                        consumed,
                    ));
                }
                TrieMatch::NeedMore => return Ok(Decoded::NeedMore),
                TrieMatch::NoMatch { .. } => {}
            }

            if self.mode.contains(InputMode::MOUSE) {
                match mouse::parse(buf) {
                    MouseParse::Match { event, consumed } => {
                        return Ok(Decoded::Event(
                            Event::Mouse {
                                button: event.button,
                                x: event.x,
                                y: event.y,
                                modifiers: event.modifiers | extra_mod,
                            },
                            consumed,
                        ));
                    }
                    MouseParse::NeedMore => return Ok(Decoded::NeedMore),
                    MouseParse::NoMatch { .. } => {}
                }
            }

            if let Some(hook) = post {
                if let Some((event, consumed)) = hook(buf) {
                    return Ok(Decoded::Event(event, consumed));
                }
            }
        }

        if self.mode.contains(InputMode::ESC) {
            Ok(Decoded::Event(
                Event::Key { key: KeyEvent::Code(KeyCode::Esc), modifiers: extra_mod },
                1,
            ))
        } else {
            debug_assert!(self.mode.contains(InputMode::ALT));
            if buf.len() == 1 {
                return Ok(Decoded::NeedMore);
            }
            self.decode_rest_as_alt(&buf[1..], pre, post)
        }
    }

    /// ALT mode: the leading ESC is consumed and folded into `mod`, and the
    /// remainder is decoded as if it were a fresh buffer (recursing through
    /// the non-ESC branches of `decode`, or through another ESC sequence).
    fn decode_rest_as_alt(
        &self,
        rest: &[u8],
        pre: Option<&EscHook>,
        post: Option<&EscHook>,
    ) -> Result<Decoded> {
        if rest.is_empty() {
            return Ok(Decoded::NeedMore);
        }
        let decoded = if rest[0] == 0x1b {
            self.decode_esc(rest, pre, post, Modifiers::ALT)?
        } else {
            match self.decode(rest, pre, post)? {
                Decoded::Event(Event::Key { key, modifiers }, n) => {
                    Decoded::Event(Event::Key { key, modifiers: modifiers | Modifiers::ALT }, n)
                }
                other => other,
            }
        };
        Ok(match decoded {
            Decoded::Event(event, n) => Decoded::Event(event, n + 1),
            Decoded::NeedMore => Decoded::NeedMore,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::Leaf;

    fn xterm_trie() -> Trie {
        let mut trie = Trie::new();
        trie.insert(b"\x1bOP", Leaf { key: KeyCode::F1, modifiers: Modifiers::empty() }).unwrap();
        trie
    }

    #[test]
    fn raw_ascii_produces_char_event() {
        let dec = Decoder::new(Trie::new(), InputMode::ESC);
        match dec.decode(b"A", None, None).unwrap() {
            Decoded::Event(Event::Key { key: KeyEvent::Char(c), modifiers }, n) => {
                assert_eq!(c, 'A');
                assert_eq!(modifiers, Modifiers::empty());
                assert_eq!(n, 1);
            }
            _ => panic!("expected char event"),
        }
    }

    #[test]
    fn ctrl_a_produces_ctrl_modifier() {
        let dec = Decoder::new(Trie::new(), InputMode::ESC);
        match dec.decode(b"\x01", None, None).unwrap() {
            Decoded::Event(Event::Key { key: KeyEvent::Code(KeyCode::CtrlA), modifiers }, n) => {
                assert_eq!(modifiers, Modifiers::CTRL);
                assert_eq!(n, 1);
            }
            _ => panic!("expected ctrl-a event"),
        }
    }

    #[test]
    fn lone_esc_in_esc_mode_is_its_own_event() {
        let dec = Decoder::new(Trie::new(), InputMode::ESC);
        match dec.decode(b"\x1b", None, None).unwrap() {
            Decoded::Event(Event::Key { key: KeyEvent::Code(KeyCode::Esc), .. }, 1) => {}
            _ => panic!("expected bare esc event"),
        }
    }

    #[test]
    fn alt_a_in_alt_mode_sets_alt_modifier() {
        let dec = Decoder::new(Trie::new(), InputMode::ALT);
        match dec.decode(b"\x1bA", None, None).unwrap() {
            Decoded::Event(Event::Key { key: KeyEvent::Char('A'), modifiers }, n) => {
                assert!(modifiers.contains(Modifiers::ALT));
                assert_eq!(n, 2);
            }
            _ => panic!("expected alt-a event"),
        }
    }

    #[test]
    fn alt_a_in_esc_mode_yields_esc_then_a_separately() {
        let dec = Decoder::new(Trie::new(), InputMode::ESC);
        match dec.decode(b"\x1bA", None, None).unwrap() {
            Decoded::Event(Event::Key { key: KeyEvent::Code(KeyCode::Esc), .. }, 1) => {}
            _ => panic!("expected a leading esc event"),
        }
    }

    #[test]
    fn f1_under_xterm_trie() {
        let dec = Decoder::new(xterm_trie(), InputMode::ESC);
        match dec.decode(b"\x1bOP", None, None).unwrap() {
            Decoded::Event(Event::Key { key: KeyEvent::Code(KeyCode::F1), modifiers }, 3) => {
                assert_eq!(modifiers, Modifiers::empty());
            }
            _ => panic!("expected f1 event"),
        }
    }

    #[test]
    fn mouse_1006_left_press() {
        let dec = Decoder::new(Trie::new(), InputMode::ESC | InputMode::MOUSE);
        match dec.decode(b"\x1b[<0;11;6M", None, None).unwrap() {
            Decoded::Event(Event::Mouse { button: MouseButton::Left, x: 10, y: 5, .. }, _) => {}
            _ => panic!("expected mouse event"),
        }
    }
}
