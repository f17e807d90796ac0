//! A byte-keyed trie over capability strings, used to prefix-match an
//! incoming escape sequence against every known key capability.
//!
//! Adapted from the channel-name completion trie in the example pack's TUI
//! crate: a node holds its children as a vector kept sorted by byte value,
//! searched by binary search rather than a hash map, since alphabets at any
//! one level here are small (well under 16 siblings in practice).

use cellterm_core::error::{Error, Result};
use crate::event::{KeyCode, Modifiers};

/// What a leaf node resolves to: the symbolic key and the modifier bits
/// implied by the escape sequence that led to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Leaf {
    pub key: KeyCode,
    pub modifiers: Modifiers,
}

struct Node {
    byte: u8,
    leaf: Option<Leaf>,
    children: Vec<Node>,
}

impl Node {
    fn new(byte: u8) -> Node {
        Node { byte, leaf: None, children: Vec::new() }
    }
}

/// Outcome of walking the trie against a prefix of the input buffer.
#[derive(Debug, PartialEq, Eq)]
pub enum TrieMatch {
    /// `bytes[..consumed]` exactly names a capability.
    Leaf { leaf: Leaf, consumed: usize },
    /// `bytes` is a strict prefix of one or more longer capabilities; the
    /// caller should read more input before retrying.
    NeedMore,
    /// No capability starts with `bytes[0]`, or the byte sequence diverges
    /// from every capability before reaching a leaf.
    NoMatch { consumed: usize },
}

/// A collection of escape sequences, each mapped to a symbolic key and
/// modifier set, organized for byte-at-a-time prefix matching.
pub struct Trie {
    roots: Vec<Node>,
}

impl Trie {
    pub fn new() -> Trie {
        Trie { roots: Vec::new() }
    }

    /// Insert `seq -> leaf`. A collision — `seq` already names a leaf —
    /// is reported as [`Error::CapCollision`] but the existing leaf is kept
    /// (first insertion wins), matching §4.4's collision policy.
    pub fn insert(&mut self, seq: &[u8], leaf: Leaf) -> Result<()> {
        if seq.is_empty() {
            return Ok(());
        }
        Self::insert_into(&mut self.roots, seq, leaf)
    }

    fn insert_into(level: &mut Vec<Node>, seq: &[u8], leaf: Leaf) -> Result<()> {
        let byte = seq[0];
        let idx = match level.binary_search_by_key(&byte, |n| n.byte) {
            Ok(i) => i,
            Err(i) => {
                level.insert(i, Node::new(byte));
                i
            }
        };

        if seq.len() == 1 {
            if level[idx].leaf.is_some() {
                return Err(Error::CapCollision(seq.to_vec()));
            }
            level[idx].leaf = Some(leaf);
            Ok(())
        } else {
            Self::insert_into(&mut level[idx].children, &seq[1..], leaf)
        }
    }

    /// Walk the trie against `bytes`, classifying the result per §4.4: a
    /// leaf reached with no remaining children (or input exhausted exactly
    /// at a leaf) is a match; a non-leaf with children left but input
    /// exhausted is "need more"; anything else is "no match".
    pub fn find(&self, bytes: &[u8]) -> TrieMatch {
        let mut level = &self.roots;
        let mut consumed = 0;
        let mut last_leaf: Option<(Leaf, usize)> = None;

        loop {
            if consumed >= bytes.len() {
                return match last_leaf {
                    Some((leaf, n)) if n == consumed => TrieMatch::Leaf { leaf, consumed },
                    _ if !level.is_empty() => TrieMatch::NeedMore,
                    _ => TrieMatch::NoMatch { consumed },
                };
            }

            let byte = bytes[consumed];
            let idx = match level.binary_search_by_key(&byte, |n| n.byte) {
                Ok(i) => i,
                Err(_) => {
                    return match last_leaf {
                        Some((leaf, n)) => TrieMatch::Leaf { leaf, consumed: n },
                        None => TrieMatch::NoMatch { consumed },
                    };
                }
            };

            consumed += 1;
            let node = &level[idx];
            if let Some(leaf) = node.leaf {
                last_leaf = Some((leaf, consumed));
                if node.children.is_empty() {
                    return TrieMatch::Leaf { leaf, consumed };
                }
            }
            level = &node.children;
        }
    }
}

impl Default for Trie {
    fn default() -> Trie {
        Trie::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(key: KeyCode) -> Leaf {
        Leaf { key, modifiers: Modifiers::empty() }
    }

    #[test]
    fn exact_match() {
        let mut t = Trie::new();
        t.insert(b"\x1bOP", leaf(KeyCode::F1)).unwrap();
        assert_eq!(
            t.find(b"\x1bOP"),
            TrieMatch::Leaf { leaf: leaf(KeyCode::F1), consumed: 3 }
        );
    }

    #[test]
    fn prefix_needs_more() {
        let mut t = Trie::new();
        t.insert(b"\x1bOP", leaf(KeyCode::F1)).unwrap();
        assert_eq!(t.find(b"\x1bO"), TrieMatch::NeedMore);
    }

    #[test]
    fn diverging_byte_is_no_match() {
        let mut t = Trie::new();
        t.insert(b"\x1bOP", leaf(KeyCode::F1)).unwrap();
        assert_eq!(t.find(b"\x1bXQ"), TrieMatch::NoMatch { consumed: 1 });
    }

    #[test]
    fn shared_prefix_with_different_terminators() {
        let mut t = Trie::new();
        t.insert(b"\x1b[A", leaf(KeyCode::ArrowUp)).unwrap();
        t.insert(b"\x1b[1;5A", leaf(KeyCode::ArrowUp)).unwrap();
        assert_eq!(
            t.find(b"\x1b[A"),
            TrieMatch::Leaf { leaf: leaf(KeyCode::ArrowUp), consumed: 3 }
        );
        assert_eq!(
            t.find(b"\x1b[1;5A"),
            TrieMatch::Leaf { leaf: leaf(KeyCode::ArrowUp), consumed: 6 }
        );
    }

    #[test]
    fn duplicate_insertion_is_a_reported_collision() {
        let mut t = Trie::new();
        t.insert(b"\x1bOP", leaf(KeyCode::F1)).unwrap();
        let err = t.insert(b"\x1bOP", leaf(KeyCode::F2)).unwrap_err();
        assert!(matches!(err, Error::CapCollision(_)));
        // first insertion wins
        assert_eq!(
            t.find(b"\x1bOP"),
            TrieMatch::Leaf { leaf: leaf(KeyCode::F1), consumed: 3 }
        );
    }
}
