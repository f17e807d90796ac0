//! Public UTF-8 helpers, including the legacy 6-byte extended encoding the
//! decoder's fast path relies on (code points up to `0x7fff_ffff`, not just
//! the RFC 3629 `0x10ffff` ceiling).

use std::convert::TryFrom;

/// Length of the UTF-8 sequence starting with lead byte `c`, per the fixed
/// lead-byte-range table: continuation/ASCII bytes and the two reserved
/// `0xfe`/`0xff` bytes report length 1 (so the decoder advances instead of
/// stalling on the byte), `0xc0..=0xdf` is 2, `0xe0..=0xef` is 3,
/// `0xf0..=0xf7` is 4, `0xf8..=0xfb` is 5, `0xfc..=0xfd` is 6.
pub fn utf8_char_length(c: u8) -> usize {
    match c {
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        0xf8..=0xfb => 5,
        0xfc..=0xfd => 6,
        _ => 1,
    }
}

const MASKS: [u8; 6] = [0x7f, 0x1f, 0x0f, 0x07, 0x03, 0x01];

/// Decode one code point from the front of `bytes`. Returns `(code point,
/// bytes consumed)`. `bytes` must have at least `utf8_char_length(bytes[0])`
/// entries; the caller is expected to check that first (the decoder does,
/// via the "need more" path).
pub fn utf8_decode(bytes: &[u8]) -> Option<(u32, usize)> {
    let first = *bytes.first()?;
    let len = utf8_char_length(first);
    if bytes.len() < len {
        return None;
    }
    let mask = MASKS[len - 1];
    let mut result = u32::from(first & mask);
    for &b in &bytes[1..len] {
        result = (result << 6) | u32::from(b & 0x3f);
    }
    Some((result, len))
}

/// Encode `cp` using the same length thresholds as [`utf8_char_length`]'s
/// lead bytes expect on decode, supporting code points up to
/// `0x7fff_ffff` via the legacy 5/6-byte forms.
pub fn utf8_encode(cp: u32) -> Vec<u8> {
    let (first_mask, len): (u8, usize) = if cp < 0x80 {
        (0x00, 1)
    } else if cp < 0x800 {
        (0xc0, 2)
    } else if cp < 0x10000 {
        (0xe0, 3)
    } else if cp < 0x200000 {
        (0xf0, 4)
    } else if cp < 0x4000000 {
        (0xf8, 5)
    } else {
        (0xfc, 6)
    };

    let mut out = vec![0u8; len];
    let mut c = cp;
    for i in (1..len).rev() {
        out[i] = u8::try_from(c & 0x3f).unwrap() | 0x80;
        c >>= 6;
    }
    out[0] = u8::try_from(c).unwrap() | first_mask;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_round_trips() {
        let enc = utf8_encode('A' as u32);
        assert_eq!(enc, b"A");
        assert_eq!(utf8_decode(&enc), Some(('A' as u32, 1)));
    }

    #[test]
    fn round_trip_sampled_code_points() {
        for cp in [0u32, 0x7f, 0x80, 0x7ff, 0x800, 0xffff, 0x10000, 0x10ffff, 0x1fffff, 0x3ffffff, 0x7fffffff] {
            let enc = utf8_encode(cp);
            assert_eq!(enc.len(), utf8_char_length(enc[0]));
            let (decoded, len) = utf8_decode(&enc).unwrap();
            assert_eq!(decoded, cp);
            assert_eq!(len, enc.len());
        }
    }

    #[test]
    fn short_buffer_reports_none() {
        let enc = utf8_encode(0x20ac);
        assert!(utf8_decode(&enc[..1]).is_none());
    }
}
