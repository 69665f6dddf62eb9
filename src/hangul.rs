//! Hangul syllable → dubeolsik (two-set) QWERTY key mapping.
//!
//! A precomposed syllable in U+AC00..=U+D7A3 is split arithmetically into
//! its initial, medial and final jamo indices; each index is then looked up
//! in a table of the QWERTY keys that produce that jamo on a Korean 2-set
//! layout. Compound vowels and consonant clusters are stored as multi-key
//! strings (ㅘ → "hk", ㄺ → "fr") so the host IME recomposes them.
//!
//! ```text
//! idx     = cp - 0xAC00
//! initial = idx / 588          (0..19)
//! medial  = (idx % 588) / 28   (0..21)
//! final   = idx % 28           (0..28, 0 = no final)
//! ```

use crate::error::Error;
use crate::text::Utf8Chars;
use heapless::{String, Vec};

/// First precomposed Hangul syllable (가).
pub const SYLLABLE_FIRST: u32 = 0xAC00;
/// Last precomposed Hangul syllable (힣).
pub const SYLLABLE_LAST: u32 = 0xD7A3;

const MEDIAL_COUNT: u32 = 21;
const FINAL_COUNT: u32 = 28;
const SYLLABLES_PER_INITIAL: u32 = MEDIAL_COUNT * FINAL_COUNT;

/// Initial consonants ㄱ ㄲ ㄴ ㄷ ㄸ ㄹ ㅁ ㅂ ㅃ ㅅ ㅆ ㅇ ㅈ ㅉ ㅊ ㅋ ㅌ ㅍ ㅎ.
const INITIAL: [&str; 19] = [
    "r", "R", "s", "e", "E", "f", "a", "q", "Q", "t", "T", "d", "w", "W", "c", "z", "x", "v", "g",
];

/// Medial vowels ㅏ ㅐ ㅑ ㅒ ㅓ ㅔ ㅕ ㅖ ㅗ ㅘ ㅙ ㅚ ㅛ ㅜ ㅝ ㅞ ㅟ ㅠ ㅡ ㅢ ㅣ.
const MEDIAL: [&str; 21] = [
    "k", "o", "i", "O", "j", "p", "u", "P", "h", "hk", "ho", "hl", "y", "n", "nj", "np", "nl", "b",
    "m", "ml", "l",
];

/// Final consonants; index 0 is "no final".
const FINAL: [&str; 28] = [
    "", "r", "R", "rt", "s", "sw", "sg", "e", "f", "fr", "fa", "fq", "ft", "fx", "fv", "fg", "a",
    "q", "qt", "t", "T", "d", "w", "c", "z", "x", "v", "g",
];

/// Jamo indices of one precomposed syllable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Jamo {
    pub initial: u8,
    pub medial: u8,
    pub final_: u8,
}

/// Split a code point into jamo indices, or `None` outside the syllable block.
pub fn decompose(cp: u32) -> Option<Jamo> {
    if !(SYLLABLE_FIRST..=SYLLABLE_LAST).contains(&cp) {
        return None;
    }
    let idx = cp - SYLLABLE_FIRST;
    Some(Jamo {
        initial: (idx / SYLLABLES_PER_INITIAL) as u8,
        medial: ((idx % SYLLABLES_PER_INITIAL) / FINAL_COUNT) as u8,
        final_: (idx % FINAL_COUNT) as u8,
    })
}

/// QWERTY keys for one syllable: initial ++ medial ++ final (if any).
///
/// At most five keys (1 + 2 + 2).
pub fn to_qwerty(jamo: Jamo) -> Vec<u8, 5> {
    let mut keys = Vec::new();
    let parts = [
        INITIAL[jamo.initial as usize],
        MEDIAL[jamo.medial as usize],
        FINAL[jamo.final_ as usize],
    ];
    for part in parts {
        // Cannot overflow: longest combination is five keys.
        let _ = keys.extend_from_slice(part.as_bytes());
    }
    keys
}

/// Streaming mapper from UTF-8 text to the characters that must be typed.
///
/// - ASCII passes through unchanged.
/// - Hangul syllables expand to their jamo keys.
/// - Other code points below 256 pass through as-is; the typing engine
///   cannot emit them and skips them.
/// - Everything else is dropped, as are malformed bytes.
#[derive(Clone, Debug)]
pub struct QwertyKeys<'a> {
    chars: Utf8Chars<'a>,
    pending: Vec<u8, 5>,
    pos: usize,
}

impl<'a> QwertyKeys<'a> {
    pub fn new(text: &'a [u8]) -> Self {
        Self {
            chars: Utf8Chars::new(text),
            pending: Vec::new(),
            pos: 0,
        }
    }
}

impl Iterator for QwertyKeys<'_> {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        loop {
            if let Some(&key) = self.pending.get(self.pos) {
                self.pos += 1;
                return Some(char::from(key));
            }
            let c = self.chars.next()?;
            let cp = c as u32;
            if let Some(jamo) = decompose(cp) {
                self.pending = to_qwerty(jamo);
                self.pos = 0;
            } else if cp < 0x100 {
                return Some(c);
            } else {
                debug!("hangul: dropping U+{:X}", cp);
            }
        }
    }
}

/// Convert a whole string into its QWERTY key sequence.
pub fn hangul_to_qwerty<const N: usize>(text: &[u8]) -> Result<String<N>, Error> {
    let mut out = String::new();
    for c in QwertyKeys::new(text) {
        out.push(c).map_err(|_| Error::BufferOverflow)?;
    }
    Ok(out)
}
