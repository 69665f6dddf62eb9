//! Lenient UTF-8 decoding.

/// Iterator over the characters of a byte slice that silently drops
/// malformed bytes, one byte at a time.
#[derive(Clone, Debug)]
pub struct Utf8Chars<'a> {
    rest: &'a [u8],
}

impl<'a> Utf8Chars<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { rest: bytes }
    }
}

fn sequence_len(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 0,
    }
}

impl Iterator for Utf8Chars<'_> {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        while let Some(&lead) = self.rest.first() {
            let len = sequence_len(lead);
            if len != 0 && self.rest.len() >= len {
                if let Ok(s) = core::str::from_utf8(&self.rest[..len]) {
                    self.rest = &self.rest[len..];
                    return s.chars().next();
                }
            }
            self.rest = &self.rest[1..];
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(bytes: &[u8]) -> heapless::String<64> {
        let mut out = heapless::String::new();
        for c in Utf8Chars::new(bytes) {
            out.push(c).unwrap();
        }
        out
    }

    #[test]
    fn decodes_mixed_width_text() {
        assert_eq!(collect("a안é".as_bytes()).as_str(), "a안é");
    }

    #[test]
    fn skips_stray_continuation_bytes() {
        assert_eq!(collect(&[b'a', 0x80, 0xBF, b'b']).as_str(), "ab");
    }

    #[test]
    fn skips_truncated_sequence_at_end() {
        // First two bytes of "안" (EC 95 88).
        assert_eq!(collect(&[b'x', 0xEC, 0x95]).as_str(), "x");
    }

    #[test]
    fn resynchronises_after_bad_lead() {
        let mut bytes = heapless::Vec::<u8, 16>::new();
        bytes.extend_from_slice(&[0xFF, 0xC0]).unwrap();
        bytes.extend_from_slice("가".as_bytes()).unwrap();
        assert_eq!(collect(&bytes).as_str(), "가");
    }
}
