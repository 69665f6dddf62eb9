//! ASCII → USB HID usage translation for a US keyboard layout.
//!
//! Each printable character maps to one usage ID on the Keyboard/Keypad
//! page plus a flag telling whether Shift must be held.

use super::keyboard::usage;

/// Usage ID and Shift requirement for `ascii`, or `None` if the US layout
/// has no key for it.
pub fn from_ascii(ascii: u8) -> Option<(u8, bool)> {
    let mapped = match ascii {
        b'a'..=b'z' => (usage::A + (ascii - b'a'), false),
        b'A'..=b'Z' => (usage::A + (ascii - b'A'), true),
        b'1'..=b'9' => (usage::DIGIT_1 + (ascii - b'1'), false),
        b'0' => (usage::DIGIT_0, false),
        b'\n' => (usage::RETURN, false),
        0x1B => (usage::ESCAPE, false),
        0x08 => (usage::BACKSPACE, false),
        b'\t' => (usage::TAB, false),
        b' ' => (usage::SPACE, false),
        b'!' => (usage::DIGIT_1, true),
        b'@' => (usage::DIGIT_1 + 1, true),
        b'#' => (usage::DIGIT_1 + 2, true),
        b'$' => (usage::DIGIT_1 + 3, true),
        b'%' => (usage::DIGIT_1 + 4, true),
        b'^' => (usage::DIGIT_1 + 5, true),
        b'&' => (usage::DIGIT_1 + 6, true),
        b'*' => (usage::DIGIT_1 + 7, true),
        b'(' => (usage::DIGIT_1 + 8, true),
        b')' => (usage::DIGIT_0, true),
        b'-' => (0x2D, false),
        b'_' => (0x2D, true),
        b'=' => (0x2E, false),
        b'+' => (0x2E, true),
        b'[' => (0x2F, false),
        b'{' => (0x2F, true),
        b']' => (0x30, false),
        b'}' => (0x30, true),
        b'\\' => (0x31, false),
        b'|' => (0x31, true),
        b';' => (0x33, false),
        b':' => (0x33, true),
        b'\'' => (0x34, false),
        b'"' => (0x34, true),
        b'`' => (0x35, false),
        b'~' => (0x35, true),
        b',' => (0x36, false),
        b'<' => (0x36, true),
        b'.' => (0x37, false),
        b'>' => (0x37, true),
        b'/' => (0x38, false),
        b'?' => (0x38, true),
        _ => return None,
    };
    Some(mapped)
}
