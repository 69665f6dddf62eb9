//! Wire protocol spoken over the RX characteristic.
//!
//! Two dialects are accepted:
//!
//! - Tagged single messages: `GHTYPE_ENG:`, `GHTYPE_KOR:`, `GHTYPE_SPE:`,
//!   `GHTYPE_CFG:` followed directly by the payload. Untagged messages are
//!   plain English text.
//! - Line-oriented scripts whose lines start with `#CMD:` or `#TEXT:`,
//!   which switch between English and Korean lanes and embed Enter/Tab.
//!
//! Inside any text payload, [`TOGGLE_MARKER`] flips the lane the same way a
//! `#CMD:` line does, so `{"text":"hi⌨HANGUL_TOGGLE⌨dkssud"}` types `hi` in
//! English and `dkssud` in Korean.
//!
//! Parsing never fails hard: anything that cannot be understood is either
//! typed literally as English or ignored.

pub mod reassembler;

use crate::config::{MAX_INTERVAL_MS, MAX_MESSAGE_LEN};
use crate::typing::clamp_speed;
use crate::typing::mode::ImeToggle;
use heapless::Vec;

pub use reassembler::{DropReason, Feed, FragmentReassembler, Message, CHUNK_END, CHUNK_START};

pub const TAG_ENGLISH: &[u8] = b"GHTYPE_ENG:";
pub const TAG_KOREAN: &[u8] = b"GHTYPE_KOR:";
pub const TAG_SPECIAL: &[u8] = b"GHTYPE_SPE:";
pub const TAG_CONFIG: &[u8] = b"GHTYPE_CFG:";

/// Inline Hangul/English switch inside a text payload.
pub const TOGGLE_MARKER: &str = "⌨HANGUL_TOGGLE⌨";

const SCRIPT_CMD: &[u8] = b"#CMD:";
const SCRIPT_TEXT: &[u8] = b"#TEXT:";

/// Text payload of a typing command, with any JSON escapes resolved.
pub type Text = Vec<u8, MAX_MESSAGE_LEN>;

/// Named keys and IME directives accepted by `GHTYPE_SPE:`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpecialKey {
    Enter,
    Tab,
    Backspace,
    Space,
    CtrlC,
    CtrlV,
    AltTab,
    /// Flip the host IME between Hangul and English.
    HanEng,
    /// Make sure the host IME is in English.
    Eng,
    /// Forget the tracked IME state and assume English.
    ResetMode,
}

impl SpecialKey {
    const VOCABULARY: [(&'static str, SpecialKey); 10] = [
        ("enter", SpecialKey::Enter),
        ("tab", SpecialKey::Tab),
        ("backspace", SpecialKey::Backspace),
        ("space", SpecialKey::Space),
        ("ctrl+c", SpecialKey::CtrlC),
        ("ctrl+v", SpecialKey::CtrlV),
        ("alt+tab", SpecialKey::AltTab),
        ("haneng", SpecialKey::HanEng),
        ("eng", SpecialKey::Eng),
        ("reset_mode", SpecialKey::ResetMode),
    ];

    /// Case-insensitive lookup; surrounding whitespace is ignored.
    pub fn parse(name: &[u8]) -> Option<Self> {
        let name = name.trim_ascii();
        Self::VOCABULARY
            .iter()
            .find(|(word, _)| word.as_bytes().eq_ignore_ascii_case(name))
            .map(|&(_, key)| key)
    }

    pub fn name(self) -> &'static str {
        Self::VOCABULARY
            .iter()
            .find(|(_, key)| *key == self)
            .map(|(word, _)| *word)
            .unwrap_or("?")
    }
}

/// What one message (or one script line) asks the dongle to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypingCommand {
    /// Type text with the IME in English mode.
    EnglishText {
        text: Text,
        speed_cps: Option<u8>,
        /// Extra pause every few characters; 0 for none.
        interval_ms: u16,
    },
    /// Type already-mapped jamo keys (or Hangul) with the IME in Korean mode.
    KoreanJamo {
        text: Text,
        speed_cps: Option<u8>,
        interval_ms: u16,
    },
    /// Press a named key or run an IME directive.
    SpecialCommand(SpecialKey),
    /// Change the typing speed and/or the IME toggle method. At least one
    /// field is set.
    Configuration {
        speed_cps: Option<u8>,
        ime_toggle: Option<ImeToggle>,
    },
}

impl TypingCommand {
    fn text(korean: bool, text: Text, speed_cps: Option<u8>, interval_ms: u16) -> Self {
        if korean {
            TypingCommand::KoreanJamo { text, speed_cps, interval_ms }
        } else {
            TypingCommand::EnglishText { text, speed_cps, interval_ms }
        }
    }
}

/// Decode a single tagged or untagged message.
///
/// Returns `None` for special commands outside the vocabulary and for
/// configuration payloads with neither a usable speed nor a toggle method.
pub fn dispatch(message: &[u8]) -> Option<TypingCommand> {
    if let Some(payload) = message.strip_prefix(TAG_ENGLISH) {
        Some(text_command(payload, false))
    } else if let Some(payload) = message.strip_prefix(TAG_KOREAN) {
        Some(text_command(payload, true))
    } else if let Some(payload) = message.strip_prefix(TAG_SPECIAL) {
        let key = SpecialKey::parse(payload);
        if key.is_none() {
            debug!("protocol: unknown special command ({} bytes)", payload.len());
        }
        key.map(TypingCommand::SpecialCommand)
    } else if let Some(payload) = message.strip_prefix(TAG_CONFIG) {
        let speed_cps = config_speed(payload);
        let ime_toggle = word_field(payload, b"ime_toggle").and_then(ImeToggle::parse);
        if speed_cps.is_none() && ime_toggle.is_none() {
            debug!("protocol: configuration without settings ignored");
            return None;
        }
        Some(TypingCommand::Configuration { speed_cps, ime_toggle })
    } else {
        Some(text_command(message, false))
    }
}

/// `true` when the message uses the `#CMD:`/`#TEXT:` script dialect.
pub fn is_script(message: &[u8]) -> bool {
    message.starts_with(SCRIPT_CMD) || message.starts_with(SCRIPT_TEXT)
}

/// All commands carried by one message, in order.
pub fn commands(message: &[u8]) -> Commands<'_> {
    if is_script(message) {
        Commands::Script {
            lines: message.split(is_newline as fn(&u8) -> bool),
            korean: false,
        }
    } else {
        match dispatch(message) {
            Some(TypingCommand::EnglishText { text, speed_cps, interval_ms })
                if has_toggle_marker(&text) =>
            {
                Commands::Toggled(ToggleChunks::new(text, false, speed_cps, interval_ms))
            }
            Some(TypingCommand::KoreanJamo { text, speed_cps, interval_ms })
                if has_toggle_marker(&text) =>
            {
                Commands::Toggled(ToggleChunks::new(text, true, speed_cps, interval_ms))
            }
            other => Commands::Single(other),
        }
    }
}

fn has_toggle_marker(text: &[u8]) -> bool {
    find(text, TOGGLE_MARKER.as_bytes()).is_some()
}

fn is_newline(b: &u8) -> bool {
    *b == b'\n'
}

/// Iterator returned by [`commands`].
pub enum Commands<'a> {
    Single(Option<TypingCommand>),
    Toggled(ToggleChunks),
    Script {
        lines: core::slice::Split<'a, u8, fn(&u8) -> bool>,
        korean: bool,
    },
}

/// Text split at each [`TOGGLE_MARKER`] into alternating lanes.
///
/// Empty pieces (leading, trailing or doubled markers) still flip the lane
/// but produce no command.
pub struct ToggleChunks {
    text: Text,
    pos: usize,
    korean: bool,
    done: bool,
    speed_cps: Option<u8>,
    interval_ms: u16,
}

impl ToggleChunks {
    fn new(text: Text, korean: bool, speed_cps: Option<u8>, interval_ms: u16) -> Self {
        Self {
            text,
            pos: 0,
            korean,
            done: false,
            speed_cps,
            interval_ms,
        }
    }
}

impl Iterator for ToggleChunks {
    type Item = TypingCommand;

    fn next(&mut self) -> Option<TypingCommand> {
        let marker = TOGGLE_MARKER.as_bytes();
        while !self.done {
            let rest = &self.text[self.pos..];
            let korean = self.korean;
            let piece = match find(rest, marker) {
                Some(at) => {
                    self.pos += at + marker.len();
                    self.korean = !self.korean;
                    &rest[..at]
                }
                None => {
                    self.done = true;
                    rest
                }
            };
            if !piece.is_empty() {
                return Some(TypingCommand::text(
                    korean,
                    literal(piece),
                    self.speed_cps,
                    self.interval_ms,
                ));
            }
        }
        None
    }
}

impl Iterator for Commands<'_> {
    type Item = TypingCommand;

    fn next(&mut self) -> Option<TypingCommand> {
        match self {
            Commands::Single(cmd) => cmd.take(),
            Commands::Toggled(chunks) => chunks.next(),
            Commands::Script { lines, korean } => {
                for line in lines.by_ref() {
                    let line = line.strip_suffix(b"\r").unwrap_or(line);
                    if let Some(text) = line.strip_prefix(SCRIPT_TEXT) {
                        return Some(TypingCommand::text(*korean, literal(text), None, 0));
                    }
                    let Some(cmd) = line.strip_prefix(SCRIPT_CMD) else {
                        continue;
                    };
                    match cmd.trim_ascii() {
                        c if c.eq_ignore_ascii_case(b"HANGUL") => *korean = true,
                        c if c.eq_ignore_ascii_case(b"ENGLISH") => *korean = false,
                        c if c.eq_ignore_ascii_case(b"ENTER") => {
                            return Some(TypingCommand::SpecialCommand(SpecialKey::Enter))
                        }
                        c if c.eq_ignore_ascii_case(b"TAB") => {
                            return Some(TypingCommand::SpecialCommand(SpecialKey::Tab))
                        }
                        _ => debug!("protocol: unsupported script command skipped"),
                    }
                }
                None
            }
        }
    }
}

// Payload helpers

fn literal(bytes: &[u8]) -> Text {
    // Inputs are slices of a Message, so they always fit.
    let mut text = Text::new();
    let _ = text.extend_from_slice(bytes);
    text
}

fn text_command(payload: &[u8], korean: bool) -> TypingCommand {
    if !payload.starts_with(b"{") {
        return TypingCommand::text(korean, literal(payload), None, 0);
    }
    match structured_text(payload) {
        Some((text, speed_cps, interval_ms)) => {
            TypingCommand::text(korean, text, speed_cps, interval_ms)
        }
        None => TypingCommand::text(false, literal(payload), None, 0),
    }
}

/// Legacy `{"text": "...", "speed_cps": N, "interval_ms": M}` form.
fn structured_text(payload: &[u8]) -> Option<(Text, Option<u8>, u16)> {
    let text = string_field(payload, b"text")?;
    let speed = number_field(payload, b"speed_cps").map(clamp_speed);
    let interval = number_field(payload, b"interval_ms")
        .map_or(0, |ms| ms.min(MAX_INTERVAL_MS as u32) as u16);
    Some((text, speed, interval))
}

fn config_speed(payload: &[u8]) -> Option<u8> {
    number_field(payload, b"speed_cps")
        .or_else(|| parse_uint(payload.trim_ascii()))
        .map(clamp_speed)
}

/// Position right after `"key"` and the following `:` or `=`.
fn field_value<'a>(payload: &'a [u8], key: &[u8]) -> Option<&'a [u8]> {
    let mut rest = payload;
    loop {
        let at = find(rest, key)?;
        let before_quote = at > 0 && rest[at - 1] == b'"';
        let mut after = &rest[at + key.len()..];
        if before_quote {
            after = after.strip_prefix(b"\"").unwrap_or(after);
        }
        let after = after.trim_ascii_start();
        if let Some(value) = after
            .strip_prefix(b":")
            .or_else(|| after.strip_prefix(b"="))
        {
            return Some(value.trim_ascii_start());
        }
        rest = &rest[at + key.len()..];
    }
}

fn number_field(payload: &[u8], key: &[u8]) -> Option<u32> {
    let value = field_value(payload, key)?;
    let value = value.strip_prefix(b"\"").unwrap_or(value);
    let digits = value.iter().take_while(|b| b.is_ascii_digit()).count();
    parse_uint(&value[..digits])
}

/// Bare or quoted identifier/number value, e.g. `ctrl_space` or `"2"`.
fn word_field<'a>(payload: &'a [u8], key: &[u8]) -> Option<&'a [u8]> {
    let value = field_value(payload, key)?;
    let value = value.strip_prefix(b"\"").unwrap_or(value);
    let len = value
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
        .count();
    Some(&value[..len])
}

fn string_field(payload: &[u8], key: &[u8]) -> Option<Text> {
    let value = field_value(payload, key)?.strip_prefix(b"\"")?;
    unescape(value)
}

/// Decode a JSON string body up to its closing quote.
fn unescape(body: &[u8]) -> Option<Text> {
    let mut out = Text::new();
    let mut iter = body.iter().copied();
    while let Some(b) = iter.next() {
        let decoded = match b {
            b'"' => return Some(out),
            b'\\' => match iter.next()? {
                b'n' => b'\n',
                b't' => b'\t',
                b'r' => b'\r',
                b'b' => 0x08,
                b'f' => 0x0C,
                b'u' => {
                    let mut cp = 0u32;
                    for _ in 0..4 {
                        cp = cp * 16 + (iter.next()? as char).to_digit(16)?;
                    }
                    // Lone surrogates have no UTF-8 form and are dropped.
                    if let Some(c) = char::from_u32(cp) {
                        let mut buf = [0u8; 4];
                        out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes())
                            .ok()?;
                    }
                    continue;
                }
                other => other,
            },
            other => other,
        };
        out.push(decoded).ok()?;
    }
    // Unterminated string.
    None
}

fn parse_uint(digits: &[u8]) -> Option<u32> {
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    Some(digits.iter().fold(0u32, |acc, d| {
        acc.saturating_mul(10).saturating_add(u32::from(d - b'0'))
    }))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn english(text: &str) -> TypingCommand {
        TypingCommand::EnglishText {
            text: literal(text.as_bytes()),
            speed_cps: None,
            interval_ms: 0,
        }
    }

    fn korean(text: &str) -> TypingCommand {
        TypingCommand::KoreanJamo {
            text: literal(text.as_bytes()),
            speed_cps: None,
            interval_ms: 0,
        }
    }

    fn speed(cps: u8) -> TypingCommand {
        TypingCommand::Configuration {
            speed_cps: Some(cps),
            ime_toggle: None,
        }
    }

    // ════════════════════════════════════════════════════════════════════════
    // Tag dispatch
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn english_tag() {
        assert_eq!(dispatch(b"GHTYPE_ENG:Hello"), Some(english("Hello")));
    }

    #[test]
    fn untagged_is_english() {
        assert_eq!(dispatch(b"Hello"), Some(english("Hello")));
        assert_eq!(dispatch(b""), Some(english("")));
    }

    #[test]
    fn korean_tag() {
        assert_eq!(dispatch(b"GHTYPE_KOR:dkssud"), Some(korean("dkssud")));
    }

    #[test]
    fn tags_are_case_sensitive() {
        assert_eq!(dispatch(b"ghtype_kor:dkssud"), Some(english("ghtype_kor:dkssud")));
    }

    #[test]
    fn only_first_tag_is_stripped() {
        assert_eq!(
            dispatch(b"GHTYPE_ENG:GHTYPE_KOR:x"),
            Some(english("GHTYPE_KOR:x"))
        );
    }

    // ════════════════════════════════════════════════════════════════════════
    // Special commands
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn special_is_case_insensitive() {
        assert_eq!(
            dispatch(b"GHTYPE_SPE:ENTER"),
            Some(TypingCommand::SpecialCommand(SpecialKey::Enter))
        );
        assert_eq!(
            dispatch(b"GHTYPE_SPE:Ctrl+C"),
            Some(TypingCommand::SpecialCommand(SpecialKey::CtrlC))
        );
        assert_eq!(
            dispatch(b"GHTYPE_SPE: haneng \n"),
            Some(TypingCommand::SpecialCommand(SpecialKey::HanEng))
        );
    }

    #[test]
    fn full_special_vocabulary() {
        for (word, key) in SpecialKey::VOCABULARY {
            assert_eq!(SpecialKey::parse(word.as_bytes()), Some(key));
            assert_eq!(key.name(), word);
        }
    }

    #[test]
    fn unknown_special_is_dropped() {
        assert_eq!(dispatch(b"GHTYPE_SPE:f13"), None);
        assert_eq!(dispatch(b"GHTYPE_SPE:"), None);
    }

    // ════════════════════════════════════════════════════════════════════════
    // Configuration
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn config_json() {
        assert_eq!(
            dispatch(br#"GHTYPE_CFG:{"mode":"typing","speed_cps":12}"#),
            Some(speed(12))
        );
    }

    #[test]
    fn config_bare_number_and_key_value() {
        assert_eq!(
            dispatch(b"GHTYPE_CFG:20"),
            Some(speed(20))
        );
        assert_eq!(
            dispatch(b"GHTYPE_CFG:speed_cps=8"),
            Some(speed(8))
        );
    }

    #[test]
    fn config_is_clamped() {
        assert_eq!(
            dispatch(br#"GHTYPE_CFG:{"speed_cps": 0}"#),
            Some(speed(1))
        );
        assert_eq!(
            dispatch(b"GHTYPE_CFG:99999999999"),
            Some(speed(50))
        );
    }

    #[test]
    fn config_ime_toggle() {
        let toggle = |t| {
            Some(TypingCommand::Configuration {
                speed_cps: None,
                ime_toggle: Some(t),
            })
        };
        assert_eq!(
            dispatch(br#"GHTYPE_CFG:{"ime_toggle":"ctrl_space"}"#),
            toggle(ImeToggle::CtrlSpace)
        );
        assert_eq!(dispatch(b"GHTYPE_CFG:ime_toggle=6"), toggle(ImeToggle::HangulKey));
        assert_eq!(
            dispatch(br#"GHTYPE_CFG:{"speed_cps":9,"ime_toggle":"gui_space"}"#),
            Some(TypingCommand::Configuration {
                speed_cps: Some(9),
                ime_toggle: Some(ImeToggle::GuiSpace),
            })
        );
        // An unknown method does not block the speed.
        assert_eq!(
            dispatch(br#"GHTYPE_CFG:{"speed_cps":9,"ime_toggle":"caps"}"#),
            Some(speed(9))
        );
        assert_eq!(dispatch(br#"GHTYPE_CFG:{"ime_toggle":"caps"}"#), None);
    }

    #[test]
    fn malformed_config_is_ignored() {
        assert_eq!(dispatch(b"GHTYPE_CFG:fast"), None);
        assert_eq!(dispatch(br#"GHTYPE_CFG:{"speed_cps":"x"}"#), None);
        assert_eq!(dispatch(br#"GHTYPE_CFG:{"mode":"typing"}"#), None);
    }

    // ════════════════════════════════════════════════════════════════════════
    // Legacy structured text
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn structured_text_with_speed() {
        assert_eq!(
            dispatch(br#"{"text":"Hi\nthere \"you\"","speed_cps":10}"#),
            Some(TypingCommand::EnglishText {
                text: literal(b"Hi\nthere \"you\""),
                speed_cps: Some(10),
                interval_ms: 0,
            })
        );
    }

    #[test]
    fn structured_text_with_interval() {
        assert_eq!(
            dispatch(br#"{"text":"abc","interval_ms":100}"#),
            Some(TypingCommand::EnglishText {
                text: literal(b"abc"),
                speed_cps: None,
                interval_ms: 100,
            })
        );
        assert_eq!(
            dispatch(br#"{"text":"abc","interval_ms":999999}"#),
            Some(TypingCommand::EnglishText {
                text: literal(b"abc"),
                speed_cps: None,
                interval_ms: MAX_INTERVAL_MS,
            })
        );
    }

    #[test]
    fn structured_korean_text() {
        assert_eq!(
            dispatch(br#"GHTYPE_KOR:{"text": "rk"}"#),
            Some(korean("rk"))
        );
    }

    #[test]
    fn structured_unicode_escape() {
        assert_eq!(
            dispatch(br#"{"text":"\uac00!"}"#),
            Some(english("가!"))
        );
    }

    #[test]
    fn structured_without_text_is_literal_english() {
        let raw = r#"{"speed_cps":10}"#;
        assert_eq!(dispatch(raw.as_bytes()), Some(english(raw)));
        let unterminated = r#"GHTYPE_KOR:{"text":"abc"#;
        assert_eq!(
            dispatch(unterminated.as_bytes()),
            Some(english(r#"{"text":"abc"#))
        );
    }

    #[test]
    fn plain_braces_are_not_json() {
        assert_eq!(dispatch(b"{}"), Some(english("{}")));
    }

    // ════════════════════════════════════════════════════════════════════════
    // Inline toggle marker
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn toggle_marker_splits_into_lanes() {
        let msg = r#"{"text":"hi⌨HANGUL_TOGGLE⌨dkssud","speed_cps":10,"interval_ms":100}"#;
        let collected: std::vec::Vec<_> = commands(msg.as_bytes()).collect();
        assert_eq!(
            collected,
            [
                TypingCommand::EnglishText {
                    text: literal(b"hi"),
                    speed_cps: Some(10),
                    interval_ms: 100,
                },
                TypingCommand::KoreanJamo {
                    text: literal(b"dkssud"),
                    speed_cps: Some(10),
                    interval_ms: 100,
                },
            ]
        );
    }

    #[test]
    fn toggle_marker_flips_back_and_starts_from_tag_lane() {
        let msg = "GHTYPE_KOR:rk⌨HANGUL_TOGGLE⌨ok⌨HANGUL_TOGGLE⌨sk";
        let collected: std::vec::Vec<_> = commands(msg.as_bytes()).collect();
        assert_eq!(collected, [korean("rk"), english("ok"), korean("sk")]);
    }

    #[test]
    fn empty_pieces_between_markers_are_skipped() {
        let msg = "⌨HANGUL_TOGGLE⌨rk⌨HANGUL_TOGGLE⌨⌨HANGUL_TOGGLE⌨sk⌨HANGUL_TOGGLE⌨";
        let collected: std::vec::Vec<_> = commands(msg.as_bytes()).collect();
        assert_eq!(collected, [korean("rk"), korean("sk")]);
    }

    #[test]
    fn escaped_marker_is_recognised() {
        let msg = r#"{"text":"a\u2328HANGUL_TOGGLE\u2328rk"}"#;
        let collected: std::vec::Vec<_> = commands(msg.as_bytes()).collect();
        assert_eq!(collected, [english("a"), korean("rk")]);
    }

    // ════════════════════════════════════════════════════════════════════════
    // Script dialect
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn script_switches_lanes() {
        let script = b"#CMD:HANGUL\n#TEXT:dkssud\n#CMD:ENGLISH\n#TEXT:Hello \n#CMD:ENTER";
        let mut cmds = commands(script);
        assert_eq!(cmds.next(), Some(korean("dkssud")));
        assert_eq!(cmds.next(), Some(english("Hello ")));
        assert_eq!(
            cmds.next(),
            Some(TypingCommand::SpecialCommand(SpecialKey::Enter))
        );
        assert_eq!(cmds.next(), None);
    }

    #[test]
    fn script_starts_in_english_and_skips_unknown_lines() {
        let script = b"#TEXT:a\r\n\n#CMD:SHIFT\nnoise\n#CMD:TAB\r\n#TEXT:b";
        let collected: std::vec::Vec<_> = commands(script).collect();
        assert_eq!(
            collected,
            [
                english("a"),
                TypingCommand::SpecialCommand(SpecialKey::Tab),
                english("b"),
            ]
        );
    }

    #[test]
    fn single_message_yields_once() {
        let mut cmds = commands(b"GHTYPE_KOR:rk");
        assert_eq!(cmds.next(), Some(korean("rk")));
        assert_eq!(cmds.next(), None);
        assert_eq!(commands(b"GHTYPE_SPE:nope").next(), None);
    }
}
