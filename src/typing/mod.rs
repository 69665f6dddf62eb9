//! Keystroke generation with humanised timing.
//!
//! The [`TypingEngine`] turns a stream of characters into HID presses with a
//! jittered per-character delay derived from the configured speed. IME
//! switching lives in [`mode`].

pub mod mode;

use crate::config::{
    INTERVAL_EVERY_CHARS, KEY_PRESS_HOLD_MS, NEWLINE_SETTLE_MS, SHIFT_HOLD_MS,
    SPECIAL_KEY_SETTLE_MS, TAB_DELAY_MS, TYPING_SPEED_DEFAULT_CPS, TYPING_SPEED_MAX_CPS,
    TYPING_SPEED_MIN_CPS, YIELD_EVERY_CHARS,
};
use crate::error::Error;
use crate::hid::keyboard::{modifier, usage};
use crate::hid::{HidKeyboard, Key};
use crate::protocol::SpecialKey;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use embedded_hal_async::delay::DelayNs;
use rand_core::RngCore;

/// Clamp a requested speed into the supported characters-per-second range.
pub fn clamp_speed(cps: u32) -> u8 {
    cps.clamp(TYPING_SPEED_MIN_CPS as u32, TYPING_SPEED_MAX_CPS as u32) as u8
}

/// Millisecond timestamp source for rate limiting.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Shared typing speed, always within the supported range.
pub struct TypingSpeed(AtomicU8);

impl TypingSpeed {
    pub const fn new() -> Self {
        Self(AtomicU8::new(TYPING_SPEED_DEFAULT_CPS))
    }

    pub fn get(&self) -> u8 {
        self.0.load(Ordering::Relaxed)
    }

    /// Store `cps` after clamping; returns the stored value.
    pub fn set(&self, cps: u8) -> u8 {
        let cps = clamp_speed(cps as u32);
        self.0.store(cps, Ordering::Relaxed);
        cps
    }
}

impl Default for TypingSpeed {
    fn default() -> Self {
        Self::new()
    }
}

/// How fast to type one run of text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pace {
    pub speed_cps: u8,
    /// Pause after every [`INTERVAL_EVERY_CHARS`] typed characters; 0 for none.
    pub interval_ms: u16,
}

impl From<u8> for Pace {
    fn from(speed_cps: u8) -> Self {
        Self {
            speed_cps,
            interval_ms: 0,
        }
    }
}

/// Outcome of typing one run of text (or one whole message).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TypingReport {
    pub typed: u32,
    pub skipped: u32,
    pub cancelled: bool,
}

impl TypingReport {
    /// Add the counts of `other`; cancellation is sticky.
    pub fn merge(&mut self, other: TypingReport) {
        self.typed += other.typed;
        self.skipped += other.skipped;
        self.cancelled |= other.cancelled;
    }
}

/// Modifier and usage pressed for a key-like special command, or `None` for
/// IME directives.
pub fn special_combo(key: SpecialKey) -> Option<(u8, u8)> {
    Some(match key {
        SpecialKey::Enter => (0, usage::RETURN),
        SpecialKey::Tab => (0, usage::TAB),
        SpecialKey::Backspace => (0, usage::BACKSPACE),
        SpecialKey::Space => (0, usage::SPACE),
        SpecialKey::CtrlC => (modifier::LEFT_CTRL, usage::C),
        SpecialKey::CtrlV => (modifier::LEFT_CTRL, usage::V),
        SpecialKey::AltTab => (modifier::LEFT_ALT, usage::TAB),
        SpecialKey::HanEng | SpecialKey::Eng | SpecialKey::ResetMode => return None,
    })
}

pub struct TypingEngine<R> {
    rng: R,
}

impl<R: RngCore> TypingEngine<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Type `chars` at `pace`.
    ///
    /// Characters the US layout cannot produce are skipped; a character whose
    /// HID write fails is abandoned after a release-all. `cancel` is checked
    /// before every character.
    pub async fn type_text<I, H, D>(
        &mut self,
        chars: I,
        pace: Pace,
        hid: &mut H,
        delay: &mut D,
        cancel: &AtomicBool,
    ) -> TypingReport
    where
        I: IntoIterator<Item = char>,
        H: HidKeyboard,
        D: DelayNs,
    {
        let base = 1000 / clamp_speed(pace.speed_cps as u32) as u32;
        let mut report = TypingReport::default();
        let mut after_cr = false;

        for (n, c) in chars.into_iter().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                info!("typing: cancelled after {} chars", report.typed);
                report.cancelled = true;
                break;
            }
            if n > 0 && n % YIELD_EVERY_CHARS == 0 {
                embassy_futures::yield_now().await;
            }

            let collapse = c == '\n' && after_cr;
            after_cr = c == '\r';
            if collapse {
                continue;
            }

            let result = match c {
                '\n' | '\r' => self.tap(Key::Usage(usage::RETURN), NEWLINE_SETTLE_MS, hid, delay).await,
                '\t' => self.tap(Key::Usage(usage::TAB), TAB_DELAY_MS, hid, delay).await,
                'A'..='Z' => self.type_upper(c as u8, hid, delay).await,
                ' '..='~' => hid.write_char(c as u8).await,
                _ => {
                    warn!("typing: no key for U+{:X}", c as u32);
                    report.skipped += 1;
                    continue;
                }
            };

            match result {
                Ok(()) => {
                    report.typed += 1;
                    if !matches!(c, '\n' | '\r' | '\t') {
                        let pause = self.jitter(base);
                        delay.delay_ms(pause).await;
                    }
                    if pace.interval_ms > 0 && report.typed % INTERVAL_EVERY_CHARS == 0 {
                        delay.delay_ms(pace.interval_ms as u32).await;
                    }
                }
                Err(e) => {
                    warn!("typing: dropped char: {}", e);
                    let _ = hid.release_all().await;
                    report.skipped += 1;
                }
            }
        }

        report
    }

    /// Press a key-like special command: combo down, hold, release, settle.
    ///
    /// IME directives have no key combination and are rejected with
    /// [`Error::Hid`]; the caller routes them to the mode controller.
    pub async fn press_special<H: HidKeyboard, D: DelayNs>(
        &mut self,
        key: SpecialKey,
        hid: &mut H,
        delay: &mut D,
    ) -> Result<(), Error> {
        let (mods, code) = special_combo(key).ok_or(Error::Hid)?;
        debug!("typing: special {}", key.name());
        let pressed = async {
            if mods != 0 {
                hid.press(Key::Modifier(mods)).await?;
            }
            hid.press(Key::Usage(code)).await
        }
        .await;
        if pressed.is_ok() {
            delay.delay_ms(KEY_PRESS_HOLD_MS).await;
        }
        let released = hid.release_all().await;
        pressed.and(released)?;
        delay.delay_ms(SPECIAL_KEY_SETTLE_MS).await;
        Ok(())
    }

    async fn tap<H: HidKeyboard, D: DelayNs>(
        &mut self,
        key: Key,
        settle_ms: u32,
        hid: &mut H,
        delay: &mut D,
    ) -> Result<(), Error> {
        hid.press(key).await?;
        hid.release_all().await?;
        delay.delay_ms(settle_ms).await;
        Ok(())
    }

    async fn type_upper<H: HidKeyboard, D: DelayNs>(
        &mut self,
        letter: u8,
        hid: &mut H,
        delay: &mut D,
    ) -> Result<(), Error> {
        hid.press(Key::Modifier(modifier::LEFT_SHIFT)).await?;
        delay.delay_ms(SHIFT_HOLD_MS).await;
        hid.press(Key::Usage(usage::A + (letter - b'A'))).await?;
        delay.delay_ms(KEY_PRESS_HOLD_MS).await;
        hid.release_all().await
    }

    fn jitter(&mut self, base: u32) -> u32 {
        base + self.rng.next_u32() % (base / 3 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Event, Timeline};
    use embassy_futures::block_on;
    use rand_core::impls;

    /// RNG that always returns the same word.
    struct Fixed(u32);

    impl RngCore for Fixed {
        fn next_u32(&mut self) -> u32 {
            self.0
        }
        fn next_u64(&mut self) -> u64 {
            self.0 as u64
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            impls::fill_bytes_via_next(self, dest)
        }
        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    fn type_str(engine: &mut TypingEngine<Fixed>, tl: &Timeline, s: &str, cps: u8) -> TypingReport {
        let cancel = AtomicBool::new(false);
        block_on(engine.type_text(s.chars(), Pace::from(cps), &mut tl.hid(), &mut tl.delay(), &cancel))
    }

    #[test]
    fn speed_is_clamped() {
        assert_eq!(clamp_speed(0), 1);
        assert_eq!(clamp_speed(6), 6);
        assert_eq!(clamp_speed(50), 50);
        assert_eq!(clamp_speed(100_000), 50);

        let speed = TypingSpeed::new();
        assert_eq!(speed.get(), 6);
        assert_eq!(speed.set(200), 50);
        assert_eq!(speed.set(0), 1);
        assert_eq!(speed.get(), 1);
    }

    #[test]
    fn uppercase_presses_shift_first_each_time() {
        let tl = Timeline::new();
        let mut engine = TypingEngine::new(Fixed(0));
        let report = type_str(&mut engine, &tl, "AB", 10);
        assert_eq!(report, TypingReport { typed: 2, skipped: 0, cancelled: false });

        let shift = Event::Press(Key::Modifier(modifier::LEFT_SHIFT));
        assert_eq!(
            tl.events(),
            [
                shift,
                Event::Delay(SHIFT_HOLD_MS),
                Event::Press(Key::Usage(usage::A)),
                Event::Delay(KEY_PRESS_HOLD_MS),
                Event::ReleaseAll,
                Event::Delay(100),
                shift,
                Event::Delay(SHIFT_HOLD_MS),
                Event::Press(Key::Usage(usage::A + 1)),
                Event::Delay(KEY_PRESS_HOLD_MS),
                Event::ReleaseAll,
                Event::Delay(100),
            ]
        );
    }

    #[test]
    fn jitter_stays_within_a_third_of_base() {
        // base = 1000 / 6 = 166, extra in 0..=55
        let tl = Timeline::new();
        let mut engine = TypingEngine::new(Fixed(55));
        type_str(&mut engine, &tl, "a", 6);
        assert_eq!(tl.events(), [Event::Char(b'a'), Event::Delay(166 + 55)]);

        let tl = Timeline::new();
        let mut engine = TypingEngine::new(Fixed(56));
        type_str(&mut engine, &tl, "a", 6);
        assert_eq!(tl.events()[1], Event::Delay(166));
    }

    #[test]
    fn jitter_with_seeded_rng_is_bounded() {
        use rand_chacha::rand_core::SeedableRng;
        let tl = Timeline::new();
        let mut engine = TypingEngine::new(rand_chacha::ChaCha8Rng::seed_from_u64(7));
        let cancel = AtomicBool::new(false);
        block_on(engine.type_text("hello world".chars(), Pace::from(50), &mut tl.hid(), &mut tl.delay(), &cancel));
        for event in tl.events() {
            if let Event::Delay(ms) = event {
                assert!((20..=26).contains(&ms), "delay {} out of range", ms);
            }
        }
        assert_eq!(tl.typed(), "hello world");
    }

    #[test]
    fn newline_and_tab_use_fixed_settles() {
        let tl = Timeline::new();
        let mut engine = TypingEngine::new(Fixed(0));
        type_str(&mut engine, &tl, "\n\t", 10);
        assert_eq!(
            tl.events(),
            [
                Event::Press(Key::Usage(usage::RETURN)),
                Event::ReleaseAll,
                Event::Delay(NEWLINE_SETTLE_MS),
                Event::Press(Key::Usage(usage::TAB)),
                Event::ReleaseAll,
                Event::Delay(TAB_DELAY_MS),
            ]
        );
    }

    #[test]
    fn crlf_is_one_return() {
        let tl = Timeline::new();
        let mut engine = TypingEngine::new(Fixed(0));
        let report = type_str(&mut engine, &tl, "a\r\nb\r\r", 10);
        assert_eq!(report.typed, 5);
        let returns = tl
            .events()
            .iter()
            .filter(|e| **e == Event::Press(Key::Usage(usage::RETURN)))
            .count();
        assert_eq!(returns, 3);
        assert_eq!(tl.typed(), "ab");
    }

    #[test]
    fn non_ascii_is_skipped() {
        let tl = Timeline::new();
        let mut engine = TypingEngine::new(Fixed(0));
        let report = type_str(&mut engine, &tl, "a\u{e9}b\u{1f600}", 10);
        assert_eq!(report, TypingReport { typed: 2, skipped: 2, cancelled: false });
        assert_eq!(tl.typed(), "ab");
    }

    #[test]
    fn hid_failure_skips_one_char_and_continues() {
        let tl = Timeline::new();
        tl.fail_presses(1);
        let mut engine = TypingEngine::new(Fixed(0));
        let report = type_str(&mut engine, &tl, "xyz", 10);
        assert_eq!(report, TypingReport { typed: 2, skipped: 1, cancelled: false });
        assert_eq!(tl.events()[0], Event::ReleaseAll);
        assert_eq!(tl.typed(), "yz");
    }

    #[test]
    fn cancel_stops_before_next_char() {
        let tl = Timeline::new();
        let mut engine = TypingEngine::new(Fixed(0));
        let cancel = AtomicBool::new(true);
        let report = block_on(engine.type_text("abc".chars(), Pace::from(10), &mut tl.hid(), &mut tl.delay(), &cancel));
        assert!(report.cancelled);
        assert_eq!(report.typed, 0);
        assert!(tl.events().is_empty());
    }

    #[test]
    fn long_text_is_typed_completely() {
        let tl = Timeline::new();
        let mut engine = TypingEngine::new(Fixed(0));
        let text: std::string::String = core::iter::repeat('x').take(120).collect();
        let report = type_str(&mut engine, &tl, &text, 50);
        assert_eq!(report.typed, 120);
        assert_eq!(tl.typed(), text);
    }

    #[test]
    fn interval_pause_every_five_chars() {
        let tl = Timeline::new();
        let mut engine = TypingEngine::new(Fixed(0));
        let cancel = AtomicBool::new(false);
        let pace = Pace { speed_cps: 20, interval_ms: 300 };
        let report = block_on(engine.type_text(
            "abcdefghijkl".chars(),
            pace,
            &mut tl.hid(),
            &mut tl.delay(),
            &cancel,
        ));
        assert_eq!(report.typed, 12);
        let events = tl.events();
        let pauses: std::vec::Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| **e == Event::Delay(300))
            .map(|(i, _)| i)
            .collect();
        // After 'e' and 'j': char, jitter, pause.
        assert_eq!(pauses, [10, 21]);
        assert_eq!(events[pauses[0] - 2], Event::Char(b'e'));
        assert_eq!(events[pauses[1] - 2], Event::Char(b'j'));
    }

    #[test]
    fn no_interval_by_default() {
        let tl = Timeline::new();
        let mut engine = TypingEngine::new(Fixed(0));
        type_str(&mut engine, &tl, "abcdefghij", 20);
        assert!(tl.events().iter().all(|e| !matches!(e, Event::Delay(ms) if *ms != 50)));
    }

    #[test]
    fn special_keys_press_hold_release_settle() {
        let tl = Timeline::new();
        let mut engine = TypingEngine::new(Fixed(0));
        block_on(engine.press_special(SpecialKey::CtrlV, &mut tl.hid(), &mut tl.delay())).unwrap();
        assert_eq!(
            tl.events(),
            [
                Event::Press(Key::Modifier(modifier::LEFT_CTRL)),
                Event::Press(Key::Usage(usage::V)),
                Event::Delay(KEY_PRESS_HOLD_MS),
                Event::ReleaseAll,
                Event::Delay(SPECIAL_KEY_SETTLE_MS),
            ]
        );
    }

    #[test]
    fn ime_directives_have_no_combo() {
        let tl = Timeline::new();
        let mut engine = TypingEngine::new(Fixed(0));
        assert_eq!(
            block_on(engine.press_special(SpecialKey::HanEng, &mut tl.hid(), &mut tl.delay())),
            Err(Error::Hid)
        );
        assert!(tl.events().is_empty());
        assert_eq!(special_combo(SpecialKey::Enter), Some((0, usage::RETURN)));
        assert_eq!(special_combo(SpecialKey::AltTab), Some((modifier::LEFT_ALT, usage::TAB)));
    }

    #[test]
    fn reports_merge() {
        let mut total = TypingReport { typed: 3, skipped: 1, cancelled: false };
        total.merge(TypingReport { typed: 2, skipped: 0, cancelled: true });
        assert_eq!(total, TypingReport { typed: 5, skipped: 1, cancelled: true });
    }
}
