//! Host IME state tracking and switching.
//!
//! A HID device cannot ask the host which input mode is active, so the
//! controller keeps its own belief and changes it only by emitting the
//! configured toggle combination. `Unknown` is treated as English: the
//! dongle assumes the host starts in English.

use super::Clock;
use crate::config::{MODE_SETTLE_MS, MODE_SWITCH_MIN_INTERVAL_MS, MODE_TOGGLE_HOLD_MS};
use crate::error::Error;
use crate::hid::keyboard::{modifier, usage};
use crate::hid::{HidKeyboard, Key};
use embedded_hal_async::delay::DelayNs;

/// Input mode the host IME is believed to be in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputMode {
    Unknown,
    English,
    Korean,
}

impl InputMode {
    fn normalized(self) -> Self {
        match self {
            InputMode::Unknown => InputMode::English,
            other => other,
        }
    }

    fn opposite(self) -> Self {
        match self.normalized() {
            InputMode::Korean => InputMode::English,
            _ => InputMode::Korean,
        }
    }
}

/// Key combination the host IME listens to for Hangul/English switching.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ImeToggle {
    /// Right Alt alone (Windows "한/영" on US keyboards).
    RightAlt = 0,
    AltShift = 1,
    CtrlSpace = 2,
    ShiftSpace = 3,
    LeftAlt = 4,
    /// Win+Space / Cmd+Space.
    GuiSpace = 5,
    /// Dedicated Hangul key (LANG1).
    HangulKey = 6,
}

impl ImeToggle {
    const NAMES: [(&'static str, ImeToggle); 7] = [
        ("right_alt", ImeToggle::RightAlt),
        ("alt_shift", ImeToggle::AltShift),
        ("ctrl_space", ImeToggle::CtrlSpace),
        ("shift_space", ImeToggle::ShiftSpace),
        ("left_alt", ImeToggle::LeftAlt),
        ("gui_space", ImeToggle::GuiSpace),
        ("hangul_key", ImeToggle::HangulKey),
    ];

    /// Case-insensitive name (`ctrl_space`) or numeric id (`2`).
    pub fn parse(raw: &[u8]) -> Option<Self> {
        let raw = raw.trim_ascii();
        if let Some(&(_, toggle)) = Self::NAMES
            .iter()
            .find(|(name, _)| name.as_bytes().eq_ignore_ascii_case(raw))
        {
            return Some(toggle);
        }
        let id = core::str::from_utf8(raw).ok()?.parse::<u8>().ok()?;
        Self::from_u8(id)
    }

    pub fn name(self) -> &'static str {
        Self::NAMES[self as usize].0
    }

    pub fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => ImeToggle::RightAlt,
            1 => ImeToggle::AltShift,
            2 => ImeToggle::CtrlSpace,
            3 => ImeToggle::ShiftSpace,
            4 => ImeToggle::LeftAlt,
            5 => ImeToggle::GuiSpace,
            6 => ImeToggle::HangulKey,
            _ => return None,
        })
    }

    /// Keys pressed, in order, to trigger the switch.
    pub fn keys(self) -> &'static [Key] {
        match self {
            ImeToggle::RightAlt => &[Key::Modifier(modifier::RIGHT_ALT)],
            ImeToggle::AltShift => &[Key::Modifier(modifier::LEFT_ALT | modifier::LEFT_SHIFT)],
            ImeToggle::CtrlSpace => &[
                Key::Modifier(modifier::LEFT_CTRL),
                Key::Usage(usage::SPACE),
            ],
            ImeToggle::ShiftSpace => &[
                Key::Modifier(modifier::LEFT_SHIFT),
                Key::Usage(usage::SPACE),
            ],
            ImeToggle::LeftAlt => &[Key::Modifier(modifier::LEFT_ALT)],
            ImeToggle::GuiSpace => &[
                Key::Modifier(modifier::LEFT_GUI),
                Key::Usage(usage::SPACE),
            ],
            ImeToggle::HangulKey => &[Key::Usage(usage::LANG1)],
        }
    }
}

/// Tracks the host IME mode and emits rate-limited toggles.
pub struct ModeController {
    current: InputMode,
    last_switch_ms: Option<u64>,
    toggle: ImeToggle,
    switches: u32,
}

impl ModeController {
    pub const fn new(toggle: ImeToggle) -> Self {
        Self {
            current: InputMode::Unknown,
            last_switch_ms: None,
            toggle,
            switches: 0,
        }
    }

    pub fn current(&self) -> InputMode {
        self.current
    }

    pub fn toggle_method(&self) -> ImeToggle {
        self.toggle
    }

    pub fn set_toggle_method(&mut self, toggle: ImeToggle) {
        self.toggle = toggle;
    }

    /// Number of toggles emitted since boot.
    pub fn switch_count(&self) -> u32 {
        self.switches
    }

    /// Switch to `target` unless already there.
    ///
    /// A switch requested within the minimum interval of the previous one
    /// waits out the remainder first. Returns `true` if a toggle was sent.
    pub async fn ensure_mode<H, D, C>(
        &mut self,
        target: InputMode,
        hid: &mut H,
        delay: &mut D,
        clock: &C,
    ) -> Result<bool, Error>
    where
        H: HidKeyboard,
        D: DelayNs,
        C: Clock,
    {
        let target = target.normalized();
        self.current = self.current.normalized();
        if self.current == target {
            return Ok(false);
        }

        if let Some(last) = self.last_switch_ms {
            let elapsed = clock.now_ms().saturating_sub(last);
            if elapsed < MODE_SWITCH_MIN_INTERVAL_MS {
                let wait = (MODE_SWITCH_MIN_INTERVAL_MS - elapsed) as u32;
                debug!("mode: rate limited, waiting {} ms", wait);
                delay.delay_ms(wait).await;
            }
        }

        self.force_switch(target, hid, delay, clock).await?;
        Ok(true)
    }

    /// Emit the toggle and record `target` as the new mode.
    ///
    /// If the toggle cannot be delivered the tracked mode is left unchanged.
    pub async fn force_switch<H, D, C>(
        &mut self,
        target: InputMode,
        hid: &mut H,
        delay: &mut D,
        clock: &C,
    ) -> Result<(), Error>
    where
        H: HidKeyboard,
        D: DelayNs,
        C: Clock,
    {
        let sent = self.send_toggle(hid, delay).await;
        // Lift the keys even if one of the presses failed.
        let released = hid.release_all().await;
        if let Err(e) = sent.and(released) {
            warn!("mode: toggle failed: {}", e);
            return Err(e);
        }
        delay.delay_ms(MODE_SETTLE_MS).await;

        self.current = target.normalized();
        self.last_switch_ms = Some(clock.now_ms());
        self.switches = self.switches.wrapping_add(1);
        info!("mode: now {}", self.current);
        Ok(())
    }

    /// Flip to the opposite mode (rate limited like [`Self::ensure_mode`]).
    pub async fn toggle<H, D, C>(
        &mut self,
        hid: &mut H,
        delay: &mut D,
        clock: &C,
    ) -> Result<(), Error>
    where
        H: HidKeyboard,
        D: DelayNs,
        C: Clock,
    {
        let target = self.current.opposite();
        self.ensure_mode(target, hid, delay, clock).await.map(|_| ())
    }

    /// Forget the tracked state and assume English without typing anything.
    pub fn reset(&mut self) {
        self.current = InputMode::English;
        info!("mode: reset to English");
    }

    async fn send_toggle<H: HidKeyboard, D: DelayNs>(
        &self,
        hid: &mut H,
        delay: &mut D,
    ) -> Result<(), Error> {
        for &key in self.toggle.keys() {
            hid.press(key).await?;
        }
        delay.delay_ms(MODE_TOGGLE_HOLD_MS).await;
        Ok(())
    }
}
