//! Keyboard output: report types, ASCII keymap and the keystroke interface
//! the typing engine drives.

pub mod keyboard;
pub mod keymap;

use crate::error::Error;
use keyboard::KeyboardReport;

/// One key the typing engine can hold down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Key {
    /// Modifier bits (see [`keyboard::modifier`]).
    Modifier(u8),
    /// Keyboard/Keypad page usage ID.
    Usage(u8),
}

/// Keystroke sink used by the typing engine and the mode controller.
///
/// `press` adds to the keys already held; `release_all` lifts everything.
/// `write_char` is a complete press-and-release of one ASCII character,
/// including Shift when the layout needs it.
#[allow(async_fn_in_trait)]
pub trait HidKeyboard {
    async fn press(&mut self, key: Key) -> Result<(), Error>;
    async fn release_all(&mut self) -> Result<(), Error>;
    async fn write_char(&mut self, ascii: u8) -> Result<(), Error>;
}

/// Transport for raw 8-byte keyboard reports (USB endpoint, test recorder).
#[allow(async_fn_in_trait)]
pub trait ReportSink {
    async fn send_report(&mut self, report: &KeyboardReport) -> Result<(), Error>;
}

/// [`HidKeyboard`] built on top of a [`ReportSink`], tracking held keys.
pub struct Keyboard<S> {
    sink: S,
    report: KeyboardReport,
}

impl<S: ReportSink> Keyboard<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            report: KeyboardReport::empty(),
        }
    }

    /// Keys currently held down.
    pub fn report(&self) -> &KeyboardReport {
        &self.report
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

impl<S: ReportSink> HidKeyboard for Keyboard<S> {
    async fn press(&mut self, key: Key) -> Result<(), Error> {
        match key {
            Key::Modifier(bits) => self.report.modifier |= bits,
            Key::Usage(code) => self.report.press(code)?,
        }
        self.sink.send_report(&self.report).await
    }

    async fn release_all(&mut self) -> Result<(), Error> {
        self.report = KeyboardReport::empty();
        self.sink.send_report(&self.report).await
    }

    async fn write_char(&mut self, ascii: u8) -> Result<(), Error> {
        let (code, shift) = keymap::from_ascii(ascii).ok_or(Error::Hid)?;
        let mut down = KeyboardReport::empty();
        if shift {
            down.modifier = keyboard::modifier::LEFT_SHIFT;
        }
        down.keycodes[0] = code;
        self.report = down;
        let pressed = self.sink.send_report(&self.report).await;
        // Always try to lift the key, even if the press was lost.
        let released = self.release_all().await;
        pressed.and(released)
    }
}
