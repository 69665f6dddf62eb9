//! Host-side doubles for the keystroke, delay and clock seams.
//!
//! A [`Timeline`] records every keystroke and delay in one ordered log and
//! advances a fake millisecond clock on each delay.

use crate::error::Error;
use crate::hid::{HidKeyboard, Key};
use crate::typing::Clock;
use core::cell::{Cell, RefCell};
use embedded_hal_async::delay::DelayNs;
use std::vec::Vec;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Press(Key),
    ReleaseAll,
    Char(u8),
    Delay(u32),
}

#[derive(Default)]
pub struct Timeline {
    events: RefCell<Vec<Event>>,
    now_ms: Cell<u64>,
    failures: Cell<u32>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hid(&self) -> FakeHid<'_> {
        FakeHid(self)
    }

    pub fn delay(&self) -> FakeDelay<'_> {
        FakeDelay(self)
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Only the typed characters, as a string.
    pub fn typed(&self) -> std::string::String {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Char(c) => Some(*c as char),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.set(self.now_ms.get() + ms);
    }

    /// Make the next `n` presses or characters fail with [`Error::Hid`].
    pub fn fail_presses(&self, n: u32) {
        self.failures.set(n);
    }

    fn record(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    fn take_failure(&self) -> bool {
        let n = self.failures.get();
        if n > 0 {
            self.failures.set(n - 1);
            true
        } else {
            false
        }
    }
}

impl Clock for Timeline {
    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }
}

pub struct FakeHid<'a>(&'a Timeline);

impl HidKeyboard for FakeHid<'_> {
    async fn press(&mut self, key: Key) -> Result<(), Error> {
        if self.0.take_failure() {
            return Err(Error::Hid);
        }
        self.0.record(Event::Press(key));
        Ok(())
    }

    async fn release_all(&mut self) -> Result<(), Error> {
        self.0.record(Event::ReleaseAll);
        Ok(())
    }

    async fn write_char(&mut self, ascii: u8) -> Result<(), Error> {
        if self.0.take_failure() {
            return Err(Error::Hid);
        }
        self.0.record(Event::Char(ascii));
        Ok(())
    }
}

pub struct FakeDelay<'a>(&'a Timeline);

impl DelayNs for FakeDelay<'_> {
    async fn delay_ns(&mut self, ns: u32) {
        self.delay_ms(ns / 1_000_000).await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.0.record(Event::Delay(ms));
        self.0.advance(ms as u64);
    }
}
