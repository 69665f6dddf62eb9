//! Typing pipeline context.
//!
//! [`Shared`] is the state both tasks touch: the message queue, the typing
//! speed and the cancel flag. It lives in a `static` on target. The BLE side
//! only pushes and cancels; everything that emits keystrokes goes through
//! [`TypingService`], which is owned by the typing task.

use crate::config::QUEUE_CAPACITY;
use crate::hangul::QwertyKeys;
use crate::hid::HidKeyboard;
use crate::protocol::{self, DropReason, Feed, Message, SpecialKey, TypingCommand};
use crate::queue::TypingQueue;
use crate::text::Utf8Chars;
use crate::typing::mode::{ImeToggle, InputMode, ModeController};
use crate::typing::{Clock, Pace, TypingEngine, TypingReport, TypingSpeed};
use core::sync::atomic::{AtomicBool, Ordering};
use embedded_hal_async::delay::DelayNs;
use rand_core::RngCore;

/// Status line notified to the central on the TX characteristic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ack {
    Queued,
    Completed,
    Cancelled,
    QueueFull,
    FragmentDropped,
}

impl Ack {
    pub fn as_str(self) -> &'static str {
        match self {
            Ack::Queued => "OK:Queued for typing",
            Ack::Completed => "OK:Typing completed",
            Ack::Cancelled => "OK:Typing cancelled",
            Ack::QueueFull => "ERR:Queue full",
            Ack::FragmentDropped => "ERR:Fragment dropped",
        }
    }

    pub fn as_bytes(self) -> &'static [u8] {
        self.as_str().as_bytes()
    }

    pub fn is_error(self) -> bool {
        self.as_str().starts_with("ERR:")
    }
}

/// State shared between the BLE receive path and the typing task.
pub struct Shared {
    queue: TypingQueue<QUEUE_CAPACITY>,
    speed: TypingSpeed,
    cancel: AtomicBool,
}

impl Shared {
    pub const fn new() -> Self {
        Self {
            queue: TypingQueue::new(),
            speed: TypingSpeed::new(),
            cancel: AtomicBool::new(false),
        }
    }

    pub fn queue(&self) -> &TypingQueue<QUEUE_CAPACITY> {
        &self.queue
    }

    pub fn speed(&self) -> &TypingSpeed {
        &self.speed
    }

    /// Flag checked by the engine between characters.
    pub fn cancel_token(&self) -> &AtomicBool {
        &self.cancel
    }

    /// Queue a complete message for typing.
    pub fn submit(&self, message: Message) -> Ack {
        let len = message.len();
        match self.queue.push(message) {
            Ok(()) => {
                debug!("service: queued {} bytes ({} waiting)", len, self.queue.len());
                Ack::Queued
            }
            Err(_) => Ack::QueueFull,
        }
    }

    /// Turn a reassembler result into the acknowledgement owed to the
    /// central, queueing the message if one completed.
    pub fn receive(&self, feed: Feed) -> Option<Ack> {
        match feed {
            Feed::Pending => None,
            Feed::Complete(message) => Some(self.submit(message)),
            Feed::Dropped(DropReason::Orphan) => {
                debug!("service: orphan fragment ignored");
                Some(Ack::FragmentDropped)
            }
            Feed::Dropped(reason) => {
                warn!("service: fragment dropped: {}", reason);
                Some(Ack::FragmentDropped)
            }
        }
    }

    /// Stop the message being typed and discard everything still queued.
    pub fn cancel_all(&self) {
        self.cancel.store(true, Ordering::Relaxed);
        let dropped = self.queue.clear();
        if dropped > 0 {
            info!("service: discarded {} queued messages", dropped);
        }
    }
}

impl Default for Shared {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of processing one queued message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Outcome {
    pub report: TypingReport,
    /// A configuration command changed the typing speed.
    pub speed_changed: bool,
    /// Toggle method selected by a configuration command.
    pub ime_toggle: Option<ImeToggle>,
}

impl Outcome {
    /// Something worth persisting changed.
    pub fn settings_changed(&self) -> bool {
        self.speed_changed || self.ime_toggle.is_some()
    }

    pub fn ack(&self) -> Ack {
        if self.report.cancelled {
            Ack::Cancelled
        } else {
            Ack::Completed
        }
    }
}

/// Executes queued messages: IME switching, typing and configuration.
pub struct TypingService<'a, R> {
    shared: &'a Shared,
    mode: ModeController,
    engine: TypingEngine<R>,
}

impl<'a, R: RngCore> TypingService<'a, R> {
    pub fn new(shared: &'a Shared, rng: R, toggle: ImeToggle) -> Self {
        Self {
            shared,
            mode: ModeController::new(toggle),
            engine: TypingEngine::new(rng),
        }
    }

    pub fn mode(&self) -> &ModeController {
        &self.mode
    }

    pub fn cancel_token(&self) -> &AtomicBool {
        self.shared.cancel_token()
    }

    /// Pop and process the next message, if any.
    pub async fn run_next<H, D, C>(
        &mut self,
        hid: &mut H,
        delay: &mut D,
        clock: &C,
    ) -> Option<Outcome>
    where
        H: HidKeyboard,
        D: DelayNs,
        C: Clock,
    {
        let shared = self.shared;
        let job = shared.queue.try_pop()?;
        // A cancel only applies to work that existed when it was raised.
        shared.cancel.store(false, Ordering::Relaxed);
        let outcome = self.handle_message(&job, hid, delay, clock).await;
        info!(
            "service: typed {} skipped {} cancelled {}",
            outcome.report.typed, outcome.report.skipped, outcome.report.cancelled
        );
        Some(outcome)
    }

    /// Run every command carried by `message`.
    pub async fn handle_message<H, D, C>(
        &mut self,
        message: &[u8],
        hid: &mut H,
        delay: &mut D,
        clock: &C,
    ) -> Outcome
    where
        H: HidKeyboard,
        D: DelayNs,
        C: Clock,
    {
        let mut outcome = Outcome::default();
        for command in protocol::commands(message) {
            if self.shared.cancel.load(Ordering::Relaxed) {
                outcome.report.cancelled = true;
                break;
            }
            self.execute(command, hid, delay, clock, &mut outcome).await;
        }
        outcome
    }

    async fn execute<H, D, C>(
        &mut self,
        command: TypingCommand,
        hid: &mut H,
        delay: &mut D,
        clock: &C,
        outcome: &mut Outcome,
    ) where
        H: HidKeyboard,
        D: DelayNs,
        C: Clock,
    {
        let shared = self.shared;
        let cancel = &shared.cancel;
        match command {
            TypingCommand::EnglishText { text, speed_cps, interval_ms } => {
                self.switch_to(InputMode::English, hid, delay, clock).await;
                let pace = Pace {
                    speed_cps: speed_cps.unwrap_or_else(|| shared.speed.get()),
                    interval_ms,
                };
                let report = self
                    .engine
                    .type_text(Utf8Chars::new(&text), pace, hid, delay, cancel)
                    .await;
                outcome.report.merge(report);
            }
            TypingCommand::KoreanJamo { text, speed_cps, interval_ms } => {
                self.switch_to(InputMode::Korean, hid, delay, clock).await;
                let pace = Pace {
                    speed_cps: speed_cps.unwrap_or_else(|| shared.speed.get()),
                    interval_ms,
                };
                let report = self
                    .engine
                    .type_text(QwertyKeys::new(&text), pace, hid, delay, cancel)
                    .await;
                outcome.report.merge(report);
            }
            TypingCommand::SpecialCommand(key) => {
                let result = match key {
                    SpecialKey::HanEng => self.mode.toggle(hid, delay, clock).await,
                    SpecialKey::Eng => self
                        .mode
                        .ensure_mode(InputMode::English, hid, delay, clock)
                        .await
                        .map(|_| ()),
                    SpecialKey::ResetMode => {
                        self.mode.reset();
                        Ok(())
                    }
                    _ => self.engine.press_special(key, hid, delay).await,
                };
                match result {
                    Ok(()) => outcome.report.typed += 1,
                    Err(e) => {
                        warn!("service: special {} failed: {}", key.name(), e);
                        outcome.report.skipped += 1;
                    }
                }
            }
            TypingCommand::Configuration { speed_cps, ime_toggle } => {
                if let Some(cps) = speed_cps {
                    let stored = shared.speed.set(cps);
                    info!("service: speed set to {} cps", stored);
                    outcome.speed_changed = true;
                }
                if let Some(toggle) = ime_toggle {
                    self.mode.set_toggle_method(toggle);
                    info!("service: IME toggle set to {}", toggle.name());
                    outcome.ime_toggle = Some(toggle);
                }
            }
        }
    }

    /// Best effort: a failed toggle is logged and typing goes ahead.
    async fn switch_to<H, D, C>(&mut self, target: InputMode, hid: &mut H, delay: &mut D, clock: &C)
    where
        H: HidKeyboard,
        D: DelayNs,
        C: Clock,
    {
        if let Err(e) = self.mode.ensure_mode(target, hid, delay, clock).await {
            warn!("service: could not switch to {}: {}", target, e);
        }
    }
}
