//! Rebuilds logical messages from BLE characteristic writes.
//!
//! A single write is capped by the ATT MTU, so the central splits longer
//! payloads and frames them with explicit sentinels:
//!
//! ```text
//! CHUNK_START:<body…>     first write
//! <body…>                 any number of middle writes
//! <body…>CHUNK_END        last write
//! CHUNK_START:<body>CHUNK_END   payload that fits in one write
//! ```
//!
//! Writes without any sentinel are complete messages on their own. All
//! recovery is lossy: stale, oversized or orphaned fragments are discarded
//! and reported as [`Feed::Dropped`] so the caller can notify the peer.

use crate::config::{FRAGMENT_TIMEOUT_MS, MAX_MESSAGE_LEN};
use heapless::Vec;

/// One complete logical message.
pub type Message = Vec<u8, MAX_MESSAGE_LEN>;

/// Marks the first write of a framed message.
pub const CHUNK_START: &[u8] = b"CHUNK_START:";
/// Marks the last write of a framed message.
pub const CHUNK_END: &[u8] = b"CHUNK_END";

/// Why buffered bytes were thrown away.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DropReason {
    /// A closing fragment arrived with nothing open.
    Orphan,
    /// The message grew beyond [`MAX_MESSAGE_LEN`].
    Overflow,
    /// No closing fragment within [`FRAGMENT_TIMEOUT_MS`].
    Timeout,
}

/// Outcome of feeding one write into the reassembler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Feed {
    /// More fragments are expected (or the write was empty).
    Pending,
    /// A full message is ready.
    Complete(Message),
    /// The write, or the message it belonged to, was discarded.
    Dropped(DropReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum State {
    Idle,
    Accumulating { started_ms: u64 },
}

/// Fragment buffer owned by the BLE receive path.
pub struct FragmentReassembler {
    state: State,
    buffer: Message,
}

impl Default for FragmentReassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FragmentReassembler {
    pub const fn new() -> Self {
        Self {
            state: State::Idle,
            buffer: Vec::new(),
        }
    }

    /// `true` while a framed message is open.
    pub fn is_accumulating(&self) -> bool {
        matches!(self.state, State::Accumulating { .. })
    }

    /// Number of body bytes buffered so far.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Handle one characteristic write received at `now_ms`.
    pub fn feed(&mut self, chunk: &[u8], now_ms: u64) -> Feed {
        if self.poll_timeout(now_ms) {
            warn!("reassembler: stale fragment discarded before new write");
        }
        if chunk.is_empty() {
            return Feed::Pending;
        }

        if let Some(body) = chunk.strip_prefix(CHUNK_START) {
            if self.is_accumulating() {
                warn!(
                    "reassembler: new start while {} bytes open, restarting",
                    self.buffer.len()
                );
            }
            self.reset();
            return match body.strip_suffix(CHUNK_END) {
                Some(inner) => Self::single(inner),
                None => {
                    self.state = State::Accumulating { started_ms: now_ms };
                    self.append(body)
                }
            };
        }

        match self.state {
            State::Idle => match chunk.strip_suffix(CHUNK_END) {
                Some(_) => {
                    debug!("reassembler: orphan end fragment");
                    Feed::Dropped(DropReason::Orphan)
                }
                None => Self::single(chunk),
            },
            State::Accumulating { .. } => match chunk.strip_suffix(CHUNK_END) {
                Some(tail) => match self.append(tail) {
                    Feed::Pending => {
                        let message = core::mem::take(&mut self.buffer);
                        self.state = State::Idle;
                        Feed::Complete(message)
                    }
                    dropped => dropped,
                },
                None => self.append(chunk),
            },
        }
    }

    /// Discard a fragment that has been open longer than the timeout.
    ///
    /// Returns `true` if something was discarded.
    pub fn poll_timeout(&mut self, now_ms: u64) -> bool {
        match self.state {
            State::Accumulating { started_ms }
                if now_ms.saturating_sub(started_ms) > FRAGMENT_TIMEOUT_MS =>
            {
                debug!("reassembler: timeout after {} bytes", self.buffer.len());
                self.reset();
                true
            }
            _ => false,
        }
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.state = State::Idle;
    }

    fn append(&mut self, bytes: &[u8]) -> Feed {
        if self.buffer.extend_from_slice(bytes).is_err() {
            warn!("reassembler: message exceeds {} bytes", MAX_MESSAGE_LEN);
            self.reset();
            return Feed::Dropped(DropReason::Overflow);
        }
        Feed::Pending
    }

    fn single(body: &[u8]) -> Feed {
        match Message::from_slice(body) {
            Ok(message) => Feed::Complete(message),
            Err(()) => Feed::Dropped(DropReason::Overflow),
        }
    }
}
