//! FIFO of complete messages between the BLE task and the typing task.
//!
//! Both ends are non-blocking. The lock is a critical section held only
//! while the deque is touched, so the BLE write callback can push without
//! waiting on a message being typed.

use crate::error::Error;
use crate::protocol::Message;
use core::cell::RefCell;
use core::ops::Deref;
use core::sync::atomic::{AtomicBool, Ordering};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::Deque;

pub struct TypingQueue<const N: usize> {
    messages: Mutex<CriticalSectionRawMutex, RefCell<Deque<Message, N>>>,
    typing: AtomicBool,
}

impl<const N: usize> TypingQueue<N> {
    pub const fn new() -> Self {
        Self {
            messages: Mutex::new(RefCell::new(Deque::new())),
            typing: AtomicBool::new(false),
        }
    }

    /// Append `message`. A full queue rejects the new message and leaves the
    /// waiting ones untouched.
    pub fn push(&self, message: Message) -> Result<(), Error> {
        self.messages.lock(|q| {
            q.borrow_mut().push_back(message).map_err(|rejected| {
                warn!("queue: full, rejecting {} bytes", rejected.len());
                Error::QueueFull
            })
        })
    }

    /// Take the oldest message, unless the queue is empty or another job is
    /// still being typed.
    pub fn try_pop(&self) -> Option<Job<'_, N>> {
        if self
            .typing
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return None;
        }
        match self.messages.lock(|q| q.borrow_mut().pop_front()) {
            Some(message) => Some(Job {
                queue: self,
                message,
            }),
            None => {
                self.typing.store(false, Ordering::Release);
                None
            }
        }
    }

    /// Drop every waiting message; returns how many were discarded.
    pub fn clear(&self) -> usize {
        self.messages.lock(|q| {
            let mut q = q.borrow_mut();
            let n = q.len();
            q.clear();
            n
        })
    }

    pub fn len(&self) -> usize {
        self.messages.lock(|q| q.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` while a popped [`Job`] is alive.
    pub fn is_typing(&self) -> bool {
        self.typing.load(Ordering::Relaxed)
    }
}

impl<const N: usize> Default for TypingQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// A message being typed. Dropping it lets the next message be popped.
pub struct Job<'a, const N: usize> {
    queue: &'a TypingQueue<N>,
    message: Message,
}

impl<const N: usize> Deref for Job<'_, N> {
    type Target = Message;

    fn deref(&self) -> &Message {
        &self.message
    }
}

impl<const N: usize> Drop for Job<'_, N> {
    fn drop(&mut self) {
        self.queue.typing.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(s: &[u8]) -> Message {
        Message::from_slice(s).unwrap()
    }

    #[test]
    fn fifo_order() {
        let q: TypingQueue<4> = TypingQueue::new();
        q.push(msg(b"one")).unwrap();
        q.push(msg(b"two")).unwrap();
        assert_eq!(q.len(), 2);
        assert_eq!(q.try_pop().unwrap().as_slice(), b"one");
        assert_eq!(q.try_pop().unwrap().as_slice(), b"two");
        assert!(q.try_pop().is_none());
        assert!(q.is_empty());
    }

    #[test]
    fn full_queue_rejects_newest() {
        let q: TypingQueue<8> = TypingQueue::new();
        for i in 0..8u8 {
            q.push(msg(&[b'0' + i])).unwrap();
        }
        assert_eq!(q.push(msg(b"ninth")), Err(Error::QueueFull));
        assert_eq!(q.len(), 8);
        for i in 0..8u8 {
            assert_eq!(q.try_pop().unwrap().as_slice(), &[b'0' + i]);
        }
        assert!(q.try_pop().is_none());
    }

    #[test]
    fn one_job_at_a_time() {
        let q: TypingQueue<4> = TypingQueue::new();
        q.push(msg(b"a")).unwrap();
        q.push(msg(b"b")).unwrap();
        let job = q.try_pop().unwrap();
        assert!(q.is_typing());
        assert!(q.try_pop().is_none());
        assert_eq!(q.len(), 1);
        drop(job);
        assert!(!q.is_typing());
        assert_eq!(q.try_pop().unwrap().as_slice(), b"b");
    }

    #[test]
    fn empty_pop_does_not_stick() {
        let q: TypingQueue<2> = TypingQueue::new();
        assert!(q.try_pop().is_none());
        assert!(!q.is_typing());
        q.push(msg(b"x")).unwrap();
        assert!(q.try_pop().is_some());
    }

    #[test]
    fn push_while_typing() {
        let q: TypingQueue<2> = TypingQueue::new();
        q.push(msg(b"a")).unwrap();
        let _job = q.try_pop().unwrap();
        q.push(msg(b"b")).unwrap();
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn clear_discards_waiting() {
        let q: TypingQueue<4> = TypingQueue::new();
        q.push(msg(b"a")).unwrap();
        q.push(msg(b"b")).unwrap();
        assert_eq!(q.clear(), 2);
        assert!(q.try_pop().is_none());
    }
}
