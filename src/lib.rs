//! Host-testable core of the ghostype dongle.
//!
//! Everything that does not touch the radio, the USB peripheral or flash
//! lives here: Hangul decomposition, BLE fragment reassembly, the wire
//! protocol, IME mode tracking, the typing engine and the queue between
//! them. The firmware in `main.rs` wires these to the SoftDevice and
//! `embassy-usb`.
//!
//! Usage: `cargo test --lib` (unit tests) or `cargo test` (adds `tests/`).
//!
//! Note: The embedded binary needs `--features embedded` and a thumbv7em
//! target; the library builds for the host without it.

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible to every module.
mod fmt;

// ═══════════════════════════════════════════════════════════════════════════
// Core Modules
// ═══════════════════════════════════════════════════════════════════════════

pub mod config;
pub mod error;
pub mod hangul;
pub mod hid;
pub mod protocol;
pub mod queue;
pub mod service;
pub mod settings;
pub mod text;
pub mod typing;

#[cfg(test)]
mod testing;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports
// ═══════════════════════════════════════════════════════════════════════════

pub use error::Error;
pub use service::{Ack, Outcome, Shared, TypingService};
