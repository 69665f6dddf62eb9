//! Application-wide constants and compile-time configuration.
//!
//! All protocol constants, timing parameters, and buffer sizes live here
//! so they can be tuned in one place.

use crate::typing::mode::ImeToggle;

// BLE

/// GAP device name shown to the central.
pub const BLE_DEVICE_NAME: &str = "GHOSTYPE";

/// Nordic-UART-style service carrying text from the central. The GATT
/// macros in `ble::gatt` need the same value as a literal.
pub const BLE_SERVICE_UUID: &str = "6e400001-b5a3-f393-e0a9-e50e24dcca9e";

/// [`BLE_SERVICE_UUID`] in the little-endian byte order used on air.
pub const BLE_SERVICE_UUID_LE: [u8; 16] = uuid_le_bytes(BLE_SERVICE_UUID);

/// Negotiated ATT MTU; one write carries at most `BLE_ATT_MTU - 3` bytes.
pub const BLE_ATT_MTU: u16 = 247;

/// Largest single characteristic value.
pub const BLE_CHUNK_MAX: usize = BLE_ATT_MTU as usize - 3;

/// BLE connection interval range (in 1.25 ms units).
pub const BLE_CONN_INTERVAL_MIN: u16 = 6;
pub const BLE_CONN_INTERVAL_MAX: u16 = 18;

/// BLE slave latency (number of connection events the peripheral can skip).
pub const BLE_SLAVE_LATENCY: u16 = 0;

/// BLE supervision timeout (in 10 ms units). 400 = 4 s.
pub const BLE_SUP_TIMEOUT: u16 = 400;

/// Advertising interval (in 0.625 ms units). 160 = 100 ms.
pub const BLE_ADV_INTERVAL: u32 = 160;

// USB

/// USB VID/PID - use the "pid.codes" open-source test VID.
/// Replace with your own allocated VID/PID for production.
pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x0002;

/// USB device strings.
pub const USB_MANUFACTURER: &str = "ghostype";
pub const USB_PRODUCT: &str = "GHOSTYPE Keyboard";
pub const USB_SERIAL_NUMBER: &str = "000001";

/// USB HID polling interval (ms).
pub const USB_HID_POLL_MS: u8 = 1;

// Typing

/// Speed bounds in characters per second.
pub const TYPING_SPEED_MIN_CPS: u8 = 1;
pub const TYPING_SPEED_MAX_CPS: u8 = 50;
pub const TYPING_SPEED_DEFAULT_CPS: u8 = 6;

/// How long a key stays down before release (ms).
pub const KEY_PRESS_HOLD_MS: u32 = 30;

/// Shift is held this long before the shifted key goes down (ms).
pub const SHIFT_HOLD_MS: u32 = 20;

/// Pause after Return so editors can finish the line (ms).
pub const NEWLINE_SETTLE_MS: u32 = 200;

/// Pause after Tab (ms).
pub const TAB_DELAY_MS: u32 = 50;

/// Pause after a special key combination (ms).
pub const SPECIAL_KEY_SETTLE_MS: u32 = 100;

/// A message's `interval_ms` pause is inserted after every this many
/// typed characters.
pub const INTERVAL_EVERY_CHARS: u32 = 5;

/// Upper bound for a requested `interval_ms` (ms).
pub const MAX_INTERVAL_MS: u16 = 5000;

/// The typing loop yields to the executor after this many characters.
pub const YIELD_EVERY_CHARS: usize = 50;

// IME mode switching

/// Minimum spacing between two mode switches (ms).
pub const MODE_SWITCH_MIN_INTERVAL_MS: u64 = 200;

/// How long the toggle combination is held (ms).
pub const MODE_TOGGLE_HOLD_MS: u32 = 50;

/// Time the host IME needs after a toggle before it accepts input (ms).
pub const MODE_SETTLE_MS: u32 = 300;

/// Key combination used to flip the host IME between Hangul and English.
pub const IME_TOGGLE: ImeToggle = ImeToggle::RightAlt;

// Message transport

/// Largest reassembled message (bytes).
pub const MAX_MESSAGE_LEN: usize = 1024;

/// Partial messages older than this are discarded (ms).
pub const FRAGMENT_TIMEOUT_MS: u64 = 5000;

/// How often the BLE task checks for stale fragments (ms).
pub const FRAGMENT_POLL_MS: u64 = 500;

/// Maximum number of messages waiting to be typed.
pub const QUEUE_CAPACITY: usize = 8;

/// Depth of the acknowledgement channel towards the BLE task.
pub const ACK_CHANNEL_DEPTH: usize = 4;

/// Idle poll interval of the typing task (ms).
pub const TYPING_POLL_MS: u64 = 10;

// Settings storage

/// Flash page index where settings storage starts (4 KB per page on nRF52840).
pub const STORAGE_FLASH_PAGE_START: u32 = 240;

/// Number of flash pages reserved for settings storage.
pub const STORAGE_FLASH_PAGE_COUNT: u32 = 4;

const fn hex_nibble(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => panic!("invalid hex digit in UUID"),
    }
}

/// Parse a dashed 128-bit UUID string into little-endian bytes.
const fn uuid_le_bytes(uuid: &str) -> [u8; 16] {
    let s = uuid.as_bytes();
    let mut out = [0u8; 16];
    let mut i = 0;
    let mut n = 0;
    while i < s.len() {
        if s[i] == b'-' {
            i += 1;
            continue;
        }
        assert!(n < 16, "UUID too long");
        out[15 - n] = hex_nibble(s[i]) << 4 | hex_nibble(s[i + 1]);
        n += 1;
        i += 2;
    }
    assert!(n == 16, "UUID too short");
    out
}
