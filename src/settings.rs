//! Runtime settings that survive a power cycle.
//!
//! Stored in the nRF52840's internal flash via `sequential-storage` map
//! storage, in the pages reserved by `memory.x`.
//!
//! Record layout (one map item under [`KEY_SETTINGS`]):
//! ```text
//! [0] format version
//! [1] typing speed (cps)
//! [2] IME toggle method
//! ```

use crate::config::{IME_TOGGLE, TYPING_SPEED_DEFAULT_CPS};
use crate::typing::clamp_speed;
use crate::typing::mode::ImeToggle;

/// Bumped whenever the record layout changes; older records are ignored.
pub const SETTINGS_VERSION: u8 = 1;

/// Serialized record size.
pub const SETTINGS_RECORD_LEN: usize = 3;

/// Map key of the settings record.
pub const KEY_SETTINGS: u8 = 0x01;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Settings {
    pub speed_cps: u8,
    pub ime_toggle: ImeToggle,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            speed_cps: TYPING_SPEED_DEFAULT_CPS,
            ime_toggle: IME_TOGGLE,
        }
    }
}

impl Settings {
    pub fn to_bytes(&self) -> [u8; SETTINGS_RECORD_LEN] {
        [SETTINGS_VERSION, self.speed_cps, self.ime_toggle as u8]
    }

    /// Parse a stored record. Unknown versions and short records yield
    /// `None`; out-of-range fields fall back to their defaults.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        let [version, speed, toggle, ..] = *data else {
            return None;
        };
        if version != SETTINGS_VERSION {
            return None;
        }
        Some(Self {
            speed_cps: clamp_speed(speed as u32),
            ime_toggle: ImeToggle::from_u8(toggle).unwrap_or(IME_TOGGLE),
        })
    }
}

#[cfg(feature = "embedded")]
mod flash {
    use super::*;
    use crate::config::{STORAGE_FLASH_PAGE_COUNT, STORAGE_FLASH_PAGE_START};
    use crate::error::Error;
    use embedded_storage_async::nor_flash::NorFlash;
    use sequential_storage::cache::NoCache;
    use sequential_storage::map::{fetch_item, store_item};

    /// Flash page size for nRF52840 (4 KB).
    const FLASH_PAGE_SIZE: u32 = 4096;

    const STORAGE_START: u32 = STORAGE_FLASH_PAGE_START * FLASH_PAGE_SIZE;
    const STORAGE_END: u32 = (STORAGE_FLASH_PAGE_START + STORAGE_FLASH_PAGE_COUNT) * FLASH_PAGE_SIZE;

    /// Scratch buffer for sequential-storage (item header + record, word aligned).
    const BUF_SIZE: usize = 32;

    impl Settings {
        /// Read settings from flash, falling back to defaults.
        pub async fn load(flash: &mut impl NorFlash) -> Self {
            let mut buf = [0u8; BUF_SIZE];
            match fetch_item::<u8, &[u8], _>(
                flash,
                STORAGE_START..STORAGE_END,
                &mut NoCache::new(),
                &mut buf,
                &KEY_SETTINGS,
            )
            .await
            {
                Ok(Some(data)) => match Settings::from_bytes(data) {
                    Some(settings) => {
                        info!("settings: loaded {}", settings);
                        settings
                    }
                    None => {
                        warn!("settings: unreadable record, using defaults");
                        Settings::default()
                    }
                },
                Ok(None) => {
                    info!("settings: none stored, using defaults");
                    Settings::default()
                }
                Err(e) => {
                    error!("settings: flash read error: {:?}", defmt::Debug2Format(&e));
                    Settings::default()
                }
            }
        }

        pub async fn save(&self, flash: &mut impl NorFlash) -> Result<(), Error> {
            let mut buf = [0u8; BUF_SIZE];
            let record = self.to_bytes();
            let item: &[u8] = &record;
            store_item::<u8, &[u8], _>(
                flash,
                STORAGE_START..STORAGE_END,
                &mut NoCache::new(),
                &mut buf,
                &KEY_SETTINGS,
                &item,
            )
            .await
            .map_err(|e| {
                error!("settings: flash write error: {:?}", defmt::Debug2Format(&e));
                Error::Storage
            })?;
            info!("settings: saved {}", self);
            Ok(())
        }
    }
}
