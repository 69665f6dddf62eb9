//! ghostype firmware - BLE text in, USB keystrokes out.
//!
//! Tasks:
//! - `softdevice_task`: SoftDevice event loop (+ USB VBUS events)
//! - `usb_task`: USB bus servicing
//! - `ble_task`: advertising, GATT server, fragment reassembly
//! - `typing_task`: pops messages and types them on the USB keyboard

#![no_std]
#![no_main]

mod ble;
mod usb;

use defmt::{info, unwrap, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_nrf::interrupt::{self, InterruptExt, Priority};
use embassy_nrf::usb::vbus_detect::SoftwareVbusDetect;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Delay, Instant, Timer};
use embassy_usb::class::hid::HidWriter;
use ghostype::config::{ACK_CHANNEL_DEPTH, TYPING_POLL_MS};
use ghostype::hid::keyboard::KEYBOARD_REPORT_SIZE;
use ghostype::hid::Keyboard;
use ghostype::settings::Settings;
use ghostype::typing::Clock;
use ghostype::{Ack, Shared, TypingService};
use nrf_softdevice::{Flash, Softdevice};
use panic_probe as _;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use static_cell::StaticCell;
use usb::hid_device::{UsbDriver, UsbReportSink};

/// Queue, speed and cancel flag shared by the BLE and typing tasks.
static SHARED: Shared = Shared::new();

/// Typing task → BLE task acknowledgements.
static ACKS: Channel<CriticalSectionRawMutex, Ack, ACK_CHANNEL_DEPTH> = Channel::new();

static SOFTWARE_VBUS: StaticCell<SoftwareVbusDetect> = StaticCell::new();
static SERVER: StaticCell<ble::gatt::GhostypeServer> = StaticCell::new();

struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("ghostype starting");

    // SoftDevice reserves priorities 0, 1 and 4.
    let mut nrf_config = embassy_nrf::config::Config::default();
    nrf_config.gpiote_interrupt_priority = Priority::P2;
    nrf_config.time_interrupt_priority = Priority::P2;
    interrupt::USBD.set_priority(Priority::P2);
    interrupt::CLOCK_POWER.set_priority(Priority::P2);
    let p = embassy_nrf::init(nrf_config);

    let sd = Softdevice::enable(&ble::softdevice_config());
    let server = SERVER.init(unwrap!(ble::gatt::init_server(sd)));
    let sd: &'static Softdevice = sd;

    let vbus = SOFTWARE_VBUS.init(SoftwareVbusDetect::new(true, true));
    unwrap!(spawner.spawn(ble::softdevice_task(sd, vbus)));

    let mut flash = Flash::take(sd);
    let settings = Settings::load(&mut flash).await;
    SHARED.speed().set(settings.speed_cps);
    info!("Typing speed {} cps, IME toggle {}", settings.speed_cps, settings.ime_toggle);

    let mut seed = [0u8; 32];
    unwrap!(nrf_softdevice::random_bytes(sd, &mut seed));
    let rng = ChaCha8Rng::from_seed(seed);

    let usb = usb::hid_device::init(p.USBD, vbus);
    unwrap!(spawner.spawn(usb_task(usb.device)));
    unwrap!(spawner.spawn(ble::ble_task(sd, server, &SHARED, ACKS.receiver())));
    unwrap!(spawner.spawn(typing_task(usb.keyboard_writer, rng, settings, flash)));

    info!("All tasks spawned");
}

#[embassy_executor::task]
async fn usb_task(device: embassy_usb::UsbDevice<'static, UsbDriver>) -> ! {
    usb::hid_device::run_usb_device(device).await
}

#[embassy_executor::task]
async fn typing_task(
    writer: HidWriter<'static, UsbDriver, KEYBOARD_REPORT_SIZE>,
    rng: ChaCha8Rng,
    mut settings: Settings,
    mut flash: Flash,
) -> ! {
    let mut keyboard = Keyboard::new(UsbReportSink::new(writer));
    let mut service = TypingService::new(&SHARED, rng, settings.ime_toggle);
    let mut delay = Delay;
    let clock = SystemClock;

    info!("Typing task started");

    loop {
        keyboard.sink_mut().ready().await;

        let Some(outcome) = service.run_next(&mut keyboard, &mut delay, &clock).await else {
            Timer::after_millis(TYPING_POLL_MS).await;
            continue;
        };

        let ack = outcome.ack();
        if ACKS.try_send(ack).is_err() {
            warn!("Ack channel full, dropping {}", ack.as_str());
        }

        if outcome.settings_changed() {
            settings.speed_cps = SHARED.speed().get();
            settings.ime_toggle = service.mode().toggle_method();
            if let Err(e) = settings.save(&mut flash).await {
                warn!("Settings not saved: {}", e);
            }
        }
    }
}
