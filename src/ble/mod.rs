//! Bluetooth Low Energy subsystem.
//!
//! This module drives the Nordic SoftDevice S140 in **Peripheral** role:
//!
//! 1. **Advertising** - connectable undirected advertising with the device
//!    name and the text service UUID.
//! 2. **GATT server** - the text service in [`gatt`]; RX writes go through
//!    the fragment reassembler into the shared typing queue.
//! 3. **Connection loop** - one central at a time. A ticker discards stale
//!    fragments and forwards acknowledgements from the typing task; a
//!    disconnect cancels whatever is still being typed.

pub mod gatt;

use core::cell::RefCell;
use core::mem;
use defmt::{error, info, warn};
use embassy_futures::select::{select, Either};
use embassy_nrf::usb::vbus_detect::SoftwareVbusDetect;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Receiver;
use embassy_time::{Duration, Instant, Ticker, Timer};
use gatt::{GhostypeServer, GhostypeServerEvent, TextServiceEvent};
use ghostype::config::{self, ACK_CHANNEL_DEPTH};
use ghostype::error::{BleError, Error};
use ghostype::protocol::FragmentReassembler;
use ghostype::{Ack, Shared};
use nrf_softdevice::ble::advertisement_builder::{
    Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload, ServiceList,
};
use nrf_softdevice::ble::{gatt_server, peripheral, Connection};
use nrf_softdevice::{raw, Config, Softdevice};

static ADV_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
    .full_name(config::BLE_DEVICE_NAME)
    .build();

static SCAN_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .services_128(ServiceList::Complete, &[config::BLE_SERVICE_UUID_LE])
    .build();

/// SoftDevice configuration: one peripheral link, large ATT MTU.
pub fn softdevice_config() -> Config {
    Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t {
            att_mtu: config::BLE_ATT_MTU,
        }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: config::BLE_DEVICE_NAME.as_ptr() as _,
            current_len: config::BLE_DEVICE_NAME.len() as u16,
            max_len: config::BLE_DEVICE_NAME.len() as u16,
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        conn_gatts: Some(raw::ble_gatts_conn_cfg_t {
            hvn_tx_queue_size: 4,
        }),
        ..Default::default()
    }
}

/// SoftDevice event loop. Also forwards USB power events to the USB driver,
/// since the SoftDevice owns the POWER peripheral.
#[embassy_executor::task]
pub async fn softdevice_task(sd: &'static Softdevice, vbus: &'static SoftwareVbusDetect) -> ! {
    use nrf_softdevice::SocEvent;

    unsafe {
        raw::sd_power_usbpwrrdy_enable(1);
        raw::sd_power_usbdetected_enable(1);
        raw::sd_power_usbremoved_enable(1);
    };

    // USB may already be plugged in before the events were enabled.
    let mut usb_reg: u32 = 0;
    unsafe { raw::sd_power_usbregstatus_get(&mut usb_reg) };
    if usb_reg & 1 == 1 {
        vbus.detected(true);
    }

    sd.run_with_callback(|event: SocEvent| match event {
        SocEvent::PowerUsbRemoved => vbus.detected(false),
        SocEvent::PowerUsbDetected => vbus.detected(true),
        SocEvent::PowerUsbPowerReady => vbus.ready(),
        _ => {}
    })
    .await
}

/// BLE main task: advertise, serve one central, repeat.
#[embassy_executor::task]
pub async fn ble_task(
    sd: &'static Softdevice,
    server: &'static GhostypeServer,
    shared: &'static Shared,
    acks: Receiver<'static, CriticalSectionRawMutex, Ack, ACK_CHANNEL_DEPTH>,
) -> ! {
    info!("BLE task started");

    let adv_config = peripheral::Config {
        interval: config::BLE_ADV_INTERVAL,
        ..Default::default()
    };

    loop {
        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &ADV_DATA,
            scan_data: &SCAN_DATA,
        };
        info!("BLE advertising as {}", config::BLE_DEVICE_NAME);
        let conn = match peripheral::advertise_connectable(sd, adv, &adv_config)
            .await
            .map_err(|e| {
                error!("Advertising failed: {:?}", e);
                Error::Ble(BleError::AdvertiseFailed)
            }) {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Retrying advertising after {}", e);
                Timer::after_millis(100).await;
                continue;
            }
        };
        info!("Central connected");

        request_conn_params(&conn);

        // Acks left over from the previous link are stale.
        while acks.try_receive().is_ok() {}

        serve(&conn, server, shared, &acks).await;

        info!("Central disconnected - cancelling pending typing");
        shared.cancel_all();
    }
}

/// Run the GATT server until the central disconnects.
async fn serve(
    conn: &Connection,
    server: &GhostypeServer,
    shared: &Shared,
    acks: &Receiver<'static, CriticalSectionRawMutex, Ack, ACK_CHANNEL_DEPTH>,
) {
    let reassembler = RefCell::new(FragmentReassembler::new());

    let gatt_fut = gatt_server::run(conn, server, |event| match event {
        GhostypeServerEvent::Text(TextServiceEvent::RxWrite(chunk)) => {
            let now = Instant::now().as_millis();
            let ack = gatt::on_rx_write(&mut reassembler.borrow_mut(), shared, &chunk, now);
            if let Some(ack) = ack {
                let _ = gatt::notify_ack(conn, server, ack);
            }
        }
        GhostypeServerEvent::Text(TextServiceEvent::TxCccdWrite { notifications }) => {
            info!("Ack notifications enabled: {}", notifications);
        }
    });

    let housekeeping_fut = async {
        let mut ticker = Ticker::every(Duration::from_millis(config::FRAGMENT_POLL_MS));
        loop {
            match select(ticker.next(), acks.receive()).await {
                Either::First(()) => {
                    let now = Instant::now().as_millis();
                    if reassembler.borrow_mut().poll_timeout(now) {
                        warn!("Partial message timed out");
                        let _ = gatt::notify_ack(conn, server, Ack::FragmentDropped);
                    }
                }
                Either::Second(ack) => {
                    let _ = gatt::notify_ack(conn, server, ack);
                }
            }
        }
    };

    match select(gatt_fut, housekeeping_fut).await {
        Either::First(e) => info!("GATT server stopped: {:?}", e),
        Either::Second(_) => {}
    }
}

fn request_conn_params(conn: &Connection) {
    let params = raw::ble_gap_conn_params_t {
        min_conn_interval: config::BLE_CONN_INTERVAL_MIN,
        max_conn_interval: config::BLE_CONN_INTERVAL_MAX,
        slave_latency: config::BLE_SLAVE_LATENCY,
        conn_sup_timeout: config::BLE_SUP_TIMEOUT,
    };
    if let Err(e) = conn.set_conn_params(params) {
        warn!("Connection parameter update rejected: {:?}", e);
    }
}
