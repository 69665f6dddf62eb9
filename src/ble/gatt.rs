//! GATT server exposing the text service.
//!
//! A Nordic-UART-style pair of characteristics: the central writes text
//! fragments into `rx`, the dongle notifies status lines on `tx`.

use defmt::{debug, info, warn};
use ghostype::config::BLE_CHUNK_MAX;
use ghostype::error::{BleError, Error};
use ghostype::protocol::FragmentReassembler;
use ghostype::Ack;
use ghostype::Shared;
use heapless::Vec;
use nrf_softdevice::ble::{gatt_server, Connection};
use nrf_softdevice::Softdevice;

/// Text service; the service UUID is `config::BLE_SERVICE_UUID`, and the
/// characteristics share its base.
#[nrf_softdevice::gatt_service(uuid = "6e400001-b5a3-f393-e0a9-e50e24dcca9e")]
pub struct TextService {
    /// Central → dongle text fragments.
    #[characteristic(uuid = "6e400002-b5a3-f393-e0a9-e50e24dcca9e", write, write_without_response)]
    pub rx: Vec<u8, BLE_CHUNK_MAX>,

    /// Dongle → central acknowledgements.
    #[characteristic(uuid = "6e400003-b5a3-f393-e0a9-e50e24dcca9e", read, notify)]
    pub tx: Vec<u8, BLE_CHUNK_MAX>,
}

#[nrf_softdevice::gatt_server]
pub struct GhostypeServer {
    pub text: TextService,
}

/// Register the GATT table with the SoftDevice.
pub fn init_server(sd: &mut Softdevice) -> Result<GhostypeServer, Error> {
    GhostypeServer::new(sd).map_err(|e| {
        defmt::error!("GATT server registration failed: {:?}", e);
        Error::Ble(BleError::ServerFailed)
    })
}

/// Feed one RX write into the reassembler and queue what completes.
pub fn on_rx_write(
    reassembler: &mut FragmentReassembler,
    shared: &Shared,
    chunk: &[u8],
    now_ms: u64,
) -> Option<Ack> {
    debug!("BLE rx: {} bytes", chunk.len());
    let feed = reassembler.feed(chunk, now_ms);
    shared.receive(feed)
}

/// Send `ack` to the central on the TX characteristic.
pub fn notify_ack(conn: &Connection, server: &GhostypeServer, ack: Ack) -> Result<(), Error> {
    let mut value: Vec<u8, BLE_CHUNK_MAX> = Vec::new();
    // Ack strings are far shorter than one ATT payload.
    let _ = value.extend_from_slice(ack.as_bytes());
    if let Err(e) = server.text.tx_set(&value) {
        warn!("TX value update failed: {:?}", e);
    }
    gatt_server::notify_value(conn, server.text.tx_value_handle, &value).map_err(|e| {
        warn!("Ack notify failed ({}): {:?}", ack.as_str(), e);
        Error::Ble(BleError::NotifyFailed)
    })?;
    info!("Ack sent: {}", ack.as_str());
    Ok(())
}
