//! USB Device subsystem - presents a boot keyboard to the host.
//!
//! The nRF52840's built-in USB 2.0 Full-Speed controller is driven by
//! `embassy-usb`. The typing task owns the keyboard writer through
//! [`hid_device::UsbReportSink`]; the USB task only services the bus.

pub mod hid_device;
