//! Finds ORBTrace debug probes on USB and picks the one to work with.
//!
//! A [`DiscoverySession`] scans the bus for known probes and keeps them in a [`DeviceDirectory`]
//! with stable numbering. [`resolve`] narrows that down to a single device, asking the operator
//! only if several remain, and the session then opens it for exclusive use.

mod backend;
mod config;
mod descriptor;
mod directory;
mod error;
pub mod known;
mod resolver;
mod session;


pub use backend::{Backend, DeviceIds, Handle, LibUsb, LibUsbHandle};
pub use config::{
    parse_brightness, parse_voltage, Command, Config, Query, Reading, TraceWidth,
};
pub use descriptor::{DeviceDescriptor, ScanHandle};
pub use directory::{serial_matches, DeviceDirectory};
pub use error::*;
pub use resolver::{resolve, write_json, write_table};
pub use session::{teardown, DiscoverySession, OpenDevice, SharedSession};
pub use rusb;

/// Maps `-v` levels to libusb's own log output, for [`DiscoverySession::with_usb_log_level`].
pub fn usb_log_level(verbosity: u8) -> rusb::LogLevel {
    match verbosity {
        0 => rusb::LogLevel::None,
        1 => rusb::LogLevel::Warning,
        2 => rusb::LogLevel::Info,
        _ => rusb::LogLevel::Debug,
    }
}
