use rusb::{Context, Device, DeviceHandle, UsbContext};

/// Identity of a native device that can be read without opening it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceIds {
    pub vendor_id: u16,
    pub product_id: u16,
    pub bus: u8,
    pub address: u8,
    pub manufacturer_index: Option<u8>,
    pub product_index: Option<u8>,
    pub serial_index: Option<u8>,
}

/// The operations discovery needs from a USB stack. Implemented by `LibUsb` and, in tests, by
/// `MockBackend`. Handles are closed when dropped.
pub trait Backend {
    type Device;
    type Handle: Handle;

    /// Takes a fresh snapshot of the attached devices.
    fn enumerate(&self) -> rusb::Result<Vec<Self::Device>>;

    fn identify(&self, device: &Self::Device) -> rusb::Result<DeviceIds>;

    fn open(&self, device: &Self::Device) -> rusb::Result<Self::Handle>;
}

pub trait Handle {
    fn read_string(&self, index: u8) -> rusb::Result<String>;

    fn claim_interface(&mut self, interface: u8) -> rusb::Result<()>;

    fn release_interface(&mut self, interface: u8) -> rusb::Result<()>;
}

/// libusb backend. Owns its own context rather than the global one, so dropping the session
/// releases it.
pub struct LibUsb {
    context: Context,
}

impl LibUsb {
    /// Creates the context and sets libusb's own log output for it.
    pub fn new(log_level: rusb::LogLevel) -> rusb::Result<Self> {
        let mut context = Context::new()?;
        context.set_log_level(log_level);
        Ok(Self { context })
    }
}

impl Backend for LibUsb {
    type Device = Device<Context>;
    type Handle = LibUsbHandle;

    fn enumerate(&self) -> rusb::Result<Vec<Self::Device>> {
        Ok(self.context.devices()?.iter().collect())
    }

    fn identify(&self, device: &Self::Device) -> rusb::Result<DeviceIds> {
        let desc = device.device_descriptor()?;
        Ok(DeviceIds {
            vendor_id: desc.vendor_id(),
            product_id: desc.product_id(),
            bus: device.bus_number(),
            address: device.address(),
            manufacturer_index: desc.manufacturer_string_index(),
            product_index: desc.product_string_index(),
            serial_index: desc.serial_number_string_index(),
        })
    }

    fn open(&self, device: &Self::Device) -> rusb::Result<Self::Handle> {
        Ok(LibUsbHandle {
            handle: device.open()?,
        })
    }
}

pub struct LibUsbHandle {
    handle: DeviceHandle<Context>,
}

impl Handle for LibUsbHandle {
    #[inline]
    fn read_string(&self, index: u8) -> rusb::Result<String> {
        self.handle
            .read_string_descriptor_ascii(index)
            .map(|s| s.trim_end_matches('\0').to_string())
    }

    fn claim_interface(&mut self, interface: u8) -> rusb::Result<()> {
        // not available on every platform, claiming still works where a kernel driver isn't bound
        if let Err(e) = self.handle.set_auto_detach_kernel_driver(true) {
            log::debug!("kernel driver auto-detach unavailable: {}", e);
        }
        self.handle.claim_interface(interface)
    }

    #[inline]
    fn release_interface(&mut self, interface: u8) -> rusb::Result<()> {
        self.handle.release_interface(interface)
    }
}
