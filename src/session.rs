use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::backend::{Backend, Handle, LibUsb};
use crate::known::{self, KnownDevice};
use crate::{Command, DeviceDescriptor, DeviceDirectory, Error, Result};

/// A probe claimed for exclusive use.
pub struct OpenDevice<H: Handle> {
    handle: H,
    descriptor: DeviceDescriptor,
    model: &'static KnownDevice,
}

impl<H: Handle> OpenDevice<H> {
    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    pub fn model(&self) -> &'static KnownDevice {
        self.model
    }

    /// Whether this probe model can drive a target rail at `millivolts`.
    pub fn validate_voltage(&self, millivolts: u32) -> bool {
        self.model.supports_voltage(millivolts)
    }

    /// Applies `command` to the probe.
    ///
    /// The probes' control requests for parameters, locking and measurements are not part of any
    /// published interface, so every command currently fails with [`Error::UnsupportedCommand`]
    /// and leaves the device untouched.
    pub fn execute(&mut self, command: &Command) -> Result<()> {
        log::debug!("{} on {}", command.name(), self.descriptor.serial());
        Err(Error::UnsupportedCommand(command.name()))
    }

    fn release(mut self) {
        if let Err(e) = self.handle.release_interface(self.model.interface) {
            log::warn!(
                "couldn't release interface {} of {}: {}",
                self.model.interface,
                self.descriptor.serial(),
                e
            );
        }
        // dropping the handle closes the device
    }
}

/// Owns the USB backend, the raw device list of the latest scan, the directory built from it and
/// the device currently opened, if any.
pub struct DiscoverySession<B: Backend = LibUsb> {
    backend: B,
    snapshot: Vec<B::Device>,
    directory: DeviceDirectory,
    generation: u64,
    opened: Option<OpenDevice<B::Handle>>,
}

impl DiscoverySession<LibUsb> {
    /// Session on a fresh libusb context with libusb's own logging off.
    pub fn new() -> Result<Self> {
        Self::with_usb_log_level(rusb::LogLevel::None)
    }

    pub fn with_usb_log_level(level: rusb::LogLevel) -> Result<Self> {
        let backend = LibUsb::new(level).map_err(Error::BackendInitFailed)?;
        Ok(Self::with_backend(backend))
    }
}

impl<B: Backend> DiscoverySession<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            snapshot: Vec::new(),
            directory: DeviceDirectory::default(),
            generation: 0,
            opened: None,
        }
    }

    /// Rebuilds the directory from a fresh enumeration and returns the number of matches.
    ///
    /// Everything from the previous scan is released first, including an opened device, since
    /// its position in the old snapshot no longer means anything.
    pub fn scan(&mut self, serial_filter: Option<&str>) -> Result<usize> {
        self.close();
        self.directory.clear();
        self.snapshot.clear();
        self.generation += 1;

        self.snapshot = self
            .backend
            .enumerate()
            .map_err(Error::BackendUnavailable)?;
        self.directory =
            DeviceDirectory::build(&self.backend, &self.snapshot, self.generation, serial_filter);

        log::info!(
            "scan {}: {} of {} USB devices matched",
            self.generation,
            self.directory.len(),
            self.snapshot.len()
        );
        Ok(self.directory.len())
    }

    pub fn directory(&self) -> &DeviceDirectory {
        &self.directory
    }

    /// Opens the device at `index` of the current directory.
    pub fn open(&mut self, index: usize) -> Result<&mut OpenDevice<B::Handle>> {
        let descriptor = self
            .directory
            .get(index)
            .cloned()
            .ok_or(Error::InvalidSelection(index))?;
        self.open_descriptor(&descriptor)
    }

    /// Opens the device `descriptor` was built for. It has to come from the latest scan.
    pub fn open_descriptor(
        &mut self,
        descriptor: &DeviceDescriptor,
    ) -> Result<&mut OpenDevice<B::Handle>> {
        let scan = descriptor.handle();
        if scan.generation != self.generation || scan.index >= self.snapshot.len() {
            return Err(Error::StaleHandle);
        }
        // the directory only ever holds known devices
        let model = known::lookup(descriptor.vendor_id(), descriptor.product_id())
            .ok_or(Error::StaleHandle)?;

        self.close();

        let mut handle = self
            .backend
            .open(&self.snapshot[scan.index])
            .map_err(Error::OpenFailed)?;
        handle
            .claim_interface(model.interface)
            .map_err(Error::OpenFailed)?;
        log::info!(
            "opened {} [{} {}, S/N {}]",
            model.model,
            descriptor.manufacturer(),
            descriptor.product(),
            descriptor.serial()
        );

        Ok(self.opened.insert(OpenDevice {
            handle,
            descriptor: descriptor.clone(),
            model,
        }))
    }

    pub fn opened(&mut self) -> Option<&mut OpenDevice<B::Handle>> {
        self.opened.as_mut()
    }

    /// Releases the opened device. Does nothing when none is open.
    pub fn close(&mut self) {
        if let Some(device) = self.opened.take() {
            log::debug!("closing {}", device.descriptor.serial());
            device.release();
        }
    }

    /// Closes any device and releases the backend.
    pub fn destroy(self) {
        drop(self)
    }
}

impl<B: Backend> Drop for DiscoverySession<B> {
    fn drop(&mut self) {
        self.close();
        self.directory.clear();
    }
}

/// Session slot shared between the main flow and an interrupt handler.
pub type SharedSession<B = LibUsb> = Mutex<Option<DiscoverySession<B>>>;

/// Locks `shared` and destroys the session in it, if there is one.
///
/// The lock is returned still held, so nobody else gets at the slot while the caller finishes
/// (typically by exiting the process). A poisoned lock is taken over.
pub fn teardown<B: Backend>(
    shared: &SharedSession<B>,
) -> MutexGuard<'_, Option<DiscoverySession<B>>> {
    let mut slot = shared.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(session) = slot.take() {
        log::debug!("tearing down session after scan {}", session.generation);
        session.destroy();
    }
    slot
}
