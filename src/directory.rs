use crate::backend::{Backend, Handle};
use crate::descriptor::{DeviceDescriptor, ScanHandle};
use crate::known;

/// Matched probes from the most recent scan, in directory order.
#[derive(Debug, Default, Clone)]
pub struct DeviceDirectory {
    entries: Vec<DeviceDescriptor>,
    generation: u64,
}

impl DeviceDirectory {
    /// Builds the directory for `snapshot`, which the backend produced for scan number
    /// `generation`. Devices that can't be identified or opened are left out, never reported.
    pub(crate) fn build<B: Backend>(
        backend: &B,
        snapshot: &[B::Device],
        generation: u64,
        serial_filter: Option<&str>,
    ) -> Self {
        let mut entries = Vec::new();
        for (index, device) in snapshot.iter().enumerate() {
            let ids = match backend.identify(device) {
                Ok(ids) => ids,
                Err(e) => {
                    log::trace!("skipping device {}: no device descriptor ({})", index, e);
                    continue;
                }
            };
            if !known::is_known(ids.vendor_id, ids.product_id) {
                continue;
            }

            let handle = match backend.open(device) {
                Ok(h) => h,
                Err(e) => {
                    log::debug!(
                        "skipping {:04x}:{:04x} at {:03}/{:03}: cannot open ({})",
                        ids.vendor_id,
                        ids.product_id,
                        ids.bus,
                        ids.address,
                        e
                    );
                    continue;
                }
            };

            let serial = read_optional(&handle, ids.serial_index);
            if !serial_matches(serial.as_deref(), serial_filter) {
                log::debug!(
                    "{:04x}:{:04x} serial {:?} doesn't match filter",
                    ids.vendor_id,
                    ids.product_id,
                    serial
                );
                continue; // handle is dropped, closing the device
            }

            entries.push(DeviceDescriptor::new(
                read_optional(&handle, ids.manufacturer_index),
                read_optional(&handle, ids.product_index),
                serial,
                ids.vendor_id,
                ids.product_id,
                ids.bus,
                ids.address,
                ScanHandle { generation, index },
            ));
        }

        // the backend enumerates in no particular order, numbering shown to the operator must not
        // depend on it
        entries.sort_by(|a, b| a.directory_order(b));

        Self {
            entries,
            generation,
        }
    }

    /// Drops all descriptors. Calling it on an empty directory does nothing.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DeviceDescriptor> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DeviceDescriptor> {
        self.entries.iter()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl<'a> IntoIterator for &'a DeviceDirectory {
    type Item = &'a DeviceDescriptor;
    type IntoIter = std::slice::Iter<'a, DeviceDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Without a filter everything matches. With one, the device needs a non-empty serial number
/// containing it.
pub fn serial_matches(serial: Option<&str>, filter: Option<&str>) -> bool {
    match (filter, serial) {
        (None, _) => true,
        (Some(f), Some(s)) => !s.is_empty() && s.contains(f),
        (Some(_), None) => false,
    }
}

fn read_optional(handle: &impl Handle, index: Option<u8>) -> Option<String> {
    let index = index?;
    match handle.read_string(index) {
        Ok(s) => Some(s),
        Err(e) => {
            log::debug!("cannot read string descriptor {}: {}", index, e);
            None
        }
    }
}
