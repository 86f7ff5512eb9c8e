use serde::Serialize;
use std::cmp::Ordering;

/// Position of a device in the backend snapshot taken by one particular scan. Only usable with
/// the session while that scan is still the latest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanHandle {
    pub(crate) generation: u64,
    pub(crate) index: usize,
}

/// Identity of one matched probe. Built during a scan and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceDescriptor {
    manufacturer: Option<String>,
    product: Option<String>,
    serial: Option<String>,
    #[serde(rename = "vid")]
    vendor_id: u16,
    #[serde(rename = "pid")]
    product_id: u16,
    #[serde(skip)]
    bus: u8,
    #[serde(skip)]
    address: u8,
    #[serde(skip)]
    handle: ScanHandle,
}

impl DeviceDescriptor {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        manufacturer: Option<String>,
        product: Option<String>,
        serial: Option<String>,
        vendor_id: u16,
        product_id: u16,
        bus: u8,
        address: u8,
        handle: ScanHandle,
    ) -> Self {
        Self {
            manufacturer,
            product,
            serial,
            vendor_id,
            product_id,
            bus,
            address,
            handle,
        }
    }

    pub fn manufacturer(&self) -> &str {
        self.manufacturer.as_deref().unwrap_or("")
    }

    pub fn product(&self) -> &str {
        self.product.as_deref().unwrap_or("")
    }

    pub fn serial(&self) -> &str {
        self.serial.as_deref().unwrap_or("")
    }

    pub fn has_serial(&self) -> bool {
        self.serial.is_some()
    }

    pub fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    pub fn product_id(&self) -> u16 {
        self.product_id
    }

    /// Bus number and device address.
    pub fn location(&self) -> (u8, u8) {
        (self.bus, self.address)
    }

    pub fn handle(&self) -> ScanHandle {
        self.handle
    }

    /// Directory ordering. `Option` orders `None` first, so a missing string sorts before any
    /// present one. Bus and address only separate otherwise identical devices.
    pub(crate) fn directory_order(&self, other: &Self) -> Ordering {
        #[allow(clippy::type_complexity)]
        fn key(
            d: &DeviceDescriptor,
        ) -> (Option<&str>, Option<&str>, Option<&str>, u16, u16, u8, u8) {
            (
                d.manufacturer.as_deref(),
                d.product.as_deref(),
                d.serial.as_deref(),
                d.vendor_id,
                d.product_id,
                d.bus,
                d.address,
            )
        }
        key(self).cmp(&key(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(
        manufacturer: Option<&str>,
        product: Option<&str>,
        serial: &str,
    ) -> DeviceDescriptor {
        DeviceDescriptor::new(
            manufacturer.map(String::from),
            product.map(String::from),
            Some(serial.into()),
            0x1209,
            0x3443,
            1,
            2,
            ScanHandle {
                generation: 1,
                index: 0,
            },
        )
    }

    #[test]
    fn test_absent_sorts_first() {
        let named = descriptor(Some("Orbtrace"), Some("probe"), "1");
        let unnamed = descriptor(None, Some("probe"), "1");
        assert_eq!(unnamed.directory_order(&named), Ordering::Less);
        assert_eq!(named.directory_order(&unnamed), Ordering::Greater);

        // absent is distinct from empty
        let empty = descriptor(Some(""), Some("probe"), "1");
        assert_eq!(unnamed.directory_order(&empty), Ordering::Less);
    }

    #[test]
    fn test_field_precedence() {
        let a = descriptor(Some("A"), Some("z"), "z");
        let b = descriptor(Some("B"), Some("a"), "a");
        assert_eq!(a.directory_order(&b), Ordering::Less);

        let a = descriptor(Some("A"), Some("p"), "BB22");
        let b = descriptor(Some("A"), Some("p"), "AA11");
        assert_eq!(a.directory_order(&b), Ordering::Greater);
    }

    #[test]
    fn test_sort_by_directory_order() {
        let mut list = vec![
            descriptor(Some("B"), Some("p"), "1"),
            descriptor(None, Some("p"), "9"),
            descriptor(Some("A"), Some("q"), "2"),
            descriptor(Some("A"), Some("p"), "3"),
        ];
        list.sort_by(|a, b| a.directory_order(b));
        let serials: Vec<&str> = list.iter().map(|d| d.serial()).collect();
        assert_eq!(serials, ["9", "3", "2", "1"]);
        assert_eq!(list[0].directory_order(&list[0]), Ordering::Equal);
    }

    #[test]
    fn test_accessors_default_to_empty() {
        let d = DeviceDescriptor::new(
            None,
            None,
            None,
            0x046d,
            0x0892,
            0,
            0,
            ScanHandle {
                generation: 0,
                index: 3,
            },
        );
        assert_eq!(d.manufacturer(), "");
        assert_eq!(d.product(), "");
        assert_eq!(d.serial(), "");
        assert!(!d.has_serial());
    }

    #[test]
    fn test_json_fields() {
        let d = descriptor(Some("Orbtrace"), Some("probe-A"), "AA11");
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "manufacturer": "Orbtrace",
                "product": "probe-A",
                "serial": "AA11",
                "vid": 0x1209,
                "pid": 0x3443,
            })
        );
    }
}
