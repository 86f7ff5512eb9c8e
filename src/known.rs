/// A probe model this crate knows how to talk to.
#[derive(Debug, PartialEq, Eq)]
pub struct KnownDevice {
    pub vendor_id: u16,
    pub product_id: u16,
    pub model: &'static str,
    /// Interface claimed for exclusive use when the device is opened.
    pub interface: u8,
    /// Target voltages (TPwr/TRef) the model can generate, in millivolts. 0 switches the rail off.
    pub voltages_mv: &'static [u32],
}

impl KnownDevice {
    pub fn supports_voltage(&self, millivolts: u32) -> bool {
        self.voltages_mv.contains(&millivolts)
    }
}

// ORBTrace probes can enumerate with more than one USB VID+PID combination
pub const KNOWN_DEVICES: [KnownDevice; 2] = [
    KnownDevice {
        vendor_id: 0x1209,
        product_id: 0x3443,
        model: "ORBTrace mini",
        interface: 0,
        voltages_mv: &[0, 1800, 2500, 3000, 3300, 5000],
    },
    KnownDevice {
        vendor_id: 0x046d,
        product_id: 0x0892,
        model: "ORBTrace (development)",
        interface: 0,
        voltages_mv: &[0, 1800, 3300],
    },
];

pub fn lookup(vendor_id: u16, product_id: u16) -> Option<&'static KnownDevice> {
    KNOWN_DEVICES
        .iter()
        .find(|d| d.vendor_id == vendor_id && d.product_id == product_id)
}

#[inline]
pub fn is_known(vendor_id: u16, product_id: u16) -> bool {
    lookup(vendor_id, product_id).is_some()
}

/// True if at least one known model can generate `millivolts`. Used before any device is selected.
pub fn any_supports_voltage(millivolts: u32) -> bool {
    KNOWN_DEVICES.iter().any(|d| d.supports_voltage(millivolts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_pairs() {
        assert!(is_known(0x1209, 0x3443));
        assert!(is_known(0x046d, 0x0892));
    }

    #[test]
    fn test_unknown_pairs() {
        // halves of valid pairs must not match each other
        assert!(!is_known(0x1209, 0x0892));
        assert!(!is_known(0x046d, 0x3443));
        assert!(!is_known(0x0403, 0xc631));
        assert!(!is_known(0, 0));
    }

    #[test]
    fn test_voltages() {
        let mini = lookup(0x1209, 0x3443).unwrap();
        assert!(mini.supports_voltage(3300));
        assert!(mini.supports_voltage(0));
        assert!(!mini.supports_voltage(3301));
        assert!(any_supports_voltage(5000));
        assert!(!any_supports_voltage(12000));
    }
}
