#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("cannot initialise the USB backend: {0}")]
    BackendInitFailed(#[source] rusb::Error),

    #[error("USB backend unavailable: {0}")]
    BackendUnavailable(#[source] rusb::Error),

    #[error("no device found")]
    NoMatch,

    #[error("no device selected (end of input)")]
    SelectionAborted,

    #[error("no device at position {0} in the current scan")]
    InvalidSelection(usize),

    #[error("device handle belongs to an earlier scan")]
    StaleHandle,

    #[error("couldn't open device: {0}")]
    OpenFailed(#[source] rusb::Error),

    #[error("{0}")]
    InvalidConfiguration(String),

    #[error("illegal voltage specified for {rail} ({}.{:03}V)", .millivolts / 1000, .millivolts % 1000)]
    IllegalVoltage { rail: &'static str, millivolts: u32 },

    #[error("{0} is not supported by the device protocol")]
    UnsupportedCommand(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::InvalidConfiguration(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voltage_message() {
        let e = Error::IllegalVoltage {
            rail: "TRef",
            millivolts: 3300,
        };
        assert_eq!(e.to_string(), "illegal voltage specified for TRef (3.300V)");
    }

    #[test]
    fn test_open_failed_keeps_source() {
        use std::error::Error as _;
        let e = Error::OpenFailed(rusb::Error::Access);
        assert!(e.source().is_some());
    }
}
