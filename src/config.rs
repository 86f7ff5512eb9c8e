use std::fmt;
use std::str::FromStr;

use crate::{known, Error, Result};

const MAX_NICKNAME: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceWidth {
    One = 1,
    Two = 2,
    Four = 4,
}

impl FromStr for TraceWidth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "1" => Ok(TraceWidth::One),
            "2" => Ok(TraceWidth::Two),
            "4" => Ok(TraceWidth::Four),
            _ => Err(Error::config("illegal trace port width, use 1, 2 or 4")),
        }
    }
}

impl fmt::Display for TraceWidth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

/// Parses a voltage in volts (`"3.3"`) to millivolts, rounding to the nearest millivolt.
pub fn parse_voltage(s: &str) -> Result<u32> {
    let volts: f32 = s
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("'{}' is not a voltage", s)))?;
    if !volts.is_finite() || volts < 0.0 {
        return Err(Error::config(format!("'{}' is not a voltage", s)));
    }
    Ok(((volts + 0.0005) * 1000.0) as u32)
}

pub fn parse_brightness(s: &str) -> Result<u8> {
    s.trim()
        .parse::<i64>()
        .ok()
        .and_then(|b| u8::try_from(b).ok())
        .ok_or_else(|| Error::config("brightness setting out of range (0..255)"))
}

/// A measurement the probe can report about the target rails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    TargetPowerVoltage,
    TargetPowerCurrent,
    TargetReferenceVoltage,
    TargetReferenceCurrent,
}

impl Reading {
    pub const ALL: [Reading; 4] = [
        Reading::TargetPowerVoltage,
        Reading::TargetPowerCurrent,
        Reading::TargetReferenceVoltage,
        Reading::TargetReferenceCurrent,
    ];

    fn from_letter(c: char) -> Option<Self> {
        match c {
            'p' => Some(Reading::TargetPowerVoltage),
            'P' => Some(Reading::TargetPowerCurrent),
            'r' => Some(Reading::TargetReferenceVoltage),
            'R' => Some(Reading::TargetReferenceCurrent),
            _ => None,
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Reading::TargetPowerVoltage => "VPwr",
            Reading::TargetPowerCurrent => "IPwr",
            Reading::TargetReferenceVoltage => "VRef",
            Reading::TargetReferenceCurrent => "IRef",
        })
    }
}

/// Readings to fetch from the probe, in the order asked for and without repeats.
///
/// Parsed from letters: `p` VPwr, `P` IPwr, `r` VRef, `R` IRef.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(Vec<Reading>);

impl Query {
    pub fn all() -> Self {
        Query(Reading::ALL.to_vec())
    }

    pub fn readings(&self) -> &[Reading] {
        &self.0
    }
}

impl FromStr for Query {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut readings = Vec::new();
        for c in s.trim().chars() {
            let reading = Reading::from_letter(c).ok_or_else(|| {
                Error::config(format!("unknown query '{}', use any of pPrR", c))
            })?;
            if !readings.contains(&reading) {
                readings.push(reading);
            }
        }
        if readings.is_empty() {
            return Err(Error::config("nothing to query, use any of pPrR"));
        }
        Ok(Query(readings))
    }
}

/// A request for the selected device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetBrightness(u8),
    SetTraceWidth(TraceWidth),
    SetTargetPower(u32),
    SetTargetReference(u32),
    SetNickname(String),
    Lock,
    Unlock,
    ResetParams,
    WriteParams,
    Query(Query),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetBrightness(_) => "setting LED brightness",
            Command::SetTraceWidth(_) => "setting trace width",
            Command::SetTargetPower(_) => "setting TPwr voltage",
            Command::SetTargetReference(_) => "setting TRef voltage",
            Command::SetNickname(_) => "setting nickname",
            Command::Lock => "locking",
            Command::Unlock => "unlocking",
            Command::ResetParams => "resetting NVRAM parameters",
            Command::WriteParams => "writing NVRAM parameters",
            Command::Query(_) => "querying",
        }
    }
}

/// Everything the front end asks for, checked with [`Config::validate`] before discovery.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Any part of the serial number of the wanted probe.
    pub serial_filter: Option<String>,
    pub list_only: bool,
    pub json: bool,
    pub brightness: Option<u8>,
    pub trace_width: Option<TraceWidth>,
    pub tpwr_mv: Option<u32>,
    pub tref_mv: Option<u32>,
    pub nickname: Option<String>,
    pub write_params: bool,
    pub reset_params: bool,
    pub lock: bool,
    pub unlock: bool,
    /// Readings to report once any changes are applied.
    pub query: Option<Query>,
    /// Skip checking voltages against what the probe model supports.
    pub force_voltage: bool,
}

impl Config {
    fn value_settings(&self) -> usize {
        [
            self.brightness.is_some(),
            self.trace_width.is_some(),
            self.tpwr_mv.is_some(),
            self.tref_mv.is_some(),
            self.nickname.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    /// Commands for the selected device, in the order they are to be applied.
    pub fn commands(&self) -> Vec<Command> {
        let mut commands = Vec::new();
        if self.reset_params {
            commands.push(Command::ResetParams);
        }
        if self.unlock {
            commands.push(Command::Unlock);
        }
        if let Some(b) = self.brightness {
            commands.push(Command::SetBrightness(b));
        }
        if let Some(w) = self.trace_width {
            commands.push(Command::SetTraceWidth(w));
        }
        if let Some(mv) = self.tpwr_mv {
            commands.push(Command::SetTargetPower(mv));
        }
        if let Some(mv) = self.tref_mv {
            commands.push(Command::SetTargetReference(mv));
        }
        if let Some(nick) = &self.nickname {
            commands.push(Command::SetNickname(nick.clone()));
        }
        if self.write_params {
            commands.push(Command::WriteParams);
        }
        if self.lock {
            commands.push(Command::Lock);
        }
        if let Some(query) = &self.query {
            commands.push(Command::Query(query.clone()));
        }
        commands
    }

    pub fn validate(&self) -> Result<()> {
        if self.value_settings() > 0 && self.reset_params {
            return Err(Error::config(
                "cannot set a parameter while resetting all parameters",
            ));
        }
        // listing never opens a device, so any command would silently do nothing
        if self.list_only && !self.commands().is_empty() {
            return Err(Error::config(
                "cannot list devices while sending commands to a device",
            ));
        }
        if self.lock && self.unlock {
            return Err(Error::config("cannot lock and unlock a device at the same time"));
        }
        if let Some(nick) = &self.nickname {
            if nick.chars().count() > MAX_NICKNAME {
                return Err(Error::config(format!(
                    "nickname '{}' is longer than {} characters",
                    nick, MAX_NICKNAME
                )));
            }
        }
        // no device yet, so only reject what no probe can do
        self.check_voltages(known::any_supports_voltage)
    }

    /// Checks the requested rail voltages with `supported`, unless forced.
    pub fn check_voltages(&self, supported: impl Fn(u32) -> bool) -> Result<()> {
        if self.force_voltage {
            return Ok(());
        }
        for (rail, mv) in [("TRef", self.tref_mv), ("TPwr", self.tpwr_mv)] {
            if let Some(millivolts) = mv {
                if !supported(millivolts) {
                    return Err(Error::IllegalVoltage { rail, millivolts });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_voltage() {
        assert_eq!(parse_voltage("3.3").unwrap(), 3300);
        assert_eq!(parse_voltage("1.8").unwrap(), 1800);
        assert_eq!(parse_voltage("0").unwrap(), 0);
        assert_eq!(parse_voltage("5").unwrap(), 5000);
        assert!(parse_voltage("-1").is_err());
        assert!(parse_voltage("volts").is_err());
        assert!(parse_voltage("inf").is_err());
    }

    #[test]
    fn test_parse_brightness() {
        assert_eq!(parse_brightness("0").unwrap(), 0);
        assert_eq!(parse_brightness("255").unwrap(), 255);
        assert!(matches!(
            parse_brightness("256"),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(parse_brightness("-1").is_err());
    }

    #[test]
    fn test_trace_width() {
        assert_eq!("4".parse::<TraceWidth>().unwrap(), TraceWidth::Four);
        assert_eq!(TraceWidth::Two.to_string(), "2");
        assert!("3".parse::<TraceWidth>().is_err());
        assert!("0".parse::<TraceWidth>().is_err());
    }

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert!(config.commands().is_empty());
    }

    #[test]
    fn test_set_while_reset() {
        let config = Config {
            brightness: Some(10),
            reset_params: true,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfiguration(_))
        ));

        // reset on its own is fine
        let config = Config {
            reset_params: true,
            ..Default::default()
        };
        config.validate().unwrap();
        assert_eq!(config.commands(), [Command::ResetParams]);
    }

    #[test]
    fn test_set_while_listing() {
        for config in [
            Config {
                list_only: true,
                tpwr_mv: Some(3300),
                ..Default::default()
            },
            Config {
                list_only: true,
                lock: true,
                ..Default::default()
            },
            Config {
                list_only: true,
                write_params: true,
                ..Default::default()
            },
            Config {
                list_only: true,
                query: Some(Query::all()),
                ..Default::default()
            },
        ] {
            assert!(matches!(
                config.validate(),
                Err(Error::InvalidConfiguration(_))
            ));
        }

        let config = Config {
            list_only: true,
            serial_filter: Some("11".into()),
            json: true,
            ..Default::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn test_lock_and_unlock() {
        let config = Config {
            lock: true,
            unlock: true,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nickname_length() {
        let mut config = Config {
            nickname: Some("bench-01".into()),
            ..Default::default()
        };
        config.validate().unwrap();
        config.nickname = Some("bench-012".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_voltage_no_model_supports() {
        let mut config = Config {
            tref_mv: Some(4200),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::IllegalVoltage {
                rail: "TRef",
                millivolts: 4200
            })
        ));
        config.force_voltage = true;
        config.validate().unwrap();
    }

    #[test]
    fn test_command_order() {
        let config = Config {
            unlock: true,
            brightness: Some(7),
            tpwr_mv: Some(3300),
            write_params: true,
            lock: true,
            ..Default::default()
        };
        assert_eq!(
            config.commands(),
            [
                Command::Unlock,
                Command::SetBrightness(7),
                Command::SetTargetPower(3300),
                Command::WriteParams,
                Command::Lock,
            ]
        );
    }

    #[test]
    fn test_parse_query() {
        let query: Query = "rp".parse().unwrap();
        assert_eq!(
            query.readings(),
            [Reading::TargetReferenceVoltage, Reading::TargetPowerVoltage]
        );
        assert_eq!("pPrR".parse::<Query>().unwrap(), Query::all());
        assert_eq!("ppP".parse::<Query>().unwrap().readings().len(), 2);
        assert!("x".parse::<Query>().is_err());
        assert!("pz".parse::<Query>().is_err());
        assert!("".parse::<Query>().is_err());

        let names: Vec<String> = Query::all().readings().iter().map(|r| r.to_string()).collect();
        assert_eq!(names, ["VPwr", "IPwr", "VRef", "IRef"]);
    }

    #[test]
    fn test_query_runs_last() {
        let config = Config {
            reset_params: true,
            query: Some("R".parse().unwrap()),
            ..Default::default()
        };
        // reading doesn't count as setting a parameter
        config.validate().unwrap();
        assert_eq!(
            config.commands(),
            [
                Command::ResetParams,
                Command::Query(Query(vec![Reading::TargetReferenceCurrent])),
            ]
        );
        assert_eq!(config.commands()[1].name(), "querying");
    }
}
