use std::collections::HashMap;
use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use derive_more::derive::{Display, Error, From};
use infrastructure::MonitoringConfig;
use serde::Deserialize;

use crate::adapter::domoticz::Domoticz;
use crate::adapter::relay::Relay;
use crate::dimmer::DeviceIdx;
use crate::x10::{HouseCode, UnitId};

/// Largest accepted per-packet level change.
const MAX_DELTA: i64 = 49;

#[derive(Debug)]
pub struct Settings {
    pub house_code: HouseCode,
    pub delta: u8,
    pub devices: HashMap<UnitId, DeviceIdx>,
    pub domoticz: Domoticz,
    pub relay: Relay,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Display, Error, From)]
pub enum SettingsError {
    #[display("{_0}")]
    Load(ConfigError),

    #[display("invalid value for {key}: {message}")]
    #[from(ignore)]
    Invalid { key: String, message: String },
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    house_code: String,
    delta: i64,
    devices: HashMap<String, i64>,
    domoticz: Domoticz,
    relay: Relay,
    #[serde(default)]
    monitoring: MonitoringConfig,
}

impl Settings {
    /// Reads the settings file (format detected from its extension) and applies
    /// `X10BRIDGE_`-prefixed environment overrides, e.g. `X10BRIDGE_DOMOTICZ__HOST`.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let config = Config::builder()
            .add_source(File::from(path))
            .add_source(Environment::with_prefix("X10BRIDGE").separator("__"))
            .build()?;

        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self, SettingsError> {
        let raw: RawSettings = config.try_deserialize()?;
        raw.validate()
    }
}

impl RawSettings {
    fn validate(self) -> Result<Settings, SettingsError> {
        let house_code = parse_house_code(&self.house_code)?;

        if !(1..=MAX_DELTA).contains(&self.delta) {
            return Err(invalid("delta", format!("{} is not between 1 and {}", self.delta, MAX_DELTA)));
        }

        let devices = self
            .devices
            .into_iter()
            .map(|(unit, idx)| parse_device(&unit, idx))
            .collect::<Result<HashMap<_, _>, _>>()?;

        if self.domoticz.username.is_some() != self.domoticz.password.is_some() {
            return Err(invalid(
                "domoticz",
                "username and password must be given together".to_owned(),
            ));
        }

        if self.relay.connect_timeout_secs == 0 {
            return Err(invalid("relay.connect_timeout_secs", "must be positive".to_owned()));
        }

        Ok(Settings {
            house_code,
            delta: self.delta as u8,
            devices,
            domoticz: self.domoticz,
            relay: self.relay,
            monitoring: self.monitoring,
        })
    }
}

fn parse_house_code(value: &str) -> Result<HouseCode, SettingsError> {
    let mut chars = value.trim().chars();

    match (chars.next().and_then(HouseCode::new), chars.next()) {
        (Some(house), None) => Ok(house),
        _ => Err(invalid("house_code", format!("{:?} is not a letter from A to P", value))),
    }
}

fn parse_device(unit: &str, idx: i64) -> Result<(UnitId, DeviceIdx), SettingsError> {
    let key = format!("devices.{}", unit);

    let unit = UnitId::parse(unit).ok_or_else(|| invalid(&key, "unit must be between 1 and 16".to_owned()))?;
    let idx = u32::try_from(idx).map_err(|_| invalid(&key, format!("device idx {} is out of range", idx)))?;

    Ok((unit, DeviceIdx(idx)))
}

fn invalid(key: &str, message: String) -> SettingsError {
    SettingsError::Invalid {
        key: key.to_owned(),
        message,
    }
}
