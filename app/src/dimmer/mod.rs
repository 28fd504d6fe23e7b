pub mod level;

use std::collections::HashMap;

use derive_more::derive::{Display, Error};

use crate::x10::{LevelAction, UnitId};

/// Identifier of a device in the home-automation system (Domoticz `idx`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub struct DeviceIdx(pub u32);

/// Switch properties reported by the home-automation system. Fields are optional because
/// non-switch devices omit them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatus {
    pub switch_type: Option<String>,
    pub dimmer_type: Option<String>,
    pub max_dim_level: Option<i64>,
    pub level: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum UnsupportedReason {
    #[display("device not found")]
    NotFound,

    #[display("switch type {_0:?} is not a dimmer")]
    NotADimmer(Option<String>),

    #[display("dimmer type {_0:?} is not absolute")]
    NotAbsolute(Option<String>),

    #[display("max dim level {_0:?} is not 100")]
    NotPercentage(Option<i64>),

    #[display("reported level {_0:?} is outside 0..=100")]
    LevelOutOfRange(Option<i64>),
}

#[derive(Debug, Display, Error)]
pub enum DimmerError {
    #[display("no device mapped to X10 unit {_0}")]
    NoMapping(#[error(not(source))] UnitId),

    #[display("device {idx} is not supported: {reason}")]
    UnsupportedDevice { idx: DeviceIdx, reason: UnsupportedReason },

    #[display("request to device {idx} failed: {cause:#}")]
    Transport { idx: DeviceIdx, cause: anyhow::Error },
}

/// Remote operations the level controller needs from the home-automation system.
pub trait DeviceApi {
    /// Returns `None` when the system knows no device with that identifier.
    async fn device_status(&self, idx: DeviceIdx) -> anyhow::Result<Option<DeviceStatus>>;

    async fn set_level(&self, idx: DeviceIdx, level: u8) -> anyhow::Result<()>;

    async fn switch_off(&self, idx: DeviceIdx) -> anyhow::Result<()>;
}

impl DeviceStatus {
    /// The current level, provided the device is an absolute dimmer working in percent.
    pub fn absolute_level(&self) -> Result<u8, UnsupportedReason> {
        if self.switch_type.as_deref() != Some("Dimmer") {
            return Err(UnsupportedReason::NotADimmer(self.switch_type.clone()));
        }

        if self.dimmer_type.as_deref() != Some("abs") {
            return Err(UnsupportedReason::NotAbsolute(self.dimmer_type.clone()));
        }

        if self.max_dim_level != Some(i64::from(level::MAX_LEVEL)) {
            return Err(UnsupportedReason::NotPercentage(self.max_dim_level));
        }

        match self.level {
            Some(value) if (0..=i64::from(level::MAX_LEVEL)).contains(&value) => Ok(value as u8),
            other => Err(UnsupportedReason::LevelOutOfRange(other)),
        }
    }
}

pub struct LevelController<A: DeviceApi> {
    api: A,
    devices: HashMap<UnitId, DeviceIdx>,
}

impl<A: DeviceApi> LevelController<A> {
    pub fn new(api: A, devices: HashMap<UnitId, DeviceIdx>) -> Self {
        Self { api, devices }
    }

    /// Reads the current level of the device behind `unit`, shifts it by `magnitude` and writes it
    /// back. Returns the level the device ends up at, 0 meaning switched off.
    ///
    /// Nothing is rolled back: if switching off fails after the level was written, the device is
    /// left at level 1.
    #[tracing::instrument(skip(self))]
    pub async fn apply(&self, unit: UnitId, action: LevelAction, magnitude: u8) -> Result<u8, DimmerError> {
        let idx = *self.devices.get(&unit).ok_or(DimmerError::NoMapping(unit))?;

        let status = self
            .api
            .device_status(idx)
            .await
            .map_err(|cause| DimmerError::Transport { idx, cause })?
            .ok_or(DimmerError::UnsupportedDevice {
                idx,
                reason: UnsupportedReason::NotFound,
            })?;

        let current = status
            .absolute_level()
            .map_err(|reason| DimmerError::UnsupportedDevice { idx, reason })?;

        let new_level = level::next_level(current, action.delta(magnitude));
        tracing::debug!("Device {} at level {}, setting {}", idx, current, new_level);

        self.api
            .set_level(idx, new_level)
            .await
            .map_err(|cause| DimmerError::Transport { idx, cause })?;

        if new_level > level::OFF_THRESHOLD {
            return Ok(new_level);
        }

        if let Err(cause) = self.api.switch_off(idx).await {
            tracing::error!("Device {} was set to level {} but switching it off failed", idx, new_level);
            return Err(DimmerError::Transport { idx, cause });
        }

        Ok(0)
    }
}
