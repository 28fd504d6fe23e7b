pub mod domoticz;
pub mod relay;
