use anyhow::Context;
use infrastructure::HttpClientConfig;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;

use crate::dimmer::{DeviceApi, DeviceIdx, DeviceStatus};

#[derive(Debug, Clone)]
pub struct DomoticzHttpClient {
    client: ClientWithMiddleware,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct DevicesResponse {
    #[serde(default)]
    result: Vec<DeviceEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DeviceEntry {
    switch_type: Option<String>,
    dimmer_type: Option<String>,
    max_dim_level: Option<i64>,
    level_int: Option<i64>,
}

impl From<DeviceEntry> for DeviceStatus {
    fn from(entry: DeviceEntry) -> Self {
        Self {
            switch_type: entry.switch_type,
            dimmer_type: entry.dimmer_type,
            max_dim_level: entry.max_dim_level,
            level: entry.level_int,
        }
    }
}

impl DomoticzHttpClient {
    pub fn new(base_url: &str, config: &HttpClientConfig) -> anyhow::Result<Self> {
        let client = config.new_tracing_client()?;

        Ok(Self {
            client,
            base_url: base_url.to_owned(),
        })
    }

    async fn command(&self, command: &str) -> anyhow::Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, command);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Error sending command {}", command))?;

        response
            .error_for_status()
            .with_context(|| format!("Command {} rejected", command))
    }
}

impl DeviceApi for DomoticzHttpClient {
    #[tracing::instrument(skip(self))]
    async fn device_status(&self, idx: DeviceIdx) -> anyhow::Result<Option<DeviceStatus>> {
        let response = self.command(&format!("getdevices&rid={}", idx)).await?;

        let devices = response
            .json::<DevicesResponse>()
            .await
            .context("Error decoding device status")?;

        Ok(devices.result.into_iter().next().map(DeviceStatus::from))
    }

    #[tracing::instrument(skip(self))]
    async fn set_level(&self, idx: DeviceIdx, level: u8) -> anyhow::Result<()> {
        self.command(&format!("switchlight&idx={}&switchcmd=Set%20Level&level={}", idx, level))
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn switch_off(&self, idx: DeviceIdx) -> anyhow::Result<()> {
        self.command(&format!("switchlight&idx={}&switchcmd=Off", idx)).await?;
        Ok(())
    }
}
