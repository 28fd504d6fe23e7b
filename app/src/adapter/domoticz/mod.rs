mod client;

pub use client::DomoticzHttpClient;

use infrastructure::{BasicAuth, HttpClientConfig};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Domoticz {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub tls: bool,
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

fn default_port() -> u16 {
    8080
}

fn default_verify_tls() -> bool {
    true
}

impl Domoticz {
    pub fn new_device_api(&self) -> anyhow::Result<DomoticzHttpClient> {
        let http_config = HttpClientConfig::new(self.credentials(), self.verify_tls);
        DomoticzHttpClient::new(&self.base_url(), &http_config)
    }

    /// Command endpoint; the command name and its arguments are appended as-is.
    pub fn base_url(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{}://{}:{}/json.htm?type=command&param=", scheme, self.host, self.port)
    }

    fn credentials(&self) -> Option<BasicAuth> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(BasicAuth::new(username, password)),
            _ => None,
        }
    }
}
