use std::io;
use std::time::Duration;

use derive_more::derive::{Display, Error};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;

/// The daemon relaying the X10 controller's monitor output over TCP, one packet per line.
#[derive(Debug, Deserialize, Clone)]
pub struct Relay {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_host() -> String {
    "localhost".to_owned()
}

fn default_connect_timeout() -> u64 {
    10
}

#[derive(Debug, Display, Error)]
pub enum RelayError {
    #[display("timed out connecting to relay at {addr}")]
    Timeout { addr: String },

    #[display("cannot connect to relay at {addr}: {source}")]
    Connect { addr: String, source: io::Error },

    #[display("error reading from relay: {source}")]
    Read { source: io::Error },

    #[display("relay closed the connection")]
    Closed,
}

pub struct RelayConnection {
    reader: BufReader<TcpStream>,
    buffer: Vec<u8>,
}

impl Relay {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub async fn connect(&self) -> Result<RelayConnection, RelayError> {
        let addr = self.address();
        let timeout = Duration::from_secs(self.connect_timeout_secs);

        let stream = match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(RelayError::Connect { addr, source }),
            Err(_) => return Err(RelayError::Timeout { addr }),
        };

        tracing::info!("Connected to relay at {}", addr);

        Ok(RelayConnection {
            reader: BufReader::new(stream),
            buffer: Vec::new(),
        })
    }
}

impl RelayConnection {
    /// Waits for the next complete line. Bytes that are not valid UTF-8 are replaced rather than
    /// failing the connection.
    pub async fn next_line(&mut self) -> Result<String, RelayError> {
        self.buffer.clear();

        let read = self
            .reader
            .read_until(b'\n', &mut self.buffer)
            .await
            .map_err(|source| RelayError::Read { source })?;

        if read == 0 {
            return Err(RelayError::Closed);
        }

        let line = String::from_utf8_lossy(&self.buffer);
        Ok(line.trim_end_matches(['\r', '\n']).to_owned())
    }
}
