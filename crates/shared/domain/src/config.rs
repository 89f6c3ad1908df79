use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Everything the acquisition node reads from `config.toml`.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodeConfigInner {
    pub acquire: AcquireConfig,
    pub web: WebConfig,
    pub status: StatusConfig,
    pub log: LogConfig,
}

/// Thin Arc-wrapped config for inexpensive cloning into tasks.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct NodeConfig {
    #[serde(flatten, default)]
    inner: Arc<NodeConfigInner>,
}

impl Deref for NodeConfig {
    type Target = NodeConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for NodeConfig {
    fn deref_mut(&mut self) -> &mut NodeConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// Serial acquisition and capture file settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AcquireConfig {
    /// Written into every capture header and file name.
    pub node_id: String,
    pub serial_port: String,
    pub baud_rate: u32,
    /// Serial read timeout in milliseconds.
    pub timeout_ms: u64,
    pub data_dir: PathBuf,
    /// Recorded in capture metadata; the MCU reports its own rate per frame.
    pub sample_rate: f64,
    /// Lines per capture file before a new one is started.
    pub rotate_every: u64,
}

/// Local HTTP status API.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub address: IpAddr,
    pub port: u16,
}

/// RGB status LED wiring (BCM pin numbers).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub led: bool,
    pub pin_red: u8,
    pub pin_green: u8,
    pub pin_blue: u8,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub dir: PathBuf,
    pub level: String,
}

/// One-line summary of the settings an operator checks first after a restart.
impl fmt::Display for NodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let acquire = &self.acquire;
        write!(
            f,
            "node={} port={}@{} data={} rotate_every={} web={}:{} led={} log={}({})",
            acquire.node_id,
            acquire.serial_port,
            acquire.baud_rate,
            acquire.data_dir.display(),
            acquire.rotate_every,
            self.web.address,
            self.web.port,
            if self.status.led { "on" } else { "off" },
            self.log.dir.display(),
            self.log.level,
        )
    }
}

// --- Default ---

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            node_id: "UNKNOWN".to_owned(),
            serial_port: "/dev/ttyUSB0".to_owned(),
            baud_rate: 115_200,
            timeout_ms: 10_000,
            data_dir: PathBuf::from("data"),
            sample_rate: 20_000.0,
            rotate_every: 3600,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self { address: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: 8003 }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self { led: true, pin_red: 19, pin_green: 20, pin_blue: 21 }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("logs"), level: "info".to_owned() }
    }
}
