use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetdashConfig {
    /// Address the HTTP/WebSocket server binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Seconds between throughput samples pushed to a streaming client.
    #[serde(default = "default_sample_interval_secs")]
    pub sample_interval_secs: u64,

    /// Overall timeout for one ping invocation.
    #[serde(default = "default_ping_timeout_secs")]
    pub ping_timeout_secs: u64,

    /// Echo requests sent per ping invocation.
    #[serde(default = "default_ping_count")]
    pub ping_count: u32,

    /// Connect timeout for each individual port probe.
    #[serde(default = "default_port_probe_timeout_ms")]
    pub port_probe_timeout_ms: u64,

    /// Timeout for the TCP connect and the TLS handshake of a certificate check.
    #[serde(default = "default_tls_timeout_secs")]
    pub tls_timeout_secs: u64,

    /// Base URL of the IP geolocation provider.
    #[serde(default = "default_geo_provider_url")]
    pub geo_provider_url: String,

    /// Timeout for one geolocation provider request.
    #[serde(default = "default_geo_timeout_secs")]
    pub geo_timeout_secs: u64,

    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// When set, logs also go to daily-rolled files in this directory.
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_sample_interval_secs() -> u64 {
    2
}

fn default_ping_timeout_secs() -> u64 {
    15
}

fn default_ping_count() -> u32 {
    4
}

fn default_port_probe_timeout_ms() -> u64 {
    500
}

fn default_tls_timeout_secs() -> u64 {
    10
}

fn default_geo_provider_url() -> String {
    "http://ip-api.com/json".to_string()
}

fn default_geo_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NetdashConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            sample_interval_secs: default_sample_interval_secs(),
            ping_timeout_secs: default_ping_timeout_secs(),
            ping_count: default_ping_count(),
            port_probe_timeout_ms: default_port_probe_timeout_ms(),
            tls_timeout_secs: default_tls_timeout_secs(),
            geo_provider_url: default_geo_provider_url(),
            geo_timeout_secs: default_geo_timeout_secs(),
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl NetdashConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: NetdashConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_secs)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs)
    }

    pub fn port_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.port_probe_timeout_ms)
    }

    pub fn tls_timeout(&self) -> Duration {
        Duration::from_secs(self.tls_timeout_secs)
    }

    pub fn geo_timeout(&self) -> Duration {
        Duration::from_secs(self.geo_timeout_secs)
    }
}
