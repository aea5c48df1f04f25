//! Configuration types

use crate::dataplane::TimerSettings;
use crate::dataplane::timer::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_RESEND_INTERVAL, DEFAULT_RING_TIMEOUT,
};
use crate::telemetry::LogConfig;
use serde::Deserialize;

/// Default endpoint limit per engine
pub const DEFAULT_MAX_ENDPOINTS: usize = 256;

/// Default AC name given to new endpoints
pub const DEFAULT_AC_NAME: &str = "pppoe-engine";

/// User-defined configuration (config.toml)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub connect_timeout: u32,
    pub resend_interval: u32,
    pub ring_timeout: u32,
    /// Tag discovery with a Host-Uniq; false is legacy mode
    pub host_uniq: bool,
    pub ring_expiry: RingExpiry,
    /// Answer session frames for unknown sessions with a PADT
    pub reply_padt_unknown_session: bool,
    pub max_endpoints: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            resend_interval: DEFAULT_RESEND_INTERVAL,
            ring_timeout: DEFAULT_RING_TIMEOUT,
            host_uniq: true,
            ring_expiry: RingExpiry::default(),
            reply_padt_unknown_session: false,
            max_endpoints: DEFAULT_MAX_ENDPOINTS,
        }
    }
}

impl EngineConfig {
    /// Timer reload values handed to new endpoints
    pub fn timers(&self) -> TimerSettings {
        TimerSettings {
            connect_timeout: self.connect_timeout,
            resend_interval: self.resend_interval,
            ring_timeout: self.ring_timeout,
        }
    }
}

/// What a ringing endpoint does when nobody accepts in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RingExpiry {
    /// Forget the caller and keep listening
    #[default]
    Listen,
    /// Give up and report Disconnected
    Disconnect,
}

/// Identity new endpoints offer when listening
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub ac_name: String,
    /// Empty serves any requested service
    pub service_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ac_name: DEFAULT_AC_NAME.to_string(),
            service_name: String::new(),
        }
    }
}
