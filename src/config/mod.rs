//! Panel configuration loaded from a JSON file.
//!
//! Every field has a default, so an empty object `{}` is a valid config for
//! the stock 320x480 panel mounted upside down.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::geometry::Size;
use crate::layout::GridSpec;
use crate::logging::LogLevel;
use crate::registry::ZoneId;
use crate::touch::{Orientation, TouchTransform};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub host: String,
    pub port: u16,
    pub base_topic: String,
    pub client_prefix: String,
    pub reconnect_delay_ms: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.10".to_string(),
            port: 1883,
            base_topic: "zone-controller".to_string(),
            client_prefix: "ZonePanel".to_string(),
            reconnect_delay_ms: 5000,
        }
    }
}

impl BusConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Replace host and port from a `host:port` string.
    pub fn set_address(&mut self, address: &str) -> Result<(), ConfigError> {
        let (host, port) = address
            .rsplit_once(':')
            .filter(|(host, _)| !host.is_empty())
            .ok_or_else(|| ConfigError::Invalid(format!("bus address `{address}` is not host:port")))?;
        self.port = port
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("bus port `{port}` is not a number")))?;
        self.host = host.to_string();
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u16,
    pub height: u16,
    pub header_height: u16,
    pub padding: u16,
    pub title: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 480,
            header_height: 48,
            padding: 6,
            title: "Zone Controller".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TouchConfig {
    pub orientation: Orientation,
    pub sensor_width: u16,
    pub sensor_height: u16,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            orientation: Orientation::Rotate180,
            sensor_width: 320,
            sensor_height: 480,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub path: Option<String>,
    pub max_bytes: u64,
    pub level: LogLevel,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_bytes: 1024 * 1024,
            level: LogLevel::Info,
        }
    }
}

/// Zone known before any bus message arrives.
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneSeed {
    pub id: ZoneId,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub bus: BusConfig,
    pub display: DisplayConfig,
    pub touch: TouchConfig,
    /// Number of zones subscribed to (`1..=zone_count`). Not a registry cap.
    pub zone_count: u32,
    pub loop_interval_ms: u64,
    pub climate_interval_ms: u64,
    pub metrics_interval_ms: u64,
    pub zones: Vec<ZoneSeed>,
    pub log: LogConfig,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            bus: BusConfig::default(),
            display: DisplayConfig::default(),
            touch: TouchConfig::default(),
            zone_count: 16,
            loop_interval_ms: 20,
            climate_interval_ms: 2000,
            metrics_interval_ms: 60_000,
            zones: Vec::new(),
            log: LogConfig::default(),
        }
    }
}

impl PanelConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: PanelConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = &self.bus.base_topic;
        if base.is_empty() {
            return Err(ConfigError::Invalid("bus.base_topic must not be empty".into()));
        }
        if base.ends_with('/') || base.contains(['+', '#']) {
            return Err(ConfigError::Invalid(format!(
                "bus.base_topic `{base}` must not end with `/` or contain wildcards"
            )));
        }
        if self.zone_count == 0 {
            return Err(ConfigError::Invalid("zone_count must be at least 1".into()));
        }
        if self.surface().is_empty() {
            return Err(ConfigError::Invalid("display size must be non-zero".into()));
        }
        if self.display.header_height >= self.display.height {
            return Err(ConfigError::Invalid(
                "display.header_height must be smaller than display.height".into(),
            ));
        }
        Ok(())
    }

    pub fn surface(&self) -> Size {
        Size::new(self.display.width, self.display.height)
    }

    pub fn grid(&self) -> GridSpec {
        GridSpec {
            header_height: self.display.header_height,
            padding: self.display.padding,
        }
    }

    pub fn touch_transform(&self) -> TouchTransform {
        TouchTransform::new(
            self.touch.orientation,
            Size::new(self.touch.sensor_width, self.touch.sensor_height),
        )
    }

    pub fn loop_interval(&self) -> Duration {
        Duration::from_millis(self.loop_interval_ms)
    }

    pub fn climate_interval(&self) -> Duration {
        Duration::from_millis(self.climate_interval_ms)
    }

    pub fn metrics_interval(&self) -> Duration {
        Duration::from_millis(self.metrics_interval_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.bus.reconnect_delay_ms)
    }
}
