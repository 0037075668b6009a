//! Binding configuration loaded from TOML.
//!
//! ```toml
//! port = "usb:001,004"
//! event_timeout_ms = 2000
//!
//! [[settings]]
//! namespace = "ptp2"
//! key = "capturetarget"
//! value = "card"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::traits::{Result, Setting};

const DEFAULT_EVENT_TIMEOUT_MS: u64 = 5000;

const fn default_event_timeout_ms() -> u64 {
    DEFAULT_EVENT_TIMEOUT_MS
}

/// How to bring a camera up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Port path to bind to. Autodetect when absent or empty.
    #[serde(default)]
    pub port: Option<String>,
    /// Default timeout for event waits, in milliseconds.
    #[serde(default = "default_event_timeout_ms")]
    pub event_timeout_ms: u64,
    /// Settings applied to the native settings store before init, in order.
    #[serde(default)]
    pub settings: Vec<Setting>,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            port: None,
            event_timeout_ms: DEFAULT_EVENT_TIMEOUT_MS,
            settings: Vec::new(),
        }
    }
}

impl BindingConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// The event wait timeout.
    pub const fn event_timeout(&self) -> Duration {
        Duration::from_millis(self.event_timeout_ms)
    }
}
