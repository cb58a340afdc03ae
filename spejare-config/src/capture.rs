//! Live capture configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct CaptureConfig {
    /// Network interface to capture from.
    #[validate(custom(function = validation::validate_interface))]
    #[serde(default = "default_interface")]
    pub interface: String,

    /// Run in promiscuous mode?
    #[serde(default = "default_promiscuous")]
    pub promiscuous: bool,

    /// Snapshot length per captured frame, in bytes.
    #[validate(range(min = 64, max = 65535))]
    #[serde(default = "default_snaplen")]
    pub snaplen: usize,

    /// Read timeout on the capture handle (milliseconds). Bounds how long
    /// the capture loop can block without observing a stop signal.
    #[validate(range(min = 1, max = 5000))]
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u32,
}

fn default_interface() -> String {
    "eth0".into()
}

fn default_promiscuous() -> bool {
    true
}

fn default_snaplen() -> usize {
    65535
}

fn default_poll_timeout_ms() -> u32 {
    500
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interface: default_interface(),
            promiscuous: default_promiscuous(),
            snaplen: default_snaplen(),
            poll_timeout_ms: default_poll_timeout_ms(),
        }
    }
}
