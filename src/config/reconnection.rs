//! `reconnection.*` — grace window and replay-buffer sizing for the
//! reconnection-token mechanism backing the duplex `reconnect` message.

use super::defaults::{default_event_buffer_size, default_grace_window_secs};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReconnectionConfig {
    /// How long a dropped handle's room membership stays reclaimable.
    #[serde(default = "default_grace_window_secs")]
    pub grace_window_secs: u64,
    /// Per-room cap on buffered envelopes kept for missed-event replay.
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

impl Default for ReconnectionConfig {
    fn default() -> Self {
        Self {
            grace_window_secs: default_grace_window_secs(),
            event_buffer_size: default_event_buffer_size(),
        }
    }
}
