//! Load output MOSFET switch.
//!
//! Disconnects the load when the battery runs low.  The decision is
//! made by the supervisor; this driver is a dumb actuator.
//!
//! On ESP-IDF: drives the switch GPIO via hw_init.
//! On host/test: tracks state in-memory only.

use crate::drivers::hw_init;

pub struct LoadSwitch {
    connected: bool,
}

impl Default for LoadSwitch {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadSwitch {
    /// Starts disconnected, matching the GPIO reset level.
    pub fn new() -> Self {
        Self { connected: false }
    }

    pub fn set(&mut self, connected: bool) {
        if connected != self.connected {
            log::info!("load switch: {}", if connected { "connected" } else { "disconnected" });
        }
        hw_init::load_switch_write(connected);
        self.connected = connected;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }
}
