//! Power-path drivers, hardware initialisation, and peripheral helpers.

pub mod hw_init;
pub mod hw_timer;
pub mod load_switch;
pub mod power_stage;
pub mod watchdog;
