//! Application core: pure domain logic, zero I/O.
//!
//! This module wires the charger state machine, MPPT tracking, charge
//! policy and supervision together.  All interaction with hardware
//! happens through **port traits** defined in [`ports`], keeping this
//! layer fully testable without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
