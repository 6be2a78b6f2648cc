//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to the serial console, drive a
//! display, feed a test recorder.

use serde::Serialize;

use crate::charger::{ChargerState, ChargerStatus};
use crate::control::StopReason;
use crate::drivers::power_stage::FrequencyMode;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The application service has started (carries initial state).
    Started(ChargerState),

    /// The charger moved between phases.
    StateChanged { from: ChargerState, to: ChargerState },

    /// The power stage started switching (carries the initial duty).
    ChargingStarted { duty: u16 },

    ChargingStopped(StopReason),

    /// Any status bit changed (carries the new set).
    StatusChanged(ChargerStatus),

    /// Both phases moved to a new switching frequency.
    FrequencyChanged(FrequencyMode),

    /// Periodic telemetry snapshot.
    Telemetry(TelemetryData),

    /// Idle long enough, about to sleep for the given seconds.
    SleepRequested(u32),
}

/// A point-in-time telemetry snapshot suitable for logging or transmission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TelemetryData {
    /// Clock reading (s since the last charging stop).
    pub uptime_s: u32,
    pub state: ChargerState,
    pub status: ChargerStatus,
    pub panel_mv: u16,
    pub panel_ma: u16,
    pub battery_mv: u16,
    pub charge_ma: u16,
    pub panel_cw: u16,
    pub charge_cw: u16,
    /// Converter efficiency in 0.01 %, `u16::MAX` when not meaningful.
    pub efficiency: u16,
    pub temperature_1_dk: u16,
    pub temperature_2_dk: u16,
    pub duty: u16,
    pub frequency: FrequencyMode,
    pub target_mv: u16,
    pub target_ma: u16,
}
