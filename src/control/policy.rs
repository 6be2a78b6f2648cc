//! Charge on/off policy.
//!
//! Decides once per tick, after the charger update and before MPPT,
//! whether the power stage should be switching at all.

use core::fmt;

use serde::Serialize;

use crate::charger::ChargerStatus;
use crate::config::ChargingProfile;
use crate::sensors::Measurements;

/// Why charging was stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// Panel current fell below the charging floor.
    PanelCurrentLow,
    /// Overtemperature with the duty already at its minimum.
    Overtemperature,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PanelCurrentLow => write!(f, "panel current low"),
            Self::Overtemperature => write!(f, "overtemperature"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeDecision {
    Start,
    Stop(StopReason),
    /// Charging, keep going.
    Continue,
    /// Not charging, conditions not met.
    StayOff,
}

/// Inputs the policy reads besides the measurement snapshot.
#[derive(Debug, Clone, Copy)]
pub struct PolicyInput {
    pub status: ChargerStatus,
    pub target_voltage: u16,
    /// Clock reading, seconds since the last stop.
    pub now: u32,
    /// The previous MPPT derate step found the duty at `min`.
    pub derate_exhausted: bool,
}

pub struct ChargePolicy {
    charge_panel_current_min: u16,
    restart_charging_time: u32,
}

impl ChargePolicy {
    pub fn new(profile: &ChargingProfile) -> Self {
        Self {
            charge_panel_current_min: profile.charge_panel_current_min,
            restart_charging_time: profile.restart_charging_time,
        }
    }

    pub fn decide(&self, meas: &Measurements, input: PolicyInput) -> ChargeDecision {
        let battery = meas.battery_voltage.value;

        if !input.status.is_charging() {
            let can_start = !input.status.is_overtemperature()
                && battery < input.target_voltage
                && meas.panel_voltage.value > battery
                && input.now > self.restart_charging_time;
            return if can_start {
                ChargeDecision::Start
            } else {
                ChargeDecision::StayOff
            };
        }

        if meas.panel_current.value < self.charge_panel_current_min {
            ChargeDecision::Stop(StopReason::PanelCurrentLow)
        } else if input.status.is_overtemperature() && input.derate_exhausted {
            ChargeDecision::Stop(StopReason::Overtemperature)
        } else {
            ChargeDecision::Continue
        }
    }
}
