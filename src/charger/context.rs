//! Shared mutable context threaded through every charger state handler.
//!
//! Handlers read the latest measurement snapshot and the profile, and
//! write setpoints, time marks, status bits and commands.  The charger
//! engine owns exactly one of these.

use crate::config::ChargingProfile;
use crate::sensors::Measurements;
use crate::timebase::TimeMark;

use super::status::ChargerStatus;

/// Requests that handlers raise for the outer loop.  Cleared every update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChargerCommands {
    /// Bring up the power stage with a fresh duty estimate.
    pub start_charging: bool,
}

pub struct ChargerContext {
    // -- Input --
    /// Clock reading of the current update (s).
    pub now: u32,
    /// Latest measurement snapshot.
    pub meas: Measurements,
    pub profile: ChargingProfile,

    // -- Setpoints --
    pub target_voltage: u16,
    pub target_current: u16,

    // -- Timing --
    /// When the current state was entered.
    pub state_changed: TimeMark,
    /// Last time the battery was seen at or above the target voltage.
    pub voltage_limit_reached: TimeMark,

    // -- Output --
    pub status: ChargerStatus,
    pub commands: ChargerCommands,
}

impl ChargerContext {
    pub fn new(profile: ChargingProfile) -> Self {
        Self {
            now: 0,
            meas: Measurements::default(),
            target_voltage: profile.max_voltage,
            target_current: profile.max_charge_current,
            profile,
            // Never changed state: the first Idle check may start at once.
            state_changed: TimeMark::never(),
            voltage_limit_reached: TimeMark::never(),
            status: ChargerStatus::empty(),
            commands: ChargerCommands::default(),
        }
    }

    pub fn secs_in_state(&mut self) -> u32 {
        self.state_changed.elapsed(self.now)
    }

    /// `u32::MAX` if the limit was not seen since the last clock reset.
    pub fn secs_since_voltage_limit(&mut self) -> u32 {
        self.voltage_limit_reached.elapsed_or_forget(self.now)
    }

    /// Stamp the voltage-limit mark if the battery is at the target.
    pub fn track_voltage_limit(&mut self) {
        if self.meas.battery_voltage.value >= self.target_voltage {
            self.voltage_limit_reached.mark(self.now);
        }
    }

    /// Bulk setpoints: full current, CV ceiling.
    pub fn set_bulk_targets(&mut self) {
        self.target_current = self.profile.max_charge_current;
        self.target_voltage = self.profile.max_voltage;
    }
}
