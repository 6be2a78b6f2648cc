//! Thermal and load supervisor.
//!
//! Runs every tick right after the measurement, before the charger.  It
//! owns the overtemperature and load status bits:
//!
//! 1. A temperature at or above its shutdown threshold sets the
//!    channel's overtemperature bit.
//! 2. The bit clears only once the channel cools to its restart
//!    threshold (hysteresis).
//! 3. A channel reading the absent-sensor sentinel is skipped entirely,
//!    it neither sets nor clears.
//! 4. The load is dropped below the disconnect voltage and reconnected
//!    at or above the reconnect voltage.
//!
//! The supervisor never touches the power stage.  Acting on the bits is
//! up to the MPPT derate branch and the charge policy.

use log::{error, info, warn};

use crate::charger::{ChargerStatus, StatusFlag};
use crate::config::{SystemConfig, ThermalLimit};
use crate::sensors::{Measurements, TEMPERATURE_ABSENT};

/// Load switch request for the service to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadAction {
    Connect,
    Disconnect,
}

pub struct Supervisor {
    thermal: [(StatusFlag, ThermalLimit); 2],
    load_enabled: bool,
    load_disconnect_mv: u16,
    load_reconnect_mv: u16,
}

impl Supervisor {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            thermal: [
                (StatusFlag::Overtemperature1, config.thermal_1),
                (StatusFlag::Overtemperature2, config.thermal_2),
            ],
            load_enabled: config.load_switch_enabled,
            load_disconnect_mv: config.profile.load_disconnect_voltage,
            load_reconnect_mv: config.profile.load_reconnect_voltage,
        }
    }

    /// Update temperature and load bits in `status` from `meas`.
    /// Returns the load switch action to apply, if any.
    pub fn evaluate(&self, meas: &Measurements, status: &mut ChargerStatus) -> Option<LoadAction> {
        let temps = [meas.temperature_1.value, meas.temperature_2.value];
        for ((flag, limit), dk) in self.thermal.iter().zip(temps) {
            Self::eval_thermal(*flag, *limit, dk, status);
        }

        if !self.load_enabled {
            return None;
        }
        self.eval_load(meas.battery_voltage.value, status)
    }

    // ── Internal ──────────────────────────────────────────────────

    fn eval_thermal(flag: StatusFlag, limit: ThermalLimit, dk: u16, status: &mut ChargerStatus) {
        if dk == TEMPERATURE_ABSENT {
            return;
        }
        if dk >= limit.shutdown_dk {
            if status.assign(flag, true) {
                error!("SUPERVISOR: {flag} set at {dk} dK (limit {})", limit.shutdown_dk);
            }
        } else if dk <= limit.restart_dk && status.assign(flag, false) {
            info!("SUPERVISOR: {flag} cleared at {dk} dK");
        }
    }

    fn eval_load(&self, battery_mv: u16, status: &mut ChargerStatus) -> Option<LoadAction> {
        let connected = status.contains(StatusFlag::LoadConnected);
        if connected && battery_mv < self.load_disconnect_mv {
            status.clear(StatusFlag::LoadConnected);
            warn!("SUPERVISOR: load disconnected, battery at {battery_mv} mV");
            Some(LoadAction::Disconnect)
        } else if !connected && battery_mv >= self.load_reconnect_mv {
            status.set(StatusFlag::LoadConnected);
            info!("SUPERVISOR: load connected, battery at {battery_mv} mV");
            Some(LoadAction::Connect)
        } else {
            None
        }
    }
}
