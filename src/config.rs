//! Charging profile and system configuration parameters
//!
//! The profile is built once at startup (defaults for a 12 V lead-acid
//! battery) and treated as read-only afterwards.  Units follow the
//! measurement snapshot: mV, mA, seconds, deci-Kelvin.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Convert degrees Celsius to the deci-Kelvin unit used by temperature channels.
pub const fn celsius_to_dk(celsius: u16) -> u16 {
    2731 + celsius * 10
}

/// Charge-profile thresholds for one battery chemistry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargingProfile {
    // --- Idle / standby ---
    /// Minimum time in Idle before charging may (re)start (s).
    pub recharge_time_limit: u32,
    /// Start a new charge cycle below this battery voltage (mV).
    pub recharge_voltage: u16,
    /// Below this voltage the battery is considered damaged (mV).
    pub absolute_min_voltage: u16,

    // --- CC / bulk ---
    /// Maximum charge current (mA).  PCB maximum: 10 A.
    pub max_charge_current: u16,

    // --- CV / absorption ---
    /// CV voltage ceiling (mV).
    pub max_voltage: u16,
    /// Maximum time spent in CV before moving to trickle (s).
    pub cv_time_limit: u32,
    /// Charge current below which the battery counts as full in CV (mA).
    pub current_cutoff_cv: u16,

    // --- Trickle / float ---
    /// Trickle target voltage (mV).
    pub trickle_voltage: u16,
    /// Return to CC when the trickle voltage was last reached longer ago than this (s).
    pub trickle_recharge_interval: u32,

    // --- System control ---
    /// Minimum panel current to keep charging (mA).
    pub charge_panel_current_min: u16,
    /// Minimum panel current to run MPPT (mA).
    pub mppt_panel_current_min: u16,
    /// Seconds after a stop before charging may restart.
    pub restart_charging_time: u32,

    // --- Load switch ---
    /// Disconnect the load below this battery voltage (mV).
    pub load_disconnect_voltage: u16,
    /// Reconnect the load at or above this battery voltage (mV).
    pub load_reconnect_voltage: u16,
}

impl Default for ChargingProfile {
    fn default() -> Self {
        Self {
            // Idle
            recharge_time_limit: 60,
            recharge_voltage: 13_500,
            absolute_min_voltage: 10_000,

            // CC
            max_charge_current: 10_000,

            // CV: 6-cell lead-acid
            max_voltage: 14_200,
            cv_time_limit: 120 * 60,
            current_cutoff_cv: 2_000,

            // Trickle
            trickle_voltage: 13_800,
            trickle_recharge_interval: 60 * 60,

            // System control
            charge_panel_current_min: 20,
            mppt_panel_current_min: 100,
            restart_charging_time: 5,

            // Load switch
            load_disconnect_voltage: 10_500,
            load_reconnect_voltage: 11_500,
        }
    }
}

impl ChargingProfile {
    /// Range sanity check.  Rejects the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            (self.recharge_voltage as u32, "recharge_voltage"),
            (self.absolute_min_voltage as u32, "absolute_min_voltage"),
            (self.max_charge_current as u32, "max_charge_current"),
            (self.max_voltage as u32, "max_voltage"),
            (self.cv_time_limit, "cv_time_limit"),
            (self.current_cutoff_cv as u32, "current_cutoff_cv"),
            (self.trickle_voltage as u32, "trickle_voltage"),
            (self.trickle_recharge_interval, "trickle_recharge_interval"),
            (self.charge_panel_current_min as u32, "charge_panel_current_min"),
            (self.mppt_panel_current_min as u32, "mppt_panel_current_min"),
        ];
        if let Some((_, field)) = positive.iter().find(|(v, _)| *v == 0) {
            return Err(ConfigError::ValidationFailed(field));
        }
        if self.recharge_voltage >= self.max_voltage {
            return Err(ConfigError::ValidationFailed("recharge_voltage must be below max_voltage"));
        }
        if self.trickle_voltage >= self.max_voltage {
            return Err(ConfigError::ValidationFailed("trickle_voltage must be below max_voltage"));
        }
        if self.absolute_min_voltage >= self.recharge_voltage {
            return Err(ConfigError::ValidationFailed(
                "absolute_min_voltage must be below recharge_voltage",
            ));
        }
        if self.load_disconnect_voltage >= self.load_reconnect_voltage {
            return Err(ConfigError::ValidationFailed(
                "load_disconnect_voltage must be below load_reconnect_voltage",
            ));
        }
        Ok(())
    }
}

/// Which power sample the MPPT hill-climb compares between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerSignal {
    /// Panel-side power (panel voltage × panel current).
    Panel,
    /// Converter output power (battery voltage × charge current).
    Output,
}

/// Overtemperature shutdown / restart pair for one channel (deci-Kelvin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThermalLimit {
    pub shutdown_dk: u16,
    pub restart_dk: u16,
}

impl Default for ThermalLimit {
    fn default() -> Self {
        Self {
            shutdown_dk: celsius_to_dk(80),
            restart_dk: celsius_to_dk(65),
        }
    }
}

/// Panel-current thresholds for switching-frequency selection (mA).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyThresholds {
    pub minimal_to_medium: u16,
    pub medium_to_minimal: u16,
    pub medium_to_high: u16,
    pub high_to_medium: u16,
}

impl Default for FrequencyThresholds {
    fn default() -> Self {
        Self {
            minimal_to_medium: 350,
            medium_to_minimal: 250,
            medium_to_high: 5_850,
            high_to_medium: 5_300,
        }
    }
}

/// Core system configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    pub profile: ChargingProfile,

    // --- Thermal ---
    /// Power-stage heatsink sensor.
    pub thermal_1: ThermalLimit,
    /// Second heatsink / ambient sensor.
    pub thermal_2: ThermalLimit,

    // --- MPPT ---
    pub mppt_power_signal: PowerSignal,
    /// Seconds between MPPT duty adjustments.
    pub mppt_interval_secs: u32,

    // --- Power stage ---
    /// Select switching frequency from panel current instead of fixed high.
    pub adaptive_frequency: bool,
    pub frequency_thresholds: FrequencyThresholds,

    // --- Load ---
    pub load_switch_enabled: bool,

    // --- Power management ---
    /// Idle seconds after a charging stop before the controller sleeps.
    pub sleep_after_idle_secs: u32,
    /// Length of one sleep period (watchdog wake interval).
    pub sleep_duration_secs: u32,

    // --- Timing ---
    /// Control loop interval (milliseconds)
    pub control_loop_interval_ms: u32,
    /// Telemetry report interval (seconds)
    pub telemetry_interval_secs: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            profile: ChargingProfile::default(),

            thermal_1: ThermalLimit::default(),
            thermal_2: ThermalLimit::default(),

            mppt_power_signal: PowerSignal::Panel,
            mppt_interval_secs: 1,

            adaptive_frequency: false,
            frequency_thresholds: FrequencyThresholds::default(),

            load_switch_enabled: true,

            sleep_after_idle_secs: 15,
            sleep_duration_secs: 8,

            control_loop_interval_ms: 1000, // 1 Hz
            telemetry_interval_secs: 10,
        }
    }
}

impl SystemConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.profile.validate()?;
        for limit in [self.thermal_1, self.thermal_2] {
            if limit.restart_dk >= limit.shutdown_dk {
                return Err(ConfigError::ValidationFailed(
                    "thermal restart must be below shutdown",
                ));
            }
        }
        let t = self.frequency_thresholds;
        if t.medium_to_minimal >= t.minimal_to_medium || t.high_to_medium >= t.medium_to_high {
            return Err(ConfigError::ValidationFailed(
                "frequency thresholds need a hysteresis band",
            ));
        }
        if self.control_loop_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("control_loop_interval_ms"));
        }
        Ok(())
    }
}
