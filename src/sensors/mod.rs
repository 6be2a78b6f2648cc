//! Measurement subsystem: ADC channels and the aggregating [`SensorHub`].
//!
//! The hub samples every channel, averages, calibrates, and produces one
//! immutable [`Measurements`] snapshot per control tick.  The charger,
//! the MPPT tracker and the supervisor only ever see that snapshot.
//!
//! Units: voltages in mV, currents in mA, temperatures in deci-Kelvin,
//! power in centi-Watts, efficiency in centi-percent.

pub mod averaging;
pub mod calibration;
pub mod temperature;

use serde::Serialize;

use crate::drivers::hw_init;
use averaging::Oversampler;
use calibration::{Calibration, LinearCalibration};
use temperature::NtcCalibration;

/// "Sensor absent" value for temperature channels.
pub const TEMPERATURE_ABSENT: u16 = u16::MAX;

/// Samples averaged per channel per tick.
pub const OVERSAMPLING: usize = 4;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// One channel: averaged raw ADC count and its calibrated value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Reading {
    pub raw: u16,
    pub value: u16,
}

impl Reading {
    pub const fn new(raw: u16, value: u16) -> Self {
        Self { raw, value }
    }

    /// A reading with no raw counterpart (tests, simulation).
    pub const fn value(value: u16) -> Self {
        Self { raw: 0, value }
    }
}

/// Per-tick measurement snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Measurements {
    pub panel_voltage: Reading,
    pub panel_current: Reading,
    pub battery_voltage: Reading,
    pub charge_current: Reading,
    pub temperature_1: Reading,
    pub temperature_2: Reading,
    /// Panel power (cW).
    pub panel_power: u16,
    /// Power into the battery (cW).
    pub charge_power: u16,
    /// Converter efficiency (0.01 %), `u16::MAX` when not meaningful.
    pub efficiency: u16,
}

impl Default for Measurements {
    fn default() -> Self {
        Self::from_readings(
            Reading::default(),
            Reading::default(),
            Reading::default(),
            Reading::default(),
            Reading::value(TEMPERATURE_ABSENT),
            Reading::value(TEMPERATURE_ABSENT),
        )
    }
}

impl Measurements {
    /// Build a snapshot and derive power and efficiency.
    pub fn from_readings(
        panel_voltage: Reading,
        panel_current: Reading,
        battery_voltage: Reading,
        charge_current: Reading,
        temperature_1: Reading,
        temperature_2: Reading,
    ) -> Self {
        let charge_power_precise =
            u32::from(battery_voltage.value) * u32::from(charge_current.value);
        let panel_power = power_cw(panel_voltage.value, panel_current.value);
        let charge_power = saturate_u16(charge_power_precise / 10_000);

        let efficiency = if panel_power > charge_power {
            saturate_u16(charge_power_precise / u32::from(panel_power))
        } else {
            u16::MAX
        };

        Self {
            panel_voltage,
            panel_current,
            battery_voltage,
            charge_current,
            temperature_1,
            temperature_2,
            panel_power,
            charge_power,
            efficiency,
        }
    }

    /// Electrical values only, both temperature channels absent.
    pub fn from_values(panel_mv: u16, panel_ma: u16, battery_mv: u16, charge_ma: u16) -> Self {
        Self::from_readings(
            Reading::value(panel_mv),
            Reading::value(panel_ma),
            Reading::value(battery_mv),
            Reading::value(charge_ma),
            Reading::value(TEMPERATURE_ABSENT),
            Reading::value(TEMPERATURE_ABSENT),
        )
    }

    /// Replace the temperature channels (deci-Kelvin).
    pub fn with_temperatures(mut self, t1_dk: u16, t2_dk: u16) -> Self {
        self.temperature_1 = Reading::value(t1_dk);
        self.temperature_2 = Reading::value(t2_dk);
        self
    }
}

/// `mV × mA / 10 000` → centi-Watts, saturating.
pub fn power_cw(millivolts: u16, milliamps: u16) -> u16 {
    saturate_u16(u32::from(millivolts) * u32::from(milliamps) / 10_000)
}

fn saturate_u16(v: u32) -> u16 {
    v.min(u32::from(u16::MAX)) as u16
}

// ---------------------------------------------------------------------------
// ADC access
// ---------------------------------------------------------------------------

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU16, Ordering};

/// Injected raw samples for host simulation, indexed by ADC1 channel.
#[cfg(not(target_os = "espidf"))]
static SIM_ADC: [AtomicU16; 10] = [const { AtomicU16::new(0) }; 10];

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_adc(channel: u32, raw: u16) {
    if let Some(slot) = SIM_ADC.get(channel as usize) {
        slot.store(raw, Ordering::Relaxed);
    }
}

#[cfg(target_os = "espidf")]
fn read_adc(channel: u32) -> u16 {
    hw_init::adc1_read(channel)
}

#[cfg(not(target_os = "espidf"))]
fn read_adc(channel: u32) -> u16 {
    SIM_ADC
        .get(channel as usize)
        .map_or(0, |slot| slot.load(Ordering::Relaxed))
}

/// One calibrated, oversampled ADC input.
pub struct AdcChannel<C: Calibration> {
    adc_channel: u32,
    samples: Oversampler<OVERSAMPLING>,
    cal: C,
}

impl<C: Calibration> AdcChannel<C> {
    pub fn new(adc_channel: u32, cal: C) -> Self {
        Self {
            adc_channel,
            samples: Oversampler::new(),
            cal,
        }
    }

    /// Take a fresh burst of samples and return the calibrated reading.
    pub fn read(&mut self) -> Reading {
        for _ in 0..OVERSAMPLING {
            self.samples.push(read_adc(self.adc_channel));
        }
        let raw = self.samples.average();
        Reading::new(raw, self.cal.to_value(raw))
    }
}

// ---------------------------------------------------------------------------
// SensorHub
// ---------------------------------------------------------------------------

/// Aggregates all measurement channels and produces a unified snapshot.
pub struct SensorHub {
    pub panel_voltage: AdcChannel<LinearCalibration>,
    pub panel_current: AdcChannel<LinearCalibration>,
    pub battery_voltage: AdcChannel<LinearCalibration>,
    pub charge_current: AdcChannel<LinearCalibration>,
    pub temperature_1: AdcChannel<NtcCalibration>,
    pub temperature_2: AdcChannel<NtcCalibration>,
}

impl Default for SensorHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorHub {
    /// Hub with the nominal board calibration.
    pub fn new() -> Self {
        Self {
            panel_voltage: AdcChannel::new(hw_init::ADC1_CH_PANEL_VOLTAGE, LinearCalibration::PANEL_VOLTAGE),
            panel_current: AdcChannel::new(hw_init::ADC1_CH_PANEL_CURRENT, LinearCalibration::PANEL_CURRENT),
            battery_voltage: AdcChannel::new(hw_init::ADC1_CH_BATTERY_VOLTAGE, LinearCalibration::BATTERY_VOLTAGE),
            charge_current: AdcChannel::new(hw_init::ADC1_CH_CHARGE_CURRENT, LinearCalibration::CHARGE_CURRENT),
            temperature_1: AdcChannel::new(hw_init::ADC1_CH_TEMP_1, NtcCalibration),
            temperature_2: AdcChannel::new(hw_init::ADC1_CH_TEMP_2, NtcCalibration),
        }
    }

    /// Sample every channel and derive power / efficiency.
    pub fn read_all(&mut self) -> Measurements {
        Measurements::from_readings(
            self.panel_voltage.read(),
            self.panel_current.read(),
            self.battery_voltage.read(),
            self.charge_current.read(),
            self.temperature_1.read(),
            self.temperature_2.read(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_is_scaled_to_centiwatts() {
        // 18 V × 5 A = 90 W
        assert_eq!(power_cw(18_000, 5_000), 9_000);
    }

    #[test]
    fn power_saturates() {
        assert_eq!(power_cw(u16::MAX, u16::MAX), u16::MAX);
    }

    #[test]
    fn efficiency_in_centipercent() {
        // Panel 20 V × 4 A = 80 W, battery 12.5 V × 6 A = 75 W → 93.75 %
        let m = Measurements::from_values(20_000, 4_000, 12_500, 6_000);
        assert_eq!(m.panel_power, 8_000);
        assert_eq!(m.charge_power, 7_500);
        assert_eq!(m.efficiency, 9_375);
    }

    #[test]
    fn efficiency_above_unity_is_sentinel() {
        let m = Measurements::from_values(12_000, 1_000, 13_000, 1_000);
        assert_eq!(m.efficiency, u16::MAX);
    }

    #[test]
    fn dark_panel_has_no_efficiency() {
        let m = Measurements::from_values(0, 0, 12_000, 0);
        assert_eq!(m.panel_power, 0);
        assert_eq!(m.efficiency, u16::MAX);
    }

    #[test]
    fn default_snapshot_has_absent_temperatures() {
        let m = Measurements::default();
        assert_eq!(m.temperature_1.value, TEMPERATURE_ABSENT);
        assert_eq!(m.temperature_2.value, TEMPERATURE_ABSENT);
    }

    #[test]
    fn hub_reads_injected_samples() {
        // Channel 6 is only touched by this test.
        sim_set_adc(hw_init::ADC1_CH_BATTERY_VOLTAGE, 2_730);
        let mut hub = SensorHub::new();
        let m = hub.read_all();
        assert_eq!(m.battery_voltage.raw, 2_730);
        assert_eq!(m.battery_voltage.value, 12_540);
    }
}
