//! NTC thermistor channels (10 kOhm @ 25 C, B = 3950).
//!
//! Each thermistor sits in a voltage divider with a fixed 10 kOhm
//! resistor.  The simplified Beta equation converts resistance to
//! temperature, reported in deci-Kelvin.
//!
//! An unplugged or shorted thermistor pins the ADC to a rail.  Those
//! readings map to [`TEMPERATURE_ABSENT`] so the supervisor ignores
//! the channel instead of shutting down on a bogus value.

use super::calibration::Calibration;
use super::TEMPERATURE_ABSENT;

const R25: f32 = 10_000.0;
const BETA: f32 = 3950.0;
const T25_K: f32 = 298.15;
const R_DIVIDER: f32 = 10_000.0;
const ADC_MAX: f32 = 4095.0;
const V_REF: f32 = 3.3;
/// Readings this close to either rail mean "no sensor".
const RAIL_MARGIN_V: f32 = 0.01;

#[derive(Debug, Clone, Copy, Default)]
pub struct NtcCalibration;

impl NtcCalibration {
    /// Temperature in Kelvin, or `None` at the rails.
    pub fn kelvin(raw: u16) -> Option<f32> {
        let voltage = (f32::from(raw) / ADC_MAX) * V_REF;
        if voltage <= RAIL_MARGIN_V || voltage >= (V_REF - RAIL_MARGIN_V) {
            return None;
        }
        let r_ntc = R_DIVIDER * voltage / (V_REF - voltage);
        let inv_t = (1.0 / T25_K) + (1.0 / BETA) * (r_ntc / R25).ln();
        if inv_t <= 0.0 {
            return None;
        }
        Some(1.0 / inv_t)
    }
}

impl Calibration for NtcCalibration {
    fn to_value(&self, raw: u16) -> u16 {
        match Self::kelvin(raw) {
            Some(k) => ((k * 10.0).round() as u32).min(u32::from(TEMPERATURE_ABSENT - 1)) as u16,
            None => TEMPERATURE_ABSENT,
        }
    }
}
