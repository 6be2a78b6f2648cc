//! Raw ADC count → engineering unit conversion.
//!
//! Board-specific lookup tables live outside this crate; channels here
//! use a straight-line fit that the factory calibration fills in.

/// Converts an averaged raw ADC sample to an engineering value.
pub trait Calibration {
    fn to_value(&self, raw: u16) -> u16;
}

/// `value = raw * numerator / denominator + offset`, clamped to `[0, u16::MAX - 1]`.
///
/// `u16::MAX` is reserved as the "sensor absent" sentinel, so linear
/// channels never produce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearCalibration {
    pub numerator: u32,
    pub denominator: u32,
    pub offset: i32,
}

impl LinearCalibration {
    pub const fn new(numerator: u32, denominator: u32, offset: i32) -> Self {
        Self {
            numerator,
            denominator,
            offset,
        }
    }

    // Nominal divider / shunt scaling for the 12-bit ADC at 12 dB (0 – 3.3 V).

    /// Panel input: 100k / 6.8k divider, 0 – 51.8 V.
    pub const PANEL_VOLTAGE: Self = Self::new(51_830, 4_095, 0);
    /// Panel shunt: 5 mΩ, gain 50, 0 – 13.2 A.
    pub const PANEL_CURRENT: Self = Self::new(13_200, 4_095, 0);
    /// Battery: 47k / 10k divider, 0 – 18.8 V.
    pub const BATTERY_VOLTAGE: Self = Self::new(18_810, 4_095, 0);
    /// Charge shunt: 2 mΩ, gain 100, 0 – 16.5 A.
    pub const CHARGE_CURRENT: Self = Self::new(16_500, 4_095, 0);
}

impl Calibration for LinearCalibration {
    fn to_value(&self, raw: u16) -> u16 {
        let den = self.denominator.max(1);
        let scaled = i64::from(raw) * i64::from(self.numerator) / i64::from(den);
        (scaled + i64::from(self.offset)).clamp(0, i64::from(u16::MAX - 1)) as u16
    }
}
