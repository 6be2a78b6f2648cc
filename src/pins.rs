//! GPIO / peripheral pin assignments for the SLACC power board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Buck converter (two phases, 180° apart)
// ---------------------------------------------------------------------------

/// LEDC output for the 0° half bridge.
pub const PHASE_0_PWM_GPIO: i32 = 1;
/// LEDC output for the 180° half bridge.
pub const PHASE_180_PWM_GPIO: i32 = 2;
/// Gate-driver shutdown line.  HIGH enables the MOSFET drivers.
pub const GATE_DRIVER_ENABLE_GPIO: i32 = 3;

// ---------------------------------------------------------------------------
// Load output
// ---------------------------------------------------------------------------

/// Load MOSFET switch.  HIGH = load connected.
pub const LOAD_SWITCH_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// Sensors, analog (ADC1 channel numbers; GPIO = channel + 1)
// ---------------------------------------------------------------------------

/// Panel voltage divider (GPIO 5).
pub const PANEL_VOLTAGE_ADC_CH: u32 = 4;
/// Panel current shunt amplifier (GPIO 6).
pub const PANEL_CURRENT_ADC_CH: u32 = 5;
/// Battery voltage divider (GPIO 7).
pub const BATTERY_VOLTAGE_ADC_CH: u32 = 6;
/// Charge current shunt amplifier (GPIO 8).
pub const CHARGE_CURRENT_ADC_CH: u32 = 7;
/// Heatsink NTC (GPIO 9).
pub const TEMP_1_ADC_CH: u32 = 8;
/// Second NTC, ambient or battery (GPIO 10).
pub const TEMP_2_ADC_CH: u32 = 9;
