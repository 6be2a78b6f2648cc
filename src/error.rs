//! Unified error types for the SLACC firmware.
//!
//! The control core (charger, MPPT, supervision) is total and never
//! returns an error; unsafe conditions are answered with a safety state
//! instead.  The types here cover the few fallible edges: power-stage
//! preconditions, profile validation, and peripheral bring-up.
//! All variants are `Copy` so they can be logged and compared without
//! allocation.

use core::fmt;

use crate::drivers::hw_init::HwInitError;
use crate::drivers::power_stage::FrequencyMode;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A power-stage request violated a phase/frequency precondition.
    Pwm(PwmError),
    /// The charging profile or system configuration is invalid.
    Config(ConfigError),
    /// Peripheral initialisation failed.
    Init(HwInitError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pwm(e) => write!(f, "pwm: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Init(e) => write!(f, "init: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Power-stage errors
// ---------------------------------------------------------------------------

/// Rejected power-stage requests.  The driver refuses the request and
/// leaves the hardware untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmError {
    /// The 180° phase may only run while the 0° phase is enabled.
    LeadPhaseDisabled,
    /// Both phases must share one switching frequency.
    FrequencyMismatch {
        active: FrequencyMode,
        requested: FrequencyMode,
    },
}

impl fmt::Display for PwmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LeadPhaseDisabled => write!(f, "180° phase requested while 0° phase is off"),
            Self::FrequencyMismatch { active, requested } => write!(
                f,
                "phase frequency mismatch (active {:?}, requested {:?})",
                active, requested
            ),
        }
    }
}

impl From<PwmError> for Error {
    fn from(e: PwmError) -> Self {
        Self::Pwm(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation.  The message names the field.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<HwInitError> for Error {
    fn from(e: HwInitError) -> Self {
        Self::Init(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
