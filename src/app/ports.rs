//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (measurement hub, power stage, load switch, clock,
//! event sinks) implement these traits.  The
//! [`AppService`](super::service::AppService) consumes them via generics,
//! so the control core never touches hardware registers directly.

use crate::drivers::power_stage::{DutyBounds, FrequencyMode, Phase};
use crate::error::PwmError;
use crate::sensors::Measurements;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain calls this once per tick.
pub trait SensorPort {
    /// Sample every channel and return a unified snapshot.
    fn read_all(&mut self) -> Measurements;
}

// ───────────────────────────────────────────────────────────────
// Power stage port (driven adapter: domain → buck converter)
// ───────────────────────────────────────────────────────────────

/// Stepwise access to the two-phase buck stage.  Implementations own the
/// duty register and both phase enables and enforce the phase interlocks.
pub trait PowerStagePort {
    /// Enable one phase.  Rejects a 180° enable while 0° is off and any
    /// mode that differs from the running partner phase.
    fn enable_phase(&mut self, phase: Phase, mode: FrequencyMode) -> Result<(), PwmError>;

    /// Disable one phase.  Disabling 0° also disables 180°.
    fn disable_phase(&mut self, phase: Phase);

    /// Raw duty write, clamped to `[0, top]`.
    fn set_duty(&mut self, value: u16);

    /// One step up.  Returns `true` when already saturated at `max`.
    fn step_up(&mut self) -> bool;

    /// One step down.  Returns `true` when already saturated at `min`.
    fn step_down(&mut self) -> bool;

    fn duty(&self) -> u16;

    fn bounds(&self) -> DutyBounds;

    fn frequency(&self) -> FrequencyMode;

    /// Move both phases to `mode`, rescaling the duty.
    fn set_frequency(&mut self, mode: FrequencyMode);

    fn is_enabled(&self, phase: Phase) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Load port (driven adapter: domain → load switch)
// ───────────────────────────────────────────────────────────────

pub trait LoadPort {
    fn set_load(&mut self, connected: bool);
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: timer → domain)
// ───────────────────────────────────────────────────────────────

/// Seconds timebase.  May jump backwards (reset to 0 on charging stop).
pub trait ClockPort {
    fn now_secs(&self) -> u32;

    fn set_secs(&mut self, secs: u32);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
