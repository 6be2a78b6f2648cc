//! Lead-acid charging state machine.
//!
//! Function-pointer FSM over four phases:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  StateTable                                                  │
//! │  ┌──────────┬───────────┬──────────┬───────────────────────┐ │
//! │  │ State    │ on_enter  │ on_exit  │ on_update             │ │
//! │  ├──────────┼───────────┼──────────┼───────────────────────┤ │
//! │  │ Idle     │     -     │    -     │ fn(ctx)->Option<>     │ │
//! │  │ CC       │ fn(ctx)   │    -     │ fn(ctx)->Option<>     │ │
//! │  │ CV       │ fn(ctx)   │    -     │ fn(ctx)->Option<>     │ │
//! │  │ Trickle  │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<>     │ │
//! │  └──────────┴───────────┴──────────┴───────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each [`Charger::update`] feeds one measurement snapshot and the current
//! clock reading through `on_update` of the current state and performs at
//! most one transition.  Handlers never touch the power stage: they raise
//! [`ChargerCommands`] that the application service applies through
//! [`Charger::start_charging`].
//!
//! The `Charging` status bit is independent of the phase.  A charger in
//! CV may have stopped switching because the panel went dark; it resumes
//! in CV when the panel comes back.

pub mod context;
pub mod states;
pub mod status;

use core::fmt;

use log::{info, warn};
use serde::Serialize;

use crate::app::ports::{ClockPort, PowerStagePort};
use crate::config::ChargingProfile;
use crate::drivers::power_stage::{FrequencyMode, Phase, initial_duty_guess};
use crate::error::PwmError;
use crate::sensors::Measurements;

pub use context::{ChargerCommands, ChargerContext};
pub use status::{ChargerStatus, StatusFlag};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Charging phase.  Must stay in sync with [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum ChargerState {
    Idle = 0,
    ConstantCurrent = 1,
    ConstantVoltage = 2,
    Trickle = 3,
}

impl ChargerState {
    pub const COUNT: usize = 4;

    /// Convert a table index back to a state.  Out-of-range panics in
    /// debug builds and falls back to `Idle` in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::ConstantCurrent,
            2 => Self::ConstantVoltage,
            3 => Self::Trickle,
            _ => {
                debug_assert!(false, "invalid charger state index: {idx}");
                Self::Idle
            }
        }
    }
}

impl fmt::Display for ChargerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::ConstantCurrent => write!(f, "CC"),
            Self::ConstantVoltage => write!(f, "CV"),
            Self::Trickle => write!(f, "Trickle"),
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

pub type StateActionFn = fn(&mut ChargerContext);

/// Returns `Some(next)` to transition, `None` to stay.
pub type StateUpdateFn = fn(&mut ChargerContext) -> Option<ChargerState>;

pub struct StateDescriptor {
    pub id: ChargerState,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

/// A state change performed by [`Charger::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ChargerState,
    pub to: ChargerState,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Charger {
    table: [StateDescriptor; ChargerState::COUNT],
    current: usize,
    ctx: ChargerContext,
}

impl Charger {
    /// New charger in `Idle` with bulk setpoints and no status bits.
    pub fn new(profile: ChargingProfile) -> Self {
        Self {
            table: states::build_state_table(),
            current: ChargerState::Idle as usize,
            ctx: ChargerContext::new(profile),
        }
    }

    /// Run the initial `on_enter`.  Call once before the first update.
    pub fn start(&mut self) {
        info!("Charger starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(&mut self.ctx);
        }
    }

    /// Evaluate the current state against `meas` at time `now` (s).
    ///
    /// Pending commands from the previous update are discarded.
    pub fn update(&mut self, meas: &Measurements, now: u32) -> Option<Transition> {
        self.ctx.now = now;
        self.ctx.meas = *meas;
        self.ctx.commands = ChargerCommands::default();

        let next = (self.table[self.current].on_update)(&mut self.ctx)?;
        let from = self.state();
        self.transition(next);
        Some(Transition { from, to: next })
    }

    /// Bring up both phases at high frequency with the ideal-buck duty
    /// estimate for `meas`, and set `Charging`.
    pub fn start_charging(
        &mut self,
        meas: &Measurements,
        stage: &mut impl PowerStagePort,
    ) -> Result<(), PwmError> {
        let mode = FrequencyMode::High;
        if stage.frequency() != mode {
            stage.set_frequency(mode);
        }
        let guess = initial_duty_guess(
            meas.battery_voltage.value,
            meas.panel_voltage.value,
            mode,
        );
        stage.set_duty(guess);

        if let Err(e) = stage
            .enable_phase(Phase::Deg0, mode)
            .and_then(|()| stage.enable_phase(Phase::Deg180, mode))
        {
            warn!("Charger: power stage refused to start: {e}");
            stage.disable_phase(Phase::Deg0);
            return Err(e);
        }

        self.ctx.status.set(StatusFlag::Charging);
        info!(
            "Charger: charging started, duty {} ({} mV panel, {} mV battery)",
            guess, meas.panel_voltage.value, meas.battery_voltage.value
        );
        Ok(())
    }

    /// Stop switching: clear `Charging`, zero the duty, drop both phases
    /// and reset the clock so the restart hold-off counts from now.
    ///
    /// The charging phase is left untouched.  The voltage-limit mark is
    /// dropped with the clock: a battery that was floating returns to
    /// bulk, and CV needs a fresh sighting before the taper counts.
    pub fn stop_charging(&mut self, stage: &mut impl PowerStagePort, clock: &mut impl ClockPort) {
        self.ctx.status.clear(StatusFlag::Charging);
        stage.set_duty(0);
        stage.disable_phase(Phase::Deg0);
        clock.set_secs(0);
        self.ctx.voltage_limit_reached.clear();
        info!("Charger: charging stopped in {}", self.state());
    }

    pub fn state(&self) -> ChargerState {
        ChargerState::from_index(self.current)
    }

    pub fn state_name(&self) -> &'static str {
        self.table[self.current].name
    }

    pub fn target_voltage(&self) -> u16 {
        self.ctx.target_voltage
    }

    pub fn target_current(&self) -> u16 {
        self.ctx.target_current
    }

    pub fn profile(&self) -> &ChargingProfile {
        &self.ctx.profile
    }

    pub fn status(&self) -> ChargerStatus {
        self.ctx.status
    }

    /// Status bits owned by other collaborators (load, temperature).
    pub fn status_mut(&mut self) -> &mut ChargerStatus {
        &mut self.ctx.status
    }

    /// Commands raised by the last update.
    pub fn commands(&self) -> ChargerCommands {
        self.ctx.commands
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next: ChargerState) {
        let next_idx = next as usize;

        info!(
            "Charger transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(&mut self.ctx);
        }

        self.current = next_idx;
        self.ctx.state_changed.mark(self.ctx.now);

        if let Some(enter) = self.table[self.current].on_enter {
            enter(&mut self.ctx);
        }
    }
}
