//! Two-phase synchronous buck power stage.
//!
//! Two LEDC channels share one timer and drive the 0° and 180° half
//! bridges.  The 180° channel is offset by half a period through the
//! LEDC `hpoint` register.  Both phases always carry the same duty.
//!
//! ## Interlocks
//!
//! - The 180° phase can only be enabled while the 0° phase runs.
//! - Both phases run at the same [`FrequencyMode`].  Enabling one phase
//!   at a mode that differs from its running partner is rejected.
//! - Disabling the 0° phase takes the 180° phase down with it.
//! - While the stage is enabled the duty is kept inside
//!   `[min, max]`; `max` stays below `top` so the high-side bootstrap
//!   capacitor recharges every period.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: [`PhaseChannel`] writes the LEDC registers via hw_init.
//! On host/test: the channel only tracks its duty in memory.

use core::convert::Infallible;

use embedded_hal::pwm::{ErrorType, SetDutyCycle};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::app::ports::PowerStagePort;
use crate::drivers::hw_init;
use crate::error::PwmError;

// ---------------------------------------------------------------------------
// Frequency modes
// ---------------------------------------------------------------------------

/// Switching frequency / duty resolution trade-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrequencyMode {
    /// ~1 kHz.  Duty is pinned at `max`; used at very low panel current.
    Minimal,
    /// 62.5 kHz, 8-bit resolution.
    Medium,
    /// 125 kHz, 7-bit resolution.
    High,
}

impl FrequencyMode {
    /// Timer counter top (full-scale duty).
    pub const fn top(self) -> u16 {
        match self {
            Self::Minimal | Self::Medium => 255,
            Self::High => 127,
        }
    }

    /// Duty increment of a single MPPT step.
    pub const fn step(self) -> u16 {
        match self {
            Self::Minimal | Self::Medium => 2,
            Self::High => 1,
        }
    }

    /// Highest permitted duty.  One step short of `top` for bootstrapping.
    pub const fn max(self) -> u16 {
        self.top() - self.step()
    }

    /// Lowest permitted duty while switching.
    pub const fn min(self) -> u16 {
        match self {
            Self::Minimal => self.max(),
            Self::Medium | Self::High => self.top() * 25 / 100,
        }
    }

    /// Offset added to the ideal-buck duty estimate when charging starts.
    pub const fn init_offset(self) -> u16 {
        self.top() * 4 / 100
    }

    pub const fn frequency_hz(self) -> u32 {
        match self {
            Self::Minimal => 1_000,
            Self::Medium => 62_500,
            Self::High => 125_000,
        }
    }

    /// LEDC timer resolution in bits.
    pub const fn resolution_bits(self) -> u32 {
        match self {
            Self::Minimal | Self::Medium => 8,
            Self::High => 7,
        }
    }

    pub const fn bounds(self) -> DutyBounds {
        DutyBounds {
            min: self.min(),
            max: self.max(),
            top: self.top(),
            step: self.step(),
        }
    }
}

/// Duty limits of the active frequency mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyBounds {
    pub min: u16,
    pub max: u16,
    pub top: u16,
    pub step: u16,
}

impl DutyBounds {
    pub fn clamp(&self, duty: u16) -> u16 {
        duty.clamp(self.min, self.max)
    }
}

/// Ideal-buck duty estimate `V_bat * top / V_panel + offset`, clamped to
/// the mode's bounds.  A zero panel voltage is treated as 1 mV.
pub fn initial_duty_guess(battery_mv: u16, panel_mv: u16, mode: FrequencyMode) -> u16 {
    let guess = raw_duty_guess(battery_mv, panel_mv, mode);
    mode.bounds().clamp(guess.min(u32::from(u16::MAX)) as u16)
}

/// Unclamped duty estimate.  Saturates into `u16`.
pub fn raw_duty_guess(battery_mv: u16, panel_mv: u16, mode: FrequencyMode) -> u32 {
    let denominator = u32::from(panel_mv.max(1));
    u32::from(battery_mv) * u32::from(mode.top()) / denominator + u32::from(mode.init_offset())
}

// ---------------------------------------------------------------------------
// Phase channel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Deg0,
    Deg180,
}

impl Phase {
    const fn index(self) -> usize {
        match self {
            Self::Deg0 => 0,
            Self::Deg180 => 1,
        }
    }

    /// LEDC `hpoint` that yields this phase's offset for a given top.
    pub const fn hpoint(self, mode: FrequencyMode) -> u32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg180 => (mode.top() as u32 + 1) / 2,
        }
    }
}

/// One LEDC channel driving one half bridge.
pub struct PhaseChannel {
    phase: Phase,
    ledc_channel: u32,
    mode: FrequencyMode,
    duty: u16,
    enabled: bool,
}

impl PhaseChannel {
    pub fn new(phase: Phase, ledc_channel: u32) -> Self {
        Self {
            phase,
            ledc_channel,
            mode: FrequencyMode::High,
            duty: 0,
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn duty(&self) -> u16 {
        self.duty
    }

    fn start(&mut self, mode: FrequencyMode) {
        self.mode = mode;
        self.enabled = true;
        hw_init::ledc_start_phase(
            self.ledc_channel,
            self.duty.min(mode.top()),
            self.phase.hpoint(mode),
        );
    }

    fn stop(&mut self) {
        self.enabled = false;
        hw_init::ledc_stop_phase(self.ledc_channel);
    }
}

impl ErrorType for PhaseChannel {
    type Error = Infallible;
}

impl SetDutyCycle for PhaseChannel {
    fn max_duty_cycle(&self) -> u16 {
        self.mode.top()
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.duty = duty.min(self.mode.top());
        if self.enabled {
            hw_init::ledc_set_phase_duty(
                self.ledc_channel,
                self.duty,
                self.phase.hpoint(self.mode),
            );
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Power stage
// ---------------------------------------------------------------------------

/// Both buck phases plus the shared duty register.
pub struct PowerStage {
    channels: [PhaseChannel; 2],
    mode: FrequencyMode,
    duty: u16,
}

impl Default for PowerStage {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerStage {
    pub fn new() -> Self {
        Self {
            channels: [
                PhaseChannel::new(Phase::Deg0, hw_init::LEDC_CH_PHASE_0),
                PhaseChannel::new(Phase::Deg180, hw_init::LEDC_CH_PHASE_180),
            ],
            mode: FrequencyMode::High,
            duty: 0,
        }
    }

    /// Start one phase at `mode`.
    pub fn enable_phase(&mut self, phase: Phase, mode: FrequencyMode) -> Result<(), PwmError> {
        let partner = match phase {
            Phase::Deg0 => Phase::Deg180,
            Phase::Deg180 => Phase::Deg0,
        };

        if phase == Phase::Deg180 && !self.is_enabled(Phase::Deg0) {
            return Err(PwmError::LeadPhaseDisabled);
        }
        if self.is_enabled(partner) && mode != self.mode {
            return Err(PwmError::FrequencyMismatch {
                active: self.mode,
                requested: mode,
            });
        }

        if !self.is_enabled(Phase::Deg0) && !self.is_enabled(Phase::Deg180) {
            // Idle stage: carry the duty over to the new top, then into bounds.
            let duty = rescale(self.duty, self.mode, mode);
            self.mode = mode;
            self.write_duty(mode.bounds().clamp(duty));
            hw_init::ledc_configure_timer(mode.frequency_hz(), mode.resolution_bits());
            hw_init::gate_driver_enable(true);
        } else if mode != self.mode {
            self.set_frequency(mode);
        }

        let duty = self.duty;
        let ch = &mut self.channels[phase.index()];
        let _ = ch.set_duty_cycle(duty);
        ch.start(mode);
        info!("power stage: {:?} phase enabled at {:?}", phase, mode);
        Ok(())
    }

    /// Stop one phase.  Stopping 0° also stops 180°.
    pub fn disable_phase(&mut self, phase: Phase) {
        if phase == Phase::Deg0 && self.is_enabled(Phase::Deg180) {
            self.disable_phase(Phase::Deg180);
        }
        let ch = &mut self.channels[phase.index()];
        if ch.is_enabled() {
            ch.stop();
            info!("power stage: {:?} phase disabled", phase);
        }
        if !self.is_enabled(Phase::Deg0) && !self.is_enabled(Phase::Deg180) {
            hw_init::gate_driver_enable(false);
        }
    }

    /// Raw duty write, clamped to `[0, top]`.  Does not enforce `[min, max]`.
    pub fn set_duty(&mut self, value: u16) {
        self.write_duty(value.min(self.mode.top()));
    }

    /// Raise the duty by one step.  Returns `true` if it was already at `max`.
    pub fn step_up(&mut self) -> bool {
        let b = self.bounds();
        let saturated = self.duty >= b.max;
        let next = if saturated {
            b.max
        } else {
            b.clamp(self.duty.saturating_add(b.step))
        };
        self.write_duty(next);
        saturated
    }

    /// Lower the duty by one step.  Returns `true` if it was already at `min`.
    pub fn step_down(&mut self) -> bool {
        let b = self.bounds();
        let saturated = self.duty <= b.min;
        let next = if saturated {
            b.min
        } else {
            b.clamp(self.duty.saturating_sub(b.step))
        };
        self.write_duty(next);
        saturated
    }

    pub fn duty(&self) -> u16 {
        self.duty
    }

    pub fn bounds(&self) -> DutyBounds {
        self.mode.bounds()
    }

    pub fn frequency(&self) -> FrequencyMode {
        self.mode
    }

    pub fn is_enabled(&self, phase: Phase) -> bool {
        self.channels[phase.index()].is_enabled()
    }

    /// Switch both phases to `mode` together.  The duty is rescaled to
    /// the new top and, while running, clamped into the new bounds.
    pub fn set_frequency(&mut self, mode: FrequencyMode) {
        if mode == self.mode {
            return;
        }
        let old = self.mode;
        let old_duty = self.duty;
        let rescaled = rescale(self.duty, old, mode);
        self.mode = mode;

        let running = self.is_enabled(Phase::Deg0);
        let duty = if running {
            mode.bounds().clamp(rescaled)
        } else {
            rescaled.min(mode.top())
        };

        if running {
            hw_init::ledc_configure_timer(mode.frequency_hz(), mode.resolution_bits());
            for ch in &mut self.channels {
                if ch.is_enabled() {
                    ch.start(mode);
                }
            }
        }
        self.write_duty(duty);
        info!(
            "power stage: frequency {:?} -> {:?}, duty {} -> {}",
            old, mode, old_duty, duty
        );
    }

    fn write_duty(&mut self, duty: u16) {
        if duty != self.duty {
            debug!("power stage: duty {} -> {}", self.duty, duty);
        }
        self.duty = duty;
        for ch in &mut self.channels {
            ch.mode = self.mode;
            let _ = ch.set_duty_cycle(duty);
        }
    }
}

/// Same fraction of full scale under a different top.
fn rescale(duty: u16, from: FrequencyMode, to: FrequencyMode) -> u16 {
    let scaled = u32::from(duty) * u32::from(to.top()) / u32::from(from.top());
    scaled.min(u32::from(to.top())) as u16
}

// ---------------------------------------------------------------------------
// Port implementation
// ---------------------------------------------------------------------------

impl PowerStagePort for PowerStage {
    fn enable_phase(&mut self, phase: Phase, mode: FrequencyMode) -> Result<(), PwmError> {
        PowerStage::enable_phase(self, phase, mode)
    }

    fn disable_phase(&mut self, phase: Phase) {
        PowerStage::disable_phase(self, phase);
    }

    fn set_duty(&mut self, value: u16) {
        PowerStage::set_duty(self, value);
    }

    fn step_up(&mut self) -> bool {
        PowerStage::step_up(self)
    }

    fn step_down(&mut self) -> bool {
        PowerStage::step_down(self)
    }

    fn duty(&self) -> u16 {
        PowerStage::duty(self)
    }

    fn bounds(&self) -> DutyBounds {
        PowerStage::bounds(self)
    }

    fn frequency(&self) -> FrequencyMode {
        PowerStage::frequency(self)
    }

    fn set_frequency(&mut self, mode: FrequencyMode) {
        PowerStage::set_frequency(self, mode);
    }

    fn is_enabled(&self, phase: Phase) -> bool {
        PowerStage::is_enabled(self, phase)
    }
}
