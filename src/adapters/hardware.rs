//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the [`SensorHub`], the [`PowerStage`] and the [`LoadSwitch`],
//! exposing them through [`SensorPort`], [`PowerStagePort`] and
//! [`LoadPort`].  This is the only module in the system that touches
//! actual hardware.  On non-espidf targets, the underlying drivers use
//! cfg-gated simulation stubs.

use crate::app::ports::{LoadPort, PowerStagePort, SensorPort};
use crate::config::SystemConfig;
use crate::drivers::hw_init;
use crate::drivers::load_switch::LoadSwitch;
use crate::drivers::power_stage::{DutyBounds, FrequencyMode, Phase, PowerStage};
use crate::error::PwmError;
use crate::sensors::{Measurements, SensorHub};

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    sensor_hub: SensorHub,
    stage: PowerStage,
    load: LoadSwitch,
}

impl HardwareAdapter {
    pub fn new(sensor_hub: SensorHub, stage: PowerStage, load: LoadSwitch) -> Self {
        Self {
            sensor_hub,
            stage,
            load,
        }
    }

    /// Check `config`, bring up the peripherals and return an adapter
    /// with the stage stopped and the load disconnected.
    pub fn bring_up(config: &SystemConfig) -> crate::error::Result<Self> {
        config.validate()?;
        hw_init::init_peripherals()?;
        let mut hw = Self::new(SensorHub::new(), PowerStage::new(), LoadSwitch::new());
        hw.all_off();
        Ok(hw)
    }

    /// Stop switching and drop the load.
    pub fn all_off(&mut self) {
        self.stage.set_duty(0);
        self.stage.disable_phase(Phase::Deg0);
        self.load.set(false);
    }

    pub fn is_load_connected(&self) -> bool {
        self.load.is_connected()
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl SensorPort for HardwareAdapter {
    fn read_all(&mut self) -> Measurements {
        self.sensor_hub.read_all()
    }
}

// ── PowerStagePort implementation ─────────────────────────────

impl PowerStagePort for HardwareAdapter {
    fn enable_phase(&mut self, phase: Phase, mode: FrequencyMode) -> Result<(), PwmError> {
        self.stage.enable_phase(phase, mode)
    }

    fn disable_phase(&mut self, phase: Phase) {
        self.stage.disable_phase(phase);
    }

    fn set_duty(&mut self, value: u16) {
        self.stage.set_duty(value);
    }

    fn step_up(&mut self) -> bool {
        self.stage.step_up()
    }

    fn step_down(&mut self) -> bool {
        self.stage.step_down()
    }

    fn duty(&self) -> u16 {
        self.stage.duty()
    }

    fn bounds(&self) -> DutyBounds {
        self.stage.bounds()
    }

    fn frequency(&self) -> FrequencyMode {
        self.stage.frequency()
    }

    fn set_frequency(&mut self, mode: FrequencyMode) {
        self.stage.set_frequency(mode);
    }

    fn is_enabled(&self, phase: Phase) -> bool {
        self.stage.is_enabled(phase)
    }
}

// ── LoadPort implementation ───────────────────────────────────

impl LoadPort for HardwareAdapter {
    fn set_load(&mut self, connected: bool) {
        self.load.set(connected);
    }
}
