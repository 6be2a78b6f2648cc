//! Mock hardware adapter for integration tests.
//!
//! Serves a scripted measurement snapshot and records every power-stage
//! and load call so tests can assert on the full command history without
//! touching real LEDC/GPIO registers.  Duty and interlock semantics come
//! from a real host-side [`PowerStage`].

use slacc::app::events::AppEvent;
use slacc::app::ports::{EventSink, LoadPort, PowerStagePort, SensorPort};
use slacc::app::service::{AppService, TickReport};
use slacc::config::SystemConfig;
use slacc::drivers::power_stage::{DutyBounds, FrequencyMode, Phase, PowerStage};
use slacc::error::PwmError;
use slacc::sensors::Measurements;
use slacc::timebase::SimClock;

// ── Hardware call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwCall {
    EnablePhase(Phase, FrequencyMode),
    DisablePhase(Phase),
    SetDuty(u16),
    StepUp,
    StepDown,
    SetFrequency(FrequencyMode),
    SetLoad(bool),
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    /// Snapshot returned by the next `read_all`.
    pub meas: Measurements,
    pub stage: PowerStage,
    pub load_connected: bool,
    pub calls: Vec<HwCall>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new(meas: Measurements) -> Self {
        Self {
            meas,
            stage: PowerStage::new(),
            load_connected: false,
            calls: Vec::new(),
        }
    }

    pub fn is_switching(&self) -> bool {
        self.stage.is_enabled(Phase::Deg0) && self.stage.is_enabled(Phase::Deg180)
    }

    pub fn count(&self, call: HwCall) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

impl SensorPort for MockHardware {
    fn read_all(&mut self) -> Measurements {
        self.meas
    }
}

impl PowerStagePort for MockHardware {
    fn enable_phase(&mut self, phase: Phase, mode: FrequencyMode) -> Result<(), PwmError> {
        self.calls.push(HwCall::EnablePhase(phase, mode));
        self.stage.enable_phase(phase, mode)
    }

    fn disable_phase(&mut self, phase: Phase) {
        self.calls.push(HwCall::DisablePhase(phase));
        self.stage.disable_phase(phase);
    }

    fn set_duty(&mut self, value: u16) {
        self.calls.push(HwCall::SetDuty(value));
        self.stage.set_duty(value);
    }

    fn step_up(&mut self) -> bool {
        self.calls.push(HwCall::StepUp);
        self.stage.step_up()
    }

    fn step_down(&mut self) -> bool {
        self.calls.push(HwCall::StepDown);
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
        self.calls.push(HwCall::SetFrequency(mode));
        self.stage.set_frequency(mode);
    }

    fn is_enabled(&self, phase: Phase) -> bool {
        self.stage.is_enabled(phase)
    }
}

impl LoadPort for MockHardware {
    fn set_load(&mut self, connected: bool) {
        self.calls.push(HwCall::SetLoad(connected));
        self.load_connected = connected;
    }
}

// ── RecordingSink ─────────────────────────────────────────────

/// Event sink that keeps every event for later assertions.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Rig ───────────────────────────────────────────────────────

/// Service plus mocks plus a synthetic clock that advances one second
/// after every tick.
pub struct Rig {
    pub app: AppService,
    pub hw: MockHardware,
    pub clock: SimClock,
    pub sink: RecordingSink,
}

#[allow(dead_code)]
impl Rig {
    pub fn new(config: SystemConfig, meas: Measurements) -> Self {
        let mut rig = Self {
            app: AppService::new(config),
            hw: MockHardware::new(meas),
            clock: SimClock::new(0),
            sink: RecordingSink::new(),
        };
        rig.app.start(&mut rig.hw, &mut rig.sink);
        rig
    }

    pub fn with_defaults(meas: Measurements) -> Self {
        Self::new(SystemConfig::default(), meas)
    }

    pub fn tick(&mut self) -> TickReport {
        let report = self.app.tick(&mut self.hw, &mut self.clock, &mut self.sink);
        self.clock.advance(1);
        report
    }

    /// Tick up to `max` times until `done` holds for the report.
    pub fn tick_until(&mut self, max: usize, done: impl Fn(&TickReport) -> bool) -> Option<TickReport> {
        (0..max).map(|_| self.tick()).find(|r| done(r))
    }
}
