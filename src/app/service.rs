//! Application service, the hexagonal core.
//!
//! [`AppService`] owns the charger, the MPPT tracker, the supervisor, the
//! charge policy, the frequency selector and the power manager.  All I/O
//! flows through port traits injected at call sites, making the entire
//! service testable with mock adapters.
//!
//! ```text
//!   SensorPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                  │          AppService           │
//! PowerStagePort ◀─│ Supervisor · Charger · Policy │
//!       LoadPort ◀─│ Frequency · MPPT · Power      │◀── ClockPort
//!                  └──────────────────────────────┘
//! ```
//!
//! One [`AppService::tick`] runs, in order:
//!
//! 1. read the measurement snapshot
//! 2. supervisor: temperature and load bits, load switch
//! 3. charger phase update
//! 4. charge on/off decision (charger command or policy)
//! 5. switching-frequency selection (adaptive mode only)
//! 6. MPPT step, only on ticks that neither started nor stopped charging
//! 7. status-change event and sleep decision

use log::{info, warn};

use crate::charger::{Charger, ChargerState, ChargerStatus, Transition};
use crate::config::SystemConfig;
use crate::control::{
    Ceilings, ChargeDecision, ChargePolicy, FrequencySelector, MpptAction, MpptTracker,
    PolicyInput,
};
use crate::drivers::power_stage::FrequencyMode;
use crate::power::PowerManager;
use crate::sensors::Measurements;
use crate::supervisor::{LoadAction, Supervisor};

use super::events::{AppEvent, TelemetryData};
use super::ports::{ClockPort, EventSink, LoadPort, PowerStagePort, SensorPort};

/// Outcome of one [`AppService::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub state: ChargerState,
    pub transition: Option<Transition>,
    pub decision: ChargeDecision,
    /// `None` when MPPT did not run this tick.
    pub mppt: Option<MpptAction>,
    /// Requested sleep period (s).
    pub sleep_secs: Option<u32>,
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService {
    config: SystemConfig,
    charger: Charger,
    mppt: MpptTracker,
    supervisor: Supervisor,
    policy: ChargePolicy,
    frequency: FrequencySelector,
    power: PowerManager,

    // Cached at the end of each tick for telemetry.
    last_meas: Measurements,
    last_now: u32,
    duty: u16,
    mode: FrequencyMode,

    tick_count: u64,
}

impl AppService {
    /// Construct the service from configuration.
    ///
    /// Does **not** start the charger; call [`AppService::start`] next.
    pub fn new(config: SystemConfig) -> Self {
        Self {
            charger: Charger::new(config.profile),
            mppt: MpptTracker::new(&config),
            supervisor: Supervisor::new(&config),
            policy: ChargePolicy::new(&config.profile),
            frequency: FrequencySelector::new(config.frequency_thresholds, FrequencyMode::High),
            power: PowerManager::new(&config),
            last_meas: Measurements::default(),
            last_now: 0,
            duty: 0,
            mode: FrequencyMode::High,
            tick_count: 0,
            config,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start the charger in Idle with the load disconnected.
    pub fn start(&mut self, load: &mut impl LoadPort, sink: &mut impl EventSink) {
        load.set_load(false);
        self.charger.start();
        sink.emit(&AppEvent::Started(self.charger.state()));
        info!("AppService started in {}", self.charger.state());
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control cycle.
    ///
    /// The `hw` parameter satisfies [`SensorPort`], [`PowerStagePort`]
    /// and [`LoadPort`] at once; this avoids a double mutable borrow
    /// while keeping the port boundary explicit.
    pub fn tick(
        &mut self,
        hw: &mut (impl SensorPort + PowerStagePort + LoadPort),
        clock: &mut impl ClockPort,
        sink: &mut impl EventSink,
    ) -> TickReport {
        self.tick_count += 1;

        // 1. Measure
        let meas = hw.read_all();
        self.last_meas = meas;
        let status_before = self.charger.status();

        // 2. Supervisor
        if let Some(action) = self.supervisor.evaluate(&meas, self.charger.status_mut()) {
            hw.set_load(action == LoadAction::Connect);
        }

        // 3. Charger phase
        let now = clock.now_secs();
        let transition = self.charger.update(&meas, now);
        if let Some(t) = transition {
            sink.emit(&AppEvent::StateChanged {
                from: t.from,
                to: t.to,
            });
        }

        // 4. On/off
        let decision = self.decide(&meas, now);
        let decision = self.apply_decision(decision, &meas, now, hw, clock, sink);

        // 5 + 6. Frequency and MPPT only while steadily charging
        let mut mppt = None;
        if decision == ChargeDecision::Continue {
            if self.config.adaptive_frequency {
                if let Some(mode) = self.frequency.select(meas.panel_current.value) {
                    hw.set_frequency(mode);
                    sink.emit(&AppEvent::FrequencyChanged(mode));
                }
            }

            let ceilings = Ceilings {
                voltage_mv: self.charger.target_voltage(),
                current_ma: self.charger.target_current(),
                overtemperature: self.charger.status().is_overtemperature(),
            };
            mppt = Some(self.mppt.update(&meas, ceilings, hw, now));
        }

        // 7. Status and sleep
        let status = self.charger.status();
        if status != status_before {
            sink.emit(&AppEvent::StatusChanged(status));
        }

        let after = clock.now_secs();
        let sleep_secs = self.power.check(status.is_charging(), after);
        if let Some(secs) = sleep_secs {
            sink.emit(&AppEvent::SleepRequested(secs));
        }

        self.last_now = after;
        self.duty = hw.duty();
        self.mode = hw.frequency();

        TickReport {
            state: self.charger.state(),
            transition,
            decision,
            mppt,
            sleep_secs,
        }
    }

    /// Account for a completed sleep period.
    pub fn wake_from_sleep(&mut self, clock: &mut impl ClockPort) {
        self.power.wake(clock);
    }

    // ── Queries ───────────────────────────────────────────────

    /// Build a telemetry snapshot from the last tick.
    pub fn build_telemetry(&self) -> TelemetryData {
        let m = &self.last_meas;
        TelemetryData {
            uptime_s: self.last_now,
            state: self.charger.state(),
            status: self.charger.status(),
            panel_mv: m.panel_voltage.value,
            panel_ma: m.panel_current.value,
            battery_mv: m.battery_voltage.value,
            charge_ma: m.charge_current.value,
            panel_cw: m.panel_power,
            charge_cw: m.charge_power,
            efficiency: m.efficiency,
            temperature_1_dk: m.temperature_1.value,
            temperature_2_dk: m.temperature_2.value,
            duty: self.duty,
            frequency: self.mode,
            target_mv: self.charger.target_voltage(),
            target_ma: self.charger.target_current(),
        }
    }

    pub fn state(&self) -> ChargerState {
        self.charger.state()
    }

    pub fn status(&self) -> ChargerStatus {
        self.charger.status()
    }

    pub fn charger(&self) -> &Charger {
        &self.charger
    }

    pub fn mppt(&self) -> &MpptTracker {
        &self.mppt
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // ── Internal ──────────────────────────────────────────────

    fn decide(&self, meas: &Measurements, now: u32) -> ChargeDecision {
        let status = self.charger.status();
        if self.charger.commands().start_charging
            && !status.is_charging()
            && !status.is_overtemperature()
        {
            return ChargeDecision::Start;
        }
        self.policy.decide(
            meas,
            PolicyInput {
                status,
                target_voltage: self.charger.target_voltage(),
                now,
                derate_exhausted: self.mppt.derate_exhausted(),
            },
        )
    }

    fn apply_decision(
        &mut self,
        decision: ChargeDecision,
        meas: &Measurements,
        now: u32,
        stage: &mut impl PowerStagePort,
        clock: &mut impl ClockPort,
        sink: &mut impl EventSink,
    ) -> ChargeDecision {
        match decision {
            ChargeDecision::Start => match self.charger.start_charging(meas, stage) {
                Ok(()) => {
                    self.mppt.reset(now);
                    self.frequency.sync(stage.frequency());
                    sink.emit(&AppEvent::ChargingStarted {
                        duty: stage.duty(),
                    });
                    decision
                }
                Err(e) => {
                    warn!("AppService: charging start failed: {e}");
                    ChargeDecision::StayOff
                }
            },
            ChargeDecision::Stop(reason) => {
                info!("AppService: stopping charge ({reason})");
                self.charger.stop_charging(stage, clock);
                sink.emit(&AppEvent::ChargingStopped(reason));
                decision
            }
            ChargeDecision::Continue | ChargeDecision::StayOff => decision,
        }
    }
}
