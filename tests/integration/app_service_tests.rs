//! Integration tests for the AppService → charger/policy/MPPT → power
//! stage pipeline.
//!
//! These run on the host (x86_64) against the mock hardware and a
//! synthetic clock, checking the actuator calls and events that one or
//! more ticks produce.

use slacc::app::events::AppEvent;
use slacc::app::ports::ClockPort;
use slacc::charger::{ChargerState, StatusFlag, Transition};
use slacc::config::{SystemConfig, celsius_to_dk};
use slacc::control::{ChargeDecision, Direction, MpptAction, StopReason};
use slacc::drivers::power_stage::{FrequencyMode, Phase};
use slacc::sensors::{Measurements, TEMPERATURE_ABSENT};

use super::mock_hw::{HwCall, Rig};

/// 18 V panel delivering `panel_ma`, battery at `battery_mv` taking `charge_ma`.
fn sun(panel_ma: u16, battery_mv: u16, charge_ma: u16) -> Measurements {
    Measurements::from_values(18_000, panel_ma, battery_mv, charge_ma)
}

fn charging_rig() -> Rig {
    let mut rig = Rig::with_defaults(sun(2_000, 12_500, 2_500));
    let r = rig.tick();
    assert_eq!(r.decision, ChargeDecision::Start);
    rig
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn start_disconnects_load_and_emits_started() {
    let rig = Rig::with_defaults(sun(2_000, 12_500, 2_500));
    assert_eq!(rig.hw.calls, vec![HwCall::SetLoad(false)]);
    assert_eq!(rig.sink.events, vec![AppEvent::Started(ChargerState::Idle)]);
    assert_eq!(rig.app.state(), ChargerState::Idle);
}

#[test]
fn first_tick_starts_charging_with_duty_guess() {
    let mut rig = Rig::with_defaults(sun(2_000, 12_500, 2_500));
    let r = rig.tick();

    assert_eq!(
        r.transition,
        Some(Transition {
            from: ChargerState::Idle,
            to: ChargerState::ConstantCurrent
        })
    );
    assert_eq!(r.decision, ChargeDecision::Start);
    assert_eq!(r.mppt, None, "no MPPT step on the start tick");

    // 12500 × 127 / 18000 + 5 = 93
    assert_eq!(rig.hw.stage.duty(), 93);
    assert_eq!(rig.hw.stage.frequency(), FrequencyMode::High);
    assert!(rig.hw.is_switching());
    assert_eq!(
        rig.hw.count(HwCall::EnablePhase(Phase::Deg0, FrequencyMode::High)),
        1
    );
    assert!(rig.app.status().is_charging());
    assert!(rig.sink.contains(&AppEvent::ChargingStarted { duty: 93 }));
}

#[test]
fn healthy_battery_connects_load() {
    let mut rig = Rig::with_defaults(sun(2_000, 12_500, 2_500));
    rig.tick();
    assert!(rig.hw.load_connected);
    assert!(rig.app.status().contains(StatusFlag::LoadConnected));
}

// ── Tracking ──────────────────────────────────────────────────

#[test]
fn mppt_runs_on_following_ticks() {
    let mut rig = charging_rig();
    let r = rig.tick();
    assert_eq!(r.decision, ChargeDecision::Continue);
    assert_eq!(
        r.mppt,
        Some(MpptAction::Track {
            direction: Direction::Up,
            reversed: false
        })
    );
    assert_eq!(rig.hw.stage.duty(), 94);
}

#[test]
fn power_drop_reverses_tracking() {
    let mut rig = charging_rig();
    rig.tick();
    rig.hw.meas = sun(1_800, 12_500, 2_300);
    let r = rig.tick();
    assert_eq!(
        r.mppt,
        Some(MpptAction::Track {
            direction: Direction::Down,
            reversed: true
        })
    );
    assert_eq!(rig.hw.stage.duty(), 93);
}

// ── Stop / restart ────────────────────────────────────────────

#[test]
fn low_panel_current_stops_and_resets_clock() {
    let mut rig = charging_rig();
    rig.tick();
    rig.hw.meas = sun(10, 12_500, 0);
    let r = rig.tick();

    assert_eq!(r.decision, ChargeDecision::Stop(StopReason::PanelCurrentLow));
    assert!(!rig.hw.is_switching());
    assert_eq!(rig.hw.stage.duty(), 0);
    // Reset to 0 by the stop, then advanced once by the rig.
    assert_eq!(rig.clock.now_secs(), 1);
    assert_eq!(rig.app.state(), ChargerState::ConstantCurrent);
    assert!(!rig.app.status().is_charging());
    assert!(
        rig.sink
            .contains(&AppEvent::ChargingStopped(StopReason::PanelCurrentLow))
    );
}

#[test]
fn restart_waits_for_holdoff() {
    let mut rig = charging_rig();
    rig.hw.meas = sun(10, 12_500, 0);
    rig.tick();

    rig.hw.meas = sun(2_000, 12_500, 2_500);
    let r = rig.tick_until(20, |r| r.decision != ChargeDecision::StayOff);
    assert_eq!(r.map(|r| r.decision), Some(ChargeDecision::Start));
    // Started at clock 6, the first reading past the 5 s hold-off.
    assert_eq!(rig.clock.now_secs(), 7);
    assert!(rig.hw.is_switching());
}

#[test]
fn idle_controller_requests_sleep() {
    let mut rig = Rig::with_defaults(Measurements::from_values(0, 0, 12_500, 0));
    let r = rig
        .tick_until(40, |r| r.sleep_secs.is_some())
        .expect("controller never asked to sleep");
    assert_eq!(r.sleep_secs, Some(8));
    assert!(rig.sink.contains(&AppEvent::SleepRequested(8)));

    let before = rig.clock.now_secs();
    rig.app.wake_from_sleep(&mut rig.clock);
    assert_eq!(rig.clock.now_secs(), before + 8);
}

#[test]
fn no_sleep_while_charging() {
    let mut rig = charging_rig();
    for _ in 0..60 {
        assert_eq!(rig.tick().sleep_secs, None);
    }
}

// ── Supervision ───────────────────────────────────────────────

#[test]
fn overtemperature_derates_then_stops() {
    let mut rig = charging_rig();
    rig.hw.meas =
        sun(2_000, 12_500, 2_500).with_temperatures(celsius_to_dk(85), TEMPERATURE_ABSENT);

    let stop = rig.tick_until(200, |r| {
        if let Some(action) = r.mppt {
            assert!(matches!(action, MpptAction::Derate { .. }));
        }
        matches!(r.decision, ChargeDecision::Stop(_))
    });
    let derates = rig.hw.count(HwCall::StepDown);

    assert_eq!(
        stop.map(|r| r.decision),
        Some(ChargeDecision::Stop(StopReason::Overtemperature))
    );
    // 93 → 31 in single steps, plus the saturated step at 31.
    assert_eq!(derates, 63);
    assert!(rig.app.status().contains(StatusFlag::Overtemperature1));

    for _ in 0..10 {
        assert_eq!(rig.tick().decision, ChargeDecision::StayOff);
    }

    rig.hw.meas =
        sun(2_000, 12_500, 2_500).with_temperatures(celsius_to_dk(60), TEMPERATURE_ABSENT);
    assert_eq!(rig.tick().decision, ChargeDecision::Start);
    assert!(!rig.app.status().is_overtemperature());
}

#[test]
fn load_disconnects_on_low_battery() {
    let mut rig = charging_rig();
    assert!(rig.hw.load_connected);
    rig.hw.meas = sun(2_000, 10_400, 2_500);
    rig.tick();
    assert!(!rig.hw.load_connected);
    assert!(!rig.app.status().contains(StatusFlag::LoadConnected));
    assert_eq!(rig.hw.count(HwCall::SetLoad(false)), 2);
}

// ── Frequency ─────────────────────────────────────────────────

#[test]
fn adaptive_frequency_follows_panel_current() {
    let config = SystemConfig {
        adaptive_frequency: true,
        ..SystemConfig::default()
    };
    let mut rig = Rig::new(config, sun(300, 12_500, 400));
    rig.tick();
    assert_eq!(rig.hw.stage.duty(), 93);

    rig.tick();
    assert_eq!(rig.hw.stage.frequency(), FrequencyMode::Medium);
    assert_eq!(rig.hw.count(HwCall::SetFrequency(FrequencyMode::Medium)), 1);
    assert!(rig.sink.contains(&AppEvent::FrequencyChanged(FrequencyMode::Medium)));
    // 93 × 255 / 127 = 186, then one Medium step up.
    assert_eq!(rig.hw.stage.duty(), 188);

    rig.tick();
    assert_eq!(rig.hw.stage.frequency(), FrequencyMode::Medium);
}

#[test]
fn fixed_frequency_by_default() {
    let mut rig = Rig::with_defaults(sun(300, 12_500, 400));
    for _ in 0..5 {
        rig.tick();
    }
    assert_eq!(rig.hw.stage.frequency(), FrequencyMode::High);
    assert!(
        !rig.hw
            .calls
            .iter()
            .any(|c| matches!(c, HwCall::SetFrequency(_)))
    );
}

// ── Telemetry ─────────────────────────────────────────────────

#[test]
fn telemetry_reflects_last_tick() {
    let rig = charging_rig();
    let t = rig.app.build_telemetry();
    assert_eq!(t.state, ChargerState::ConstantCurrent);
    assert_eq!(t.duty, 93);
    assert_eq!(t.battery_mv, 12_500);
    assert!(t.status.is_charging());

    let json = serde_json::to_string(&t).unwrap();
    assert!(json.contains("\"duty\":93"));
    assert!(json.contains("\"state\":\"ConstantCurrent\""));
}
