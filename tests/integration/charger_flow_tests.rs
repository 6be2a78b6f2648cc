//! Full charge-cycle tests: CC → CV → Trickle → CC driven through the
//! service with scripted battery readings.

use slacc::app::events::AppEvent;
use slacc::charger::{ChargerState, StatusFlag, Transition};
use slacc::control::{ChargeDecision, MpptAction, StopReason};
use slacc::sensors::Measurements;

use super::mock_hw::Rig;

fn sun(battery_mv: u16, charge_ma: u16) -> Measurements {
    Measurements::from_values(18_000, 2_000, battery_mv, charge_ma)
}

/// Rig that started charging at t=0 and entered CV at t=1.
fn rig_in_cv() -> Rig {
    let mut rig = Rig::with_defaults(sun(12_500, 2_500));
    rig.tick();
    rig.hw.meas = sun(14_300, 3_000);
    let r = rig.tick();
    assert_eq!(
        r.transition,
        Some(Transition {
            from: ChargerState::ConstantCurrent,
            to: ChargerState::ConstantVoltage
        })
    );
    rig
}

#[test]
fn bulk_hands_over_to_absorption_and_derates() {
    let mut rig = Rig::with_defaults(sun(12_500, 2_500));
    rig.tick();
    rig.hw.meas = sun(14_300, 3_000);
    let r = rig.tick();

    assert_eq!(r.state, ChargerState::ConstantVoltage);
    assert_eq!(r.mppt, Some(MpptAction::Derate { saturated: false }));
    assert_eq!(rig.hw.stage.duty(), 92);
    assert_eq!(rig.app.charger().target_voltage(), 14_200);
}

#[test]
fn tapered_current_ends_absorption() {
    let mut rig = rig_in_cv();
    rig.hw.meas = sun(14_200, 1_500);
    let r = rig.tick();

    assert_eq!(r.state, ChargerState::Trickle);
    assert_eq!(rig.app.charger().target_voltage(), 13_800);
    assert!(rig.app.status().contains(StatusFlag::Full));
    assert!(rig.app.status().is_charging());
    // Still above the new float target.
    assert!(matches!(r.mppt, Some(MpptAction::Derate { .. })));
    assert!(
        rig.sink
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::StatusChanged(s) if s.contains(StatusFlag::Full)))
    );
}

#[test]
fn absorption_times_out_without_taper() {
    let mut rig = rig_in_cv();
    rig.hw.meas = sun(14_100, 3_000);
    let r = rig
        .tick_until(8_000, |r| r.transition.is_some())
        .expect("CV never timed out");
    assert_eq!(r.transition.map(|t| t.to), Some(ChargerState::Trickle));
    // Entered CV at 1, leaves on the first reading past 7200 s.
    assert_eq!(rig.app.build_telemetry().uptime_s, 7_202);
}

#[test]
fn float_not_reached_returns_to_bulk() {
    let mut rig = rig_in_cv();
    rig.hw.meas = sun(14_200, 1_500);
    rig.tick();
    assert_eq!(rig.app.state(), ChargerState::Trickle);

    rig.hw.meas = sun(13_700, 1_500);
    let r = rig
        .tick_until(4_000, |r| r.transition.is_some())
        .expect("trickle never fell back to CC");

    assert_eq!(
        r.transition,
        Some(Transition {
            from: ChargerState::Trickle,
            to: ChargerState::ConstantCurrent
        })
    );
    assert_eq!(rig.app.build_telemetry().uptime_s, 3_603);
    assert!(!rig.app.status().contains(StatusFlag::Full));
    assert_eq!(rig.app.charger().target_voltage(), 14_200);
    assert_eq!(rig.app.charger().target_current(), 10_000);
}

#[test]
fn float_reached_keeps_trickle() {
    let mut rig = rig_in_cv();
    rig.hw.meas = sun(14_200, 1_500);
    rig.tick();

    rig.hw.meas = sun(13_850, 500);
    for _ in 0..4_000 {
        assert_eq!(rig.tick().transition, None);
    }
    assert_eq!(rig.app.state(), ChargerState::Trickle);
}

#[test]
fn stop_keeps_phase_and_resumes_in_absorption() {
    let mut rig = rig_in_cv();
    rig.hw.meas = Measurements::from_values(18_000, 10, 14_100, 0);
    let r = rig.tick();
    assert_eq!(r.decision, ChargeDecision::Stop(StopReason::PanelCurrentLow));
    assert_eq!(r.state, ChargerState::ConstantVoltage);

    rig.hw.meas = sun(14_100, 3_000);
    let r = rig
        .tick_until(20, |r| r.decision == ChargeDecision::Start)
        .expect("charging never resumed");
    assert_eq!(r.state, ChargerState::ConstantVoltage);
    assert!(r.transition.is_none());

    let starts = rig
        .sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::ChargingStarted { .. }))
        .count();
    assert_eq!(starts, 2);
}
