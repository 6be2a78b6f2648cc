//! Property tests for the control-path invariants.
//!
//! Runs on host (x86_64) only; proptest is not available for ESP32 targets.
//! On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use proptest::prelude::*;

use slacc::app::ports::ClockPort;
use slacc::charger::{Charger, ChargerState};
use slacc::config::{ChargingProfile, SystemConfig, celsius_to_dk};
use slacc::control::{Ceilings, FrequencySelector, MpptTracker};
use slacc::drivers::power_stage::{FrequencyMode, Phase, PowerStage, initial_duty_guess};
use slacc::sensors::{Measurements, TEMPERATURE_ABSENT};
use slacc::timebase::SimClock;

fn arb_mode() -> impl Strategy<Value = FrequencyMode> {
    prop_oneof![
        Just(FrequencyMode::Minimal),
        Just(FrequencyMode::Medium),
        Just(FrequencyMode::High),
    ]
}

fn arb_meas() -> impl Strategy<Value = Measurements> {
    (
        0u16..=25_000,
        0u16..=12_000,
        9_000u16..=15_500,
        0u16..=12_000,
        prop_oneof![Just(TEMPERATURE_ABSENT), 2_731u16..=3_800],
    )
        .prop_map(|(pv, pi, bv, bi, t)| {
            Measurements::from_values(pv, pi, bv, bi).with_temperatures(t, TEMPERATURE_ABSENT)
        })
}

fn running_stage(mode: FrequencyMode, duty: u16) -> PowerStage {
    let mut stage = PowerStage::new();
    stage.set_frequency(mode);
    stage.set_duty(mode.bounds().clamp(duty));
    stage.enable_phase(Phase::Deg0, mode).unwrap();
    stage.enable_phase(Phase::Deg180, mode).unwrap();
    stage
}

// ── Duty bounds ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum StageOp {
    Up,
    Down,
    Frequency(FrequencyMode),
}

fn arb_stage_op() -> impl Strategy<Value = StageOp> {
    prop_oneof![
        4 => Just(StageOp::Up),
        4 => Just(StageOp::Down),
        1 => arb_mode().prop_map(StageOp::Frequency),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(10_000))]

    /// A running stage never leaves `[min, max]` of its active mode,
    /// whatever mix of steps and frequency changes it sees.
    #[test]
    fn duty_stays_in_bounds(
        mode in arb_mode(),
        start in 0u16..=255,
        ops in proptest::collection::vec(arb_stage_op(), 1..=64),
    ) {
        let mut stage = running_stage(mode, start);
        for op in ops {
            match op {
                StageOp::Up => { stage.step_up(); }
                StageOp::Down => { stage.step_down(); }
                StageOp::Frequency(m) => stage.set_frequency(m),
            }
            let b = stage.bounds();
            prop_assert!(
                (b.min..=b.max).contains(&stage.duty()),
                "duty {} outside [{}, {}] in {:?}", stage.duty(), b.min, b.max, stage.frequency()
            );
        }
    }

    /// Starting an idle stage at any mode lands inside that mode's bounds,
    /// whatever duty and mode it was left with.
    #[test]
    fn enable_lands_in_bounds(
        idle_mode in arb_mode(),
        mode in arb_mode(),
        duty in any::<u16>(),
    ) {
        let mut stage = PowerStage::new();
        stage.set_frequency(idle_mode);
        stage.set_duty(duty);
        stage.enable_phase(Phase::Deg0, mode).unwrap();
        let b = mode.bounds();
        prop_assert!((b.min..=b.max).contains(&stage.duty()));
    }

    /// The start-of-charge estimate is always a legal operating point.
    #[test]
    fn initial_guess_in_bounds(
        battery in any::<u16>(),
        panel in any::<u16>(),
        mode in arb_mode(),
    ) {
        let guess = initial_duty_guess(battery, panel, mode);
        let b = mode.bounds();
        prop_assert!((b.min..=b.max).contains(&guess));
    }

    /// One selector call moves at most one frequency step.
    #[test]
    fn frequency_moves_one_step(
        initial in arb_mode(),
        samples in proptest::collection::vec(0u16..=12_000, 1..=32),
    ) {
        let rank = |m: FrequencyMode| match m {
            FrequencyMode::Minimal => 0i8,
            FrequencyMode::Medium => 1,
            FrequencyMode::High => 2,
        };
        let mut selector = FrequencySelector::new(SystemConfig::default().frequency_thresholds, initial);
        for ma in samples {
            let before = selector.mode();
            if let Some(next) = selector.select(ma) {
                prop_assert_eq!((rank(next) - rank(before)).abs(), 1);
            }
        }
    }
}

// ── Charger ───────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    /// A second update at the same timestamp with the same readings never
    /// transitions again, including right after the clock was reset.
    #[test]
    fn charger_update_is_idempotent(
        steps in proptest::collection::vec(
            (arb_meas(), 0u32..=4_000, proptest::bool::weighted(0.1)),
            1..=48,
        ),
    ) {
        let mut charger = Charger::new(ChargingProfile::default());
        charger.start();
        let mut now = 0u32;
        for (meas, dt, reset) in steps {
            now = if reset { 0 } else { now.saturating_add(dt) };
            charger.update(&meas, now);
            let state = charger.state();
            prop_assert_eq!(charger.update(&meas, now), None);
            prop_assert_eq!(charger.state(), state);
        }
    }

    /// Once a stop has reset the clock, a dark battery below the bulk
    /// target never counts as full, whatever phase the charger was in.
    #[test]
    fn stop_never_fakes_full(
        before in proptest::collection::vec((arb_meas(), 0u32..=4_000), 1..=48),
        dark in proptest::collection::vec((9_000u16..14_200, 0u32..=60), 1..=32),
    ) {
        let mut charger = Charger::new(ChargingProfile::default());
        charger.start();
        let mut now = 0u32;
        for (meas, dt) in before {
            now = now.saturating_add(dt);
            charger.update(&meas, now);
        }

        let mut stage = PowerStage::new();
        let mut clock = SimClock::new(now);
        charger.stop_charging(&mut stage, &mut clock);

        let mut now = clock.now_secs();
        for (battery_mv, dt) in dark {
            now += dt;
            let meas = Measurements::from_values(0, 0, battery_mv, 0);
            let t = charger.update(&meas, now);
            prop_assert_ne!(t.map(|t| t.to), Some(ChargerState::Trickle));
        }
    }

    /// Targets always come from the profile.
    #[test]
    fn charger_targets_follow_profile(
        steps in proptest::collection::vec((arb_meas(), 0u32..=4_000), 1..=48),
    ) {
        let profile = ChargingProfile::default();
        let mut charger = Charger::new(profile);
        charger.start();
        let mut now = 0u32;
        for (meas, dt) in steps {
            now = now.saturating_add(dt);
            charger.update(&meas, now);
            let v = charger.target_voltage();
            prop_assert!(v == profile.max_voltage || v == profile.trickle_voltage);
            prop_assert_eq!(charger.target_current(), profile.max_charge_current);
        }
    }
}

// ── MPPT ──────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(10_000))]

    /// While any ceiling is violated the tracker never raises the duty.
    #[test]
    fn mppt_never_raises_duty_over_ceiling(
        mode in prop_oneof![Just(FrequencyMode::Medium), Just(FrequencyMode::High)],
        duty in 0u16..=255,
        meas in arb_meas(),
        violated in 0u8..3,
    ) {
        let battery = meas.battery_voltage.value;
        let charge = meas.charge_current.value;
        let mut ceilings = Ceilings {
            voltage_mv: battery.saturating_add(100),
            current_ma: charge.saturating_add(100),
            overtemperature: false,
        };
        match violated {
            0 => ceilings.voltage_mv = battery - 1,
            1 if charge > 0 => ceilings.current_ma = charge - 1,
            _ => ceilings.overtemperature = true,
        }

        let mut stage = running_stage(mode, duty);
        let mut mppt = MpptTracker::new(&SystemConfig::default());
        mppt.reset(0);
        let before = stage.duty();
        mppt.update(&meas, ceilings, &mut stage, 1);
        prop_assert!(stage.duty() <= before);
    }

    /// Overtemperature pushes the duty to `min` within `(max - min) / step + 1` updates.
    #[test]
    fn overtemperature_reaches_min(duty in 0u16..=127) {
        let meas = Measurements::from_values(18_000, 2_000, 12_500, 2_500)
            .with_temperatures(celsius_to_dk(90), TEMPERATURE_ABSENT);
        let ceilings = Ceilings { voltage_mv: 14_200, current_ma: 10_000, overtemperature: true };
        let mut stage = running_stage(FrequencyMode::High, duty);
        let mut mppt = MpptTracker::new(&SystemConfig::default());
        mppt.reset(0);

        let b = stage.bounds();
        let updates = u32::from((b.max - b.min) / b.step) + 1;
        for now in 1..=updates {
            mppt.update(&meas, ceilings, &mut stage, now);
        }
        prop_assert_eq!(stage.duty(), b.min);
        prop_assert!(mppt.derate_exhausted());
    }
}
