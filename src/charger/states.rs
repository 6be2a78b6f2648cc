//! Concrete charger state handlers and table builder.
//!
//! ```text
//!  IDLE ──[V_bat < recharge, idle > limit]──▶ CC
//!                                            │
//!                                [V_bat > target]
//!                                            ▼
//!  CC ◀──[limit not seen for interval]──┐    CV
//!                                       │    │
//!                                       │  [I < cutoff at limit] or [CV time limit]
//!                                       │    ▼
//!                                       └── TRICKLE
//! ```
//!
//! Trickle never returns to Idle: float charging does not harm a
//! lead-acid battery.

use log::info;

use super::context::ChargerContext;
use super::status::StatusFlag;
use super::{ChargerState, StateDescriptor};

/// Window within which the voltage limit must have been seen for the CV
/// current cutoff to count as "battery full" (s).
const CV_LIMIT_RECENT_SECS: u32 = 2;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

pub fn build_state_table() -> [StateDescriptor; ChargerState::COUNT] {
    [
        // 0: Idle
        StateDescriptor {
            id: ChargerState::Idle,
            name: "Idle",
            on_enter: None,
            on_exit: None,
            on_update: idle_update,
        },
        // 1: CC
        StateDescriptor {
            id: ChargerState::ConstantCurrent,
            name: "CC",
            on_enter: Some(cc_enter),
            on_exit: None,
            on_update: cc_update,
        },
        // 2: CV
        StateDescriptor {
            id: ChargerState::ConstantVoltage,
            name: "CV",
            on_enter: Some(cv_enter),
            on_exit: None,
            on_update: cv_update,
        },
        // 3: Trickle
        StateDescriptor {
            id: ChargerState::Trickle,
            name: "Trickle",
            on_enter: Some(trickle_enter),
            on_exit: Some(trickle_exit),
            on_update: trickle_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE
// ═══════════════════════════════════════════════════════════════════════════

fn idle_update(ctx: &mut ChargerContext) -> Option<ChargerState> {
    if ctx.meas.battery_voltage.value < ctx.profile.recharge_voltage
        && ctx.secs_in_state() > ctx.profile.recharge_time_limit
    {
        ctx.set_bulk_targets();
        ctx.commands.start_charging = true;
        return Some(ChargerState::ConstantCurrent);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  CC / bulk: full current until the CV ceiling is crossed
// ═══════════════════════════════════════════════════════════════════════════

fn cc_enter(ctx: &mut ChargerContext) {
    info!(
        "CC: bulk charging, limits {} mA / {} mV",
        ctx.target_current, ctx.target_voltage
    );
}

fn cc_update(ctx: &mut ChargerContext) -> Option<ChargerState> {
    if ctx.meas.battery_voltage.value > ctx.target_voltage {
        ctx.target_voltage = ctx.profile.max_voltage;
        return Some(ChargerState::ConstantVoltage);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  CV / absorption: hold the ceiling until current tapers or time runs out
// ═══════════════════════════════════════════════════════════════════════════

fn cv_enter(ctx: &mut ChargerContext) {
    info!(
        "CV: absorption at {} mV for up to {} s",
        ctx.target_voltage, ctx.profile.cv_time_limit
    );
}

fn cv_update(ctx: &mut ChargerContext) -> Option<ChargerState> {
    ctx.track_voltage_limit();

    // Hold for at least one second after entry.
    let in_state = ctx.secs_in_state();
    if in_state == 0 {
        return None;
    }

    let tapered = ctx.meas.charge_current.value < ctx.profile.current_cutoff_cv
        && ctx.secs_since_voltage_limit() < CV_LIMIT_RECENT_SECS;
    let timed_out = in_state > ctx.profile.cv_time_limit;

    if tapered || timed_out {
        info!(
            "CV: done ({}), {} mA after {} s",
            if tapered { "current cutoff" } else { "time limit" },
            ctx.meas.charge_current.value,
            in_state
        );
        ctx.target_voltage = ctx.profile.trickle_voltage;
        return Some(ChargerState::Trickle);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  TRICKLE / float: keep the battery topped up
// ═══════════════════════════════════════════════════════════════════════════

fn trickle_enter(ctx: &mut ChargerContext) {
    ctx.status.set(StatusFlag::Full);
    // Recharge interval counts from entry at the latest.
    ctx.voltage_limit_reached.mark(ctx.now);
    info!("TRICKLE: battery full, floating at {} mV", ctx.target_voltage);
}

fn trickle_exit(ctx: &mut ChargerContext) {
    ctx.status.clear(StatusFlag::Full);
}

fn trickle_update(ctx: &mut ChargerContext) -> Option<ChargerState> {
    ctx.track_voltage_limit();

    if ctx.secs_since_voltage_limit() > ctx.profile.trickle_recharge_interval {
        info!(
            "TRICKLE: float voltage not reached for {} s, back to bulk",
            ctx.profile.trickle_recharge_interval
        );
        ctx.set_bulk_targets();
        return Some(ChargerState::ConstantCurrent);
    }
    None
}
