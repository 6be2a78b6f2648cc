//! Perturb-and-observe maximum power point tracker.
//!
//! One [`MpptTracker::update`] per control interval while charging.
//! Branches in priority order:
//!
//! 1. **Derate**: battery above target voltage, charge current above
//!    target current, or an overtemperature flag → step down.
//! 2. **Low light**: panel current under the MPPT floor → drift the duty
//!    towards `max` so the battery cannot back-feed the panel.
//! 3. **Track**: reverse direction if power dropped since the last
//!    step, then step once in the tracked direction.
//!
//! The tracker only decides how hard to charge.  Whether to charge at
//! all lives in [`super::policy`].

use log::debug;

use crate::app::ports::PowerStagePort;
use crate::config::{PowerSignal, SystemConfig};
use crate::drivers::power_stage::raw_duty_guess;
use crate::sensors::Measurements;
use crate::timebase::TimeMark;

/// Controller's own supply draw, subtracted when comparing panel and
/// charge current in low light (mA).
const SELF_CONSUMPTION_MA: u16 = 10;

/// Low-light drift stops this many counts below `max`.
const LOW_LIGHT_HEADROOM: u16 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    fn reversed(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }
}

/// Regulation ceilings in force for this update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ceilings {
    pub voltage_mv: u16,
    pub current_ma: u16,
    pub overtemperature: bool,
}

/// What the tracker did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpptAction {
    /// Interval not elapsed.
    Hold,
    /// Stepped down to respect a ceiling.  `saturated` when already at `min`.
    Derate { saturated: bool },
    /// Low-light drift.  `reguessed` when the duty was reset to the buck
    /// estimate, `stepped` when it was raised.
    LowLight { reguessed: bool, stepped: bool },
    /// Hill-climb step.
    Track { direction: Direction, reversed: bool },
}

pub struct MpptTracker {
    signal: PowerSignal,
    interval_secs: u32,
    panel_current_min: u16,
    direction: Direction,
    /// Reference power of the previous update (cW).
    last_power: u16,
    last_step: TimeMark,
    derate_exhausted: bool,
}

impl MpptTracker {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            signal: config.mppt_power_signal,
            interval_secs: config.mppt_interval_secs,
            panel_current_min: config.profile.mppt_panel_current_min,
            direction: Direction::Up,
            last_power: 0,
            last_step: TimeMark::never(),
            derate_exhausted: false,
        }
    }

    /// Forget the previous operating point.  Call when charging starts.
    pub fn reset(&mut self, now: u32) {
        self.direction = Direction::Up;
        self.last_power = 0;
        self.last_step.mark(now);
        self.derate_exhausted = false;
    }

    pub fn update(
        &mut self,
        meas: &Measurements,
        ceilings: Ceilings,
        stage: &mut impl PowerStagePort,
        now: u32,
    ) -> MpptAction {
        if self.last_step.elapsed(now) < self.interval_secs {
            return MpptAction::Hold;
        }
        self.last_step.mark(now);

        let mut new_power = match self.signal {
            PowerSignal::Panel => meas.panel_power,
            PowerSignal::Output => meas.charge_power,
        };

        let action = if meas.battery_voltage.value > ceilings.voltage_mv
            || meas.charge_current.value > ceilings.current_ma
            || ceilings.overtemperature
        {
            let saturated = stage.step_down();
            self.derate_exhausted = saturated;
            MpptAction::Derate { saturated }
        } else if meas.panel_current.value < self.panel_current_min {
            self.derate_exhausted = false;
            let ceiling = stage.bounds().max.saturating_sub(LOW_LIGHT_HEADROOM);

            let reguessed = meas.panel_current.value
                > meas.charge_current.value.saturating_add(SELF_CONSUMPTION_MA);
            if reguessed {
                let guess = raw_duty_guess(
                    meas.battery_voltage.value,
                    meas.panel_voltage.value,
                    stage.frequency(),
                );
                stage.set_duty(guess.min(u32::from(ceiling)) as u16);
            }

            let stepped = stage.duty() < ceiling;
            if stepped {
                stage.step_up();
                self.direction = Direction::Up;
                // Forced step: keep it out of the next power comparison.
                new_power = 0;
            }
            MpptAction::LowLight { reguessed, stepped }
        } else {
            self.derate_exhausted = false;
            let reversed = self.last_power > new_power;
            if reversed {
                self.direction = self.direction.reversed();
            }
            match self.direction {
                Direction::Up => stage.step_up(),
                Direction::Down => stage.step_down(),
            };
            MpptAction::Track {
                direction: self.direction,
                reversed,
            }
        };

        debug!(
            "MPPT: {:?}, power {} -> {} cW, duty {}",
            action,
            self.last_power,
            new_power,
            stage.duty()
        );
        self.last_power = new_power;
        action
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Reference power for the next comparison (cW).
    pub fn last_power(&self) -> u16 {
        self.last_power
    }

    /// The last update derated and the duty was already at `min`.
    pub fn derate_exhausted(&self) -> bool {
        self.derate_exhausted
    }
}
