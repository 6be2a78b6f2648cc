//! Seconds timebase shared between the timer callback and the control loop.
//!
//! ```text
//!  esp_timer cb ──▶ on_timer_interrupt(ms) ──▶ SYSTEM_CLOCK ◀── ClockPort (main loop)
//! ```
//!
//! The counter is free-running and may be reset (stop-charging zeroes it,
//! sleep wake-up advances it).  Durations are therefore measured with
//! [`TimeMark`], which re-bases itself when it observes the clock below
//! its reference instead of producing a wrapped difference.  Marks that
//! record an event rather than a start time are forgotten instead, so a
//! reset never makes an old event look recent.

use core::cell::Cell;

use critical_section::Mutex;

use crate::app::ports::ClockPort;

// ---------------------------------------------------------------------------
// TickClock
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
struct Ticks {
    secs: u32,
    /// Sub-second remainder (0..1000).
    ms: u16,
}

/// Seconds counter advanced from timer context.
pub struct TickClock {
    ticks: Mutex<Cell<Ticks>>,
}

/// The one clock the firmware runs on.
pub static SYSTEM_CLOCK: TickClock = TickClock::new();

/// Advance [`SYSTEM_CLOCK`].  Called from the periodic timer callback.
pub fn on_timer_interrupt(interval_ms: u32) {
    SYSTEM_CLOCK.advance_ms(interval_ms);
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickClock {
    pub const fn new() -> Self {
        Self {
            ticks: Mutex::new(Cell::new(Ticks { secs: 0, ms: 0 })),
        }
    }

    pub fn advance_ms(&self, interval_ms: u32) {
        critical_section::with(|cs| {
            let cell = self.ticks.borrow(cs);
            let mut t = cell.get();
            let total_ms = u32::from(t.ms) + interval_ms;
            t.secs = t.secs.wrapping_add(total_ms / 1000);
            t.ms = (total_ms % 1000) as u16;
            cell.set(t);
        });
    }

    pub fn now_secs(&self) -> u32 {
        critical_section::with(|cs| self.ticks.borrow(cs).get().secs)
    }

    /// Overwrite the seconds counter and drop the sub-second remainder.
    pub fn set_secs(&self, secs: u32) {
        critical_section::with(|cs| self.ticks.borrow(cs).set(Ticks { secs, ms: 0 }));
    }
}

impl ClockPort for &TickClock {
    fn now_secs(&self) -> u32 {
        TickClock::now_secs(self)
    }

    fn set_secs(&mut self, secs: u32) {
        TickClock::set_secs(self, secs);
    }
}

// ---------------------------------------------------------------------------
// TimeMark
// ---------------------------------------------------------------------------

/// Reference timestamp for overflow- and reset-safe duration checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeMark {
    at: Option<u32>,
}

impl TimeMark {
    /// A mark that has never been set.  Reports `u32::MAX` elapsed.
    pub const fn never() -> Self {
        Self { at: None }
    }

    pub const fn at(secs: u32) -> Self {
        Self { at: Some(secs) }
    }

    pub fn mark(&mut self, now: u32) {
        self.at = Some(now);
    }

    pub fn is_set(&self) -> bool {
        self.at.is_some()
    }

    pub fn clear(&mut self) {
        self.at = None;
    }

    /// Seconds since the mark.  If the clock went backwards (reset or
    /// wrap) the mark moves to `now` and 0 is returned.
    pub fn elapsed(&mut self, now: u32) -> u32 {
        match self.at {
            None => u32::MAX,
            Some(at) if now < at => {
                self.at = Some(now);
                0
            }
            Some(at) => now - at,
        }
    }

    /// Like [`elapsed`](Self::elapsed), but a clock seen below the mark
    /// drops it: the event counts as never seen, not as just now.
    pub fn elapsed_or_forget(&mut self, now: u32) -> u32 {
        if matches!(self.at, Some(at) if now < at) {
            self.at = None;
        }
        self.elapsed(now)
    }
}

// ---------------------------------------------------------------------------
// SimClock (host)
// ---------------------------------------------------------------------------

/// Manually advanced clock for host simulation and tests.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct SimClock {
    secs: u32,
}

#[cfg(not(target_os = "espidf"))]
impl SimClock {
    pub fn new(secs: u32) -> Self {
        Self { secs }
    }

    pub fn advance(&mut self, secs: u32) {
        self.secs = self.secs.wrapping_add(secs);
    }
}

#[cfg(not(target_os = "espidf"))]
impl ClockPort for SimClock {
    fn now_secs(&self) -> u32 {
        self.secs
    }

    fn set_secs(&mut self, secs: u32) {
        self.secs = secs;
    }
}
