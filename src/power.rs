//! Power management: light sleep while there is nothing to charge.
//!
//! The seconds clock is reset to 0 whenever charging stops, so "idle
//! time" is simply the clock reading while not charging.  Once it passes
//! `sleep_after_idle_secs` the manager requests one sleep period.  The
//! timer interrupt is stopped during sleep, so on wake-up the clock is
//! advanced by the sleep duration to keep the restart hold-off and the
//! charger's time marks honest.
//!
//! ```text
//!   stop ──▶ clock=0 ──▶ … idle … ──▶ clock > after_idle ──▶ sleep(N s)
//!                                                               │
//!                          clock += N ◀── wake ◀────────────────┘
//! ```

use log::info;

use crate::app::ports::ClockPort;
use crate::config::SystemConfig;

pub struct PowerManager {
    sleep_after_idle_secs: u32,
    sleep_duration_secs: u32,
    sleep_count: u32,
}

impl PowerManager {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            sleep_after_idle_secs: config.sleep_after_idle_secs,
            sleep_duration_secs: config.sleep_duration_secs,
            sleep_count: 0,
        }
    }

    /// Sleep duration to request after this tick, if any.
    pub fn check(&self, charging: bool, now: u32) -> Option<u32> {
        (!charging && now > self.sleep_after_idle_secs).then_some(self.sleep_duration_secs)
    }

    /// Account for one completed sleep period on `clock`.
    pub fn wake(&mut self, clock: &mut impl ClockPort) {
        let now = clock.now_secs().saturating_add(self.sleep_duration_secs);
        clock.set_secs(now);
        self.sleep_count = self.sleep_count.wrapping_add(1);
        info!("Power: woke after {} s (sleep #{}), clock at {now} s", self.sleep_duration_secs, self.sleep_count);
    }

    pub fn sleep_count(&self) -> u32 {
        self.sleep_count
    }

    pub fn sleep_duration_secs(&self) -> u32 {
        self.sleep_duration_secs
    }
}

/// Put the CPU into light sleep for `secs`, waking on the RTC timer.
#[cfg(target_os = "espidf")]
pub fn enter_light_sleep(secs: u32) {
    use esp_idf_svc::sys::*;

    info!("Power: light sleep for {secs} s");
    // SAFETY: Both calls only program the RTC wake source and suspend
    // the CPU; no Rust-owned memory is touched.
    unsafe {
        esp_sleep_enable_timer_wakeup(u64::from(secs) * 1_000_000);
        esp_light_sleep_start();
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn enter_light_sleep(secs: u32) {
    info!("Power(sim): light sleep for {secs} s");
}
