//! Switching-frequency selection by panel current.
//!
//! ```text
//!          > minimal_to_medium        > medium_to_high
//! MINIMAL ───────────────────▶ MEDIUM ────────────────▶ HIGH
//!         ◀─────────────────── ◀──────────────────────
//!          < medium_to_minimal        < high_to_medium
//! ```
//!
//! At most one step per call.  The gaps between the up and down
//! thresholds stop the stage from chattering at a boundary.

use crate::config::FrequencyThresholds;
use crate::drivers::power_stage::FrequencyMode;

pub struct FrequencySelector {
    thresholds: FrequencyThresholds,
    mode: FrequencyMode,
}

impl FrequencySelector {
    pub fn new(thresholds: FrequencyThresholds, initial: FrequencyMode) -> Self {
        Self {
            thresholds,
            mode: initial,
        }
    }

    pub fn mode(&self) -> FrequencyMode {
        self.mode
    }

    /// Re-sync after the stage changed mode behind the selector's back
    /// (charging start always comes up at `High`).
    pub fn sync(&mut self, mode: FrequencyMode) {
        self.mode = mode;
    }

    /// Feed one panel current sample (mA).  Returns the new mode on change.
    pub fn select(&mut self, panel_current_ma: u16) -> Option<FrequencyMode> {
        let t = &self.thresholds;
        let next = match self.mode {
            FrequencyMode::Minimal if panel_current_ma > t.minimal_to_medium => {
                FrequencyMode::Medium
            }
            FrequencyMode::Medium if panel_current_ma < t.medium_to_minimal => {
                FrequencyMode::Minimal
            }
            FrequencyMode::Medium if panel_current_ma > t.medium_to_high => FrequencyMode::High,
            FrequencyMode::High if panel_current_ma < t.high_to_medium => FrequencyMode::Medium,
            _ => return None,
        };
        self.mode = next;
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector(initial: FrequencyMode) -> FrequencySelector {
        FrequencySelector::new(FrequencyThresholds::default(), initial)
    }

    #[test]
    fn climbs_one_step_at_a_time() {
        let mut s = selector(FrequencyMode::Minimal);
        assert_eq!(s.select(8_000), Some(FrequencyMode::Medium));
        assert_eq!(s.select(8_000), Some(FrequencyMode::High));
        assert_eq!(s.select(8_000), None);
    }

    #[test]
    fn hysteresis_between_medium_and_high() {
        let mut s = selector(FrequencyMode::High);
        assert_eq!(s.select(5_500), None);
        assert_eq!(s.select(5_299), Some(FrequencyMode::Medium));
        assert_eq!(s.select(5_500), None);
        assert_eq!(s.select(5_851), Some(FrequencyMode::High));
    }

    #[test]
    fn hysteresis_between_minimal_and_medium() {
        let mut s = selector(FrequencyMode::Medium);
        assert_eq!(s.select(300), None);
        assert_eq!(s.select(249), Some(FrequencyMode::Minimal));
        assert_eq!(s.select(300), None);
        assert_eq!(s.select(351), Some(FrequencyMode::Medium));
    }

    #[test]
    fn sync_overrides_mode() {
        let mut s = selector(FrequencyMode::Minimal);
        s.sync(FrequencyMode::High);
        assert_eq!(s.mode(), FrequencyMode::High);
        assert_eq!(s.select(6_000), None);
    }
}
