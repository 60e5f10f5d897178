//! Fast-start unit mode state machine and dispatch-band limits (§3, §4.3).
use serde::Deserialize;

/// A unit's fast-start mode at the start of a run.
#[derive(Debug, Clone, Deserialize)]
pub struct FastStartStartState {
    pub unit: String,
    pub current_mode: u8,
    pub time_in_current_mode: f64,
    pub mode_two_length: f64,
    pub mode_four_length: f64,
    pub min_loading: f64,
}

/// The state at the end of an interval, after advancing the mode clock by
/// the dispatch interval.
#[derive(Debug, Clone, PartialEq)]
pub struct FastStartEndState {
    pub unit: String,
    pub end_mode: u8,
    pub time_in_end_mode: f64,
    pub mode_two_length: f64,
    pub mode_four_length: f64,
    pub min_loading: f64,
    /// Set only when the unit transits from mode 2 into mode 3 within this
    /// interval.
    pub time_since_end_of_mode_two: Option<f64>,
}

impl FastStartStartState {
    /// Advance the mode clock by `dispatch_interval` minutes, carrying
    /// residual time forward across mode boundaries (§3).
    ///
    /// Mode 0 (off) and mode 1 (pre-start off) have no fixed length here;
    /// they only advance when driven externally (e.g. a commitment
    /// decision), which is outside this state machine's scope. Mode 3
    /// (flexible) has no fixed length either: a unit ends the interval in
    /// mode 3 unless it is told to shut down.
    pub fn advance(&self, dispatch_interval: f64) -> FastStartEndState {
        let mut mode = self.current_mode;
        let mut remaining = self.time_in_current_mode + dispatch_interval;
        let mut time_since_end_of_mode_two = None;

        loop {
            let length = match mode {
                2 => self.mode_two_length,
                4 => self.mode_four_length,
                _ => break,
            };
            if remaining < length {
                break;
            }
            remaining -= length;
            let from_mode = mode;
            mode = if mode == 4 { 0 } else { mode + 1 };
            if from_mode == 2 {
                time_since_end_of_mode_two = Some(remaining);
            }
        }

        if mode == 3 && time_since_end_of_mode_two.is_none() && self.current_mode == 2 {
            time_since_end_of_mode_two = Some(remaining);
        }

        FastStartEndState {
            unit: self.unit.clone(),
            end_mode: mode,
            time_in_end_mode: remaining,
            mode_two_length: self.mode_two_length,
            mode_four_length: self.mode_four_length,
            min_loading: self.min_loading,
            time_since_end_of_mode_two,
        }
    }
}

/// Dispatch band limits implied by an end-of-interval fast-start state
/// (§4.3 "Fast-start profile").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FastStartBand {
    pub min: f64,
    pub max: Option<f64>,
}

impl FastStartEndState {
    /// The `(min, max)` dispatch band implied by this end-of-interval state.
    pub fn dispatch_band(&self) -> FastStartBand {
        match self.end_mode {
            0 | 1 => FastStartBand { min: 0.0, max: Some(0.0) },
            2 => {
                let target = (self.time_in_end_mode / self.mode_two_length) * self.min_loading;
                FastStartBand { min: target, max: Some(target) }
            }
            3 => FastStartBand { min: self.min_loading, max: None },
            4 => {
                let target =
                    self.min_loading * (1.0 - self.time_in_end_mode / self.mode_four_length);
                FastStartBand { min: target, max: Some(target) }
            }
            other => unreachable!("fast-start mode out of range: {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_two_dispatch_band() {
        let end = FastStartEndState {
            unit: "A".into(),
            end_mode: 2,
            time_in_end_mode: 5.0,
            mode_two_length: 10.0,
            mode_four_length: 20.0,
            min_loading: 40.0,
            time_since_end_of_mode_two: None,
        };
        let band = end.dispatch_band();
        assert_eq!(band.min, 20.0);
        assert_eq!(band.max, Some(20.0));
    }

    #[test]
    fn test_mode_zero_and_one_are_zero() {
        for end_mode in [0, 1] {
            let end = FastStartEndState {
                unit: "A".into(),
                end_mode,
                time_in_end_mode: 4.0,
                mode_two_length: 10.0,
                mode_four_length: 10.0,
                min_loading: 50.0,
                time_since_end_of_mode_two: None,
            };
            let band = end.dispatch_band();
            assert_eq!(band.min, 0.0);
            assert_eq!(band.max, Some(0.0));
        }
    }

    #[test]
    fn test_mode_four_winds_down_to_zero() {
        let end = FastStartEndState {
            unit: "A".into(),
            end_mode: 4,
            time_in_end_mode: 10.0,
            mode_two_length: 10.0,
            mode_four_length: 20.0,
            min_loading: 60.0,
            time_since_end_of_mode_two: None,
        };
        let band = end.dispatch_band();
        assert_eq!(band.min, 30.0);
        assert_eq!(band.max, Some(30.0));
    }

    #[test]
    fn test_advance_carries_residual_time_into_next_mode() {
        let start = FastStartStartState {
            unit: "A".into(),
            current_mode: 2,
            time_in_current_mode: 8.0,
            mode_two_length: 10.0,
            mode_four_length: 20.0,
            min_loading: 40.0,
        };
        // 8 + 5 = 13, spills 3 over into mode 3.
        let end = start.advance(5.0);
        assert_eq!(end.end_mode, 3);
        assert_eq!(end.time_in_end_mode, 3.0);
        assert_eq!(end.time_since_end_of_mode_two, Some(3.0));
    }

    #[test]
    fn test_advance_stays_in_mode_when_under_length() {
        let start = FastStartStartState {
            unit: "A".into(),
            current_mode: 2,
            time_in_current_mode: 1.0,
            mode_two_length: 10.0,
            mode_four_length: 20.0,
            min_loading: 40.0,
        };
        let end = start.advance(5.0);
        assert_eq!(end.end_mode, 2);
        assert_eq!(end.time_in_end_mode, 6.0);
        assert_eq!(end.time_since_end_of_mode_two, None);
    }
}
