// src/cover/position.rs - Position scale, motion state and interpolation math
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const MIN_POSITION: f64 = 0.0;
pub const MAX_POSITION: f64 = 100.0;

/// Distance from the closed end at which a cover reports itself closed.
pub const CLOSED_TOLERANCE: f64 = 1.0;

/// Which end of the 0-100 scale means "fully open".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// 0 = fully open, 100 = fully closed.
    #[default]
    ZeroOpen,
    /// 0 = fully closed, 100 = fully open.
    ZeroClosed,
}

impl Polarity {
    pub fn open_end(self) -> f64 {
        match self {
            Polarity::ZeroOpen => MIN_POSITION,
            Polarity::ZeroClosed => MAX_POSITION,
        }
    }

    pub fn closed_end(self) -> f64 {
        match self {
            Polarity::ZeroOpen => MAX_POSITION,
            Polarity::ZeroClosed => MIN_POSITION,
        }
    }

    /// Direction of travel for a move from `from` to `to`, or `Idle` if the
    /// two are equal.
    pub fn direction(self, from: f64, to: f64) -> MotionState {
        if to == from {
            return MotionState::Idle;
        }
        let toward_open = match self {
            Polarity::ZeroOpen => to < from,
            Polarity::ZeroClosed => to > from,
        };
        if toward_open {
            MotionState::Opening
        } else {
            MotionState::Closing
        }
    }

    pub fn is_closed(self, position: f64) -> bool {
        (position - self.closed_end()).abs() <= CLOSED_TOLERANCE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionState {
    #[default]
    Idle,
    Opening,
    Closing,
}

/// Published view of a cover's state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverSnapshot {
    pub name: String,
    pub position: f64,
    pub motion_state: MotionState,
    pub is_closed: bool,
}

impl CoverSnapshot {
    pub fn new(name: impl Into<String>, position: f64, motion_state: MotionState, polarity: Polarity) -> Self {
        let position = clamp_position(position);
        Self {
            name: name.into(),
            position,
            motion_state,
            is_closed: polarity.is_closed(position),
        }
    }

    pub fn is_moving(&self) -> bool {
        self.motion_state != MotionState::Idle
    }
}

/// Clamp into `[0, 100]`. NaN maps to the lower bound.
pub fn clamp_position(position: f64) -> f64 {
    if position.is_nan() {
        return MIN_POSITION;
    }
    position.clamp(MIN_POSITION, MAX_POSITION)
}

pub fn is_valid_position(position: f64) -> bool {
    position.is_finite() && (MIN_POSITION..=MAX_POSITION).contains(&position)
}

/// Time needed to cover `distance` scale units given the full-travel time.
pub fn travel_duration(distance: f64, full_travel: Duration) -> Duration {
    let fraction = (distance.abs() / (MAX_POSITION - MIN_POSITION)).min(1.0);
    if !fraction.is_finite() || fraction <= 0.0 {
        return Duration::ZERO;
    }
    full_travel.mul_f64(fraction)
}

/// Estimated position `elapsed_secs` into a move from `start` to `target`
/// lasting `duration_secs`. Computed from elapsed time, never accumulated.
pub fn interpolate(start: f64, target: f64, elapsed_secs: f64, duration_secs: f64) -> f64 {
    if duration_secs.is_nan() || duration_secs <= 0.0 || elapsed_secs >= duration_secs {
        return clamp_position(target);
    }
    if elapsed_secs.is_nan() || elapsed_secs <= 0.0 {
        return clamp_position(start);
    }
    let fraction = elapsed_secs / duration_secs;
    clamp_position(start + (target - start) * fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarity_ends() {
        assert_eq!(Polarity::ZeroOpen.open_end(), 0.0);
        assert_eq!(Polarity::ZeroOpen.closed_end(), 100.0);
        assert_eq!(Polarity::ZeroClosed.open_end(), 100.0);
        assert_eq!(Polarity::ZeroClosed.closed_end(), 0.0);
    }

    #[test]
    fn test_direction_follows_polarity() {
        assert_eq!(Polarity::ZeroOpen.direction(50.0, 80.0), MotionState::Closing);
        assert_eq!(Polarity::ZeroOpen.direction(50.0, 10.0), MotionState::Opening);
        assert_eq!(Polarity::ZeroClosed.direction(50.0, 80.0), MotionState::Opening);
        assert_eq!(Polarity::ZeroClosed.direction(50.0, 10.0), MotionState::Closing);
        assert_eq!(Polarity::ZeroOpen.direction(42.0, 42.0), MotionState::Idle);
        // Moving away from an end that we're sitting on.
        assert_eq!(Polarity::ZeroOpen.direction(0.0, 30.0), MotionState::Closing);
        assert_eq!(Polarity::ZeroOpen.direction(100.0, 0.0), MotionState::Opening);
    }

    #[test]
    fn test_midpoint_sample() {
        let cases = [(0.0, 100.0, 10.0), (100.0, 0.0, 20.0), (30.0, 50.0, 2.0), (75.0, 74.0, 0.3)];
        for (start, target, duration) in cases {
            let mid = interpolate(start, target, duration / 2.0, duration);
            assert!((mid - (start + (target - start) / 2.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_interpolate_endpoints() {
        assert_eq!(interpolate(10.0, 90.0, 0.0, 8.0), 10.0);
        assert_eq!(interpolate(10.0, 90.0, 8.0, 8.0), 90.0);
        assert_eq!(interpolate(10.0, 90.0, 1000.0, 8.0), 90.0);
        assert_eq!(interpolate(10.0, 90.0, 3.0, 0.0), 90.0);
    }

    #[test]
    fn test_interpolate_never_leaves_range() {
        let elapsed = [-1e9, -1.0, f64::NAN, f64::NEG_INFINITY, 0.25, 5.0, f64::INFINITY, 1e12];
        for e in elapsed {
            for (start, target) in [(0.0, 100.0), (100.0, 0.0), (-50.0, 250.0), (250.0, -50.0)] {
                let p = interpolate(start, target, e, 5.0);
                assert!((0.0..=100.0).contains(&p), "{} escaped range for elapsed {}", p, e);
            }
        }
    }

    #[test]
    fn test_travel_duration() {
        let full = Duration::from_secs(30);
        assert_eq!(travel_duration(100.0, full), full);
        assert_eq!(travel_duration(-50.0, full), Duration::from_secs(15));
        assert_eq!(travel_duration(0.0, full), Duration::ZERO);
        assert_eq!(travel_duration(f64::NAN, full), Duration::ZERO);
    }

    #[test]
    fn test_snapshot_closed_flag() {
        assert!(CoverSnapshot::new("c", 99.5, MotionState::Idle, Polarity::ZeroOpen).is_closed);
        assert!(!CoverSnapshot::new("c", 97.0, MotionState::Idle, Polarity::ZeroOpen).is_closed);
        assert!(CoverSnapshot::new("c", 0.0, MotionState::Idle, Polarity::ZeroClosed).is_closed);
        assert_eq!(CoverSnapshot::new("c", 140.0, MotionState::Idle, Polarity::ZeroOpen).position, 100.0);
    }

    #[test]
    fn test_valid_position() {
        assert!(is_valid_position(0.0));
        assert!(is_valid_position(100.0));
        assert!(!is_valid_position(-0.1));
        assert!(!is_valid_position(100.1));
        assert!(!is_valid_position(f64::NAN));
    }
}
