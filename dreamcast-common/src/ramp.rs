//! Gain ramp implementations for smooth level changes
//!
//! Provides the two automation shapes the player uses on gain stages:
//! - **Target approach**: exponential approach towards a target with a time
//!   constant, `v(t) = target + (v0 - target) × e^(-(t - t0) / τ)`. Never
//!   reaches the target exactly; ~95% after 3τ, ~99% after 5τ.
//! - **Linear**: constant rate of change from `v0` at `t0` to `target` at
//!   `t1`, holding `target` afterwards.
//!
//! Times are in seconds on the audio context clock.

use serde::{Deserialize, Serialize};

/// Shape of a gain transition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum RampShape {
    /// Exponential approach with time constant τ (seconds)
    TargetApproach { time_constant: f64 },

    /// Straight line ending at `end_time` (seconds)
    Linear { end_time: f64 },
}

/// One scheduled gain transition
///
/// Captures the value the gain had when the ramp was scheduled so the curve
/// is continuous no matter how often automation is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ramp {
    /// Value at `start_time`
    pub from: f32,

    /// Value the ramp is heading towards
    pub to: f32,

    /// Context time at which the ramp begins
    pub start_time: f64,

    /// Curve shape
    pub shape: RampShape,
}

impl Ramp {
    /// Exponential approach from `from` towards `to`, starting at `start_time`
    pub fn target_approach(from: f32, to: f32, start_time: f64, time_constant: f64) -> Self {
        Self {
            from,
            to,
            start_time,
            shape: RampShape::TargetApproach {
                time_constant: time_constant.max(f64::EPSILON),
            },
        }
    }

    /// Linear ramp from `from` at `start_time` to `to` at `end_time`
    pub fn linear(from: f32, to: f32, start_time: f64, end_time: f64) -> Self {
        Self {
            from,
            to,
            start_time,
            shape: RampShape::Linear {
                end_time: end_time.max(start_time),
            },
        }
    }

    /// Gain value at context time `t`
    pub fn value_at(&self, t: f64) -> f32 {
        if t <= self.start_time {
            return self.from;
        }
        let elapsed = t - self.start_time;

        match self.shape {
            RampShape::TargetApproach { time_constant } => {
                let decay = (-elapsed / time_constant).exp() as f32;
                self.to + (self.from - self.to) * decay
            }
            RampShape::Linear { end_time } => {
                let span = end_time - self.start_time;
                if span <= 0.0 || t >= end_time {
                    return self.to;
                }
                let progress = (elapsed / span) as f32;
                self.from + (self.to - self.from) * progress
            }
        }
    }

    /// Time at which the ramp is within `fraction` of its target
    ///
    /// For target approach this is `t0 - τ·ln(fraction)` (`fraction` = 0.05
    /// gives 3τ); linear ramps settle at their end time.
    pub fn settle_time(&self, fraction: f64) -> f64 {
        match self.shape {
            RampShape::TargetApproach { time_constant } => {
                let fraction = fraction.clamp(f64::MIN_POSITIVE, 1.0);
                self.start_time - time_constant * fraction.ln()
            }
            RampShape::Linear { end_time } => end_time,
        }
    }

    /// Whether the ramp has effectively reached its target at `t`
    pub fn is_settled(&self, t: f64, fraction: f64) -> bool {
        t >= self.settle_time(fraction)
    }
}
