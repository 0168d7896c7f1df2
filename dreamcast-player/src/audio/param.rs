//! Automatable gain parameter
//!
//! Control code schedules level changes at context time; the render thread
//! samples the curve once per block edge and interpolates in between.

use dreamcast_common::Ramp;

/// Gain stage value with at most one active ramp
///
/// Scheduling a new ramp starts it from wherever the previous curve was at
/// that moment, so the gain never jumps.
#[derive(Debug, Clone)]
pub struct GainParam {
    /// Value the gain settles at
    target: f32,
    ramp: Option<Ramp>,
}

impl GainParam {
    pub fn new(value: f32) -> Self {
        Self {
            target: value,
            ramp: None,
        }
    }

    /// Value at context time `t`
    pub fn value_at(&self, t: f64) -> f32 {
        match &self.ramp {
            Some(ramp) => ramp.value_at(t),
            None => self.target,
        }
    }

    /// Final value of the current automation
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Jump immediately, cancelling automation
    pub fn set_value(&mut self, value: f32) {
        self.target = value;
        self.ramp = None;
    }

    /// Exponential approach to `target` starting at `now`
    pub fn set_target_at_time(&mut self, target: f32, now: f64, time_constant: f64) {
        let from = self.value_at(now);
        self.ramp = Some(Ramp::target_approach(from, target, now, time_constant));
        self.target = target;
    }

    /// Straight line from the current value to `target` at `end_time`
    pub fn linear_ramp_to(&mut self, target: f32, now: f64, end_time: f64) {
        let from = self.value_at(now);
        self.ramp = Some(Ramp::linear(from, target, now, end_time));
        self.target = target;
    }

    /// Drop automation that has effectively finished
    pub fn settle(&mut self, now: f64) {
        if let Some(ramp) = &self.ramp {
            if ramp.is_settled(now, 1e-4) {
                self.ramp = None;
            }
        }
    }
}
