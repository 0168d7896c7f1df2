//! Low-frequency sine oscillator for cutoff modulation

use std::f64::consts::TAU;

/// Sine LFO producing an offset in Hz around a base frequency
#[derive(Debug, Clone)]
pub struct Lfo {
    frequency_hz: f64,
    depth_hz: f32,
    phase: f64,
}

impl Lfo {
    pub fn new(frequency_hz: f64, depth_hz: f32) -> Self {
        Self {
            frequency_hz,
            depth_hz,
            phase: 0.0,
        }
    }

    /// Current offset in Hz (`depth × sin(phase)`)
    pub fn value(&self) -> f32 {
        self.depth_hz * (self.phase.sin() as f32)
    }

    /// Advance by `seconds` and return the new offset
    pub fn advance(&mut self, seconds: f64) -> f32 {
        self.phase = (self.phase + TAU * self.frequency_hz * seconds) % TAU;
        self.value()
    }

    pub fn depth_hz(&self) -> f32 {
        self.depth_hz
    }
}
