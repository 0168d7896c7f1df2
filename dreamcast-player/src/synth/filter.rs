//! Biquad filter (RBJ cookbook coefficients, Direct Form I)

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Butterworth Q, used where no resonance is wanted
pub const BUTTERWORTH_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Filter response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Lowpass,
    /// Constant 0 dB peak gain
    Bandpass,
}

/// Second-order IIR filter with a movable cutoff
#[derive(Debug, Clone)]
pub struct Biquad {
    kind: FilterKind,
    sample_rate: f32,
    cutoff: f32,
    q: f32,
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    pub fn new(kind: FilterKind, cutoff: f32, q: f32, sample_rate: u32) -> Self {
        let mut filter = Self {
            kind,
            sample_rate: sample_rate as f32,
            cutoff,
            q: q.max(0.01),
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        };
        filter.update_coefficients();
        filter
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Move the cutoff/centre frequency, keeping the filter state
    pub fn set_cutoff(&mut self, cutoff: f32) {
        if (cutoff - self.cutoff).abs() > f32::EPSILON {
            self.cutoff = cutoff;
            self.update_coefficients();
        }
    }

    fn update_coefficients(&mut self) {
        // Keep the cutoff strictly inside (0, Nyquist)
        let nyquist = self.sample_rate * 0.5;
        let freq = self.cutoff.clamp(10.0, nyquist * 0.98);
        let omega = 2.0 * PI * freq / self.sample_rate;
        let (sin_omega, cos_omega) = omega.sin_cos();
        let alpha = sin_omega / (2.0 * self.q);

        let (b0, b1, b2) = match self.kind {
            FilterKind::Lowpass => {
                let b1 = 1.0 - cos_omega;
                (b1 / 2.0, b1, b1 / 2.0)
            }
            FilterKind::Bandpass => (alpha, 0.0, -alpha),
        };
        let a0 = 1.0 + alpha;

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = (-2.0 * cos_omega) / a0;
        self.a2 = (1.0 - alpha) / a0;
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}
