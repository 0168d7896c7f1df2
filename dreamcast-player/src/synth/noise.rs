//! Noise generators
//!
//! Each generator is a small struct carrying its running filter state and is
//! advanced one sample at a time from a fresh white value in `[-1, 1]`.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Base noise spectrum for a soundscape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseColor {
    /// Flat spectrum
    White,
    /// -3 dB/octave (Paul Kellett's refined method)
    Pink,
    /// Leaky-integrated rumble
    Brown,
}

/// Uniform white noise source
pub struct WhiteNoise<R: Rng> {
    rng: R,
}

impl<R: Rng> WhiteNoise<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Next uniform value in `[-1, 1]`
    pub fn next_sample(&mut self) -> f32 {
        self.rng.gen_range(-1.0f32..=1.0)
    }
}

/// Pink noise via Paul Kellett's seven-term recursive filter
#[derive(Debug, Clone, Default)]
pub struct PinkNoise {
    b0: f32,
    b1: f32,
    b2: f32,
    b3: f32,
    b4: f32,
    b5: f32,
    b6: f32,
}

impl PinkNoise {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the filter with one white sample
    pub fn advance(&mut self, white: f32) -> f32 {
        self.b0 = 0.99886 * self.b0 + white * 0.0555179;
        self.b1 = 0.99332 * self.b1 + white * 0.0750759;
        self.b2 = 0.96900 * self.b2 + white * 0.1538520;
        self.b3 = 0.86650 * self.b3 + white * 0.3104856;
        self.b4 = 0.55000 * self.b4 + white * 0.5329522;
        self.b5 = -0.7616 * self.b5 - white * 0.0168980;
        let out = self.b0
            + self.b1
            + self.b2
            + self.b3
            + self.b4
            + self.b5
            + self.b6
            + white * 0.5362;
        self.b6 = white * 0.115926;
        out * 0.11
    }
}

/// Brown-ish noise: leaky integrator of white noise
#[derive(Debug, Clone, Default)]
pub struct BrownNoise {
    last: f32,
}

impl BrownNoise {
    /// Output gain applied after integration
    pub const GAIN: f32 = 3.5;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, white: f32) -> f32 {
        self.last = (self.last + 0.02 * white) / 1.02;
        self.last * Self::GAIN
    }
}

/// Sparse decaying impulses layered on the fire rumble
#[derive(Debug, Clone)]
pub struct Crackle {
    /// Mean impulses per second
    pub rate_hz: f32,
    /// Impulse decay time constant (seconds)
    pub decay_secs: f32,
    /// Peak impulse amplitude
    pub amplitude: f32,
}

impl Default for Crackle {
    fn default() -> Self {
        Self {
            rate_hz: 6.0,
            decay_secs: 0.004,
            amplitude: 0.6,
        }
    }
}

impl Crackle {
    /// Mix impulses into `samples` in place
    pub fn apply<R: Rng>(&self, samples: &mut [f32], sample_rate: u32, rng: &mut R) {
        let probability = (self.rate_hz / sample_rate as f32).clamp(0.0, 1.0);
        let decay = (-1.0 / (self.decay_secs.max(1e-5) * sample_rate as f32)).exp();
        let mut envelope = 0.0f32;

        for sample in samples.iter_mut() {
            if rng.gen::<f32>() < probability {
                envelope = self.amplitude * rng.gen_range(0.3f32..=1.0);
            }
            if envelope > 1e-4 {
                *sample += envelope * rng.gen_range(-1.0f32..=1.0);
                envelope *= decay;
            }
        }
    }
}

/// Render a mono loop of `seconds` of noise at `sample_rate`
///
/// The loop point is not crossfaded; the tiny discontinuity at the seam is
/// inaudible under the filters the soundscapes use.
pub fn render_loop<R: Rng>(
    color: NoiseColor,
    sample_rate: u32,
    seconds: f64,
    rng: &mut R,
) -> Vec<f32> {
    let len = ((sample_rate as f64 * seconds).round() as usize).max(1);
    let mut white = WhiteNoise::new(rng);
    let mut out = Vec::with_capacity(len);

    match color {
        NoiseColor::White => {
            for _ in 0..len {
                out.push(white.next_sample());
            }
        }
        NoiseColor::Pink => {
            let mut pink = PinkNoise::new();
            for _ in 0..len {
                out.push(pink.advance(white.next_sample()));
            }
        }
        NoiseColor::Brown => {
            let mut brown = BrownNoise::new();
            for _ in 0..len {
                out.push(brown.advance(white.next_sample()));
            }
        }
    }

    out
}
