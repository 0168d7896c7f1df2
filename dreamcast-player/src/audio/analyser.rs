//! Frequency-domain tap for the visualizer
//!
//! Mirrors what a browser analyser node hands a canvas: byte magnitudes per
//! bin, smoothed over time, scaled between -100 and -30 dB. Visualization
//! only; nothing in playback depends on it.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

const MIN_DECIBELS: f32 = -100.0;
const MAX_DECIBELS: f32 = -30.0;
const SMOOTHING: f32 = 0.8;

pub struct Analyser {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    ring: Vec<f32>,
    write_pos: usize,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    scratch: Vec<Complex<f32>>,
}

impl Analyser {
    /// `fft_size` must be a power of two; invalid sizes fall back to 64
    pub fn new(fft_size: usize) -> Self {
        let fft_size = if fft_size.is_power_of_two() && fft_size >= 32 {
            fft_size
        } else {
            64
        };
        let fft = FftPlanner::new().plan_fft_forward(fft_size);

        // Blackman window
        let n = fft_size as f32;
        let window = (0..fft_size)
            .map(|i| {
                let x = i as f32 / n;
                0.42 - 0.5 * (std::f32::consts::TAU * x).cos()
                    + 0.08 * (2.0 * std::f32::consts::TAU * x).cos()
            })
            .collect();

        Self {
            fft,
            fft_size,
            ring: vec![0.0; fft_size],
            write_pos: 0,
            window,
            smoothed: vec![0.0; fft_size / 2],
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of frequency bins (`fft_size / 2`)
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Feed post-gain narration samples (called from the render thread)
    pub fn push(&mut self, sample: f32) {
        self.ring[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.fft_size;
    }

    /// Byte magnitudes for every bin
    pub fn frequency_data(&mut self) -> Vec<u8> {
        for i in 0..self.fft_size {
            // Oldest sample first
            let sample = self.ring[(self.write_pos + i) % self.fft_size];
            self.scratch[i] = Complex::new(sample * self.window[i], 0.0);
        }
        self.fft.process(&mut self.scratch);

        let scale = 1.0 / self.fft_size as f32;
        let range = MAX_DECIBELS - MIN_DECIBELS;
        self.smoothed
            .iter_mut()
            .zip(&self.scratch)
            .map(|(smoothed, bin)| {
                let magnitude = bin.norm() * scale;
                *smoothed = SMOOTHING * *smoothed + (1.0 - SMOOTHING) * magnitude;
                let db = 20.0 * smoothed.max(1e-12).log10();
                (255.0 * (db - MIN_DECIBELS) / range).clamp(0.0, 255.0) as u8
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.ring.iter_mut().for_each(|s| *s = 0.0);
        self.smoothed.iter_mut().for_each(|s| *s = 0.0);
    }
}
