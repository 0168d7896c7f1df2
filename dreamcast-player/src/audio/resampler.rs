//! Sample-rate conversion using rubato
//!
//! Narration is converted once at load time to the context rate so the
//! render thread can step through it frame by frame.

use super::types::AudioBuffer;
use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

pub struct Resampler;

impl Resampler {
    /// Convert `input` to `output_rate`
    ///
    /// Buffers already at the target rate are returned as a copy.
    pub fn resample(input: &AudioBuffer, output_rate: u32) -> Result<AudioBuffer> {
        let input_rate = input.sample_rate();
        if input_rate == output_rate || input.frames() == 0 {
            debug!("Sample rate already at {}Hz, skipping resample", output_rate);
            return Ok(input.clone());
        }

        debug!(
            "Resampling from {}Hz to {}Hz ({} channels)",
            input_rate,
            output_rate,
            input.channel_count()
        );

        let planar_input: Vec<&[f32]> = (0..input.channel_count())
            .filter_map(|ch| input.channel(ch))
            .collect();

        let mut resampler = FastFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0,
            PolynomialDegree::Septic,
            input.frames(),
            planar_input.len(),
        )
        .map_err(|e| Error::Decode(format!("Failed to create resampler: {}", e)))?;

        let planar_output = resampler
            .process(&planar_input, None)
            .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;

        let output = AudioBuffer::from_planar(planar_output, output_rate);
        debug!(
            "Resampled {} input frames to {} output frames",
            input.frames(),
            output.frames()
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_same_rate() {
        let input = AudioBuffer::from_planar(vec![vec![0.1, 0.2, 0.3]], 44100);
        let output = Resampler::resample(&input, 44100).unwrap();
        assert_eq!(output.channel(0), Some(&[0.1, 0.2, 0.3][..]));
    }

    #[test]
    fn test_resample_preserves_duration() {
        let input_rate = 48000;
        let frames = 4800;
        let tone: Vec<f32> = (0..frames)
            .map(|i| (std::f32::consts::TAU * 440.0 * i as f32 / input_rate as f32).sin() * 0.5)
            .collect();
        let input = AudioBuffer::from_planar(vec![tone.clone(), tone], input_rate);

        let output = Resampler::resample(&input, 44100).unwrap();
        assert_eq!(output.sample_rate(), 44100);
        assert_eq!(output.channel_count(), 2);

        let expected = (frames as f64 * 44100.0 / input_rate as f64) as usize;
        assert!(
            output.frames() >= expected - 10 && output.frames() <= expected + 10,
            "Expected ~{} frames, got {}",
            expected,
            output.frames()
        );
        assert!((output.duration() - input.duration()).abs() < 0.01);
    }
}
