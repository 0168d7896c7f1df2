//! Deterministic narration fixtures
//!
//! Sine tones rather than silence so decode and resample paths carry real
//! signal.

use dreamcast_player::audio::AudioBuffer;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::f32::consts::PI;
use std::io::Cursor;
use std::path::Path;

fn sine_samples(seconds: f64, sample_rate: u32, channels: u16, frequency_hz: f32) -> Vec<i16> {
    let frames = (seconds * sample_rate as f64).round() as usize;
    let mut samples = Vec::with_capacity(frames * channels as usize);
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let value = (2.0 * PI * frequency_hz * t).sin() * 0.5;
        let sample = (value * i16::MAX as f32) as i16;
        for _ in 0..channels {
            samples.push(sample);
        }
    }
    samples
}

fn spec(sample_rate: u32, channels: u16) -> WavSpec {
    WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Write a 16-bit sine WAV file
pub fn write_sine_wav<P: AsRef<Path>>(
    path: P,
    seconds: f64,
    sample_rate: u32,
    channels: u16,
) -> Result<(), hound::Error> {
    let mut writer = WavWriter::create(path, spec(sample_rate, channels))?;
    for sample in sine_samples(seconds, sample_rate, channels, 440.0) {
        writer.write_sample(sample)?;
    }
    writer.finalize()
}

/// Same as [`write_sine_wav`], in memory
pub fn wav_bytes(seconds: f64, sample_rate: u32, channels: u16) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec(sample_rate, channels)).unwrap();
        for sample in sine_samples(seconds, sample_rate, channels, 440.0) {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Already-decoded mono sine buffer
pub fn sine_buffer(seconds: f64, sample_rate: u32) -> AudioBuffer {
    let samples: Vec<f32> = sine_samples(seconds, sample_rate, 1, 220.0)
        .into_iter()
        .map(|s| s as f32 / i16::MAX as f32)
        .collect();
    AudioBuffer::from_planar(vec![samples], sample_rate)
}
