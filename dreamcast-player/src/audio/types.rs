//! Core audio data types
//!
//! Decoded narration is held planar (one `Vec<f32>` per channel) at the
//! context sample rate, shared with the render thread through an `Arc`.

/// Decoded PCM audio, immutable once built
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
    frames: usize,
}

impl AudioBuffer {
    /// Build from planar channel data
    ///
    /// Channels shorter than the longest one are padded with silence so
    /// every channel has the same frame count.
    pub fn from_planar(mut channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        if channels.is_empty() {
            channels.push(Vec::new());
        }
        let frames = channels.iter().map(Vec::len).max().unwrap_or(0);
        for channel in channels.iter_mut() {
            channel.resize(frames, 0.0);
        }
        Self {
            channels,
            sample_rate: sample_rate.max(1),
            frames,
        }
    }

    /// Build from interleaved samples
    pub fn from_interleaved(samples: &[f32], channel_count: u16, sample_rate: u32) -> Self {
        let count = channel_count.max(1) as usize;
        let frames = samples.len() / count;
        let mut channels = vec![Vec::with_capacity(frames); count];
        for frame in samples.chunks_exact(count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Self::from_planar(channels, sample_rate)
    }

    /// Mono silence of the given length
    pub fn silent(seconds: f64, sample_rate: u32) -> Self {
        let frames = (seconds.max(0.0) * sample_rate as f64).round() as usize;
        Self::from_planar(vec![vec![0.0; frames]], sample_rate)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of sample frames
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Stereo frame at `index` (mono is duplicated, extra channels ignored)
    pub fn stereo_frame(&self, index: usize) -> (f32, f32) {
        if index >= self.frames {
            return (0.0, 0.0);
        }
        let left = self.channels[0][index];
        let right = self.channels.get(1).map_or(left, |c| c[index]);
        (left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration() {
        let buffer = AudioBuffer::silent(10.0, 44100);
        assert_eq!(buffer.frames(), 441_000);
        assert!((buffer.duration() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_interleaved() {
        let buffer = AudioBuffer::from_interleaved(&[0.1, 0.2, 0.3, 0.4], 2, 8000);
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frames(), 2);
        assert_eq!(buffer.channel(1), Some(&[0.2, 0.4][..]));
    }

    #[test]
    fn test_stereo_frame_mono_duplicates() {
        let buffer = AudioBuffer::from_planar(vec![vec![0.5, -0.5]], 8000);
        assert_eq!(buffer.stereo_frame(1), (-0.5, -0.5));
        assert_eq!(buffer.stereo_frame(2), (0.0, 0.0));
    }

    #[test]
    fn test_ragged_channels_padded() {
        let buffer = AudioBuffer::from_planar(vec![vec![1.0; 4], vec![1.0; 2]], 8000);
        assert_eq!(buffer.frames(), 4);
        assert_eq!(buffer.stereo_frame(3), (1.0, 0.0));
    }
}
