//! Render graph shared between the control thread and the output callback
//!
//! Two signal paths feed the destination:
//! - narration: buffer source → voice gain → analyser tap → destination
//! - ambience: looping noise → biquad (optionally LFO-swept) → voice gain →
//!   ambience bus → destination
//!
//! The graph owns the context timebase so the output callback can evaluate
//! gain automation at the same context time the control plane sees.

use super::analyser::Analyser;
use super::clock::Clock;
use super::param::GainParam;
use super::types::AudioBuffer;
use crate::synth::{Biquad, FilterKind, Lfo};
use std::collections::HashMap;
use std::sync::Arc;

/// Context time source: frozen while suspended, clock-driven while running
#[derive(Clone)]
pub(crate) struct Timebase {
    clock: Arc<dyn Clock>,
    base: f64,
    resumed_at: Option<f64>,
}

impl Timebase {
    pub(crate) fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            base: 0.0,
            resumed_at: None,
        }
    }

    pub(crate) fn now(&self) -> f64 {
        match self.resumed_at {
            Some(resumed_at) => self.base + (self.clock.now() - resumed_at).max(0.0),
            None => self.base,
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.resumed_at.is_some()
    }

    pub(crate) fn resume(&mut self) {
        if self.resumed_at.is_none() {
            self.resumed_at = Some(self.clock.now());
        }
    }

    pub(crate) fn suspend(&mut self) {
        self.base = self.now();
        self.resumed_at = None;
    }
}

/// Single-use narration source
pub(crate) struct NarrationNode {
    buffer: Arc<AudioBuffer>,
    cursor: usize,
    pub(crate) gain: GainParam,
    drained: bool,
}

impl NarrationNode {
    pub(crate) fn new(buffer: Arc<AudioBuffer>, offset_secs: f64, gain: f32) -> Self {
        let cursor = (offset_secs.max(0.0) * buffer.sample_rate() as f64) as usize;
        let drained = cursor >= buffer.frames();
        Self {
            buffer,
            cursor,
            gain: GainParam::new(gain),
            drained,
        }
    }

    pub(crate) fn is_drained(&self) -> bool {
        self.drained
    }
}

/// Parameters for one ambience voice chain
#[derive(Debug, Clone)]
pub struct AmbienceChain {
    /// Pre-rendered mono noise loop
    pub samples: Arc<Vec<f32>>,
    pub filter: FilterKind,
    pub cutoff_hz: f32,
    pub q: f32,
    /// Cutoff sweep as (rate Hz, depth Hz)
    pub lfo: Option<(f64, f32)>,
    /// Gain at connection time
    pub initial_gain: f32,
}

pub(crate) struct AmbienceNode {
    samples: Arc<Vec<f32>>,
    cursor: usize,
    filter: Biquad,
    base_cutoff: f32,
    lfo: Option<Lfo>,
    pub(crate) gain: GainParam,
}

impl AmbienceNode {
    pub(crate) fn new(chain: AmbienceChain, sample_rate: u32) -> Self {
        Self {
            filter: Biquad::new(chain.filter, chain.cutoff_hz, chain.q, sample_rate),
            base_cutoff: chain.cutoff_hz,
            lfo: chain.lfo.map(|(rate, depth)| Lfo::new(rate, depth)),
            gain: GainParam::new(chain.initial_gain),
            samples: chain.samples,
            cursor: 0,
        }
    }
}

/// Everything the output callback needs, behind one lock
pub struct RenderGraph {
    sample_rate: u32,
    pub(crate) timebase: Timebase,
    pub(crate) narration: HashMap<u64, NarrationNode>,
    pub(crate) ambience: HashMap<u64, AmbienceNode>,
    pub(crate) analyser: Analyser,
}

impl RenderGraph {
    pub(crate) fn new(sample_rate: u32, timebase: Timebase, fft_size: usize) -> Self {
        Self {
            sample_rate,
            timebase,
            narration: HashMap::new(),
            ambience: HashMap::new(),
            analyser: Analyser::new(fft_size),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Fill `out` (interleaved, `channels` wide) with the next block
    ///
    /// Output is silence while the context is suspended; sources do not
    /// advance.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        out.iter_mut().for_each(|s| *s = 0.0);
        if channels == 0 || !self.timebase.is_running() {
            return;
        }

        let frames = out.len() / channels;
        if frames == 0 {
            return;
        }
        let t0 = self.timebase.now();
        let block_secs = frames as f64 / self.sample_rate as f64;
        let t1 = t0 + block_secs;
        let step = 1.0 / frames as f32;

        for node in self.narration.values_mut() {
            if node.drained {
                continue;
            }
            let g0 = node.gain.value_at(t0);
            let g1 = node.gain.value_at(t1);
            let total = node.buffer.frames();

            for frame in 0..frames {
                if node.cursor >= total {
                    node.drained = true;
                    break;
                }
                let gain = g0 + (g1 - g0) * frame as f32 * step;
                let (l, r) = node.buffer.stereo_frame(node.cursor);
                let (l, r) = (l * gain, r * gain);
                node.cursor += 1;

                self.analyser.push(0.5 * (l + r));
                write_frame(&mut out[frame * channels..(frame + 1) * channels], l, r);
            }
            node.gain.settle(t1);
        }

        for node in self.ambience.values_mut() {
            if node.samples.is_empty() {
                continue;
            }
            if let Some(lfo) = node.lfo.as_mut() {
                let offset = lfo.advance(block_secs);
                node.filter.set_cutoff(node.base_cutoff + offset);
            }
            let g0 = node.gain.value_at(t0);
            let g1 = node.gain.value_at(t1);
            let len = node.samples.len();

            for frame in 0..frames {
                let gain = g0 + (g1 - g0) * frame as f32 * step;
                let sample = node.filter.process(node.samples[node.cursor]) * gain;
                node.cursor = (node.cursor + 1) % len;
                write_frame(&mut out[frame * channels..(frame + 1) * channels], sample, sample);
            }
            node.gain.settle(t1);
        }
    }
}

/// Mix a stereo frame into an interleaved frame of any width
fn write_frame(frame: &mut [f32], left: f32, right: f32) {
    match frame.len() {
        1 => frame[0] += 0.5 * (left + right),
        _ => {
            frame[0] += left;
            frame[1] += right;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::clock::ManualClock;

    fn running_graph(clock: Arc<ManualClock>) -> RenderGraph {
        let mut timebase = Timebase::new(clock);
        timebase.resume();
        RenderGraph::new(1000, timebase, 64)
    }

    #[test]
    fn test_timebase_freezes_while_suspended() {
        let clock = Arc::new(ManualClock::new());
        let mut timebase = Timebase::new(clock.clone());
        clock.advance(5.0);
        assert_eq!(timebase.now(), 0.0);

        timebase.resume();
        clock.advance(2.0);
        assert!((timebase.now() - 2.0).abs() < 1e-9);

        timebase.suspend();
        clock.advance(10.0);
        assert!((timebase.now() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_suspended_graph_renders_silence() {
        let clock = Arc::new(ManualClock::new());
        let mut graph = RenderGraph::new(1000, Timebase::new(clock), 64);
        let buffer = Arc::new(AudioBuffer::from_planar(vec![vec![1.0; 100]], 1000));
        graph.narration.insert(1, NarrationNode::new(buffer, 0.0, 1.0));

        let mut out = vec![0.0; 20];
        graph.render(&mut out, 2);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_narration_drains_and_applies_gain() {
        let clock = Arc::new(ManualClock::new());
        let mut graph = running_graph(clock);
        let buffer = Arc::new(AudioBuffer::from_planar(vec![vec![1.0; 8]], 1000));
        graph.narration.insert(1, NarrationNode::new(buffer, 0.0, 0.5));

        let mut out = vec![0.0; 32];
        graph.render(&mut out, 2);
        assert_eq!(out[0], 0.5);
        assert_eq!(out[1], 0.5);
        assert_eq!(out[16], 0.0);
        assert!(graph.narration[&1].is_drained());
    }

    #[test]
    fn test_offset_past_end_is_drained() {
        let buffer = Arc::new(AudioBuffer::from_planar(vec![vec![1.0; 8]], 1000));
        let node = NarrationNode::new(buffer, 1.0, 1.0);
        assert!(node.is_drained());
    }

    #[test]
    fn test_ambience_loops() {
        let clock = Arc::new(ManualClock::new());
        let mut graph = running_graph(clock);
        let chain = AmbienceChain {
            samples: Arc::new(vec![0.5, -0.5, 0.25, -0.25]),
            filter: FilterKind::Lowpass,
            cutoff_hz: 400.0,
            q: crate::synth::filter::BUTTERWORTH_Q,
            lfo: Some((0.1, 200.0)),
            initial_gain: 1.0,
        };
        graph.ambience.insert(7, AmbienceNode::new(chain, 1000));

        let mut out = vec![0.0; 64];
        graph.render(&mut out, 1);
        assert!(out.iter().any(|&s| s != 0.0));
        assert!(out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_mono_output_downmixes() {
        let mut frame = [0.0f32; 1];
        write_frame(&mut frame, 1.0, 0.0);
        assert_eq!(frame[0], 0.5);
    }
}
