//! Audio context: timebase, node bookkeeping and output ownership
//!
//! Owns the [`RenderGraph`] shared with the output callback and the
//! control-plane view of every node in it. Narration sources are single-use
//! and identified by a [`SourceToken`]; each token reports exactly one
//! [`SourceEnded`], either because it was stopped or because it ran out.
//!
//! A closed context stays closed. Operations on it are no-ops (or
//! [`Error::ContextClosed`] where a node would have been created).

use super::clock::Clock;
use super::graph::{AmbienceChain, AmbienceNode, NarrationNode, RenderGraph, Timebase};
use super::output::{AudioOutput, OutputFormat};
use super::types::AudioBuffer;
use crate::error::{Error, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Context lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Created, or suspended; time does not advance
    Suspended,
    Running,
    /// Released; cannot be resumed
    Closed,
}

/// Identity of one narration source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceToken(u64);

/// Identity of one ambience voice chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceId(u64);

/// Completion notice for a narration source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceEnded {
    pub token: SourceToken,
    /// Context time at which the end was observed
    pub at: f64,
    /// Stopped explicitly rather than running out of audio
    pub manual: bool,
}

struct ScheduledSource {
    /// Context time the source will have played its last frame
    ends_at: f64,
}

pub struct AudioContext {
    sample_rate: u32,
    state: ContextState,
    timebase: Timebase,
    graph: Arc<Mutex<RenderGraph>>,
    next_id: u64,
    sources: HashMap<SourceToken, ScheduledSource>,
    ended: VecDeque<SourceEnded>,
    output: Option<AudioOutput>,
}

impl AudioContext {
    /// New suspended context rendering at `sample_rate`
    pub fn new(sample_rate: u32, clock: Arc<dyn Clock>, fft_size: usize) -> Self {
        let timebase = Timebase::new(clock);
        let graph = RenderGraph::new(sample_rate, timebase.clone(), fft_size);
        Self {
            sample_rate,
            state: ContextState::Suspended,
            timebase,
            graph: Arc::new(Mutex::new(graph)),
            next_id: 1,
            sources: HashMap::new(),
            ended: VecDeque::new(),
            output: None,
        }
    }

    fn graph(&self) -> MutexGuard<'_, RenderGraph> {
        // The render thread never panics while holding the lock in practice;
        // recover the data rather than propagating poison.
        self.graph.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == ContextState::Closed
    }

    /// Context time in seconds
    pub fn current_time(&self) -> f64 {
        self.timebase.now()
    }

    /// Start (or restart) the clock
    pub fn resume(&mut self) {
        match self.state {
            ContextState::Running => {}
            ContextState::Closed => debug!("resume() on closed context ignored"),
            ContextState::Suspended => {
                self.timebase.resume();
                self.graph().timebase = self.timebase.clone();
                self.state = ContextState::Running;
                debug!("Audio context running at t={:.3}", self.current_time());
            }
        }
    }

    /// Freeze the clock; sources hold their position
    pub fn suspend(&mut self) {
        if self.state == ContextState::Running {
            self.timebase.suspend();
            self.graph().timebase = self.timebase.clone();
            self.state = ContextState::Suspended;
            debug!("Audio context suspended at t={:.3}", self.current_time());
        }
    }

    /// Release the output device and every node; idempotent
    pub fn close(&mut self) {
        if self.state == ContextState::Closed {
            return;
        }
        if let Some(mut output) = self.output.take() {
            output.stop();
        }
        {
            let mut graph = self.graph();
            graph.narration.clear();
            graph.ambience.clear();
        }
        self.timebase.suspend();
        self.sources.clear();
        self.ended.clear();
        self.state = ContextState::Closed;
        info!("Audio context closed");
    }

    /// Stream the graph to a real device
    pub fn attach_output(&mut self, format: &OutputFormat, buffer_size: Option<u32>) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ContextClosed);
        }
        if format.sample_rate != self.sample_rate {
            warn!(
                "Device runs at {} Hz but context renders at {} Hz",
                format.sample_rate, self.sample_rate
            );
        }

        let graph = Arc::clone(&self.graph);
        let output = AudioOutput::start(format, buffer_size, move |out, channels| {
            let mut graph = graph.lock().unwrap_or_else(PoisonError::into_inner);
            graph.render(out, channels);
        })?;
        self.output = Some(output);
        Ok(())
    }

    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    /// Detach a device whose stream has failed; the clock keeps running
    ///
    /// Returns `true` on the call that detaches it.
    pub fn check_output(&mut self) -> bool {
        if !self.output.as_ref().is_some_and(AudioOutput::has_error) {
            return false;
        }
        if let Some(mut output) = self.output.take() {
            warn!(
                "Audio device '{}' failed mid-session; continuing without output",
                output.format().device_name
            );
            output.stop();
        }
        true
    }

    /// Pull the next block by hand (headless hosts, tests, benches)
    pub fn render(&self, out: &mut [f32], channels: usize) {
        self.graph().render(out, channels);
    }

    // ---- narration path ----

    /// Start a single-use source playing `buffer` from `offset` seconds
    pub fn start_source(
        &mut self,
        buffer: Arc<AudioBuffer>,
        offset: f64,
        gain: f32,
    ) -> Result<SourceToken> {
        if self.is_closed() {
            return Err(Error::ContextClosed);
        }
        let token = SourceToken(self.next_id());
        let remaining = (buffer.duration() - offset.max(0.0)).max(0.0);
        let ends_at = self.current_time() + remaining;

        self.graph()
            .narration
            .insert(token.0, NarrationNode::new(buffer, offset, gain));
        self.sources.insert(token, ScheduledSource { ends_at });

        debug!(
            "Started source {:?} at offset {:.3}s ({:.3}s remaining)",
            token, offset, remaining
        );
        Ok(token)
    }

    /// Stop and disconnect a source; unknown or finished tokens are ignored
    pub fn stop_source(&mut self, token: SourceToken) {
        if self.sources.remove(&token).is_some() {
            self.graph().narration.remove(&token.0);
            self.ended.push_back(SourceEnded {
                token,
                at: self.current_time(),
                manual: true,
            });
        }
    }

    /// Set a source's gain immediately
    pub fn set_source_gain(&mut self, token: SourceToken, value: f32) {
        if let Some(node) = self.graph().narration.get_mut(&token.0) {
            node.gain.set_value(value);
        }
    }

    /// Linear ramp of a source's gain to `target` over `duration` seconds
    pub fn ramp_source_gain(&mut self, token: SourceToken, target: f32, duration: f64) {
        let now = self.current_time();
        if let Some(node) = self.graph().narration.get_mut(&token.0) {
            node.gain.linear_ramp_to(target, now, now + duration.max(0.0));
        }
    }

    /// Current gain of a source, if it is still connected
    pub fn source_gain(&self, token: SourceToken) -> Option<f32> {
        let now = self.current_time();
        self.graph()
            .narration
            .get(&token.0)
            .map(|node| node.gain.value_at(now))
    }

    /// Collect completion notices, including sources that have run out
    /// since the last call
    pub fn take_ended(&mut self) -> Vec<SourceEnded> {
        let now = self.current_time();
        let finished: Vec<SourceToken> = {
            let graph = self.graph();
            self.sources
                .iter()
                .filter(|(token, source)| {
                    now >= source.ends_at
                        || graph.narration.get(&token.0).map_or(true, |n| n.is_drained())
                })
                .map(|(token, _)| *token)
                .collect()
        };

        for token in finished {
            self.sources.remove(&token);
            self.graph().narration.remove(&token.0);
            self.ended.push_back(SourceEnded {
                token,
                at: now,
                manual: false,
            });
        }

        self.ended.drain(..).collect()
    }

    /// Narration sources still connected
    pub fn live_sources(&self) -> usize {
        self.sources.len()
    }

    /// Visualizer bytes for the narration path
    pub fn frequency_data(&self) -> Vec<u8> {
        self.graph().analyser.frequency_data()
    }

    /// Number of visualizer bins
    pub fn frequency_bin_count(&self) -> usize {
        self.graph().analyser.bin_count()
    }

    // ---- ambience path ----

    /// Connect a new looping voice chain to the ambience bus
    pub fn add_voice(&mut self, chain: AmbienceChain) -> Result<VoiceId> {
        if self.is_closed() {
            return Err(Error::ContextClosed);
        }
        let id = VoiceId(self.next_id());
        let node = AmbienceNode::new(chain, self.sample_rate);
        self.graph().ambience.insert(id.0, node);
        Ok(id)
    }

    /// Exponential approach of a voice's gain towards `target`
    pub fn set_voice_target(&mut self, id: VoiceId, target: f32, time_constant: f64) {
        let now = self.current_time();
        if let Some(node) = self.graph().ambience.get_mut(&id.0) {
            node.gain.set_target_at_time(target, now, time_constant);
        }
    }

    /// Current gain of a voice
    pub fn voice_gain(&self, id: VoiceId) -> Option<f32> {
        let now = self.current_time();
        self.graph()
            .ambience
            .get(&id.0)
            .map(|node| node.gain.value_at(now))
    }

    /// Value a voice's gain is heading towards
    pub fn voice_target(&self, id: VoiceId) -> Option<f32> {
        self.graph().ambience.get(&id.0).map(|node| node.gain.target())
    }

    /// Disconnect a voice; returns whether it was connected
    pub fn remove_voice(&mut self, id: VoiceId) -> bool {
        self.graph().ambience.remove(&id.0).is_some()
    }

    /// Ambience voices still connected
    pub fn live_voices(&self) -> usize {
        self.graph().ambience.len()
    }
}

impl Drop for AudioContext {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::clock::ManualClock;

    fn context() -> (AudioContext, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (AudioContext::new(1000, clock.clone(), 64), clock)
    }

    fn buffer(seconds: f64) -> Arc<AudioBuffer> {
        Arc::new(AudioBuffer::silent(seconds, 1000))
    }

    #[test]
    fn test_time_only_advances_while_running() {
        let (mut ctx, clock) = context();
        clock.advance(3.0);
        assert_eq!(ctx.current_time(), 0.0);

        ctx.resume();
        clock.advance(1.5);
        assert!((ctx.current_time() - 1.5).abs() < 1e-9);

        ctx.suspend();
        clock.advance(4.0);
        assert!((ctx.current_time() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_manual_stop_reports_once() {
        let (mut ctx, _clock) = context();
        ctx.resume();
        let token = ctx.start_source(buffer(5.0), 0.0, 1.0).unwrap();

        ctx.stop_source(token);
        ctx.stop_source(token);

        let ended = ctx.take_ended();
        assert_eq!(ended.len(), 1);
        assert!(ended[0].manual);
        assert_eq!(ctx.live_sources(), 0);
        assert!(ctx.take_ended().is_empty());
    }

    #[test]
    fn test_natural_end_from_schedule() {
        let (mut ctx, clock) = context();
        ctx.resume();
        let token = ctx.start_source(buffer(5.0), 2.0, 1.0).unwrap();

        clock.advance(2.9);
        assert!(ctx.take_ended().is_empty());

        clock.advance(0.2);
        let ended = ctx.take_ended();
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].token, token);
        assert!(!ended[0].manual);
    }

    #[test]
    fn test_tokens_are_unique() {
        let (mut ctx, _clock) = context();
        let a = ctx.start_source(buffer(1.0), 0.0, 1.0).unwrap();
        let b = ctx.start_source(buffer(1.0), 0.0, 1.0).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_closed_context_refuses_nodes() {
        let (mut ctx, _clock) = context();
        ctx.close();
        ctx.close();
        assert_eq!(ctx.state(), ContextState::Closed);
        assert!(matches!(
            ctx.start_source(buffer(1.0), 0.0, 1.0),
            Err(Error::ContextClosed)
        ));
        ctx.resume();
        assert_eq!(ctx.state(), ContextState::Closed);
    }

    #[test]
    fn test_close_releases_everything() {
        let (mut ctx, _clock) = context();
        ctx.resume();
        ctx.start_source(buffer(1.0), 0.0, 1.0).unwrap();
        ctx.add_voice(AmbienceChain {
            samples: Arc::new(vec![0.1; 100]),
            filter: crate::synth::FilterKind::Lowpass,
            cutoff_hz: 800.0,
            q: 0.7,
            lfo: None,
            initial_gain: 0.0,
        })
        .unwrap();

        ctx.close();
        assert_eq!(ctx.live_sources(), 0);
        assert_eq!(ctx.live_voices(), 0);
    }

    #[test]
    fn test_voice_gain_ramps() {
        let (mut ctx, clock) = context();
        ctx.resume();
        let id = ctx
            .add_voice(AmbienceChain {
                samples: Arc::new(vec![0.1; 100]),
                filter: crate::synth::FilterKind::Lowpass,
                cutoff_hz: 800.0,
                q: 0.7,
                lfo: None,
                initial_gain: 0.0,
            })
            .unwrap();

        ctx.set_voice_target(id, 0.15, 1.0);
        assert_eq!(ctx.voice_target(id), Some(0.15));
        clock.advance(5.0);
        let gain = ctx.voice_gain(id).unwrap();
        assert!((gain - 0.15).abs() < 0.002);

        assert!(ctx.remove_voice(id));
        assert!(!ctx.remove_voice(id));
    }

    #[test]
    fn test_source_gain_ramp() {
        let (mut ctx, clock) = context();
        ctx.resume();
        let token = ctx.start_source(buffer(10.0), 0.0, 1.0).unwrap();
        ctx.ramp_source_gain(token, 0.0, 2.0);
        clock.advance(1.0);
        assert!((ctx.source_gain(token).unwrap() - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_headless_context_has_no_failed_output() {
        let (mut ctx, clock) = context();
        ctx.resume();
        assert!(!ctx.check_output());
        assert!(!ctx.has_output());

        clock.advance(1.0);
        assert!((ctx.current_time() - 1.0).abs() < 1e-9);
    }
}
