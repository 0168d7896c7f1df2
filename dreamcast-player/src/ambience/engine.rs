//! Ambience engine: voice creation, gain ramps and release
//!
//! The engine is a plain service object. It never owns the audio context;
//! every operation borrows the context it renders into, so several engines
//! can coexist in tests.

use super::profile::SoundscapeProfile;
use super::voice::{Voice, VoiceState};
use crate::audio::{AmbienceChain, AudioContext, VoiceId};
use crate::config::AmbienceConfig;
use crate::synth::{render_loop, Crackle};
use dreamcast_common::AmbienceType;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fade-in is considered complete after this many time constants (~95%)
const FADE_IN_SETTLE_TIME_CONSTANTS: f64 = 3.0;

pub struct AmbienceEngine {
    config: AmbienceConfig,
    voices: HashMap<AmbienceType, Voice>,
    rng: StdRng,
}

impl AmbienceEngine {
    pub fn new(config: AmbienceConfig) -> Self {
        Self {
            config,
            voices: HashMap::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Engine with reproducible noise loops
    pub fn with_seed(config: AmbienceConfig, seed: u64) -> Self {
        Self {
            config,
            voices: HashMap::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &AmbienceConfig {
        &self.config
    }

    /// Start `ambience` at `volume`
    ///
    /// A type that is already live only has its volume updated; a type that
    /// is fading out is ramped back up instead of being duplicated.
    pub fn start(&mut self, ctx: &mut AudioContext, ambience: AmbienceType, volume: f32) {
        let Some(profile) = SoundscapeProfile::for_type(ambience) else {
            return;
        };
        let volume = volume.max(0.0);
        let now = ctx.current_time();

        if let Some(voice) = self.voices.get_mut(&ambience) {
            match voice.state {
                VoiceState::FadingIn | VoiceState::Sustaining => {
                    voice.volume = volume;
                    ctx.set_voice_target(
                        voice.id,
                        volume * profile.gain_trim,
                        self.config.ramp_time_constant_secs,
                    );
                    debug!("Ambience {} already live, volume -> {:.2}", ambience, volume);
                }
                VoiceState::FadingOut | VoiceState::Idle => {
                    voice.volume = volume;
                    voice.transition(VoiceState::FadingIn, now);
                    ctx.set_voice_target(
                        voice.id,
                        volume * profile.gain_trim,
                        self.config.fade_in_time_constant_secs,
                    );
                    debug!("Ambience {} revived before release", ambience);
                }
            }
            return;
        }

        let sample_rate = ctx.sample_rate();
        let mut samples = render_loop(
            profile.noise,
            sample_rate,
            self.config.loop_seconds,
            &mut self.rng,
        );
        if profile.crackle && self.config.crackle {
            Crackle::default().apply(&mut samples, sample_rate, &mut self.rng);
        }

        let chain = AmbienceChain {
            samples: Arc::new(samples),
            filter: profile.filter,
            cutoff_hz: profile.cutoff_hz,
            q: profile.q,
            lfo: profile.sweep.map(|s| (s.rate_hz, s.depth_hz)),
            initial_gain: 0.0,
        };

        let id = match ctx.add_voice(chain) {
            Ok(id) => id,
            Err(e) => {
                warn!("Cannot start ambience {}: {}", ambience, e);
                return;
            }
        };
        ctx.set_voice_target(
            id,
            volume * profile.gain_trim,
            self.config.fade_in_time_constant_secs,
        );
        self.voices.insert(ambience, Voice::new(id, volume, now));
        info!("Ambience {} fading in at volume {:.2}", ambience, volume);
    }

    /// Ramp a live type to `value`, or lazily start it when `value > 0`
    pub fn set_volume(&mut self, ctx: &mut AudioContext, ambience: AmbienceType, value: f32) {
        let Some(profile) = SoundscapeProfile::for_type(ambience) else {
            return;
        };
        let value = value.max(0.0);

        if self.state(ambience).is_live() {
            if let Some(voice) = self.voices.get_mut(&ambience) {
                voice.volume = value;
                ctx.set_voice_target(
                    voice.id,
                    value * profile.gain_trim,
                    self.config.ramp_time_constant_secs,
                );
            }
        } else if value > 0.0 {
            self.start(ctx, ambience, value);
        }
    }

    /// Fade `ambience` out; it is disconnected by `poll` after the release
    /// delay
    pub fn stop(&mut self, ctx: &mut AudioContext, ambience: AmbienceType) {
        let Some(voice) = self.voices.get_mut(&ambience) else {
            return;
        };
        if !voice.state.is_live() {
            return;
        }
        ctx.set_voice_target(voice.id, 0.0, self.config.ramp_time_constant_secs);
        voice.transition(VoiceState::FadingOut, ctx.current_time());
        debug!("Ambience {} fading out", ambience);
    }

    pub fn stop_all(&mut self, ctx: &mut AudioContext) {
        for ambience in AmbienceType::AUDIBLE {
            self.stop(ctx, ambience);
        }
    }

    /// Advance every voice's state machine against context time
    pub fn poll(&mut self, ctx: &mut AudioContext) {
        let now = ctx.current_time();
        let settle = FADE_IN_SETTLE_TIME_CONSTANTS * self.config.fade_in_time_constant_secs;
        let release = self.config.release_delay_secs();

        let mut released: Vec<(AmbienceType, VoiceId)> = Vec::new();
        for (ambience, voice) in self.voices.iter_mut() {
            match voice.state {
                VoiceState::FadingIn if now - voice.since >= settle => {
                    voice.transition(VoiceState::Sustaining, now);
                    debug!("Ambience {} sustaining", ambience);
                }
                VoiceState::FadingOut if now - voice.since >= release => {
                    released.push((*ambience, voice.id));
                }
                _ => {}
            }
        }

        for (ambience, id) in released {
            ctx.remove_voice(id);
            self.voices.remove(&ambience);
            debug!("Ambience {} released", ambience);
        }
    }

    /// Disconnect every voice immediately
    pub fn dispose(&mut self, ctx: &mut AudioContext) {
        for (ambience, voice) in self.voices.drain() {
            ctx.remove_voice(voice.id);
            debug!("Ambience {} disposed", ambience);
        }
    }

    pub fn state(&self, ambience: AmbienceType) -> VoiceState {
        self.voices
            .get(&ambience)
            .map_or(VoiceState::Idle, |voice| voice.state)
    }

    /// Voices still connected, including those fading out
    pub fn live_voices(&self) -> usize {
        self.voices.len()
    }

    /// Context node backing `ambience`, if connected
    pub fn voice_id(&self, ambience: AmbienceType) -> Option<VoiceId> {
        self.voices.get(&ambience).map(|voice| voice.id)
    }

    /// Last requested volume for `ambience`, if connected
    pub fn volume(&self, ambience: AmbienceType) -> Option<f32> {
        self.voices.get(&ambience).map(|voice| voice.volume)
    }
}
