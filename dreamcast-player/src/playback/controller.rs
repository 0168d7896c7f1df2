//! Narration playback controller
//!
//! Owns the audio context, the decoded narration buffer and the ambience
//! engine for one player session.
//!
//! **Timing:** elapsed time is never read back from the renderer. Each
//! `play` records `start_clock = ctx_now - offset`; while playing,
//! `elapsed = ctx_now - start_clock`, while paused it is the frozen offset.
//!
//! **Sources:** a narration source is single-use. Every play creates a new
//! one and every pause/seek/stop discards the current one, so its token is
//! the generation marker that separates a live completion from a stale one.

use crate::ambience::AmbienceEngine;
use crate::audio::decoder::{decode_bytes, extension_hint};
use crate::audio::{AudioBuffer, AudioContext, Resampler, SourceEnded, SourceToken};
use crate::config::{PlaybackConfig, PlayerConfig};
use crate::error::{Error, Result};
use crate::playback::mixer::{MixerState, MAX_AMBIENCE_VOLUME, MAX_VOICE_VOLUME};
use crate::playback::preview::PreviewPolicy;
use dreamcast_common::events::{MixerChannel, PlaybackState, PlayerEvent};
use dreamcast_common::time::format_clock;
use dreamcast_common::AmbienceType;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Event channel depth; slow subscribers lag rather than block playback
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Narration payload handed to [`NarrationController::load`]
#[derive(Debug, Clone)]
pub enum NarrationInput {
    /// Already-decoded PCM
    Decoded(Arc<AudioBuffer>),
    /// Encoded bytes (MP3, WAV, ...)
    Bytes(Vec<u8>),
    /// `http(s)://` URL, `file://` URL or plain filesystem path
    Url(String),
}

pub struct NarrationController {
    config: PlaybackConfig,
    ctx: AudioContext,
    engine: AmbienceEngine,
    events: broadcast::Sender<PlayerEvent>,
    http: reqwest::Client,

    buffer: Option<Arc<AudioBuffer>>,
    loading: bool,

    /// Current narration source; `None` whenever nothing is playing
    source: Option<SourceToken>,
    transport: PlaybackState,
    start_clock: f64,
    paused_offset: f64,
    progress: f64,
    last_progress_event: Option<f64>,

    mixer: MixerState,
    preview: PreviewPolicy,
}

impl NarrationController {
    pub fn new(
        config: &PlayerConfig,
        ctx: AudioContext,
        engine: AmbienceEngine,
        preview: PreviewPolicy,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let mixer = MixerState::new(
            config.playback.default_voice_volume,
            config.ambience.default_volume,
            config.ambience.attenuation,
        );

        Self {
            config: config.playback.clone(),
            ctx,
            engine,
            events,
            http: reqwest::Client::new(),
            buffer: None,
            loading: false,
            source: None,
            transport: PlaybackState::Stopped,
            start_clock: 0.0,
            paused_offset: 0.0,
            progress: 0.0,
            last_progress_event: None,
            mixer,
            preview,
        }
    }

    // ---- events ----

    /// Subscribe to the player event stream
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    pub(crate) fn broadcast_event(&self, event: PlayerEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    fn set_transport(&mut self, new_state: PlaybackState) {
        let old_state = self.transport;
        if old_state == new_state {
            return;
        }
        self.transport = new_state;
        info!("Playback state: {} -> {}", old_state, new_state);
        self.broadcast_event(PlayerEvent::PlaybackStateChanged {
            old_state,
            new_state,
            timestamp: chrono::Utc::now(),
        });
    }

    // ---- loading ----

    /// Fetch (if needed), decode and install a narration buffer
    ///
    /// The previous session is hard-stopped first. On failure the controller
    /// is left without a buffer, so `play` does nothing until a later load
    /// succeeds.
    pub async fn load(&mut self, input: NarrationInput) -> Result<f64> {
        self.reset();
        self.buffer = None;
        self.loading = true;

        let result = self.fetch_and_decode(input).await;
        self.loading = false;

        match result {
            Ok(buffer) => {
                let duration = buffer.duration();
                self.buffer = Some(buffer);
                info!("Narration loaded ({:.2}s)", duration);
                self.broadcast_event(PlayerEvent::StoryLoaded {
                    duration_secs: duration,
                    timestamp: chrono::Utc::now(),
                });
                Ok(duration)
            }
            Err(e) => {
                let err = match e {
                    Error::MediaLoad(_) => e,
                    other => Error::media_load(other),
                };
                self.report_load_failure(&err);
                Err(err)
            }
        }
    }

    pub(crate) fn report_load_failure(&self, err: &Error) {
        error!("Failed to load narration: {}", err);
        self.broadcast_event(PlayerEvent::MediaLoadFailed {
            reason: err.to_string(),
            timestamp: chrono::Utc::now(),
        });
    }

    async fn fetch_and_decode(&self, input: NarrationInput) -> Result<Arc<AudioBuffer>> {
        let target_rate = self.ctx.sample_rate();

        let (bytes, hint) = match input {
            NarrationInput::Decoded(buffer) => {
                if buffer.frames() == 0 {
                    return Err(Error::MediaLoad("Narration buffer is empty".to_string()));
                }
                if buffer.sample_rate() == target_rate {
                    return Ok(buffer);
                }
                let resampled =
                    tokio::task::spawn_blocking(move || Resampler::resample(&buffer, target_rate))
                        .await
                        .map_err(|e| Error::MediaLoad(format!("Resample task failed: {}", e)))??;
                return Ok(Arc::new(resampled));
            }
            NarrationInput::Bytes(bytes) => (bytes, None),
            NarrationInput::Url(location) => {
                let bytes = self.fetch(&location).await?;
                (bytes, extension_hint(&location).map(str::to_owned))
            }
        };

        let buffer = tokio::task::spawn_blocking(move || -> Result<AudioBuffer> {
            let decoded = decode_bytes(bytes, hint.as_deref())?;
            Resampler::resample(&decoded, target_rate)
        })
        .await
        .map_err(|e| Error::MediaLoad(format!("Decode task failed: {}", e)))??;

        Ok(Arc::new(buffer))
    }

    async fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        if location.starts_with("http://") || location.starts_with("https://") {
            debug!("Fetching narration from {}", location);
            let response = self.http.get(location).send().await?.error_for_status()?;
            Ok(response.bytes().await?.to_vec())
        } else {
            let path = location.strip_prefix("file://").unwrap_or(location);
            debug!("Reading narration from {}", path);
            Ok(tokio::fs::read(path).await?)
        }
    }

    // ---- transport ----

    /// Start playback at `offset` seconds, or at the frozen offset
    ///
    /// Already playing with no offset is a no-op; with an offset it restarts
    /// there. An offset at or past the end reports completion instead of
    /// starting a source.
    pub fn play(&mut self, offset: Option<f64>) {
        self.ctx.resume();

        let Some(buffer) = self.buffer.clone() else {
            if self.transport == PlaybackState::Ended {
                self.set_transport(PlaybackState::Stopped);
            }
            debug!("play() ignored: no narration loaded");
            return;
        };

        if self.is_playing() {
            if offset.is_none() {
                return;
            }
            self.discard_source();
        }

        let duration = buffer.duration();
        let offset = offset
            .filter(|o| o.is_finite())
            .unwrap_or(self.paused_offset)
            .max(0.0);

        if offset >= duration {
            debug!("play() at {:.3}s is past the end ({:.3}s)", offset, duration);
            self.finish();
            return;
        }

        let token = match self.ctx.start_source(buffer, offset, self.mixer.voice_gain()) {
            Ok(token) => token,
            Err(e) => {
                warn!("Cannot start narration: {}", e);
                return;
            }
        };

        self.source = Some(token);
        self.start_clock = self.ctx.current_time() - offset;
        self.paused_offset = offset;
        self.progress = offset / duration * 100.0;
        self.last_progress_event = None;

        if !self.mixer.ambience_type.is_silent() {
            let gain = self.mixer.ambience_gain();
            self.engine.start(&mut self.ctx, self.mixer.ambience_type, gain);
        }

        self.set_transport(PlaybackState::Playing);
        debug!("Narration playing from {:.3}s", offset);
    }

    /// Pause, freezing the offset at the current elapsed time
    pub fn pause(&mut self) {
        if !self.is_playing() {
            return;
        }
        let duration = self.duration().unwrap_or(0.0);
        let elapsed = self.raw_elapsed().clamp(0.0, duration);

        self.discard_source();
        self.paused_offset = elapsed;
        self.progress = progress_percent(elapsed, duration);
        self.engine.stop_all(&mut self.ctx);
        self.set_transport(PlaybackState::Paused);
        debug!("Narration paused at {:.3}s", elapsed);
    }

    /// Move to `target` seconds, clamped into the story
    pub fn seek(&mut self, target: f64) {
        let Some(duration) = self.duration() else {
            return;
        };
        let target = if target.is_finite() {
            target.clamp(0.0, duration)
        } else {
            0.0
        };

        if self.is_playing() {
            self.pause();
            self.play(Some(target));
        } else {
            self.paused_offset = target;
            self.progress = progress_percent(target, duration);
            debug!("Seeked to {:.3}s while paused", target);
        }
    }

    /// Hard reset to the start; safe to call repeatedly
    pub fn stop(&mut self) {
        self.discard_source();
        self.paused_offset = 0.0;
        self.progress = 0.0;
        self.engine.stop_all(&mut self.ctx);
        self.set_transport(PlaybackState::Stopped);
    }

    /// Stop for a story switch: the source and every ambience voice are
    /// disconnected now, with no fade
    pub fn reset(&mut self) {
        self.discard_source();
        self.engine.dispose(&mut self.ctx);
        self.paused_offset = 0.0;
        self.progress = 0.0;
        self.set_transport(PlaybackState::Stopped);
    }

    fn discard_source(&mut self) {
        if let Some(token) = self.source.take() {
            self.ctx.stop_source(token);
        }
    }

    /// Natural end (or a play request past the end)
    fn finish(&mut self) {
        self.discard_source();
        self.paused_offset = 0.0;
        self.progress = 100.0;
        self.engine.stop_all(&mut self.ctx);
        self.set_transport(PlaybackState::Ended);
        self.broadcast_event(PlayerEvent::StoryEnded {
            timestamp: chrono::Utc::now(),
        });
    }

    // ---- per-frame ----

    /// Per-frame update
    ///
    /// Handles source completions, advances ambience fades, enforces the
    /// preview ceiling and publishes progress. The ceiling is checked here,
    /// so it trips on the first frame at or past it.
    pub fn tick(&mut self) {
        self.ctx.check_output();
        for ended in self.ctx.take_ended() {
            self.on_source_ended(ended);
        }
        self.engine.poll(&mut self.ctx);

        if !self.is_playing() {
            return;
        }
        let Some(duration) = self.duration() else {
            return;
        };
        let elapsed = self.raw_elapsed();

        if self.preview.ceiling_reached(elapsed) {
            info!(
                "Preview ceiling reached at {:.2}s, pausing for paywall",
                elapsed
            );
            self.pause();
            self.broadcast_event(PlayerEvent::PaywallRequired {
                elapsed_secs: elapsed,
                timestamp: chrono::Utc::now(),
            });
            return;
        }

        self.progress = progress_percent(elapsed, duration);

        let now = self.ctx.current_time();
        let interval = self.config.progress_interval_ms as f64 / 1000.0;
        if self
            .last_progress_event
            .map_or(true, |last| now - last >= interval)
        {
            self.last_progress_event = Some(now);
            self.broadcast_event(PlayerEvent::PlaybackProgress {
                elapsed_secs: elapsed.clamp(0.0, duration),
                duration_secs: duration,
                progress_percent: self.progress,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    fn on_source_ended(&mut self, ended: SourceEnded) {
        if self.source != Some(ended.token) {
            debug!("Ignoring completion of superseded source {:?}", ended.token);
            return;
        }
        let Some(duration) = self.duration() else {
            return;
        };

        let elapsed = ended.at - self.start_clock;
        if elapsed >= duration - self.config.natural_end_tolerance_secs {
            info!("Narration finished ({:.2}s of {:.2}s)", elapsed, duration);
            self.finish();
        } else {
            debug!(
                "Source {:?} ended at {:.2}s, short of {:.2}s; not a natural end",
                ended.token, elapsed, duration
            );
        }
    }

    // ---- voice ----

    /// Voice slider (0.0 to 1.5)
    pub fn set_voice_volume(&mut self, volume: f32) {
        self.mixer.voice.volume = volume.clamp(0.0, MAX_VOICE_VOLUME);
        self.apply_voice_gain();
        self.broadcast_volume(MixerChannel::Voice);
    }

    pub fn set_voice_muted(&mut self, muted: bool) {
        self.mixer.voice.muted = muted;
        self.apply_voice_gain();
        self.broadcast_volume(MixerChannel::Voice);
    }

    pub fn mute_voice(&mut self) {
        self.set_voice_muted(true);
    }

    pub fn unmute_voice(&mut self) {
        self.set_voice_muted(false);
    }

    fn apply_voice_gain(&mut self) {
        if let Some(token) = self.source {
            self.ctx.set_source_gain(token, self.mixer.voice_gain());
        }
    }

    /// Linear fade of the live narration to silence over `seconds`
    ///
    /// Only the live source is affected; the next source starts at the
    /// mixer level again.
    pub fn fade_voice_out(&mut self, seconds: f64) {
        if let Some(token) = self.source {
            self.ctx.ramp_source_gain(token, 0.0, seconds);
            debug!("Fading narration out over {:.1}s", seconds);
        }
    }

    /// Gain currently applied to narration
    pub fn voice_gain(&self) -> f32 {
        self.source
            .and_then(|token| self.ctx.source_gain(token))
            .unwrap_or_else(|| self.mixer.voice_gain())
    }

    // ---- ambience ----

    /// Select the soundscape; while narration plays the old one fades out
    /// as the new one fades in
    pub fn set_ambience_type(&mut self, ambience: AmbienceType) {
        let previous = self.mixer.ambience_type;
        if previous == ambience {
            return;
        }
        self.mixer.ambience_type = ambience;

        if self.is_playing() {
            self.engine.stop(&mut self.ctx, previous);
            if !ambience.is_silent() {
                let gain = self.mixer.ambience_gain();
                self.engine.start(&mut self.ctx, ambience, gain);
            }
        }

        info!("Ambience: {} -> {}", previous, ambience);
        self.broadcast_event(PlayerEvent::AmbienceChanged {
            ambience,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Ambience slider (0.0 to 1.0)
    pub fn set_ambience_volume(&mut self, volume: f32) {
        self.mixer.ambience.volume = volume.clamp(0.0, MAX_AMBIENCE_VOLUME);
        self.apply_ambience_gain();
        self.broadcast_volume(MixerChannel::Ambience);
    }

    pub fn set_ambience_muted(&mut self, muted: bool) {
        self.mixer.ambience.muted = muted;
        self.apply_ambience_gain();
        self.broadcast_volume(MixerChannel::Ambience);
    }

    fn apply_ambience_gain(&mut self) {
        if self.is_playing() && !self.mixer.ambience_type.is_silent() {
            let gain = self.mixer.ambience_gain();
            self.engine.set_volume(&mut self.ctx, self.mixer.ambience_type, gain);
        }
    }

    fn broadcast_volume(&self, channel: MixerChannel) {
        let level = match channel {
            MixerChannel::Voice => self.mixer.voice,
            MixerChannel::Ambience => self.mixer.ambience,
        };
        self.broadcast_event(PlayerEvent::VolumeChanged {
            channel,
            volume: level.volume,
            muted: level.muted,
            timestamp: chrono::Utc::now(),
        });
    }

    // ---- observers ----

    pub fn state(&self) -> PlaybackState {
        self.transport
    }

    pub fn is_playing(&self) -> bool {
        self.transport == PlaybackState::Playing
    }

    /// Set once per natural completion; cleared by the next play
    pub fn has_ended(&self) -> bool {
        self.transport == PlaybackState::Ended
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn duration(&self) -> Option<f64> {
        self.buffer.as_ref().map(|b| b.duration())
    }

    fn raw_elapsed(&self) -> f64 {
        if self.is_playing() {
            self.ctx.current_time() - self.start_clock
        } else {
            self.paused_offset
        }
    }

    /// Seconds into the story, within `[0, duration]`
    pub fn elapsed(&self) -> f64 {
        let duration = self.duration().unwrap_or(0.0);
        self.raw_elapsed().clamp(0.0, duration)
    }

    pub fn remaining(&self) -> f64 {
        (self.duration().unwrap_or(0.0) - self.elapsed()).max(0.0)
    }

    /// Offset the next `play()` starts from
    pub fn paused_offset(&self) -> f64 {
        self.paused_offset
    }

    /// Progress in percent, as of the last update
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn elapsed_label(&self) -> String {
        format_clock(self.elapsed())
    }

    pub fn remaining_label(&self) -> String {
        format_clock(self.remaining())
    }

    /// Progress-bar position of the preview ceiling, if one applies
    pub fn preview_marker_percent(&self) -> Option<f64> {
        self.duration()
            .and_then(|duration| self.preview.marker_percent(duration))
    }

    pub fn preview(&self) -> PreviewPolicy {
        self.preview
    }

    /// Swap the entitlement for this session (e.g. after an upgrade)
    pub fn set_preview_policy(&mut self, preview: PreviewPolicy) {
        self.preview = preview;
    }

    pub fn mixer(&self) -> &MixerState {
        &self.mixer
    }

    pub fn engine(&self) -> &AmbienceEngine {
        &self.engine
    }

    pub fn context(&self) -> &AudioContext {
        &self.ctx
    }

    /// Visualizer bytes for the narration path
    pub fn frequency_data(&self) -> Vec<u8> {
        self.ctx.frequency_data()
    }

    // ---- teardown ----

    /// Release the source, every ambience voice and the context
    pub fn close(&mut self) {
        if self.ctx.is_closed() {
            return;
        }
        self.discard_source();
        self.engine.dispose(&mut self.ctx);
        self.ctx.close();
        self.paused_offset = 0.0;
        self.progress = 0.0;
        self.set_transport(PlaybackState::Stopped);
    }

    pub fn is_closed(&self) -> bool {
        self.ctx.is_closed()
    }
}

fn progress_percent(elapsed: f64, duration: f64) -> f64 {
    if duration <= 0.0 {
        return 0.0;
    }
    (elapsed / duration).clamp(0.0, 1.0) * 100.0
}
