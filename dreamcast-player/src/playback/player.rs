//! Composed player state machine
//!
//! Thin UI state on top of [`NarrationController`]: autoplay for freshly
//! generated stories, screensaver and read mode, the mixer panel, the sleep
//! timer, the wake lock and teardown.

use super::controller::{NarrationController, NarrationInput};
use super::preview::PreviewPolicy;
use super::wake_lock::{KeepAwake, WakeLockGuard};
use crate::ambience::AmbienceEngine;
use crate::audio::{AudioContext, Clock};
use crate::config::{PlaybackConfig, PlayerConfig};
use crate::error::{Error, Result};
use dreamcast_common::events::PlayerEvent;
use dreamcast_common::time::wall_clock_label;
use dreamcast_common::{AmbienceType, Story};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
struct SleepTimer {
    /// Clock time the countdown runs out
    deadline: f64,
    /// Clock time the fade-out completes, once started
    fade_until: Option<f64>,
}

pub struct Player {
    controller: NarrationController,
    config: PlaybackConfig,
    clock: Arc<dyn Clock>,
    keep_awake: Arc<dyn KeepAwake>,
    wake_lock: Option<WakeLockGuard>,

    story: Option<Story>,
    autoplay_at: Option<f64>,
    sleep: Option<SleepTimer>,
    screensaver: bool,
    read_mode: bool,
    mixer_open: bool,
}

impl Player {
    /// Build a player around a fresh context
    ///
    /// The context must share `clock`; autoplay and the sleep timer run on
    /// the clock directly because the context is suspended until first play.
    pub fn new(
        config: &PlayerConfig,
        ctx: AudioContext,
        clock: Arc<dyn Clock>,
        preview: PreviewPolicy,
        keep_awake: Arc<dyn KeepAwake>,
    ) -> Self {
        let engine = AmbienceEngine::new(config.ambience.clone());
        Self::with_engine(config, ctx, engine, clock, preview, keep_awake)
    }

    /// Same as [`Player::new`] with a caller-supplied engine
    pub fn with_engine(
        config: &PlayerConfig,
        ctx: AudioContext,
        engine: AmbienceEngine,
        clock: Arc<dyn Clock>,
        preview: PreviewPolicy,
        keep_awake: Arc<dyn KeepAwake>,
    ) -> Self {
        Self {
            controller: NarrationController::new(config, ctx, engine, preview),
            config: config.playback.clone(),
            clock,
            keep_awake,
            wake_lock: None,
            story: None,
            autoplay_at: None,
            sleep: None,
            screensaver: false,
            read_mode: false,
            mixer_open: false,
        }
    }

    pub fn controller(&self) -> &NarrationController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut NarrationController {
        &mut self.controller
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.controller.subscribe()
    }

    pub fn story(&self) -> Option<&Story> {
        self.story.as_ref()
    }

    // ---- session ----

    /// Open `story`, loading `payload` or else the story's audio URL
    ///
    /// A newly generated story starts by itself: after the autoplay delay
    /// when its audio was already decoded, right away once fetched.
    pub async fn open(
        &mut self,
        story: Story,
        payload: Option<NarrationInput>,
        is_new_story: bool,
    ) -> Result<()> {
        info!("Opening story '{}' ({})", story.title, story.id);
        self.autoplay_at = None;
        self.sleep = None;
        self.screensaver = false;
        self.read_mode = false;
        self.mixer_open = false;

        // Nothing of the previous story may keep sounding, and the new
        // soundscape only starts with the next play
        self.controller.reset();
        self.controller.set_ambience_type(story.ambience);

        let input = payload.or_else(|| story.audio_url.clone().map(NarrationInput::Url));
        self.story = Some(story);

        let Some(input) = input else {
            let err = Error::MediaLoad("Story has no narration audio".to_string());
            self.controller.report_load_failure(&err);
            return Err(err);
        };
        let decoded = matches!(input, NarrationInput::Decoded(_));

        self.controller.load(input).await?;

        if is_new_story {
            if decoded {
                let delay = self.config.autoplay_delay_ms as f64 / 1000.0;
                self.autoplay_at = Some(self.clock.now() + delay);
                debug!("Autoplay scheduled in {:.1}s", delay);
            } else {
                self.play();
            }
        }
        Ok(())
    }

    /// Per-frame update; drive this from the host's frame timer
    pub fn tick(&mut self) {
        let now = self.clock.now();

        if self.autoplay_at.is_some_and(|at| now >= at) {
            self.autoplay_at = None;
            self.play();
        }

        self.tick_sleep_timer(now);
        self.controller.tick();

        if self.controller.has_ended() {
            self.screensaver = false;
        }
    }

    fn tick_sleep_timer(&mut self, now: f64) {
        let Some(timer) = self.sleep else {
            return;
        };

        match timer.fade_until {
            None if now >= timer.deadline => {
                info!("Sleep timer expired, fading out");
                self.controller.fade_voice_out(self.config.sleep_fade_secs);
                self.sleep = Some(SleepTimer {
                    fade_until: Some(now + self.config.sleep_fade_secs),
                    ..timer
                });
            }
            Some(fade_until) if now >= fade_until => {
                // The next source starts at the mixer level, which the fade
                // never touched
                self.controller.pause();
                self.sleep = None;
                self.controller.broadcast_event(PlayerEvent::SleepTimerExpired {
                    timestamp: chrono::Utc::now(),
                });
            }
            _ => {}
        }
    }

    // ---- transport ----

    pub fn play(&mut self) {
        self.controller.play(None);
        self.after_play();
    }

    pub fn pause(&mut self) {
        self.autoplay_at = None;
        self.controller.pause();
    }

    pub fn toggle_play(&mut self) {
        if self.controller.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Listen again from the top (end-of-story overlay)
    pub fn replay(&mut self) {
        self.controller.play(Some(0.0));
        self.after_play();
    }

    /// Seek by progress-bar position (0 to 100)
    pub fn seek_percent(&mut self, percent: f64) {
        if let Some(duration) = self.controller.duration() {
            self.controller
                .seek(percent.clamp(0.0, 100.0) / 100.0 * duration);
        }
    }

    fn after_play(&mut self) {
        if self.controller.is_playing() && self.wake_lock.is_none() {
            match WakeLockGuard::acquire(Arc::clone(&self.keep_awake)) {
                Ok(guard) => self.wake_lock = Some(guard),
                Err(e) => warn!("Could not keep the display awake: {}", e),
            }
        }
    }

    /// Ask for a continuation of the current story
    pub fn request_sequel(&mut self) {
        if let Some(story) = &self.story {
            info!("Sequel requested for '{}'", story.title);
            self.controller.broadcast_event(PlayerEvent::SequelRequested {
                story_id: story.id,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    // ---- UI state ----

    pub fn toggle_screensaver(&mut self) {
        self.screensaver = !self.screensaver;
    }

    pub fn is_screensaver(&self) -> bool {
        self.screensaver
    }

    /// Clock shown on the screensaver
    pub fn clock_label(&self) -> String {
        wall_clock_label(chrono::Local::now())
    }

    pub fn toggle_read_mode(&mut self) {
        self.read_mode = !self.read_mode;
    }

    pub fn is_read_mode(&self) -> bool {
        self.read_mode
    }

    pub fn open_mixer(&mut self) {
        self.mixer_open = true;
    }

    pub fn close_mixer(&mut self) {
        self.mixer_open = false;
    }

    pub fn is_mixer_open(&self) -> bool {
        self.mixer_open
    }

    /// Soundscape button: unmutes ambience and switches to `ambience`
    pub fn select_soundscape(&mut self, ambience: AmbienceType) {
        self.controller.set_ambience_muted(false);
        self.controller.set_ambience_type(ambience);
    }

    // ---- sleep timer ----

    /// Pause after `minutes`; 0 cancels
    pub fn set_sleep_timer(&mut self, minutes: u32) {
        if minutes == 0 {
            self.sleep = None;
            debug!("Sleep timer cancelled");
            return;
        }
        self.sleep = Some(SleepTimer {
            deadline: self.clock.now() + minutes as f64 * 60.0,
            fade_until: None,
        });
        info!("Sleep timer set for {} min", minutes);
    }

    /// Seconds left before the fade starts
    pub fn sleep_remaining(&self) -> Option<f64> {
        self.sleep
            .filter(|timer| timer.fade_until.is_none())
            .map(|timer| (timer.deadline - self.clock.now()).max(0.0))
    }

    pub fn has_wake_lock(&self) -> bool {
        self.wake_lock.is_some()
    }

    // ---- teardown ----

    /// Leave the player screen
    pub fn back(&mut self) {
        self.close();
    }

    /// Stop everything and release the context and the wake lock
    pub fn close(&mut self) {
        self.autoplay_at = None;
        self.sleep = None;
        self.controller.close();
        if self.wake_lock.take().is_some() {
            debug!("Wake lock released");
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.close();
    }
}
