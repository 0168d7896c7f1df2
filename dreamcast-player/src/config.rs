//! Configuration management for the DreamCast player
//!
//! All settings are optional in the TOML file; missing values fall back to
//! built-in defaults defined in code.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (--config, --device)
//! 2. Environment variable (`DREAMCAST_CONFIG`)
//! 3. `<config_dir>/dreamcast/player.toml`
//! 4. Built-in defaults (code constants)

use crate::error::{Error, Result};
use dreamcast_common::config::{load_toml, resolve_config_path};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "DREAMCAST_CONFIG";

/// Default config file name
pub const CONFIG_FILE_NAME: &str = "player.toml";

/// Complete player configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub playback: PlaybackConfig,
    pub ambience: AmbienceConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Narration transport tunables
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Preview ceiling for non-entitled sessions (seconds)
    pub preview_limit_secs: f64,

    /// How close to the end a completed source must be to count as a
    /// natural end (seconds)
    pub natural_end_tolerance_secs: f64,

    /// Minimum spacing of PlaybackProgress events
    pub progress_interval_ms: u64,

    /// Frame cadence used by hosts that drive `tick()` from a timer
    pub frame_rate_hz: u32,

    /// Delay before a freshly generated story starts on its own
    pub autoplay_delay_ms: u64,

    /// Voice level at session start (slider range 0.0-1.5)
    pub default_voice_volume: f32,

    /// Linear fade length when the sleep timer expires (seconds)
    pub sleep_fade_secs: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            preview_limit_secs: 30.0,
            natural_end_tolerance_secs: 0.5,
            progress_interval_ms: 250,
            frame_rate_hz: 60,
            autoplay_delay_ms: 800,
            default_voice_volume: 1.0,
            sleep_fade_secs: 2.0,
        }
    }
}

impl PlaybackConfig {
    /// Interval between animation frames
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate_hz.max(1) as f64)
    }
}

/// Ambience engine tunables
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AmbienceConfig {
    /// Ambience is mixed at this fraction of the slider value so narration
    /// stays intelligible
    pub attenuation: f32,

    /// Ambience slider value at session start (0.0-1.0)
    pub default_volume: f32,

    /// Time constant of the initial fade-in (seconds)
    pub fade_in_time_constant_secs: f64,

    /// Time constant for volume changes and fade-outs (seconds)
    pub ramp_time_constant_secs: f64,

    /// Delay between starting a fade-out and disconnecting the voice
    pub release_delay_ms: u64,

    /// Length of the pre-rendered noise loop (seconds)
    pub loop_seconds: f64,

    /// Mix crackle impulses into the fire soundscape
    pub crackle: bool,
}

impl Default for AmbienceConfig {
    fn default() -> Self {
        Self {
            attenuation: 0.3,
            default_volume: 0.5,
            fade_in_time_constant_secs: 1.0,
            ramp_time_constant_secs: 0.1,
            release_delay_ms: 500,
            loop_seconds: 2.0,
            crackle: true,
        }
    }
}

impl AmbienceConfig {
    pub fn release_delay_secs(&self) -> f64 {
        self.release_delay_ms as f64 / 1000.0
    }
}

/// Audio output settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output device name (None = system default)
    pub device: Option<String>,

    /// Context sample rate; decoded narration is resampled to it
    pub sample_rate: u32,

    /// Output buffer size in frames (None = device default)
    pub buffer_size: Option<u32>,

    /// Visualizer FFT size (power of two)
    pub fft_size: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: 44100,
            buffer_size: None,
            fft_size: 64,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl PlayerConfig {
    /// Resolve and load the config file, falling back to defaults
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let path = resolve_config_path(cli_path, CONFIG_ENV_VAR, CONFIG_FILE_NAME);
        let config: PlayerConfig = load_toml(path.as_deref())?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.output.sample_rate < 8000 {
            return Err(Error::Config(format!(
                "sample_rate {} is too low",
                self.output.sample_rate
            )));
        }
        if !self.output.fft_size.is_power_of_two() || self.output.fft_size < 32 {
            return Err(Error::Config(format!(
                "fft_size {} must be a power of two >= 32",
                self.output.fft_size
            )));
        }
        if self.playback.preview_limit_secs <= 0.0 {
            return Err(Error::Config("preview_limit_secs must be positive".to_string()));
        }
        if self.playback.natural_end_tolerance_secs < 0.0 {
            return Err(Error::Config(
                "natural_end_tolerance_secs must not be negative".to_string(),
            ));
        }
        if self.ambience.loop_seconds <= 0.0 {
            return Err(Error::Config("loop_seconds must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.ambience.attenuation) {
            return Err(Error::Config("attenuation must be within 0.0-1.0".to_string()));
        }
        Ok(())
    }
}
