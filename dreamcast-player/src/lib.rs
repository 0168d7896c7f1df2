//! # DreamCast Player Library (dreamcast-player)
//!
//! Narration playback and procedural ambience mixing for bedtime stories.
//!
//! **Architecture:** a shared [`audio::AudioContext`] renders one narration
//! path and any number of ambience voices into a cpal output stream. The
//! [`playback::NarrationController`] drives transport and mixer state; the
//! [`ambience::AmbienceEngine`] synthesizes looping soundscapes from noise;
//! the [`playback::Player`] layers screensaver, read mode, sleep timer and
//! teardown on top.

pub mod ambience;
pub mod audio;
pub mod config;
pub mod error;
pub mod playback;
pub mod synth;

pub use ambience::AmbienceEngine;
pub use audio::{AudioContext, Clock, ManualClock, SystemClock};
pub use config::PlayerConfig;
pub use error::{Error, Result};
pub use playback::{NarrationController, NarrationInput, Player, PreviewPolicy};
