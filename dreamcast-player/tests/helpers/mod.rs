//! Test helper modules for DreamCast player integration tests
//!
//! - audio_generator: hound-written WAV fixtures
//! - session: controller/player wiring on a `ManualClock`

#![allow(dead_code)]

pub mod audio_generator;
pub mod session;

pub use audio_generator::{sine_buffer, write_sine_wav, wav_bytes};
pub use session::{
    collect_events, controller_with, count_events, player_with, CountingWakeLock, TEST_SAMPLE_RATE,
};
