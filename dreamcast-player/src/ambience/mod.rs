//! Ambience mixing engine
//!
//! Procedural background soundscapes, one live voice per type, each with an
//! independent smoothly-ramped gain stage feeding the context's ambience bus.

pub mod engine;
pub mod profile;
pub mod voice;

pub use engine::AmbienceEngine;
pub use profile::{CutoffSweep, SoundscapeProfile};
pub use voice::VoiceState;
