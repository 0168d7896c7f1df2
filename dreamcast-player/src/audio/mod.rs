//! Audio subsystem
//!
//! Decoding, resampling, the render graph and its context, and device
//! output.

pub mod analyser;
pub mod clock;
pub mod context;
pub mod decoder;
pub mod graph;
pub mod output;
pub mod param;
pub mod resampler;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{AudioContext, ContextState, SourceEnded, SourceToken, VoiceId};
pub use graph::AmbienceChain;
pub use output::{AudioOutput, OutputFormat};
pub use resampler::Resampler;
pub use types::AudioBuffer;
