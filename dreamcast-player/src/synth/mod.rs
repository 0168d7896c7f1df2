//! Procedural synthesis primitives
//!
//! Noise generators, a biquad filter and a sine LFO. Ambience soundscapes are
//! built from a pre-rendered noise loop pushed through a filter whose cutoff
//! may be swept by the LFO; nothing here depends on audio asset files.

pub mod filter;
pub mod lfo;
pub mod noise;

pub use filter::{Biquad, FilterKind};
pub use lfo::Lfo;
pub use noise::{render_loop, BrownNoise, Crackle, NoiseColor, PinkNoise, WhiteNoise};
