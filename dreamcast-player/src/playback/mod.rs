//! Narration playback
//!
//! The [`NarrationController`] owns transport, timing and mixer state for a
//! session; the [`Player`] adds the UI-level behaviour around it.

pub mod controller;
pub mod mixer;
pub mod player;
pub mod preview;
pub mod wake_lock;

pub use controller::{NarrationController, NarrationInput};
pub use mixer::{ChannelLevel, MixerState};
pub use player::Player;
pub use preview::PreviewPolicy;
pub use wake_lock::{KeepAwake, NoopWakeLock, WakeLockGuard};
