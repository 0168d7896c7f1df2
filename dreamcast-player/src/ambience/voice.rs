//! Per-type voice lifecycle

use crate::audio::VoiceId;

/// Lifecycle of one ambience type
///
/// ```text
/// Idle → FadingIn → Sustaining → FadingOut → Idle
///                 ↖______________↙ (revived before release)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Idle,
    FadingIn,
    Sustaining,
    FadingOut,
}

impl VoiceState {
    /// Audible or heading towards audible
    pub fn is_live(&self) -> bool {
        matches!(self, VoiceState::FadingIn | VoiceState::Sustaining)
    }
}

/// A connected voice chain and where it is in its lifecycle
#[derive(Debug, Clone)]
pub(crate) struct Voice {
    pub(crate) id: VoiceId,
    pub(crate) state: VoiceState,
    /// Context time of the last state change
    pub(crate) since: f64,
    /// Requested level before the per-type trim
    pub(crate) volume: f32,
}

impl Voice {
    pub(crate) fn new(id: VoiceId, volume: f32, now: f64) -> Self {
        Self {
            id,
            state: VoiceState::FadingIn,
            since: now,
            volume,
        }
    }

    pub(crate) fn transition(&mut self, state: VoiceState, now: f64) {
        self.state = state;
        self.since = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_states() {
        assert!(!VoiceState::Idle.is_live());
        assert!(VoiceState::FadingIn.is_live());
        assert!(VoiceState::Sustaining.is_live());
        assert!(!VoiceState::FadingOut.is_live());
    }
}
