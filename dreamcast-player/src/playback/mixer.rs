//! Mixer panel state
//!
//! Levels are stored as the listener set them; mute is an override applied
//! when computing the gain, so unmuting always restores the stored level.

use dreamcast_common::AmbienceType;
use serde::Serialize;

/// Upper end of the voice slider (a little boost over unity)
pub const MAX_VOICE_VOLUME: f32 = 1.5;

/// Upper end of the ambience slider
pub const MAX_AMBIENCE_VOLUME: f32 = 1.0;

/// Volume slider plus mute toggle for one channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelLevel {
    pub volume: f32,
    pub muted: bool,
}

impl ChannelLevel {
    pub fn new(volume: f32) -> Self {
        Self {
            volume,
            muted: false,
        }
    }

    /// Level after the mute override
    pub fn effective(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MixerState {
    pub voice: ChannelLevel,
    pub ambience: ChannelLevel,
    pub ambience_type: AmbienceType,
    /// Ambience is mixed at this fraction of its slider value
    pub attenuation: f32,
}

impl MixerState {
    pub fn new(voice_volume: f32, ambience_volume: f32, attenuation: f32) -> Self {
        Self {
            voice: ChannelLevel::new(voice_volume.clamp(0.0, MAX_VOICE_VOLUME)),
            ambience: ChannelLevel::new(ambience_volume.clamp(0.0, MAX_AMBIENCE_VOLUME)),
            ambience_type: AmbienceType::Silent,
            attenuation,
        }
    }

    /// Gain for a new or live narration source
    pub fn voice_gain(&self) -> f32 {
        self.voice.effective()
    }

    /// Gain handed to the ambience engine
    pub fn ambience_gain(&self) -> f32 {
        self.ambience.effective() * self.attenuation
    }
}
