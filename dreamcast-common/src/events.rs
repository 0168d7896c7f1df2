//! Event types for the DreamCast player event stream

use crate::story::AmbienceType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Narration transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
    /// Natural end of the story reached
    Ended,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Stopped => write!(f, "stopped"),
            PlaybackState::Ended => write!(f, "ended"),
        }
    }
}

/// Mixer panel channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MixerChannel {
    Voice,
    Ambience,
}

/// Player event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Transport state changed
    PlaybackStateChanged {
        old_state: PlaybackState,
        new_state: PlaybackState,
        timestamp: DateTime<Utc>,
    },

    /// Narration decoded and ready
    StoryLoaded {
        duration_secs: f64,
        timestamp: DateTime<Utc>,
    },

    /// Narration fetch or decode failed; playback stays unavailable
    MediaLoadFailed {
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Playback progress update (throttled while playing)
    PlaybackProgress {
        elapsed_secs: f64,
        duration_secs: f64,
        progress_percent: f64,
        timestamp: DateTime<Utc>,
    },

    /// Narration reached its natural end
    StoryEnded {
        timestamp: DateTime<Utc>,
    },

    /// Preview ceiling crossed on a non-entitled session
    PaywallRequired {
        elapsed_secs: f64,
        timestamp: DateTime<Utc>,
    },

    /// Soundscape selection changed
    AmbienceChanged {
        ambience: AmbienceType,
        timestamp: DateTime<Utc>,
    },

    /// Mixer level or mute changed
    VolumeChanged {
        channel: MixerChannel,
        volume: f32,
        muted: bool,
        timestamp: DateTime<Utc>,
    },

    /// Sleep timer ran out and playback was faded out
    SleepTimerExpired {
        timestamp: DateTime<Utc>,
    },

    /// Listener asked for a continuation of the story
    SequelRequested {
        story_id: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl PlayerEvent {
    /// Event name as it appears in the serialized `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            PlayerEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            PlayerEvent::StoryLoaded { .. } => "StoryLoaded",
            PlayerEvent::MediaLoadFailed { .. } => "MediaLoadFailed",
            PlayerEvent::PlaybackProgress { .. } => "PlaybackProgress",
            PlayerEvent::StoryEnded { .. } => "StoryEnded",
            PlayerEvent::PaywallRequired { .. } => "PaywallRequired",
            PlayerEvent::AmbienceChanged { .. } => "AmbienceChanged",
            PlayerEvent::VolumeChanged { .. } => "VolumeChanged",
            PlayerEvent::SleepTimerExpired { .. } => "SleepTimerExpired",
            PlayerEvent::SequelRequested { .. } => "SequelRequested",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_tag_matches_event_type() {
        let event = PlayerEvent::PaywallRequired {
            elapsed_secs: 30.02,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.event_type());
        assert_eq!(json["elapsed_secs"], 30.02);
    }

    #[test]
    fn test_state_changed_round_trip() {
        let event = PlayerEvent::PlaybackStateChanged {
            old_state: PlaybackState::Paused,
            new_state: PlaybackState::Playing,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"new_state\":\"playing\""));
        match serde_json::from_str::<PlayerEvent>(&json).unwrap() {
            PlayerEvent::PlaybackStateChanged { old_state, new_state, .. } => {
                assert_eq!(old_state, PlaybackState::Paused);
                assert_eq!(new_state, PlaybackState::Playing);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_playback_state_display() {
        assert_eq!(PlaybackState::Ended.to_string(), "ended");
    }
}
