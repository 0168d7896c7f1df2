//! Story records and ambience types
//!
//! A story record is produced upstream (script, voice and cover generation)
//! and handed to the player. Only the fields the player reads are modelled.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Background soundscape selection
///
/// `Silent` is the "no ambience" sentinel. Story records written by older
/// clients use `quiet`/`off` for silence and `wind` for the forest preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmbienceType {
    /// No ambience
    #[default]
    #[serde(alias = "quiet", alias = "off")]
    Silent,

    /// Filtered pink noise
    Rain,

    /// Low rumble with crackle
    Fire,

    /// Slow swelling surf
    Waves,

    /// Wind through trees
    #[serde(alias = "wind")]
    Forest,
}

impl AmbienceType {
    /// Every audible soundscape, in mixer-panel order
    pub const AUDIBLE: [AmbienceType; 4] = [
        AmbienceType::Rain,
        AmbienceType::Fire,
        AmbienceType::Waves,
        AmbienceType::Forest,
    ];

    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            AmbienceType::Silent => "silent",
            AmbienceType::Rain => "rain",
            AmbienceType::Fire => "fire",
            AmbienceType::Waves => "waves",
            AmbienceType::Forest => "forest",
        }
    }

    /// Human-readable label for the mixer panel
    pub fn display_name(&self) -> &'static str {
        match self {
            AmbienceType::Silent => "Voice Only",
            AmbienceType::Rain => "Rain",
            AmbienceType::Fire => "Fire",
            AmbienceType::Waves => "Waves",
            AmbienceType::Forest => "Forest",
        }
    }

    pub fn is_silent(&self) -> bool {
        matches!(self, AmbienceType::Silent)
    }
}

impl FromStr for AmbienceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "silent" | "quiet" | "off" => Ok(AmbienceType::Silent),
            "rain" => Ok(AmbienceType::Rain),
            "fire" => Ok(AmbienceType::Fire),
            "waves" => Ok(AmbienceType::Waves),
            "forest" | "wind" => Ok(AmbienceType::Forest),
            other => Err(Error::InvalidInput(format!("unknown ambience type: {}", other))),
        }
    }
}

impl fmt::Display for AmbienceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Story record as handed over by the library screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: Uuid,

    pub title: String,

    /// Full narration text, shown in read mode
    #[serde(default)]
    pub script: String,

    /// Used by the end-of-story overlay
    #[serde(default)]
    pub child_name: Option<String>,

    /// Soundscape chosen when the story was created
    #[serde(default)]
    pub ambience: AmbienceType,

    /// Remote narration audio, when no decoded buffer is at hand
    #[serde(default)]
    pub audio_url: Option<String>,

    #[serde(default)]
    pub cover_image_url: Option<String>,
}

impl Story {
    /// Minimal record for a story with only a title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            script: String::new(),
            child_name: None,
            ambience: AmbienceType::Silent,
            audio_url: None,
            cover_image_url: None,
        }
    }

    pub fn with_ambience(mut self, ambience: AmbienceType) -> Self {
        self.ambience = ambience;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("quiet".parse::<AmbienceType>().unwrap(), AmbienceType::Silent);
        assert_eq!("off".parse::<AmbienceType>().unwrap(), AmbienceType::Silent);
        assert_eq!("".parse::<AmbienceType>().unwrap(), AmbienceType::Silent);
        assert_eq!("wind".parse::<AmbienceType>().unwrap(), AmbienceType::Forest);
        assert_eq!("RAIN".parse::<AmbienceType>().unwrap(), AmbienceType::Rain);
    }

    #[test]
    fn test_parse_invalid() {
        assert!("thunder".parse::<AmbienceType>().is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for ambience in AmbienceType::AUDIBLE {
            let parsed: AmbienceType = ambience.to_string().parse().unwrap();
            assert_eq!(parsed, ambience);
        }
    }

    #[test]
    fn test_story_deserialize_legacy_ambience() {
        let json = r#"{
            "id": "7f0a2c8e-4a55-4a39-9c43-0e0f7b0f8f11",
            "title": "Le dragon endormi",
            "ambience": "wind",
            "audioUrl": "https://cdn.example.com/a.mp3"
        }"#;
        let story: Story = serde_json::from_str(json).unwrap();
        assert_eq!(story.ambience, AmbienceType::Forest);
        assert_eq!(story.audio_url.as_deref(), Some("https://cdn.example.com/a.mp3"));
        assert!(story.script.is_empty());
    }

    #[test]
    fn test_story_missing_ambience_is_silent() {
        let json = r#"{"id": "7f0a2c8e-4a55-4a39-9c43-0e0f7b0f8f11", "title": "x"}"#;
        let story: Story = serde_json::from_str(json).unwrap();
        assert!(story.ambience.is_silent());
    }
}
