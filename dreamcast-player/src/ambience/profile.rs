//! Per-soundscape synthesis recipes

use crate::synth::filter::BUTTERWORTH_Q;
use crate::synth::{FilterKind, NoiseColor};
use dreamcast_common::AmbienceType;

/// Slow sine sweep of the filter cutoff
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutoffSweep {
    pub rate_hz: f64,
    pub depth_hz: f32,
}

/// How one soundscape is built: base noise, one filter, optional sweep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundscapeProfile {
    pub noise: NoiseColor,
    pub filter: FilterKind,
    pub cutoff_hz: f32,
    pub q: f32,
    pub sweep: Option<CutoffSweep>,
    /// Per-type level trim applied on top of the requested volume
    pub gain_trim: f32,
    /// Sprinkle crackle impulses into the loop
    pub crackle: bool,
}

const SWELL: CutoffSweep = CutoffSweep {
    rate_hz: 0.1,
    depth_hz: 200.0,
};

impl SoundscapeProfile {
    /// Recipe for `ambience`; `None` for silence
    pub fn for_type(ambience: AmbienceType) -> Option<Self> {
        let profile = match ambience {
            AmbienceType::Silent => return None,
            AmbienceType::Rain => Self {
                noise: NoiseColor::Pink,
                filter: FilterKind::Lowpass,
                cutoff_hz: 800.0,
                q: BUTTERWORTH_Q,
                sweep: None,
                gain_trim: 1.0,
                crackle: false,
            },
            AmbienceType::Fire => Self {
                noise: NoiseColor::Brown,
                filter: FilterKind::Lowpass,
                cutoff_hz: 150.0,
                q: BUTTERWORTH_Q,
                sweep: None,
                gain_trim: 1.2,
                crackle: true,
            },
            AmbienceType::Waves => Self {
                noise: NoiseColor::White,
                filter: FilterKind::Lowpass,
                cutoff_hz: 500.0,
                q: BUTTERWORTH_Q,
                sweep: Some(SWELL),
                gain_trim: 1.0,
                crackle: false,
            },
            AmbienceType::Forest => Self {
                noise: NoiseColor::White,
                filter: FilterKind::Bandpass,
                cutoff_hz: 500.0,
                q: 1.0,
                sweep: Some(SWELL),
                // Wind sits behind everything else
                gain_trim: 0.6,
                crackle: false,
            },
        };
        Some(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_has_no_profile() {
        assert!(SoundscapeProfile::for_type(AmbienceType::Silent).is_none());
    }

    #[test]
    fn test_every_audible_type_has_profile() {
        for ambience in AmbienceType::AUDIBLE {
            let profile = SoundscapeProfile::for_type(ambience).unwrap();
            assert!(profile.cutoff_hz > 0.0);
            assert!(profile.gain_trim > 0.0);
        }
    }

    #[test]
    fn test_table_values() {
        let rain = SoundscapeProfile::for_type(AmbienceType::Rain).unwrap();
        assert_eq!(rain.noise, NoiseColor::Pink);
        assert_eq!(rain.cutoff_hz, 800.0);
        assert!(rain.sweep.is_none());

        let fire = SoundscapeProfile::for_type(AmbienceType::Fire).unwrap();
        assert_eq!(fire.noise, NoiseColor::Brown);
        assert_eq!(fire.cutoff_hz, 150.0);

        let forest = SoundscapeProfile::for_type(AmbienceType::Forest).unwrap();
        assert_eq!(forest.filter, FilterKind::Bandpass);
        assert_eq!(forest.q, 1.0);
        assert_eq!(forest.sweep.map(|s| s.rate_hz), Some(0.1));
    }
}
