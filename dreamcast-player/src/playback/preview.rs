//! Preview ceiling for non-entitled sessions

/// Entitlement flag plus the preview ceiling it lifts
///
/// Supplied by the subscription side per session; the controller only
/// evaluates it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewPolicy {
    entitled: bool,
    ceiling_secs: f64,
}

impl PreviewPolicy {
    pub const DEFAULT_CEILING_SECS: f64 = 30.0;

    pub fn new(entitled: bool, ceiling_secs: f64) -> Self {
        Self {
            entitled,
            ceiling_secs: ceiling_secs.max(0.0),
        }
    }

    /// Full access
    pub fn entitled() -> Self {
        Self::new(true, Self::DEFAULT_CEILING_SECS)
    }

    /// Free tier, capped at `ceiling_secs`
    pub fn preview(ceiling_secs: f64) -> Self {
        Self::new(false, ceiling_secs)
    }

    pub fn is_entitled(&self) -> bool {
        self.entitled
    }

    pub fn ceiling_secs(&self) -> f64 {
        self.ceiling_secs
    }

    /// Whether playback at `elapsed` seconds has hit the ceiling
    pub fn ceiling_reached(&self, elapsed: f64) -> bool {
        !self.entitled && elapsed >= self.ceiling_secs
    }

    /// Where the ceiling sits on the progress bar, for stories long enough
    /// to have one
    pub fn marker_percent(&self, duration: f64) -> Option<f64> {
        (!self.entitled && duration > self.ceiling_secs)
            .then(|| self.ceiling_secs / duration * 100.0)
    }
}

impl Default for PreviewPolicy {
    fn default() -> Self {
        Self::preview(Self::DEFAULT_CEILING_SECS)
    }
}
