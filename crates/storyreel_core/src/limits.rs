use serde::{Deserialize, Serialize};

/// Bounds enforced on clip durations, uploads, and export requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EditorLimits {
    pub max_clip_duration: f64,
    pub max_total_duration: f64,
    pub max_upload_bytes: u64,
    pub min_width: u32,
    pub max_width: u32,
    pub min_height: u32,
    pub max_height: u32,
}

impl EditorLimits {
    /// Five minute clips and exports, 16 MiB uploads, 240p to 4K output.
    pub fn strict() -> Self {
        Self {
            max_clip_duration: 300.0,
            max_total_duration: 300.0,
            max_upload_bytes: 16 * 1024 * 1024,
            min_width: 240,
            max_width: 3840,
            min_height: 240,
            max_height: 2160,
        }
    }

    /// No caps on durations; upload and resolution bounds are kept since
    /// the server enforces them anyway.
    pub fn lenient() -> Self {
        Self {
            max_clip_duration: f64::INFINITY,
            max_total_duration: f64::INFINITY,
            ..Self::strict()
        }
    }

    pub fn accepts_clip_duration(&self, duration: f64) -> bool {
        duration.is_finite() && duration > 0.0 && duration <= self.max_clip_duration
    }

    pub fn accepts_resolution(&self, width: u32, height: u32) -> bool {
        (self.min_width..=self.max_width).contains(&width)
            && (self.min_height..=self.max_height).contains(&height)
    }
}

impl Default for EditorLimits {
    fn default() -> Self {
        Self::strict()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_values() {
        let l = EditorLimits::strict();
        assert_eq!(l.max_clip_duration, 300.0);
        assert_eq!(l.max_total_duration, 300.0);
        assert_eq!(l.max_upload_bytes, 16 * 1024 * 1024);
        assert_eq!(EditorLimits::default(), l);
    }

    #[test]
    fn clip_duration_bounds() {
        let l = EditorLimits::strict();
        assert!(l.accepts_clip_duration(0.1));
        assert!(l.accepts_clip_duration(300.0));
        assert!(!l.accepts_clip_duration(0.0));
        assert!(!l.accepts_clip_duration(-1.0));
        assert!(!l.accepts_clip_duration(300.5));
        assert!(!l.accepts_clip_duration(f64::NAN));
        assert!(EditorLimits::lenient().accepts_clip_duration(1000.0));
    }

    #[test]
    fn resolution_bounds_are_inclusive() {
        let l = EditorLimits::strict();
        assert!(l.accepts_resolution(1920, 1080));
        assert!(l.accepts_resolution(240, 240));
        assert!(l.accepts_resolution(3840, 2160));
        assert!(!l.accepts_resolution(100, 100));
        assert!(!l.accepts_resolution(3841, 1080));
        assert!(!l.accepts_resolution(1920, 2161));
    }
}
