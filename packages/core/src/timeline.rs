//! Timeline context for the loaded media
//!
//! Holds the media duration, the playhead and the cut-point store. The
//! duration is set once, when media metadata becomes available; loading a
//! new source replaces the whole timeline.

use crate::cut_points::{CutPoint, CutPointStore};
use crate::error::{ShortsError, ShortsResult};
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct Timeline {
    duration: Option<f64>,
    current_time: f64,
    is_playing: bool,
    cut_points: CutPointStore,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the media duration. Fails if it was already set.
    pub fn set_duration(&mut self, duration: f64) -> ShortsResult<()> {
        if let Some(existing) = self.duration {
            return Err(ShortsError::timeline(format!(
                "Duration already set to {:.3}s",
                existing
            )));
        }
        if !duration.is_finite() || duration < 0.0 {
            return Err(ShortsError::timeline(format!(
                "Invalid media duration: {}",
                duration
            )));
        }

        debug!("Timeline duration set to {:.3}s", duration);
        self.duration = Some(duration);
        self.current_time = self.current_time.min(duration);
        Ok(())
    }

    /// Media duration in seconds, 0 until metadata is known
    pub fn duration(&self) -> f64 {
        self.duration.unwrap_or(0.0)
    }

    pub fn has_duration(&self) -> bool {
        self.duration.is_some()
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Move the playhead, clamped to `[0, duration]`. Returns the new position.
    pub fn seek(&mut self, time: f64) -> f64 {
        let clamped = if time.is_nan() {
            warn!("Ignoring NaN seek target");
            self.current_time
        } else {
            time.clamp(0.0, self.duration())
        };
        self.current_time = clamped;
        clamped
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.is_playing = playing;
    }

    pub fn cut_points(&self) -> &CutPointStore {
        &self.cut_points
    }

    pub fn cut_points_mut(&mut self) -> &mut CutPointStore {
        &mut self.cut_points
    }

    /// Position of `time` as a percentage of the duration (0 when unknown)
    pub fn position_percent(&self, time: f64) -> f64 {
        let duration = self.duration();
        if duration > 0.0 {
            time / duration * 100.0
        } else {
            0.0
        }
    }

    /// Add a cut of `seconds` centered on the playhead, clamped to the media.
    ///
    /// Returns `None` when the clamped range is empty.
    pub fn quick_cut(&mut self, seconds: f64) -> Option<CutPoint> {
        let start = (self.current_time - seconds / 2.0).max(0.0);
        let end = (self.current_time + seconds / 2.0).min(self.duration());
        if start < end {
            Some(self.cut_points.add_cut_point(start, end))
        } else {
            None
        }
    }
}

/// Two-step range selection driven by the playhead
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RangeSelection {
    start: f64,
    end: f64,
    active: bool,
}

impl RangeSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the range start at the playhead and begin selecting
    pub fn mark_start(&mut self, timeline: &Timeline) {
        self.start = timeline.current_time();
        self.active = true;
    }

    /// Set the range end at the playhead if it lies after the start
    pub fn mark_end(&mut self, timeline: &Timeline) -> bool {
        if !self.active {
            return false;
        }
        let now = timeline.current_time();
        if now > self.start {
            self.end = now;
            true
        } else {
            false
        }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn can_commit(&self, timeline: &Timeline) -> bool {
        self.start < self.end && self.end <= timeline.duration()
    }

    /// Add the selected range as a cut point and reset the selection
    pub fn commit(&mut self, timeline: &mut Timeline) -> Option<CutPoint> {
        if !self.can_commit(timeline) {
            return None;
        }
        let cut_point = timeline.cut_points_mut().add_cut_point(self.start, self.end);
        *self = Self::default();
        Some(cut_point)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline(duration: f64) -> Timeline {
        let mut timeline = Timeline::new();
        timeline.set_duration(duration).unwrap();
        timeline
    }

    #[test]
    fn test_duration_set_once() {
        let mut timeline = Timeline::new();
        assert_eq!(timeline.duration(), 0.0);
        assert!(!timeline.has_duration());

        timeline.set_duration(42.0).unwrap();
        assert_eq!(timeline.duration(), 42.0);

        let err = timeline.set_duration(10.0).unwrap_err();
        assert!(err.to_string().contains("already set"));
        assert_eq!(timeline.duration(), 42.0);
    }

    #[test]
    fn test_invalid_duration_rejected() {
        let mut timeline = Timeline::new();
        assert!(timeline.set_duration(-1.0).is_err());
        assert!(timeline.set_duration(f64::NAN).is_err());
        assert!(!timeline.has_duration());
    }

    #[test]
    fn test_seek_clamps() {
        let mut timeline = timeline(30.0);
        assert_eq!(timeline.seek(12.5), 12.5);
        assert_eq!(timeline.seek(-3.0), 0.0);
        assert_eq!(timeline.seek(99.0), 30.0);
        assert_eq!(timeline.seek(f64::NAN), 30.0);
    }

    #[test]
    fn test_position_percent() {
        let timeline = timeline(40.0);
        assert_eq!(timeline.position_percent(10.0), 25.0);
        assert_eq!(Timeline::new().position_percent(10.0), 0.0);
    }

    #[test]
    fn test_quick_cut_centered_and_clamped() {
        let mut timeline = timeline(10.0);
        timeline.seek(5.0);
        let cp = timeline.quick_cut(3.0).unwrap();
        assert_eq!((cp.start_time, cp.end_time), (3.5, 6.5));

        timeline.seek(0.5);
        let cp = timeline.quick_cut(5.0).unwrap();
        assert_eq!((cp.start_time, cp.end_time), (0.0, 3.0));

        timeline.seek(9.8);
        let cp = timeline.quick_cut(1.0).unwrap();
        assert_eq!(cp.end_time, 10.0);

        assert_eq!(timeline.cut_points().len(), 3);
    }

    #[test]
    fn test_quick_cut_without_duration_adds_nothing() {
        let mut timeline = Timeline::new();
        assert!(timeline.quick_cut(3.0).is_none());
        assert!(timeline.cut_points().is_empty());
    }

    #[test]
    fn test_range_selection_flow() {
        let mut timeline = timeline(60.0);
        let mut selection = RangeSelection::new();

        // End cannot be marked before start
        timeline.seek(20.0);
        assert!(!selection.mark_end(&timeline));

        selection.mark_start(&timeline);
        assert!(selection.is_active());

        timeline.seek(15.0);
        assert!(!selection.mark_end(&timeline));
        assert!(selection.commit(&mut timeline).is_none());

        timeline.seek(25.0);
        assert!(selection.mark_end(&timeline));

        let cp = selection.commit(&mut timeline).unwrap();
        assert_eq!((cp.start_time, cp.end_time), (20.0, 25.0));
        assert!(!selection.is_active());
        assert_eq!(timeline.cut_points().len(), 1);
    }
}
