//! Editing session for one piece of media
//!
//! Owns the timeline (and through it the cut-point store) for the loaded
//! source. Loading a different source starts from a clean timeline.

use crate::cut_points::CutPoint;
use crate::error::ShortsResult;
use crate::export::ExportRequest;
use crate::export_settings::ExportSelections;
use crate::source::MediaSource;
use crate::timeline::{RangeSelection, Timeline};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Tool selected in the editor sidebar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorTool {
    #[default]
    Cut,
    Text,
    Filter,
    Audio,
}

impl EditorTool {
    pub fn all() -> [EditorTool; 4] {
        [
            EditorTool::Cut,
            EditorTool::Text,
            EditorTool::Filter,
            EditorTool::Audio,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            EditorTool::Cut => "Cut",
            EditorTool::Text => "Text",
            EditorTool::Filter => "Filter",
            EditorTool::Audio => "Audio",
        }
    }
}

#[derive(Debug, Default)]
pub struct EditorSession {
    source: Option<MediaSource>,
    timeline: Timeline,
    selection: RangeSelection,
    tool: EditorTool,
}

impl EditorSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session on `source`
    pub fn open(source: MediaSource) -> Self {
        let mut session = Self::new();
        session.load_source(source);
        session
    }

    /// Replace the media, discarding the timeline and all cut points
    pub fn load_source(&mut self, source: MediaSource) {
        info!("Loading source {}", source.label());
        self.source = Some(source);
        self.timeline = Timeline::new();
        self.selection.reset();
    }

    pub fn source(&self) -> Option<&MediaSource> {
        self.source.as_ref()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn timeline_mut(&mut self) -> &mut Timeline {
        &mut self.timeline
    }

    /// Record the media duration once metadata is available
    pub fn set_duration(&mut self, duration: f64) -> ShortsResult<()> {
        self.timeline.set_duration(duration)
    }

    pub fn seek(&mut self, time: f64) -> f64 {
        self.timeline.seek(time)
    }

    pub fn is_playing(&self) -> bool {
        self.timeline.is_playing()
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.timeline.set_playing(playing);
    }

    pub fn toggle_playing(&mut self) -> bool {
        let playing = !self.timeline.is_playing();
        self.timeline.set_playing(playing);
        playing
    }

    pub fn selected_tool(&self) -> EditorTool {
        self.tool
    }

    pub fn select_tool(&mut self, tool: EditorTool) {
        self.tool = tool;
    }

    pub fn selection(&self) -> &RangeSelection {
        &self.selection
    }

    pub fn mark_range_start(&mut self) {
        self.selection.mark_start(&self.timeline);
    }

    pub fn mark_range_end(&mut self) -> bool {
        self.selection.mark_end(&self.timeline)
    }

    /// Add the marked range as a cut point
    pub fn commit_range(&mut self) -> Option<CutPoint> {
        self.selection.commit(&mut self.timeline)
    }

    pub fn quick_cut(&mut self, seconds: f64) -> Option<CutPoint> {
        self.timeline.quick_cut(seconds)
    }

    /// Resolve an export of the current cut points
    pub fn export_request(&self, selections: ExportSelections) -> ExportRequest {
        ExportRequest::resolve(selections, self.timeline.cut_points().as_slice())
    }
}
