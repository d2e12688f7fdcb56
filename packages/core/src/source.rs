//! Media sources and import validation
//!
//! Everything here runs before a source reaches the editor session: URLs
//! and files that fail these checks are reported to the user and never
//! touch the timeline.

use crate::error::{ShortsError, ShortsResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// File extensions accepted for upload
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp4", "mov", "webm", "avi", "mkv"];

/// Where the media being edited came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MediaSource {
    /// A local file picked by the user
    Upload { file_name: String },
    /// A YouTube video, identified by its video id
    YouTube { video_id: String },
}

impl MediaSource {
    pub fn upload(file_name: impl Into<String>) -> Self {
        MediaSource::Upload {
            file_name: file_name.into(),
        }
    }

    /// Build a YouTube source from a user-supplied URL
    pub fn from_youtube_url(url: &str) -> ShortsResult<Self> {
        parse_youtube_url(url)
            .map(|video_id| MediaSource::YouTube { video_id })
            .ok_or_else(|| ShortsError::invalid_input(format!("Not a valid YouTube URL: {}", url)))
    }

    pub fn source_type(&self) -> SourceType {
        match self {
            MediaSource::Upload { .. } => SourceType::Upload,
            MediaSource::YouTube { .. } => SourceType::YouTube,
        }
    }

    /// Human-readable label for the source
    pub fn label(&self) -> &str {
        match self {
            MediaSource::Upload { file_name } => file_name,
            MediaSource::YouTube { video_id } => video_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Upload,
    YouTube,
}

fn youtube_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([^&\s]+)",
            r"youtube\.com/shorts/([^&\s]+)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static YouTube pattern"))
        .collect()
    })
}

/// Extract the video id from a YouTube watch, short-link, embed or Shorts URL
pub fn parse_youtube_url(url: &str) -> Option<String> {
    youtube_patterns()
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Check the file extension against [`SUPPORTED_EXTENSIONS`] (case-insensitive)
pub fn is_supported_video_format(file_name: &str) -> bool {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Limits applied to imported media
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaConstraints {
    pub min_duration_secs: f64,
    pub max_duration_secs: f64,
    pub max_file_size_bytes: u64,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            min_duration_secs: 5.0,
            max_duration_secs: 60.0,
            max_file_size_bytes: 500 * 1024 * 1024,
        }
    }
}

impl MediaConstraints {
    /// Validate an uploaded file by name and size
    pub fn validate_upload(&self, file_name: &str, size_bytes: u64) -> ShortsResult<()> {
        if !is_supported_video_format(file_name) {
            return Err(ShortsError::invalid_input(format!(
                "Unsupported video format: {}",
                file_name
            )));
        }
        if size_bytes > self.max_file_size_bytes {
            return Err(ShortsError::invalid_input(format!(
                "File is too large: {} (limit {})",
                crate::format::format_file_size(size_bytes),
                crate::format::format_file_size(self.max_file_size_bytes)
            )));
        }
        Ok(())
    }

    /// Validate the length of a clip about to be exported
    pub fn validate_duration(&self, seconds: f64) -> ShortsResult<()> {
        if seconds < self.min_duration_secs {
            return Err(ShortsError::invalid_input(format!(
                "Clip is too short: {:.1}s (minimum {:.0}s)",
                seconds, self.min_duration_secs
            )));
        }
        if seconds > self.max_duration_secs {
            return Err(ShortsError::invalid_input(format!(
                "Clip is too long: {:.1}s (maximum {:.0}s)",
                seconds, self.max_duration_secs
            )));
        }
        Ok(())
    }
}
