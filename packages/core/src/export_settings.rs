//! Output settings selectable for an export
//!
//! Shorts are rendered portrait, so each resolution maps to a 9:16 pixel
//! target rather than the landscape dimensions its name suggests.

use crate::error::ShortsError;
use serde::{Deserialize, Serialize};

/// Output resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "720p")]
    Hd720,
    #[default]
    #[serde(rename = "1080p")]
    Hd1080,
}

impl Resolution {
    /// Target (width, height) in pixels
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Resolution::Hd720 => (720, 1280),
            Resolution::Hd1080 => (1080, 1920),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Resolution::Hd720 => "HD (720p)",
            Resolution::Hd1080 => "Full HD (1080p)",
        }
    }

    pub fn all() -> [Resolution; 2] {
        [Resolution::Hd720, Resolution::Hd1080]
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Hd720 => write!(f, "720p"),
            Resolution::Hd1080 => write!(f, "1080p"),
        }
    }
}

impl std::str::FromStr for Resolution {
    type Err = ShortsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "720p" => Ok(Resolution::Hd720),
            "1080p" => Ok(Resolution::Hd1080),
            other => Err(ShortsError::invalid_input(format!(
                "Unsupported resolution: {}",
                other
            ))),
        }
    }
}

/// Output frame rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum FrameRate {
    #[default]
    Fps30,
    Fps60,
}

impl FrameRate {
    pub fn as_u32(&self) -> u32 {
        match self {
            FrameRate::Fps30 => 30,
            FrameRate::Fps60 => 60,
        }
    }

    pub fn all() -> [FrameRate; 2] {
        [FrameRate::Fps30, FrameRate::Fps60]
    }
}

impl From<FrameRate> for u32 {
    fn from(fps: FrameRate) -> Self {
        fps.as_u32()
    }
}

impl TryFrom<u32> for FrameRate {
    type Error = ShortsError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            30 => Ok(FrameRate::Fps30),
            60 => Ok(FrameRate::Fps60),
            other => Err(ShortsError::invalid_input(format!(
                "Unsupported frame rate: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for FrameRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} FPS", self.as_u32())
    }
}

/// User choices on the export surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExportSelections {
    pub resolution: Resolution,
    pub fps: FrameRate,
}

impl ExportSelections {
    pub fn new(resolution: Resolution, fps: FrameRate) -> Self {
        Self { resolution, fps }
    }
}
