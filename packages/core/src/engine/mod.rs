//! Media processing engine seam
//!
//! The editor never decodes or encodes media itself. Everything goes through
//! [`MediaEngine`], which the ffmpeg-backed [`FfmpegEngine`] implements and
//! which tests replace with scripted doubles.

use crate::error::ShortsResult;
use crate::export_settings::{FrameRate, Resolution};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod args;

#[cfg(feature = "encoding")]
mod ffmpeg;

#[cfg(feature = "encoding")]
pub use ffmpeg::FfmpegEngine;

/// Progress callback, invoked with a percentage in `0..=100`
pub type ProgressHandler = Arc<dyn Fn(u8) + Send + Sync + 'static>;

/// Options for a single processing call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessingOptions {
    /// Seek offset into the source; `None` starts at the beginning
    pub start_time: Option<f64>,
    /// End of the clip in source time; `None` runs to the end
    pub end_time: Option<f64>,
    pub resolution: Resolution,
    pub fps: FrameRate,
}

impl ProcessingOptions {
    /// Options for a full-length render
    pub fn full(resolution: Resolution, fps: FrameRate) -> Self {
        Self {
            start_time: None,
            end_time: None,
            resolution,
            fps,
        }
    }

    /// Length of the output in seconds when an end bound is set
    pub fn clip_duration(&self) -> Option<f64> {
        self.end_time
            .map(|end| end - self.start_time.unwrap_or(0.0))
    }

    pub fn is_trimmed(&self) -> bool {
        self.start_time.is_some() || self.end_time.is_some()
    }
}

/// Capability interface to an external media processing engine
#[async_trait::async_trait]
pub trait MediaEngine: Send + Sync {
    /// Prepare the engine. Calling again once loaded is a no-op.
    async fn load(&self) -> ShortsResult<()>;

    fn is_loaded(&self) -> bool;

    /// Render `source` with `options`, returning the encoded output
    async fn process(&self, source: &[u8], options: &ProcessingOptions) -> ShortsResult<Vec<u8>>;

    /// Capture a single frame at `time` seconds (defaults to the start)
    async fn extract_frame(&self, source: &[u8], time: Option<f64>) -> ShortsResult<Vec<u8>>;

    /// Register the progress callback used during `process`
    fn on_progress(&self, handler: ProgressHandler);

    /// Release engine resources. Safe to call when idle or already terminated.
    async fn terminate(&self) -> ShortsResult<()>;
}

/// Engine used when the crate is built without the `encoding` feature
#[cfg(not(feature = "encoding"))]
pub use stub_engine::FfmpegEngine;

#[cfg(not(feature = "encoding"))]
mod stub_engine {
    use super::{MediaEngine, ProcessingOptions, ProgressHandler};
    use crate::{ShortsError, ShortsResult};
    use std::path::PathBuf;

    /// Engine stub (encoding feature not enabled)
    #[derive(Debug, Default)]
    pub struct FfmpegEngine;

    impl FfmpegEngine {
        pub fn new() -> Self {
            Self
        }

        pub fn with_work_dir(_work_dir: impl Into<PathBuf>) -> Self {
            Self
        }
    }

    #[async_trait::async_trait]
    impl MediaEngine for FfmpegEngine {
        async fn load(&self) -> ShortsResult<()> {
            Err(ShortsError::engine(
                "Encoding feature not enabled. Rebuild with --features encoding",
            ))
        }

        fn is_loaded(&self) -> bool {
            false
        }

        async fn process(
            &self,
            _source: &[u8],
            _options: &ProcessingOptions,
        ) -> ShortsResult<Vec<u8>> {
            Err(ShortsError::engine("Encoding feature not enabled"))
        }

        async fn extract_frame(&self, _source: &[u8], _time: Option<f64>) -> ShortsResult<Vec<u8>> {
            Err(ShortsError::engine("Encoding feature not enabled"))
        }

        fn on_progress(&self, _handler: ProgressHandler) {}

        async fn terminate(&self) -> ShortsResult<()> {
            Ok(())
        }
    }
}
