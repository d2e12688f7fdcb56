pub mod config;
pub mod cut_points;
pub mod engine;
pub mod error;
pub mod export;
pub mod export_settings;
pub mod format;
pub mod library;
pub mod logging;
pub mod session;
pub mod source;
pub mod storage;
pub mod timeline;

pub use config::{EditorConfig, LoggingConfig};
pub use cut_points::{CutPoint, CutPointStore};
pub use engine::{FfmpegEngine, MediaEngine, ProcessingOptions, ProgressHandler};
pub use error::{ShortsError, ShortsResult};
pub use export::{ExportOutcome, ExportRequest, ExportResolver, ExportState, TrimRange};
pub use export_settings::{ExportSelections, FrameRate, Resolution};
pub use library::{PendingImport, RecentVideos, Video};
pub use session::{EditorSession, EditorTool};
pub use source::{MediaConstraints, MediaSource, SourceType};
pub use storage::{JsonFileStore, KeyValueStore, KeyValueStoreExt, MemoryStore};
pub use timeline::{RangeSelection, Timeline};
