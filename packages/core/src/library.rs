//! Recently edited videos and the pending import hand-off

use crate::error::ShortsResult;
use crate::source::{MediaSource, SourceType};
use crate::storage::{KeyValueStore, KeyValueStoreExt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Storage key for the recent videos list
pub const RECENT_VIDEOS_KEY: &str = "recent_videos";

/// Storage key for a file chosen on the landing screen, not yet opened
pub const PENDING_IMPORT_KEY: &str = "pending_import";

/// Number of entries shown in the recent list
pub const RECENT_DISPLAY_LIMIT: usize = 3;

/// Number of entries kept in storage
pub const RECENT_STORE_LIMIT: usize = 20;

/// A video the user has worked on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub title: String,
    /// Seconds
    pub duration: f64,
    pub thumbnail_url: String,
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    /// Create a record for `source`, titled after it
    pub fn from_source(source: &MediaSource, duration: f64, thumbnail_url: impl Into<String>) -> Self {
        let now = Utc::now();
        let source_url = match source {
            MediaSource::YouTube { video_id } => {
                Some(format!("https://www.youtube.com/watch?v={}", video_id))
            }
            MediaSource::Upload { .. } => None,
        };

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: source.label().to_string(),
            duration,
            thumbnail_url: thumbnail_url.into(),
            source_type: source.source_type(),
            source_url,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Most-recent-first list of videos, persisted under [`RECENT_VIDEOS_KEY`]
pub struct RecentVideos {
    store: Arc<dyn KeyValueStore>,
}

impl RecentVideos {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// All stored videos. Unreadable data is logged and treated as empty.
    pub fn all(&self) -> Vec<Video> {
        match self.store.get::<Vec<Video>>(RECENT_VIDEOS_KEY) {
            Ok(videos) => videos.unwrap_or_default(),
            Err(e) => {
                warn!("Failed to load recent videos: {}", e);
                Vec::new()
            }
        }
    }

    /// The videos shown on the landing screen
    pub fn recent(&self) -> Vec<Video> {
        let mut videos = self.all();
        videos.truncate(RECENT_DISPLAY_LIMIT);
        videos
    }

    /// Move `video` to the front, replacing any entry with the same id
    pub fn record(&self, mut video: Video) -> ShortsResult<()> {
        let mut videos = self.all();
        if let Some(pos) = videos.iter().position(|v| v.id == video.id) {
            let existing = videos.remove(pos);
            video.created_at = existing.created_at;
        }
        video.touch();
        debug!("Recording recent video {} ({})", video.id, video.title);

        videos.insert(0, video);
        videos.truncate(RECENT_STORE_LIMIT);
        self.store.set(RECENT_VIDEOS_KEY, &videos)
    }

    pub fn remove(&self, id: &str) -> ShortsResult<bool> {
        let mut videos = self.all();
        let before = videos.len();
        videos.retain(|v| v.id != id);
        if videos.len() == before {
            return Ok(false);
        }
        self.store.set(RECENT_VIDEOS_KEY, &videos)?;
        Ok(true)
    }

    pub fn clear(&self) -> ShortsResult<()> {
        self.store.remove(RECENT_VIDEOS_KEY)
    }
}

/// A local file selected for editing but not yet opened, with its bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImport {
    pub file_name: String,
    pub data: Vec<u8>,
}

impl PendingImport {
    pub fn new(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            data,
        }
    }

    pub fn source(&self) -> MediaSource {
        MediaSource::upload(self.file_name.clone())
    }

    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

/// JSON half of a pending import; the bytes are stored as a blob
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PendingImportMeta {
    file_name: String,
    size_bytes: u64,
}

/// Remember `import` for the editor to pick up, replacing any earlier one
pub fn stash_pending_import(store: &dyn KeyValueStore, import: &PendingImport) -> ShortsResult<()> {
    store.set_blob(PENDING_IMPORT_KEY, &import.data)?;
    store.set(
        PENDING_IMPORT_KEY,
        &PendingImportMeta {
            file_name: import.file_name.clone(),
            size_bytes: import.size_bytes(),
        },
    )?;
    debug!(
        "Stashed pending import {} ({} bytes)",
        import.file_name,
        import.size_bytes()
    );
    Ok(())
}

/// Read and remove the pending import. It can be taken at most once.
///
/// A record whose bytes are missing or truncated is discarded.
pub fn take_pending_import(store: &dyn KeyValueStore) -> ShortsResult<Option<PendingImport>> {
    let meta = match store.get::<PendingImportMeta>(PENDING_IMPORT_KEY) {
        Ok(meta) => meta,
        Err(e) => {
            warn!("Discarding unreadable pending import: {}", e);
            None
        }
    };
    let data = store.get_blob(PENDING_IMPORT_KEY)?;

    store.remove(PENDING_IMPORT_KEY)?;
    store.remove_blob(PENDING_IMPORT_KEY)?;

    match (meta, data) {
        (Some(meta), Some(data)) if data.len() as u64 == meta.size_bytes => {
            Ok(Some(PendingImport::new(meta.file_name, data)))
        }
        (Some(meta), _) => {
            warn!("Discarding pending import {} with missing bytes", meta.file_name);
            Ok(None)
        }
        (None, _) => Ok(None),
    }
}
