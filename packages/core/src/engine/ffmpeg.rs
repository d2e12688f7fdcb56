//! Media engine backed by an ffmpeg binary via ffmpeg-sidecar
//!
//! Source bytes are written to a scratch file, ffmpeg runs on a blocking
//! thread, and its progress events are forwarded to the registered handler.

use super::args::{parse_timestamp, process_args, progress_percent, thumbnail_args};
use super::{MediaEngine, ProcessingOptions, ProgressHandler};
use crate::{ShortsError, ShortsResult};
use ffmpeg_sidecar::command::{ffmpeg_is_installed, FfmpegCommand};
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Abort flags of running jobs, one per job
#[derive(Debug, Default)]
struct JobRegistry {
    jobs: Mutex<HashMap<Uuid, Arc<AtomicBool>>>,
}

impl JobRegistry {
    fn register(&self, job: Uuid) -> Arc<AtomicBool> {
        let abort = Arc::new(AtomicBool::new(false));
        self.lock().insert(job, Arc::clone(&abort));
        abort
    }

    fn release(&self, job: &Uuid) {
        self.lock().remove(job);
    }

    /// Flag every running job. Returns how many were flagged.
    fn abort_all(&self) -> usize {
        let jobs = self.lock();
        for abort in jobs.values() {
            abort.store(true, Ordering::SeqCst);
        }
        jobs.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Arc<AtomicBool>>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct FfmpegEngine {
    work_dir: PathBuf,
    loaded: AtomicBool,
    progress: Mutex<Option<ProgressHandler>>,
    jobs: JobRegistry,
}

impl FfmpegEngine {
    /// Create an engine using the platform cache directory for scratch files
    pub fn new() -> Self {
        let work_dir = directories::ProjectDirs::from("app", "shorts", "Shorts")
            .map(|dirs| dirs.cache_dir().join("engine"))
            .unwrap_or_else(|| std::env::temp_dir().join("shorts-engine"));
        Self::with_work_dir(work_dir)
    }

    /// Create an engine writing scratch files under `work_dir`
    pub fn with_work_dir(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            loaded: AtomicBool::new(false),
            progress: Mutex::new(None),
            jobs: JobRegistry::default(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Ensure ffmpeg is available, download if needed
    fn ensure_ffmpeg() -> ShortsResult<()> {
        use ffmpeg_sidecar::download::auto_download;

        if ffmpeg_is_installed() {
            debug!("FFmpeg is already installed");
            return Ok(());
        }

        info!("FFmpeg not found, downloading...");
        auto_download()
            .map_err(|e| ShortsError::engine(format!("Failed to download FFmpeg: {}", e)))?;

        info!("FFmpeg downloaded successfully");
        Ok(())
    }

    fn progress_handler(&self) -> Option<ProgressHandler> {
        self.progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn scratch_path(&self, job: &Uuid, name: &str) -> PathBuf {
        self.work_dir.join(format!("{}-{}", job, name))
    }

    /// Run one ffmpeg job on a blocking thread
    async fn run_job(
        &self,
        job: Uuid,
        args: Vec<String>,
        expected_duration: Option<f64>,
        progress: Option<ProgressHandler>,
    ) -> ShortsResult<()> {
        let abort = self.jobs.register(job);

        let result = tokio::task::spawn_blocking(move || {
            run_ffmpeg(args, expected_duration, progress, abort)
        })
        .await
        .map_err(|e| ShortsError::processing(format!("FFmpeg task failed: {}", e)));

        self.jobs.release(&job);
        result?
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FfmpegEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegEngine")
            .field("work_dir", &self.work_dir)
            .field("loaded", &self.loaded.load(Ordering::SeqCst))
            .finish()
    }
}

fn run_ffmpeg(
    args: Vec<String>,
    expected_duration: Option<f64>,
    progress: Option<ProgressHandler>,
    abort: Arc<AtomicBool>,
) -> ShortsResult<()> {
    let mut cmd = FfmpegCommand::new();
    cmd.args(&args);

    let mut child = cmd
        .spawn()
        .map_err(|e| ShortsError::processing(format!("Failed to start FFmpeg: {}", e)))?;

    let events = child
        .iter()
        .map_err(|e| ShortsError::processing(format!("Failed to read FFmpeg output: {}", e)))?;

    let mut total = expected_duration;
    let mut last_error: Option<String> = None;

    for event in events {
        if abort.load(Ordering::SeqCst) {
            let _ = child.kill();
            return Err(ShortsError::processing("FFmpeg was terminated"));
        }

        match event {
            FfmpegEvent::ParsedDuration(parsed) if total.is_none() => {
                total = Some(parsed.duration);
            }
            FfmpegEvent::Progress(p) => {
                if let (Some(total), Some(handler), Some(elapsed)) =
                    (total, progress.as_ref(), parse_timestamp(&p.time))
                {
                    handler(progress_percent(elapsed, total));
                }
            }
            FfmpegEvent::Error(msg) | FfmpegEvent::Log(LogLevel::Error, msg) => {
                warn!("FFmpeg: {}", msg);
                last_error = Some(msg);
            }
            _ => {}
        }
    }

    let status = child
        .wait()
        .map_err(|e| ShortsError::processing(format!("FFmpeg process failed: {}", e)))?;

    if abort.load(Ordering::SeqCst) {
        return Err(ShortsError::processing("FFmpeg was terminated"));
    }

    if !status.success() {
        return Err(ShortsError::processing(last_error.unwrap_or_else(|| {
            format!("FFmpeg exited with status: {}", status)
        })));
    }

    if let Some(handler) = progress.as_ref() {
        handler(100);
    }
    Ok(())
}

#[async_trait::async_trait]
impl MediaEngine for FfmpegEngine {
    async fn load(&self) -> ShortsResult<()> {
        if self.loaded.load(Ordering::SeqCst) {
            return Ok(());
        }

        tokio::task::spawn_blocking(Self::ensure_ffmpeg)
            .await
            .map_err(|e| ShortsError::engine(format!("FFmpeg setup task failed: {}", e)))??;

        tokio::fs::create_dir_all(&self.work_dir).await?;

        self.loaded.store(true, Ordering::SeqCst);
        info!("FFmpeg engine loaded (work dir {:?})", self.work_dir);
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    async fn process(&self, source: &[u8], options: &ProcessingOptions) -> ShortsResult<Vec<u8>> {
        if let Some(clip) = options.clip_duration() {
            if clip <= 0.0 {
                return Err(ShortsError::processing(format!(
                    "Invalid trim range: {:?} to {:?}",
                    options.start_time, options.end_time
                )));
            }
        }

        self.load().await?;

        let job = Uuid::new_v4();
        let input = self.scratch_path(&job, "input.mp4");
        let output = self.scratch_path(&job, "output.mp4");

        tokio::fs::write(&input, source).await?;

        let args = process_args(&input, &output, options);
        debug!("Processing job {} with {:?}", job, args);

        let result = match self
            .run_job(job, args, options.clip_duration(), self.progress_handler())
            .await
        {
            Ok(()) => tokio::fs::read(&output).await.map_err(ShortsError::from),
            Err(e) => Err(e),
        };

        let _ = tokio::fs::remove_file(&input).await;
        let _ = tokio::fs::remove_file(&output).await;

        let data = result?;
        info!("Job {} produced {} bytes", job, data.len());
        Ok(data)
    }

    async fn extract_frame(&self, source: &[u8], time: Option<f64>) -> ShortsResult<Vec<u8>> {
        self.load().await?;

        let job = Uuid::new_v4();
        let input = self.scratch_path(&job, "input.mp4");
        let output = self.scratch_path(&job, "thumbnail.jpg");

        tokio::fs::write(&input, source).await?;

        let args = thumbnail_args(&input, &output, time.unwrap_or(0.0));
        let result = match self.run_job(job, args, None, None).await {
            Ok(()) => tokio::fs::read(&output).await.map_err(ShortsError::from),
            Err(e) => Err(e),
        };

        let _ = tokio::fs::remove_file(&input).await;
        let _ = tokio::fs::remove_file(&output).await;

        result.map_err(|e| ShortsError::processing(format!("Thumbnail extraction failed: {}", e)))
    }

    fn on_progress(&self, handler: ProgressHandler) {
        *self.progress.lock().unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    async fn terminate(&self) -> ShortsResult<()> {
        let aborted = self.jobs.abort_all();
        if self.loaded.swap(false, Ordering::SeqCst) {
            info!("FFmpeg engine terminated ({} running jobs aborted)", aborted);
        }
        Ok(())
    }
}
