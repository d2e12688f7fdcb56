//! Export option resolution and submission tracking
//!
//! [`ExportRequest::resolve`] turns the current cut points and output
//! selections into a single request. [`ExportResolver`] hands that request to
//! the media engine and tracks the submission through
//! `Idle -> Submitting -> Succeeded | Failed`.
//!
//! Only the earliest cut point is honored as the trim range; any further
//! cut points are ignored and reported through
//! [`ExportRequest::ignored_cut_points`].

use crate::cut_points::CutPoint;
use crate::engine::{MediaEngine, ProcessingOptions, ProgressHandler};
use crate::error::{ShortsError, ShortsResult};
use crate::export_settings::{ExportSelections, FrameRate, Resolution};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Portion of the source to export, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimRange {
    pub start_time: f64,
    pub end_time: f64,
}

impl TrimRange {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

impl From<&CutPoint> for TrimRange {
    fn from(cp: &CutPoint) -> Self {
        Self {
            start_time: cp.start_time,
            end_time: cp.end_time,
        }
    }
}

/// A resolved, one-shot description of an export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    /// `None` exports the whole media
    pub source_range: Option<TrimRange>,
    pub resolution: Resolution,
    pub fps: FrameRate,
    ignored_cut_points: usize,
}

impl ExportRequest {
    /// Build a request from output selections and the current cut points
    pub fn resolve(selections: ExportSelections, cut_points: &[CutPoint]) -> Self {
        // First minimum wins, so equal start times keep store order
        let first = cut_points
            .iter()
            .min_by(|a, b| a.start_time.total_cmp(&b.start_time));

        Self {
            source_range: first.map(TrimRange::from),
            resolution: selections.resolution,
            fps: selections.fps,
            ignored_cut_points: cut_points.len().saturating_sub(1),
        }
    }

    pub fn is_full_length(&self) -> bool {
        self.source_range.is_none()
    }

    /// Number of cut points present but not applied to this export
    pub fn ignored_cut_points(&self) -> usize {
        self.ignored_cut_points
    }

    /// Engine options for this request
    pub fn to_options(&self) -> ProcessingOptions {
        ProcessingOptions {
            start_time: self.source_range.map(|r| r.start_time),
            end_time: self.source_range.map(|r| r.end_time),
            resolution: self.resolution,
            fps: self.fps,
        }
    }
}

/// Lifecycle of the current (or last) submission
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ExportState {
    #[default]
    Idle,
    /// In flight; progress is a non-decreasing percentage
    Submitting { progress: u8 },
    Succeeded { output: Arc<[u8]> },
    Failed { message: String },
}

impl ExportState {
    pub fn is_submitting(&self) -> bool {
        matches!(self, ExportState::Submitting { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExportState::Succeeded { .. } | ExportState::Failed { .. }
        )
    }

    pub fn progress(&self) -> Option<u8> {
        match self {
            ExportState::Submitting { progress } => Some(*progress),
            ExportState::Succeeded { .. } => Some(100),
            _ => None,
        }
    }
}

/// Final result of one submission
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    Succeeded(Arc<[u8]>),
    Failed(String),
}

impl ExportOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExportOutcome::Succeeded(_))
    }
}

/// State shared between the resolver, its progress handlers and running jobs
struct Shared {
    state: watch::Sender<ExportState>,
    /// Generation of the in-flight submission, 0 when none.
    /// Only written while holding the `state` lock.
    active: AtomicU64,
    next_generation: AtomicU64,
    rejected_progress: AtomicUsize,
}

impl Shared {
    /// Apply a progress report from submission `generation`. Returns `false` if it was dropped.
    fn record_progress(&self, generation: u64, percent: u8) -> bool {
        let percent = percent.min(100);
        let mut accepted = false;

        self.state.send_if_modified(|state| {
            if generation == 0 || self.active.load(Ordering::SeqCst) != generation {
                debug!(
                    "Ignoring progress {} from inactive submission {}",
                    percent, generation
                );
                return false;
            }
            match state {
                ExportState::Submitting { progress } if percent < *progress => {
                    warn!(
                        "Dropping regressing progress report: {} after {}",
                        percent, progress
                    );
                    false
                }
                ExportState::Submitting { progress } => {
                    accepted = true;
                    let changed = percent != *progress;
                    *progress = percent;
                    changed
                }
                _ => false,
            }
        });

        if !accepted {
            self.rejected_progress.fetch_add(1, Ordering::SeqCst);
        }
        accepted
    }

    /// Publish the terminal state of submission `generation`
    fn finish(&self, generation: u64, outcome: &ExportOutcome) {
        self.state.send_if_modified(|state| {
            if self.active.load(Ordering::SeqCst) != generation {
                return false;
            }
            self.active.store(0, Ordering::SeqCst);
            *state = match outcome {
                ExportOutcome::Succeeded(output) => ExportState::Succeeded {
                    output: Arc::clone(output),
                },
                ExportOutcome::Failed(message) => ExportState::Failed {
                    message: message.clone(),
                },
            };
            true
        });
    }
}

fn progress_handler(shared: &Arc<Shared>, generation: u64) -> ProgressHandler {
    let shared = Arc::clone(shared);
    Arc::new(move |percent: u8| {
        shared.record_progress(generation, percent);
    })
}

/// Tears down the engine job if the submitting future is dropped early.
///
/// The job itself keeps the resolver in `Submitting` until the engine returns.
struct CancelOnDrop<E: MediaEngine + ?Sized + 'static> {
    engine: Arc<E>,
    cancelled: Arc<AtomicBool>,
    finished: bool,
}

impl<E: MediaEngine + ?Sized + 'static> Drop for CancelOnDrop<E> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!("Export submission dropped before completion, terminating engine job");
        self.cancelled.store(true, Ordering::SeqCst);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let engine = Arc::clone(&self.engine);
                handle.spawn(async move {
                    if let Err(e) = engine.terminate().await {
                        warn!("Failed to terminate engine after cancel: {}", e);
                    }
                });
            }
            Err(_) => warn!("No runtime to terminate the engine job on"),
        }
    }
}

/// Submits export requests to a media engine, one at a time
///
/// A second submission while one is in flight is rejected with
/// [`ShortsError::ExportInProgress`]; the in-flight submission is unaffected.
/// A submission stays in flight until the engine returns, even if the future
/// that started it is dropped.
///
/// An engine has a single progress slot, which each submission claims when it
/// starts. Resolvers sharing one engine must not submit concurrently.
pub struct ExportResolver<E: MediaEngine + ?Sized + 'static> {
    engine: Arc<E>,
    shared: Arc<Shared>,
}

impl<E: MediaEngine + ?Sized + 'static> ExportResolver<E> {
    /// Create a resolver and register an idle progress handler with `engine`
    pub fn new(engine: Arc<E>) -> Self {
        let (tx, _) = watch::channel(ExportState::Idle);
        let shared = Arc::new(Shared {
            state: tx,
            active: AtomicU64::new(0),
            next_generation: AtomicU64::new(1),
            rejected_progress: AtomicUsize::new(0),
        });

        // Generation 0 never matches a submission
        engine.on_progress(progress_handler(&shared, 0));

        Self { engine, shared }
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// Snapshot of the current state
    pub fn state(&self) -> ExportState {
        self.shared.state.borrow().clone()
    }

    /// Watch state transitions and progress updates
    pub fn subscribe(&self) -> watch::Receiver<ExportState> {
        self.shared.state.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.shared.state.borrow().is_submitting()
    }

    /// Progress reports dropped because they regressed or did not belong to
    /// the in-flight submission
    pub fn rejected_progress_reports(&self) -> usize {
        self.shared.rejected_progress.load(Ordering::SeqCst)
    }

    /// Resolve a request from `selections` and `cut_points` and submit it
    pub async fn build_and_submit(
        &self,
        selections: ExportSelections,
        cut_points: &[CutPoint],
        source: &[u8],
    ) -> ShortsResult<ExportOutcome> {
        let request = ExportRequest::resolve(selections, cut_points);
        if request.ignored_cut_points() > 0 {
            debug!(
                "Exporting first cut point only, {} ignored",
                request.ignored_cut_points()
            );
        }
        self.submit(&request, source).await
    }

    /// Submit a resolved request.
    ///
    /// Engine failures become [`ExportOutcome::Failed`]; the only error
    /// returned is [`ShortsError::ExportInProgress`].
    pub async fn submit(
        &self,
        request: &ExportRequest,
        source: &[u8],
    ) -> ShortsResult<ExportOutcome> {
        let generation = self.shared.next_generation.fetch_add(1, Ordering::SeqCst);
        let started = self.shared.state.send_if_modified(|state| {
            if state.is_submitting() {
                false
            } else {
                self.shared.active.store(generation, Ordering::SeqCst);
                *state = ExportState::Submitting { progress: 0 };
                true
            }
        });
        if !started {
            warn!("Export rejected: another submission is in progress");
            return Err(ShortsError::ExportInProgress);
        }

        self.engine
            .on_progress(progress_handler(&self.shared, generation));

        info!(
            "Export {} started: {} @ {}, range {:?}",
            generation, request.resolution, request.fps, request.source_range
        );

        let cancelled = Arc::new(AtomicBool::new(false));
        let job = tokio::spawn(run_job(
            Arc::clone(&self.engine),
            Arc::clone(&self.shared),
            generation,
            request.to_options(),
            source.to_vec(),
            Arc::clone(&cancelled),
        ));

        let mut guard = CancelOnDrop {
            engine: Arc::clone(&self.engine),
            cancelled,
            finished: false,
        };

        let outcome = match job.await {
            Ok(outcome) => outcome,
            Err(e) => {
                let outcome = ExportOutcome::Failed(format!("Export task failed: {}", e));
                self.shared.finish(generation, &outcome);
                outcome
            }
        };

        guard.finished = true;
        Ok(outcome)
    }

    /// Return to `Idle` after a finished submission. No-op while submitting.
    pub fn reset(&self) -> bool {
        self.shared.state.send_if_modified(|state| {
            if state.is_terminal() {
                *state = ExportState::Idle;
                true
            } else {
                false
            }
        })
    }

    /// Tear down the engine. Safe to call repeatedly.
    pub async fn shutdown(&self) -> ShortsResult<()> {
        self.engine.terminate().await
    }
}

/// Load the engine and process one submission, then publish its terminal state
async fn run_job<E: MediaEngine + ?Sized>(
    engine: Arc<E>,
    shared: Arc<Shared>,
    generation: u64,
    options: ProcessingOptions,
    source: Vec<u8>,
    cancelled: Arc<AtomicBool>,
) -> ExportOutcome {
    let result = match engine.load().await {
        Ok(()) => engine.process(&source, &options).await,
        Err(e) => Err(ShortsError::engine_init(e)),
    };

    let outcome = if cancelled.load(Ordering::SeqCst) {
        info!("Export {} cancelled", generation);
        ExportOutcome::Failed("Export cancelled".to_string())
    } else {
        match result {
            Ok(output) => {
                info!("Export {} succeeded ({} bytes)", generation, output.len());
                ExportOutcome::Succeeded(output.into())
            }
            Err(e) => {
                warn!("Export {} failed: {}", generation, e);
                ExportOutcome::Failed(e.to_string())
            }
        }
    };

    shared.finish(generation, &outcome);
    outcome
}
