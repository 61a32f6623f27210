//! Background filter processor.
//!
//! [`ImageProcessor`] owns the source image and the current [`FilterSettings`].
//! Every accepted change bumps a generation counter and wakes a dedicated
//! worker thread, which snapshots the newest (image, settings) pair and runs
//! the pipeline outside the lock. A run publishes only if its generation is
//! still current when it finishes; otherwise its output is dropped. Bursts of
//! changes collapse into a single pending run with the latest settings.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::buffer::PixelBuffer;
use crate::config::ProcessorConfig;
use crate::error::{CoreError, Result};
use crate::filters::{FilterKind, FilterSettings};
use crate::pipeline::{PipelineResult, StageTimings, run_filter_pipeline};
use crate::profile::{ProcessorProfile, ProfileCollector, RunMetrics, RunOutcome};

/// What the worker is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running { generation: u64 },
}

/// Counters over the processor's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessorStats {
    pub runs_started: u64,
    pub runs_completed: u64,
    pub runs_cancelled: u64,
    pub runs_failed: u64,
}

struct State {
    source: Option<Arc<PixelBuffer>>,
    settings: FilterSettings,
    generation: u64,
    /// A change arrived that the worker has not picked up yet.
    pending: bool,
    run_state: RunState,
    published: Option<Arc<PixelBuffer>>,
    /// Bumped on every publication; subscribers compare against it.
    version: u64,
    stats: ProcessorStats,
    profile: ProfileCollector,
    shutdown: bool,
}

impl State {
    fn new(profiling: bool) -> Self {
        Self {
            source: None,
            settings: FilterSettings::default(),
            generation: 0,
            pending: false,
            run_state: RunState::Idle,
            published: None,
            version: 0,
            stats: ProcessorStats::default(),
            profile: ProfileCollector::new(profiling),
            shutdown: false,
        }
    }

    fn publish(&mut self, image: Arc<PixelBuffer>) {
        self.published = Some(image);
        self.version += 1;
    }

    fn is_busy(&self) -> bool {
        self.pending || matches!(self.run_state, RunState::Running { .. })
    }
}

struct Shared {
    state: Mutex<State>,
    /// Wakes the worker when a run is pending or on shutdown.
    work: Condvar,
    /// Wakes subscribers and idle waiters after a publication or a finished run.
    changed: Condvar,
}

impl Shared {
    /// Invalidate any in-flight run and hand the latest state to the worker.
    fn schedule(&self, state: &mut State) {
        state.generation += 1;
        state.pending = true;
        self.work.notify_one();
    }
}

/// Snapshot a single run works on.
struct Job {
    generation: u64,
    source: Arc<PixelBuffer>,
    settings: FilterSettings,
}

/// Applies filter settings to a source image on a background thread and
/// publishes the most recent result.
pub struct ImageProcessor {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl ImageProcessor {
    /// Start a processor with no image loaded.
    pub fn new(config: ProcessorConfig) -> Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(State::new(config.profiling)),
            work: Condvar::new(),
            changed: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name(config.worker_name.clone())
            .spawn(move || run_worker(&worker_shared))
            .map_err(CoreError::WorkerSpawn)?;

        debug!(worker = %config.worker_name, profiling = config.profiling, "image processor started");

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Start a processor and load `image` into it.
    pub fn with_image(image: impl Into<Arc<PixelBuffer>>, config: ProcessorConfig) -> Result<Self> {
        let processor = Self::new(config)?;
        processor.set_image(image);
        Ok(processor)
    }

    /// Replace the source image and reset every filter to neutral.
    ///
    /// The raw image is published before this returns, so observers see it
    /// immediately. Any run still working on the previous image is cancelled.
    pub fn set_image(&self, image: impl Into<Arc<PixelBuffer>>) {
        let image = image.into();
        let mut state = self.shared.state.lock();
        debug!(
            width = image.width(),
            height = image.height(),
            generation = state.generation + 1,
            "source image replaced"
        );
        state.source = Some(Arc::clone(&image));
        state.settings = FilterSettings::default();
        state.publish(image);
        self.shared.schedule(&mut state);
        self.shared.changed.notify_all();
    }

    /// Set one filter parameter and re-run the pipeline.
    ///
    /// Invalid values are rejected and leave the settings untouched. Setting
    /// a parameter to its current value does nothing.
    pub fn change(&self, kind: FilterKind, value: f32) -> Result<()> {
        kind.validate(value)?;
        let mut state = self.shared.state.lock();
        let next = state.settings.with_value(kind, value);
        self.apply_settings(&mut state, next);
        Ok(())
    }

    pub fn change_brightness(&self, value: f32) -> Result<()> {
        self.change(FilterKind::Brightness, value)
    }

    pub fn change_contrast(&self, value: f32) -> Result<()> {
        self.change(FilterKind::Contrast, value)
    }

    pub fn change_saturation(&self, value: f32) -> Result<()> {
        self.change(FilterKind::Saturation, value)
    }

    pub fn change_gamma(&self, value: f32) -> Result<()> {
        self.change(FilterKind::Gamma, value)
    }

    /// Put every filter back to neutral.
    pub fn reset_filters(&self) {
        let mut state = self.shared.state.lock();
        self.apply_settings(&mut state, FilterSettings::default());
    }

    fn apply_settings(&self, state: &mut State, next: FilterSettings) {
        if next == state.settings {
            return;
        }
        state.settings = next;
        // Without an image the settings are only recorded.
        if state.source.is_some() {
            self.shared.schedule(state);
            debug!(generation = state.generation, ?next, "filter settings changed");
        }
    }

    /// The currently published image, if any. Never blocks on a running filter.
    pub fn result(&self) -> Option<Arc<PixelBuffer>> {
        self.shared.state.lock().published.clone()
    }

    /// Observe published results.
    ///
    /// The first receive yields the current result (if one exists); later
    /// receives yield only newer publications.
    pub fn subscribe(&self) -> ResultSubscription {
        ResultSubscription {
            shared: Arc::clone(&self.shared),
            seen_version: 0,
        }
    }

    pub fn settings(&self) -> FilterSettings {
        self.shared.state.lock().settings
    }

    pub fn source(&self) -> Option<Arc<PixelBuffer>> {
        self.shared.state.lock().source.clone()
    }

    pub fn run_state(&self) -> RunState {
        self.shared.state.lock().run_state
    }

    pub fn stats(&self) -> ProcessorStats {
        self.shared.state.lock().stats
    }

    /// Profiling report, or `None` when profiling is disabled.
    pub fn profile(&self) -> Option<ProcessorProfile> {
        self.shared.state.lock().profile.finish()
    }

    /// Block until no change is pending and no run is in flight.
    /// Returns false if `timeout` elapsed first.
    pub fn wait_until_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while state.is_busy() {
            if self.shared.changed.wait_until(&mut state, deadline).timed_out() {
                return !state.is_busy();
            }
        }
        true
    }
}

impl Drop for ImageProcessor {
    fn drop(&mut self) {
        self.shared.state.lock().shutdown = true;
        self.shared.work.notify_all();
        self.shared.changed.notify_all();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("filter worker panicked");
            }
        }
    }
}

/// Receiving end for published results. Intermediate publications that
/// happen between two receives are skipped; only the newest is returned.
pub struct ResultSubscription {
    shared: Arc<Shared>,
    seen_version: u64,
}

impl ResultSubscription {
    /// Newer result if one was published since the last receive.
    pub fn try_recv(&mut self) -> Option<Arc<PixelBuffer>> {
        let state = self.shared.state.lock();
        take_newer(&mut self.seen_version, &state)
    }

    /// Block until a newer result is published. Returns `None` once the
    /// processor has shut down.
    pub fn recv(&mut self) -> Option<Arc<PixelBuffer>> {
        let mut state = self.shared.state.lock();
        loop {
            if let Some(image) = take_newer(&mut self.seen_version, &state) {
                return Some(image);
            }
            if state.shutdown {
                return None;
            }
            self.shared.changed.wait(&mut state);
        }
    }

    /// Like [`recv`](Self::recv) but gives up after `timeout`.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<Arc<PixelBuffer>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        loop {
            if let Some(image) = take_newer(&mut self.seen_version, &state) {
                return Some(image);
            }
            if state.shutdown {
                return None;
            }
            if self.shared.changed.wait_until(&mut state, deadline).timed_out() {
                return take_newer(&mut self.seen_version, &state);
            }
        }
    }
}

fn take_newer(seen_version: &mut u64, state: &State) -> Option<Arc<PixelBuffer>> {
    if state.version > *seen_version {
        *seen_version = state.version;
        state.published.clone()
    } else {
        None
    }
}

fn run_worker(shared: &Shared) {
    loop {
        let job = {
            let mut state = shared.state.lock();
            while !state.pending && !state.shutdown {
                shared.work.wait(&mut state);
            }
            if state.shutdown {
                break;
            }
            state.pending = false;
            let Some(source) = state.source.clone() else {
                shared.changed.notify_all();
                continue;
            };
            state.run_state = RunState::Running {
                generation: state.generation,
            };
            state.stats.runs_started += 1;
            Job {
                generation: state.generation,
                source,
                settings: state.settings,
            }
        };

        debug!(generation = job.generation, settings = ?job.settings, "filter run started");
        let start = Instant::now();
        let result = catch_run_panic(|| run_filter_pipeline(&job.source, &job.settings));
        let total_ms = start.elapsed().as_secs_f64() * 1000.0;

        let mut state = shared.state.lock();
        finish_run(&mut state, &job, result, total_ms);
        shared.changed.notify_all();
    }
    debug!("filter worker stopped");
}

/// Turn a panic inside a run into a failed result so the worker survives it.
fn catch_run_panic<F>(run: F) -> Result<PipelineResult>
where
    F: FnOnce() -> Result<PipelineResult>,
{
    panic::catch_unwind(AssertUnwindSafe(run))
        .unwrap_or_else(|payload| Err(CoreError::RunPanicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Publish a finished run's output unless a newer change superseded it.
fn finish_run(
    state: &mut State,
    job: &Job,
    result: Result<PipelineResult>,
    total_ms: f64,
) -> RunOutcome {
    state.run_state = RunState::Idle;

    let (timings, stages_applied) = result
        .as_ref()
        .map(|r| (r.timings, r.stages_applied))
        .unwrap_or((StageTimings::default(), 0));

    let outcome = if state.generation != job.generation {
        state.stats.runs_cancelled += 1;
        debug!(
            generation = job.generation,
            current = state.generation,
            "filter run superseded, result discarded"
        );
        RunOutcome::Cancelled
    } else {
        match result {
            Ok(result) => {
                state.publish(result.image);
                state.stats.runs_completed += 1;
                debug!(generation = job.generation, total_ms, "filter result published");
                RunOutcome::Completed
            }
            Err(e) => {
                state.stats.runs_failed += 1;
                warn!(generation = job.generation, error = %e, "filter run failed");
                RunOutcome::Failed
            }
        }
    };

    if state.profile.is_enabled() {
        state.profile.record_run(RunMetrics {
            generation: job.generation,
            width: job.source.width(),
            height: job.source.height(),
            settings: job.settings,
            timings,
            stages_applied,
            total_ms,
            outcome,
        });
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn image(values: &[u8]) -> PixelBuffer {
        let data = values.iter().flat_map(|&v| [v, v, v]).collect();
        PixelBuffer::from_rgb_vec(values.len() as u32, 1, data).unwrap()
    }

    fn job(generation: u64, settings: FilterSettings) -> Job {
        Job {
            generation,
            source: Arc::new(image(&[10, 20])),
            settings,
        }
    }

    #[test]
    fn test_finish_run_publishes_current_generation() {
        let mut state = State::new(false);
        state.generation = 3;
        let job = job(3, FilterSettings::default().with_brightness(10.0));
        let result = run_filter_pipeline(&job.source, &job.settings);

        let outcome = finish_run(&mut state, &job, result, 1.0);
        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(state.version, 1);
        assert_eq!(state.published.as_ref().unwrap().data(), &[20, 20, 20, 30, 30, 30]);
        assert_eq!(state.stats.runs_completed, 1);
    }

    #[test]
    fn test_finish_run_discards_stale_generation() {
        let mut state = State::new(true);
        let raw = Arc::new(image(&[1, 2]));
        state.publish(Arc::clone(&raw));
        state.generation = 5;

        let job = job(4, FilterSettings::default().with_brightness(10.0));
        let result = run_filter_pipeline(&job.source, &job.settings);

        let outcome = finish_run(&mut state, &job, result, 1.0);
        assert_eq!(outcome, RunOutcome::Cancelled);
        assert_eq!(state.version, 1);
        assert!(Arc::ptr_eq(state.published.as_ref().unwrap(), &raw));
        assert_eq!(state.stats.runs_cancelled, 1);
        assert_eq!(state.run_state, RunState::Idle);

        let profile = state.profile.finish().unwrap();
        assert_eq!(profile.cancelled_runs, 1);
    }

    #[test]
    fn test_finish_run_failure_publishes_nothing() {
        let mut state = State::new(false);
        state.generation = 1;
        let job = job(1, FilterSettings::default().with_contrast(255.0));
        let result = run_filter_pipeline(&job.source, &job.settings);

        let outcome = finish_run(&mut state, &job, result, 0.0);
        assert_eq!(outcome, RunOutcome::Failed);
        assert!(state.published.is_none());
        assert_eq!(state.stats.runs_failed, 1);
    }

    #[test]
    fn test_panicking_run_is_counted_as_failed() {
        let result = catch_run_panic(|| panic!("stage exploded"));
        match &result {
            Err(CoreError::RunPanicked(msg)) => assert_eq!(msg, "stage exploded"),
            other => panic!("expected RunPanicked, got {other:?}"),
        }

        let mut state = State::new(false);
        state.generation = 2;
        state.run_state = RunState::Running { generation: 2 };
        let job = job(2, FilterSettings::default().with_gamma(2.0));

        let outcome = finish_run(&mut state, &job, result, 0.0);
        assert_eq!(outcome, RunOutcome::Failed);
        assert_eq!(state.run_state, RunState::Idle);
        assert!(state.published.is_none());
        assert_eq!(state.stats.runs_failed, 1);
    }

    #[test]
    fn test_catch_run_panic_passes_results_through() {
        let job = job(1, FilterSettings::default().with_brightness(5.0));
        let result = catch_run_panic(|| run_filter_pipeline(&job.source, &job.settings)).unwrap();
        assert_eq!(result.image.data(), &[15, 15, 15, 25, 25, 25]);
    }

    #[test]
    fn test_set_image_publishes_synchronously() {
        let processor = ImageProcessor::new(ProcessorConfig::default()).unwrap();
        assert!(processor.result().is_none());

        let raw = Arc::new(image(&[5, 6, 7]));
        processor.set_image(Arc::clone(&raw));
        assert!(Arc::ptr_eq(&processor.result().unwrap(), &raw));
    }

    #[test]
    fn test_change_without_image_only_records() {
        let processor = ImageProcessor::new(ProcessorConfig::default()).unwrap();
        processor.change_gamma(2.0).unwrap();
        assert_eq!(processor.settings().gamma, 2.0);
        assert!(processor.wait_until_idle(TIMEOUT));
        assert_eq!(processor.stats().runs_started, 0);
        assert!(processor.result().is_none());
    }

    #[test]
    fn test_invalid_change_leaves_settings() {
        let processor = ImageProcessor::with_image(image(&[1]), ProcessorConfig::default()).unwrap();
        processor.change_contrast(30.0).unwrap();
        assert!(processor.change_contrast(255.0).is_err());
        assert!(processor.change_gamma(0.0).is_err());
        assert!(processor.change_brightness(f32::NAN).is_err());
        assert_eq!(processor.settings(), FilterSettings::default().with_contrast(30.0));
    }

    #[test]
    fn test_unchanged_value_does_not_schedule() {
        let processor = ImageProcessor::with_image(image(&[1, 2]), ProcessorConfig::default()).unwrap();
        assert!(processor.wait_until_idle(TIMEOUT));
        let before = processor.stats().runs_started;

        processor.change_saturation(0.0).unwrap();
        processor.reset_filters();
        assert!(processor.wait_until_idle(TIMEOUT));
        assert_eq!(processor.stats().runs_started, before);
    }

    #[test]
    fn test_drop_stops_subscription() {
        let processor = ImageProcessor::new(ProcessorConfig::default()).unwrap();
        let mut subscription = processor.subscribe();
        drop(processor);
        assert!(subscription.recv().is_none());
    }
}
