use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::filters::FilterSettings;
use crate::pipeline::StageTimings;

/// Env var that turns profiling on (`1` or `true`).
pub const PROFILE_ENV: &str = "PHOTOEDITOR_PROFILE";

/// Env var naming the directory profile reports are written to.
pub const PROFILE_DIR_ENV: &str = "PHOTOEDITOR_PROFILE_DIR";

const PROFILE_FILE_NAME: &str = "photoeditor.profile.json";

/// Oldest runs are dropped past this many, so long slider sessions stay bounded.
const MAX_RECORDED_RUNS: usize = 4096;

/// How a filter run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    Completed,
    Cancelled,
    Failed,
}

/// Timing breakdown for a single filter run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub generation: u64,
    pub width: u32,
    pub height: u32,
    pub settings: FilterSettings,
    pub timings: StageTimings,
    pub stages_applied: usize,
    pub total_ms: f64,
    pub outcome: RunOutcome,
}

/// Full profiling report, serialized to JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorProfile {
    pub runs: Vec<RunMetrics>,
    pub total_runs: usize,
    pub completed_runs: usize,
    pub cancelled_runs: usize,
    pub failed_runs: usize,
    pub avg_run_ms: f64,
    pub median_run_ms: f64,
    pub p95_run_ms: f64,
    pub max_run_ms: f64,
    pub slowest_generation: u64,
}

/// Accumulates run metrics. All recording is gated behind `is_enabled()`
/// so there is zero overhead when profiling is off.
#[derive(Debug)]
pub struct ProfileCollector {
    enabled: bool,
    runs: VecDeque<RunMetrics>,
}

impl ProfileCollector {
    /// Create a new collector. If `enabled` is false, all recording is a no-op.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            runs: VecDeque::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn record_run(&mut self, metrics: RunMetrics) {
        if !self.enabled {
            return;
        }
        if self.runs.len() == MAX_RECORDED_RUNS {
            self.runs.pop_front();
        }
        self.runs.push_back(metrics);
    }

    /// Build the report. Returns `None` if profiling is disabled.
    pub fn finish(&self) -> Option<ProcessorProfile> {
        if !self.enabled {
            return None;
        }

        let runs: Vec<RunMetrics> = self.runs.iter().cloned().collect();
        let count = |outcome: RunOutcome| runs.iter().filter(|r| r.outcome == outcome).count();

        let (avg, median, p95, max_ms, slowest) = if runs.is_empty() {
            (0.0, 0.0, 0.0, 0.0, 0)
        } else {
            compute_stats(&runs)
        };

        Some(ProcessorProfile {
            total_runs: runs.len(),
            completed_runs: count(RunOutcome::Completed),
            cancelled_runs: count(RunOutcome::Cancelled),
            failed_runs: count(RunOutcome::Failed),
            avg_run_ms: avg,
            median_run_ms: median,
            p95_run_ms: p95,
            max_run_ms: max_ms,
            slowest_generation: slowest,
            runs,
        })
    }
}

/// Compute avg, median, p95, max, and the slowest run's generation.
fn compute_stats(runs: &[RunMetrics]) -> (f64, f64, f64, f64, u64) {
    let mut times: Vec<f64> = runs.iter().map(|r| r.total_ms).collect();
    let n = times.len();
    let avg = times.iter().sum::<f64>() / n as f64;

    times.sort_by(|a, b| a.total_cmp(b));
    let median = times[n / 2];
    let p95_idx = ((n as f64 * 0.95).ceil() as usize).min(n - 1);
    let p95 = times[p95_idx];
    let max_ms = times[n - 1];

    let slowest = runs
        .iter()
        .max_by(|a, b| a.total_ms.total_cmp(&b.total_ms))
        .map(|r| r.generation)
        .unwrap_or(0);

    (avg, median, p95, max_ms, slowest)
}

/// Check if profiling is enabled via the `PHOTOEDITOR_PROFILE` env var.
/// Accepts `1` or `true` (case-insensitive).
pub fn is_profiling_enabled() -> bool {
    std::env::var(PROFILE_ENV)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Where to write the profile report.
///
/// `PHOTOEDITOR_PROFILE_DIR` wins when set; otherwise the report goes into
/// `fallback_dir`.
pub fn profile_output_path(fallback_dir: &Path) -> PathBuf {
    match std::env::var_os(PROFILE_DIR_ENV) {
        Some(dir) => PathBuf::from(dir).join(PROFILE_FILE_NAME),
        None => fallback_dir.join(PROFILE_FILE_NAME),
    }
}

/// Serialize a profile to pretty JSON and write it to `path`.
pub fn write_profile(profile: &ProcessorProfile, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(profile)?;
    std::fs::write(path, json)?;
    Ok(())
}
