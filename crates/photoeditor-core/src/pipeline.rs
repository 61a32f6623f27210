use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::buffer::PixelBuffer;
use crate::error::Result;
use crate::filters::{FilterKind, FilterSettings};

/// Per-stage timings in milliseconds. Identity stages record zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StageTimings {
    pub brightness_ms: f64,
    pub contrast_ms: f64,
    pub saturation_ms: f64,
    pub gamma_ms: f64,
}

impl StageTimings {
    fn record(&mut self, kind: FilterKind, ms: f64) {
        match kind {
            FilterKind::Brightness => self.brightness_ms = ms,
            FilterKind::Contrast => self.contrast_ms = ms,
            FilterKind::Saturation => self.saturation_ms = ms,
            FilterKind::Gamma => self.gamma_ms = ms,
        }
    }

    pub fn total_ms(&self) -> f64 {
        self.brightness_ms + self.contrast_ms + self.saturation_ms + self.gamma_ms
    }
}

/// Result of running the filter pipeline, including metadata for profiling.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub image: Arc<PixelBuffer>,
    /// Number of stages that actually rewrote pixels.
    pub stages_applied: usize,
    pub timings: StageTimings,
}

/// Run brightness, contrast, saturation and gamma over `source`, in that order.
///
/// Each stage reads the previous stage's output. Stages at their neutral value
/// pass the current buffer through without allocating, so an all-neutral run
/// returns a clone of the `source` handle itself.
pub fn run_filter_pipeline(
    source: &Arc<PixelBuffer>,
    settings: &FilterSettings,
) -> Result<PipelineResult> {
    settings.validate()?;

    let mut current: Cow<'_, PixelBuffer> = Cow::Borrowed(source.as_ref());
    let mut stages_applied = 0;
    let mut timings = StageTimings::default();

    for kind in FilterKind::PIPELINE_ORDER {
        let value = settings.value(kind);
        let start = Instant::now();
        let next = match (kind.transform())(&*current, value)? {
            Cow::Owned(buf) => Some(buf),
            Cow::Borrowed(_) => None,
        };
        if let Some(buf) = next {
            let ms = start.elapsed().as_secs_f64() * 1000.0;
            trace!(stage = kind.display_name(), value, ms, "filter stage applied");
            timings.record(kind, ms);
            stages_applied += 1;
            current = Cow::Owned(buf);
        }
    }

    let image = match current {
        Cow::Borrowed(_) => Arc::clone(source),
        Cow::Owned(buf) => Arc::new(buf),
    };

    Ok(PipelineResult {
        image,
        stages_applied,
        timings,
    })
}
