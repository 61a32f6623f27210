pub mod buffer;
pub mod config;
pub mod error;
pub mod filters;
pub mod pipeline;
pub mod processor;
pub mod profile;
pub mod transforms;

pub use buffer::{PixelBuffer, PixelFormat};
pub use config::ProcessorConfig;
pub use error::{CoreError, Result};
pub use filters::{FilterKind, FilterSettings};
pub use pipeline::{PipelineResult, run_filter_pipeline};
pub use processor::{ImageProcessor, ProcessorStats, ResultSubscription, RunState};
