use crate::profile::is_profiling_enabled;

const DEFAULT_WORKER_NAME: &str = "photoeditor-filter";

/// Settings for an [`ImageProcessor`](crate::processor::ImageProcessor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Name given to the background filter thread.
    pub worker_name: String,
    /// Record per-run timings, retrievable through `ImageProcessor::profile`.
    pub profiling: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            worker_name: DEFAULT_WORKER_NAME.to_string(),
            profiling: false,
        }
    }
}

impl ProcessorConfig {
    /// Defaults, with profiling taken from `PHOTOEDITOR_PROFILE`.
    pub fn from_env() -> Self {
        Self {
            profiling: is_profiling_enabled(),
            ..Self::default()
        }
    }

    pub fn with_profiling(mut self, profiling: bool) -> Self {
        self.profiling = profiling;
        self
    }

    pub fn with_worker_name(mut self, name: impl Into<String>) -> Self {
        self.worker_name = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProcessorConfig::default();
        assert_eq!(config.worker_name, "photoeditor-filter");
        assert!(!config.profiling);
    }

    #[test]
    fn test_builder_methods() {
        let config = ProcessorConfig::default()
            .with_profiling(true)
            .with_worker_name("preview");
        assert!(config.profiling);
        assert_eq!(config.worker_name, "preview");
    }
}
