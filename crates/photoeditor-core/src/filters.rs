use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// One of the four adjustable filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterKind {
    Brightness,
    Contrast,
    Saturation,
    Gamma,
}

impl FilterKind {
    /// The order in which the pipeline applies filters. Changing it changes results.
    pub const PIPELINE_ORDER: [FilterKind; 4] = [
        FilterKind::Brightness,
        FilterKind::Contrast,
        FilterKind::Saturation,
        FilterKind::Gamma,
    ];

    /// Human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Brightness => "Brightness",
            Self::Contrast => "Contrast",
            Self::Saturation => "Saturation",
            Self::Gamma => "Gamma",
        }
    }

    /// The parameter value for which the filter leaves the image unchanged.
    pub fn neutral_value(&self) -> f32 {
        match self {
            Self::Gamma => 1.0,
            _ => 0.0,
        }
    }

    /// Slider range a UI should offer for this filter. The core itself only
    /// rejects values that would make the transform undefined.
    pub fn parameter_definition(&self) -> ParameterDefinition {
        let (min, max, step) = match self {
            Self::Brightness => (-100.0, 100.0, Some(1.0)),
            Self::Contrast | Self::Saturation => (-100.0, 100.0, None),
            Self::Gamma => (0.0, 10.0, None),
        };
        ParameterDefinition {
            kind: *self,
            label: self.display_name(),
            default: self.neutral_value(),
            min,
            max,
            step,
        }
    }

    /// Check that `value` is a legal parameter for this filter.
    pub fn validate(&self, value: f32) -> Result<()> {
        let invalid = |reason| CoreError::InvalidParameter {
            kind: *self,
            value,
            reason,
        };
        if !value.is_finite() {
            return Err(invalid("value must be finite"));
        }
        match self {
            Self::Brightness => Ok(()),
            Self::Contrast | Self::Saturation if value == 255.0 => {
                Err(invalid("factor (255 + v) / (255 - v) is singular at 255"))
            }
            Self::Contrast | Self::Saturation => Ok(()),
            Self::Gamma if value <= 0.0 => Err(invalid("gamma must be positive")),
            Self::Gamma => Ok(()),
        }
    }
}

/// Informative UI range for a filter parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterDefinition {
    pub kind: FilterKind,
    pub label: &'static str,
    pub default: f32,
    pub min: f32,
    pub max: f32,
    /// Slider granularity, `None` for continuous.
    pub step: Option<f32>,
}

/// Snapshot of all four filter parameters. Immutable: every change produces
/// a new value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSettings {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub gamma: f32,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            brightness: FilterKind::Brightness.neutral_value(),
            contrast: FilterKind::Contrast.neutral_value(),
            saturation: FilterKind::Saturation.neutral_value(),
            gamma: FilterKind::Gamma.neutral_value(),
        }
    }
}

impl FilterSettings {
    pub fn value(&self, kind: FilterKind) -> f32 {
        match kind {
            FilterKind::Brightness => self.brightness,
            FilterKind::Contrast => self.contrast,
            FilterKind::Saturation => self.saturation,
            FilterKind::Gamma => self.gamma,
        }
    }

    /// Copy of these settings with one field replaced.
    pub fn with_value(self, kind: FilterKind, value: f32) -> Self {
        let mut next = self;
        match kind {
            FilterKind::Brightness => next.brightness = value,
            FilterKind::Contrast => next.contrast = value,
            FilterKind::Saturation => next.saturation = value,
            FilterKind::Gamma => next.gamma = value,
        }
        next
    }

    pub fn with_brightness(self, value: f32) -> Self {
        self.with_value(FilterKind::Brightness, value)
    }

    pub fn with_contrast(self, value: f32) -> Self {
        self.with_value(FilterKind::Contrast, value)
    }

    pub fn with_saturation(self, value: f32) -> Self {
        self.with_value(FilterKind::Saturation, value)
    }

    pub fn with_gamma(self, value: f32) -> Self {
        self.with_value(FilterKind::Gamma, value)
    }

    /// True if every filter is at its neutral value.
    pub fn is_identity(&self) -> bool {
        FilterKind::PIPELINE_ORDER
            .iter()
            .all(|kind| self.value(*kind) == kind.neutral_value())
    }

    /// Validate every field, reporting the first offending filter.
    pub fn validate(&self) -> Result<()> {
        FilterKind::PIPELINE_ORDER
            .iter()
            .try_for_each(|kind| kind.validate(self.value(*kind)))
    }
}
