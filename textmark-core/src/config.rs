use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::error::ViewerError;
use crate::text_layer::TextLayerOptions;
use crate::viewer::ScaleValue;

pub const US_LETTER_WIDTH: f32 = 612.0;
pub const US_LETTER_HEIGHT: f32 = 792.0;

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    #[serde_as(as = "DisplayFromStr")]
    pub default_zoom: ScaleValue,
    pub min_scale: f32,
    pub max_scale: f32,
    pub zoom_step: f32,
    /// Horizontal padding removed from the container by the viewer's own
    /// `page-width` mode.
    pub viewer_padding: f32,
    /// Padding removed from the container by the caller-level fit modes.
    pub fit_padding: f32,
    pub assumed_page_width: f32,
    pub assumed_page_height: f32,
    pub max_selection_chars: usize,
    pub high_zoom_threshold: f32,
    pub cache_text_content: bool,
    pub container_width: f32,
    pub container_height: f32,
    pub text_layer: TextLayerOptions,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            default_zoom: ScaleValue::Numeric(1.0),
            min_scale: 0.1,
            max_scale: 5.0,
            zoom_step: 1.2,
            viewer_padding: 40.0,
            fit_padding: 100.0,
            assumed_page_width: US_LETTER_WIDTH,
            assumed_page_height: US_LETTER_HEIGHT,
            max_selection_chars: 2000,
            high_zoom_threshold: 2.0,
            cache_text_content: false,
            container_width: 1280.0,
            container_height: 900.0,
            text_layer: TextLayerOptions::default(),
        }
    }
}

impl ViewerConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|err| ViewerError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        Self::from_toml_str(&raw).with_context(|| format!("failed to load config {:?}", path))
    }

    /// Missing file means defaults; a present but broken file is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn validate(&self) -> Result<(), ViewerError> {
        let positive = [
            ("min_scale", self.min_scale),
            ("max_scale", self.max_scale),
            ("zoom_step", self.zoom_step),
            ("assumed_page_width", self.assumed_page_width),
            ("assumed_page_height", self.assumed_page_height),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ViewerError::Config(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        if self.zoom_step <= 1.0 {
            return Err(ViewerError::Config(format!(
                "zoom_step must be greater than 1, got {}",
                self.zoom_step
            )));
        }
        if self.min_scale > self.max_scale {
            return Err(ViewerError::Config(format!(
                "min_scale {} exceeds max_scale {}",
                self.min_scale, self.max_scale
            )));
        }
        if let ScaleValue::Numeric(scale) = self.default_zoom {
            if !scale.is_finite() || scale <= 0.0 {
                return Err(ViewerError::Config(format!(
                    "default_zoom must be positive, got {scale}"
                )));
            }
        }
        if self.max_selection_chars == 0 {
            return Err(ViewerError::Config(
                "max_selection_chars must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn clamp_scale(&self, scale: f32) -> f32 {
        scale.clamp(self.min_scale, self.max_scale)
    }
}
