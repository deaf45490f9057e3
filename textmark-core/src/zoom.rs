//! Caller-level zoom: step in/out, fit modes against an assumed page size,
//! and the percentage shown next to the zoom selector.

use std::fmt;

use crate::config::ViewerConfig;

/// Scales offered by the zoom selector.
pub const STANDARD_SCALES: [f32; 8] = [0.5, 0.75, 1.0, 1.25, 1.5, 2.0, 3.0, 4.0];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomPolicy {
    pub step: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    pub fit_padding: f32,
    pub page_width: f32,
    pub page_height: f32,
}

impl ZoomPolicy {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            step: config.zoom_step,
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            fit_padding: config.fit_padding,
            page_width: config.assumed_page_width,
            page_height: config.assumed_page_height,
        }
    }

    pub fn zoom_in(&self, scale: f32) -> f32 {
        (scale * self.step).min(self.max_scale)
    }

    pub fn zoom_out(&self, scale: f32) -> f32 {
        (scale / self.step).max(self.min_scale)
    }

    pub fn clamp(&self, scale: f32) -> f32 {
        scale.clamp(self.min_scale, self.max_scale)
    }

    /// Used before real page geometry is known, hence the assumed size.
    pub fn fit_to_width(&self, container_width: f32) -> f32 {
        self.clamp((container_width - self.fit_padding) / self.page_width)
    }

    pub fn fit_to_page(&self, container_width: f32, container_height: f32) -> f32 {
        let scale_x = (container_width - self.fit_padding) / self.page_width;
        let scale_y = (container_height - self.fit_padding) / self.page_height;
        self.clamp(scale_x.min(scale_y))
    }
}

impl Default for ZoomPolicy {
    fn default() -> Self {
        Self::from_config(&ViewerConfig::default())
    }
}

pub fn zoom_percent(scale: f32) -> u32 {
    (scale * 100.0).round().max(0.0) as u32
}

/// What the zoom selector shows for a scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoomPreset {
    Standard(f32),
    Custom { scale: f32, percent: u32 },
}

impl ZoomPreset {
    pub fn for_scale(scale: f32) -> Self {
        match STANDARD_SCALES.iter().find(|s| (**s - scale).abs() < 1e-6) {
            Some(standard) => Self::Standard(*standard),
            None => Self::Custom {
                scale,
                percent: zoom_percent(scale),
            },
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom { .. })
    }
}

impl fmt::Display for ZoomPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard(scale) => write!(f, "{}%", zoom_percent(*scale)),
            Self::Custom { percent, .. } => write!(f, "{percent}% (custom)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_are_multiplicative_and_bounded() {
        let policy = ZoomPolicy::default();
        assert!((policy.zoom_in(1.0) - 1.2).abs() < 1e-6);
        assert!((policy.zoom_out(1.2) - 1.0).abs() < 1e-6);
        assert_eq!(policy.zoom_in(4.5), 5.0);
        assert_eq!(policy.zoom_out(0.11), 0.1);
    }

    #[test]
    fn fit_width_uses_assumed_letter_width() {
        let policy = ZoomPolicy::default();
        assert!((policy.fit_to_width(712.0) - 1.0).abs() < 1e-6);
        assert!((policy.fit_to_width(1324.0) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn fit_page_takes_the_tighter_axis() {
        let policy = ZoomPolicy::default();
        let scale = policy.fit_to_page(1324.0, 892.0);
        assert!((scale - 1.0).abs() < 1e-6);
    }

    #[test]
    fn fit_modes_clamp_to_bounds() {
        let policy = ZoomPolicy::default();
        assert_eq!(policy.fit_to_width(50.0), 0.1);
        assert_eq!(policy.fit_to_width(100_000.0), 5.0);
        assert_eq!(policy.fit_to_page(100_000.0, 100_000.0), 5.0);
    }

    #[test]
    fn presets_recognize_standard_scales() {
        assert_eq!(ZoomPreset::for_scale(1.25), ZoomPreset::Standard(1.25));
        assert_eq!(ZoomPreset::for_scale(1.25).to_string(), "125%");

        let custom = ZoomPreset::for_scale(1.2);
        assert!(custom.is_custom());
        assert_eq!(custom.to_string(), "120% (custom)");
        assert_eq!(zoom_percent(0.333), 33);
    }
}
