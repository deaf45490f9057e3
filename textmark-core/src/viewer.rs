use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::event_bus::{EventBus, ViewerEvent};
use crate::page_view::{PageView, PageViewOptions, RenderingState};
use crate::source::DocumentSource;
use crate::text_layer::TextLayerOptions;
use crate::viewport::normalize_rotation;

/// Upper bound for `Auto`: fit the width, but never blow small pages up
/// past this.
pub const MAX_AUTO_SCALE: f32 = 1.25;

/// A literal zoom factor or a named fit policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScaleValue {
    Numeric(f32),
    PageWidth,
    PageFit,
    Auto,
}

impl fmt::Display for ScaleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(scale) => write!(f, "{scale}"),
            Self::PageWidth => f.write_str("page-width"),
            Self::PageFit => f.write_str("page-fit"),
            Self::Auto => f.write_str("auto"),
        }
    }
}

impl FromStr for ScaleValue {
    type Err = ViewerError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "page-width" => Ok(Self::PageWidth),
            "page-fit" => Ok(Self::PageFit),
            "auto" => Ok(Self::Auto),
            other => match other.trim_end_matches('%').parse::<f32>() {
                Ok(value) if value.is_finite() && value > 0.0 => {
                    if other.ends_with('%') {
                        Ok(Self::Numeric(value / 100.0))
                    } else {
                        Ok(Self::Numeric(value))
                    }
                }
                _ => Err(ViewerError::Config(format!("invalid scale value {other:?}"))),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageFailure {
    pub page_number: usize,
    pub message: String,
}

/// Outcome of a viewer-wide redraw. One page failing never stops the
/// others from being drawn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderReport {
    pub pages_drawn: usize,
    pub failures: Vec<PageFailure>,
}

impl RenderReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Owns the page views of the loaded document and the scale and rotation
/// shared by all of them.
pub struct DocumentViewer {
    event_bus: Arc<EventBus>,
    document: Option<Arc<dyn DocumentSource>>,
    pages: Vec<PageView>,
    current_page_number: usize,
    current_scale: f32,
    current_scale_value: ScaleValue,
    pages_rotation: u32,
    container_size: (f32, f32),
    viewer_padding: f32,
    page_options: PageViewOptions,
}

impl DocumentViewer {
    pub fn new(config: &ViewerConfig, event_bus: Arc<EventBus>) -> Self {
        let current_scale = match config.default_zoom {
            ScaleValue::Numeric(scale) => scale,
            _ => 1.0,
        };
        Self {
            event_bus,
            document: None,
            pages: Vec::new(),
            current_page_number: 1,
            current_scale,
            current_scale_value: config.default_zoom,
            pages_rotation: 0,
            container_size: (config.container_width, config.container_height),
            viewer_padding: config.viewer_padding,
            page_options: PageViewOptions {
                text_layer: config.text_layer,
                cache_text_content: config.cache_text_content,
            },
        }
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    pub fn pages_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[PageView] {
        &self.pages
    }

    /// 1-based.
    pub fn page(&self, page_number: usize) -> Option<&PageView> {
        page_number.checked_sub(1).and_then(|idx| self.pages.get(idx))
    }

    pub fn current_page(&self) -> Option<&PageView> {
        self.page(self.current_page_number)
    }

    pub fn current_page_number(&self) -> usize {
        self.current_page_number
    }

    pub fn current_scale(&self) -> f32 {
        self.current_scale
    }

    pub fn current_scale_value(&self) -> ScaleValue {
        self.current_scale_value
    }

    pub fn pages_rotation(&self) -> u32 {
        self.pages_rotation
    }

    pub fn text_layer_options(&self) -> TextLayerOptions {
        self.page_options.text_layer
    }

    pub fn container_size(&self) -> (f32, f32) {
        self.container_size
    }

    pub fn set_container_size(&mut self, width: f32, height: f32) {
        self.container_size = (width.max(0.0), height.max(0.0));
    }

    /// Replaces the document wholesale and starts over at page 1. Only that
    /// page is drawn; the rest wait for navigation.
    #[instrument(skip(self, document), fields(pages = document.page_count()))]
    pub async fn set_document(&mut self, document: Arc<dyn DocumentSource>) -> Result<()> {
        self.reset_view();

        let count = document.page_count();
        let mut pages = Vec::with_capacity(count);
        for page_number in 1..=count {
            let page = document
                .page(page_number)
                .await
                .with_context(|| ViewerError::PageLoad { page: page_number })?;
            let mut view = PageView::new(
                page_number,
                self.current_scale,
                self.pages_rotation,
                page,
                Arc::clone(&self.event_bus),
                self.page_options,
            );
            view.reset();
            pages.push(view);
        }

        self.document = Some(document);
        self.pages = pages;
        self.current_page_number = 1;
        self.apply_named_scale()?;
        info!(pages = count, scale = self.current_scale, "document set");

        let current = self.current_page_number;
        if let Some(view) = self.pages.get_mut(current - 1) {
            if let Err(err) = view.draw().await {
                warn!(page = current, error = %err, "initial page draw failed");
            }
        }

        self.event_bus.dispatch(ViewerEvent::PagesInit { count });
        Ok(())
    }

    /// Fit modes depend on page geometry, so they are resolved again once
    /// a document is in place. Pages are only re-laid out, not drawn.
    fn apply_named_scale(&mut self) -> Result<()> {
        if matches!(self.current_scale_value, ScaleValue::Numeric(_)) {
            return Ok(());
        }
        let Some(scale) = self.resolve_scale(self.current_scale_value)? else {
            return Ok(());
        };
        self.current_scale = scale;
        for view in &mut self.pages {
            view.update(scale, self.pages_rotation);
        }
        self.event_bus.dispatch(ViewerEvent::ScaleChanged { scale });
        Ok(())
    }

    fn reset_view(&mut self) {
        for view in &mut self.pages {
            view.reset();
        }
        self.pages.clear();
        self.document = None;
    }

    /// Navigates to a page, drawing it on first visit.
    pub async fn set_current_page_number(&mut self, page_number: usize) -> Result<()> {
        let count = self.pages.len();
        if count == 0 {
            return Err(ViewerError::NoDocument.into());
        }
        if page_number == 0 || page_number > count {
            return Err(ViewerError::PageOutOfRange {
                page: page_number,
                count,
            }
            .into());
        }

        self.event_bus
            .dispatch(ViewerEvent::PageChanging { page_number });
        self.current_page_number = page_number;

        let view = &mut self.pages[page_number - 1];
        if view.rendering_state() == RenderingState::NotRendered {
            view.draw().await?;
        }
        Ok(())
    }

    /// Resolves `value` against the current geometry, applies it to every
    /// page and redraws all of them.
    pub async fn set_current_scale_value(&mut self, value: ScaleValue) -> Result<RenderReport> {
        if let Some(scale) = self.resolve_scale(value)? {
            self.current_scale = scale;
        }
        self.current_scale_value = value;
        self.event_bus.dispatch(ViewerEvent::ScaleChanged {
            scale: self.current_scale,
        });
        self.update().await
    }

    pub async fn set_pages_rotation(&mut self, rotation: i32) -> Result<RenderReport> {
        if rotation % 90 != 0 {
            return Err(ViewerError::Config(format!(
                "rotation must be a multiple of 90, got {rotation}"
            ))
            .into());
        }
        self.pages_rotation = normalize_rotation(rotation);
        self.update().await
    }

    /// Full rebuild at the current scale; same path as a zoom change.
    pub async fn recalculate_text_layer(&mut self) -> Result<RenderReport> {
        self.update().await
    }

    /// Restyles every existing overlay and applies `options` to future
    /// builds. Returns how many pages currently carry a text layer.
    pub fn set_text_layer_options(&mut self, options: TextLayerOptions) -> usize {
        self.page_options.text_layer = options;
        let mut restyled = 0;
        for view in &mut self.pages {
            view.set_text_layer_options(options);
            if view.has_text_layer() {
                restyled += 1;
            }
        }
        restyled
    }

    fn resolve_scale(&self, value: ScaleValue) -> Result<Option<f32>> {
        let scale = match value {
            ScaleValue::Numeric(scale) => {
                if !scale.is_finite() || scale <= 0.0 {
                    return Err(ViewerError::Config(format!("invalid scale {scale}")).into());
                }
                return Ok(Some(scale));
            }
            ScaleValue::PageWidth => self.page_width_scale(),
            ScaleValue::PageFit => self.page_fit_scale(),
            ScaleValue::Auto => self.page_width_scale().map(|s| s.min(MAX_AUTO_SCALE)),
        };
        Ok(scale.filter(|s| s.is_finite() && *s > 0.0))
    }

    /// First page size at scale 1 under the current rotation.
    fn first_page_size(&self) -> Option<(f32, f32)> {
        let first = self.pages.first()?;
        let unit = first.viewport().rescaled(1.0);
        Some((unit.width, unit.height))
    }

    fn page_width_scale(&self) -> Option<f32> {
        let (width, _) = self.first_page_size()?;
        let available = self.container_size.0 - self.viewer_padding;
        (width > 0.0 && available > 0.0).then(|| available / width)
    }

    fn page_fit_scale(&self) -> Option<f32> {
        let (width, height) = self.first_page_size()?;
        let available_width = self.container_size.0 - self.viewer_padding;
        let available_height = self.container_size.1 - self.viewer_padding;
        if width <= 0.0 || height <= 0.0 || available_width <= 0.0 || available_height <= 0.0 {
            return None;
        }
        Some((available_width / width).min(available_height / height))
    }

    /// Updates and redraws every page in order. Failures are collected,
    /// not propagated.
    #[instrument(skip(self), fields(scale = self.current_scale, rotation = self.pages_rotation))]
    pub async fn update(&mut self) -> Result<RenderReport> {
        let mut report = RenderReport::default();
        let scale = self.current_scale;
        let rotation = self.pages_rotation;
        for view in &mut self.pages {
            view.update(scale, rotation);
            debug!(page = view.id(), "re-rendering page after scale change");
            match view.draw().await {
                Ok(()) => report.pages_drawn += 1,
                Err(err) => report.failures.push(PageFailure {
                    page_number: view.id(),
                    message: format!("{err:#}"),
                }),
            }
        }
        if !report.is_clean() {
            warn!(failed = report.failures.len(), "some pages failed to re-render");
        }
        Ok(report)
    }
}

impl fmt::Debug for DocumentViewer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentViewer")
            .field("pages", &self.pages.len())
            .field("current_page_number", &self.current_page_number)
            .field("current_scale", &self.current_scale)
            .field("pages_rotation", &self.pages_rotation)
            .finish()
    }
}
