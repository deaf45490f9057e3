use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::event_bus::EventBus;
use crate::marks::{MarkedText, MarkedTextStore};
use crate::selection::{RawSelection, SelectionGate, SelectionOutcome};
use crate::source::DocumentParser;
use crate::text_layer::{OverlayNode, TextLayerOptions};
use crate::viewer::{DocumentViewer, RenderReport, ScaleValue};
use crate::zoom::{ZoomPolicy, ZoomPreset};

const NO_TEXT_LAYERS: &str = "No text layers found. Load a PDF first.";
const NO_DOCUMENT: &str = "No PDF loaded";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    NextPage { count: usize },
    PrevPage { count: usize },
    GotoPage { page: usize },
    ZoomIn,
    ZoomOut,
    SetZoom { value: ScaleValue },
    FitWidth,
    FitPage,
    Rotate { degrees: i32 },
    ToggleDebug,
    ToggleEnhancedSelection,
    RecalculateTextLayer,
    ClearMarks,
    /// Drag across overlay nodes `start..=end` of the current page.
    Select { start: usize, end: usize },
    SubmitSelection(RawSelection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Transient status message for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// One open document plus everything the user did to it: marks, zoom and
/// presentation modes.
pub struct Session {
    viewer: DocumentViewer,
    marks: MarkedTextStore,
    zoom: ZoomPolicy,
    gate: SelectionGate,
}

impl Session {
    pub fn new(config: &ViewerConfig) -> Self {
        Self::with_event_bus(config, Arc::new(EventBus::new()))
    }

    pub fn with_event_bus(config: &ViewerConfig, event_bus: Arc<EventBus>) -> Self {
        Self {
            viewer: DocumentViewer::new(config, event_bus),
            marks: MarkedTextStore::new(),
            zoom: ZoomPolicy::from_config(config),
            gate: SelectionGate {
                max_chars: config.max_selection_chars,
                high_zoom_threshold: config.high_zoom_threshold,
            },
        }
    }

    pub fn viewer(&self) -> &DocumentViewer {
        &self.viewer
    }

    pub fn viewer_mut(&mut self) -> &mut DocumentViewer {
        &mut self.viewer
    }

    pub fn marks(&self) -> &MarkedTextStore {
        &self.marks
    }

    pub fn find_mark(&self, label: &str) -> Option<&MarkedText> {
        self.marks.find_by_label(label)
    }

    pub fn zoom_preset(&self) -> ZoomPreset {
        ZoomPreset::for_scale(self.viewer.current_scale())
    }

    /// Overlay of the current page, for alignment audits.
    pub fn current_overlay(&self) -> &[OverlayNode] {
        self.viewer
            .current_page()
            .map(|page| page.text_layer().nodes())
            .unwrap_or(&[])
    }

    /// Parses `bytes` and shows the result from page 1. On a parse failure
    /// the previously open document stays untouched.
    #[instrument(skip(self, parser, bytes), fields(bytes = bytes.len()))]
    pub async fn open_with<P>(&mut self, parser: &P, bytes: Vec<u8>) -> Result<()>
    where
        P: DocumentParser + ?Sized,
    {
        let document = parser
            .parse(bytes)
            .await
            .map_err(|err| ViewerError::Parse(format!("{err:#}")))?;
        let count = document.page_count();
        self.viewer.set_document(document).await?;
        info!(pages = count, "document opened");
        Ok(())
    }

    pub async fn apply(&mut self, command: Command) -> Result<Option<Notice>> {
        match command {
            Command::NextPage { count } => {
                let target = self.viewer.current_page_number().saturating_add(count);
                self.goto_page(target.min(self.viewer.pages_count())).await
            }
            Command::PrevPage { count } => {
                let target = self.viewer.current_page_number().saturating_sub(count);
                self.goto_page(target.max(1)).await
            }
            Command::GotoPage { page } => self.goto_page(page).await,
            Command::ZoomIn => {
                let scale = self.zoom.zoom_in(self.viewer.current_scale());
                self.set_scale(ScaleValue::Numeric(scale)).await
            }
            Command::ZoomOut => {
                let scale = self.zoom.zoom_out(self.viewer.current_scale());
                self.set_scale(ScaleValue::Numeric(scale)).await
            }
            Command::SetZoom { value } => match value {
                ScaleValue::Numeric(scale) => {
                    self.set_scale(ScaleValue::Numeric(self.zoom.clamp(scale)))
                        .await
                }
                ScaleValue::PageWidth => self.fit_width().await,
                ScaleValue::PageFit => self.fit_page().await,
                ScaleValue::Auto => self.set_scale(ScaleValue::Auto).await,
            },
            Command::FitWidth => self.fit_width().await,
            Command::FitPage => self.fit_page().await,
            Command::Rotate { degrees } => {
                if !self.viewer.has_document() {
                    return Ok(Some(Notice::info(NO_DOCUMENT)));
                }
                let rotation = self.viewer.pages_rotation() as i32 + degrees;
                let report = self.viewer.set_pages_rotation(rotation).await?;
                Ok(report_notice(&report).or_else(|| {
                    Some(Notice::info(format!(
                        "Rotation {}°",
                        self.viewer.pages_rotation()
                    )))
                }))
            }
            Command::ToggleDebug => Ok(Some(self.toggle_mode(|options| {
                options.debug = !options.debug;
                if options.debug {
                    "Debug mode enabled"
                } else {
                    "Debug mode disabled"
                }
            }))),
            Command::ToggleEnhancedSelection => Ok(Some(self.toggle_mode(|options| {
                options.enhanced_selection = !options.enhanced_selection;
                if options.enhanced_selection {
                    "Enhanced selection enabled"
                } else {
                    "Enhanced selection disabled"
                }
            }))),
            Command::RecalculateTextLayer => {
                if !self.viewer.has_document() {
                    return Ok(Some(Notice::info(NO_DOCUMENT)));
                }
                let report = self.viewer.recalculate_text_layer().await?;
                Ok(report_notice(&report)
                    .or_else(|| Some(Notice::success("Text layer recalculated"))))
            }
            Command::ClearMarks => {
                self.marks.clear();
                Ok(Some(Notice::info("All marked texts cleared")))
            }
            Command::Select { start, end } => {
                let raw = self
                    .viewer
                    .current_page()
                    .and_then(|page| page.text_layer().selection(start, end));
                match raw {
                    Some(raw) => Ok(self.submit_selection(&raw).1),
                    None => Ok(None),
                }
            }
            Command::SubmitSelection(raw) => Ok(self.submit_selection(&raw).1),
        }
    }

    /// Screens a raw selection and records it when accepted.
    pub fn submit_selection(&mut self, raw: &RawSelection) -> (SelectionOutcome, Option<Notice>) {
        let outcome = self.gate.evaluate(raw, self.viewer.current_scale());
        let notice = match &outcome {
            SelectionOutcome::Accepted(text) => {
                let page_number = self.viewer.current_page_number();
                let entry = self.marks.add(text.clone(), page_number);
                info!(id = %entry.id, page = page_number, chars = text.chars().count(), "text marked");
                outcome.hint().map(Notice::success)
            }
            SelectionOutcome::TooLarge => outcome.hint().map(Notice::warning),
            SelectionOutcome::Rejected => outcome.hint().map(Notice::info),
            SelectionOutcome::Ignored | SelectionOutcome::OutsideTextLayer => None,
        };
        (outcome, notice)
    }

    async fn goto_page(&mut self, page: usize) -> Result<Option<Notice>> {
        if !self.viewer.has_document() {
            return Ok(Some(Notice::info(NO_DOCUMENT)));
        }
        if page == self.viewer.current_page_number() {
            return Ok(None);
        }
        let Err(err) = self.viewer.set_current_page_number(page).await else {
            return Ok(None);
        };
        let notice = match err.downcast_ref::<ViewerError>() {
            Some(ViewerError::PageOutOfRange { count, .. }) => Some(Notice::warning(format!(
                "Page must be between 1 and {count}"
            ))),
            Some(error) if error.is_render_failure() => {
                warn!(page, %error, "page failed to render");
                Some(Notice::error(error.to_string()))
            }
            _ => None,
        };
        match notice {
            Some(notice) => Ok(Some(notice)),
            None => Err(err),
        }
    }

    /// Caller-level fit modes work against the assumed page size.
    async fn fit_width(&mut self) -> Result<Option<Notice>> {
        let (width, _) = self.viewer.container_size();
        let scale = self.zoom.fit_to_width(width);
        self.set_scale(ScaleValue::Numeric(scale)).await
    }

    async fn fit_page(&mut self) -> Result<Option<Notice>> {
        let (width, height) = self.viewer.container_size();
        let scale = self.zoom.fit_to_page(width, height);
        self.set_scale(ScaleValue::Numeric(scale)).await
    }

    async fn set_scale(&mut self, value: ScaleValue) -> Result<Option<Notice>> {
        if !self.viewer.has_document() {
            return Ok(None);
        }
        let report = self.viewer.set_current_scale_value(value).await?;
        Ok(report_notice(&report)
            .or_else(|| Some(Notice::info(format!("Zoom {}", self.zoom_preset())))))
    }

    fn toggle_mode<F>(&mut self, flip: F) -> Notice
    where
        F: FnOnce(&mut TextLayerOptions) -> &'static str,
    {
        if !self.viewer.pages().iter().any(|page| page.has_text_layer()) {
            return Notice::info(NO_TEXT_LAYERS);
        }
        let mut options = self.viewer.text_layer_options();
        let message = flip(&mut options);
        let restyled = self.viewer.set_text_layer_options(options);
        info!(
            restyled,
            debug = options.debug,
            enhanced = options.enhanced_selection,
            "text layer mode changed"
        );
        Notice::info(message)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("viewer", &self.viewer)
            .field("marks", &self.marks.len())
            .finish()
    }
}

fn report_notice(report: &RenderReport) -> Option<Notice> {
    if report.is_clean() {
        return None;
    }
    let pages: Vec<String> = report
        .failures
        .iter()
        .map(|failure| failure.page_number.to_string())
        .collect();
    Some(Notice::warning(format!(
        "Failed to render page(s) {}",
        pages.join(", ")
    )))
}
