use std::convert::TryFrom;
use std::mem;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use pdfium_render::prelude::*;
use textmark_core::viewport::ViewBox;
use textmark_core::{
    DocumentParser, DocumentSource, PageSource, RenderImage, TextContent, Viewport,
};
use tracing::{debug, instrument, warn};

use crate::text::{segment_to_item, style_for_font, DEFAULT_FONT_KEY};

const LIBRARY_PATH_VAR: &str = "TEXTMARK_PDFIUM_LIBRARY_PATH";

/// Parses in-memory PDF bytes with a PDFium library bound at runtime.
pub struct PdfiumParser {
    pdfium: Arc<Pdfium>,
}

impl PdfiumParser {
    pub fn new() -> Result<Self> {
        let pdfium = match bind_pdfium_from_env() {
            Some(pdfium) => pdfium,
            None => bind_pdfium_default()?,
        };
        Ok(Self {
            pdfium: Arc::new(pdfium),
        })
    }
}

#[async_trait]
impl DocumentParser for PdfiumParser {
    #[instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    async fn parse(&self, bytes: Vec<u8>) -> Result<Arc<dyn DocumentSource>> {
        let document = self
            .pdfium
            .load_pdf_from_byte_vec(bytes, None)
            .context("failed to parse PDF bytes")?;
        // SAFETY: the document borrows the bindings owned by `self.pdfium`.
        // `SharedDocument` keeps its own clone of that Arc and declares the
        // document first, so the document is dropped before the bindings.
        let document = unsafe { mem::transmute::<PdfDocument<'_>, PdfDocument<'static>>(document) };
        let page_count = usize::from(document.pages().len());
        debug!(pages = page_count, "document parsed");

        Ok(Arc::new(PdfiumDocument {
            shared: Arc::new(SharedDocument {
                document: Mutex::new(document),
                _pdfium: Arc::clone(&self.pdfium),
            }),
            page_count,
        }))
    }
}

struct SharedDocument {
    document: Mutex<PdfDocument<'static>>,
    _pdfium: Arc<Pdfium>,
}

impl SharedDocument {
    fn with_page<R, F>(&self, page_number: usize, f: F) -> Result<R>
    where
        F: FnOnce(&PdfPage<'_>) -> Result<R>,
    {
        let index = page_number
            .checked_sub(1)
            .and_then(|index| PdfPageIndex::try_from(index).ok())
            .ok_or_else(|| anyhow!("page {} is out of supported range", page_number))?;
        let document = self.document.lock();
        let page = document
            .pages()
            .get(index)
            .with_context(|| format!("page {} out of range", page_number))?;
        f(&page)
    }
}

struct PdfiumDocument {
    shared: Arc<SharedDocument>,
    page_count: usize,
}

#[async_trait]
impl DocumentSource for PdfiumDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    async fn page(&self, page_number: usize) -> Result<Arc<dyn PageSource>> {
        let (width, height) = self.shared.with_page(page_number, |page| {
            Ok((page.width().value, page.height().value))
        })?;
        Ok(Arc::new(PdfiumPage {
            shared: Arc::clone(&self.shared),
            page_number,
            view_box: [0.0, 0.0, width, height],
        }))
    }
}

/// PDFium reports page sizes with the page's own `/Rotate` already
/// applied, so pages are exposed in display orientation with no extra
/// intrinsic rotation.
struct PdfiumPage {
    shared: Arc<SharedDocument>,
    page_number: usize,
    view_box: ViewBox,
}

#[async_trait]
impl PageSource for PdfiumPage {
    fn view_box(&self) -> ViewBox {
        self.view_box
    }

    #[instrument(skip(self, viewport), fields(page = self.page_number, scale = viewport.scale))]
    async fn render(&self, viewport: &Viewport) -> Result<RenderImage> {
        let config = PdfRenderConfig::new()
            .scale_page_by_factor(viewport.scale.max(0.1))
            .rotate(render_rotation(viewport.rotation), true);
        self.shared.with_page(self.page_number, |page| {
            let bitmap = page
                .render_with_config(&config)
                .with_context(|| format!("failed to render page {}", self.page_number))?;
            Ok(RenderImage {
                width: u32::try_from(bitmap.width()).unwrap_or_default(),
                height: u32::try_from(bitmap.height()).unwrap_or_default(),
                pixels: bitmap.as_rgba_bytes(),
            })
        })
    }

    async fn text_content(&self) -> Result<TextContent> {
        self.shared.with_page(self.page_number, |page| {
            let text = page
                .text()
                .with_context(|| format!("failed to extract text for page {}", self.page_number))?;

            let mut content = TextContent::default();
            for segment in text.segments().iter() {
                let bounds = segment.bounds();
                let font_name = match segment.chars() {
                    Ok(chars) => chars.iter().next().map(|c| c.font_name()),
                    Err(err) => {
                        warn!(?err, page = self.page_number, "failed to read segment fonts");
                        None
                    }
                };
                let item = segment_to_item(
                    segment.text(),
                    bounds.left().value,
                    bounds.bottom().value,
                    bounds.right().value,
                    bounds.top().value,
                    font_name,
                );
                content
                    .styles
                    .entry(item.font_name.clone())
                    .or_insert_with(|| style_for_font(&item.font_name));
                content.items.push(item);
            }
            content
                .styles
                .entry(DEFAULT_FONT_KEY.to_string())
                .or_insert_with(|| style_for_font(""));
            debug!(
                page = self.page_number,
                items = content.items.len(),
                fonts = content.styles.len(),
                "text content extracted"
            );
            Ok(content)
        })
    }
}

/// Viewer rotation in degrees to PDFium's quarter turns.
pub fn render_rotation(rotation: u32) -> PdfPageRenderRotation {
    match rotation % 360 {
        90 => PdfPageRenderRotation::Degrees90,
        180 => PdfPageRenderRotation::Degrees180,
        270 => PdfPageRenderRotation::Degrees270,
        _ => PdfPageRenderRotation::None,
    }
}

fn bind_pdfium_from_env() -> Option<Pdfium> {
    match std::env::var(LIBRARY_PATH_VAR) {
        Ok(path) if !path.is_empty() => match Pdfium::bind_to_library(&path) {
            Ok(bindings) => Some(Pdfium::new(bindings)),
            Err(err) => {
                warn!("failed to load Pdfium from {} ({}): {}", path, LIBRARY_PATH_VAR, err);
                None
            }
        },
        _ => None,
    }
}

fn bind_pdfium_default() -> Result<Pdfium> {
    let mut errors = Vec::new();

    let cwd_path = Pdfium::pdfium_platform_library_name_at_path("./");
    match Pdfium::bind_to_library(&cwd_path) {
        Ok(bindings) => return Ok(Pdfium::new(bindings)),
        Err(err) => errors.push(format!("{}: {}", cwd_path.display(), err)),
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => Ok(Pdfium::new(bindings)),
        Err(err) => {
            errors.push(format!("system: {err}"));
            Err(anyhow!(
                "failed to bind to a pdfium library; set {} or install it ({})",
                LIBRARY_PATH_VAR,
                errors.join(", ")
            ))
        }
    }
}
