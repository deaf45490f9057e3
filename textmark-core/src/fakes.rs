//! In-memory document, page and parser used by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};

use crate::config::{US_LETTER_HEIGHT, US_LETTER_WIDTH};
use crate::source::{
    DocumentParser, DocumentSource, PageSource, RenderImage, TextContent, TextItem,
};
use crate::viewport::{Transform, ViewBox, Viewport};

pub fn item(text: &str, transform: Transform) -> TextItem {
    TextItem {
        text: text.to_string(),
        transform,
        font_name: "F1".to_string(),
        width: 0.0,
        height: 0.0,
    }
}

pub fn text_content(items: Vec<TextItem>) -> TextContent {
    TextContent {
        items,
        styles: HashMap::new(),
    }
}

pub struct FakePage {
    view_box: ViewBox,
    rotation: u32,
    content: TextContent,
    fail_render: AtomicBool,
    fail_text: AtomicBool,
    render_calls: AtomicUsize,
    text_calls: AtomicUsize,
}

impl FakePage {
    pub fn letter(content: TextContent) -> Self {
        Self {
            view_box: [0.0, 0.0, US_LETTER_WIDTH, US_LETTER_HEIGHT],
            rotation: 0,
            content,
            fail_render: AtomicBool::new(false),
            fail_text: AtomicBool::new(false),
            render_calls: AtomicUsize::new(0),
            text_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_rotation(mut self, rotation: u32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn fail_renders(&self, fail: bool) {
        self.fail_render.store(fail, Ordering::SeqCst);
    }

    pub fn fail_text_content(&self, fail: bool) {
        self.fail_text.store(fail, Ordering::SeqCst);
    }

    pub fn render_calls(&self) -> usize {
        self.render_calls.load(Ordering::SeqCst)
    }

    pub fn text_content_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PageSource for FakePage {
    fn view_box(&self) -> ViewBox {
        self.view_box
    }

    fn rotation(&self) -> u32 {
        self.rotation
    }

    async fn render(&self, viewport: &Viewport) -> Result<RenderImage> {
        self.render_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_render.load(Ordering::SeqCst) {
            bail!("rasterizer exploded");
        }
        let (width, height) = viewport.floor_size();
        Ok(RenderImage {
            width,
            height,
            pixels: Vec::new(),
        })
    }

    async fn text_content(&self) -> Result<TextContent> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_text.load(Ordering::SeqCst) {
            bail!("text extraction failed");
        }
        Ok(self.content.clone())
    }
}

pub struct FakeDocument {
    pages: Vec<Arc<FakePage>>,
    missing_page: Option<usize>,
}

impl FakeDocument {
    pub fn with_pages(pages: Vec<FakePage>) -> Self {
        Self {
            pages: pages.into_iter().map(Arc::new).collect(),
            missing_page: None,
        }
    }

    pub fn with_text(pages: &[&[&str]]) -> Self {
        Self::with_pages(
            pages
                .iter()
                .map(|lines| {
                    let items = lines
                        .iter()
                        .enumerate()
                        .map(|(row, line)| {
                            let y = 700.0 - 20.0 * row as f32;
                            item(line, [12.0, 0.0, 0.0, 12.0, 72.0, y])
                        })
                        .collect();
                    FakePage::letter(text_content(items))
                })
                .collect(),
        )
    }

    /// Makes loading of the given 1-based page fail.
    pub fn missing(mut self, page_number: usize) -> Self {
        self.missing_page = Some(page_number);
        self
    }

    pub fn page_at(&self, page_number: usize) -> &FakePage {
        &self.pages[page_number - 1]
    }
}

#[async_trait::async_trait]
impl DocumentSource for FakeDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    async fn page(&self, page_number: usize) -> Result<Arc<dyn PageSource>> {
        if self.missing_page == Some(page_number) {
            bail!("page {page_number} is damaged");
        }
        let page = page_number
            .checked_sub(1)
            .and_then(|idx| self.pages.get(idx))
            .ok_or_else(|| anyhow!("no page {page_number}"))?;
        Ok(Arc::clone(page) as Arc<dyn PageSource>)
    }
}

/// Hands out a prepared document regardless of the bytes, or fails on
/// anything that does not start with `%PDF`.
pub struct FakeParser {
    document: Arc<FakeDocument>,
}

impl FakeParser {
    pub fn new(document: FakeDocument) -> Self {
        Self {
            document: Arc::new(document),
        }
    }
}

#[async_trait::async_trait]
impl DocumentParser for FakeParser {
    async fn parse(&self, bytes: Vec<u8>) -> Result<Arc<dyn DocumentSource>> {
        if !bytes.starts_with(b"%PDF") {
            bail!("missing PDF header");
        }
        Ok(Arc::clone(&self.document) as Arc<dyn DocumentSource>)
    }
}
