//! Capabilities the core needs from the rendering collaborator.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::viewport::{Transform, ViewBox, Viewport};

#[derive(Debug, Clone)]
pub struct RenderImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextItem {
    pub text: String,
    pub transform: Transform,
    pub font_name: String,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
}

impl TextItem {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_family: String,
    #[serde(default)]
    pub ascent: f32,
    #[serde(default)]
    pub descent: f32,
    #[serde(default)]
    pub vertical: bool,
}

impl TextStyle {
    pub fn family(font_family: impl Into<String>) -> Self {
        Self {
            font_family: font_family.into(),
            ascent: 0.0,
            descent: 0.0,
            vertical: false,
        }
    }
}

/// Positioned text runs of one page plus the styles they reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub items: Vec<TextItem>,
    pub styles: HashMap<String, TextStyle>,
}

impl TextContent {
    pub fn style_for(&self, item: &TextItem) -> Option<&TextStyle> {
        self.styles.get(&item.font_name)
    }
}

#[async_trait::async_trait]
pub trait DocumentParser: Send + Sync {
    async fn parse(&self, bytes: Vec<u8>) -> Result<Arc<dyn DocumentSource>>;
}

#[async_trait::async_trait]
pub trait DocumentSource: Send + Sync {
    fn page_count(&self) -> usize;

    /// `page_number` is 1-based.
    async fn page(&self, page_number: usize) -> Result<Arc<dyn PageSource>>;
}

#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    fn view_box(&self) -> ViewBox;

    /// Intrinsic rotation stored in the document, in degrees.
    fn rotation(&self) -> u32 {
        0
    }

    fn viewport(&self, scale: f32, rotation: u32) -> Viewport {
        Viewport::new(self.view_box(), scale, rotation as i32)
    }

    async fn render(&self, viewport: &Viewport) -> Result<RenderImage>;

    async fn text_content(&self) -> Result<TextContent>;
}
