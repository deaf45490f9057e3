//! Invisible text overlay aligned with the rasterized page.
//!
//! Each non-blank text item of a page becomes one absolutely positioned
//! [`OverlayNode`]. The nodes carry the literal text with a transparent
//! foreground so selection and copy work on top of the painted glyphs.
//!
//! Item transforms use the page description's bottom-left origin; the
//! overlay is top-left, so every node is flipped against the viewport
//! height:
//!
//! ```text
//! left = transform[4]
//! top  = viewport.height - transform[5] - font_size
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::selection::RawSelection;
use crate::source::{TextContent, TextItem};
use crate::viewport::Viewport;

const FALLBACK_FONT_FAMILY: &str = "sans-serif";

/// Presentation switches, passed into every build instead of read from
/// process-wide state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextLayerOptions {
    pub debug: bool,
    pub enhanced_selection: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0.0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0.0
    }
}

const DEBUG_LAYER_TINT: Color = Color::rgba(0, 255, 0, 0.1);
const DEBUG_NODE_BACKGROUND: Color = Color::rgba(255, 0, 0, 0.2);
const DEBUG_NODE_BORDER: Color = Color::rgba(255, 0, 0, 0.5);
const DEBUG_NODE_FOREGROUND: Color = Color::rgba(0, 0, 0, 0.8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PointerEvents {
    Auto,
    None,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Overflow {
    Hidden,
    Visible,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Border {
    pub width: f32,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayerStyle {
    pub opacity: f32,
    pub background: Option<Color>,
    pub pointer_events: PointerEvents,
    pub overflow: Overflow,
}

impl LayerStyle {
    pub fn for_options(options: TextLayerOptions) -> Self {
        let (opacity, background) = if options.debug {
            (0.3, Some(DEBUG_LAYER_TINT))
        } else {
            (0.0, None)
        };
        let (pointer_events, overflow) = if options.enhanced_selection {
            (PointerEvents::None, Overflow::Visible)
        } else {
            (PointerEvents::Auto, Overflow::Hidden)
        };
        Self {
            opacity,
            background,
            pointer_events,
            overflow,
        }
    }
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self::for_options(TextLayerOptions::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NodeStyle {
    pub color: Color,
    pub background: Option<Color>,
    pub border: Option<Border>,
    pub pointer_events: PointerEvents,
    pub min_height: Option<f32>,
    pub padding_right: f32,
    pub padding_bottom: f32,
}

impl NodeStyle {
    pub fn for_font_size(font_size: f32, options: TextLayerOptions) -> Self {
        let mut style = Self {
            color: Color::TRANSPARENT,
            background: None,
            border: None,
            pointer_events: PointerEvents::All,
            min_height: None,
            padding_right: 0.0,
            padding_bottom: 0.0,
        };
        if options.debug {
            style.color = DEBUG_NODE_FOREGROUND;
            style.background = Some(DEBUG_NODE_BACKGROUND);
            style.border = Some(Border {
                width: 1.0,
                color: DEBUG_NODE_BORDER,
            });
        }
        if options.enhanced_selection {
            // Small glyph boxes overlap at high zoom; widen each hit region.
            style.min_height = Some(font_size);
            style.padding_right = (0.1 * font_size).max(2.0);
            style.padding_bottom = (0.05 * font_size).max(1.0);
        }
        style
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayNode {
    pub item_index: usize,
    pub text: String,
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    pub font_size: f32,
    /// Font size divided by the viewport scale.
    pub font_scale: f32,
    pub font_family: String,
    pub style: NodeStyle,
}

/// Positions a single item, or `None` for blank items.
pub fn layout_item(
    item_index: usize,
    item: &TextItem,
    font_family: Option<&str>,
    viewport: &Viewport,
    options: TextLayerOptions,
) -> Option<OverlayNode> {
    if item.is_blank() {
        return None;
    }

    let tx = item.transform;
    let font_size = tx[0].abs();
    let font_scale = if viewport.scale > 0.0 {
        font_size / viewport.scale
    } else {
        font_size
    };
    let x = tx[4];
    let y = viewport.height - tx[5];

    Some(OverlayNode {
        item_index,
        text: item.text.clone(),
        left: x,
        top: y - font_size,
        width: item.width.abs(),
        height: font_size,
        font_size,
        font_scale,
        font_family: font_family.unwrap_or(FALLBACK_FONT_FAMILY).to_string(),
        style: NodeStyle::for_font_size(font_size, options),
    })
}

/// The overlay region of one page. Owned by its page view for the whole
/// document lifetime; builders fill and clear it.
#[derive(Debug, Clone, Serialize)]
pub struct TextLayer {
    width: f32,
    height: f32,
    scale_factor: f32,
    style: LayerStyle,
    nodes: Vec<OverlayNode>,
}

impl Default for TextLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayer {
    pub fn new() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            scale_factor: 1.0,
            style: LayerStyle::default(),
            nodes: Vec::new(),
        }
    }

    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    pub fn style(&self) -> &LayerStyle {
        &self.style
    }

    pub fn nodes(&self) -> &[OverlayNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Restyles the container and every node in place. Geometry is left
    /// untouched.
    pub fn apply_options(&mut self, options: TextLayerOptions) {
        self.style = LayerStyle::for_options(options);
        for node in &mut self.nodes {
            node.style = NodeStyle::for_font_size(node.font_size, options);
        }
    }

    /// The selection produced by dragging across nodes `start..=end`
    /// (in either order).
    pub fn selection(&self, start: usize, end: usize) -> Option<RawSelection> {
        let (first, last) = if start <= end { (start, end) } else { (end, start) };
        let nodes = self.nodes.get(first..=last)?;
        let text: String = nodes.iter().map(|node| node.text.as_str()).collect();
        Some(RawSelection {
            text,
            collapsed: false,
            inside_text_layer: true,
            spans_multiple_containers: first != last,
        })
    }
}

/// Builds one overlay pass for one page at one viewport.
///
/// A builder renders at most once; a zoom or redraw creates a new builder
/// after cancelling the previous one.
#[derive(Debug)]
pub struct TextLayerBuilder {
    page_index: usize,
    viewport: Viewport,
    options: TextLayerOptions,
    text_content: Option<Arc<TextContent>>,
    rendering_done: bool,
}

impl TextLayerBuilder {
    pub fn new(page_index: usize, viewport: Viewport, options: TextLayerOptions) -> Self {
        Self {
            page_index,
            viewport,
            options,
            text_content: None,
            rendering_done: false,
        }
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn options(&self) -> TextLayerOptions {
        self.options
    }

    pub fn is_done(&self) -> bool {
        self.rendering_done
    }

    pub fn set_text_content(&mut self, text_content: Arc<TextContent>) {
        self.text_content = Some(text_content);
    }

    /// Fills `layer` from the text content. Does nothing without content
    /// or once this builder has already rendered. Returns the node count.
    pub fn render(&mut self, layer: &mut TextLayer) -> usize {
        let Some(content) = self.text_content.as_ref() else {
            debug!(page = self.page_index + 1, "no text content to render");
            return layer.len();
        };
        if self.rendering_done {
            return layer.len();
        }

        layer.clear();
        layer.resize(self.viewport.width, self.viewport.height);
        layer.scale_factor = self.viewport.scale;
        layer.style = LayerStyle::for_options(self.options);

        layer.nodes = content
            .items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                let family = content.style_for(item).map(|s| s.font_family.as_str());
                layout_item(index, item, family, &self.viewport, self.options)
            })
            .collect();

        self.rendering_done = true;
        debug!(
            page = self.page_index + 1,
            items = content.items.len(),
            nodes = layer.len(),
            scale = self.viewport.scale,
            "text layer rendered"
        );
        layer.len()
    }

    /// Safe to call any number of times, before or after `render`.
    pub fn cancel(&mut self, layer: &mut TextLayer) {
        self.rendering_done = false;
        layer.clear();
    }
}
