use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::error::ViewerError;
use crate::event_bus::{EventBus, ViewerEvent};
use crate::source::{PageSource, RenderImage, TextContent};
use crate::text_layer::{TextLayer, TextLayerBuilder, TextLayerOptions};
use crate::viewport::{normalize_rotation, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RenderingState {
    NotRendered,
    Rendering,
    Finished,
    Error,
}

/// Raster target of one page. `width`/`height` are the layout size; the
/// backing image, once drawn, has the whole-pixel size of the viewport.
#[derive(Debug, Clone, Default)]
pub struct Canvas {
    width: f32,
    height: f32,
    image: Option<RenderImage>,
}

impl Canvas {
    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub fn image(&self) -> Option<&RenderImage> {
        self.image.as_ref()
    }

    fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        self.image = None;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PageViewOptions {
    pub text_layer: TextLayerOptions,
    pub cache_text_content: bool,
}

/// Rendering state of a single page: its viewport, canvas and overlay.
pub struct PageView {
    id: usize,
    scale: f32,
    rotation: u32,
    page: Arc<dyn PageSource>,
    page_rotation: u32,
    viewport: Viewport,
    box_size: (u32, u32),
    canvas: Canvas,
    text_layer_region: TextLayer,
    text_layer: Option<TextLayerBuilder>,
    rendering_state: RenderingState,
    options: PageViewOptions,
    cached_text: Option<Arc<TextContent>>,
    event_bus: Arc<EventBus>,
}

impl PageView {
    /// `id` is the 1-based page number.
    pub fn new(
        id: usize,
        scale: f32,
        rotation: u32,
        page: Arc<dyn PageSource>,
        event_bus: Arc<EventBus>,
        options: PageViewOptions,
    ) -> Self {
        let page_rotation = page.rotation();
        let viewport = page.viewport(scale, normalize_rotation((rotation + page_rotation) as i32));
        Self {
            id,
            scale,
            rotation,
            page,
            page_rotation,
            viewport,
            box_size: (0, 0),
            canvas: Canvas::default(),
            text_layer_region: TextLayer::new(),
            text_layer: None,
            rendering_state: RenderingState::NotRendered,
            options,
            cached_text: None,
            event_bus,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn rotation(&self) -> u32 {
        self.rotation
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn box_size(&self) -> (u32, u32) {
        self.box_size
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn text_layer(&self) -> &TextLayer {
        &self.text_layer_region
    }

    pub fn has_text_layer(&self) -> bool {
        self.text_layer.is_some()
    }

    pub fn rendering_state(&self) -> RenderingState {
        self.rendering_state
    }

    fn total_rotation(&self) -> u32 {
        normalize_rotation((self.rotation + self.page_rotation) as i32)
    }

    /// Back to `NotRendered` with every surface sized to the current
    /// viewport and the existing overlay dropped.
    pub fn reset(&mut self) {
        debug!(page = self.id, "page view reset");
        self.rendering_state = RenderingState::NotRendered;

        self.box_size = self.viewport.floor_size();
        self.canvas.resize(self.viewport.width, self.viewport.height);

        if let Some(mut builder) = self.text_layer.take() {
            builder.cancel(&mut self.text_layer_region);
        }
        self.text_layer_region.clear();
        self.text_layer_region
            .resize(self.viewport.width, self.viewport.height);
    }

    /// Recomputes the viewport and resets; there is no partial re-layout.
    pub fn update(&mut self, scale: f32, rotation: u32) {
        if scale.is_finite() && scale > 0.0 {
            self.scale = scale;
        }
        self.rotation = normalize_rotation(rotation as i32);
        self.viewport = self.page.viewport(self.scale, self.total_rotation());
        self.reset();
    }

    pub fn set_text_layer_options(&mut self, options: TextLayerOptions) {
        self.options.text_layer = options;
        self.text_layer_region.apply_options(options);
    }

    #[instrument(skip(self), fields(page = self.id, scale = self.scale))]
    pub async fn draw(&mut self) -> Result<()> {
        if self.rendering_state != RenderingState::NotRendered {
            debug!(state = ?self.rendering_state, "page already drawn, forcing re-render");
            self.rendering_state = RenderingState::NotRendered;
        }
        self.rendering_state = RenderingState::Rendering;

        let viewport = self.viewport;
        let rendered = self.page.render(&viewport).await;
        let image = match rendered {
            Ok(image) => image,
            Err(err) => return Err(self.fail(ViewerError::Render {
                page: self.id,
                message: format!("{err:#}"),
            })),
        };
        self.canvas.image = Some(image);
        self.rendering_state = RenderingState::Finished;

        // Geometry is rebuilt on every draw, even over a finished layer.
        let fetched = self.text_content().await;
        let content = match fetched {
            Ok(content) => content,
            Err(err) => return Err(self.fail(ViewerError::TextContent {
                page: self.id,
                message: format!("{err:#}"),
            })),
        };

        if let Some(mut previous) = self.text_layer.take() {
            previous.cancel(&mut self.text_layer_region);
        }
        let mut builder = TextLayerBuilder::new(self.id - 1, viewport, self.options.text_layer);
        builder.set_text_content(content);
        let nodes = builder.render(&mut self.text_layer_region);
        self.text_layer = Some(builder);

        self.event_bus.dispatch(ViewerEvent::TextLayerRendered {
            page_number: self.id,
            nodes,
        });
        self.event_bus.dispatch(ViewerEvent::PageRendered {
            page_number: self.id,
            error: None,
        });
        Ok(())
    }

    async fn text_content(&mut self) -> Result<Arc<TextContent>> {
        if let Some(cached) = &self.cached_text {
            return Ok(Arc::clone(cached));
        }
        let content = Arc::new(self.page.text_content().await?);
        if self.options.cache_text_content {
            self.cached_text = Some(Arc::clone(&content));
        }
        Ok(content)
    }

    fn fail(&mut self, error: ViewerError) -> anyhow::Error {
        self.rendering_state = RenderingState::Error;
        warn!(page = self.id, %error, "page rendering failed");
        self.event_bus.dispatch(ViewerEvent::PageRendered {
            page_number: self.id,
            error: Some(error.to_string()),
        });
        error.into()
    }
}

impl std::fmt::Debug for PageView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageView")
            .field("id", &self.id)
            .field("scale", &self.scale)
            .field("rotation", &self.rotation)
            .field("rendering_state", &self.rendering_state)
            .field("nodes", &self.text_layer_region.len())
            .finish()
    }
}
