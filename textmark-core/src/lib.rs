pub mod config;
pub mod error;
pub mod event_bus;
pub mod marks;
pub mod page_view;
pub mod selection;
pub mod session;
pub mod source;
pub mod text_layer;
pub mod viewer;
pub mod viewport;
pub mod zoom;

#[cfg(test)]
mod fakes;

pub use config::ViewerConfig;
pub use error::ViewerError;
pub use event_bus::{EventBus, EventKind, ListenerId, ViewerEvent};
pub use marks::{MarkId, MarkedText, MarkedTextStore};
pub use page_view::{PageView, RenderingState};
pub use selection::{is_meaningful, RawSelection, SelectionGate, SelectionOutcome};
pub use session::{Command, Notice, NoticeLevel, Session};
pub use source::{
    DocumentParser, DocumentSource, PageSource, RenderImage, TextContent, TextItem, TextStyle,
};
pub use text_layer::{OverlayNode, TextLayer, TextLayerBuilder, TextLayerOptions};
pub use viewer::{DocumentViewer, RenderReport, ScaleValue};
pub use viewport::Viewport;
pub use zoom::{ZoomPolicy, ZoomPreset};
