use thiserror::Error;

/// Failures callers branch on. Everything else travels as plain `anyhow`
/// context; these are recovered with `err.downcast_ref::<ViewerError>()`.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("no document loaded")]
    NoDocument,
    #[error("failed to parse document: {0}")]
    Parse(String),
    #[error("page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },
    #[error("failed to load page {page}")]
    PageLoad { page: usize },
    #[error("failed to render page {page}: {message}")]
    Render { page: usize, message: String },
    #[error("failed to extract text content for page {page}: {message}")]
    TextContent { page: usize, message: String },
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ViewerError {
    pub fn is_render_failure(&self) -> bool {
        matches!(self, Self::Render { .. } | Self::TextContent { .. })
    }
}
