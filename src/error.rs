use std::path::PathBuf;

/// Errors surfaced by loading and configuring the previewer.
///
/// Geometry never fails; zero-area designs are drawn at a fallback scale.
#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("Unsupported file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("Failed to parse design: {0}")]
    ParseFailure(String),
    #[error("Invalid DST file: insufficient data")]
    InsufficientData,
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid preview config: {0}")]
    Config(String),
    #[error("Invalid viewport: {0}")]
    Viewport(String),
}

