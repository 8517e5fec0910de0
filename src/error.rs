use std::path::PathBuf;
use thiserror::Error;

/// The main error type for labelbridge operations.
///
/// The first four variants form the per-item taxonomy: they are fatal for
/// the single shape or instance being processed, never for a whole batch.
/// Batch APIs collect them per item and keep going.
#[derive(Debug, Error)]
pub enum LabelbridgeError {
    #[error("unsupported shape type '{0}'")]
    UnsupportedShapeType(String),

    #[error("invalid geometry for {shape_type} shape '{label}': {message}")]
    InvalidShapeGeometry {
        shape_type: &'static str,
        label: String,
        message: String,
    },

    #[error("label '{0}' has no class id in the provided mapping")]
    UnknownLabelClass(String),

    #[error("instance mask at position {0} has no covered pixels")]
    EmptyInstanceMask(usize),

    #[error("raster data length {actual_len} does not match {width}x{height} dimensions")]
    RasterDimensionMismatch {
        width: u32,
        height: u32,
        actual_len: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse conversation JSON from {path}: {source}")]
    ConversationJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write conversation JSON to {path}: {source}")]
    ConversationJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("image file '{image_ref}' referenced by {conversation_path} was not found")]
    ImageNotFound {
        conversation_path: PathBuf,
        image_ref: String,
    },

    #[error("Failed to read dimensions of image {path}: {source}")]
    ImageProbe {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },
}
