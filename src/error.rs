use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by the detection stages.
///
/// A processing error is never a classification outcome: an `Invalid` strip is
/// a successful run, while any of these aborts the current image.
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("Failed to decode image {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("No region found while {stage}")]
    NoRegionFound { stage: &'static str },

    #[error("Degenerate crop ({width}x{height})")]
    DegenerateCrop { width: u32, height: u32 },

    #[error("Image has zero width or height")]
    EmptyImage,

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, DetectionError>;
