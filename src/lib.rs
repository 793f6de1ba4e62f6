pub mod config;
pub mod detection;
pub mod error;
pub mod inputs;
pub mod models;
pub mod pipeline;
pub mod report;

pub use config::PipelineConfig;
pub use detection::{classify, classify_image};
pub use error::DetectionError;
pub use models::{BoundingBox, Classification, Contour, LabelMap};
pub use pipeline::{
    BatchExecutor, BatchItem, DebugConfig, Diagnostic, ImageRecord, Pipeline, PipelineContext,
    PipelineData, PipelineOutcome, PipelineStep,
};
