use anyhow::{Context, Result};
use image::{DynamicImage, RgbImage};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::detection::steps::{
    ClassificationStep, IndicatorAnalysisStep, IndicatorRegionStep, TestRegionStep,
};
use crate::error::DetectionError;
use crate::models::{BoundingBox, Classification};
use crate::report;

/// Intermediate image kept for inspection
#[derive(Clone)]
pub struct Diagnostic {
    /// File-name friendly label, e.g. "edges"
    pub label: &'static str,
    /// Panel caption
    pub title: &'static str,
    pub image: DynamicImage,
}

/// Data that flows through the pipeline for one photo
#[derive(Clone)]
pub struct PipelineData {
    /// Image the next step works on (full photo, then strip crop, then window crop)
    pub image: RgbImage,

    /// The decoded photo (shared via Arc)
    pub original: Arc<RgbImage>,

    /// Region of `image` inside the previous step's image (None means full photo)
    pub bbox: Option<BoundingBox>,

    pub line_count: Option<usize>,
    pub classification: Option<Classification>,

    /// Images produced so far, in step order
    pub diagnostics: Vec<Diagnostic>,
}

impl PipelineData {
    /// Create PipelineData for a full photo
    pub fn from_image(image: RgbImage) -> Self {
        let original = Arc::new(image.clone());
        Self {
            image,
            original,
            bbox: None,
            line_count: None,
            classification: None,
            diagnostics: Vec::new(),
        }
    }

    /// Replace the working image with a crop of it
    pub fn with_region(mut self, image: RgbImage, bbox: BoundingBox) -> Self {
        self.image = image;
        self.bbox = Some(bbox);
        self
    }

    /// Record a diagnostic image if the context asks for them
    pub fn push_diagnostic(
        &mut self,
        context: &PipelineContext,
        label: &'static str,
        title: &'static str,
        image: impl FnOnce() -> DynamicImage,
    ) {
        if context.keep_diagnostics() {
            self.diagnostics.push(Diagnostic {
                label,
                title,
                image: image(),
            });
        }
    }
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

/// Context available to all pipeline steps
#[derive(Clone)]
pub struct PipelineContext {
    pub config: Arc<PipelineConfig>,
    /// Keep diagnostic images for the panel report
    pub visualize: bool,
    pub debug: Option<DebugConfig>,
}

impl PipelineContext {
    pub fn keep_diagnostics(&self) -> bool {
        self.visualize || self.debug.is_some()
    }
}

/// Trait that all pipeline steps must implement
pub trait PipelineStep: Send + Sync {
    /// Transform the data of one photo
    fn process(&self, data: PipelineData, context: &PipelineContext) -> Result<PipelineData>;

    /// Human-readable name for this step (used in logs and debug directories)
    fn name(&self) -> &str;
}

/// Final state of one photo after every step ran
pub struct PipelineOutcome {
    pub line_count: usize,
    pub classification: Classification,
    /// Colourised component labels, the written artifact
    pub labels_image: RgbImage,
    pub diagnostics: Vec<Diagnostic>,
}

/// Composable pipeline builder
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
    context: PipelineContext,
}

impl Pipeline {
    /// Create a new empty pipeline
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            context: PipelineContext {
                config: Arc::new(PipelineConfig::default()),
                visualize: false,
                debug: None,
            },
        }
    }

    /// The four stages from photo to verdict
    pub fn standard(config: PipelineConfig) -> Result<Self> {
        Ok(Pipeline::new()
            .with_config(config)?
            .add_step(Arc::new(TestRegionStep))
            .add_step(Arc::new(IndicatorRegionStep))
            .add_step(Arc::new(IndicatorAnalysisStep))
            .add_step(Arc::new(ClassificationStep)))
    }

    /// Replace the tunables, rejecting an invalid set
    pub fn with_config(mut self, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        self.context.config = Arc::new(config);
        Ok(self)
    }

    /// Keep every step's diagnostic images in the outcome
    pub fn with_visualize(mut self, visualize: bool) -> Self {
        self.context.visualize = visualize;
        self
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.context.debug = Some(DebugConfig { output_dir });
        Ok(self)
    }

    /// Add a processing step to the pipeline
    pub fn add_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Run every step on one photo. `name` only labels debug output.
    pub fn run(&self, input: &DynamicImage, name: &str) -> Result<PipelineOutcome> {
        let mut data = PipelineData::from_image(input.to_rgb8());

        if let Some(debug_config) = &self.context.debug {
            let input_dir = debug_config.output_dir.join(name).join("00_input");
            std::fs::create_dir_all(&input_dir)?;
            data.image
                .save(input_dir.join("input.png"))
                .map_err(|e| anyhow::anyhow!("Failed to save debug input: {}", e))?;
        }

        for (step_idx, step) in self.steps.iter().enumerate() {
            let started = Instant::now();
            let already_saved = data.diagnostics.len();

            data = step
                .process(data, &self.context)
                .with_context(|| format!("{} failed", step.name()))?;

            tracing::debug!(
                step = step.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Step finished"
            );

            if let Some(debug_config) = &self.context.debug {
                save_debug_output(
                    debug_config,
                    name,
                    step_idx,
                    step.name(),
                    &data.diagnostics[already_saved..],
                )?;
            }
        }

        let line_count = data
            .line_count
            .ok_or_else(|| anyhow::anyhow!("Pipeline finished without counting lines"))?;
        let classification = data
            .classification
            .ok_or_else(|| anyhow::anyhow!("Pipeline finished without a classification"))?;

        Ok(PipelineOutcome {
            line_count,
            classification,
            labels_image: data.image,
            diagnostics: data.diagnostics,
        })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn save_debug_output(
    debug_config: &DebugConfig,
    name: &str,
    step_idx: usize,
    step_name: &str,
    diagnostics: &[Diagnostic],
) -> Result<()> {
    if diagnostics.is_empty() {
        return Ok(());
    }

    let step_dir_name = format!(
        "{:02}_{}",
        step_idx + 1,
        step_name.to_lowercase().replace(' ', "_")
    );
    let step_dir = debug_config.output_dir.join(name).join(&step_dir_name);
    std::fs::create_dir_all(&step_dir)?;

    for diagnostic in diagnostics {
        let output_path = step_dir.join(format!("{}.png", diagnostic.label));
        diagnostic
            .image
            .save(&output_path)
            .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;
    }

    tracing::debug!(dir = %step_dir.display(), count = diagnostics.len(), "Saved debug images");
    Ok(())
}

/// Result of one photo that made it through the pipeline
pub struct ImageRecord {
    pub outcome: PipelineOutcome,
    /// Where the label image was written
    pub artifact: PathBuf,
}

/// One entry of a batch, successful or not
pub struct BatchItem {
    /// 1-based position in the batch
    pub index: usize,
    pub input: PathBuf,
    pub result: Result<ImageRecord>,
}

/// Runs the pipeline over many photos, one independent run per worker
pub struct BatchExecutor {
    pipeline: Pipeline,
    output_dir: PathBuf,
}

impl BatchExecutor {
    pub fn new(pipeline: Pipeline, output_dir: PathBuf) -> Self {
        Self {
            pipeline,
            output_dir,
        }
    }

    /// Process every input; a failing photo never stops the others.
    /// Output order follows input order.
    pub fn execute(&self, inputs: &[PathBuf]) -> Result<Vec<BatchItem>> {
        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!(
                "Failed to create output directory {}",
                self.output_dir.display()
            )
        })?;

        for (stem, paths) in report::shared_stems(inputs) {
            tracing::warn!(
                stem = %stem,
                count = paths.len(),
                "Inputs share a file stem, their outputs will overwrite each other"
            );
        }

        let items: Vec<BatchItem> = inputs
            .par_iter()
            .enumerate()
            .map(|(i, input)| {
                let result = self.process_file(input);
                if let Err(e) = &result {
                    tracing::warn!(file = %input.display(), "Processing failed: {e:#}");
                }
                BatchItem {
                    index: i + 1,
                    input: input.clone(),
                    result,
                }
            })
            .collect();

        Ok(items)
    }

    /// Decode, classify and write the artifact for a single photo
    pub fn process_file(&self, input: &Path) -> Result<ImageRecord> {
        let img = load_image(input)?;
        let name = report::file_stem(input);

        let outcome = self
            .pipeline
            .run(&img, &name)
            .with_context(|| format!("Failed to process {}", input.display()))?;

        let artifact = report::artifact_path(&self.output_dir, input);
        report::write_artifact(&outcome.labels_image, &artifact)?;

        tracing::info!(
            file = %input.display(),
            lines = outcome.line_count,
            result = %outcome.classification,
            "Classified"
        );

        Ok(ImageRecord { outcome, artifact })
    }
}

/// Decode a photo from disk
pub fn load_image(path: &Path) -> std::result::Result<DynamicImage, DetectionError> {
    image::ImageReader::open(path)
        .map_err(|e| DetectionError::Decode {
            path: path.to_path_buf(),
            source: image::ImageError::IoError(e),
        })?
        .with_guessed_format()
        .map_err(|e| DetectionError::Decode {
            path: path.to_path_buf(),
            source: image::ImageError::IoError(e),
        })?
        .decode()
        .map_err(|source| DetectionError::Decode {
            path: path.to_path_buf(),
            source,
        })
}
