use crate::detection::{classify, indicator, regions};
use crate::pipeline::{PipelineContext, PipelineData, PipelineStep};
use anyhow::Result;
use image::DynamicImage;

/// Locate the test strip in the full photo and crop to it
pub struct TestRegionStep;

impl PipelineStep for TestRegionStep {
    fn process(&self, data: PipelineData, context: &PipelineContext) -> Result<PipelineData> {
        let region = regions::extract_test_region(&data.image, &context.config)?;
        let selection = region.selection;

        let mut new_data = data.with_region(selection.cropped.clone(), selection.bbox);
        new_data.push_diagnostic(context, "edges", "Canny edge detection of image", || {
            DynamicImage::ImageLuma8(region.edges)
        });
        new_data.push_diagnostic(context, "closing", "Morphological closing of image", || {
            DynamicImage::ImageLuma8(region.closed)
        });
        new_data.push_diagnostic(context, "bounding_box", "Bounding box for test", || {
            DynamicImage::ImageRgb8(selection.annotated)
        });
        new_data.push_diagnostic(context, "crop", "Extracted region of test", || {
            DynamicImage::ImageRgb8(selection.cropped)
        });
        Ok(new_data)
    }

    fn name(&self) -> &str {
        "Test Region"
    }
}

/// Locate the indicator window inside the strip crop
pub struct IndicatorRegionStep;

impl PipelineStep for IndicatorRegionStep {
    fn process(&self, data: PipelineData, context: &PipelineContext) -> Result<PipelineData> {
        let region = regions::extract_indicator_region(&data.image, &context.config)?;
        let selection = region.selection;

        let mut new_data = data.with_region(selection.cropped.clone(), selection.bbox);
        new_data.push_diagnostic(
            context,
            "closing",
            "Morphological closing of test region",
            || DynamicImage::ImageLuma8(region.closed),
        );
        new_data.push_diagnostic(context, "bounding_box", "Bounding box for indicator", || {
            DynamicImage::ImageRgb8(selection.annotated)
        });
        new_data.push_diagnostic(context, "crop", "Extracted region of indicator", || {
            DynamicImage::ImageRgb8(selection.cropped)
        });
        Ok(new_data)
    }

    fn name(&self) -> &str {
        "Indicator Region"
    }
}

/// Count connected line components in the indicator window
pub struct IndicatorAnalysisStep;

impl PipelineStep for IndicatorAnalysisStep {
    fn process(&self, data: PipelineData, context: &PipelineContext) -> Result<PipelineData> {
        let analysis = indicator::analyze_indicator(&data.image, &context.config)?;

        let mut new_data = data.with_region(analysis.coloured.clone(), analysis.window);
        new_data.line_count = Some(analysis.line_count);
        new_data.push_diagnostic(context, "lines", "Extracted lines using CCA", || {
            DynamicImage::ImageRgb8(analysis.coloured)
        });
        Ok(new_data)
    }

    fn name(&self) -> &str {
        "Indicator Analysis"
    }
}

/// Turn the line count into a verdict
pub struct ClassificationStep;

impl PipelineStep for ClassificationStep {
    fn process(&self, data: PipelineData, _context: &PipelineContext) -> Result<PipelineData> {
        let line_count = data
            .line_count
            .ok_or_else(|| anyhow::anyhow!("No line count to classify"))?;

        let mut new_data = data;
        new_data.classification = Some(classify::classify(line_count));
        Ok(new_data)
    }

    fn name(&self) -> &str {
        "Classification"
    }
}
