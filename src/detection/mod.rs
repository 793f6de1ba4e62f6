pub mod classify;
pub mod contours;
pub mod indicator;
pub mod morphology;
pub mod preprocessing;
pub mod regions;
pub mod steps;

pub use classify::classify;
pub use indicator::{IndicatorAnalysis, analyze_indicator, indicator_window};
pub use morphology::close;
pub use preprocessing::preprocess;
pub use regions::{
    IndicatorRegion, RegionSelection, TestRegion, extract_indicator_region, extract_test_region,
    select_region,
};

use image::RgbImage;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::models::Classification;

/// Run the four stages directly, without the step machinery.
///
/// Returns the line count and the verdict.
pub fn classify_image(
    img: &RgbImage,
    config: &PipelineConfig,
) -> Result<(usize, Classification)> {
    config.validate()?;
    let test = extract_test_region(img, config)?;
    let window = extract_indicator_region(&test.selection.cropped, config)?;
    let analysis = analyze_indicator(&window.selection.cropped, config)?;
    Ok((analysis.line_count, classify(analysis.line_count)))
}
