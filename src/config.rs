use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{DetectionError, Result};

/// Grayscale conversion, linear rescale and Gaussian smoothing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Side of the square Gaussian kernel (odd)
    pub kernel_size: u32,
    pub gain: f32,
    pub offset: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            kernel_size: 7,
            gain: 1.0,
            offset: 0.0,
        }
    }
}

/// Largest element side whose radius fits the morphology primitives
pub const MAX_MORPHOLOGY_KERNEL: u32 = 2 * u8::MAX as u32 + 1;

/// Structuring element for the dilate/erode closing passes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MorphologyConfig {
    /// Side of the square rectangular element (odd)
    pub kernel_size: u32,
}

impl Default for MorphologyConfig {
    fn default() -> Self {
        Self { kernel_size: 5 }
    }
}

impl MorphologyConfig {
    /// Chebyshev radius equivalent to the square element.
    /// Only meaningful for a validated config.
    pub fn radius(&self) -> u8 {
        (self.kernel_size / 2).min(u8::MAX as u32) as u8
    }
}

/// Locating the test strip in the full photo
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestRegionConfig {
    pub canny_low: f32,
    pub canny_high: f32,
    pub closing_steps: usize,
    /// Closing steps used when either side is below `small_image_size`
    pub small_closing_steps: usize,
    pub small_image_size: u32,
    pub target_ratio: f64,
    pub max_area_fraction: f64,
    /// Outline every candidate contour on the annotated image
    pub draw_all_contours: bool,
}

impl Default for TestRegionConfig {
    fn default() -> Self {
        Self {
            canny_low: 30.0,
            canny_high: 70.0,
            closing_steps: 7,
            small_closing_steps: 1,
            small_image_size: 300,
            target_ratio: 2.0,
            max_area_fraction: 1.0,
            draw_all_contours: false,
        }
    }
}

/// Locating the indicator window inside the test strip
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorRegionConfig {
    pub block_size: u32,
    /// Block size when the strip has fewer rows than `small_region_size`
    pub short_rows_block_size: u32,
    /// Block size when the strip has fewer columns than `small_region_size`.
    /// Checked after the row guard, so it wins when both apply.
    pub narrow_cols_block_size: u32,
    pub threshold_offset: f32,
    pub closing_steps: usize,
    pub small_region_size: u32,
    pub target_ratio: f64,
    pub max_area_fraction: f64,
    pub draw_all_contours: bool,
}

impl Default for IndicatorRegionConfig {
    fn default() -> Self {
        Self {
            block_size: 7,
            short_rows_block_size: 5,
            narrow_cols_block_size: 3,
            threshold_offset: 2.0,
            closing_steps: 1,
            small_region_size: 60,
            target_ratio: 3.0,
            max_area_fraction: 0.2,
            draw_all_contours: false,
        }
    }
}

/// Counting lines in the indicator window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// (rows, cols) fraction trimmed from each side when rows > cols
    pub portrait_fractions: (f64, f64),
    /// (rows, cols) fraction trimmed from each side otherwise
    pub landscape_fractions: (f64, f64),
    pub contrast_gain: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            portrait_fractions: (0.25, 0.4),
            landscape_fractions: (0.4, 0.25),
            contrast_gain: 0.1,
        }
    }
}

/// Full set of tunables for one pipeline run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub preprocess: PreprocessConfig,
    pub morphology: MorphologyConfig,
    pub test_region: TestRegionConfig,
    pub indicator_region: IndicatorRegionConfig,
    pub analyzer: AnalyzerConfig,
}

impl PipelineConfig {
    /// Load a (possibly partial) JSON config; missing fields keep their defaults
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
        let config: PipelineConfig = serde_json::from_str(&text)
            .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_odd_kernel("preprocess.kernel_size", self.preprocess.kernel_size)?;
        check_odd_kernel("morphology.kernel_size", self.morphology.kernel_size)?;
        if self.morphology.kernel_size > MAX_MORPHOLOGY_KERNEL {
            return Err(invalid(format!(
                "morphology.kernel_size must be at most {MAX_MORPHOLOGY_KERNEL}, got {}",
                self.morphology.kernel_size
            )));
        }

        let ir = &self.indicator_region;
        for (name, size) in [
            ("indicator_region.block_size", ir.block_size),
            ("indicator_region.short_rows_block_size", ir.short_rows_block_size),
            ("indicator_region.narrow_cols_block_size", ir.narrow_cols_block_size),
        ] {
            if size < 3 || size % 2 == 0 {
                return Err(invalid(format!("{name} must be odd and >= 3, got {size}")));
            }
        }

        for (name, ratio) in [
            ("test_region.target_ratio", self.test_region.target_ratio),
            ("indicator_region.target_ratio", ir.target_ratio),
        ] {
            if !(ratio > 0.0) {
                return Err(invalid(format!("{name} must be positive, got {ratio}")));
            }
        }

        for (name, fraction) in [
            ("test_region.max_area_fraction", self.test_region.max_area_fraction),
            ("indicator_region.max_area_fraction", ir.max_area_fraction),
        ] {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(invalid(format!("{name} must be in (0, 1], got {fraction}")));
            }
        }

        let an = &self.analyzer;
        for (name, (rows, cols)) in [
            ("analyzer.portrait_fractions", an.portrait_fractions),
            ("analyzer.landscape_fractions", an.landscape_fractions),
        ] {
            if !(0.0..0.5).contains(&rows) || !(0.0..0.5).contains(&cols) {
                return Err(invalid(format!(
                    "{name} must lie in [0, 0.5), got ({rows}, {cols})"
                )));
            }
        }

        if self.test_region.canny_low > self.test_region.canny_high {
            return Err(invalid("test_region.canny_low exceeds canny_high".to_string()));
        }

        Ok(())
    }
}

fn check_odd_kernel(name: &str, size: u32) -> Result<()> {
    if size == 0 || size % 2 == 0 {
        return Err(invalid(format!("{name} must be odd, got {size}")));
    }
    Ok(())
}

fn invalid(message: String) -> DetectionError {
    DetectionError::InvalidConfig(message)
}
