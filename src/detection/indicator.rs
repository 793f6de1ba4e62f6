use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::contrast::otsu_level;
use imageproc::region_labelling::{Connectivity, connected_components};
use palette::{FromColor, Hsv, Srgb};

use crate::config::{AnalyzerConfig, PipelineConfig};
use crate::detection::preprocessing::{preprocess, scale_abs};
use crate::detection::regions::crop_to;
use crate::error::{DetectionError, Result};
use crate::models::{BoundingBox, LabelMap};

/// Largest hue byte; hue bytes span half a turn in degrees
const MAX_HUE: f64 = 179.0;

/// Line count and the images it was read from
pub struct IndicatorAnalysis {
    /// Centre window of the indicator crop that was analysed
    pub window: BoundingBox,
    /// Dark lines as 255 on a 0 background
    pub binary: GrayImage,
    pub labels: LabelMap,
    /// One hue per component, background black
    pub coloured: RgbImage,
    pub line_count: usize,
}

/// Centre window of an indicator crop that holds the lines.
///
/// Portrait crops (more rows than columns) trim `portrait_fractions` from each
/// side, anything else `landscape_fractions`. Bounds round half to even.
pub fn indicator_window(width: u32, height: u32, config: &AnalyzerConfig) -> Result<BoundingBox> {
    let (row_fraction, col_fraction) = if height > width {
        config.portrait_fractions
    } else {
        config.landscape_fractions
    };

    let (start_row, end_row) = trimmed_span(height, row_fraction);
    let (start_col, end_col) = trimmed_span(width, col_fraction);

    let bbox = BoundingBox {
        x: start_col,
        y: start_row,
        width: end_col.saturating_sub(start_col),
        height: end_row.saturating_sub(start_row),
    };

    if bbox.width == 0 || bbox.height == 0 {
        return Err(DetectionError::DegenerateCrop {
            width: bbox.width,
            height: bbox.height,
        });
    }
    Ok(bbox)
}

fn trimmed_span(extent: u32, fraction: f64) -> (u32, u32) {
    let start = (fraction * extent as f64).round_ties_even() as u32;
    let end = ((1.0 - fraction) * extent as f64).round_ties_even() as u32;
    (start.min(extent), end.min(extent))
}

/// Count the indicator lines in an indicator-window crop
pub fn analyze_indicator(img: &RgbImage, config: &PipelineConfig) -> Result<IndicatorAnalysis> {
    let window = indicator_window(img.width(), img.height(), &config.analyzer)?;
    let cropped = crop_to(img, &window)?;

    let gray = preprocess(&cropped, &config.preprocess)?;
    let flattened = scale_abs(&gray, config.analyzer.contrast_gain, 0.0);
    let binary = otsu_binarize_inv(&flattened);

    let labels = LabelMap::new(connected_components(&binary, Connectivity::Eight, Luma([0u8])));
    let line_count = labels.component_count();
    let coloured = colourize_labels(&labels);

    tracing::debug!(
        window_width = window.width,
        window_height = window.height,
        line_count,
        "Indicator analysed"
    );

    Ok(IndicatorAnalysis {
        window,
        binary,
        labels,
        coloured,
        line_count,
    })
}

/// Otsu split with the darker class as foreground (255)
pub fn otsu_binarize_inv(gray: &GrayImage) -> GrayImage {
    let level = otsu_level(gray);
    let mut out = gray.clone();
    for p in out.pixels_mut() {
        *p = if p[0] <= level { Luma([255]) } else { Luma([0]) };
    }
    out
}

/// Paint each component with a hue proportional to `label / max_label`
pub fn colourize_labels(labels: &LabelMap) -> RgbImage {
    let max_label = labels.max_label();
    let palette: Vec<Rgb<u8>> = (0..=max_label)
        .map(|label| {
            if label == 0 {
                Rgb([0, 0, 0])
            } else {
                let hue = (MAX_HUE * label as f64 / max_label as f64) as u8;
                hue_to_rgb(hue)
            }
        })
        .collect();

    RgbImage::from_fn(labels.width(), labels.height(), |x, y| {
        palette[labels.labels.get_pixel(x, y)[0] as usize]
    })
}

/// Fully saturated, full-value colour for a hue byte (2 degrees per step)
pub fn hue_to_rgb(hue: u8) -> Rgb<u8> {
    let hsv: Hsv = Hsv::new(hue as f32 * 2.0, 1.0, 1.0);
    let rgb: Srgb = Srgb::from_color(hsv);
    let rgb: Srgb<u8> = rgb.into_format();
    Rgb([rgb.red, rgb.green, rgb.blue])
}
