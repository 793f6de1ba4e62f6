use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::edges::canny;
use imageproc::integral_image::{integral_image, sum_image_pixels};
use imageproc::rect::Rect;

use crate::config::{IndicatorRegionConfig, PipelineConfig};
use crate::detection::contours::{Approximation, Retrieval, find_region_contours};
use crate::detection::morphology::close;
use crate::detection::preprocessing::preprocess;
use crate::error::{DetectionError, Result};
use crate::models::{BoundingBox, Contour};

/// Widest width/height ratio accepted for any region
const MAX_REGION_RATIO: f64 = 5.0;

const BOX_COLOUR: Rgb<u8> = Rgb([255, 0, 0]);
const CONTOUR_COLOUR: Rgb<u8> = Rgb([0, 255, 0]);

/// Outcome of picking one contour and cropping to it
#[derive(Debug, Clone)]
pub struct RegionSelection {
    pub bbox: BoundingBox,
    /// Input with the chosen box (and optionally every contour) drawn on it
    pub annotated: RgbImage,
    pub cropped: RgbImage,
}

/// Test-strip region of a full photo, with its intermediate images
#[derive(Debug, Clone)]
pub struct TestRegion {
    pub edges: GrayImage,
    pub closed: GrayImage,
    pub selection: RegionSelection,
}

/// Indicator window of a test-strip crop, with its intermediate images
#[derive(Debug, Clone)]
pub struct IndicatorRegion {
    pub closed: GrayImage,
    pub selection: RegionSelection,
}

/// Closing steps for the test-strip search; small photos get a lighter pass
pub fn test_closing_steps(width: u32, height: u32, config: &PipelineConfig) -> usize {
    let tc = &config.test_region;
    if height < tc.small_image_size || width < tc.small_image_size {
        tc.small_closing_steps
    } else {
        tc.closing_steps
    }
}

/// Find the test strip in a colour photo
pub fn extract_test_region(img: &RgbImage, config: &PipelineConfig) -> Result<TestRegion> {
    let tc = &config.test_region;
    let gray = preprocess(img, &config.preprocess)?;
    let edges = canny(&gray, tc.canny_low, tc.canny_high);

    let steps = test_closing_steps(img.width(), img.height(), config);
    let closed = close(&edges, steps, &config.morphology);

    let contours = find_region_contours(&closed, Retrieval::External, Approximation::Simple);
    tracing::debug!(
        contours = contours.len(),
        closing_steps = steps,
        "Test region candidates"
    );

    let selection = select_region(
        img,
        &contours,
        tc.target_ratio,
        tc.max_area_fraction,
        tc.draw_all_contours,
    )
    .map_err(|e| in_stage(e, "locating the test strip"))?;

    Ok(TestRegion {
        edges,
        closed,
        selection,
    })
}

/// Block size and closing steps for the indicator search, shrunk for thin strips
pub fn indicator_parameters(
    width: u32,
    height: u32,
    config: &IndicatorRegionConfig,
) -> (u32, usize) {
    let mut block_size = config.block_size;
    let mut closing_steps = config.closing_steps;

    if height < config.small_region_size {
        block_size = config.short_rows_block_size;
        closing_steps = 0;
    }
    if width < config.small_region_size {
        block_size = config.narrow_cols_block_size;
        closing_steps = 0;
    }

    (block_size, closing_steps)
}

/// Find the indicator window in a test-strip crop
pub fn extract_indicator_region(
    img: &RgbImage,
    config: &PipelineConfig,
) -> Result<IndicatorRegion> {
    let ic = &config.indicator_region;
    let gray = preprocess(img, &config.preprocess)?;

    let (block_size, steps) = indicator_parameters(img.width(), img.height(), ic);
    let binary = adaptive_mean_threshold_inv(&gray, block_size, ic.threshold_offset);
    let closed = close(&binary, steps, &config.morphology);

    let contours = find_region_contours(&closed, Retrieval::Tree, Approximation::None);
    tracing::debug!(
        contours = contours.len(),
        block_size,
        closing_steps = steps,
        "Indicator region candidates"
    );

    let selection = select_region(
        img,
        &contours,
        ic.target_ratio,
        ic.max_area_fraction,
        ic.draw_all_contours,
    )
    .map_err(|e| in_stage(e, "locating the indicator window"))?;

    Ok(IndicatorRegion { closed, selection })
}

/// Pick the region matching the expected shape and crop the image to it.
///
/// `target_ratio` is the expected width/height of a landscape photo; it is
/// inverted when the image is at least as tall as it is wide.
pub fn select_region(
    img: &RgbImage,
    contours: &[Contour],
    target_ratio: f64,
    max_area_fraction: f64,
    draw_all: bool,
) -> Result<RegionSelection> {
    let (cols, rows) = img.dimensions();
    let max_area = max_area_fraction * rows as f64 * cols as f64;

    let ratio = if rows >= cols {
        1.0 / target_ratio
    } else {
        target_ratio
    };

    let chosen = largest_valid_contour(contours, ratio, max_area).ok_or(
        DetectionError::NoRegionFound {
            stage: "selecting a region",
        },
    )?;
    let bbox = chosen.bounding_box();

    let mut annotated = img.clone();
    if draw_all {
        for contour in contours {
            draw_contour(&mut annotated, contour, CONTOUR_COLOUR);
        }
    }
    draw_box(&mut annotated, &bbox, BOX_COLOUR);

    let cropped = crop_to(img, &bbox)?;

    Ok(RegionSelection {
        bbox,
        annotated,
        cropped,
    })
}

/// Largest contour whose box ratio lies strictly inside the band for `ratio`
/// and whose area is at most `max_area`.
///
/// Falls back to the largest contour overall when none qualifies; `None` only
/// for an empty list.
pub fn largest_valid_contour(contours: &[Contour], ratio: f64, max_area: f64) -> Option<&Contour> {
    let mut by_area: Vec<(&Contour, f64)> = contours.iter().map(|c| (c, c.area())).collect();
    by_area.sort_by(|a, b| b.1.total_cmp(&a.1));

    let (min_ratio, max_ratio) = if ratio < 1.0 {
        (1.0 / MAX_REGION_RATIO, ratio)
    } else {
        (ratio, MAX_REGION_RATIO)
    };

    by_area
        .iter()
        .find(|(contour, area)| {
            let r = contour.bounding_box().aspect_ratio();
            min_ratio < r && r < max_ratio && *area <= max_area
        })
        .or_else(|| by_area.first())
        .map(|(contour, _)| *contour)
}

/// Copy out `bbox`, rejecting empty or out-of-bounds boxes
pub fn crop_to(img: &RgbImage, bbox: &BoundingBox) -> Result<RgbImage> {
    if !bbox.fits_within(img.width(), img.height()) {
        return Err(DetectionError::DegenerateCrop {
            width: bbox.width,
            height: bbox.height,
        });
    }
    Ok(image::imageops::crop_imm(img, bbox.x, bbox.y, bbox.width, bbox.height).to_image())
}

/// Mark pixels at least `offset` darker than the mean of their
/// `block_size` x `block_size` neighbourhood (borders replicated).
pub fn adaptive_mean_threshold_inv(gray: &GrayImage, block_size: u32, offset: f32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let radius = block_size / 2;

    let padded = GrayImage::from_fn(width + 2 * radius, height + 2 * radius, |x, y| {
        let sx = (x as i64 - radius as i64).clamp(0, width as i64 - 1) as u32;
        let sy = (y as i64 - radius as i64).clamp(0, height as i64 - 1) as u32;
        *gray.get_pixel(sx, sy)
    });
    // u64 sums: a bright 4200x4100 crop already overflows u32
    let integral: ImageBuffer<Luma<u64>, Vec<u64>> = integral_image::<_, u64>(&padded);
    let window = (block_size * block_size) as f32;

    GrayImage::from_fn(width, height, |x, y| {
        let sum = sum_image_pixels(&integral, x, y, x + 2 * radius, y + 2 * radius)[0];
        let mean = (sum as f32 / window).round();
        let src = gray.get_pixel(x, y)[0] as f32;
        if src <= mean - offset {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

fn draw_box(img: &mut RgbImage, bbox: &BoundingBox, colour: Rgb<u8>) {
    let outer = Rect::at(bbox.x as i32, bbox.y as i32).of_size(bbox.width + 1, bbox.height + 1);
    draw_hollow_rect_mut(img, outer, colour);

    if bbox.width > 1 && bbox.height > 1 {
        let inner =
            Rect::at(bbox.x as i32 + 1, bbox.y as i32 + 1).of_size(bbox.width - 1, bbox.height - 1);
        draw_hollow_rect_mut(img, inner, colour);
    }
}

fn draw_contour(img: &mut RgbImage, contour: &Contour, colour: Rgb<u8>) {
    let n = contour.points.len();
    for i in 0..n {
        let p = contour.points[i];
        let q = contour.points[(i + 1) % n];
        draw_line_segment_mut(
            img,
            (p.x as f32, p.y as f32),
            (q.x as f32, q.y as f32),
            colour,
        );
    }
}

fn in_stage(err: DetectionError, stage: &'static str) -> DetectionError {
    match err {
        DetectionError::NoRegionFound { .. } => DetectionError::NoRegionFound { stage },
        other => other,
    }
}

