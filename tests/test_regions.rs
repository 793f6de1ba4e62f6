mod common;

use common::*;
use image::RgbImage;
use ratscan::config::PipelineConfig;
use ratscan::detection::contours::{Approximation, Retrieval, find_region_contours};
use ratscan::detection::regions::{
    adaptive_mean_threshold_inv, extract_test_region, indicator_parameters, largest_valid_contour,
    select_region, test_closing_steps,
};

#[test]
fn test_matching_rectangle_is_selected() {
    let binary = binary_with_rects(200, 100, &[(10, 30, 80, 20)]);
    let contours = find_region_contours(&binary, Retrieval::External, Approximation::Simple);
    assert_eq!(contours.len(), 1);

    let img = RgbImage::new(200, 100);
    let selection = select_region(&img, &contours, 3.0, 1.0, false).unwrap();

    assert_eq!(selection.bbox, bbox(10, 30, 80, 20));
    assert_eq!(selection.cropped.dimensions(), (80, 20));
    assert_eq!(selection.annotated.dimensions(), (200, 100));
}

#[test]
fn test_valid_shape_beats_larger_invalid_one() {
    let binary = binary_with_rects(200, 100, &[(100, 10, 60, 60), (10, 30, 80, 20)]);
    let contours = find_region_contours(&binary, Retrieval::External, Approximation::Simple);
    assert_eq!(contours.len(), 2);

    let img = RgbImage::new(200, 100);
    let selection = select_region(&img, &contours, 3.0, 1.0, false).unwrap();
    assert_eq!(selection.bbox, bbox(10, 30, 80, 20));
}

#[test]
fn test_falls_back_to_largest_when_nothing_fits() {
    // The 4:1 rectangle has the right shape but exceeds the area cap
    let binary = binary_with_rects(200, 100, &[(100, 10, 60, 60), (10, 30, 40, 10)]);
    let contours = find_region_contours(&binary, Retrieval::External, Approximation::Simple);

    let img = RgbImage::new(200, 100);
    let selection = select_region(&img, &contours, 3.0, 0.01, false).unwrap();
    assert_eq!(selection.bbox, bbox(100, 10, 60, 60));
}

#[test]
fn test_portrait_image_inverts_target_ratio() {
    let binary = binary_with_rects(100, 200, &[(30, 40, 20, 80), (10, 150, 40, 40)]);
    let contours = find_region_contours(&binary, Retrieval::External, Approximation::Simple);

    let best = largest_valid_contour(&contours, 1.0 / 3.0, 20_000.0).unwrap();
    assert_eq!(best.bounding_box(), bbox(30, 40, 20, 80));

    let img = RgbImage::new(100, 200);
    let selection = select_region(&img, &contours, 3.0, 1.0, false).unwrap();
    assert_eq!(selection.bbox, bbox(30, 40, 20, 80));
}

#[test]
fn test_empty_contour_list_is_an_error() {
    let img = RgbImage::new(50, 50);
    let err = select_region(&img, &[], 2.0, 1.0, false).unwrap_err();
    assert!(matches!(err, DetectionError::NoRegionFound { .. }));
}

#[test]
fn test_simple_approximation_keeps_corners_only() {
    let binary = binary_with_rects(200, 100, &[(10, 30, 80, 20)]);

    let simple = find_region_contours(&binary, Retrieval::External, Approximation::Simple);
    let full = find_region_contours(&binary, Retrieval::Tree, Approximation::None);

    assert_eq!(simple[0].points.len(), 4);
    assert!(full[0].points.len() > 4);
    assert_eq!(simple[0].area(), 79.0 * 19.0);
    assert_eq!(simple[0].area(), full[0].area());
    assert_eq!(simple[0].bounding_box(), full[0].bounding_box());
}

#[test]
fn test_tree_retrieval_includes_holes() {
    // A hollow frame has an outer and an inner border
    let mut binary = binary_with_rects(100, 100, &[(10, 10, 60, 60)]);
    for y in 20..60 {
        for x in 20..60 {
            binary.put_pixel(x, y, image::Luma([0]));
        }
    }

    let external = find_region_contours(&binary, Retrieval::External, Approximation::None);
    let tree = find_region_contours(&binary, Retrieval::Tree, Approximation::None);
    assert_eq!(external.len(), 1);
    assert_eq!(tree.len(), 2);
}

#[test]
fn test_closing_steps_shrink_for_small_photos() {
    let config = PipelineConfig::default();
    assert_eq!(test_closing_steps(640, 480, &config), 7);
    assert_eq!(test_closing_steps(299, 480, &config), 1);
    assert_eq!(test_closing_steps(640, 200, &config), 1);
}

#[test]
fn test_indicator_parameters_follow_size_guards() {
    let config = PipelineConfig::default().indicator_region;
    assert_eq!(indicator_parameters(200, 100, &config), (7, 1));
    assert_eq!(indicator_parameters(200, 50, &config), (5, 0));
    assert_eq!(indicator_parameters(50, 200, &config), (3, 0));
    // Column guard is checked last and wins
    assert_eq!(indicator_parameters(50, 50, &config), (3, 0));
}

#[test]
fn test_adaptive_threshold_handles_large_bright_images() {
    // Sum of the whole padded image exceeds u32::MAX
    let gray = image::GrayImage::from_pixel(4200, 4100, image::Luma([255]));

    let binary = adaptive_mean_threshold_inv(&gray, 7, 2.0);
    assert_eq!(binary.dimensions(), (4200, 4100));
    assert!(binary.pixels().all(|p| p[0] == 0));
}

#[test]
fn test_draw_all_outlines_every_candidate() {
    let binary = binary_with_rects(200, 100, &[(10, 30, 80, 20), (120, 10, 20, 20)]);
    let contours = find_region_contours(&binary, Retrieval::External, Approximation::Simple);
    assert_eq!(contours.len(), 2);

    let img = RgbImage::new(200, 100);
    let plain = select_region(&img, &contours, 3.0, 1.0, false).unwrap();
    let outlined = select_region(&img, &contours, 3.0, 1.0, true).unwrap();
    assert_eq!(outlined.bbox, plain.bbox);
    assert_eq!(outlined.bbox, bbox(10, 30, 80, 20));

    // The unselected square is outlined in green only when asked
    let green = image::Rgb([0, 255, 0]);
    assert_eq!(*outlined.annotated.get_pixel(120, 10), green);
    assert_eq!(*outlined.annotated.get_pixel(139, 29), green);
    assert_eq!(*plain.annotated.get_pixel(120, 10), image::Rgb([0, 0, 0]));
    assert_eq!(outlined.cropped, plain.cropped);
}

#[test]
fn test_adaptive_threshold_marks_dark_pixels_only() {
    let mut gray = image::GrayImage::from_pixel(30, 30, image::Luma([200]));
    gray.put_pixel(15, 15, image::Luma([100]));

    let binary = adaptive_mean_threshold_inv(&gray, 7, 2.0);
    assert_eq!(binary.get_pixel(15, 15)[0], 255);
    assert_eq!(binary.get_pixel(0, 0)[0], 0);
    assert_eq!(binary.pixels().filter(|p| p[0] == 255).count(), 1);
}

#[test]
fn test_strip_is_found_in_photo() {
    let img = strip_photo(POSITIVE_LINES);
    let region = extract_test_region(&img, &PipelineConfig::default()).unwrap();

    let found = region.selection.bbox;
    let (sx, sy, sw, sh) = STRIP_RECT;
    assert!((found.x as i32 - sx).abs() <= 3, "bbox {:?}", found);
    assert!((found.y as i32 - sy).abs() <= 3, "bbox {:?}", found);
    assert!((found.width as i32 - sw as i32).abs() <= 6, "bbox {:?}", found);
    assert!((found.height as i32 - sh as i32).abs() <= 6, "bbox {:?}", found);
    assert_eq!(region.edges.dimensions(), img.dimensions());
}
