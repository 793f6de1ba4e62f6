mod common;

use common::*;
use image::{ImageBuffer, Luma, Rgb};
use ratscan::config::{AnalyzerConfig, PipelineConfig};
use ratscan::detection::indicator::{
    analyze_indicator, colourize_labels, hue_to_rgb, indicator_window,
};
use ratscan::LabelMap;

#[test]
fn test_window_fractions_swap_with_orientation() {
    let config = AnalyzerConfig::default();

    let portrait = indicator_window(40, 100, &config).unwrap();
    assert_eq!(portrait, bbox(16, 25, 8, 50));

    let landscape = indicator_window(100, 40, &config).unwrap();
    assert_eq!(landscape, bbox(25, 16, 50, 8));
}

#[test]
fn test_square_window_uses_landscape_fractions() {
    let config = AnalyzerConfig::default();
    let square = indicator_window(100, 100, &config).unwrap();
    assert_eq!(square, bbox(25, 40, 50, 20));
}

#[test]
fn test_window_bounds_round_half_to_even() {
    let config = AnalyzerConfig::default();
    // 0.25 * 30 = 7.5 -> 8 and 0.75 * 30 = 22.5 -> 22
    let window = indicator_window(30, 10, &config).unwrap();
    assert_eq!(window, bbox(8, 4, 14, 2));
}

#[test]
fn test_tiny_window_is_degenerate() {
    let config = AnalyzerConfig::default();
    let err = indicator_window(2, 2, &config).unwrap_err();
    assert!(matches!(err, DetectionError::DegenerateCrop { .. }));
}

#[test]
fn test_two_lines_are_counted() {
    let img = indicator_window_image(POSITIVE_LINES);
    let analysis = analyze_indicator(&img, &PipelineConfig::default()).unwrap();

    assert_eq!(analysis.line_count, 2);
    assert_eq!(analysis.labels.component_count(), 2);
    assert_eq!(analysis.coloured.dimensions(), analysis.binary.dimensions());
}

#[test]
fn test_single_line_is_counted() {
    let img = indicator_window_image(NEGATIVE_LINES);
    let analysis = analyze_indicator(&img, &PipelineConfig::default()).unwrap();
    assert_eq!(analysis.line_count, 1);
}

#[test]
fn test_background_is_black_and_labels_are_coloured() {
    let mut labels = ImageBuffer::<Luma<u32>, Vec<u32>>::new(3, 1);
    labels.put_pixel(1, 0, Luma([1]));
    labels.put_pixel(2, 0, Luma([2]));
    let labels = LabelMap::new(labels);

    let coloured = colourize_labels(&labels);
    assert_eq!(*coloured.get_pixel(0, 0), Rgb([0, 0, 0]));
    assert_ne!(*coloured.get_pixel(1, 0), Rgb([0, 0, 0]));
    assert_ne!(*coloured.get_pixel(2, 0), Rgb([0, 0, 0]));
    assert_ne!(coloured.get_pixel(1, 0), coloured.get_pixel(2, 0));
}

#[test]
fn test_no_labels_render_black() {
    let labels = LabelMap::new(ImageBuffer::<Luma<u32>, Vec<u32>>::new(4, 4));
    assert_eq!(labels.component_count(), 0);
    let coloured = colourize_labels(&labels);
    assert!(coloured.pixels().all(|p| *p == Rgb([0, 0, 0])));
}

#[test]
fn test_hue_bytes_cover_half_turn() {
    assert_eq!(hue_to_rgb(0), Rgb([255, 0, 0]));
    assert_eq!(hue_to_rgb(60), Rgb([0, 255, 0]));
    assert_eq!(hue_to_rgb(120), Rgb([0, 0, 255]));
}
