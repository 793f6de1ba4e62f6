use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use imageproc::point::Point;

use crate::models::Contour;

/// Which traced borders to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retrieval {
    /// Outer borders that are not nested inside any other border
    External,
    /// Every outer and hole border
    Tree,
}

/// How many boundary points to keep per contour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approximation {
    /// Every traced boundary pixel
    None,
    /// Only the end points of horizontal, vertical and diagonal runs
    Simple,
}

/// Trace borders of the non-zero regions of a binary image
pub fn find_region_contours(
    binary: &GrayImage,
    retrieval: Retrieval,
    approximation: Approximation,
) -> Vec<Contour> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| match retrieval {
            Retrieval::External => c.border_type == BorderType::Outer && c.parent.is_none(),
            Retrieval::Tree => true,
        })
        .map(|c| match approximation {
            Approximation::None => Contour::new(c.points),
            Approximation::Simple => Contour::new(compress_runs(&c.points)),
        })
        .collect()
}

/// Drop points lying in the middle of a straight 8-connected run
pub fn compress_runs(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let step = |a: Point<i32>, b: Point<i32>| (b.x - a.x, b.y - a.y);

    let kept: Vec<Point<i32>> = (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            step(prev, points[i]) != step(points[i], next)
        })
        .map(|i| points[i])
        .collect();

    if kept.is_empty() {
        vec![points[0]]
    } else {
        kept
    }
}
