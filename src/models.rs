use image::{ImageBuffer, Luma};
use imageproc::point::Point;
use std::collections::BTreeSet;
use std::fmt;

/// Axis-aligned box in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Width-to-height ratio
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x + self.width <= width
            && self.y + self.height <= height
    }
}

/// Closed boundary traced in a binary image
#[derive(Debug, Clone)]
pub struct Contour {
    pub points: Vec<Point<i32>>,
}

impl Contour {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        Self { points }
    }

    /// Polygon area enclosed by the boundary points (shoelace formula)
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }

        let mut twice_area: i64 = 0;
        for i in 0..n {
            let p = self.points[i];
            let q = self.points[(i + 1) % n];
            twice_area += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
        }
        (twice_area as f64 / 2.0).abs()
    }

    /// Smallest upright box containing every point, inclusive of the last pixel
    pub fn bounding_box(&self) -> BoundingBox {
        let mut min_x = i32::MAX;
        let mut min_y = i32::MAX;
        let mut max_x = i32::MIN;
        let mut max_y = i32::MIN;

        for p in &self.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        if self.points.is_empty() {
            return BoundingBox {
                x: 0,
                y: 0,
                width: 0,
                height: 0,
            };
        }

        BoundingBox {
            x: min_x.max(0) as u32,
            y: min_y.max(0) as u32,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
        }
    }
}

/// Per-pixel component ids; 0 is background
pub struct LabelMap {
    pub labels: ImageBuffer<Luma<u32>, Vec<u32>>,
}

impl LabelMap {
    pub fn new(labels: ImageBuffer<Luma<u32>, Vec<u32>>) -> Self {
        Self { labels }
    }

    pub fn width(&self) -> u32 {
        self.labels.width()
    }

    pub fn height(&self) -> u32 {
        self.labels.height()
    }

    /// Number of distinct non-background ids
    pub fn component_count(&self) -> usize {
        self.labels
            .pixels()
            .map(|p| p[0])
            .filter(|&label| label != 0)
            .collect::<BTreeSet<u32>>()
            .len()
    }

    pub fn max_label(&self) -> u32 {
        self.labels.pixels().map(|p| p[0]).max().unwrap_or(0)
    }
}

/// Three-way verdict read from the indicator lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Positive,
    Negative,
    Invalid,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Positive => "Positive",
            Classification::Negative => "Negative",
            Classification::Invalid => "Invalid",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
