use image::{GrayImage, Luma, Rgb, RgbImage};
use ratscan::BoundingBox;
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};

pub const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
pub const STRIP: Rgb<u8> = Rgb([180, 180, 180]);
pub const WINDOW: Rgb<u8> = Rgb([240, 240, 240]);
pub const LINE: Rgb<u8> = Rgb([60, 60, 60]);

/// Where the strip sits in `strip_photo`
pub const STRIP_RECT: (i32, i32, u32, u32) = (80, 100, 440, 200);
/// Where the window sits inside the strip
pub const WINDOW_RECT: (i32, i32, u32, u32) = (145, 80, 150, 40);

/// Line x offsets inside the window
pub const POSITIVE_LINES: &[i32] = &[60, 90];
pub const NEGATIVE_LINES: &[i32] = &[75];

/// 600x400 photo: grey strip on white, light indicator window, dark lines
pub fn strip_photo(lines: &[i32]) -> RgbImage {
    let mut img = RgbImage::from_pixel(600, 400, BACKGROUND);

    let (sx, sy, sw, sh) = STRIP_RECT;
    draw_filled_rect_mut(&mut img, Rect::at(sx, sy).of_size(sw, sh), STRIP);

    let (wx, wy, ww, wh) = WINDOW_RECT;
    let (wx, wy) = (sx + wx, sy + wy);
    draw_filled_rect_mut(&mut img, Rect::at(wx, wy).of_size(ww, wh), WINDOW);

    for &lx in lines {
        draw_filled_rect_mut(&mut img, Rect::at(wx + lx, wy + 10).of_size(4, 20), LINE);
    }

    img
}

/// Bare indicator window (150x40) with vertical dark lines at `lines`
pub fn indicator_window_image(lines: &[i32]) -> RgbImage {
    let mut img = RgbImage::from_pixel(150, 40, WINDOW);
    for &lx in lines {
        draw_filled_rect_mut(&mut img, Rect::at(lx, 0).of_size(4, 40), LINE);
    }
    img
}

/// Single-colour photo
pub fn blank_photo(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, BACKGROUND)
}

/// Binary image with filled white rectangles (x, y, w, h)
pub fn binary_with_rects(width: u32, height: u32, rects: &[(i32, i32, u32, u32)]) -> GrayImage {
    let mut img = GrayImage::new(width, height);
    for &(x, y, w, h) in rects {
        draw_filled_rect_mut(&mut img, Rect::at(x, y).of_size(w, h), Luma([255u8]));
    }
    img
}

/// Save `img` as PNG under `dir`
pub fn save_png(img: &RgbImage, dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    img.save_with_format(&path, image::ImageFormat::Png)
        .expect("Failed to save test image");
    path
}

/// Shorthand for expected boxes
pub fn bbox(x: u32, y: u32, width: u32, height: u32) -> BoundingBox {
    BoundingBox {
        x,
        y,
        width,
        height,
    }
}
