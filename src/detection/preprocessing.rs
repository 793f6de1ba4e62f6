use image::{GrayImage, Luma, RgbImage};
use imageproc::filter::separable_filter_equal;

use crate::config::PreprocessConfig;
use crate::error::{DetectionError, Result};

/// Grayscale, linear rescale, then Gaussian smoothing
pub fn preprocess(img: &RgbImage, config: &PreprocessConfig) -> Result<GrayImage> {
    if img.width() == 0 || img.height() == 0 {
        return Err(DetectionError::EmptyImage);
    }

    let gray = to_grayscale(img);
    let scaled = scale_abs(&gray, config.gain, config.offset);
    Ok(gaussian_blur(&scaled, config.kernel_size))
}

/// Convert a colour image to grayscale with BT.601 luma weights
pub fn to_grayscale(img: &RgbImage) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let [r, g, b] = img.get_pixel(x, y).0;
        let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        Luma([luma.round().clamp(0.0, 255.0) as u8])
    })
}

/// `|gain * p + offset|`, rounded and saturated to 8 bits
pub fn scale_abs(img: &GrayImage, gain: f32, offset: f32) -> GrayImage {
    if gain == 1.0 && offset == 0.0 {
        return img.clone();
    }

    let mut out = img.clone();
    for p in out.pixels_mut() {
        let v = (gain * p[0] as f32 + offset).abs().round();
        *p = Luma([v.min(255.0) as u8]);
    }
    out
}

/// Sigma derived from the kernel size when none is given
pub fn kernel_sigma(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalised 1-D Gaussian weights of length `kernel_size`
pub fn gaussian_kernel(kernel_size: u32) -> Vec<f32> {
    let sigma = kernel_sigma(kernel_size);
    let center = (kernel_size as f32 - 1.0) / 2.0;

    let mut weights: Vec<f32> = (0..kernel_size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();

    let sum: f32 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

/// Separable Gaussian blur with a square odd kernel
pub fn gaussian_blur(img: &GrayImage, kernel_size: u32) -> GrayImage {
    if kernel_size <= 1 {
        return img.clone();
    }
    let kernel = gaussian_kernel(kernel_size);
    separable_filter_equal(img, &kernel)
}
