use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::morphology::{dilate_mut, erode_mut};

use crate::config::MorphologyConfig;

/// Fill gaps in a binary image.
///
/// Runs every dilation pass before the first erosion pass, which is not the
/// same as `steps` interleaved closings.
pub fn close(binary: &GrayImage, steps: usize, config: &MorphologyConfig) -> GrayImage {
    let mut out = binary.clone();
    if steps == 0 {
        return out;
    }

    let radius = config.radius();
    for _ in 0..steps {
        dilate_mut(&mut out, Norm::LInf, radius);
    }
    for _ in 0..steps {
        erode_mut(&mut out, Norm::LInf, radius);
    }
    out
}
