use ab_glyph::{FontRef, PxScale};
use anyhow::Context;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{DetectionError, Result};
use crate::models::Classification;
use crate::pipeline::{BatchItem, Diagnostic};

/// Size of one cell of the panel montage
const PANEL_CELL: (u32, u32) = (320, 240);
const PANEL_COLUMNS: u32 = 4;
const PANEL_GAP: u32 = 8;
/// Band above the grid holding the verdict
const HEADLINE_HEIGHT: u32 = 44;
/// Band above each cell holding its caption
const CAPTION_HEIGHT: u32 = 22;
const PANEL_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const TEXT_COLOUR: Rgb<u8> = Rgb([0, 0, 0]);

const PANEL_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// File name without extension, used to name every output of a photo
pub fn file_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string())
}

/// `<output_dir>/<stem>_output.png`
pub fn artifact_path(output_dir: &Path, input: &Path) -> PathBuf {
    output_dir.join(format!("{}_output.png", file_stem(input)))
}

/// `<output_dir>/<stem>_panels.png`
pub fn panels_path(output_dir: &Path, input: &Path) -> PathBuf {
    output_dir.join(format!("{}_panels.png", file_stem(input)))
}

/// File stems shared by more than one input, with the inputs that share them.
/// Their outputs would overwrite each other.
pub fn shared_stems(inputs: &[PathBuf]) -> BTreeMap<String, Vec<PathBuf>> {
    let mut by_stem: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for input in inputs {
        by_stem.entry(file_stem(input)).or_default().push(input.clone());
    }
    by_stem.retain(|_, paths| paths.len() > 1);
    by_stem
}

/// Write an image as PNG, creating the parent directory if needed
pub fn write_artifact(image: &RgbImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| DetectionError::Write {
            path: path.to_path_buf(),
            source: image::ImageError::IoError(e),
        })?;
    }

    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|source| DetectionError::Write {
            path: path.to_path_buf(),
            source,
        })
}

/// Console line for one batch entry; the index prefix only appears for
/// batches of more than one photo.
pub fn console_line(item: &BatchItem, batch_size: usize) -> String {
    let body = match &item.result {
        Ok(record) => format!("Result: {}", record.outcome.classification),
        Err(e) => format!("Error: {e:#}"),
    };

    if batch_size > 1 {
        let name = item
            .input
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("[{}/{}] {}: {}", item.index, batch_size, name, body)
    } else {
        body
    }
}

/// Print every entry, then render panels for the successful ones if asked.
/// Returns the number of failed photos.
pub fn report_batch(items: &[BatchItem], output_dir: &Path, visualize: bool) -> usize {
    let batch_size = items.len();
    let mut failures = 0;

    for item in items {
        println!("{}", console_line(item, batch_size));
        if item.result.is_err() {
            failures += 1;
        }
    }

    if visualize {
        for item in items {
            let Ok(record) = &item.result else { continue };
            if record.outcome.diagnostics.is_empty() {
                continue;
            }

            let outcome = &record.outcome;
            let path = panels_path(output_dir, &item.input);
            let written = render_panels(&outcome.diagnostics, outcome.classification)
                .and_then(|panels| Ok(write_artifact(&panels, &path)?));
            match written {
                Ok(()) => println!("Panels: {}", path.display()),
                Err(e) => tracing::warn!("Failed to write panels: {e:#}"),
            }
        }
    }

    failures
}

/// Lay the diagnostic images out in a grid, four per row, each scaled to fit
/// its cell while keeping its aspect ratio. Every cell is captioned with the
/// diagnostic's title and the verdict heads the figure.
pub fn render_panels(
    diagnostics: &[Diagnostic],
    classification: Classification,
) -> anyhow::Result<RgbImage> {
    let font = FontRef::try_from_slice(PANEL_FONT).context("Failed to load panel font")?;

    let count = diagnostics.len().max(1) as u32;
    let rows = count.div_ceil(PANEL_COLUMNS);
    let columns = count.min(PANEL_COLUMNS);
    let (cell_w, cell_h) = PANEL_CELL;
    let row_h = CAPTION_HEIGHT + cell_h;

    let width = columns * cell_w + (columns + 1) * PANEL_GAP;
    let height = HEADLINE_HEIGHT + rows * row_h + (rows + 1) * PANEL_GAP;
    let mut canvas = RgbImage::from_pixel(width, height, PANEL_BACKGROUND);

    let headline = format!("{classification} COVID-19 RAT test");
    draw_centred_text(&mut canvas, &font, PxScale::from(28.0), &headline, width / 2, 8);

    for (i, diagnostic) in diagnostics.iter().enumerate() {
        let col = i as u32 % PANEL_COLUMNS;
        let row = i as u32 / PANEL_COLUMNS;
        let cell_x = PANEL_GAP + col * (cell_w + PANEL_GAP);
        let cell_y = HEADLINE_HEIGHT + PANEL_GAP + row * (row_h + PANEL_GAP);

        draw_centred_text(
            &mut canvas,
            &font,
            PxScale::from(15.0),
            diagnostic.title,
            cell_x + cell_w / 2,
            cell_y + 2,
        );

        let tile = fit_to_cell(&diagnostic.image, cell_w, cell_h);
        let x = cell_x + (cell_w - tile.width()) / 2;
        let y = cell_y + CAPTION_HEIGHT + (cell_h - tile.height()) / 2;
        imageops::overlay(&mut canvas, &tile, x.into(), y.into());
    }

    Ok(canvas)
}

fn draw_centred_text(
    canvas: &mut RgbImage,
    font: &FontRef<'_>,
    scale: PxScale,
    text: &str,
    centre_x: u32,
    y: u32,
) {
    let (text_w, _) = text_size(scale, font, text);
    let x = (centre_x as i32 - text_w as i32 / 2).max(0);
    draw_text_mut(canvas, TEXT_COLOUR, x, y as i32, scale, font, text);
}

fn fit_to_cell(image: &DynamicImage, cell_w: u32, cell_h: u32) -> RgbImage {
    let rgb = image.to_rgb8();
    let (w, h) = rgb.dimensions();
    if w == 0 || h == 0 {
        return RgbImage::from_pixel(1, 1, PANEL_BACKGROUND);
    }

    let scale = (cell_w as f32 / w as f32).min(cell_h as f32 / h as f32);
    let scaled_w = ((w as f32 * scale) as u32).clamp(1, cell_w);
    let scaled_h = ((h as f32 * scale) as u32).clamp(1, cell_h);

    // Nearest keeps binary maps crisp
    imageops::resize(&rgb, scaled_w, scaled_h, FilterType::Nearest)
}
