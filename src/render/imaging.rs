// src/render/imaging.rs

//! Print-ready monochrome versions of question and answer images.

use std::path::Path;

use image::{DynamicImage, GrayImage, Luma};

/// Answer sheet diagrams fit 4.5cm x 3.5cm.
pub const ANSWER_AREA: (f64, f64) = (127.6, 99.2);

const MAX_SOURCE_SIDE: u32 = 1600;
const CUTOFF_PERCENT: f64 = 2.0;
const THRESHOLD: u8 = 150;
const BORDER: u32 = 12;

/// Text printed where an image cannot be read.
pub const IMAGE_PLACEHOLDER: &str = "[Diagram could not be loaded]";

/// 8-bit gray pixels plus the size they print at, in points.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintImage {
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub pixels: Vec<u8>,
    pub width: i64,
    pub height: i64,
}

/// Stretches the histogram after cutting `cutoff` percent from both ends.
fn autocontrast(img: &mut GrayImage, cutoff: f64) {
    let mut histogram = [0u64; 256];
    for p in img.pixels() {
        histogram[p.0[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    let cut = (total as f64 * cutoff / 100.0) as u64;

    let mut remaining = cut;
    for count in histogram.iter_mut() {
        let taken = remaining.min(*count);
        *count -= taken;
        remaining -= taken;
        if remaining == 0 {
            break;
        }
    }
    let mut remaining = cut;
    for count in histogram.iter_mut().rev() {
        let taken = remaining.min(*count);
        *count -= taken;
        remaining -= taken;
        if remaining == 0 {
            break;
        }
    }

    let lo = histogram.iter().position(|&c| c > 0);
    let hi = histogram.iter().rposition(|&c| c > 0);
    let (Some(lo), Some(hi)) = (lo, hi) else {
        return;
    };
    if hi <= lo {
        return;
    }

    let scale = 255.0 / (hi - lo) as f64;
    let mut lut = [0u8; 256];
    for (value, slot) in lut.iter_mut().enumerate() {
        let mapped = (value as f64 - lo as f64) * scale;
        *slot = mapped.clamp(0.0, 255.0) as u8;
    }

    for p in img.pixels_mut() {
        p.0[0] = lut[p.0[0] as usize];
    }
}

/// Scales (w, h) down to fit `area`, never up.
fn fit(width: u32, height: u32, (max_w, max_h): (f64, f64)) -> (i64, i64) {
    let scale = (max_w / width as f64).min(max_h / height as f64).min(1.0);
    let w = (width as f64 * scale).round().max(1.0) as i64;
    let h = (height as f64 * scale).round().max(1.0) as i64;
    (w, h)
}

/// Grayscale, auto-contrast, hard threshold to black and white, then a
/// white border.
pub fn monochrome(img: DynamicImage, area: (f64, f64)) -> PrintImage {
    let img = if img.width() > MAX_SOURCE_SIDE || img.height() > MAX_SOURCE_SIDE {
        img.thumbnail(MAX_SOURCE_SIDE, MAX_SOURCE_SIDE)
    } else {
        img
    };

    let mut gray = img.to_luma8();
    autocontrast(&mut gray, CUTOFF_PERCENT);
    for p in gray.pixels_mut() {
        p.0[0] = if p.0[0] < THRESHOLD { 0 } else { 255 };
    }

    let (w, h) = gray.dimensions();
    let framed = GrayImage::from_fn(w + 2 * BORDER, h + 2 * BORDER, |x, y| {
        let inside = (BORDER..w + BORDER).contains(&x) && (BORDER..h + BORDER).contains(&y);
        if inside {
            *gray.get_pixel(x - BORDER, y - BORDER)
        } else {
            Luma([255])
        }
    });

    let (pixel_width, pixel_height) = framed.dimensions();
    let (width, height) = fit(pixel_width, pixel_height, area);
    PrintImage {
        pixel_width,
        pixel_height,
        pixels: framed.into_raw(),
        width,
        height,
    }
}

/// Loads an image file and converts it for print.
pub fn load_monochrome(path: &Path, area: (f64, f64)) -> Result<PrintImage, image::ImageError> {
    let img = image::open(path)?;
    Ok(monochrome(img, area))
}

/// A referenced image as it will be printed.
#[derive(Debug, Clone)]
pub enum Figure {
    Image(PrintImage),
    /// The file is missing or not an image; the placeholder text is printed.
    Unreadable,
}

/// Loads `relative` under `media_root`. `None` when no image is referenced.
pub fn load_media(media_root: &Path, relative: Option<&str>, area: (f64, f64)) -> Option<Figure> {
    let relative = relative?.trim();
    if relative.is_empty() {
        return None;
    }

    match load_monochrome(&media_root.join(relative), area) {
        Ok(img) => Some(Figure::Image(img)),
        Err(e) => {
            tracing::warn!("Image {} could not be loaded: {}", relative, e);
            Some(Figure::Unreadable)
        }
    }
}
