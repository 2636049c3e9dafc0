//! Image preprocessing for OCR input.
//!
//! Fixed pipeline, order matters: EXIF orientation → rescale (with a
//! contrast/brightness nudge during the resize) → grayscale → edge-preserving
//! median denoise → linear contrast → adaptive threshold. The output is a
//! binarized, losslessly-encoded image that OCR engines read far better than
//! a raw phone photo.
//!
//! Pure image-to-image transform — no I/O, no network, fully testable.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ExtractionError;

// ═══════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════

/// Smallest byte count that can possibly be a valid raster image
/// (smallest valid PNG is ~67 bytes).
const MIN_IMAGE_BYTES: usize = 67;

/// Maximum input size before rejecting. Prevents OOM on corrupt or
/// adversarial files; the orchestrator enforces a tighter upload limit.
const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024;

// ═══════════════════════════════════════════════════════════
// Configuration
// ═══════════════════════════════════════════════════════════

/// Tuning knobs for the pipeline.
///
/// The denoise edge threshold and the adaptive-threshold multiplier have no
/// documented derivation — they are carried as configuration with the
/// production-observed values as defaults rather than baked-in invariants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Images narrower than this get upscaled toward `upscale_target_width`.
    pub min_width: u32,
    pub upscale_target_width: u32,
    /// Images wider than this get downscaled toward `downscale_target_width`.
    pub max_width: u32,
    pub downscale_target_width: u32,
    /// Contrast multiplier applied during the resize draw.
    pub resize_contrast: f32,
    /// Brightness multiplier applied during the resize draw.
    pub resize_brightness: f32,
    /// |original − median| below this means noise (smooth); above means edge (keep).
    pub denoise_edge_threshold: u8,
    /// Linear contrast factor for `out = f*v + (f-1)*128`.
    pub contrast_factor: f32,
    /// Half-width of the adaptive-threshold window (window = 2r+1 square).
    pub adaptive_window_radius: u32,
    /// Local threshold = neighborhood mean × this factor.
    pub adaptive_threshold_factor: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            min_width: 800,
            upscale_target_width: 1200,
            max_width: 2400,
            downscale_target_width: 1800,
            resize_contrast: 1.2,
            resize_brightness: 1.1,
            denoise_edge_threshold: 40,
            contrast_factor: 1.5,
            adaptive_window_radius: 15,
            adaptive_threshold_factor: 0.9,
        }
    }
}

/// Result of preprocessing: lossless PNG plus the dimensions involved.
#[derive(Debug)]
pub struct PreparedImage {
    pub png_bytes: Vec<u8>,
    pub original_width: u32,
    pub original_height: u32,
    pub processed_width: u32,
    pub processed_height: u32,
}

// ═══════════════════════════════════════════════════════════
// ImagePreprocessor
// ═══════════════════════════════════════════════════════════

/// Runs the fixed pipeline over raw image bytes.
pub struct ImagePreprocessor {
    config: PreprocessConfig,
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new(PreprocessConfig::default())
    }
}

impl ImagePreprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Prepare an image for OCR.
    ///
    /// Decode failure is fatal for this call and propagates — there is no
    /// silent fallback to the unprocessed bytes.
    pub fn preprocess(&self, image_bytes: &[u8]) -> Result<PreparedImage, ExtractionError> {
        validate_image_bytes(image_bytes)?;

        let img = image::load_from_memory(image_bytes)
            .map_err(|e| ExtractionError::ImageDecode(e.to_string()))?;
        let (orig_w, orig_h) = img.dimensions();

        // Phone photos embed rotation in EXIF; without correction a portrait
        // shot reaches the OCR engine sideways.
        let img = apply_orientation(img, read_exif_orientation(image_bytes));
        let rgb = img.to_rgb8();

        // 1. Rescale toward the OCR-optimal width range
        let mut working = rescale_for_ocr(&rgb, &self.config);

        // 2. Grayscale (ITU-R luminance weights)
        to_grayscale(&mut working);

        // 3. Edge-preserving median denoise
        let mut working = median_denoise(&working, self.config.denoise_edge_threshold);

        // 4. Linear contrast enhancement
        enhance_contrast(&mut working, self.config.contrast_factor);

        // 5. Adaptive threshold (binarize against the local mean)
        let working = adaptive_threshold(
            &working,
            self.config.adaptive_window_radius,
            self.config.adaptive_threshold_factor,
        );

        let (out_w, out_h) = (working.width(), working.height());
        let png_bytes = encode_png(&working)?;

        debug!(
            original = format!("{orig_w}x{orig_h}"),
            processed = format!("{out_w}x{out_h}"),
            png_size = png_bytes.len(),
            "image preprocessed for OCR"
        );

        Ok(PreparedImage {
            png_bytes,
            original_width: orig_w,
            original_height: orig_h,
            processed_width: out_w,
            processed_height: out_h,
        })
    }
}

fn validate_image_bytes(bytes: &[u8]) -> Result<(), ExtractionError> {
    if bytes.len() < MIN_IMAGE_BYTES {
        return Err(ExtractionError::ImageDecode(format!(
            "input too small to be an image ({} bytes)",
            bytes.len()
        )));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ExtractionError::ImageDecode(format!(
            "input exceeds {} bytes",
            MAX_IMAGE_BYTES
        )));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// Pipeline stages
// ═══════════════════════════════════════════════════════════

/// Scale toward the OCR sweet spot, preserving aspect ratio.
///
/// Narrow images get upscaled (small text needs pixels to survive
/// binarization); very wide ones get downscaled. CatmullRom avoids the
/// ringing artifacts Lanczos introduces around high-contrast glyph edges.
/// A mild contrast/brightness nudge is applied as part of the draw.
pub fn rescale_for_ocr(image: &RgbImage, config: &PreprocessConfig) -> RgbImage {
    let (w, h) = (image.width(), image.height());

    let target_w = if w < config.min_width {
        config.upscale_target_width
    } else if w > config.max_width {
        config.downscale_target_width
    } else {
        w
    };
    let target_h = ((target_w as f64) * (h as f64) / (w as f64)).round().max(1.0) as u32;

    let mut resized = if target_w == w {
        image.clone()
    } else {
        image::imageops::resize(image, target_w, target_h, FilterType::CatmullRom)
    };

    for pixel in resized.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            let v = *channel as f32;
            let contrasted = (v - 128.0) * config.resize_contrast + 128.0;
            let brightened = contrasted * config.resize_brightness;
            *channel = brightened.clamp(0.0, 255.0) as u8;
        }
    }
    resized
}

/// Set every channel to the ITU-R BT.601 luminance of the pixel.
pub fn to_grayscale(image: &mut RgbImage) {
    for pixel in image.pixels_mut() {
        let [r, g, b] = pixel.0;
        let luma = (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).round() as u8;
        *pixel = Rgb([luma, luma, luma]);
    }
}

/// 5×5 median filter over the interior (2-pixel border untouched).
///
/// Inverse of the textbook filter on purpose: a pixel is replaced by the
/// neighborhood median only when the deviation is SMALL. Small local
/// deviation ⇒ sensor noise ⇒ smooth; large deviation ⇒ glyph edge ⇒ keep.
pub fn median_denoise(image: &RgbImage, edge_threshold: u8) -> RgbImage {
    let (w, h) = (image.width(), image.height());
    let mut out = image.clone();
    if w < 5 || h < 5 {
        return out;
    }

    let mut window = [0u8; 25];
    for y in 2..h - 2 {
        for x in 2..w - 2 {
            let mut i = 0;
            for dy in -2i64..=2 {
                for dx in -2i64..=2 {
                    let nx = (x as i64 + dx) as u32;
                    let ny = (y as i64 + dy) as u32;
                    window[i] = image.get_pixel(nx, ny).0[0];
                    i += 1;
                }
            }
            window.sort_unstable();
            let median = window[12];

            let original = image.get_pixel(x, y).0[0];
            if original.abs_diff(median) < edge_threshold {
                out.put_pixel(x, y, Rgb([median, median, median]));
            }
        }
    }
    out
}

/// Linear contrast transform `out = factor*v + (factor-1)*128`, clamped.
pub fn enhance_contrast(image: &mut RgbImage, factor: f32) {
    let offset = (factor - 1.0) * 128.0;
    for pixel in image.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            *channel = (factor * *channel as f32 + offset).clamp(0.0, 255.0) as u8;
        }
    }
}

/// Binarize each pixel against the mean of its square neighborhood (clipped
/// at the image bounds), using `mean × factor` as the local threshold.
///
/// A summed-area table keeps this O(w·h) regardless of window radius.
pub fn adaptive_threshold(image: &RgbImage, radius: u32, factor: f32) -> RgbImage {
    let (w, h) = (image.width() as usize, image.height() as usize);
    let mut out = image.clone();
    if w == 0 || h == 0 {
        return out;
    }

    // integral[y+1][x+1] = sum of channel-0 values in [0,0]..=[x,y]
    let mut integral = vec![0u64; (w + 1) * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += image.get_pixel(x as u32, y as u32).0[0] as u64;
            integral[(y + 1) * (w + 1) + (x + 1)] = integral[y * (w + 1) + (x + 1)] + row_sum;
        }
    }

    let r = radius as usize;
    for y in 0..h {
        for x in 0..w {
            let x0 = x.saturating_sub(r);
            let y0 = y.saturating_sub(r);
            let x1 = (x + r).min(w - 1);
            let y1 = (y + r).min(h - 1);

            let sum = integral[(y1 + 1) * (w + 1) + (x1 + 1)]
                + integral[y0 * (w + 1) + x0]
                - integral[y0 * (w + 1) + (x1 + 1)]
                - integral[(y1 + 1) * (w + 1) + x0];
            let count = ((x1 - x0 + 1) * (y1 - y0 + 1)) as f32;
            let mean = sum as f32 / count;

            let value = image.get_pixel(x as u32, y as u32).0[0] as f32;
            let binary = if value > mean * factor { 255 } else { 0 };
            out.put_pixel(x as u32, y as u32, Rgb([binary, binary, binary]));
        }
    }
    out
}

fn encode_png(image: &RgbImage) -> Result<Vec<u8>, ExtractionError> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| ExtractionError::ImageEncode(e.to_string()))?;
    Ok(bytes)
}

// ═══════════════════════════════════════════════════════════
// EXIF orientation
// ═══════════════════════════════════════════════════════════

/// Read the EXIF orientation tag (0x0112). Returns 1 (normal) when the
/// container has no EXIF data or the tag is absent.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply an EXIF orientation transform.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        1 => img,
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

// ═══════════════════════════════════════════════════════════
// Advisory quality check
// ═══════════════════════════════════════════════════════════

/// Advisory result from [`validate_image_quality`]. Never blocks extraction —
/// the user chose this file, so issues surface as suggestions only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityCheck {
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Heuristic pre-flight check on resolution, aspect ratio, and byte size.
pub fn validate_image_quality(file_name: &str, bytes: &[u8]) -> QualityCheck {
    let mut issues = Vec::new();
    let mut suggestions = Vec::new();

    let dims = image::load_from_memory(bytes).map(|img| img.dimensions());
    match dims {
        Err(_) => {
            issues.push("Cannot read image file".to_string());
            suggestions.push("Try a different image format (JPG, PNG)".to_string());
        }
        Ok((w, h)) => {
            if w < 400 || h < 300 {
                issues.push("Image resolution is too low".to_string());
                suggestions.push("Use a higher resolution image (at least 800x600)".to_string());
            }

            let aspect = w as f64 / h as f64;
            if aspect > 4.0 || aspect < 0.25 {
                issues.push("Unusual aspect ratio detected".to_string());
                suggestions
                    .push("Ensure the prescription fills most of the image frame".to_string());
            }

            if bytes.len() < 50_000 {
                issues.push("File size is very small, might indicate low quality".to_string());
                suggestions.push("Use a higher quality camera setting".to_string());
            }
            if bytes.len() > 10_000_000 {
                issues.push("File size is very large".to_string());
                suggestions.push("Compress the image or use a smaller file size".to_string());
            }
        }
    }

    if !issues.is_empty() {
        debug!(file_name, issues = issues.len(), "image quality concerns");
    }

    QualityCheck {
        is_valid: issues.is_empty(),
        issues,
        suggestions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_image(w: u32, h: u32, value: u8) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb([value, value, value]))
    }

    fn png_bytes(image: &RgbImage) -> Vec<u8> {
        encode_png(image).unwrap()
    }

    #[test]
    fn grayscale_sets_all_channels_equal() {
        let mut img = RgbImage::new(4, 4);
        img.put_pixel(1, 1, Rgb([200, 30, 90]));
        img.put_pixel(2, 3, Rgb([0, 255, 17]));
        to_grayscale(&mut img);

        for pixel in img.pixels() {
            let [r, g, b] = pixel.0;
            assert_eq!(r, g);
            assert_eq!(g, b);
        }
        // 0.299*200 + 0.587*30 + 0.114*90 = 87.67 → 88
        assert_eq!(img.get_pixel(1, 1).0[0], 88);
    }

    #[test]
    fn adaptive_threshold_is_strictly_binary() {
        let mut img = RgbImage::new(40, 40);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            let v = ((x * 7 + y * 5) % 256) as u8;
            *pixel = Rgb([v, v, v]);
        }
        let out = adaptive_threshold(&img, 15, 0.9);
        for pixel in out.pixels() {
            let [r, g, b] = pixel.0;
            assert!(r == 0 || r == 255, "expected binary value, got {r}");
            assert_eq!(r, g);
            assert_eq!(g, b);
        }
    }

    #[test]
    fn adaptive_threshold_separates_dark_text_from_light_ground() {
        // Light page with one dark stroke; the stroke must binarize to 0.
        let mut img = solid_image(50, 50, 220);
        for y in 20..30 {
            img.put_pixel(25, y, Rgb([10, 10, 10]));
        }
        let out = adaptive_threshold(&img, 15, 0.9);
        assert_eq!(out.get_pixel(25, 25).0[0], 0);
        assert_eq!(out.get_pixel(5, 5).0[0], 255);
    }

    #[test]
    fn median_denoise_smooths_small_deviations() {
        // A lone speck 30 levels off an even ground: below the edge
        // threshold, so it gets replaced by the neighborhood median.
        let mut img = solid_image(10, 10, 100);
        img.put_pixel(5, 5, Rgb([130, 130, 130]));
        let out = median_denoise(&img, 40);
        assert_eq!(out.get_pixel(5, 5).0[0], 100);
    }

    #[test]
    fn median_denoise_keeps_strong_edges() {
        // A stroke 155 levels off the ground is an edge: kept verbatim.
        let mut img = solid_image(10, 10, 100);
        img.put_pixel(5, 5, Rgb([255, 255, 255]));
        let out = median_denoise(&img, 40);
        assert_eq!(out.get_pixel(5, 5).0[0], 255);
    }

    #[test]
    fn median_denoise_leaves_border_untouched() {
        let mut img = solid_image(10, 10, 100);
        img.put_pixel(0, 0, Rgb([255, 255, 255]));
        img.put_pixel(1, 1, Rgb([130, 130, 130]));
        let out = median_denoise(&img, 40);
        assert_eq!(out.get_pixel(0, 0).0[0], 255);
        assert_eq!(out.get_pixel(1, 1).0[0], 130);
    }

    #[test]
    fn contrast_transform_matches_formula() {
        let mut img = RgbImage::new(1, 3);
        img.put_pixel(0, 0, Rgb([128, 128, 128]));
        img.put_pixel(0, 1, Rgb([0, 0, 0]));
        img.put_pixel(0, 2, Rgb([200, 200, 200]));
        enhance_contrast(&mut img, 1.5);

        // 1.5*128 + 64 = 256 → clamped 255
        assert_eq!(img.get_pixel(0, 0).0[0], 255);
        // 1.5*0 + 64 = 64
        assert_eq!(img.get_pixel(0, 1).0[0], 64);
        // 1.5*200 + 64 = 364 → clamped 255
        assert_eq!(img.get_pixel(0, 2).0[0], 255);
    }

    #[test]
    fn rescale_upscales_narrow_images() {
        let img = solid_image(400, 300, 128);
        let out = rescale_for_ocr(&img, &PreprocessConfig::default());
        assert_eq!(out.width(), 1200);
        assert_eq!(out.height(), 900);
    }

    #[test]
    fn rescale_downscales_oversized_images() {
        let img = solid_image(3600, 1800, 128);
        let out = rescale_for_ocr(&img, &PreprocessConfig::default());
        assert_eq!(out.width(), 1800);
        assert_eq!(out.height(), 900);
    }

    #[test]
    fn rescale_keeps_in_range_dimensions() {
        let img = solid_image(1000, 700, 128);
        let out = rescale_for_ocr(&img, &PreprocessConfig::default());
        assert_eq!((out.width(), out.height()), (1000, 700));
    }

    #[test]
    fn preprocess_full_pipeline_outputs_binary_png() {
        let mut img = solid_image(900, 600, 230);
        for x in 100..800 {
            img.put_pixel(x, 300, Rgb([20, 20, 20]));
        }
        let prepared = ImagePreprocessor::default().preprocess(&png_bytes(&img)).unwrap();
        assert_eq!(prepared.original_width, 900);
        assert_eq!(prepared.processed_width, 900);

        let decoded = image::load_from_memory(&prepared.png_bytes).unwrap().to_rgb8();
        for pixel in decoded.pixels() {
            let [r, g, b] = pixel.0;
            assert!(r == 0 || r == 255);
            assert_eq!(r, g);
            assert_eq!(g, b);
        }
    }

    #[test]
    fn preprocess_rejects_undecodable_bytes() {
        let garbage = vec![0xABu8; 1024];
        let result = ImagePreprocessor::default().preprocess(&garbage);
        assert!(matches!(result, Err(ExtractionError::ImageDecode(_))));
    }

    #[test]
    fn preprocess_rejects_tiny_inputs() {
        let result = ImagePreprocessor::default().preprocess(&[0u8; 8]);
        assert!(matches!(result, Err(ExtractionError::ImageDecode(_))));
    }

    #[test]
    fn orientation_six_rotates_ninety() {
        let img = DynamicImage::ImageRgb8(solid_image(10, 20, 50));
        let out = apply_orientation(img, 6);
        assert_eq!(out.dimensions(), (20, 10));
    }

    #[test]
    fn missing_exif_defaults_to_normal() {
        let img = solid_image(10, 10, 50);
        assert_eq!(read_exif_orientation(&png_bytes(&img)), 1);
    }

    #[test]
    fn quality_check_flags_low_resolution() {
        let img = solid_image(200, 150, 128);
        let check = validate_image_quality("small.png", &png_bytes(&img));
        assert!(!check.is_valid);
        assert!(check.issues.iter().any(|i| i.contains("resolution")));
    }

    #[test]
    fn quality_check_flags_unreadable_file() {
        let check = validate_image_quality("junk.bin", &[0u8; 100]);
        assert!(!check.is_valid);
        assert!(check.issues.iter().any(|i| i.contains("Cannot read")));
    }
}
