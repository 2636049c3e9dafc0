//! Degenerate last-resort method: image metadata analysis.
//!
//! Produces no real OCR — it confirms the image decodes and reports its
//! dimensions so the user gets an actionable message instead of a bare
//! failure, steering them toward manual entry. Low fixed confidence keeps
//! the orchestrator from ever preferring it while a real method remains.

use std::io::Cursor;

use image::ImageReader;

use super::types::{OcrMethod, OcrOutcome, ProgressReporter, UploadedFile};
use super::ExtractionError;

/// Method identifier reported in outcomes and progress messages.
pub const METADATA_METHOD_NAME: &str = "image-metadata";

/// Fixed confidence: enough to register as a success, never enough to
/// short-circuit past a real OCR method.
const METADATA_CONFIDENCE: f32 = 30.0;

pub struct ImageMetadataFallback;

impl OcrMethod for ImageMetadataFallback {
    fn name(&self) -> &'static str {
        METADATA_METHOD_NAME
    }

    fn extract(
        &self,
        file: &UploadedFile,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<OcrOutcome, ExtractionError> {
        progress.report("processing", 50, "Analyzing image structure...");

        let (width, height) = ImageReader::new(Cursor::new(&file.bytes))
            .with_guessed_format()
            .map_err(|e| ExtractionError::ImageDecode(e.to_string()))?
            .into_dimensions()
            .map_err(|e| ExtractionError::ImageDecode(e.to_string()))?;

        let content_type = file
            .resolved_content_type()
            .unwrap_or_else(|| "unknown".to_string());

        let text = format!(
            "Image Analysis Results:\n\
             - Image dimensions: {width}x{height}\n\
             - File size: {:.1}KB\n\
             - File type: {content_type}\n\
             \n\
             The image appears to be valid but text extraction failed with other methods.\n\
             Please try typing the prescription manually for the most accurate results.",
            file.size() as f64 / 1024.0
        );

        progress.report("complete", 100, "Image analysis completed");

        Ok(OcrOutcome {
            text,
            confidence: METADATA_CONFIDENCE,
            method: METADATA_METHOD_NAME,
        })
    }
}
