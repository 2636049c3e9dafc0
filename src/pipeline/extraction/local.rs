//! Local Tesseract OCR engine.
//!
//! Only available when compiled with the `ocr` feature flag (needs system
//! libtesseract). First in the strategy list: free, offline, and reports a
//! real confidence score — the orchestrator short-circuits on it when the
//! score clears the acceptance bar.

#[cfg(feature = "ocr")]
use tracing::debug;

#[cfg(feature = "ocr")]
use super::types::{OcrMethod, OcrOutcome, ProgressReporter, UploadedFile};
#[cfg(feature = "ocr")]
use super::ExtractionError;

/// Method identifier reported in outcomes and progress messages.
pub const LOCAL_METHOD_NAME: &str = "local-tesseract";

/// Characters worth recognizing on a prescription. Constraining the engine
/// to this set cuts the usual O/0 and l/1 confusions on handwriting.
#[cfg(feature = "ocr")]
const CHAR_WHITELIST: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789.,;:()[]{}/-+= \n\t";

/// Fully automatic page segmentation (Tesseract PSM 3).
#[cfg(feature = "ocr")]
const PAGE_SEG_MODE: &str = "3";

/// Below this many characters the extraction is treated as failed.
#[cfg(feature = "ocr")]
const MIN_EXTRACTED_CHARS: usize = 3;

/// Tesseract-backed OCR method.
#[cfg(feature = "ocr")]
pub struct LocalOcrEngine {
    tessdata_dir: std::path::PathBuf,
    lang: String,
}

#[cfg(feature = "ocr")]
impl LocalOcrEngine {
    /// Initialize with a tessdata directory containing `eng.traineddata`.
    pub fn new(tessdata_dir: &std::path::Path) -> Result<Self, ExtractionError> {
        if !tessdata_dir.join("eng.traineddata").exists() {
            return Err(ExtractionError::EngineInit(format!(
                "tessdata not found at {}",
                tessdata_dir.display()
            )));
        }

        Ok(Self {
            tessdata_dir: tessdata_dir.to_path_buf(),
            lang: "eng".to_string(),
        })
    }

    /// Set language(s) for OCR (e.g., "eng", "eng+fra").
    pub fn with_languages(mut self, langs: &str) -> Self {
        self.lang = langs.to_string();
        self
    }

    fn run(&self, image_bytes: &[u8]) -> Result<(String, f32), ExtractionError> {
        let tessdata = self
            .tessdata_dir
            .to_str()
            .ok_or_else(|| ExtractionError::EngineInit("invalid tessdata path".into()))?;

        let tess = tesseract::Tesseract::new(Some(tessdata), Some(&self.lang))
            .map_err(|e| ExtractionError::EngineInit(format!("{e:?}")))?;

        let tess = tess
            .set_variable("tessedit_char_whitelist", CHAR_WHITELIST)
            .and_then(|t| t.set_variable("preserve_interword_spaces", "1"))
            .and_then(|t| t.set_variable("tessedit_pageseg_mode", PAGE_SEG_MODE))
            .map_err(|e| ExtractionError::EngineInit(format!("{e:?}")))?;

        let mut tess = tess
            .set_image_from_mem(image_bytes)
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        let text = tess
            .get_text()
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        let confidence = tess.mean_text_conf().max(0) as f32;
        Ok((text, confidence))
    }
}

#[cfg(feature = "ocr")]
impl OcrMethod for LocalOcrEngine {
    fn name(&self) -> &'static str {
        LOCAL_METHOD_NAME
    }

    fn prefers_preprocessed(&self) -> bool {
        // Tesseract reads the binarized pipeline output far better than a
        // raw phone photo.
        true
    }

    fn extract(
        &self,
        file: &UploadedFile,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<OcrOutcome, ExtractionError> {
        progress.report("init", 5, "Initializing local OCR engine...");
        progress.report("processing", 20, "Recognizing text...");

        let (text, confidence) = self.run(&file.bytes)?;
        let text = text.trim().to_string();

        progress.report("parsing", 90, "Collecting recognized text...");

        if text.len() < MIN_EXTRACTED_CHARS {
            return Err(ExtractionError::OcrProcessing(
                "extracted text is too short - image may not contain readable text".to_string(),
            ));
        }

        progress.report("complete", 100, "Local OCR extraction completed");
        debug!(chars = text.len(), confidence, "local OCR extraction succeeded");

        Ok(OcrOutcome {
            text,
            confidence,
            method: LOCAL_METHOD_NAME,
        })
    }
}

#[cfg(all(test, feature = "ocr"))]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_tessdata() {
        let result = LocalOcrEngine::new(std::path::Path::new("/nonexistent/tessdata"));
        assert!(matches!(result, Err(ExtractionError::EngineInit(_))));
    }

    #[test]
    fn initializes_with_system_tessdata() {
        let tessdata_dir = std::path::Path::new("/usr/share/tesseract-ocr/5/tessdata");
        if !tessdata_dir.exists() {
            return; // Skip on systems without Tesseract
        }
        let engine = LocalOcrEngine::new(tessdata_dir).unwrap().with_languages("eng");
        assert_eq!(engine.lang, "eng");
    }
}
