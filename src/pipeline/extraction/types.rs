//! Shared extraction types: uploads, method outcomes, progress reporting,
//! and the `OcrMethod` seam the orchestrator composes.

use std::cell::Cell;

use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// A file handed over by the upload boundary.
///
/// `content_type` is whatever the transport reported; when absent it is
/// inferred from the file name extension at validation time.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: &str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_string(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Declared content type, or a guess from the file name extension.
    pub fn resolved_content_type(&self) -> Option<String> {
        if let Some(declared) = &self.content_type {
            return Some(declared.clone());
        }
        mime_guess::from_path(&self.file_name)
            .first()
            .map(|m| m.essence_str().to_string())
    }
}

/// One successful extraction attempt by a single method. Transient — one
/// per attempt, serialized out for diagnostics but never read back.
#[derive(Debug, Clone, Serialize)]
pub struct OcrOutcome {
    pub text: String,
    /// Self-reported reliability, 0–100.
    pub confidence: f32,
    pub method: &'static str,
}

/// Progress event emitted at each stage transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrProgress {
    pub stage: String,
    /// 0–100, monotonically non-decreasing within one orchestrator call.
    pub percent: u8,
    pub message: String,
}

/// Wraps the caller's progress callback and clamps percentages so they never
/// go backwards across method transitions.
pub struct ProgressReporter<'a> {
    sink: Option<&'a mut dyn FnMut(OcrProgress)>,
    last_percent: u8,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(sink: &'a mut dyn FnMut(OcrProgress)) -> Self {
        Self {
            sink: Some(sink),
            last_percent: 0,
        }
    }

    /// A reporter that discards all events.
    pub fn silent() -> Self {
        Self {
            sink: None,
            last_percent: 0,
        }
    }

    pub fn report(&mut self, stage: &str, percent: u8, message: &str) {
        let percent = percent.min(100).max(self.last_percent);
        self.last_percent = percent;
        if let Some(sink) = self.sink.as_mut() {
            sink(OcrProgress {
                stage: stage.to_string(),
                percent,
                message: message.to_string(),
            });
        }
    }
}

/// One extraction method in the orchestrator's strategy list.
///
/// A method either returns a usable [`OcrOutcome`] or an error; "empty text"
/// is an error, not a zero-confidence success.
pub trait OcrMethod {
    fn name(&self) -> &'static str;

    /// Methods that operate on raw pixels (the local engine) want the
    /// preprocessed binarized image; HTTP APIs do their own normalization
    /// and receive the original upload.
    fn prefers_preprocessed(&self) -> bool {
        false
    }

    fn extract(
        &self,
        file: &UploadedFile,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<OcrOutcome, ExtractionError>;
}

impl<T: OcrMethod + ?Sized> OcrMethod for std::rc::Rc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn prefers_preprocessed(&self) -> bool {
        (**self).prefers_preprocessed()
    }

    fn extract(
        &self,
        file: &UploadedFile,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<OcrOutcome, ExtractionError> {
        (**self).extract(file, progress)
    }
}

/// Scripted OCR method for orchestrator tests — returns a fixed outcome or
/// error and counts invocations.
pub struct MockOcrMethod {
    name: &'static str,
    text: Option<String>,
    confidence: f32,
    error: Option<String>,
    calls: Cell<usize>,
}

impl MockOcrMethod {
    pub fn succeeding(name: &'static str, text: &str, confidence: f32) -> Self {
        Self {
            name,
            text: Some(text.to_string()),
            confidence,
            error: None,
            calls: Cell::new(0),
        }
    }

    pub fn failing(name: &'static str, error: &str) -> Self {
        Self {
            name,
            text: None,
            confidence: 0.0,
            error: Some(error.to_string()),
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl OcrMethod for MockOcrMethod {
    fn name(&self) -> &'static str {
        self.name
    }

    fn extract(
        &self,
        _file: &UploadedFile,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<OcrOutcome, ExtractionError> {
        self.calls.set(self.calls.get() + 1);
        progress.report("processing", 50, "mock method running");

        if let Some(error) = &self.error {
            return Err(ExtractionError::OcrProcessing(error.clone()));
        }

        Ok(OcrOutcome {
            text: self.text.clone().unwrap_or_default(),
            confidence: self.confidence,
            method: self.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_content_type_prefers_declared() {
        let file = UploadedFile::new("rx.jpg", vec![1]).with_content_type("image/png");
        assert_eq!(file.resolved_content_type().as_deref(), Some("image/png"));
    }

    #[test]
    fn resolved_content_type_guesses_from_extension() {
        let file = UploadedFile::new("prescription.jpeg", vec![1]);
        assert_eq!(file.resolved_content_type().as_deref(), Some("image/jpeg"));

        let file = UploadedFile::new("scan.pdf", vec![1]);
        assert_eq!(
            file.resolved_content_type().as_deref(),
            Some("application/pdf")
        );

        let file = UploadedFile::new("noextension", vec![1]);
        assert!(file.resolved_content_type().is_none());
    }

    #[test]
    fn progress_reporter_is_monotonic() {
        let mut seen: Vec<u8> = Vec::new();
        let mut sink = |p: OcrProgress| seen.push(p.percent);
        let mut reporter = ProgressReporter::new(&mut sink);

        reporter.report("a", 10, "start");
        reporter.report("b", 60, "mid");
        reporter.report("c", 20, "late method restarts low");
        reporter.report("d", 100, "done");

        assert_eq!(seen, vec![10, 60, 60, 100]);
    }

    #[test]
    fn progress_reporter_caps_at_100() {
        let mut seen: Vec<u8> = Vec::new();
        let mut sink = |p: OcrProgress| seen.push(p.percent);
        let mut reporter = ProgressReporter::new(&mut sink);
        reporter.report("a", 250, "overflow");
        assert_eq!(seen, vec![100]);
    }

    #[test]
    fn mock_method_counts_calls() {
        let method = MockOcrMethod::failing("mock", "boom");
        let file = UploadedFile::new("a.png", vec![1]);
        let mut progress = ProgressReporter::silent();
        assert!(method.extract(&file, &mut progress).is_err());
        assert!(method.extract(&file, &mut progress).is_err());
        assert_eq!(method.calls(), 2);
    }
}
