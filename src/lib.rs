pub mod config;
pub mod models;
pub mod pipeline;
pub mod intelligence; // rule-based personalization over profile + history
pub mod chat; // conversational Q&A over the decoded prescription

use tracing_subscriber::EnvFilter;

pub use models::{MedicalHistory, MedicationRecord, PatientProfile};
pub use pipeline::decode::{DecodeError, LlmClient, OpenRouterClient};
pub use pipeline::extraction::{
    EscalationTier, ExtractionError, OcrOrchestrator, OcrSessionState, UploadedFile,
};
pub use pipeline::processor::{process_prescription, ProcessedPrescription};

/// Initialize tracing for binary consumers.
///
/// Respects `RUST_LOG` when set, otherwise falls back to the crate default.
/// Library users embedding their own subscriber should skip this.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("rxlens v{}", config::APP_VERSION);
}
