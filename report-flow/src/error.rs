use thiserror::Error;

/// Errors the pipeline core can produce.
///
/// Degraded extraction surfaces through `ExtractedText::succeeded` and the
/// normalizer repairs in place, so only generation and configuration appear
/// here. The orchestrator masks generation failures with the canned report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{provider} completion request failed: {message}")]
    Generation { provider: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl ReportError {
    pub fn generation(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Generation {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
