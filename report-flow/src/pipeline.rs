//! Orchestration: extract, generate, normalize.
//!
//! `process` is infallible by contract. Generation failures are logged for
//! operators and masked with the canned report.

use tracing::{error, warn};

use crate::config::GeneratorConfig;
use crate::extract::extract;
use crate::generate::ReportGenerator;
use crate::normalize::normalize;
use crate::report::{RawDocument, UIReport};

const CANNED_CANDIDATE: &str = r#"{
    "project_name": "E-Commerce Experience",
    "summary": "Baseline storefront covering browsing, product detail, cart and checkout."
}"#;

/// Built-in report served when generation fails outright. Shares the
/// normalizer's mandatory-screen and style defaults.
pub fn canned_report() -> UIReport {
    normalize(CANNED_CANDIDATE)
}

/// Sequences the pipeline stages over one request-scoped document.
pub struct ReportPipeline {
    generator: ReportGenerator,
}

impl ReportPipeline {
    pub fn new(generator: ReportGenerator) -> Self {
        Self { generator }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(ReportGenerator::from_config(config))
    }

    pub fn provider_name(&self) -> &str {
        self.generator.provider_name()
    }

    /// Always returns a schema-conformant report, whatever the input bytes
    /// or the provider do.
    pub async fn process(&self, raw: &RawDocument) -> UIReport {
        let extracted = extract(raw);
        if !extracted.succeeded {
            warn!(media_type = ?raw.media_type, "structured extraction degraded to raw byte decode");
        }

        match self.generator.generate(&extracted).await {
            Ok(candidate) => normalize(&candidate),
            Err(e) => {
                error!(error = %e, "report generation failed, serving canned report");
                canned_report()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ReportError, Result};
    use crate::generate::CompletionProvider;
    use crate::normalize::MANDATORY_SCREENS;
    use crate::report::MediaType;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct StaticProvider {
        reply: &'static str,
    }

    #[async_trait]
    impl CompletionProvider for StaticProvider {
        fn name(&self) -> &str {
            "static"
        }

        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(self.reply.to_string())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl CompletionProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn complete(&self, _prompt: &str) -> Result<String> {
            Err(ReportError::generation("failing", "quota exceeded"))
        }
    }

    fn pipeline_with(provider: Arc<dyn CompletionProvider>) -> ReportPipeline {
        ReportPipeline::new(ReportGenerator::new(provider))
    }

    #[tokio::test]
    async fn prose_wrapped_reply_becomes_a_full_report() {
        let pipeline = pipeline_with(Arc::new(StaticProvider {
            reply: r#"Sure! Here is the report: {"project_name": "Gadget Shop", "summary": "storefront"} Hope it helps."#,
        }));
        let raw = RawDocument::new(b"gadget shop brief".to_vec(), MediaType::Unknown);

        let report = pipeline.process(&raw).await;
        assert_eq!(report.project_name, "Gadget Shop");
        for name in MANDATORY_SCREENS {
            assert!(report.screens.iter().any(|s| s.name.eq_ignore_ascii_case(name)));
        }
    }

    #[tokio::test]
    async fn provider_failure_never_escapes_process() {
        let pipeline = pipeline_with(Arc::new(FailingProvider));
        let raw = RawDocument::new(Vec::new(), MediaType::Pdf);

        let report = pipeline.process(&raw).await;
        assert_eq!(report.project_name, "E-Commerce Experience");
        let names: Vec<&str> = report.screens.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, MANDATORY_SCREENS.to_vec());
    }

    #[test]
    fn canned_report_carries_mandatory_defaults() {
        let report = canned_report();
        let names: Vec<&str> = report.screens.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, MANDATORY_SCREENS.to_vec());
        assert!(!report.styles.components.is_empty());
        assert!(!report.styles.colors.is_empty());
    }
}
