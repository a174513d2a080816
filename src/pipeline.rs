use crate::config::Config;
use crate::error::ValidationError;
use crate::fusion::RiskFusionEngine;
use crate::scanners::IndicatorExtractor;
use crate::semantic::{classify_with_fallback, EmailSummary, HttpSemanticProvider, SemanticProvider};
use crate::types::{AnalysisContext, EmailMessage, RiskAssessment};
use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;

/// Single-item pipeline: Extract, then the semantic call, then fusion.
/// Stages run sequentially because fusion depends on both prior
/// outputs. Only the semantic stage touches the network, and its
/// failures never escape the boundary.
pub struct EmailAnalyzer {
    extractor: IndicatorExtractor,
    fusion: RiskFusionEngine,
    provider: Option<Arc<dyn SemanticProvider>>,
    max_body_chars: usize,
}

impl EmailAnalyzer {
    pub fn new(config: &Config) -> Result<Self> {
        let provider = HttpSemanticProvider::from_config(&config.provider)?
            .map(|provider| Arc::new(provider) as Arc<dyn SemanticProvider>);
        Ok(Self::with_provider(config, provider))
    }

    /// Inject a provider directly; used by tests and embedders with
    /// their own classifier transport.
    pub fn with_provider(config: &Config, provider: Option<Arc<dyn SemanticProvider>>) -> Self {
        EmailAnalyzer {
            extractor: IndicatorExtractor::new(),
            fusion: RiskFusionEngine::new(config.fusion.clone()),
            provider,
            max_body_chars: config.provider.max_body_chars,
        }
    }

    pub async fn analyze(
        &self,
        message: &EmailMessage,
        context: Option<&AnalysisContext>,
    ) -> Result<RiskAssessment, ValidationError> {
        self.analyze_indexed(message, context, 0).await
    }

    /// As `analyze`, reporting the caller-supplied batch index in
    /// validation errors.
    pub(crate) async fn analyze_indexed(
        &self,
        message: &EmailMessage,
        context: Option<&AnalysisContext>,
        index: usize,
    ) -> Result<RiskAssessment, ValidationError> {
        if !message.has_content() {
            return Err(ValidationError::MissingContent { index });
        }

        let started = Instant::now();
        log::info!(
            "Starting email analysis for sender: {}",
            message.sender.as_deref().unwrap_or("<unknown>")
        );

        let (deterministic, indicators) = self.extractor.extract(message);

        let summary = EmailSummary::from_message(message, self.max_body_chars);
        let semantic =
            classify_with_fallback(self.provider.as_deref(), &summary, &indicators).await;

        let outcome = self
            .fusion
            .fuse(&deterministic, &semantic, context, &message.body);

        let processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        log::info!(
            "Analysis completed in {processing_time_ms:.1}ms. Risk score: {}, Level: {:?}",
            outcome.score,
            outcome.level
        );

        Ok(RiskAssessment {
            score: outcome.score,
            level: outcome.level,
            is_phishing: outcome.is_phishing,
            sender: message.sender.clone(),
            subject: message.subject.clone(),
            deterministic,
            semantic: outcome.semantic,
            indicators,
            processing_time_ms,
        })
    }
}
