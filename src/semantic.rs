use crate::config::ProviderConfig;
use crate::types::{EmailMessage, Indicator, SemanticScore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Bounded projection of an email sent to the semantic classifier. The
/// body is truncated so the request stays within provider limits.
#[derive(Debug, Clone, Serialize)]
pub struct EmailSummary {
    pub sender: Option<String>,
    pub reply_to: Option<String>,
    pub subject: Option<String>,
    pub links: Vec<String>,
    pub attachments: Vec<String>,
    pub body_excerpt: String,
}

impl EmailSummary {
    pub fn from_message(message: &EmailMessage, max_body_chars: usize) -> Self {
        EmailSummary {
            sender: message.sender.clone(),
            reply_to: message.reply_to.clone(),
            subject: message.subject.clone(),
            links: message.links.clone(),
            attachments: message.attachments.clone(),
            body_excerpt: message.body.chars().take(max_body_chars).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct IndicatorSummary<'a> {
    #[serde(rename = "type")]
    kind: crate::types::IndicatorKind,
    value: &'a str,
    reason: &'a str,
    confidence: f64,
}

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    email: &'a EmailSummary,
    prior_indicators: Vec<IndicatorSummary<'a>>,
}

/// Narrow seam to the external semantic classifier. Implementations may
/// fail; the pipeline converts failures into the deterministic fallback
/// via [`classify_with_fallback`].
#[async_trait]
pub trait SemanticProvider: Send + Sync {
    async fn classify(
        &self,
        summary: &EmailSummary,
        priors: &[Indicator],
    ) -> Result<SemanticScore>;
}

/// HTTP-backed provider. The request carries the bounded email summary
/// plus the prior rule-based findings; the response is the classifier's
/// JSON verdict.
pub struct HttpSemanticProvider {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpSemanticProvider {
    /// Returns None when no endpoint is configured; the pipeline then
    /// runs on the deterministic fallback alone.
    pub fn from_config(config: &ProviderConfig) -> Result<Option<Self>> {
        let endpoint = match &config.endpoint {
            Some(endpoint) if !endpoint.is_empty() => endpoint.clone(),
            _ => {
                log::warn!("No semantic classifier endpoint configured; semantic analysis will be unavailable");
                return Ok(None);
            }
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("phishscore/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build semantic provider HTTP client")?;

        Ok(Some(HttpSemanticProvider {
            client,
            endpoint,
            api_key: config.api_key.clone(),
        }))
    }
}

#[async_trait]
impl SemanticProvider for HttpSemanticProvider {
    async fn classify(
        &self,
        summary: &EmailSummary,
        priors: &[Indicator],
    ) -> Result<SemanticScore> {
        let request = ClassifyRequest {
            email: summary,
            prior_indicators: priors
                .iter()
                .map(|indicator| IndicatorSummary {
                    kind: indicator.kind,
                    value: &indicator.value,
                    reason: &indicator.reason,
                    confidence: indicator.confidence,
                })
                .collect(),
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder
            .send()
            .await
            .context("Semantic classifier request failed")?
            .error_for_status()
            .context("Semantic classifier returned an error status")?;

        let body = response
            .text()
            .await
            .context("Failed to read semantic classifier response")?;

        let score = parse_response(&body);
        log::info!(
            "Semantic analysis completed. Phishing likelihood: {}%",
            score.likelihood
        );
        Ok(score)
    }
}

/// Parse the classifier's verdict, tolerating markdown fences and loosely
/// typed fields. Non-JSON bodies fall through to best-effort text
/// extraction before giving up.
pub fn parse_response(raw: &str) -> SemanticScore {
    let mut cleaned = raw.trim();
    if let Some(stripped) = cleaned.strip_prefix("```json") {
        cleaned = stripped;
    }
    if let Some(stripped) = cleaned.strip_suffix("```") {
        cleaned = stripped;
    }

    let value: Value = match serde_json::from_str(cleaned.trim()) {
        Ok(value) => value,
        Err(e) => {
            log::error!("Failed to parse semantic classifier JSON response: {e}");
            return extract_from_text(raw);
        }
    };

    let likelihood = value
        .get("phishing_likelihood")
        .and_then(Value::as_f64)
        .unwrap_or(50.0)
        .clamp(0.0, 100.0);

    let reasoning = value
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or("No reasoning provided")
        .to_string();

    let key_concerns = string_list(value.get("key_concerns"));
    let linguistic_patterns = string_list(value.get("linguistic_patterns"));

    let confidence = value
        .get("model_confidence")
        .and_then(Value::as_f64)
        .unwrap_or(0.5)
        .clamp(0.0, 1.0);

    SemanticScore {
        likelihood,
        reasoning,
        key_concerns,
        linguistic_patterns,
        confidence,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

lazy_static! {
    static ref SCORE_IN_TEXT: Regex =
        Regex::new(r"(?i)(?:score|likelihood|risk).*?([0-9]{1,3})").unwrap();
    static ref CONCERN_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)urgent[^.]*\.?").unwrap(),
        Regex::new(r"(?i)suspicious[^.]*\.?").unwrap(),
        Regex::new(r"(?i)phishing[^.]*\.?").unwrap(),
        Regex::new(r"(?i)credential[^.]*\.?").unwrap(),
        Regex::new(r"(?i)malicious[^.]*\.?").unwrap(),
    ];
}

/// Last-resort parse of a prose response: scrape a score and a few
/// concern phrases, keep the head of the text as reasoning, and mark the
/// result low-confidence.
fn extract_from_text(raw: &str) -> SemanticScore {
    let likelihood = SCORE_IN_TEXT
        .captures(raw)
        .and_then(|captures| captures.get(1))
        .and_then(|group| group.as_str().parse::<f64>().ok())
        .unwrap_or(50.0)
        .clamp(0.0, 100.0);

    let mut key_concerns = Vec::new();
    for pattern in CONCERN_PATTERNS.iter() {
        for found in pattern.find_iter(raw).take(2) {
            key_concerns.push(found.as_str().to_string());
        }
    }
    key_concerns.truncate(5);

    let reasoning = if raw.chars().count() > 500 {
        let head: String = raw.chars().take(500).collect();
        format!("{head}...")
    } else {
        raw.to_string()
    };

    SemanticScore {
        likelihood,
        reasoning,
        key_concerns,
        linguistic_patterns: Vec::new(),
        confidence: 0.3,
    }
}

/// Core-side boundary: the fusion engine always receives a well-formed
/// `SemanticScore`, no matter what the provider did.
pub async fn classify_with_fallback(
    provider: Option<&dyn SemanticProvider>,
    summary: &EmailSummary,
    priors: &[Indicator],
) -> SemanticScore {
    if let Some(provider) = provider {
        match provider.classify(summary, priors).await {
            Ok(score) => return score,
            Err(e) => {
                log::warn!("Semantic provider failed: {e}; using deterministic fallback");
            }
        }
    }
    fallback_score(priors)
}

/// Deterministic stand-in when the classifier is unavailable: lean on
/// any high-confidence rule findings, else stay neutral at very low
/// confidence.
pub fn fallback_score(priors: &[Indicator]) -> SemanticScore {
    let high_confidence: Vec<&Indicator> =
        priors.iter().filter(|i| i.confidence > 0.7).collect();

    if high_confidence.is_empty() {
        let mut score = SemanticScore::new(
            50.0,
            "Unable to perform semantic analysis (classifier unavailable)",
            0.1,
        );
        score.key_concerns = vec!["Analysis incomplete".to_string()];
        return score;
    }

    let likelihood = (50.0 + 10.0 * high_confidence.len() as f64).min(80.0);
    let mut score = SemanticScore::new(
        likelihood,
        "Analysis based on deterministic indicators only (classifier unavailable)",
        0.4,
    );
    score.key_concerns = high_confidence
        .iter()
        .take(3)
        .map(|indicator| format!("Deterministic indicator: {}", indicator.reason))
        .collect();
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IndicatorKind;

    fn indicator(confidence: f64, reason: &str) -> Indicator {
        Indicator::new(IndicatorKind::Url, "value", reason, confidence, None)
    }

    #[test]
    fn test_parse_well_formed_response() {
        let raw = r#"{
            "phishing_likelihood": 85,
            "reasoning": "urgent language and credential request",
            "key_concerns": ["urgency", "credential harvesting"],
            "linguistic_patterns": ["imperative verbs"],
            "model_confidence": 0.92
        }"#;
        let score = parse_response(raw);
        assert_eq!(score.likelihood, 85.0);
        assert_eq!(score.confidence, 0.92);
        assert_eq!(score.key_concerns.len(), 2);
        assert_eq!(score.linguistic_patterns, vec!["imperative verbs".to_string()]);
    }

    #[test]
    fn test_parse_strips_markdown_fences() {
        let raw = "```json\n{\"phishing_likelihood\": 40, \"reasoning\": \"ok\", \"model_confidence\": 0.8}\n```";
        let score = parse_response(raw);
        assert_eq!(score.likelihood, 40.0);
        assert_eq!(score.reasoning, "ok");
    }

    #[test]
    fn test_parse_clamps_out_of_range_fields() {
        let raw = r#"{"phishing_likelihood": 250, "reasoning": "x", "model_confidence": 3.0}"#;
        let score = parse_response(raw);
        assert_eq!(score.likelihood, 100.0);
        assert_eq!(score.confidence, 1.0);
    }

    #[test]
    fn test_parse_defaults_for_missing_fields() {
        let score = parse_response("{}");
        assert_eq!(score.likelihood, 50.0);
        assert_eq!(score.reasoning, "No reasoning provided");
        assert_eq!(score.confidence, 0.5);
        assert!(score.key_concerns.is_empty());
    }

    #[test]
    fn test_parse_coerces_non_list_concerns() {
        let raw = r#"{"phishing_likelihood": 60, "reasoning": "x", "key_concerns": "not a list", "model_confidence": 0.6}"#;
        let score = parse_response(raw);
        assert!(score.key_concerns.is_empty());
    }

    #[test]
    fn test_text_fallback_scrapes_score_and_concerns() {
        let raw = "The phishing likelihood is 75 out of 100. Urgent tone and a credential request were observed.";
        let score = parse_response(raw);
        assert_eq!(score.likelihood, 75.0);
        assert_eq!(score.confidence, 0.3);
        assert!(!score.key_concerns.is_empty());
        assert!(score.key_concerns.len() <= 5);
    }

    #[test]
    fn test_text_fallback_truncates_reasoning() {
        let raw = format!("risk 90 {}", "a".repeat(600));
        let score = parse_response(&raw);
        assert!(score.reasoning.ends_with("..."));
        assert_eq!(score.reasoning.chars().count(), 503);
    }

    #[test]
    fn test_fallback_neutral_without_high_confidence_priors() {
        let score = fallback_score(&[indicator(0.5, "weak")]);
        assert_eq!(score.likelihood, 50.0);
        assert_eq!(score.confidence, 0.1);
        assert_eq!(score.key_concerns, vec!["Analysis incomplete".to_string()]);
    }

    #[test]
    fn test_fallback_scales_with_high_confidence_priors() {
        let priors = vec![
            indicator(0.8, "a"),
            indicator(0.9, "b"),
            indicator(0.95, "c"),
            indicator(0.2, "ignored"),
        ];
        let score = fallback_score(&priors);
        // 50 + 10 * 3 = 80, capped there
        assert_eq!(score.likelihood, 80.0);
        assert_eq!(score.confidence, 0.4);
        assert_eq!(score.key_concerns.len(), 3);
        assert!(score.key_concerns[0].starts_with("Deterministic indicator: "));
    }

    #[test]
    fn test_fallback_caps_at_eighty() {
        let priors: Vec<Indicator> = (0..8).map(|_| indicator(0.9, "x")).collect();
        let score = fallback_score(&priors);
        assert_eq!(score.likelihood, 80.0);
    }

    #[tokio::test]
    async fn test_classify_with_fallback_without_provider() {
        let summary = EmailSummary::from_message(&EmailMessage::default(), 2000);
        let score = classify_with_fallback(None, &summary, &[]).await;
        assert_eq!(score.likelihood, 50.0);
        assert_eq!(score.confidence, 0.1);
    }

    #[test]
    fn test_summary_truncates_body() {
        let message = EmailMessage {
            body: "x".repeat(5000),
            ..Default::default()
        };
        let summary = EmailSummary::from_message(&message, 2000);
        assert_eq!(summary.body_excerpt.chars().count(), 2000);
    }
}
