use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Round a score to one decimal place, matching the precision used in
/// reports and thresholds throughout the engine.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    Url,
    Email,
    Domain,
    Content,
    Header,
    Attachment,
}

/// One rule-based finding of suspicious content. Created by a scanner,
/// read-only everywhere downstream (including the annotation boundary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    #[serde(rename = "type")]
    pub kind: IndicatorKind,
    pub value: String,
    pub reason: String,
    pub confidence: f64,
    pub location: Option<String>,
}

impl Indicator {
    pub fn new(
        kind: IndicatorKind,
        value: impl Into<String>,
        reason: impl Into<String>,
        confidence: f64,
        location: Option<&str>,
    ) -> Self {
        Indicator {
            kind,
            value: value.into(),
            reason: reason.into(),
            confidence: confidence.clamp(0.0, 1.0),
            location: location.map(|s| s.to_string()),
        }
    }
}

/// Tri-state outcome of an email authentication mechanism. Unknown is
/// counted neither as a pass nor as a fail when scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthOutcome {
    Pass,
    Fail,
    Unknown,
}

impl AuthOutcome {
    pub fn is_known(&self) -> bool {
        !matches!(self, AuthOutcome::Unknown)
    }
}

/// Rule/heuristic-only risk score, produced once per email by the
/// extractor and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeterministicScore {
    pub spf: AuthOutcome,
    pub dkim: AuthOutcome,
    pub dmarc: AuthOutcome,
    pub sender_reputation: Option<f64>,
    pub indicator_counts: BTreeMap<IndicatorKind, u32>,
    pub score: f64,
}

impl DeterministicScore {
    /// Neutral result used when extraction degrades.
    pub fn neutral() -> Self {
        DeterministicScore {
            spf: AuthOutcome::Unknown,
            dkim: AuthOutcome::Unknown,
            dmarc: AuthOutcome::Unknown,
            sender_reputation: None,
            indicator_counts: BTreeMap::new(),
            score: 50.0,
        }
    }
}

/// Likelihood/confidence estimate supplied by the semantic classifier.
/// Contextual adjustment clones this value; the provider's original is
/// never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticScore {
    pub likelihood: f64,
    pub reasoning: String,
    #[serde(default)]
    pub key_concerns: Vec<String>,
    #[serde(default)]
    pub linguistic_patterns: Vec<String>,
    pub confidence: f64,
}

impl SemanticScore {
    pub fn new(likelihood: f64, reasoning: impl Into<String>, confidence: f64) -> Self {
        SemanticScore {
            likelihood: likelihood.clamp(0.0, 100.0),
            reasoning: reasoning.into(),
            key_concerns: Vec::new(),
            linguistic_patterns: Vec::new(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Medium is deliberately NOT flagged as phishing, only elevated risk.
    pub fn flags_phishing(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

/// Normalized email record supplied by the parsing collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailMessage {
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub reply_to: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub received_spf: Option<String>,
    #[serde(default)]
    pub authentication_results: Option<String>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub body: String,
}

impl EmailMessage {
    /// A message with neither sender nor body carries nothing to analyze;
    /// that is a contract violation on the caller's side.
    pub fn has_content(&self) -> bool {
        self.sender.is_some() || !self.body.trim().is_empty()
    }
}

/// Caller-supplied situational context. The submission hour is injected
/// rather than read from the wall clock so the business-hours rule stays
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContext {
    #[serde(default)]
    pub claimed_institution: Option<String>,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub submission_hour: Option<u32>,
}

/// One email to analyze, with optional context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub message: EmailMessage,
    #[serde(default)]
    pub context: Option<AnalysisContext>,
}

/// Final fused result for one email. Created exactly once by the fusion
/// engine; never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: f64,
    pub level: RiskLevel,
    pub is_phishing: bool,
    pub sender: Option<String>,
    pub subject: Option<String>,
    pub deterministic: DeterministicScore,
    pub semantic: SemanticScore,
    pub indicators: Vec<Indicator>,
    pub processing_time_ms: f64,
}
