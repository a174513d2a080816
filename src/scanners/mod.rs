pub mod address;
pub mod attachment;
pub mod content;
pub mod domain;
pub mod header;
pub mod url;

use crate::types::{
    round1, AuthOutcome, DeterministicScore, EmailMessage, Indicator, IndicatorKind,
};
use anyhow::Result;
use std::collections::BTreeMap;

const AUTH_WEIGHT: f64 = 30.0;
const REPUTATION_WEIGHT: f64 = 20.0;
const INDICATOR_PENALTY_CAP: f64 = 40.0;

/// Per-kind weight applied to indicator penalties; kinds without an
/// entry fall back to 0.7.
fn type_weight(kind: IndicatorKind) -> f64 {
    match kind {
        IndicatorKind::Url => 1.0,
        IndicatorKind::Email => 0.8,
        IndicatorKind::Attachment => 1.2,
        IndicatorKind::Content => 0.7,
        IndicatorKind::Header => 0.5,
        IndicatorKind::Domain => 0.7,
    }
}

/// Runs every rule-based scanner over a normalized message and folds the
/// findings into one deterministic score. Extraction never fails the
/// pipeline: a scanner error costs its findings, nothing more, and an
/// unexpected fault in aggregation degrades to the neutral result.
pub struct IndicatorExtractor {
    url: url::UrlAnalyzer,
    attachment: attachment::AttachmentAnalyzer,
    address: address::AddressAnalyzer,
    content: content::ContentAnalyzer,
    header: header::HeaderAnalyzer,
}

impl IndicatorExtractor {
    pub fn new() -> Self {
        IndicatorExtractor {
            url: url::UrlAnalyzer::new(),
            attachment: attachment::AttachmentAnalyzer::new(),
            address: address::AddressAnalyzer::new(),
            content: content::ContentAnalyzer::new(),
            header: header::HeaderAnalyzer::new(),
        }
    }

    pub fn extract(&self, message: &EmailMessage) -> (DeterministicScore, Vec<Indicator>) {
        match self.try_extract(message) {
            Ok(result) => result,
            Err(e) => {
                log::error!("Deterministic extraction failed: {e}; returning neutral score");
                (DeterministicScore::neutral(), Vec::new())
            }
        }
    }

    fn try_extract(&self, message: &EmailMessage) -> Result<(DeterministicScore, Vec<Indicator>)> {
        let spf = domain::parse_spf(message.received_spf.as_deref());
        let dkim = domain::parse_dkim(message.authentication_results.as_deref());
        let dmarc = domain::parse_dmarc(message.authentication_results.as_deref());
        let sender_reputation = domain::sender_reputation(message.sender.as_deref());

        let mut indicators = Vec::new();
        let scans: [(&str, Result<Vec<Indicator>>); 5] = [
            ("url", self.url.scan(&message.links)),
            ("attachment", self.attachment.scan(&message.attachments)),
            ("address", self.address.scan(message)),
            ("content", self.content.scan(&message.body)),
            ("header", self.header.scan(message)),
        ];
        for (name, outcome) in scans {
            match outcome {
                Ok(found) => indicators.extend(found),
                Err(e) => log::warn!("{name} scanner failed: {e}; skipping its findings"),
            }
        }

        let score = compute_score(spf, dkim, dmarc, sender_reputation, &indicators);

        let mut indicator_counts: BTreeMap<IndicatorKind, u32> = BTreeMap::new();
        for indicator in &indicators {
            *indicator_counts.entry(indicator.kind).or_insert(0) += 1;
        }

        log::info!(
            "Deterministic checks completed. Score: {score}, Indicators: {}",
            indicators.len()
        );

        Ok((
            DeterministicScore {
                spf,
                dkim,
                dmarc,
                sender_reputation,
                indicator_counts,
                score,
            },
            indicators,
        ))
    }
}

impl Default for IndicatorExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Neutral baseline 50, shifted by authentication results, sender
/// reputation and the capped indicator penalty, clamped to [0,100].
/// Higher means riskier.
fn compute_score(
    spf: AuthOutcome,
    dkim: AuthOutcome,
    dmarc: AuthOutcome,
    sender_reputation: Option<f64>,
    indicators: &[Indicator],
) -> f64 {
    let mut score = 50.0;

    let mut auth_checks = 0u32;
    let mut auth_penalties = 0u32;
    for outcome in [spf, dkim, dmarc] {
        if outcome.is_known() {
            auth_checks += 1;
            if outcome == AuthOutcome::Fail {
                auth_penalties += 1;
            }
        }
    }
    if auth_checks > 0 {
        let auth_score = f64::from(auth_checks - auth_penalties) / f64::from(auth_checks);
        score += (auth_score - 0.5) * AUTH_WEIGHT;
    }

    if let Some(reputation) = sender_reputation {
        score += (reputation - 0.5) * REPUTATION_WEIGHT;
    }

    if !indicators.is_empty() {
        let mut indicator_penalty = 0.0;
        for indicator in indicators {
            indicator_penalty += indicator.confidence * type_weight(indicator.kind) * 10.0;
        }
        score += indicator_penalty.min(INDICATOR_PENALTY_CAP);
    }

    round1(score.clamp(0.0, 100.0))
}
