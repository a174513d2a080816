use crate::types::{EmailMessage, Indicator, IndicatorKind};
use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SUSPICIOUS_SUBJECTS: Vec<(Regex, f64, &'static str)> = vec![
        (Regex::new(r"(?i)\bURGENT\b").unwrap(), 0.6, "Urgent subject line"),
        (
            Regex::new(r"(?i)\bIMMEDIATE\b").unwrap(),
            0.6,
            "Immediate action subject",
        ),
        (
            Regex::new(r"(?i)^(?:RE:|FW:)\s*$").unwrap(),
            0.7,
            "Empty reply/forward subject",
        ),
        (Regex::new(r"[!]{3,}").unwrap(), 0.5, "Excessive exclamation marks"),
        (
            Regex::new(r"\$[0-9,]+").unwrap(),
            0.7,
            "Money amount in subject",
        ),
        (
            Regex::new(r"(?i)\b(?:suspended|locked|blocked)\b").unwrap(),
            0.8,
            "Account threat in subject",
        ),
    ];
}

pub struct HeaderAnalyzer;

impl HeaderAnalyzer {
    pub fn new() -> Self {
        HeaderAnalyzer
    }

    pub fn scan(&self, message: &EmailMessage) -> Result<Vec<Indicator>> {
        let mut indicators = Vec::new();

        if message.message_id.as_deref().map_or(true, str::is_empty) {
            indicators.push(Indicator::new(
                IndicatorKind::Header,
                "Missing Message-ID",
                "Missing Message-ID header (unusual for legitimate emails)",
                0.4,
                Some("headers"),
            ));
        }

        if let Some(subject) = &message.subject {
            if !subject.is_empty() {
                for (pattern, confidence, reason) in SUSPICIOUS_SUBJECTS.iter() {
                    if pattern.is_match(subject) {
                        indicators.push(Indicator::new(
                            IndicatorKind::Header,
                            subject.clone(),
                            *reason,
                            *confidence,
                            Some("subject"),
                        ));
                    }
                }
            }
        }

        Ok(indicators)
    }
}

impl Default for HeaderAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
