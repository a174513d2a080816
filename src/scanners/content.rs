use crate::types::{Indicator, IndicatorKind};
use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Social-engineering phrasing with per-pattern confidence. Matches
    /// are intentionally NOT deduplicated: repeated phrasing is itself a
    /// signal the fusion step gets to weigh.
    static ref SUSPICIOUS_PHRASES: Vec<(Regex, f64, &'static str)> = vec![
        (
            Regex::new(r"(?im)urgent(?:ly)?\s+(?:action|response|verification|update)").unwrap(),
            0.8,
            "Urgency manipulation tactic",
        ),
        (
            Regex::new(r"(?im)verify\s+(?:your\s+)?(?:account|identity|information)").unwrap(),
            0.7,
            "Verification request (common phishing tactic)",
        ),
        (
            Regex::new(r"(?im)suspend(?:ed)?\s+(?:your\s+)?account").unwrap(),
            0.9,
            "Account suspension threat",
        ),
        (
            Regex::new(r"(?im)click\s+(?:here|below|now|immediately)").unwrap(),
            0.6,
            "Immediate action request",
        ),
        (
            Regex::new(r"(?im)confirm\s+(?:your\s+)?(?:identity|details|information)").unwrap(),
            0.7,
            "Information confirmation request",
        ),
        (
            Regex::new(r"(?im)update\s+(?:your\s+)?(?:payment|billing|card)").unwrap(),
            0.8,
            "Payment information update request",
        ),
        (
            Regex::new(r"(?im)limited\s+time\s+(?:offer|deal)").unwrap(),
            0.5,
            "Limited time pressure",
        ),
        (
            Regex::new(r"(?im)act\s+(?:now|immediately|fast|quickly)").unwrap(),
            0.6,
            "Pressure to act quickly",
        ),
        (
            Regex::new(r"(?im)security\s+(?:alert|warning|notice)").unwrap(),
            0.7,
            "Security alert (potential false alarm)",
        ),
        (
            Regex::new(r"(?im)dear\s+(?:customer|client|user)").unwrap(),
            0.4,
            "Generic greeting (legitimate emails usually use names)",
        ),
        (
            Regex::new(r"(?im)\$[0-9,]+\s*(?:million|billion|dollars?)").unwrap(),
            0.9,
            "Large money offer (likely scam)",
        ),
        (
            Regex::new(r"(?im)congratulations.*?(?:won|winner|prize)").unwrap(),
            0.9,
            "Prize/lottery scam",
        ),
    ];

    /// Topic patterns targeting financial phishing specifically.
    static ref PHISHING_PATTERNS: Vec<(Regex, f64, &'static str)> = vec![
        (
            Regex::new(r"(?i)\bbank[^a-z]*(?:account|statement|alert)").unwrap(),
            0.7,
            "Banking-related content",
        ),
        (
            Regex::new(r"(?i)\b(?:paypal|venmo|zelle)[^a-z]*(?:account|payment)").unwrap(),
            0.8,
            "Payment service reference",
        ),
        (
            Regex::new(r"(?i)\b(?:social\s+security|ssn|tax\s+refund)").unwrap(),
            0.9,
            "Government/tax-related content",
        ),
        (
            Regex::new(r"(?i)\b(?:credit\s+card|debit\s+card)[^a-z]*(?:expir|suspend|block)")
                .unwrap(),
            0.8,
            "Credit card threat",
        ),
        (
            Regex::new(r"(?i)\b(?:amazon|apple|microsoft|google)[^a-z]*(?:account|subscription)")
                .unwrap(),
            0.6,
            "Tech company impersonation",
        ),
        (
            Regex::new(r"(?i)\$[0-9,]+(?:\.[0-9]{2})?.*(?:refund|reward|prize|lottery)").unwrap(),
            0.9,
            "Money offer",
        ),
        (
            Regex::new(r"(?i)\b(?:fbi|irs|federal|government)\b").unwrap(),
            0.8,
            "Government agency impersonation",
        ),
    ];
}

pub struct ContentAnalyzer;

impl ContentAnalyzer {
    pub fn new() -> Self {
        ContentAnalyzer
    }

    pub fn scan(&self, body: &str) -> Result<Vec<Indicator>> {
        let mut indicators = Vec::new();

        for (pattern, confidence, reason) in SUSPICIOUS_PHRASES.iter() {
            for found in pattern.find_iter(body) {
                indicators.push(Indicator::new(
                    IndicatorKind::Content,
                    found.as_str(),
                    *reason,
                    *confidence,
                    Some("email_body"),
                ));
            }
        }

        for (pattern, confidence, reason) in PHISHING_PATTERNS.iter() {
            for found in pattern.find_iter(body) {
                indicators.push(Indicator::new(
                    IndicatorKind::Content,
                    found.as_str(),
                    *reason,
                    *confidence,
                    Some("email_body"),
                ));
            }
        }

        Ok(indicators)
    }
}

impl Default for ContentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
