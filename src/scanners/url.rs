use crate::types::{Indicator, IndicatorKind};
use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

/// TLDs disproportionately used for phishing infrastructure.
const SUSPICIOUS_TLDS: &[&str] = &[
    ".tk", ".ml", ".ga", ".cf", ".top", ".click", ".download", ".stream", ".science",
    ".racing", ".review", ".date", ".faith", ".cricket",
];

/// Banking and payment domains treated as not-suspicious regardless of
/// other signals.
const LEGITIMATE_DOMAINS: &[&str] = &[
    "chase.com",
    "bankofamerica.com",
    "wellsfargo.com",
    "citi.com",
    "usbank.com",
    "pnc.com",
    "capitalone.com",
    "td.com",
    "regions.com",
    "suntrust.com",
    "ally.com",
    "americanexpress.com",
    "discover.com",
    "paypal.com",
    "venmo.com",
    "zelle.com",
];

// Cyrillic characters that render like Latin letters in hostnames.
const HOMOGRAPH_CHARS: &[char] = &['а', 'е', 'о', 'р', 'с', 'х', 'у'];

lazy_static! {
    static ref SUSPICIOUS_URL_PATTERNS: Vec<Regex> = vec![
        // IP-literal hosts
        Regex::new(r"(?i)[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}").unwrap(),
        // Known URL shorteners
        Regex::new(r"(?i)bit\.ly|tinyurl|short|url\.org|goo\.gl|t\.co").unwrap(),
        // Triple-hyphenated labels
        Regex::new(r"(?i)[a-z0-9]+-[a-z0-9]+-[a-z0-9]+\.[a-z]{2,}").unwrap(),
        // Long digit runs in the domain
        Regex::new(r"(?i)[0-9]{4,}\.[a-z]{2,}").unwrap(),
        // Mixed alphanumeric labels
        Regex::new(r"(?i)[a-z]+[0-9]+[a-z]+\.[a-z]{2,}").unwrap(),
        // Phishing keywords followed by a separator
        Regex::new(r"(?i)secure[^a-z]|verify[^a-z]|update[^a-z]|confirm[^a-z]").unwrap(),
    ];
    static ref PATH_KEYWORDS: Regex =
        Regex::new(r"login|signin|verify|update|confirm|secure").unwrap();
}

/// True when the domain sits under one of the allow-listed institutions.
pub fn is_legitimate_domain(domain: &str) -> bool {
    LEGITIMATE_DOMAINS
        .iter()
        .any(|legitimate| domain.ends_with(legitimate))
}

pub fn has_suspicious_tld(domain: &str) -> bool {
    SUSPICIOUS_TLDS.iter().any(|tld| domain.ends_with(tld))
}

pub struct UrlAnalyzer;

impl UrlAnalyzer {
    pub fn new() -> Self {
        UrlAnalyzer
    }

    /// Score one URL. Returns (is_suspicious, confidence, reasons);
    /// confidence contributions sum additively and cap at 1.0, and a URL
    /// is suspicious once accumulated confidence exceeds 0.3.
    pub fn analyze_url(&self, raw: &str) -> (bool, f64, Vec<String>) {
        let parsed = match Url::parse(raw) {
            Ok(parsed) => parsed,
            Err(_) => return (true, 0.9, vec!["Invalid URL format".to_string()]),
        };

        let domain = match parsed.host_str() {
            Some(host) => host.to_lowercase(),
            None => return (true, 0.9, vec!["Invalid URL format".to_string()]),
        };
        let path = parsed.path().to_lowercase();

        for legitimate in LEGITIMATE_DOMAINS {
            if domain.ends_with(legitimate) {
                return (false, 0.1, vec!["Legitimate domain".to_string()]);
            }
        }

        let mut confidence: f64 = 0.0;
        let mut reasons = Vec::new();

        for tld in SUSPICIOUS_TLDS {
            if domain.ends_with(tld) {
                confidence += 0.3;
                reasons.push(format!("Suspicious TLD: {tld}"));
            }
        }

        for pattern in SUSPICIOUS_URL_PATTERNS.iter() {
            if pattern.is_match(raw) {
                confidence += 0.25;
                reasons.push("Suspicious pattern detected".to_string());
            }
        }

        if domain.chars().any(|c| HOMOGRAPH_CHARS.contains(&c)) {
            confidence += 0.4;
            reasons.push("Potential homograph attack".to_string());
        }

        if raw.len() > 150 {
            confidence += 0.2;
            reasons.push("Unusually long URL".to_string());
        }

        let subdomain_count = domain.matches('.').count();
        if subdomain_count > 3 {
            confidence += 0.3;
            reasons.push(format!("Excessive subdomains ({subdomain_count})"));
        }

        if PATH_KEYWORDS.is_match(&path) {
            confidence += 0.2;
            reasons.push("Suspicious path keywords".to_string());
        }

        let confidence = confidence.min(1.0);
        (confidence > 0.3, confidence, reasons)
    }

    /// Flag every suspicious link as one indicator.
    pub fn scan(&self, links: &[String]) -> Result<Vec<Indicator>> {
        let mut indicators = Vec::new();

        for link in links {
            let (is_suspicious, confidence, reasons) = self.analyze_url(link);
            if is_suspicious {
                indicators.push(Indicator::new(
                    IndicatorKind::Url,
                    link.clone(),
                    reasons.join("; "),
                    confidence,
                    Some("email_body"),
                ));
            }
        }

        Ok(indicators)
    }
}

impl Default for UrlAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
