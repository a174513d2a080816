use crate::types::AuthOutcome;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NUMERIC_RUN: Regex = Regex::new(r"[0-9]{4,}").unwrap();
}

/// Parse the Received-SPF header value. "pass" wins over the fail words,
/// so softfail results that also mention pass are treated as a pass.
pub fn parse_spf(received_spf: Option<&str>) -> AuthOutcome {
    let header = match received_spf {
        Some(value) if !value.is_empty() => value.to_lowercase(),
        _ => return AuthOutcome::Unknown,
    };

    if header.contains("pass") {
        AuthOutcome::Pass
    } else if ["fail", "softfail", "hardfail"]
        .iter()
        .any(|word| header.contains(word))
    {
        AuthOutcome::Fail
    } else {
        AuthOutcome::Unknown
    }
}

pub fn parse_dkim(authentication_results: Option<&str>) -> AuthOutcome {
    let results = match authentication_results {
        Some(value) if !value.is_empty() => value.to_lowercase(),
        _ => return AuthOutcome::Unknown,
    };

    if results.contains("dkim=pass") {
        AuthOutcome::Pass
    } else if results.contains("dkim=fail") || results.contains("dkim=none") {
        AuthOutcome::Fail
    } else {
        AuthOutcome::Unknown
    }
}

pub fn parse_dmarc(authentication_results: Option<&str>) -> AuthOutcome {
    let results = match authentication_results {
        Some(value) if !value.is_empty() => value.to_lowercase(),
        _ => return AuthOutcome::Unknown,
    };

    if results.contains("dmarc=pass") {
        AuthOutcome::Pass
    } else if results.contains("dmarc=fail") {
        AuthOutcome::Fail
    } else {
        AuthOutcome::Unknown
    }
}

/// Extract the domain part of an email address, lowercased.
pub fn extract_domain(email: &str) -> Option<String> {
    email
        .split('@')
        .nth(1)
        .map(|d| d.trim_end_matches('>').to_lowercase())
        .filter(|d| !d.is_empty())
}

/// Reputation for the sender's domain in [0,1]; 0.5 is neutral.
pub fn domain_reputation(domain: &str) -> (f64, Vec<String>) {
    let domain = domain.to_lowercase();
    let mut factors = Vec::new();
    let mut score: f64 = 0.5;

    if super::url::is_legitimate_domain(&domain) {
        score = 0.9;
        factors.push("Known legitimate banking domain".to_string());
    }

    if super::url::has_suspicious_tld(&domain) {
        score -= 0.3;
        factors.push("Suspicious TLD".to_string());
    }

    if NUMERIC_RUN.is_match(&domain) {
        score -= 0.2;
        factors.push("Contains suspicious numeric patterns".to_string());
    }

    (score.clamp(0.0, 1.0), factors)
}

/// Reputation of the sender address, if one is present and parseable.
pub fn sender_reputation(sender: Option<&str>) -> Option<f64> {
    let domain = extract_domain(sender?)?;
    let (score, factors) = domain_reputation(&domain);
    log::debug!("Sender reputation for {domain}: {score} ({factors:?})");
    Some(score)
}
