use crate::scanners::domain::extract_domain;
use crate::scanners::url::UrlAnalyzer;
use crate::types::{EmailMessage, Indicator, IndicatorKind};
use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;

const FREE_PROVIDERS: &[&str] = &[
    "gmail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "aol.com",
];

lazy_static! {
    static ref ADDRESS_FORMAT: Regex =
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap();
    static ref RANDOM_LOCAL_PART: Regex = Regex::new(r"^[a-z0-9]{15,}$").unwrap();
}

pub struct AddressAnalyzer {
    url_analyzer: UrlAnalyzer,
}

impl AddressAnalyzer {
    pub fn new() -> Self {
        AddressAnalyzer {
            url_analyzer: UrlAnalyzer::new(),
        }
    }

    /// Score one address. Domain signals reuse the URL analysis on a
    /// synthetic `http://domain` URL, scaled down since an address domain
    /// is weaker evidence than a clicked link.
    pub fn is_suspicious_email(&self, email: &str) -> (bool, f64, Vec<String>) {
        if !ADDRESS_FORMAT.is_match(email) {
            return (true, 0.9, vec!["Invalid email format".to_string()]);
        }

        let domain = match extract_domain(email) {
            Some(domain) => domain,
            None => return (true, 0.8, vec!["Cannot extract domain".to_string()]),
        };

        let mut confidence = 0.0;
        let mut reasons = Vec::new();

        let local_part = email.split('@').next().unwrap_or_default().to_lowercase();
        if local_part.len() > 20 || RANDOM_LOCAL_PART.is_match(&local_part) {
            confidence += 0.3;
            reasons.push("Suspicious local part pattern".to_string());
        }

        let dummy_url = format!("http://{domain}");
        let (url_suspicious, url_confidence, url_reasons) =
            self.url_analyzer.analyze_url(&dummy_url);
        if url_suspicious {
            confidence += url_confidence * 0.8;
            reasons.extend(url_reasons.into_iter().map(|reason| format!("Domain: {reason}")));
        }

        if FREE_PROVIDERS.contains(&domain.as_str()) {
            confidence += 0.1;
            reasons.push("Free email provider".to_string());
        }

        let confidence = confidence.min(1.0);
        (confidence > 0.3, confidence, reasons)
    }

    pub fn scan(&self, message: &EmailMessage) -> Result<Vec<Indicator>> {
        let mut indicators = Vec::new();

        if let Some(sender) = &message.sender {
            let (is_suspicious, confidence, reasons) = self.is_suspicious_email(sender);
            if is_suspicious {
                indicators.push(Indicator::new(
                    IndicatorKind::Email,
                    sender.clone(),
                    reasons.join("; "),
                    confidence,
                    Some("sender"),
                ));
            }
        }

        if let Some(reply_to) = &message.reply_to {
            if message.sender.as_deref() != Some(reply_to.as_str()) {
                let (is_suspicious, confidence, reasons) = self.is_suspicious_email(reply_to);
                if is_suspicious {
                    indicators.push(Indicator::new(
                        IndicatorKind::Email,
                        reply_to.clone(),
                        reasons.join("; "),
                        confidence,
                        Some("reply_to"),
                    ));
                }

                let sender_domain = message.sender.as_deref().and_then(extract_domain);
                let reply_domain = extract_domain(reply_to);
                if let (Some(sender_domain), Some(reply_domain)) = (sender_domain, reply_domain) {
                    if sender_domain != reply_domain {
                        let sender = message.sender.as_deref().unwrap_or_default();
                        indicators.push(Indicator::new(
                            IndicatorKind::Email,
                            format!("Sender: {sender}, Reply-to: {reply_to}"),
                            "Sender and reply-to domains differ",
                            0.6,
                            Some("headers"),
                        ));
                    }
                }
            }
        }

        Ok(indicators)
    }
}

impl Default for AddressAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
