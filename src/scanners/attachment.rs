use crate::types::{Indicator, IndicatorKind};
use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;

/// Dangerous extensions with per-extension confidence. Archives score
/// lower since they are only a delivery wrapper.
const SUSPICIOUS_EXTENSIONS: &[(&str, f64)] = &[
    (".exe", 0.9),
    (".scr", 0.9),
    (".bat", 0.8),
    (".cmd", 0.8),
    (".com", 0.8),
    (".pif", 0.9),
    (".jar", 0.7),
    (".js", 0.6),
    (".vbs", 0.8),
    (".ps1", 0.7),
    (".zip", 0.4),
    (".rar", 0.4),
    (".7z", 0.4),
];

lazy_static! {
    static ref DOUBLE_EXTENSION: Regex = Regex::new(r"\.[a-z]{2,4}\.[a-z]{2,4}$").unwrap();
}

pub struct AttachmentAnalyzer;

impl AttachmentAnalyzer {
    pub fn new() -> Self {
        AttachmentAnalyzer
    }

    pub fn scan(&self, attachments: &[String]) -> Result<Vec<Indicator>> {
        let mut indicators = Vec::new();

        for attachment in attachments {
            let filename_lower = attachment.to_lowercase();

            for (ext, confidence) in SUSPICIOUS_EXTENSIONS {
                if filename_lower.ends_with(ext) {
                    indicators.push(Indicator::new(
                        IndicatorKind::Attachment,
                        attachment.clone(),
                        format!("Potentially dangerous file type: {ext}"),
                        *confidence,
                        Some("attachment"),
                    ));
                    break;
                }
            }

            if DOUBLE_EXTENSION.is_match(&filename_lower) {
                indicators.push(Indicator::new(
                    IndicatorKind::Attachment,
                    attachment.clone(),
                    "Suspicious double extension",
                    0.7,
                    Some("attachment"),
                ));
            }

            // Overlong names are an obfuscation tactic; truncate the
            // reported value so downstream consumers stay readable.
            if attachment.len() > 100 {
                let truncated: String = attachment.chars().take(50).collect();
                indicators.push(Indicator::new(
                    IndicatorKind::Attachment,
                    format!("{truncated}..."),
                    "Unusually long filename (potential obfuscation)",
                    0.5,
                    Some("attachment"),
                ));
            }
        }

        Ok(indicators)
    }
}

impl Default for AttachmentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
