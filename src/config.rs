use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fusion: FusionConfig,
    #[serde(default)]
    pub bulk: BulkConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

/// Weights and thresholds for the risk fusion engine. Threaded into the
/// engine at construction; never read from ambient globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    #[serde(default = "default_deterministic_weight")]
    pub deterministic_weight: f64,
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f64,
    #[serde(default = "default_high_risk_threshold")]
    pub high_risk_threshold: f64,
    #[serde(default = "default_medium_risk_threshold")]
    pub medium_risk_threshold: f64,
    // Inclusive hour bounds; submissions outside [start, end] draw a
    // small context penalty when a submission hour is supplied.
    #[serde(default = "default_business_hours_start")]
    pub business_hours_start: u32,
    #[serde(default = "default_business_hours_end")]
    pub business_hours_end: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

/// Semantic classifier service. When no endpoint is configured the
/// pipeline runs with the deterministic fallback only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_body_chars")]
    pub max_body_chars: usize,
}

fn default_deterministic_weight() -> f64 {
    0.6
}

fn default_semantic_weight() -> f64 {
    0.4
}

fn default_high_risk_threshold() -> f64 {
    70.0
}

fn default_medium_risk_threshold() -> f64 {
    40.0
}

fn default_business_hours_start() -> u32 {
    6
}

fn default_business_hours_end() -> u32 {
    22
}

fn default_concurrency() -> usize {
    5
}

fn default_max_batch_size() -> usize {
    50
}

fn default_provider_timeout() -> u64 {
    30
}

fn default_max_body_chars() -> usize {
    2000
}

impl Default for FusionConfig {
    fn default() -> Self {
        FusionConfig {
            deterministic_weight: default_deterministic_weight(),
            semantic_weight: default_semantic_weight(),
            high_risk_threshold: default_high_risk_threshold(),
            medium_risk_threshold: default_medium_risk_threshold(),
            business_hours_start: default_business_hours_start(),
            business_hours_end: default_business_hours_end(),
        }
    }
}

impl Default for BulkConfig {
    fn default() -> Self {
        BulkConfig {
            concurrency: default_concurrency(),
            max_batch_size: default_max_batch_size(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            fusion: FusionConfig::default(),
            bulk: BulkConfig::default(),
            provider: ProviderConfig {
                endpoint: None,
                api_key: None,
                timeout_seconds: default_provider_timeout(),
                max_body_chars: default_max_body_chars(),
            },
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.fusion.deterministic_weight, 0.6);
        assert_eq!(config.fusion.semantic_weight, 0.4);
        assert_eq!(config.fusion.high_risk_threshold, 70.0);
        assert_eq!(config.fusion.medium_risk_threshold, 40.0);
        assert_eq!(config.bulk.concurrency, 5);
        assert_eq!(config.bulk.max_batch_size, 50);
        assert_eq!(config.provider.max_body_chars, 2000);
        assert!(config.provider.endpoint.is_none());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "fusion:\n  high_risk_threshold: 75.0\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.fusion.high_risk_threshold, 75.0);
        assert_eq!(config.fusion.deterministic_weight, 0.6);
        assert_eq!(config.bulk.concurrency, 5);
    }

    #[test]
    fn test_round_trip_yaml() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.fusion.medium_risk_threshold, 40.0);
        assert_eq!(parsed.provider.timeout_seconds, 30);
    }
}
