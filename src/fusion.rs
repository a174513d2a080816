use crate::config::FusionConfig;
use crate::types::{round1, AnalysisContext, DeterministicScore, RiskLevel, SemanticScore};

const CRITICAL_THRESHOLD: f64 = 90.0;
const LOW_SEMANTIC_CONFIDENCE: f64 = 0.5;

/// Result of blending the two score sources. `semantic` is the
/// (possibly context-adjusted) clone placed in the final assessment; the
/// provider's original value stays with the caller for audit.
#[derive(Debug, Clone)]
pub struct FusionOutcome {
    pub score: f64,
    pub level: RiskLevel,
    pub is_phishing: bool,
    pub semantic: SemanticScore,
}

/// Blends the deterministic and semantic scores into one calibrated risk
/// score and category. The deterministic path is the trust anchor: any
/// malformed semantic input degrades to deterministic-only
/// classification instead of failing the request.
pub struct RiskFusionEngine {
    config: FusionConfig,
}

impl RiskFusionEngine {
    pub fn new(config: FusionConfig) -> Self {
        RiskFusionEngine { config }
    }

    pub fn fuse(
        &self,
        deterministic: &DeterministicScore,
        semantic: &SemanticScore,
        context: Option<&AnalysisContext>,
        body: &str,
    ) -> FusionOutcome {
        let mut adjusted = semantic.clone();

        let blended = if semantic.likelihood.is_finite() && semantic.confidence.is_finite() {
            let (wd, wg) = self.effective_weights(semantic.confidence);
            let mut blended = deterministic.score * wd + semantic.likelihood * wg;

            if let Some(context) = context {
                blended += self.apply_context(context, body, &mut adjusted);
            }
            blended
        } else {
            log::error!(
                "Malformed semantic score (likelihood={}, confidence={}); falling back to deterministic-only classification",
                semantic.likelihood,
                semantic.confidence
            );
            deterministic.score
        };

        let score = round1(blended.clamp(0.0, 100.0));
        let (level, is_phishing) = self.classify(score);

        log::info!(
            "Final risk calculation - Deterministic: {:.1}, Semantic: {:.1}, Final: {score:.1}, Level: {level:?}, Phishing: {is_phishing}",
            deterministic.score,
            semantic.likelihood,
        );

        FusionOutcome {
            score,
            level,
            is_phishing,
            semantic: adjusted,
        }
    }

    /// When the semantic model reports low confidence, lean harder on
    /// the deterministic side.
    fn effective_weights(&self, semantic_confidence: f64) -> (f64, f64) {
        if semantic_confidence < LOW_SEMANTIC_CONFIDENCE {
            let wd = (self.config.deterministic_weight + 0.2).min(0.8);
            (wd, 1.0 - wd)
        } else {
            (
                self.config.deterministic_weight,
                self.config.semantic_weight,
            )
        }
    }

    /// Additive contextual deltas on the blended score. Each applied
    /// delta appends an audit note to the adjusted semantic reasoning so
    /// the amount and reason stay retrievable.
    fn apply_context(
        &self,
        context: &AnalysisContext,
        body: &str,
        adjusted: &mut SemanticScore,
    ) -> f64 {
        let body_lower = body.to_lowercase();
        let mut delta = 0.0;

        if let Some(institution) = &context.claimed_institution {
            let institution = institution.to_lowercase();
            if !institution.is_empty() && body_lower.contains(&institution) {
                delta += 5.0;
                adjusted
                    .reasoning
                    .push_str(" (Adjusted +5.0: claimed institution named in body, potential targeted attack)");
            }
        }

        if let Some(hour) = context.submission_hour {
            if hour < self.config.business_hours_start || hour > self.config.business_hours_end {
                delta += 3.0;
                adjusted
                    .reasoning
                    .push_str(" (Adjusted +3.0: submitted outside business hours)");
            }
        }

        if context.account_type.as_deref() == Some("business") && body_lower.contains("personal") {
            delta += 5.0;
            adjusted
                .reasoning
                .push_str(" (Adjusted +5.0: business account received personal banking content)");
        }

        delta
    }

    fn classify(&self, score: f64) -> (RiskLevel, bool) {
        let level = if score >= CRITICAL_THRESHOLD {
            RiskLevel::Critical
        } else if score >= self.config.high_risk_threshold {
            RiskLevel::High
        } else if score >= self.config.medium_risk_threshold {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };
        (level, level.flags_phishing())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> RiskFusionEngine {
        RiskFusionEngine::new(FusionConfig::default())
    }

    fn deterministic(score: f64) -> DeterministicScore {
        DeterministicScore {
            score,
            ..DeterministicScore::neutral()
        }
    }

    fn semantic(likelihood: f64, confidence: f64) -> SemanticScore {
        SemanticScore::new(likelihood, "test reasoning", confidence)
    }

    #[test]
    fn test_confident_blend() {
        // 80*0.6 + 20*0.4 = 56.0, Medium, not flagged
        let outcome = engine().fuse(&deterministic(80.0), &semantic(20.0, 0.9), None, "");
        assert_eq!(outcome.score, 56.0);
        assert_eq!(outcome.level, RiskLevel::Medium);
        assert!(!outcome.is_phishing);
    }

    #[test]
    fn test_low_confidence_reweights() {
        // Wd' = min(0.8, 0.6+0.2) = 0.8: 80*0.8 + 95*0.2 = 83.0, High
        let outcome = engine().fuse(&deterministic(80.0), &semantic(95.0, 0.3), None, "");
        assert_eq!(outcome.score, 83.0);
        assert_eq!(outcome.level, RiskLevel::High);
        assert!(outcome.is_phishing);
    }

    #[test]
    fn test_classification_boundaries() {
        let engine = engine();
        let cases = [
            (39.9, RiskLevel::Low, false),
            (40.0, RiskLevel::Medium, false),
            (69.9, RiskLevel::Medium, false),
            (70.0, RiskLevel::High, true),
            (89.9, RiskLevel::High, true),
            (90.0, RiskLevel::Critical, true),
        ];
        for (score, expected_level, expected_phishing) in cases {
            let (level, is_phishing) = engine.classify(score);
            assert_eq!(level, expected_level, "score {score}");
            assert_eq!(is_phishing, expected_phishing, "score {score}");
        }
    }

    #[test]
    fn test_deterministic_inputs_give_identical_outputs() {
        let engine = engine();
        let det = deterministic(64.2);
        let sem = semantic(71.0, 0.8);
        let context = AnalysisContext {
            claimed_institution: Some("Chase".to_string()),
            account_type: None,
            submission_hour: Some(23),
        };
        let body = "Your Chase account needs review.";

        let first = engine.fuse(&det, &sem, Some(&context), body);
        let second = engine.fuse(&det, &sem, Some(&context), body);
        assert_eq!(first.score, second.score);
        assert_eq!(first.semantic, second.semantic);
    }

    #[test]
    fn test_institution_adjustment_with_audit_note() {
        let context = AnalysisContext {
            claimed_institution: Some("Chase".to_string()),
            ..Default::default()
        };
        let outcome = engine().fuse(
            &deterministic(50.0),
            &semantic(50.0, 0.9),
            Some(&context),
            "Dear customer, your Chase balance is at risk.",
        );
        assert_eq!(outcome.score, 55.0);
        assert!(outcome.semantic.reasoning.contains("+5.0"));
        assert!(outcome.semantic.reasoning.contains("claimed institution"));
    }

    #[test]
    fn test_off_hours_adjustment_uses_injected_hour() {
        let after_hours = AnalysisContext {
            submission_hour: Some(3),
            ..Default::default()
        };
        let outcome = engine().fuse(&deterministic(50.0), &semantic(50.0, 0.9), Some(&after_hours), "");
        assert_eq!(outcome.score, 53.0);

        let mid_day = AnalysisContext {
            submission_hour: Some(14),
            ..Default::default()
        };
        let outcome = engine().fuse(&deterministic(50.0), &semantic(50.0, 0.9), Some(&mid_day), "");
        assert_eq!(outcome.score, 50.0);
        assert!(!outcome.semantic.reasoning.contains("Adjusted"));
    }

    #[test]
    fn test_business_account_personal_content() {
        let context = AnalysisContext {
            account_type: Some("business".to_string()),
            ..Default::default()
        };
        let outcome = engine().fuse(
            &deterministic(50.0),
            &semantic(50.0, 0.9),
            Some(&context),
            "Manage your personal banking online.",
        );
        assert_eq!(outcome.score, 55.0);
    }

    #[test]
    fn test_adjustments_stack_and_clamp() {
        let context = AnalysisContext {
            claimed_institution: Some("Chase".to_string()),
            account_type: Some("business".to_string()),
            submission_hour: Some(23),
        };
        let outcome = engine().fuse(
            &deterministic(99.0),
            &semantic(99.0, 0.9),
            Some(&context),
            "chase personal banking",
        );
        // 99 + 13 would exceed 100; the clamp holds
        assert_eq!(outcome.score, 100.0);
        assert_eq!(outcome.level, RiskLevel::Critical);
    }

    #[test]
    fn test_original_semantic_score_not_mutated() {
        let sem = semantic(50.0, 0.9);
        let context = AnalysisContext {
            submission_hour: Some(2),
            ..Default::default()
        };
        let outcome = engine().fuse(&deterministic(50.0), &sem, Some(&context), "");
        assert_eq!(sem.reasoning, "test reasoning");
        assert!(outcome.semantic.reasoning.len() > sem.reasoning.len());
    }

    #[test]
    fn test_malformed_semantic_degrades_to_deterministic() {
        let mut sem = semantic(50.0, 0.9);
        sem.likelihood = f64::NAN;
        let outcome = engine().fuse(&deterministic(72.0), &sem, None, "");
        assert_eq!(outcome.score, 72.0);
        assert_eq!(outcome.level, RiskLevel::High);
    }
}
