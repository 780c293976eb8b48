//! Confidence scoring and the final decision record.
//!
//! Confidence is a deterministic function of the validation result and
//! the correction metadata. It is distinct from the validation score:
//! the score measures the command, confidence measures how much to trust
//! handing it to an operator.

use scanvet_core::{
    Complexity, CorrectionMeta, Decision, DecisionMetadata, ValidationResult,
};
use serde::{Deserialize, Serialize};

// Fixed confidence modifiers. Band bonuses apply to valid commands only;
// exactly one of them fires per decision.
const EXCELLENT_BONUS: f64 = 0.2;
const GOOD_BONUS: f64 = 0.1;
const MARGINAL_BONUS: f64 = 0.05;
const INVALID_PENALTY: f64 = 0.2;
const ERROR_PENALTY: f64 = 0.2;
const WARNING_PENALTY: f64 = 0.05;
const COMPLEXITY_ADJUSTMENT: f64 = 0.1;

/// Tunable confidence knobs.
#[derive(Debug, Clone, Copy)]
pub struct ConfidencePolicy {
    /// Starting confidence before any modifier.
    pub base: f64,
    /// Validation score at or above which the top bonus applies.
    pub excellent_score: f64,
    /// Validation score at or above which the middle bonus applies.
    pub good_score: f64,
    /// Penalty per retry beyond the first attempt.
    pub retry_penalty: f64,
    /// Cap on the total retry penalty.
    pub retry_penalty_cap: f64,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            base: 0.7,
            excellent_score: 0.9,
            good_score: 0.7,
            retry_penalty: 0.05,
            retry_penalty_cap: 0.15,
        }
    }
}

/// What an operator should do with a decided command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    SafeToRun,
    ReviewFirst,
    ModifyFirst,
    DoNotRun,
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SafeToRun => write!(f, "safe to run"),
            Self::ReviewFirst => write!(f, "review first"),
            Self::ModifyFirst => write!(f, "modify first"),
            Self::DoNotRun => write!(f, "do not run"),
        }
    }
}

/// Maps a confidence value onto an operator recommendation.
///
/// # Examples
///
/// ```
/// use scanvet_pipeline::{Recommendation, recommend};
///
/// assert_eq!(recommend(0.95), Recommendation::SafeToRun);
/// assert_eq!(recommend(0.75), Recommendation::ReviewFirst);
/// assert_eq!(recommend(0.55), Recommendation::ModifyFirst);
/// assert_eq!(recommend(0.2), Recommendation::DoNotRun);
/// ```
pub fn recommend(confidence: f64) -> Recommendation {
    if confidence >= 0.85 {
        Recommendation::SafeToRun
    } else if confidence >= 0.7 {
        Recommendation::ReviewFirst
    } else if confidence >= 0.5 {
        Recommendation::ModifyFirst
    } else {
        Recommendation::DoNotRun
    }
}

/// Produces the final [`Decision`] for a validated command.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionEngine {
    policy: ConfidencePolicy,
}

impl DecisionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: ConfidencePolicy) -> Self {
        Self { policy }
    }

    /// Scores confidence and assembles the decision record.
    pub fn decide(
        &self,
        command: &str,
        validation: &ValidationResult,
        meta: &CorrectionMeta,
    ) -> Decision {
        let confidence = self.confidence(validation, meta);
        let explanation = self.explanation(validation, meta);

        Decision {
            command: command.to_string(),
            confidence,
            explanation,
            validation: validation.clone(),
            metadata: DecisionMetadata {
                complexity: meta.complexity,
                attempts: meta.attempts,
                corrected: meta.corrected,
                validation_score: validation.score,
                has_errors: validation.has_errors(),
                has_warnings: validation.has_warnings(),
            },
        }
    }

    /// Deterministic confidence in `[0, 1]`.
    pub fn confidence(&self, validation: &ValidationResult, meta: &CorrectionMeta) -> f64 {
        let p = &self.policy;
        let mut confidence = p.base;

        if validation.is_valid {
            confidence += if validation.score >= p.excellent_score {
                EXCELLENT_BONUS
            } else if validation.score >= p.good_score {
                GOOD_BONUS
            } else {
                MARGINAL_BONUS
            };
        } else {
            confidence -= INVALID_PENALTY;
        }

        if validation.has_errors() {
            confidence -= ERROR_PENALTY;
        }
        if validation.has_warnings() {
            confidence -= WARNING_PENALTY;
        }

        if meta.attempts > 1 {
            let retries = (meta.attempts - 1) as f64;
            confidence -= (p.retry_penalty * retries).min(p.retry_penalty_cap);
        }

        match meta.complexity {
            Complexity::Easy => confidence += COMPLEXITY_ADJUSTMENT,
            Complexity::Medium => {}
            Complexity::Hard => confidence -= COMPLEXITY_ADJUSTMENT,
        }

        confidence.clamp(0.0, 1.0)
    }

    /// Deterministic explanation: fixed parts, fixed order, joined with
    /// periods. Listed findings are capped at two per severity, with an
    /// overflow count; the closing remark bands on the validation score.
    fn explanation(&self, validation: &ValidationResult, meta: &CorrectionMeta) -> String {
        let mut parts: Vec<String> = Vec::new();

        if validation.is_valid {
            parts.push(format!(
                "Valid {} complexity command generated",
                meta.complexity
            ));
        } else {
            parts.push("Generated command has validation issues".to_string());
        }

        if meta.corrected && meta.attempts > 1 {
            parts.push(format!(
                "Command was corrected after {} attempts",
                meta.attempts
            ));
        } else if meta.attempts > 1 {
            parts.push(format!("Generated in {} attempts", meta.attempts));
        }

        let errors = validation.error_messages();
        if !errors.is_empty() {
            parts.push(format!(
                "Errors found: {}",
                errors.iter().take(2).copied().collect::<Vec<_>>().join(", ")
            ));
            if errors.len() > 2 {
                parts.push(format!("And {} more", errors.len() - 2));
            }
        }

        let warnings = validation.warning_messages();
        if !warnings.is_empty() {
            parts.push(format!(
                "Warnings: {}",
                warnings.iter().take(2).copied().collect::<Vec<_>>().join(", ")
            ));
            if warnings.len() > 2 {
                parts.push(format!("And {} more", warnings.len() - 2));
            }
        }

        parts.push(
            match validation.score {
                c if c >= 0.9 => "High confidence in command validity",
                c if c >= 0.7 => "Moderate confidence in command validity",
                c if c >= 0.5 => "Low confidence - review recommended",
                _ => "Very low confidence - manual review required",
            }
            .to_string(),
        );

        let mut text = parts.join(". ");
        text.push('.');
        text
    }
}
