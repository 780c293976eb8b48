//! Validation orchestrator: runs every checker, aggregates findings into
//! a single scored result.
//!
//! Checker order is fixed (syntax, conflicts, safety, privilege, sandbox)
//! and no checker short-circuits another: a command with a syntax error
//! still gets its conflicts and safety problems reported, so one
//! correction iteration can fix all of them.

use scanvet_core::{
    CheckDetails, FindingKind, ParsedCommand, PrivilegeDetail, ValidationFinding, ValidationResult,
};
use scanvet_store::RelationshipStore;
use tracing::debug;

use crate::conflict::check_conflicts;
use crate::safety::check_safety;
use crate::sandbox::SandboxScorer;
use crate::syntax::SyntaxValidator;

/// Score penalties and the validity threshold.
///
/// The aggregate score starts at 1.0 and loses a fixed penalty per failed
/// checker (per finding, for safety). A command is valid only when it has
/// no error findings *and* its score clears `validity_threshold`.
#[derive(Debug, Clone, Copy)]
pub struct ScoringPolicy {
    pub syntax_penalty: f64,
    pub conflict_penalty: f64,
    /// Applied once per blocking safety finding.
    pub safety_penalty: f64,
    pub validity_threshold: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            syntax_penalty: 0.3,
            conflict_penalty: 0.4,
            safety_penalty: 0.5,
            validity_threshold: 0.5,
        }
    }
}

/// Runs the full checker battery over candidate commands.
///
/// Owns its [`RelationshipStore`] handle; construct one validator and
/// share it across calls — validation itself keeps no per-command state.
pub struct Validator {
    store: RelationshipStore,
    syntax: SyntaxValidator,
    policy: ScoringPolicy,
    sandbox: Option<Box<dyn SandboxScorer>>,
}

impl Validator {
    /// Validator with default policy and no sandbox stage.
    pub fn new(store: RelationshipStore) -> Self {
        Self {
            store,
            syntax: SyntaxValidator::new(),
            policy: ScoringPolicy::default(),
            sandbox: None,
        }
    }

    /// Overrides the scoring policy.
    pub fn with_policy(mut self, policy: ScoringPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Enables the optional sandbox stage.
    ///
    /// The sandbox only runs for commands that pass syntax and have no
    /// error findings; its score is averaged into the aggregate and its
    /// failures degrade to a warning, never an error.
    pub fn with_sandbox(mut self, sandbox: Box<dyn SandboxScorer>) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    /// The relationship store this validator queries.
    pub fn store(&self) -> &RelationshipStore {
        &self.store
    }

    /// Validates and attaches generic remediation hints, one per error
    /// kind found.
    pub fn validate_with_suggestions(&self, command: &str) -> (ValidationResult, Vec<String>) {
        let result = self.validate(command);
        let hints = suggestions(&result);
        (result, hints)
    }

    /// Validates one command through every checker.
    ///
    /// # Examples
    ///
    /// ```
    /// use scanvet_pipeline::Validator;
    /// use scanvet_store::RelationshipStore;
    ///
    /// let validator = Validator::new(RelationshipStore::embedded());
    /// let result = validator.validate("nmap -sS -sT 192.168.1.1");
    /// assert!(!result.is_valid);
    /// assert_eq!(result.error_messages(), vec!["-sS conflicts with -sT"]);
    /// ```
    pub fn validate(&self, command: &str) -> ValidationResult {
        let mut findings: Vec<ValidationFinding> = Vec::new();
        let mut details = CheckDetails::default();
        let mut score = 1.0;

        let syntax = self.syntax.check(command);
        if !syntax.valid {
            findings.push(ValidationFinding::error(FindingKind::Syntax, &syntax.message));
            score -= self.policy.syntax_penalty;
        }
        let syntax_ok = syntax.valid;
        details.syntax = Some(syntax);

        let conflicts = check_conflicts(command, &self.store);
        if !conflicts.valid {
            findings.push(ValidationFinding::error(
                FindingKind::Conflict,
                &conflicts.message,
            ));
            score -= self.policy.conflict_penalty;
        }
        details.conflicts = Some(conflicts);

        let safety = check_safety(command);
        for error in &safety.errors {
            findings.push(ValidationFinding::error(FindingKind::Safety, error));
            score -= self.policy.safety_penalty;
        }
        for warning in &safety.warnings {
            findings.push(ValidationFinding::warning(FindingKind::Safety, warning));
        }
        details.safety = Some(safety);

        let parsed = ParsedCommand::parse(command);
        let (required, privileged_flags) = self.store.requires_privilege(&parsed.flags);
        if required {
            findings.push(ValidationFinding::warning(
                FindingKind::Privilege,
                format!(
                    "requires elevated privileges for: {}",
                    privileged_flags.join(", ")
                ),
            ));
        }
        details.privilege = Some(PrivilegeDetail {
            required,
            flags: privileged_flags,
        });

        let has_errors = findings.iter().any(ValidationFinding::is_error);
        if let Some(sandbox) = &self.sandbox {
            if syntax_ok && !has_errors {
                match sandbox.score(command) {
                    Ok(detail) => {
                        score = (score + detail.score) / 2.0;
                        if detail.score < 0.5 {
                            findings.push(ValidationFinding::warning(
                                FindingKind::Safety,
                                format!("low sandbox score: {:.2}", detail.score),
                            ));
                        }
                        details.sandbox = Some(detail);
                    }
                    Err(err) => {
                        findings.push(ValidationFinding::warning(
                            FindingKind::Safety,
                            format!("sandbox scoring failed: {err}"),
                        ));
                    }
                }
            }
        }

        let score = score.clamp(0.0, 1.0);
        let error_count = findings.iter().filter(|f| f.is_error()).count();
        let warning_count = findings.iter().filter(|f| f.is_warning()).count();
        let is_valid = error_count == 0 && score >= self.policy.validity_threshold;

        let feedback = if is_valid {
            if warning_count > 0 {
                format!("Valid command with {warning_count} warning(s)")
            } else {
                "Command is valid and safe".to_string()
            }
        } else {
            format!("Command has {error_count} error(s)")
        };

        debug!(command, score, is_valid, error_count, warning_count, "validated command");

        ValidationResult {
            is_valid,
            score,
            findings,
            feedback,
            details,
        }
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("store", &self.store)
            .field("policy", &self.policy)
            .field("has_sandbox", &self.sandbox.is_some())
            .finish()
    }
}

/// Fast pre-flight check: syntax and safety only, no store queries, no
/// scoring.
///
/// # Examples
///
/// ```
/// use scanvet_pipeline::quick_validate;
///
/// assert!(quick_validate("nmap -sS 192.168.1.1"));
/// assert!(!quick_validate("nmap 192.168.1.1 > out.txt"));
/// ```
pub fn quick_validate(command: &str) -> bool {
    SyntaxValidator::new().check(command).valid && check_safety(command).errors.is_empty()
}

/// Generic remediation hints derived from a result's error kinds, one per
/// kind, in checker order.
pub fn suggestions(result: &ValidationResult) -> Vec<String> {
    let mut hints: Vec<String> = Vec::new();
    if result.has_error_of(FindingKind::Syntax) {
        hints.push("check command format: nmap [options] [target]".to_string());
    }
    if result.has_error_of(FindingKind::Conflict) {
        hints.push("remove one of the conflicting flags".to_string());
    }
    if result.has_error_of(FindingKind::Safety) {
        hints.push("remove shell metacharacters and dangerous patterns".to_string());
    }
    hints
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanvet_core::{SandboxDetail, ScanStats};
    use crate::sandbox::SandboxError;

    fn validator() -> Validator {
        Validator::new(RelationshipStore::embedded())
    }

    #[test]
    fn test_valid_command_scores_full() {
        let result = validator().validate("nmap -sT -p 80 192.168.1.1");
        assert!(result.is_valid);
        assert_eq!(result.score, 1.0);
        assert_eq!(result.feedback, "Command is valid and safe");
    }

    #[test]
    fn test_warnings_do_not_invalidate() {
        let result = validator().validate("nmap -sV -p 80,443 192.168.1.1");
        assert!(result.is_valid);
        assert!(!result.has_errors());
        assert!(result.has_warnings());
        assert_eq!(result.feedback, "Valid command with 1 warning(s)");
    }

    #[test]
    fn test_conflict_costs_four_tenths() {
        let result = validator().validate("nmap -sS -sT 192.168.1.1");
        assert!(!result.is_valid);
        // 1.0 - 0.4 conflict penalty; privilege warning does not score.
        assert!((result.score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_checkers_do_not_short_circuit() {
        // Wrong program AND a conflict AND a dangerous pattern: all three
        // must be reported in one pass.
        let result = validator().validate("scan -sS -sT 192.168.1.1 > out");
        assert!(result.has_error_of(FindingKind::Syntax));
        assert!(result.has_error_of(FindingKind::Conflict));
        assert!(result.has_error_of(FindingKind::Safety));
    }

    #[test]
    fn test_score_floor_is_zero() {
        let result = validator().validate("scan -sS -sT x > a | b ; c");
        assert_eq!(result.score, 0.0);
        assert!(!result.is_valid);
    }

    #[test]
    fn test_privilege_warning_lists_flags() {
        let result = validator().validate("nmap -sS -O 192.168.1.1");
        let warning = result
            .warnings()
            .find(|f| f.kind == FindingKind::Privilege)
            .expect("privilege warning");
        assert!(warning.message.contains("-sS"));
        assert!(warning.message.contains("-O"));
    }

    struct FixedSandbox(f64);

    impl SandboxScorer for FixedSandbox {
        fn score(&self, _command: &str) -> Result<SandboxDetail, SandboxError> {
            Ok(SandboxDetail {
                score: self.0,
                stats: ScanStats::default(),
            })
        }
    }

    struct BrokenSandbox;

    impl SandboxScorer for BrokenSandbox {
        fn score(&self, _command: &str) -> Result<SandboxDetail, SandboxError> {
            Err(SandboxError::NotInstalled)
        }
    }

    #[test]
    fn test_sandbox_score_is_averaged_in() {
        let validator = validator().with_sandbox(Box::new(FixedSandbox(0.5)));
        let result = validator.validate("nmap -sT 192.168.1.1");
        // (1.0 + 0.5) / 2
        assert!((result.score - 0.75).abs() < 1e-9);
        assert!(result.is_valid);
    }

    #[test]
    fn test_sandbox_skipped_for_erroring_commands() {
        let validator = validator().with_sandbox(Box::new(FixedSandbox(1.0)));
        let result = validator.validate("nmap -sS -sT 192.168.1.1");
        assert!(result.details.sandbox.is_none());
        assert!((result.score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_sandbox_failure_degrades_to_warning() {
        let validator = validator().with_sandbox(Box::new(BrokenSandbox));
        let result = validator.validate("nmap -sT 192.168.1.1");
        assert!(result.is_valid);
        assert!(
            result
                .warning_messages()
                .iter()
                .any(|w| w.contains("sandbox scoring failed"))
        );
    }

    #[test]
    fn test_quick_validate_skips_store_checks() {
        // Conflicting flags pass the quick path: it only guards syntax
        // and safety.
        assert!(quick_validate("nmap -sS -sT 192.168.1.1"));
        assert!(!quick_validate("nmap"));
        assert!(!quick_validate("nmap 192.168.1.1 ; reboot"));
    }

    #[test]
    fn test_suggestions_one_per_error_kind() {
        let (result, hints) =
            validator().validate_with_suggestions("scan -sS -sT 192.168.1.1 > out");
        assert_eq!(hints, suggestions(&result));
        assert_eq!(hints.len(), 3);
        assert!(hints[0].contains("format"));
        assert!(hints[1].contains("conflicting"));
        assert!(hints[2].contains("dangerous"));
    }
}
