//! Validation, self-correction, and decision pipeline for scan commands.
//!
//! The pipeline takes a candidate `nmap` command (usually produced by a
//! machine generator), runs it through a battery of checkers, patches
//! what it can, and emits a confidence-scored [`Decision`]. Commands are
//! only ever inspected as strings; the optional sandbox stage is the one
//! place anything runs, and it is gated on the command having already
//! passed validation.
//!
//! Stages, in order:
//!
//! 1. [`SyntaxValidator`] — structural shape (program, target, flags).
//! 2. [`check_conflicts`] — mutually-exclusive flags, via the
//!    relationship store.
//! 3. [`check_safety`] — shell-injection patterns and advisory warnings.
//! 4. Privilege check — which flags need root.
//! 5. Optional sandbox scoring of the validated command.
//!
//! # Example
//!
//! ```
//! use scanvet_pipeline::{Pipeline, validate};
//! use scanvet_core::Complexity;
//!
//! // One-shot validation against the embedded dataset.
//! let result = validate("nmap -sS -sT 192.168.1.1");
//! assert!(!result.is_valid);
//!
//! // Full pipeline: generate, correct, decide.
//! let pipeline = Pipeline::new();
//! let decision = pipeline.run("scan the web server", Complexity::Easy, |_, _| {
//!     Ok("nmap -sV -p 80,443 192.168.1.1".to_string())
//! });
//! assert!(decision.confidence > 0.7);
//! ```

mod conflict;
mod correct;
mod decision;
mod orchestrator;
mod safety;
mod sandbox;
mod syntax;

use scanvet_core::{Complexity, CorrectionMeta, CorrectionOutcome, Decision, ValidationResult};
use scanvet_store::RelationshipStore;

pub use conflict::{check_conflicts, conflicting_pairs};
pub use correct::{CorrectionPolicy, GeneratorError, SelfCorrector, apply_fixes};
pub use decision::{ConfidencePolicy, DecisionEngine, Recommendation, recommend};
pub use orchestrator::{ScoringPolicy, Validator, quick_validate, suggestions};
pub use safety::{
    BLACKLIST_PATTERNS, FORBIDDEN_SCRIPT_CATEGORIES, WARNING_SCRIPT_CATEGORIES, check_safety,
    sanitize,
};
pub use sandbox::{
    ProcessSandbox, SandboxError, SandboxScorer, extract_scan_stats, parse_success_score,
};
pub use syntax::{SyntaxValidator, is_valid_target};

/// One-shot validation of a single command against the embedded dataset.
///
/// Convenience wrapper for callers that do not hold a [`Validator`];
/// construct one explicitly to reuse a store or attach a sandbox.
pub fn validate(command: &str) -> ValidationResult {
    Validator::new(RelationshipStore::embedded()).validate(command)
}

/// The full generate-validate-correct-decide pipeline.
///
/// Bundles a [`Validator`], a [`SelfCorrector`], and a [`DecisionEngine`]
/// behind one entry point. All stages are deterministic given the same
/// generator behavior.
#[derive(Debug)]
pub struct Pipeline {
    validator: Validator,
    corrector: SelfCorrector,
    engine: DecisionEngine,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Pipeline over the embedded dataset with default policies.
    pub fn new() -> Self {
        Self::with_store(RelationshipStore::embedded())
    }

    /// Pipeline over a caller-provided relationship store.
    pub fn with_store(store: RelationshipStore) -> Self {
        Self {
            validator: Validator::new(store),
            corrector: SelfCorrector::new(),
            engine: DecisionEngine::new(),
        }
    }

    /// Replaces the validator (custom scoring policy, sandbox stage).
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Replaces the corrector (custom retry bounds).
    pub fn with_corrector(mut self, corrector: SelfCorrector) -> Self {
        self.corrector = corrector;
        self
    }

    /// Replaces the decision engine (custom confidence policy).
    pub fn with_engine(mut self, engine: DecisionEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Validates one command without correction.
    pub fn validate(&self, command: &str) -> ValidationResult {
        self.validator.validate(command)
    }

    /// Runs the full pipeline for one intent and returns the decision.
    pub fn run<G>(&self, intent: &str, complexity: Complexity, generator: G) -> Decision
    where
        G: FnMut(&str, Complexity) -> Result<String, GeneratorError>,
    {
        self.run_with_history(intent, complexity, generator).0
    }

    /// Like [`Pipeline::run`], additionally returning the correction
    /// history for callers that audit every attempt.
    pub fn run_with_history<G>(
        &self,
        intent: &str,
        complexity: Complexity,
        generator: G,
    ) -> (Decision, CorrectionOutcome)
    where
        G: FnMut(&str, Complexity) -> Result<String, GeneratorError>,
    {
        let outcome = self
            .corrector
            .run(intent, complexity, generator, &self.validator);
        let meta = CorrectionMeta {
            complexity,
            attempts: outcome.attempts,
            corrected: outcome.corrected,
        };
        let decision = self
            .engine
            .decide(&outcome.command, &outcome.validation, &meta);
        (decision, outcome)
    }
}
