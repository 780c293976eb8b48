//! Self-correction loop: generate, validate, fix, retry.
//!
//! The loop never re-asks the generator to fix its own output. When an
//! attempt fails validation, a deterministic fix strategy patches the
//! command and the *patched* command is what the next iteration
//! validates. The generator is only called again when no patch is
//! pending (first iteration, or after a generator failure).

use std::sync::LazyLock;

use regex::Regex;
use scanvet_core::{
    ARGUMENT_TAKING_FLAGS, Complexity, CorrectionAttempt, CorrectionOutcome, FindingKind,
    ParsedCommand, ValidationResult, flag_base, is_flag_token,
};
use tracing::debug;

use crate::orchestrator::Validator;
use crate::safety::sanitize;
use crate::syntax::{DEFAULT_TARGET, PROGRAM};

/// Errors a generator collaborator may return.
pub type GeneratorError = Box<dyn std::error::Error + Send + Sync>;

/// Retry bounds for a correction run.
#[derive(Debug, Clone, Copy)]
pub struct CorrectionPolicy {
    /// Upper bound on iterations, counting the initial generation.
    pub max_retries: usize,
    /// A command at or above this score is accepted immediately.
    pub accept_score: f64,
}

impl Default for CorrectionPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            accept_score: 0.8,
        }
    }
}

/// Drives the generate-validate-fix loop.
#[derive(Debug, Clone, Default)]
pub struct SelfCorrector {
    policy: CorrectionPolicy,
}

impl SelfCorrector {
    /// Corrector with the default retry bounds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Corrector with custom retry bounds.
    pub fn with_policy(policy: CorrectionPolicy) -> Self {
        Self { policy }
    }

    /// Runs the correction loop for one intent.
    ///
    /// The generator is any `FnMut(intent, complexity) -> Result<String>`;
    /// a generator failure records a zero-score attempt and the loop moves
    /// on. Returns the best-scoring attempt seen, with the full history.
    ///
    /// The loop stops early when an attempt is accepted, or when the fix
    /// strategy cannot change the command any further.
    pub fn run<G>(
        &self,
        intent: &str,
        complexity: Complexity,
        mut generator: G,
        validator: &Validator,
    ) -> CorrectionOutcome
    where
        G: FnMut(&str, Complexity) -> Result<String, GeneratorError>,
    {
        let mut history: Vec<CorrectionAttempt> = Vec::new();
        let mut best: Option<(usize, String, ValidationResult)> = None;
        let mut pending_fix: Option<String> = None;
        let mut attempts = 0;

        for attempt in 1..=self.policy.max_retries {
            attempts = attempt;

            let command = match pending_fix.take() {
                Some(patched) => patched,
                None => match generator(intent, complexity) {
                    Ok(command) => command,
                    Err(err) => {
                        debug!(attempt, error = %err, "generator failed");
                        history.push(CorrectionAttempt {
                            attempt,
                            command: None,
                            validation: ValidationResult::failed(format!(
                                "generator error: {err}"
                            )),
                            error: Some(err.to_string()),
                        });
                        continue;
                    }
                },
            };

            let validation = validator.validate(&command);
            debug!(attempt, command, score = validation.score, "validated attempt");
            history.push(CorrectionAttempt {
                attempt,
                command: Some(command.clone()),
                validation: validation.clone(),
                error: None,
            });

            let improved = best
                .as_ref()
                .is_none_or(|(_, _, prev)| validation.score > prev.score);
            if improved {
                best = Some((attempt, command.clone(), validation.clone()));
            }

            if validation.is_valid && validation.score >= self.policy.accept_score {
                return CorrectionOutcome {
                    command,
                    attempts: attempt,
                    validation,
                    history,
                    corrected: attempt > 1,
                };
            }

            if attempt < self.policy.max_retries {
                let patched = apply_fixes(&command, &validation);
                if patched == command {
                    debug!(attempt, "fix strategy produced no change, stopping");
                    break;
                }
                pending_fix = Some(patched);
            }
        }

        match best {
            Some((picked, command, validation)) => CorrectionOutcome {
                command,
                attempts,
                validation,
                history,
                corrected: picked > 1,
            },
            None => {
                let validation = history
                    .last()
                    .map(|a| a.validation.clone())
                    .unwrap_or_else(|| ValidationResult::failed("no attempts were made"));
                CorrectionOutcome {
                    command: String::new(),
                    attempts,
                    validation,
                    history,
                    corrected: false,
                }
            }
        }
    }

    /// Corrects a literal command with no generator in the loop: the
    /// command itself seeds attempt one, fixes drive the rest.
    pub fn correct(&self, command: &str, validator: &Validator) -> CorrectionOutcome {
        let seed = command.to_string();
        self.run(
            "",
            Complexity::Medium,
            move |_, _| Ok(seed.clone()),
            validator,
        )
    }
}

static CONFLICT_PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(-\S+) conflicts with (-\S+)").expect("static regex must compile")
});

/// Applies one fix per failed error kind and returns the patched command.
///
/// Pure string transformation: conflict messages drive flag removal,
/// syntax errors drive program/target repair, safety errors drive
/// sanitization. Returns the input unchanged when nothing applies.
pub fn apply_fixes(command: &str, validation: &ValidationResult) -> String {
    let mut patched = command.to_string();

    for finding in validation.errors() {
        if finding.kind == FindingKind::Conflict {
            patched = fix_conflict(&patched, &finding.message);
        }
    }
    if validation.has_error_of(FindingKind::Syntax) {
        patched = fix_syntax(&patched);
    }
    if validation.has_error_of(FindingKind::Safety) {
        patched = sanitize(&patched);
    }
    patched
}

/// Removes the second-named flag of a conflict pair (falling back to the
/// first if the second is absent), along with its argument if it takes
/// one.
fn fix_conflict(command: &str, message: &str) -> String {
    let Some(caps) = CONFLICT_PAIR_RE.captures(message) else {
        return command.to_string();
    };
    let first = &caps[1];
    let second = &caps[2];

    let mut tokens: Vec<String> = command.split_whitespace().map(str::to_string).collect();
    let position = tokens
        .iter()
        .position(|t| flag_base(t) == second)
        .or_else(|| tokens.iter().position(|t| flag_base(t) == first));

    if let Some(pos) = position {
        let removed = tokens.remove(pos);
        let takes_argument = ARGUMENT_TAKING_FLAGS.contains(&flag_base(&removed));
        if takes_argument && !removed.contains('=') {
            if pos < tokens.len() && !is_flag_token(&tokens[pos]) {
                tokens.remove(pos);
            }
        }
    }
    tokens.join(" ")
}

/// Repairs the two structural problems worth patching: a missing program
/// token and a missing target.
fn fix_syntax(command: &str) -> String {
    let mut tokens: Vec<String> = command.split_whitespace().map(str::to_string).collect();

    if tokens.first().map(String::as_str) != Some(PROGRAM) {
        tokens.insert(0, PROGRAM.to_string());
    }

    let joined = tokens.join(" ");
    if ParsedCommand::parse(&joined).positionals.is_empty() {
        tokens.push(DEFAULT_TARGET.to_string());
    }
    tokens.join(" ")
}
