use std::sync::atomic::{AtomicUsize, Ordering};

use scanvet_core::{Complexity, FindingKind};
use scanvet_pipeline::{
    CorrectionPolicy, Pipeline, SelfCorrector, Validator, quick_validate, sanitize, validate,
};
use scanvet_store::RelationshipStore;

fn validator() -> Validator {
    Validator::new(RelationshipStore::embedded())
}

// ---------------------------------------------------------------------------
// End-to-end validation scenarios
// ---------------------------------------------------------------------------

#[test]
fn clean_service_scan_validates_with_warning_only() {
    let result = validate("nmap -sV -p 80,443 192.168.1.1");

    assert!(result.is_valid);
    assert!(!result.has_errors());
    assert!(result.has_warnings());
    assert_eq!(result.score, 1.0);
}

#[test]
fn scan_type_conflict_is_a_single_error_naming_both_flags() {
    let result = validate("nmap -sS -sT 192.168.1.1");

    assert!(!result.is_valid);
    let errors = result.error_messages();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("-sS"));
    assert!(errors[0].contains("-sT"));
}

#[test]
fn ping_scan_with_port_spec_is_invalid() {
    let result = validate("nmap -sn -p 80 192.168.1.0/24");

    assert!(!result.is_valid);
    assert!(result.has_error_of(FindingKind::Conflict));
}

#[test]
fn shell_redirection_is_a_safety_error_with_low_score() {
    let result = validate("nmap > out.txt 192.168.1.1");

    assert!(!result.is_valid);
    assert!(result.has_error_of(FindingKind::Safety));
    assert!(result.score <= 0.5);
}

#[test]
fn all_checkers_report_in_one_pass() {
    // Bad program, conflicting flags, and an injection attempt at once.
    let result = validate("scan -T0 -T5 10.0.0.1 | tee log");

    assert!(result.has_error_of(FindingKind::Syntax));
    assert!(result.has_error_of(FindingKind::Conflict));
    assert!(result.has_error_of(FindingKind::Safety));
}

// ---------------------------------------------------------------------------
// Safety gate
// ---------------------------------------------------------------------------

#[test]
fn every_injection_construct_is_rejected_and_its_removal_accepted() {
    for construct in ["> dump", "| tee x", "; id", "&& id", "`id`", "$(id)"] {
        let dirty = format!("nmap -sT 192.168.1.1 {construct}");
        assert!(!validate(&dirty).is_valid, "accepted: {dirty}");

        let clean = sanitize(&dirty);
        let result = validate(&clean);
        assert!(
            !result.has_error_of(FindingKind::Safety),
            "sanitize left a safety error in: {clean}"
        );
    }
}

#[test]
fn quick_path_agrees_with_full_path_on_syntax_and_safety() {
    for command in [
        "nmap -sT 192.168.1.1",
        "nmap",
        "nmap 192.168.1.1 ; reboot",
        "masscan 10.0.0.1",
    ] {
        let quick = quick_validate(command);
        let full = validate(command);
        let full_agrees = !full.has_error_of(FindingKind::Syntax)
            && !full.has_error_of(FindingKind::Safety);
        assert_eq!(quick, full_agrees, "{command}");
    }
}

// ---------------------------------------------------------------------------
// Conflict sweeps against the store
// ---------------------------------------------------------------------------

#[test]
fn every_stored_conflict_pair_fails_validation() {
    let store = RelationshipStore::embedded();
    let records = store.options_matching(&scanvet_store::OptionFilter::new());

    // Argument-taking flags get an argument so the commands read like
    // real generator output.
    let with_arg = |flag: &str| {
        if scanvet_core::ARGUMENT_TAKING_FLAGS.contains(&flag) {
            format!("{flag} 80")
        } else {
            flag.to_string()
        }
    };

    for record in &records {
        for other in &record.conflicts_with {
            let command = format!(
                "nmap {} {} 192.168.1.1",
                with_arg(&record.name),
                with_arg(other)
            );
            let result = validate(&command);
            assert!(
                result.has_error_of(FindingKind::Conflict),
                "no conflict reported for {command}"
            );
        }
    }
}

#[test]
fn compatible_flag_pairs_pass_the_conflict_check() {
    for command in [
        "nmap -sS -sV 192.168.1.1",
        "nmap -sT -T3 192.168.1.1",
        "nmap -O -v 192.168.1.1",
    ] {
        let result = validate(command);
        assert!(
            !result.has_error_of(FindingKind::Conflict),
            "false conflict in {command}"
        );
    }
}

#[test]
fn bare_port_flag_next_to_fast_scan_still_conflicts() {
    // "-F" must not be swallowed as "-p"'s argument.
    let result = validate("nmap -p -F 192.168.1.1");
    assert!(result.has_error_of(FindingKind::Conflict));
    assert!(
        result
            .error_messages()
            .iter()
            .any(|m| m.contains("-p") && m.contains("-F")),
        "{:?}",
        result.error_messages()
    );
}

// ---------------------------------------------------------------------------
// Self-correction
// ---------------------------------------------------------------------------

#[test]
fn conflicted_generation_is_corrected_within_two_attempts() {
    let pipeline = Pipeline::new();
    let calls = AtomicUsize::new(0);

    let decision = pipeline.run("syn scan the host", Complexity::Medium, |_, _| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok("nmap -sS -sT 192.168.1.1".to_string())
    });

    // The fix is validated instead of re-generating, so the generator
    // runs exactly once.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(decision.command, "nmap -sS 192.168.1.1");
    assert!(decision.metadata.corrected);
    assert!(decision.metadata.attempts <= 2);
    assert!(decision.validation.is_valid);
}

#[test]
fn attempts_never_exceed_max_retries() {
    let corrector = SelfCorrector::with_policy(CorrectionPolicy {
        max_retries: 2,
        accept_score: 0.8,
    });
    // Every generation is differently broken so fixes keep changing it.
    let counter = AtomicUsize::new(0);
    let outcome = corrector.run(
        "scan",
        Complexity::Hard,
        |_, _| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok(format!("nmap -sS -sT 192.168.1.{n} > dump"))
        },
        &validator(),
    );

    assert!(outcome.attempts <= 2);
    assert_eq!(outcome.history.len(), outcome.attempts);
}

#[test]
fn unchangeable_command_stops_the_loop_early() {
    // An unknown flag fails syntax, but the syntax fix only repairs the
    // program and target; the patched command equals the input, so the
    // loop must stop instead of re-validating the same string.
    let corrector = SelfCorrector::new();
    let outcome = corrector.correct("nmap --frobnicate 192.168.1.1", &validator());

    assert_eq!(outcome.attempts, 1);
    assert!(!outcome.corrected);
    assert!(!outcome.validation.is_valid);
}

#[test]
fn generator_failures_are_recorded_and_survivable() {
    let corrector = SelfCorrector::new();
    let counter = AtomicUsize::new(0);

    let outcome = corrector.run(
        "scan",
        Complexity::Medium,
        |_, _| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err("model backend unavailable".into())
            } else {
                Ok("nmap -sT 192.168.1.1".to_string())
            }
        },
        &validator(),
    );

    assert_eq!(outcome.attempts, 2);
    assert!(outcome.validation.is_valid);
    assert_eq!(outcome.history[0].error.as_deref(), Some("model backend unavailable"));
    assert!(outcome.history[0].command.is_none());
    // Recovered on attempt two, but the accepted command was still the
    // first one actually generated.
    assert_eq!(outcome.history[1].command.as_deref(), Some("nmap -sT 192.168.1.1"));
}

#[test]
fn all_generators_failing_yields_empty_command_and_history_of_errors() {
    let corrector = SelfCorrector::new();
    let outcome = corrector.run(
        "scan",
        Complexity::Medium,
        |_, _| Err("offline".into()),
        &validator(),
    );

    assert_eq!(outcome.command, "");
    assert_eq!(outcome.attempts, 3);
    assert!(!outcome.validation.is_valid);
    assert_eq!(outcome.validation.score, 0.0);
    assert!(outcome.history.iter().all(|a| a.command.is_none()));
}

#[test]
fn best_attempt_wins_when_nothing_reaches_the_accept_bar() {
    let corrector = SelfCorrector::new();
    // Attempt 1 fails outright, attempt 2 generates an injection plus a
    // conflict, attempt 3 validates the patched command, which wins.
    let counter = AtomicUsize::new(0);
    let outcome = corrector.run(
        "scan",
        Complexity::Medium,
        |_, _| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err("cold start".into())
            } else {
                Ok("nmap -sS -sT 192.168.1.1 > dump".to_string())
            }
        },
        &validator(),
    );

    // Attempt 2 scores 1.0 - 0.4 - 0.5; attempt 3 validates the patched
    // command, which is clean and wins.
    assert!(outcome.validation.score > 0.5);
    assert!(outcome.corrected);
    assert_eq!(outcome.command, "nmap -sS 192.168.1.1");
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

#[test]
fn clean_easy_generation_earns_high_confidence() {
    let pipeline = Pipeline::new();
    let decision = pipeline.run("connect scan", Complexity::Easy, |_, _| {
        Ok("nmap -sT -p 80 192.168.1.1".to_string())
    });

    // 0.7 base + 0.2 band + 0.1 easy.
    assert!((decision.confidence - 1.0).abs() < 1e-9);
    assert!(decision.explanation.starts_with("Valid EASY complexity"));
}

#[test]
fn failed_run_earns_do_not_run_confidence() {
    let pipeline = Pipeline::new();
    let (decision, outcome) =
        pipeline.run_with_history("scan", Complexity::Hard, |_, _| Err("offline".into()));

    assert!(decision.confidence < 0.5);
    assert_eq!(outcome.history.len(), 3);
    assert!(decision.explanation.contains("validation issues"));
}

#[test]
fn decision_serializes_to_json() {
    let pipeline = Pipeline::new();
    let decision = pipeline.run("scan", Complexity::Medium, |_, _| {
        Ok("nmap -sV 192.168.1.1".to_string())
    });

    let json = serde_json::to_string(&decision).expect("decision serializes");
    assert!(json.contains("\"confidence\""));
    assert!(json.contains("\"MEDIUM\""));

    let parsed: serde_json::Value = serde_json::from_str(&json).expect("round-trips");
    assert_eq!(parsed["command"], "nmap -sV 192.168.1.1");
}
