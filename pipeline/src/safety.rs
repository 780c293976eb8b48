//! Safety checks: blocking shell-injection patterns and advisory warnings
//! about slow or noisy scan options.
//!
//! Nothing here ever executes the command. Blocking findings make the
//! command invalid; advisory warnings only lower downstream confidence.

use std::sync::LazyLock;

use regex::Regex;
use scanvet_core::{ParsedCommand, SafetyDetail};

/// Substrings that make a command unconditionally unsafe to pass to a
/// shell: redirection, piping, chaining, substitution, and destructive
/// binaries smuggled into the line.
pub const BLACKLIST_PATTERNS: &[&str] = &[
    ">", "<", "|", ";", "&&", "||", "`", "$(", "rm ", "chmod ", "chown ", "dd ", "mkfs",
];

/// Script categories that raise an advisory warning.
pub const WARNING_SCRIPT_CATEGORIES: &[&str] = &["exploit", "dos", "brute", "broadcast"];

/// Script categories that block the command outright.
pub const FORBIDDEN_SCRIPT_CATEGORIES: &[&str] = &["malware"];

// Strips redirections (with their filename), chaining operators, and
// command substitution from a flagged command.
static REDIRECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*[><|]+\s*\S*").expect("static regex must compile"));
static CHAINING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*[;&]+\s*").expect("static regex must compile"));
static SUBSTITUTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\([^)]*\)|`[^`]*`").expect("static regex must compile"));

/// Runs the safety checker over one command string.
///
/// # Examples
///
/// ```
/// use scanvet_pipeline::check_safety;
///
/// let detail = check_safety("nmap -sS 192.168.1.1 > /tmp/out");
/// assert!(!detail.safe);
///
/// let detail = check_safety("nmap -T4 192.168.1.1");
/// assert!(detail.safe);
/// assert!(!detail.warnings.is_empty());
/// ```
pub fn check_safety(command: &str) -> SafetyDetail {
    let errors = blocking_findings(command);
    let warnings = advisory_warnings(command);
    SafetyDetail {
        safe: errors.is_empty(),
        errors,
        warnings,
    }
}

fn blocking_findings(command: &str) -> Vec<String> {
    let mut errors: Vec<String> = Vec::new();
    for pattern in BLACKLIST_PATTERNS {
        if command.contains(pattern) {
            errors.push(format!("dangerous pattern detected: {}", pattern.trim_end()));
        }
    }

    let lowered = command.to_lowercase();
    if lowered.contains("--script") {
        for category in FORBIDDEN_SCRIPT_CATEGORIES {
            if lowered.contains(category) {
                errors.push(format!("forbidden script category: {category}"));
            }
        }
    }
    errors
}

fn advisory_warnings(command: &str) -> Vec<String> {
    let parsed = ParsedCommand::parse(command);
    let mut warnings: Vec<String> = Vec::new();

    let lowered = command.to_lowercase();
    if lowered.contains("--script") {
        for category in WARNING_SCRIPT_CATEGORIES {
            if lowered.contains(category) {
                warnings.push(format!("script category '{category}' may be aggressive"));
            }
        }
        if lowered.contains("vuln") {
            warnings.push("vulnerability scripts may trigger IDS/IPS".to_string());
        }
    }

    if parsed.has_flag("-T4") || parsed.has_flag("-T5") {
        warnings.push("aggressive timing (-T4/-T5) may be detected".to_string());
    }
    if parsed.has_flag("-A") {
        warnings.push("aggressive scan (-A) enables OS detection and scripts".to_string());
    }
    if parsed.has_flag("-p-") || command.contains("-p 1-65535") {
        warnings.push("full port scan will take significant time".to_string());
    }
    if parsed.has_flag("-sU") {
        warnings.push("UDP scan requires root and is slower".to_string());
    }
    if parsed.has_flag("-sV") {
        warnings.push("version detection increases scan time".to_string());
    }
    if parsed.has_flag("-O") {
        warnings.push("OS detection requires root privileges".to_string());
    }

    warnings
}

/// Removes blacklisted shell constructs from a command, keeping the scan
/// itself intact. Used by the safety fix strategy.
///
/// # Examples
///
/// ```
/// use scanvet_pipeline::sanitize;
///
/// assert_eq!(
///     sanitize("nmap -sS 192.168.1.1 > /tmp/out; rm -rf /"),
///     "nmap -sS 192.168.1.1 rm -rf /"
/// );
/// ```
pub fn sanitize(command: &str) -> String {
    let cleaned = SUBSTITUTION_RE.replace_all(command, "");
    let cleaned = REDIRECTION_RE.replace_all(&cleaned, "");
    let cleaned = CHAINING_RE.replace_all(&cleaned, " ");
    cleaned
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}
