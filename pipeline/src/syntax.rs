//! Structural well-formedness checks.
//!
//! Rules apply in order and the first failure wins; this is the only
//! checker that short-circuits internally. Nothing here touches the
//! relationship store or executes anything.

use std::sync::LazyLock;

use regex::Regex;
use scanvet_core::{CheckOutcome, ParsedCommand};

/// The program token every candidate command must start with.
pub const PROGRAM: &str = "nmap";

/// Default target appended by the syntax fix strategy.
pub const DEFAULT_TARGET: &str = "127.0.0.1";

/// Short flags accepted without further shape checks.
const KNOWN_SHORT_FLAGS: &[&str] = &[
    // Scan types
    "-sS", "-sT", "-sU", "-sn", "-sA", "-sW", "-sN", "-sF", "-sX", "-sM",
    // Port specification
    "-p", "-p-", "-F",
    // Detection
    "-sV", "-O", "-A",
    // Timing
    "-T0", "-T1", "-T2", "-T3", "-T4", "-T5",
    // Host discovery
    "-Pn", "-PS", "-PA", "-PU", "-PE", "-PP", "-PM",
    // Output
    "-oN", "-oX", "-oG", "-oA", "-v", "-vv",
    // Other
    "-6", "-n", "-R",
];

/// Long flags accepted by exact or prefix match (prefix covers attached
/// argument forms the tokenizer did not split).
const KNOWN_LONG_FLAGS: &[&str] = &[
    "--script",
    "--script-args",
    "--traceroute",
    "--reason",
    "--exclude-ports",
    "--port-ratio",
    "--version-intensity",
    "--osscan-limit",
    "--max-retries",
    "--host-timeout",
    "--open",
    "--top-ports",
    "--version-all",
    "--version-light",
];

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,}$")
        .expect("static regex must compile")
});

static HOSTNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").expect("static regex must compile")
});

fn is_ipv4(s: &str) -> bool {
    let octets: Vec<&str> = s.split('.').collect();
    octets.len() == 4
        && octets
            .iter()
            .all(|o| !o.is_empty() && o.len() <= 3 && o.parse::<u16>().is_ok_and(|n| n <= 255))
}

fn is_cidr(s: &str) -> bool {
    match s.split_once('/') {
        Some((ip, prefix)) => is_ipv4(ip) && prefix.parse::<u8>().is_ok_and(|p| p <= 32),
        None => false,
    }
}

/// Classifies a positional token as a scan target: dotted-quad IPv4, IPv4
/// CIDR, domain name, or bare hostname.
pub fn is_valid_target(token: &str) -> bool {
    is_ipv4(token) || is_cidr(token) || DOMAIN_RE.is_match(token) || HOSTNAME_RE.is_match(token)
}

fn is_known_long_flag(flag: &str) -> bool {
    KNOWN_LONG_FLAGS
        .iter()
        .any(|known| flag == *known || flag.starts_with(known))
}

fn is_malformed_short_flag(flag: &str) -> bool {
    if KNOWN_SHORT_FLAGS.contains(&flag) {
        return false;
    }
    // Short flags up to 3 chars are tolerated (e.g. tool-specific toggles);
    // longer ones must resolve to a known 2-char base. Numeric suffixes
    // like -T4 were already matched exactly above. Slicing is by chars,
    // not bytes: generated flags can carry multibyte garbage.
    if flag.chars().count() > 3 && !flag.chars().skip(1).all(|c| c.is_ascii_digit() || c == '-') {
        let base: String = flag.chars().take(2).collect();
        return !KNOWN_SHORT_FLAGS.contains(&base.as_str());
    }
    false
}

/// Syntax validator for one program's command shape.
#[derive(Debug, Clone)]
pub struct SyntaxValidator {
    program: String,
}

impl Default for SyntaxValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxValidator {
    /// Validator for the default program token.
    pub fn new() -> Self {
        Self::for_program(PROGRAM)
    }

    /// Validator for a different program token (tests, other scanners).
    pub fn for_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    /// Checks structural well-formedness.
    ///
    /// # Examples
    ///
    /// ```
    /// use scanvet_pipeline::SyntaxValidator;
    ///
    /// let syntax = SyntaxValidator::new();
    /// assert!(syntax.check("nmap -sV 192.168.1.1").valid);
    /// assert!(!syntax.check("scan 192.168.1.1").valid);
    /// assert!(!syntax.check("nmap").valid);
    /// ```
    pub fn check(&self, command: &str) -> CheckOutcome {
        let parsed = ParsedCommand::parse(command.trim());

        // 1. Program token.
        if parsed.program.as_deref() != Some(self.program.as_str()) {
            return CheckOutcome {
                valid: false,
                message: format!("command must start with '{}'", self.program),
            };
        }

        // 2. Anything after the program at all.
        if parsed.token_count() == 0 {
            return CheckOutcome {
                valid: false,
                message: "command too short: missing target".to_string(),
            };
        }

        // 3. Target presence and shape.
        if parsed.positionals.is_empty() {
            return CheckOutcome {
                valid: false,
                message: "no target specified".to_string(),
            };
        }
        for target in &parsed.positionals {
            if !is_valid_target(target) {
                return CheckOutcome {
                    valid: false,
                    message: format!("invalid target format: {target}"),
                };
            }
        }

        // 4. Flag shape.
        for flag in &parsed.flags {
            if flag.starts_with("--") {
                if !is_known_long_flag(flag) {
                    return CheckOutcome {
                        valid: false,
                        message: format!("unknown or malformed flag: {flag}"),
                    };
                }
            } else if is_malformed_short_flag(flag) {
                return CheckOutcome {
                    valid: false,
                    message: format!("unknown or malformed flag: {flag}"),
                };
            }
        }

        CheckOutcome {
            valid: true,
            message: "syntax valid".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(command: &str) -> CheckOutcome {
        SyntaxValidator::new().check(command)
    }

    #[test]
    fn test_accepts_common_commands() {
        for command in [
            "nmap -sV -p 80,443 192.168.1.1",
            "nmap 192.168.1.0/24",
            "nmap -p- example.com",
            "nmap -T4 -sS 10.0.0.1",
            "nmap --script=vuln 192.168.1.1",
            "nmap localhost",
        ] {
            let outcome = check(command);
            assert!(outcome.valid, "{command}: {}", outcome.message);
        }
    }

    #[test]
    fn test_rejects_wrong_program() {
        let outcome = check("scan 192.168.1.1");
        assert!(!outcome.valid);
        assert!(outcome.message.contains("must start with 'nmap'"));
    }

    #[test]
    fn test_rejects_missing_target() {
        assert!(!check("nmap").valid);
        assert_eq!(check("nmap -sS").message, "no target specified");
    }

    #[test]
    fn test_rejects_bad_octets_and_prefix() {
        let outcome = check("nmap 999.999.999.999");
        assert!(!outcome.valid);
        assert!(outcome.message.contains("999.999.999.999"));

        assert!(!check("nmap 192.168.1.0/40").valid);
        assert!(check("nmap 192.168.1.0/32").valid);
    }

    #[test]
    fn test_rejects_malformed_short_flag() {
        let outcome = check("nmap -sSSS 192.168.1.1");
        assert!(!outcome.valid);
        assert!(outcome.message.contains("-sSSS"));
    }

    #[test]
    fn test_rejects_multibyte_flag_without_panicking() {
        let outcome = check("nmap -éxyz 192.168.1.1");
        assert!(!outcome.valid);
        assert!(outcome.message.contains("-éxyz"));
    }

    #[test]
    fn test_rejects_unknown_long_flag() {
        let outcome = check("nmap --frobnicate 192.168.1.1");
        assert!(!outcome.valid);
        assert!(outcome.message.contains("--frobnicate"));
    }

    #[test]
    fn test_timing_flags_pass_shape_check() {
        for t in ["-T0", "-T1", "-T2", "-T3", "-T4", "-T5"] {
            assert!(check(&format!("nmap {t} 10.0.0.1")).valid, "{t}");
        }
    }

    #[test]
    fn test_custom_program_token() {
        let syntax = SyntaxValidator::for_program("masscan");
        assert!(syntax.check("masscan 10.0.0.1").valid);
        assert!(!syntax.check("nmap 10.0.0.1").valid);
    }

    #[test]
    fn test_target_classification() {
        assert!(is_valid_target("192.168.1.1"));
        assert!(is_valid_target("192.168.1.0/24"));
        assert!(is_valid_target("scanme.nmap.org"));
        assert!(is_valid_target("localhost"));
        assert!(!is_valid_target("256.0.0.1"));
        assert!(!is_valid_target("-"));
        assert!(!is_valid_target("a..b"));
    }
}
