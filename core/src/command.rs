//! Command tokenization.
//!
//! [`ParsedCommand`] is the ephemeral, derived view every checker works
//! from: it is rebuilt fresh per validation call and never mutated in
//! place. Tokenization is whitespace-based; it deliberately does not try
//! to parse the full grammar of the target tool.

use serde::{Deserialize, Serialize};

/// Flags whose following token is consumed as their argument rather than
/// counted as a positional target. A following token that is itself a
/// flag is never consumed.
///
/// Kept in sync with the `requires_argument` field of the embedded option
/// table (asserted by a store test).
pub const ARGUMENT_TAKING_FLAGS: &[&str] = &[
    "-p",
    "--exclude-ports",
    "--top-ports",
    "--script",
    "--script-args",
    "-oN",
    "-oX",
    "-oG",
    "-oA",
    "--host-timeout",
    "--max-retries",
    "--version-intensity",
    "--port-ratio",
];

/// Returns true for tokens that look like a flag (`-x`, `--long`, `-p-`).
pub fn is_flag_token(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-')
}

/// Strips an inline `=value` from a long flag token.
///
/// # Examples
///
/// ```
/// use scanvet_core::flag_base;
///
/// assert_eq!(flag_base("--script=vuln"), "--script");
/// assert_eq!(flag_base("--script"), "--script");
/// assert_eq!(flag_base("-sS"), "-sS");
/// ```
pub fn flag_base(token: &str) -> &str {
    match token.split_once('=') {
        Some((base, _)) if base.starts_with("--") => base,
        _ => token,
    }
}

/// Tokenized view of one candidate command.
///
/// `flags` is order-preserving and keeps duplicates; `positionals` holds
/// the non-flag tokens that were not consumed as a flag argument.
///
/// # Examples
///
/// ```
/// use scanvet_core::ParsedCommand;
///
/// let parsed = ParsedCommand::parse("nmap -sn --script=vuln 192.168.1.0/24");
/// assert_eq!(parsed.flags, vec!["-sn", "--script"]);
/// assert_eq!(parsed.positionals, vec!["192.168.1.0/24"]);
///
/// // `-p` consumes its argument; the target is still found.
/// let parsed = ParsedCommand::parse("nmap -p 80,443 scanme.example.com");
/// assert_eq!(parsed.flags, vec!["-p"]);
/// assert_eq!(parsed.positionals, vec!["scanme.example.com"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCommand {
    /// First token, when it is not itself a flag.
    pub program: Option<String>,
    /// Flag tokens in order of appearance, inline values stripped.
    pub flags: Vec<String>,
    /// Positional (target) tokens in order of appearance.
    pub positionals: Vec<String>,
}

impl ParsedCommand {
    /// Tokenizes a command string.
    pub fn parse(command: &str) -> Self {
        let tokens: Vec<&str> = command.split_whitespace().collect();

        let (program, rest) = match tokens.first() {
            Some(first) if !is_flag_token(first) => (Some(first.to_string()), &tokens[1..]),
            Some(_) => (None, &tokens[..]),
            None => (None, &tokens[..]),
        };

        let mut flags = Vec::new();
        let mut positionals = Vec::new();

        let mut i = 0;
        while i < rest.len() {
            let token = rest[i];
            if is_flag_token(token) {
                let base = flag_base(token);
                flags.push(base.to_string());

                // A bare argument-taking flag consumes the next token,
                // unless that token is itself a flag; inline `=value`
                // forms already carry their argument.
                let has_inline_value = token.contains('=');
                if !has_inline_value
                    && ARGUMENT_TAKING_FLAGS.contains(&base)
                    && rest.get(i + 1).is_some_and(|next| !is_flag_token(next))
                {
                    i += 1;
                }
            } else {
                positionals.push(token.to_string());
            }
            i += 1;
        }

        Self {
            program,
            flags,
            positionals,
        }
    }

    /// True when the given flag appears anywhere in the command.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }

    /// Total number of tokens after the program token.
    pub fn token_count(&self) -> usize {
        self.flags.len() + self.positionals.len()
    }
}
