//! Mutually-exclusive flag detection against the relationship store.

use scanvet_core::{CheckOutcome, ParsedCommand};
use scanvet_store::RelationshipStore;

/// Checks every unordered pair of extracted flags against the store's
/// conflict sets.
///
/// Pairs are reported in extraction order and deduplicated, so the same
/// conflict never appears twice even when a flag is repeated. The message
/// names the first pair and counts the rest.
///
/// # Examples
///
/// ```
/// use scanvet_pipeline::check_conflicts;
/// use scanvet_store::RelationshipStore;
///
/// let store = RelationshipStore::embedded();
/// let outcome = check_conflicts("nmap -sS -sT 192.168.1.1", &store);
/// assert!(!outcome.valid);
/// assert_eq!(outcome.message, "-sS conflicts with -sT");
/// ```
pub fn check_conflicts(command: &str, store: &RelationshipStore) -> CheckOutcome {
    let parsed = ParsedCommand::parse(command);
    let pairs = conflicting_pairs(&parsed.flags, store);

    match pairs.split_first() {
        None => CheckOutcome {
            valid: true,
            message: "no conflicts detected".to_string(),
        },
        Some(((first, second), rest)) => {
            let mut message = format!("{first} conflicts with {second}");
            if !rest.is_empty() {
                message.push_str(&format!(" (and {} more)", rest.len()));
            }
            CheckOutcome {
                valid: false,
                message,
            }
        }
    }
}

/// All conflicting flag pairs, in the order the first member of each pair
/// appears in the command.
pub fn conflicting_pairs(flags: &[String], store: &RelationshipStore) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for (i, flag) in flags.iter().enumerate() {
        let conflicts = store.conflicts_of(flag);
        for other in flags.iter().skip(i + 1) {
            if conflicts.contains(other) && !contains_pair(&pairs, flag, other) {
                pairs.push((flag.clone(), other.clone()));
            }
        }
    }
    pairs
}

fn contains_pair(pairs: &[(String, String)], a: &str, b: &str) -> bool {
    pairs
        .iter()
        .any(|(x, y)| (x == a && y == b) || (x == b && y == a))
}
