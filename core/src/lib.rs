//! Core types and command tokenization for scan-command vetting.
//!
//! This crate defines the data model shared by every stage of the vetting
//! pipeline:
//!
//! - [`ParsedCommand`] — a tokenized view of a candidate command (flags in
//!   order, positional targets).
//! - [`OptionRecord`] — descriptive metadata about one known flag, including
//!   its conflict set and privilege requirement.
//! - [`ValidationFinding`] / [`ValidationResult`] — the outcome of running a
//!   command through the validators.
//! - [`CorrectionAttempt`] / [`CorrectionOutcome`] — the history of one
//!   self-correction run.
//! - [`Decision`] — the final confidence-scored verdict.
//!
//! Validation problems are modeled as data ([`ValidationFinding`]), never as
//! `Err` values: a command that fails every check still produces a result
//! describing what went wrong.
//!
//! # Example
//!
//! ```
//! use scanvet_core::ParsedCommand;
//!
//! let parsed = ParsedCommand::parse("nmap -sS -p 80,443 192.168.1.1");
//! assert_eq!(parsed.program.as_deref(), Some("nmap"));
//! assert_eq!(parsed.flags, vec!["-sS", "-p"]);
//! assert_eq!(parsed.positionals, vec!["192.168.1.1"]);
//! ```

mod command;
mod types;

pub use command::{ARGUMENT_TAKING_FLAGS, ParsedCommand, flag_base, is_flag_token};
pub use types::*;
