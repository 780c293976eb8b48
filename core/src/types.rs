//! Data model for the vetting pipeline.
//!
//! These types are designed for serialization with [`serde`] so validation
//! results and decisions can round-trip through JSON for CLI output and
//! API transports.

use serde::{Deserialize, Serialize};

/// Functional category of a known flag.
///
/// Mirrors the grouping used by the relationship store: flags in the same
/// exclusive category (scan types, timing templates) tend to conflict with
/// each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FlagCategory {
    /// Probe technique selection (SYN, connect, UDP, ...).
    ScanType,
    /// Port selection (`-p`, fast scan, top-ports).
    PortSpec,
    /// Service/version probing.
    ServiceDetection,
    /// OS fingerprinting.
    OsDetection,
    /// Timing templates `-T0`..`-T5`.
    Timing,
    /// Script engine flags.
    Scripting,
    /// Report and verbosity flags.
    Output,
    /// Host discovery behavior (ping scan, skip-ping, probe types).
    Discovery,
    /// Everything else.
    #[default]
    Misc,
    /// All-in-one aggressive mode.
    Aggressive,
}

/// Complexity hint supplied by the caller alongside an intent.
///
/// # Examples
///
/// ```
/// use scanvet_core::Complexity;
///
/// assert_eq!(Complexity::default(), Complexity::Medium);
/// assert_eq!("HARD".parse::<Complexity>().unwrap(), Complexity::Hard);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Complexity {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Easy => write!(f, "EASY"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::Hard => write!(f, "HARD"),
        }
    }
}

impl std::str::FromStr for Complexity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EASY" => Ok(Self::Easy),
            "MEDIUM" => Ok(Self::Medium),
            "HARD" => Ok(Self::Hard),
            other => Err(format!("unknown complexity: {other}")),
        }
    }
}

/// Descriptive metadata about one known flag.
///
/// Owned by the relationship store; validators only read it. Conflict
/// relations are symmetric: if `-sS` lists `-sT`, a well-formed dataset
/// also lists `-sS` under `-sT`.
///
/// # Examples
///
/// ```
/// use scanvet_core::{FlagCategory, OptionRecord};
///
/// let rec = OptionRecord::new("-sS", FlagCategory::ScanType, "TCP SYN scan")
///     .privileged()
///     .conflicting_with(&["-sT", "-sU"])
///     .with_example("nmap -sS 192.168.1.1");
///
/// assert!(rec.requires_privilege);
/// assert!(!rec.requires_argument);
/// assert!(rec.conflicts_with.contains(&"-sT".to_string()));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionRecord {
    /// Flag name as written on the command line (e.g. `-sS`, `--script`).
    pub name: String,
    /// Functional category.
    pub category: FlagCategory,
    /// Human description from the dataset.
    pub description: String,
    /// Whether the underlying operation needs elevated OS permission.
    pub requires_privilege: bool,
    /// Whether the flag consumes the following token as its argument.
    pub requires_argument: bool,
    /// Flags this one must not co-occur with.
    pub conflicts_with: Vec<String>,
    /// Example invocation.
    pub example: String,
}

impl OptionRecord {
    /// Creates a record for an unprivileged boolean flag with no conflicts.
    pub fn new(name: &str, category: FlagCategory, description: &str) -> Self {
        Self {
            name: name.to_string(),
            category,
            description: description.to_string(),
            requires_privilege: false,
            requires_argument: false,
            conflicts_with: Vec::new(),
            example: String::new(),
        }
    }

    /// Marks the flag as requiring elevated privilege.
    pub fn privileged(mut self) -> Self {
        self.requires_privilege = true;
        self
    }

    /// Marks the flag as consuming the next token as its argument.
    pub fn with_argument(mut self) -> Self {
        self.requires_argument = true;
        self
    }

    /// Declares the flags this one conflicts with.
    pub fn conflicting_with(mut self, flags: &[&str]) -> Self {
        self.conflicts_with = flags.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Adds an example invocation.
    pub fn with_example(mut self, example: &str) -> Self {
        self.example = example.to_string();
        self
    }
}

/// Which checker produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    Syntax,
    Conflict,
    Safety,
    Privilege,
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax"),
            Self::Conflict => write!(f, "conflict"),
            Self::Safety => write!(f, "safety"),
            Self::Privilege => write!(f, "privilege"),
        }
    }
}

/// Whether a finding blocks validity or is advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// One validation finding: an error that blocks validity or an advisory
/// warning that does not.
///
/// # Examples
///
/// ```
/// use scanvet_core::{FindingKind, ValidationFinding};
///
/// let err = ValidationFinding::error(FindingKind::Conflict, "-sS conflicts with -sT");
/// assert!(err.is_error());
///
/// let warn = ValidationFinding::warning(FindingKind::Privilege, "requires root for: -sS");
/// assert!(!warn.is_error());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFinding {
    pub severity: Severity,
    pub kind: FindingKind,
    pub message: String,
}

impl ValidationFinding {
    /// Creates a blocking error finding.
    pub fn error(kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            message: message.into(),
        }
    }

    /// Creates an advisory warning finding.
    pub fn warning(kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

/// Pass/fail outcome of a single checker, with its message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub valid: bool,
    pub message: String,
}

/// Safety checker detail: blocking errors and advisory warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyDetail {
    pub safe: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Privilege checker detail: which flags need elevated permission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeDetail {
    pub required: bool,
    pub flags: Vec<String>,
}

/// Statistics extracted from a sandbox run's scanner output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanStats {
    pub hosts_total: u32,
    pub hosts_up: u32,
    pub hosts_down: u32,
    pub ports_open: u32,
    pub ports_filtered: u32,
    pub ports_closed: u32,
    pub elapsed_secs: f64,
}

/// Sandbox scorer detail: independent score plus extracted stats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SandboxDetail {
    pub score: f64,
    pub stats: ScanStats,
}

/// Per-checker details attached to a [`ValidationResult`].
///
/// Checkers that did not run (quick paths, sandbox disabled) leave their
/// slot as `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syntax: Option<CheckOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicts: Option<CheckOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety: Option<SafetyDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privilege: Option<PrivilegeDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<SandboxDetail>,
}

/// Aggregate outcome of one validation pass over one command string.
///
/// Created fresh per call and never cached across command strings.
///
/// # Examples
///
/// ```
/// use scanvet_core::{FindingKind, ValidationFinding, ValidationResult};
///
/// let mut result = ValidationResult::failed("generator error");
/// assert!(!result.is_valid);
/// assert_eq!(result.score, 0.0);
///
/// result
///     .findings
///     .push(ValidationFinding::error(FindingKind::Syntax, "missing target"));
/// assert_eq!(result.error_messages(), vec!["missing target"]);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// Aggregate score in `[0, 1]`.
    pub score: f64,
    pub findings: Vec<ValidationFinding>,
    /// One-line summary of the outcome.
    pub feedback: String,
    pub details: CheckDetails,
}

impl ValidationResult {
    /// Creates a synthetic zero-score failure, used when no command could
    /// be validated at all (e.g. the generator collaborator errored).
    pub fn failed(feedback: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            score: 0.0,
            findings: Vec::new(),
            feedback: feedback.into(),
            details: CheckDetails::default(),
        }
    }

    /// Iterates over blocking error findings.
    pub fn errors(&self) -> impl Iterator<Item = &ValidationFinding> {
        self.findings.iter().filter(|f| f.is_error())
    }

    /// Iterates over advisory warning findings.
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationFinding> {
        self.findings.iter().filter(|f| f.is_warning())
    }

    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(ValidationFinding::is_error)
    }

    pub fn has_warnings(&self) -> bool {
        self.findings.iter().any(ValidationFinding::is_warning)
    }

    pub fn error_messages(&self) -> Vec<&str> {
        self.errors().map(|f| f.message.as_str()).collect()
    }

    pub fn warning_messages(&self) -> Vec<&str> {
        self.warnings().map(|f| f.message.as_str()).collect()
    }

    /// True when any error finding of the given kind is present.
    pub fn has_error_of(&self, kind: FindingKind) -> bool {
        self.errors().any(|f| f.kind == kind)
    }
}

/// One iteration record from a self-correction run.
///
/// `command` is `None` when the generator collaborator failed before
/// producing any text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionAttempt {
    /// 1-based attempt index.
    pub attempt: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    pub validation: ValidationResult,
    /// Generator error text, if this attempt never produced a command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a full self-correction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionOutcome {
    /// Best command seen across the run (empty if none was produced).
    pub command: String,
    /// Number of iterations executed.
    pub attempts: usize,
    /// Validation of the returned command.
    pub validation: ValidationResult,
    /// Append-only record of every attempt.
    pub history: Vec<CorrectionAttempt>,
    /// True iff the returned attempt was not the first one generated.
    pub corrected: bool,
}

/// Metadata carried from a correction run into the decision step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CorrectionMeta {
    pub complexity: Complexity,
    pub attempts: usize,
    pub corrected: bool,
}

impl Default for CorrectionMeta {
    fn default() -> Self {
        Self {
            complexity: Complexity::Medium,
            attempts: 1,
            corrected: false,
        }
    }
}

/// Decision metadata echoed back to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionMetadata {
    pub complexity: Complexity,
    pub attempts: usize,
    pub corrected: bool,
    pub validation_score: f64,
    pub has_errors: bool,
    pub has_warnings: bool,
}

/// Final output of the pipeline: the command, how much to trust it, and why.
///
/// `confidence` is derived from the validation result and correction
/// metadata; it is distinct from the validation `score`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub command: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Deterministic human-readable explanation.
    pub explanation: String,
    pub validation: ValidationResult,
    pub metadata: DecisionMetadata,
}
