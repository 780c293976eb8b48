use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use scanvet_core::{Complexity, FlagCategory, ValidationResult};
use scanvet_pipeline::{
    CorrectionPolicy, DecisionEngine, ProcessSandbox, SelfCorrector, Validator, quick_validate,
    recommend,
};
use scanvet_store::{OptionFilter, RelationshipStore};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "scanvet")]
#[command(about = "Validate, correct, and score machine-generated scan commands")]
#[command(version)]
struct Cli {
    /// Enable debug logging on stderr (RUST_LOG overrides).
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the full checker battery over one command.
    Validate(ValidateArgs),
    /// Fast syntax and safety pre-flight; exit code only.
    Quick(QuickArgs),
    /// Validate and self-correct a command, then score the result.
    Correct(CorrectArgs),
    /// List known flags from the relationship dataset.
    Flags(FlagsArgs),
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// The command to validate, quoted as one argument.
    command: String,
    /// Emit the full validation result as JSON.
    #[arg(long)]
    json: bool,
    /// Also run the sandbox stage (only reached if validation passes).
    #[arg(long)]
    sandbox: bool,
    /// Sandbox wall-clock timeout in seconds.
    #[arg(long, default_value_t = 30)]
    sandbox_timeout: u64,
}

#[derive(Debug, Args)]
struct QuickArgs {
    /// The command to check, quoted as one argument.
    command: String,
}

#[derive(Debug, Args)]
struct CorrectArgs {
    /// The command to correct, quoted as one argument.
    command: String,
    /// Maximum correction iterations, counting the first.
    #[arg(long, default_value_t = 3)]
    max_retries: usize,
    /// Complexity hint for confidence scoring (EASY, MEDIUM, HARD).
    #[arg(long, default_value = "MEDIUM")]
    complexity: Complexity,
    /// Emit the decision as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct FlagsArgs {
    /// Only flags in this category (e.g. scan_type, timing, output).
    #[arg(long)]
    category: Option<String>,
    /// Only flags that require elevated privileges.
    #[arg(long)]
    privileged: bool,
    /// Emit the records as JSON.
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Validate(args) => run_validate(args),
        Command::Quick(args) => run_quick(args),
        Command::Correct(args) => run_correct(args),
        Command::Flags(args) => run_flags(args),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_validate(args: ValidateArgs) -> Result<i32, String> {
    let mut validator = Validator::new(RelationshipStore::embedded());
    if args.sandbox {
        validator = validator.with_sandbox(Box::new(ProcessSandbox::with_timeout(
            Duration::from_secs(args.sandbox_timeout),
        )));
    }

    let (result, hints) = validator.validate_with_suggestions(&args.command);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .map_err(|err| format!("failed to serialize result: {err}"))?;
        println!("{json}");
    } else {
        print_validation(&args.command, &result, &hints);
    }

    Ok(if result.is_valid { 0 } else { 1 })
}

fn print_validation(command: &str, result: &ValidationResult, hints: &[String]) {
    println!("Command:  {command}");
    println!(
        "Valid:    {} (score {:.2})",
        if result.is_valid { "yes" } else { "no" },
        result.score
    );
    println!("Feedback: {}", result.feedback);

    for finding in &result.findings {
        let tag = if finding.is_error() { "error" } else { "warning" };
        println!("  [{tag}] {}: {}", finding.kind, finding.message);
    }

    if !hints.is_empty() {
        println!("Suggestions:");
        for hint in hints {
            println!("  - {hint}");
        }
    }
}

fn run_quick(args: QuickArgs) -> Result<i32, String> {
    if quick_validate(&args.command) {
        println!("valid");
        Ok(0)
    } else {
        println!("invalid");
        Ok(1)
    }
}

fn run_correct(args: CorrectArgs) -> Result<i32, String> {
    if args.max_retries == 0 {
        return Err("--max-retries must be at least 1".to_string());
    }

    let validator = Validator::new(RelationshipStore::embedded());
    let corrector = SelfCorrector::with_policy(CorrectionPolicy {
        max_retries: args.max_retries,
        ..CorrectionPolicy::default()
    });

    let outcome = corrector.correct(&args.command, &validator);
    let meta = scanvet_core::CorrectionMeta {
        complexity: args.complexity,
        attempts: outcome.attempts,
        corrected: outcome.corrected,
    };
    let decision = DecisionEngine::new().decide(&outcome.command, &outcome.validation, &meta);
    let recommendation = recommend(decision.confidence);

    if args.json {
        let json = serde_json::to_string_pretty(&serde_json::json!({
            "decision": decision,
            "recommendation": recommendation,
            "history": outcome.history,
        }))
        .map_err(|err| format!("failed to serialize decision: {err}"))?;
        println!("{json}");
    } else {
        println!("Command:        {}", decision.command);
        println!(
            "Corrected:      {} ({} attempt(s))",
            if decision.metadata.corrected { "yes" } else { "no" },
            decision.metadata.attempts
        );
        println!("Confidence:     {:.2}", decision.confidence);
        println!("Recommendation: {recommendation}");
        println!("Explanation:    {}", decision.explanation);
    }

    Ok(if decision.validation.is_valid { 0 } else { 1 })
}

fn run_flags(args: FlagsArgs) -> Result<i32, String> {
    let mut filter = OptionFilter::new();
    if let Some(category) = &args.category {
        filter = filter.in_category(parse_category(category)?);
    }
    if args.privileged {
        filter = filter.requiring_privilege(true);
    }

    let store = RelationshipStore::embedded();
    let records = store.options_matching(&filter);

    if args.json {
        let json = serde_json::to_string_pretty(&records)
            .map_err(|err| format!("failed to serialize records: {err}"))?;
        println!("{json}");
        return Ok(0);
    }

    for record in &records {
        let mut notes: Vec<&str> = Vec::new();
        if record.requires_privilege {
            notes.push("requires root");
        }
        if record.requires_argument {
            notes.push("takes argument");
        }
        let notes = if notes.is_empty() {
            String::new()
        } else {
            format!(" [{}]", notes.join(", "))
        };
        println!("{:<16} {}{notes}", record.name, record.description);
        if !record.conflicts_with.is_empty() {
            println!("{:<16} conflicts with: {}", "", record.conflicts_with.join(", "));
        }
    }
    Ok(0)
}

fn parse_category(name: &str) -> Result<FlagCategory, String> {
    match name.to_ascii_lowercase().as_str() {
        "scan_type" => Ok(FlagCategory::ScanType),
        "port_spec" => Ok(FlagCategory::PortSpec),
        "service_detection" => Ok(FlagCategory::ServiceDetection),
        "os_detection" => Ok(FlagCategory::OsDetection),
        "timing" => Ok(FlagCategory::Timing),
        "scripting" => Ok(FlagCategory::Scripting),
        "output" => Ok(FlagCategory::Output),
        "discovery" => Ok(FlagCategory::Discovery),
        "misc" => Ok(FlagCategory::Misc),
        "aggressive" => Ok(FlagCategory::Aggressive),
        other => Err(format!("unknown category: {other}")),
    }
}
