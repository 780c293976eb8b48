//! Optional sandbox stage: run an already-validated command against a
//! throwaway target and score the XML output.
//!
//! The orchestrator only invokes a sandbox for commands that passed
//! syntax and carry no error findings, so nothing unvalidated is ever
//! executed. The trait exists so tests and embedders can swap the
//! process runner for a canned scorer.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use scanvet_core::{SandboxDetail, ScanStats};
use thiserror::Error;
use tracing::debug;
use wait_timeout::ChildExt;

/// Failures of a sandbox run. All of them degrade to a validation
/// warning upstream.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("sandbox run exceeded {0:?}")]
    Timeout(Duration),
    #[error("scanner binary not found")]
    NotInstalled,
    #[error("sandbox process failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Scores a command by observing a real (or simulated) run.
pub trait SandboxScorer: Send + Sync {
    fn score(&self, command: &str) -> Result<SandboxDetail, SandboxError>;
}

static HOSTS_UP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<hosts\b[^>]*\bup="(\d+)""#).expect("static regex must compile"));
static HOSTS_DOWN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<hosts\b[^>]*\bdown="(\d+)""#).expect("static regex must compile")
});
static HOSTS_TOTAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<hosts\b[^>]*\btotal="(\d+)""#).expect("static regex must compile")
});
static PORT_STATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<state state="(open|filtered|closed)""#).expect("static regex must compile")
});
static ELAPSED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<finished\b[^>]*\belapsed="([0-9.]+)""#).expect("static regex must compile")
});
static STATUS_UP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<status state="up""#).expect("static regex must compile")
});
static STATUS_ANY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<status state=""#).expect("static regex must compile")
});

fn capture_u32(re: &Regex, text: &str) -> u32 {
    re.captures(text)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0)
}

/// Fraction of scanned hosts that responded, from raw XML output.
/// Returns 0.0 when no host status is present at all.
pub fn parse_success_score(raw: &[u8]) -> f64 {
    let text = String::from_utf8_lossy(raw);
    let total = STATUS_ANY_RE.find_iter(&text).count();
    if total == 0 {
        return 0.0;
    }
    let up = STATUS_UP_RE.find_iter(&text).count();
    up as f64 / total as f64
}

/// Pulls host, port, and timing statistics out of scanner XML output.
///
/// Missing attributes read as zero; the parse never fails.
///
/// # Examples
///
/// ```
/// use scanvet_pipeline::extract_scan_stats;
///
/// let xml = br#"<state state="open"/><state state="closed"/>
///     <hosts up="1" down="0" total="1"/><finished elapsed="2.31"/>"#;
/// let stats = extract_scan_stats(xml);
/// assert_eq!(stats.hosts_up, 1);
/// assert_eq!(stats.ports_open, 1);
/// assert_eq!(stats.ports_closed, 1);
/// assert!((stats.elapsed_secs - 2.31).abs() < 1e-9);
/// ```
pub fn extract_scan_stats(raw: &[u8]) -> ScanStats {
    let text = String::from_utf8_lossy(raw);

    let mut stats = ScanStats {
        hosts_up: capture_u32(&HOSTS_UP_RE, &text),
        hosts_down: capture_u32(&HOSTS_DOWN_RE, &text),
        hosts_total: capture_u32(&HOSTS_TOTAL_RE, &text),
        ..ScanStats::default()
    };

    for caps in PORT_STATE_RE.captures_iter(&text) {
        match &caps[1] {
            "open" => stats.ports_open += 1,
            "filtered" => stats.ports_filtered += 1,
            _ => stats.ports_closed += 1,
        }
    }

    if let Some(caps) = ELAPSED_RE.captures(&text) {
        stats.elapsed_secs = caps[1].parse().unwrap_or(0.0);
    }

    stats
}

/// Sandbox that runs the scanner as a child process with a wall-clock
/// timeout, forcing XML output onto stdout for scoring.
#[derive(Debug, Clone)]
pub struct ProcessSandbox {
    timeout: Duration,
}

impl Default for ProcessSandbox {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl ProcessSandbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

/// Waits for the child under a deadline, draining stdout in a background
/// thread so a child that fills the pipe buffer before exiting cannot
/// deadlock against the wait.
fn drain_with_deadline(mut child: Child, timeout: Duration) -> Result<Vec<u8>, SandboxError> {
    let stdout = child.stdout.take();
    let reader = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = stdout {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    });

    match child.wait_timeout(timeout)? {
        Some(_status) => Ok(reader.join().unwrap_or_default()),
        None => {
            let _ = child.kill();
            let _ = child.wait();
            Err(SandboxError::Timeout(timeout))
        }
    }
}

impl SandboxScorer for ProcessSandbox {
    fn score(&self, command: &str) -> Result<SandboxDetail, SandboxError> {
        let command = if command.contains("-oX") {
            command.to_string()
        } else {
            format!("{command} -oX -")
        };
        let tokens: Vec<&str> = command.split_whitespace().collect();
        let Some((program, args)) = tokens.split_first() else {
            return Err(SandboxError::Io(std::io::Error::other("empty command")));
        };

        debug!(command = %command, timeout = ?self.timeout, "sandbox run starting");
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::NotFound {
                    SandboxError::NotInstalled
                } else {
                    SandboxError::Io(err)
                }
            })?;

        let output = drain_with_deadline(child, self.timeout)?;

        let score = parse_success_score(&output);
        let stats = extract_scan_stats(&output);
        debug!(score, hosts_up = stats.hosts_up, "sandbox run finished");
        Ok(SandboxDetail { score, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_XML: &[u8] = br#"<?xml version="1.0"?>
<nmaprun>
  <host><status state="up" reason="syn-ack"/>
    <ports>
      <port portid="22"><state state="open" reason="syn-ack"/></port>
      <port portid="80"><state state="open" reason="syn-ack"/></port>
      <port portid="443"><state state="filtered" reason="no-response"/></port>
      <port portid="8080"><state state="closed" reason="reset"/></port>
    </ports>
  </host>
  <host><status state="down" reason="no-response"/></host>
  <runstats>
    <finished time="1700000000" elapsed="4.27"/>
    <hosts up="1" down="1" total="2"/>
  </runstats>
</nmaprun>"#;

    #[test]
    fn test_success_score_is_up_over_total() {
        assert!((parse_success_score(SAMPLE_XML) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_success_score_of_empty_output_is_zero() {
        assert_eq!(parse_success_score(b""), 0.0);
        assert_eq!(parse_success_score(b"garbage, not xml"), 0.0);
    }

    #[test]
    fn test_stats_extraction() {
        let stats = extract_scan_stats(SAMPLE_XML);
        assert_eq!(stats.hosts_up, 1);
        assert_eq!(stats.hosts_down, 1);
        assert_eq!(stats.hosts_total, 2);
        assert_eq!(stats.ports_open, 2);
        assert_eq!(stats.ports_filtered, 1);
        assert_eq!(stats.ports_closed, 1);
        assert!((stats.elapsed_secs - 4.27).abs() < 1e-9);
    }

    #[test]
    fn test_stats_of_partial_output_default_to_zero() {
        let stats = extract_scan_stats(b"<nmaprun><runstats></runstats></nmaprun>");
        assert_eq!(stats, ScanStats::default());
    }

    #[test]
    fn test_missing_binary_maps_to_not_installed() {
        let sandbox = ProcessSandbox::new();
        let err = sandbox
            .score("definitely-not-a-scanner-binary 127.0.0.1")
            .unwrap_err();
        assert!(matches!(err, SandboxError::NotInstalled));
    }

    #[test]
    #[cfg(unix)]
    fn test_drain_survives_output_larger_than_pipe_buffer() {
        // 256 KiB is well past the default pipe buffer; without the
        // background reader the child blocks on write until the deadline.
        let child = Command::new("sh")
            .args(["-c", "head -c 262144 /dev/zero"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn sh");

        let output = drain_with_deadline(child, Duration::from_secs(10)).expect("drain");
        assert_eq!(output.len(), 262144);
    }

    #[test]
    #[cfg(unix)]
    fn test_deadline_kills_hung_child() {
        let child = Command::new("sleep")
            .arg("5")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn sleep");

        let err = drain_with_deadline(child, Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, SandboxError::Timeout(_)));
    }
}
