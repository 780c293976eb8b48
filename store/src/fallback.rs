//! Embedded fallback dataset.
//!
//! When no live graph backend is reachable, the store answers every query
//! from this table. Conflict relations are encoded explicitly in both
//! directions for every pair; the store never derives symmetry at query
//! time. Coverage floor: every pairwise scan-type exclusion, the port
//! specification conflict set, all timing-template conflicts, the
//! ping-scan/port-flag conflict, and the privilege-required set.

use std::collections::HashMap;
use std::sync::LazyLock;

use scanvet_core::{FlagCategory, OptionRecord};

use crate::backend::OptionFilter;

/// Mutually exclusive probe techniques. Exactly one may be selected.
const SCAN_TYPES: &[(&str, &str)] = &[
    ("-sS", "TCP SYN scan (stealth scan)"),
    ("-sT", "TCP connect scan"),
    ("-sU", "UDP scan"),
    ("-sN", "TCP null scan"),
    ("-sF", "TCP FIN scan"),
    ("-sX", "TCP Xmas scan"),
    ("-sA", "TCP ACK scan"),
    ("-sW", "TCP window scan"),
    ("-sM", "TCP Maimon scan"),
];

/// Scan types that open raw sockets and therefore need elevated privilege.
/// `-sT` is the lone unprivileged technique.
const UNPRIVILEGED_SCAN_TYPES: &[&str] = &["-sT"];

/// Timing templates, mutually exclusive with each other.
const TIMING_TEMPLATES: &[(&str, &str)] = &[
    ("-T0", "Paranoid timing template"),
    ("-T1", "Sneaky timing template"),
    ("-T2", "Polite timing template"),
    ("-T3", "Normal timing template"),
    ("-T4", "Aggressive timing template"),
    ("-T5", "Insane timing template"),
];

/// Ping probe types, incompatible with skipping host discovery.
const PING_PROBE_FLAGS: &[&str] = &["-PS", "-PA", "-PU", "-PE", "-PP", "-PM"];

static TABLE: LazyLock<HashMap<String, OptionRecord>> = LazyLock::new(build_table);

fn sibling_names(group: &[(&str, &str)], me: &str) -> Vec<String> {
    group
        .iter()
        .map(|(name, _)| *name)
        .filter(|name| *name != me)
        .map(String::from)
        .collect()
}

fn build_table() -> HashMap<String, OptionRecord> {
    let mut records: Vec<OptionRecord> = Vec::new();

    // Scan types: pairwise exclusive, plus the ping-scan exclusion.
    for (name, description) in SCAN_TYPES {
        let mut conflicts = sibling_names(SCAN_TYPES, name);
        conflicts.push("-sn".to_string());

        let mut rec = OptionRecord::new(name, FlagCategory::ScanType, description)
            .with_example(&format!("nmap {name} 192.168.1.1"));
        rec.conflicts_with = conflicts;
        if !UNPRIVILEGED_SCAN_TYPES.contains(name) {
            rec.requires_privilege = true;
        }
        records.push(rec);
    }

    // Timing templates: pairwise exclusive.
    for (name, description) in TIMING_TEMPLATES {
        let mut rec = OptionRecord::new(name, FlagCategory::Timing, description)
            .with_example(&format!("nmap {name} 192.168.1.1"));
        rec.conflicts_with = sibling_names(TIMING_TEMPLATES, name);
        records.push(rec);
    }

    // Host discovery.
    {
        let mut ping_scan =
            OptionRecord::new("-sn", FlagCategory::Discovery, "Ping scan (no port scan)")
                .with_example("nmap -sn 192.168.1.0/24");
        ping_scan.conflicts_with = SCAN_TYPES
            .iter()
            .map(|(name, _)| name.to_string())
            .chain(["-p".to_string(), "-Pn".to_string()])
            .collect();
        records.push(ping_scan);

        let mut skip_ping =
            OptionRecord::new("-Pn", FlagCategory::Discovery, "Skip host discovery")
                .with_example("nmap -Pn 192.168.1.1");
        skip_ping.conflicts_with = PING_PROBE_FLAGS
            .iter()
            .map(|f| f.to_string())
            .chain(["-sn".to_string()])
            .collect();
        records.push(skip_ping);

        for name in PING_PROBE_FLAGS {
            records.push(
                OptionRecord::new(name, FlagCategory::Discovery, "Host discovery probe type")
                    .conflicting_with(&["-Pn"])
                    .with_example(&format!("nmap {name} 192.168.1.1")),
            );
        }
    }

    // Port specification.
    records.push(
        OptionRecord::new("-p", FlagCategory::PortSpec, "Port specification")
            .with_argument()
            .conflicting_with(&["-F", "-sn"])
            .with_example("nmap -p 80,443 192.168.1.1"),
    );
    records.push(
        OptionRecord::new("-p-", FlagCategory::PortSpec, "Scan all 65535 ports")
            .conflicting_with(&["-F", "--top-ports"])
            .with_example("nmap -p- 192.168.1.1"),
    );
    records.push(
        OptionRecord::new("-F", FlagCategory::PortSpec, "Fast scan (100 common ports)")
            .conflicting_with(&["-p", "-p-"])
            .with_example("nmap -F 192.168.1.1"),
    );
    records.push(
        OptionRecord::new("--top-ports", FlagCategory::PortSpec, "Scan N most common ports")
            .with_argument()
            .conflicting_with(&["-p-"])
            .with_example("nmap --top-ports 10 192.168.1.1"),
    );

    // Detection.
    records.push(
        OptionRecord::new("-sV", FlagCategory::ServiceDetection, "Service version detection")
            .with_example("nmap -sV 192.168.1.1"),
    );
    records.push(
        OptionRecord::new("-O", FlagCategory::OsDetection, "OS detection")
            .privileged()
            .with_example("nmap -O 192.168.1.1"),
    );
    records.push(
        OptionRecord::new(
            "-A",
            FlagCategory::Aggressive,
            "Aggressive scan (OS, version, scripts, traceroute)",
        )
        .privileged()
        .with_example("nmap -A 192.168.1.1"),
    );

    // Scripting.
    records.push(
        OptionRecord::new("--script", FlagCategory::Scripting, "Run NSE scripts")
            .with_argument()
            .with_example("nmap --script default 192.168.1.1"),
    );
    records.push(
        OptionRecord::new("--script-args", FlagCategory::Scripting, "NSE script arguments")
            .with_argument()
            .with_example("nmap --script http-title --script-args http.useragent=x 192.168.1.1"),
    );

    // Output.
    for (name, description) in [
        ("-oN", "Normal output to file"),
        ("-oX", "XML output to file"),
        ("-oG", "Grepable output to file"),
        ("-oA", "Output in all formats"),
    ] {
        records.push(
            OptionRecord::new(name, FlagCategory::Output, description)
                .with_argument()
                .with_example(&format!("nmap {name} scan 192.168.1.1")),
        );
    }
    records.push(
        OptionRecord::new("-v", FlagCategory::Output, "Verbose output")
            .with_example("nmap -v 192.168.1.1"),
    );

    // Misc.
    records.push(
        OptionRecord::new("--traceroute", FlagCategory::Misc, "Trace path to host")
            .privileged()
            .with_example("nmap --traceroute 192.168.1.1"),
    );
    records.push(
        OptionRecord::new("-6", FlagCategory::Misc, "IPv6 scanning").with_example("nmap -6 ::1"),
    );
    records.push(
        OptionRecord::new("-n", FlagCategory::Misc, "Never resolve DNS")
            .with_example("nmap -n 192.168.1.1"),
    );

    records
        .into_iter()
        .map(|rec| (rec.name.clone(), rec))
        .collect()
}

/// Conflicts of one flag per the embedded table; empty when unknown.
pub fn conflicts_of(flag: &str) -> Vec<String> {
    TABLE
        .get(flag)
        .map(|rec| rec.conflicts_with.clone())
        .unwrap_or_default()
}

/// One record by flag name.
pub fn get(flag: &str) -> Option<&'static OptionRecord> {
    TABLE.get(flag)
}

/// All records matching the filter, sorted by flag name for determinism.
pub fn options(filter: &OptionFilter) -> Vec<OptionRecord> {
    let mut matching: Vec<OptionRecord> = TABLE
        .values()
        .filter(|rec| filter.matches(rec))
        .cloned()
        .collect();
    matching.sort_by(|a, b| a.name.cmp(&b.name));
    matching
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_relations_are_symmetric() {
        for rec in TABLE.values() {
            for other in &rec.conflicts_with {
                let reverse = conflicts_of(other);
                assert!(
                    reverse.contains(&rec.name),
                    "{} lists {} but not the reverse",
                    rec.name,
                    other
                );
            }
        }
    }

    #[test]
    fn test_scan_types_are_pairwise_exclusive() {
        for (a, _) in SCAN_TYPES {
            for (b, _) in SCAN_TYPES {
                if a != b {
                    assert!(conflicts_of(a).contains(&b.to_string()), "{a} vs {b}");
                }
            }
        }
    }

    #[test]
    fn test_ping_scan_conflicts_with_port_flag() {
        assert!(conflicts_of("-sn").contains(&"-p".to_string()));
        assert!(conflicts_of("-p").contains(&"-sn".to_string()));
    }

    #[test]
    fn test_privilege_set_covers_raw_socket_flags() {
        for flag in ["-sS", "-sU", "-sN", "-sF", "-sX", "-sA", "-sW", "-sM", "-O", "--traceroute"] {
            assert!(get(flag).unwrap().requires_privilege, "{flag}");
        }
        assert!(!get("-sT").unwrap().requires_privilege);
        assert!(!get("-sV").unwrap().requires_privilege);
    }

    #[test]
    fn test_unknown_flag_has_no_conflicts() {
        assert!(conflicts_of("--no-such-flag").is_empty());
    }

    #[test]
    fn test_argument_taking_flags_match_tokenizer_set() {
        for rec in TABLE.values() {
            if rec.requires_argument {
                assert!(
                    scanvet_core::ARGUMENT_TAKING_FLAGS.contains(&rec.name.as_str()),
                    "{} takes an argument but the tokenizer does not know it",
                    rec.name
                );
            }
        }
    }
}
