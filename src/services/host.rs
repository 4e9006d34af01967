use crate::core::monitor::ResourceUsage;
use std::fs;

/// Samples process and host utilization from procfs
///
/// Every field degrades to `None` when the source is missing or unreadable,
/// so a probe never fails a request.
#[derive(Debug, Clone, Default)]
pub struct HostProbe;

impl HostProbe {
    pub fn new() -> Self {
        Self
    }

    pub fn sample(&self) -> ResourceUsage {
        let resident = fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|s| parse_kib_field(&s, "VmRSS:"));
        let total = fs::read_to_string("/proc/meminfo")
            .ok()
            .and_then(|s| parse_kib_field(&s, "MemTotal:"));
        let load = fs::read_to_string("/proc/loadavg")
            .ok()
            .and_then(|s| parse_load_average(&s));

        ResourceUsage {
            resident_memory_bytes: resident,
            memory_utilization: match (resident, total) {
                (Some(r), Some(t)) if t > 0 => Some(r as f64 / t as f64),
                _ => None,
            },
            load_average_1m: load,
        }
    }
}

/// Parse a `Name:   1234 kB` line into bytes
fn parse_kib_field(contents: &str, field: &str) -> Option<u64> {
    contents
        .lines()
        .find_map(|line| line.strip_prefix(field))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kib| kib.parse::<u64>().ok())
        .map(|kib| kib * 1024)
}

fn parse_load_average(contents: &str) -> Option<f64> {
    contents.split_whitespace().next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kib_field() {
        let status = "Name:\trfq-match\nVmPeak:\t  20480 kB\nVmRSS:\t   10240 kB\n";
        assert_eq!(parse_kib_field(status, "VmRSS:"), Some(10240 * 1024));
        assert_eq!(parse_kib_field(status, "VmSwap:"), None);
    }

    #[test]
    fn test_parse_load_average() {
        assert_eq!(parse_load_average("0.42 0.30 0.25 1/123 4567\n"), Some(0.42));
        assert_eq!(parse_load_average(""), None);
    }

    #[test]
    fn test_sample_never_panics() {
        let usage = HostProbe::new().sample();
        if let Some(util) = usage.memory_utilization {
            assert!(util > 0.0 && util <= 1.0);
        }
    }
}
