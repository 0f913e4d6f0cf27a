// Advisory resource figures for a pipeline run.
//
// Memory is sampled from the orchestrating process, not the child, so it
// reflects service footprint rather than the submission's. CPU is reported
// as the run's wall-clock duration.

use crate::config::types::ResourceUsage;
use nix::sys::resource::{getrusage, UsageWho};
use nix::unistd::{sysconf, SysconfVar};
use std::time::Duration;

/// Resident set size of the current process in KiB
pub fn process_resident_kb() -> u64 {
    statm_resident_kb().unwrap_or_else(max_rss_kb)
}

/// Sample usage for a run that took `elapsed`
pub fn sample(elapsed: Duration) -> ResourceUsage {
    ResourceUsage {
        memory_kb: process_resident_kb(),
        cpu_ms: elapsed.as_millis() as u64,
    }
}

fn statm_resident_kb() -> Option<u64> {
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    parse_statm_resident_pages(&statm).map(|pages| pages * page_size_kb())
}

fn parse_statm_resident_pages(statm: &str) -> Option<u64> {
    statm.split_whitespace().nth(1)?.parse().ok()
}

fn page_size_kb() -> u64 {
    match sysconf(SysconfVar::PAGE_SIZE) {
        Ok(Some(size)) if size > 0 => size as u64 / 1024,
        _ => 4,
    }
}

/// Peak RSS from getrusage; KiB on Linux
fn max_rss_kb() -> u64 {
    getrusage(UsageWho::RUSAGE_SELF)
        .map(|usage| usage.max_rss().max(0) as u64)
        .unwrap_or(0)
}
