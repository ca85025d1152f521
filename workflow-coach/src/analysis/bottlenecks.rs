//! Bottleneck detection over a command sequence

use std::collections::HashMap;
use workflow_coach_sdk::Command;

/// A step is slow when it takes more than this multiple of the mean duration
const SLOW_STEP_FACTOR: f64 = 2.0;
/// Failures above this count are reported
const FAILURE_THRESHOLD: usize = 2;
/// Repetitions of one command above this count are reported
const REPETITION_THRESHOLD: usize = 3;

/// Detect sources of inefficiency in the sequence
///
/// Produces at most one slow-step message, at most one failure message and
/// one message per over-repeated command (in order of first appearance).
pub fn detect_bottlenecks(commands: &[Command]) -> Vec<String> {
    let mut bottlenecks = Vec::new();

    let durations: Vec<u64> = commands.iter().filter_map(|c| c.duration_ms).collect();
    if !durations.is_empty() {
        let mean = durations.iter().sum::<u64>() as f64 / durations.len() as f64;
        let slow = durations
            .iter()
            .filter(|&&d| d as f64 > SLOW_STEP_FACTOR * mean)
            .count();
        if slow > 0 {
            bottlenecks.push(format!(
                "{} slow steps took more than twice the average duration ({:.1}s)",
                slow,
                mean / 1000.0
            ));
        }
    }

    let failures = commands.iter().filter(|c| !c.success).count();
    if failures > FAILURE_THRESHOLD {
        bottlenecks.push(format!(
            "High failure rate: {} failed steps in this workflow",
            failures
        ));
    }

    for (command, count) in repeated_commands(commands) {
        bottlenecks.push(format!("Command '{}' repeated {} times", command, count));
    }

    bottlenecks
}

/// Commands repeated more than the threshold, in order of first appearance
fn repeated_commands(commands: &[Command]) -> Vec<(&str, usize)> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for c in commands {
        let entry = counts.entry(c.command.as_str()).or_insert(0);
        if *entry == 0 {
            order.push(c.command.as_str());
        }
        *entry += 1;
    }

    order
        .into_iter()
        .map(|cmd| (cmd, counts[cmd]))
        .filter(|(_, count)| *count > REPETITION_THRESHOLD)
        .collect()
}
