//! Time breakdown of a command sequence

use workflow_coach_sdk::{Command, TimeAnalysis};

/// Millisecond spans behind a [`TimeAnalysis`]
#[derive(Debug, Clone, Copy, PartialEq)]
struct Spans {
    total_ms: f64,
    active_ms: f64,
    idle_ms: f64,
}

fn spans(commands: &[Command]) -> Option<Spans> {
    let first = commands.first()?;
    let last = commands.last()?;

    let total_ms = (last.timestamp - first.timestamp).num_milliseconds().max(0) as f64;
    let active_ms: f64 = commands
        .iter()
        .filter_map(|c| c.duration_ms)
        .map(|d| d as f64)
        .sum();

    Some(Spans {
        total_ms,
        active_ms,
        idle_ms: (total_ms - active_ms).max(0.0),
    })
}

/// Compute total/active/idle/average step time in whole seconds
///
/// Total time spans the first to the last command timestamp, active time is
/// the sum of recorded durations and idle time is the remainder (never
/// negative). An empty sequence yields all zeros.
pub fn analyze_time(commands: &[Command]) -> TimeAnalysis {
    let Some(spans) = spans(commands) else {
        return TimeAnalysis::default();
    };
    let avg_ms = spans.active_ms / commands.len() as f64;

    TimeAnalysis {
        total_time_sec: ms_to_secs(spans.total_ms),
        active_time_sec: ms_to_secs(spans.active_ms),
        idle_time_sec: ms_to_secs(spans.idle_ms),
        avg_step_time_sec: ms_to_secs(avg_ms),
    }
}

/// Share of the total span spent idle, from unrounded milliseconds
///
/// Zero when the sequence is empty or spans no time.
pub fn idle_ratio(commands: &[Command]) -> f64 {
    match spans(commands) {
        Some(spans) if spans.total_ms > 0.0 => spans.idle_ms / spans.total_ms,
        _ => 0.0,
    }
}

fn ms_to_secs(ms: f64) -> u64 {
    (ms / 1000.0).round() as u64
}
