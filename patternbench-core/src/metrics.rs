use std::time::Duration;

use crate::{ClientRecord, ClientStatus, Pattern};

/// Summary statistics for one pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternMetrics {
    pub pattern: Pattern,
    pub completed_count: usize,
    /// Mean duration over completed clients; zero when none completed.
    pub average_duration: Duration,
    pub failed_count: usize,
    /// Pending or running clients.
    pub in_flight_count: usize,
    /// Mean of the latest latency sample over clients that reported one.
    pub average_latency: Option<Duration>,
    pub round_trips: u64,
}

impl PatternMetrics {
    #[must_use]
    pub fn average_duration_seconds(&self) -> f64 {
        self.average_duration.as_secs_f64()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Totals {
    pub clients: usize,
    pub completed: usize,
    pub failed: usize,
    pub in_flight: usize,
    pub round_trips: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    /// One entry per pattern, in [`Pattern::ALL`] order.
    pub patterns: Vec<PatternMetrics>,
    pub totals: Totals,
}

impl Metrics {
    #[must_use]
    pub fn get(&self, pattern: Pattern) -> Option<&PatternMetrics> {
        self.patterns.iter().find(|m| m.pattern == pattern)
    }
}

/// Recomputes per-pattern metrics from scratch.
#[must_use]
pub fn aggregate(records: &[ClientRecord]) -> Metrics {
    let patterns = Pattern::ALL
        .iter()
        .map(|&pattern| pattern_metrics(pattern, records))
        .collect::<Vec<_>>();

    let totals = Totals {
        clients: records.len(),
        completed: patterns.iter().map(|m| m.completed_count).sum(),
        failed: patterns.iter().map(|m| m.failed_count).sum(),
        in_flight: patterns.iter().map(|m| m.in_flight_count).sum(),
        round_trips: patterns.iter().map(|m| m.round_trips).sum(),
    };

    Metrics { patterns, totals }
}

fn pattern_metrics(pattern: Pattern, records: &[ClientRecord]) -> PatternMetrics {
    let mut completed = 0usize;
    let mut failed = 0usize;
    let mut in_flight = 0usize;
    let mut duration_total = Duration::ZERO;
    let mut latency_total = Duration::ZERO;
    let mut latency_samples = 0u32;
    let mut round_trips = 0u64;

    for rec in records.iter().filter(|r| r.pattern == pattern) {
        round_trips = round_trips.saturating_add(u64::from(rec.polls));
        if let Some(latency) = rec.latency {
            latency_total = latency_total.saturating_add(latency);
            latency_samples = latency_samples.saturating_add(1);
        }

        match rec.status {
            ClientStatus::Completed => {
                completed += 1;
                duration_total = duration_total.saturating_add(rec.duration.unwrap_or_default());
            }
            ClientStatus::Failed => failed += 1,
            ClientStatus::Pending | ClientStatus::Running => in_flight += 1,
        }
    }

    PatternMetrics {
        pattern,
        completed_count: completed,
        average_duration: mean(duration_total, completed),
        failed_count: failed,
        in_flight_count: in_flight,
        average_latency: (latency_samples > 0).then(|| latency_total / latency_samples),
        round_trips,
    }
}

fn mean(total: Duration, count: usize) -> Duration {
    match u32::try_from(count) {
        Ok(0) => Duration::ZERO,
        Ok(n) => total / n,
        Err(_) => Duration::from_secs_f64(total.as_secs_f64() / count as f64),
    }
}
