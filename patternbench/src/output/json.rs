use std::io::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use patternbench_core::{ClientRecord, Metrics, Pattern, PatternMetrics, Snapshot};
use serde::Serialize;
use url::Url;

use super::OutputFormatter;

/// One line per published snapshot version; redraw ticks without a new version print nothing.
#[derive(Default)]
pub(crate) struct JsonOutput {
    last_version: AtomicU64,
}

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _base_url: &Url, _patterns: &[Pattern], _clients: usize) {}

    fn progress(&self, snapshot: &Snapshot, elapsed: Duration) {
        if self.last_version.swap(snapshot.version, Ordering::Relaxed) == snapshot.version {
            return;
        }
        emit_json_line(&build_progress_line(snapshot, elapsed));
    }

    fn print_summary(&self, metrics: &Metrics, elapsed: Duration) -> anyhow::Result<()> {
        emit_json_line(&build_summary_line(metrics, elapsed));
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonProgressLine {
    pub kind: &'static str,
    pub version: u64,
    pub elapsed_secs: f64,
    pub clients: Vec<JsonClient>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonClient {
    pub id: String,
    pub pattern: &'static str,
    pub status: &'static str,
    pub progress: u8,
    pub polls: u32,
    pub duration_secs: Option<f64>,
    pub latency_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&ClientRecord> for JsonClient {
    fn from(rec: &ClientRecord) -> Self {
        Self {
            id: rec.id.to_string(),
            pattern: rec.pattern.as_str(),
            status: rec.status.into(),
            progress: rec.progress,
            polls: rec.polls,
            duration_secs: rec.duration.map(|d| d.as_secs_f64()),
            latency_secs: rec.latency.map(|d| d.as_secs_f64()),
            error: rec.error.clone(),
        }
    }
}

fn build_progress_line(snapshot: &Snapshot, elapsed: Duration) -> JsonProgressLine {
    JsonProgressLine {
        kind: "progress",
        version: snapshot.version,
        elapsed_secs: elapsed.as_secs_f64(),
        clients: snapshot.clients.iter().map(JsonClient::from).collect(),
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine {
    pub kind: &'static str,
    pub elapsed_secs: f64,
    pub patterns: Vec<JsonPatternSummary>,
    pub totals: JsonTotals,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonPatternSummary {
    pub pattern: &'static str,
    pub completed_count: usize,
    pub average_duration_seconds: f64,
    pub failed_count: usize,
    pub in_flight_count: usize,
    pub average_latency_seconds: Option<f64>,
    pub round_trips: u64,
}

impl From<&PatternMetrics> for JsonPatternSummary {
    fn from(m: &PatternMetrics) -> Self {
        Self {
            pattern: m.pattern.as_str(),
            completed_count: m.completed_count,
            average_duration_seconds: m.average_duration_seconds(),
            failed_count: m.failed_count,
            in_flight_count: m.in_flight_count,
            average_latency_seconds: m.average_latency.map(|d| d.as_secs_f64()),
            round_trips: m.round_trips,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonTotals {
    pub clients: usize,
    pub completed: usize,
    pub failed: usize,
    pub in_flight: usize,
    pub round_trips: u64,
}

fn build_summary_line(metrics: &Metrics, elapsed: Duration) -> JsonSummaryLine {
    let t = &metrics.totals;
    JsonSummaryLine {
        kind: "summary",
        elapsed_secs: elapsed.as_secs_f64(),
        patterns: metrics.patterns.iter().map(JsonPatternSummary::from).collect(),
        totals: JsonTotals {
            clients: t.clients,
            completed: t.completed,
            failed: t.failed,
            in_flight: t.in_flight,
            round_trips: t.round_trips,
        },
    }
}

fn emit_json_line<T: Serialize>(line: &T) {
    let mut out = std::io::stdout().lock();
    if serde_json::to_writer(&mut out, line).is_ok() {
        let _ = writeln!(out);
    }
}
