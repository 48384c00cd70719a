use std::fmt::Write as _;
use std::time::Duration;

use patternbench_core::Metrics;

use super::format::{format_duration, format_duration_opt};

pub(crate) fn render(metrics: &Metrics, elapsed: Duration) -> String {
    let mut out = String::new();

    if metrics.totals.clients == 0 {
        out.push_str("summary: no clients\n");
        return out;
    }

    out.push_str("summary\n");

    for m in metrics.patterns.iter().filter(|m| {
        m.completed_count + m.failed_count + m.in_flight_count > 0
    }) {
        writeln!(&mut out, "pattern: {}", m.pattern).ok();
        writeln!(
            &mut out,
            "  clients: completed {} failed {}",
            m.completed_count, m.failed_count
        )
        .ok();
        if m.in_flight_count > 0 {
            writeln!(&mut out, "  unfinished: {}", m.in_flight_count).ok();
        }
        writeln!(
            &mut out,
            "  avg duration: {:.2}s",
            m.average_duration_seconds()
        )
        .ok();
        writeln!(
            &mut out,
            "  avg latency: {}",
            format_duration_opt(m.average_latency)
        )
        .ok();
        writeln!(&mut out, "  round trips: {}", m.round_trips).ok();
        out.push('\n');
    }

    let t = &metrics.totals;
    writeln!(
        &mut out,
        "total: clients={} completed={} failed={} round_trips={} elapsed={}",
        t.clients,
        t.completed,
        t.failed,
        t.round_trips,
        format_duration(elapsed)
    )
    .ok();

    out
}
