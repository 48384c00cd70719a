use std::time::Duration;

/// One rounded component: `us`, `ms` or `s` with two decimals.
pub(crate) fn format_duration(d: Duration) -> String {
    let micros = d.as_micros();
    if micros >= 1_000_000 {
        return format!("{:.2}s", d.as_secs_f64());
    }
    if micros >= 1_000 {
        return format!("{}ms", (micros + 500) / 1_000);
    }
    format!("{micros}us")
}

pub(crate) fn format_duration_opt(d: Option<Duration>) -> String {
    d.map_or_else(|| "n/a".to_string(), format_duration)
}
