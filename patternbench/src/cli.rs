use clap::{Args, Parser, Subcommand};
use patternbench_core::Pattern;
use std::time::Duration;
use url::Url;

const DURATION_HINT: &str = "expected e.g. 1s, 250ms, 1m";

fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    let split = s.find(|ch: char| !ch.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    if digits.is_empty() {
        return Err(format!("invalid duration '{s}' ({DURATION_HINT})"));
    }

    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration '{s}' ({DURATION_HINT})"))?;
    let too_large = || format!("duration '{s}' is too large");

    let duration = match unit.trim() {
        "ms" | "millis" => Duration::from_millis(value),
        "" | "s" | "sec" | "secs" => Duration::from_secs(value),
        "m" | "min" | "mins" => Duration::from_secs(value.checked_mul(60).ok_or_else(too_large)?),
        "h" | "hr" | "hrs" => {
            Duration::from_secs(value.checked_mul(3600).ok_or_else(too_large)?)
        }
        _ => return Err(format!("invalid duration '{s}' ({DURATION_HINT})")),
    };

    if duration.is_zero() {
        return Err(format!("duration '{s}' must be greater than zero"));
    }
    Ok(duration)
}

fn parse_pattern(input: &str) -> Result<Pattern, String> {
    input.trim().parse::<Pattern>().map_err(|_| {
        let known = Pattern::ALL
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!("unknown pattern '{input}' (expected one of: {known})")
    })
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Progress bars and a human-readable summary.
    HumanReadable,
    /// Emit JSON snapshot lines (NDJSON) and a summary line to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "patternbench",
    author,
    version,
    about = "Compare client/server interaction patterns against a job backend",
    long_about = "patternbench drives simulated clients through request-response, short polling, long polling, server-sent events and websockets against the same job backend, then compares how long each pattern took and how many round trips it cost.",
    after_help = "Examples:\n  patternbench run --base-url http://127.0.0.1:8000\n  patternbench run --base-url http://127.0.0.1:8000 --pattern sse --pattern websocket --clients 20\n  patternbench run --base-url http://127.0.0.1:8000 --pattern short_polling --poll-interval 250ms --output json"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a simulation and print a per-pattern summary
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Base URL of the job backend
    #[arg(long, env = "PATTERNBENCH_BASE_URL")]
    pub base_url: Url,

    /// Pattern to simulate (repeatable; defaults to all five)
    #[arg(long = "pattern", value_name = "PATTERN", value_parser = parse_pattern)]
    pub patterns: Vec<Pattern>,

    /// Simulated clients per pattern
    #[arg(long, default_value_t = 1)]
    pub clients: usize,

    /// Delay between short-poll status checks (e.g. 1s, 250ms)
    #[arg(long, value_parser = parse_duration, default_value = "1s")]
    pub poll_interval: Duration,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}

impl RunArgs {
    /// Selected patterns, deduplicated, in the order given.
    pub fn selected_patterns(&self) -> Vec<Pattern> {
        if self.patterns.is_empty() {
            return Pattern::ALL.to_vec();
        }
        let mut out = Vec::with_capacity(self.patterns.len());
        for &p in &self.patterns {
            if !out.contains(&p) {
                out.push(p);
            }
        }
        out
    }
}
