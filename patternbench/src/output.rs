use std::time::Duration;

use patternbench_core::{Metrics, Pattern, Snapshot};
use url::Url;

use crate::cli::OutputFormat;

mod human;
mod json;

pub(crate) trait OutputFormatter: Send + Sync {
    fn print_header(&self, base_url: &Url, patterns: &[Pattern], clients: usize);
    fn progress(&self, snapshot: &Snapshot, elapsed: Duration);
    fn print_summary(&self, metrics: &Metrics, elapsed: Duration) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput::new()),
        OutputFormat::Json => Box::new(json::JsonOutput::default()),
    }
}
