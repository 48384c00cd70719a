use std::time::Duration;

use patternbench_core::{ClientStatus, Metrics, Pattern, Snapshot};
use url::Url;

mod format;
mod progress;
mod summary;

use format::format_duration;
use progress::HumanProgress;
use summary::render;

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput {
    progress: HumanProgress,
}

impl HumanReadableOutput {
    pub(crate) fn new() -> Self {
        Self {
            progress: HumanProgress::new(),
        }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, base_url: &Url, patterns: &[Pattern], clients: usize) {
        println!("backend: {base_url}");
        let names = patterns
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        println!("patterns: {names} ({clients} clients each)");
        println!();
    }

    fn progress(&self, snapshot: &Snapshot, elapsed: Duration) {
        for pattern in Pattern::ALL {
            let mut clients = 0u64;
            let mut progress_sum = 0u64;
            let (mut done, mut failed) = (0usize, 0usize);
            for rec in snapshot.clients.iter().filter(|r| r.pattern == pattern) {
                clients += 1;
                progress_sum += u64::from(rec.progress);
                match rec.status {
                    ClientStatus::Completed => done += 1,
                    ClientStatus::Failed => failed += 1,
                    ClientStatus::Pending | ClientStatus::Running => {}
                }
            }
            if clients == 0 {
                continue;
            }

            let message = format!(
                "done={done}/{clients} failed={failed} elapsed={}",
                format_duration(elapsed)
            );
            self.progress
                .update(pattern, clients * 100, progress_sum, message);
        }
    }

    fn print_summary(&self, metrics: &Metrics, elapsed: Duration) -> anyhow::Result<()> {
        self.progress.finish();
        print!("{}", render(metrics, elapsed));

        if metrics.totals.failed > 0 {
            eprintln!("{} client(s) failed", metrics.totals.failed);
        }
        Ok(())
    }
}
