use anyhow::Context as _;
use std::time::Duration;
use tokio::time::Instant;

use patternbench_core::{Engine, EngineConfig, HttpBackend, HttpBackendConfig};

use crate::cli::RunArgs;
use crate::exit_codes::ExitCode;
use crate::output;
use crate::run_error::RunError;

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let out = output::formatter(args.output);
    let patterns = args.selected_patterns();

    let backend = HttpBackend::new(HttpBackendConfig::new(args.base_url.clone()))
        .context("invalid --base-url")
        .map_err(RunError::InvalidInput)?;
    let engine = Engine::new(
        backend,
        EngineConfig {
            poll_interval: args.poll_interval,
        },
    );

    out.print_header(&args.base_url, &patterns, args.clients);

    let started = Instant::now();
    for &pattern in &patterns {
        engine
            .add_clients(args.clients, pattern)
            .with_context(|| format!("failed to add {pattern} clients"))
            .map_err(RunError::InvalidInput)?;
    }

    let interrupted = watch_until_idle(&engine, out.as_ref(), started).await;

    let metrics = engine.metrics();
    let elapsed = started.elapsed();
    if interrupted {
        engine.clear_clients();
    }

    out.print_summary(&metrics, elapsed)
        .context("failed to print summary")
        .map_err(RunError::RuntimeError)?;

    if interrupted {
        return Err(RunError::RuntimeError(anyhow::anyhow!(
            "interrupted with {} client(s) still running",
            metrics.totals.in_flight
        )));
    }

    Ok(ExitCode::from_failed_clients(metrics.totals.failed))
}

/// Renders every batched snapshot until all clients are terminal. Returns `true` on Ctrl-C.
async fn watch_until_idle(
    engine: &Engine<HttpBackend>,
    out: &dyn output::OutputFormatter,
    started: Instant,
) -> bool {
    let mut rx = engine.subscribe();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    // Redraw at least this often so elapsed time keeps moving while nothing changes.
    let mut tick = tokio::time::interval(Duration::from_millis(500));

    loop {
        let snapshot = rx.borrow_and_update().clone();
        out.progress(&snapshot, started.elapsed());
        if snapshot.is_idle() {
            return false;
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    return false;
                }
            }
            _ = tick.tick() => {}
            _ = &mut ctrl_c => {
                tracing::warn!("interrupted, clearing clients");
                return true;
            }
        }
    }
}
