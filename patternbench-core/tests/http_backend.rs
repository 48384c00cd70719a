use std::time::Duration;

use patternbench_core::{
    Backend as _, ClientId, ClientStatus, Engine, EngineConfig, HttpBackend, HttpBackendConfig,
    JobChannel as _, JobId, JobState, Pattern,
};
use patternbench_testserver::{TestServer, TestServerConfig};
use url::Url;

fn http_backend(server: &TestServer) -> anyhow::Result<HttpBackend> {
    let url = Url::parse(server.base_url())?;
    Ok(HttpBackend::new(HttpBackendConfig::new(url))?)
}

fn engine(server: &TestServer) -> anyhow::Result<Engine<HttpBackend>> {
    Ok(Engine::new(
        http_backend(server)?,
        EngineConfig {
            poll_interval: Duration::from_millis(20),
        },
    ))
}

async fn settle(engine: &Engine<HttpBackend>) -> anyhow::Result<()> {
    tokio::time::timeout(Duration::from_secs(15), engine.wait_idle()).await?;
    Ok(())
}

#[tokio::test]
async fn every_pattern_completes_against_the_reference_backend() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let engine = engine(&server)?;

    for pattern in Pattern::ALL {
        engine.add_clients(2, pattern)?;
    }
    assert_eq!(engine.snapshot().len(), 10);
    settle(&engine).await?;

    for record in engine.snapshot() {
        assert_eq!(
            record.status,
            ClientStatus::Completed,
            "{} ended as {:?}",
            record.id,
            record.error
        );
        assert_eq!(record.progress, 100);
        assert!(record.polls >= 1);
    }

    let metrics = engine.metrics();
    for pattern in Pattern::ALL {
        let Some(m) = metrics.get(pattern) else {
            panic!("no metrics for {pattern}");
        };
        assert_eq!(m.completed_count, 2, "{pattern}");
        assert_eq!(m.failed_count, 0, "{pattern}");
        assert!(m.average_duration_seconds() > 0.0, "{pattern}");
    }

    let stats = server.stats();
    assert_eq!(stats.submissions(), 10);
    assert_eq!(stats.result_holds(), 2);
    assert_eq!(stats.stream_opens(), 4);
    assert!(stats.status_checks() >= 4);
    assert!(stats.messages_sent() >= 4);
    assert!(
        stats.requests_total() >= stats.submissions() + stats.status_checks() + stats.result_holds()
    );

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn short_polling_costs_more_round_trips_than_long_polling() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let engine = engine(&server)?;

    engine.add_clients(1, Pattern::ShortPoll)?;
    engine.add_clients(1, Pattern::LongPoll)?;
    settle(&engine).await?;

    let metrics = engine.metrics();
    let short = metrics.get(Pattern::ShortPoll).map(|m| m.round_trips);
    let long = metrics.get(Pattern::LongPoll).map(|m| m.round_trips);
    assert_eq!(long, Some(1));
    assert!(short > Some(1), "short polling made {short:?} round trips");

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn rejected_submissions_fail_every_client() -> anyhow::Result<()> {
    let server = TestServer::start_with(TestServerConfig {
        fail_submissions: true,
        ..TestServerConfig::fast()
    })
    .await?;
    let engine = engine(&server)?;

    for pattern in Pattern::ALL {
        engine.add_clients(1, pattern)?;
    }
    settle(&engine).await?;

    for record in engine.snapshot() {
        assert_eq!(record.status, ClientStatus::Failed, "{}", record.id);
        assert!(record.progress < 100);
        let error = record.error.unwrap_or_default();
        assert!(error.contains("500"), "{}: {error}", record.id);
    }
    assert_eq!(engine.metrics().totals.failed, 5);
    assert_eq!(server.stats().stream_opens(), 0);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn held_requests_and_streams_give_up_on_slow_jobs() -> anyhow::Result<()> {
    let server = TestServer::start_with(TestServerConfig {
        steps: 5,
        step_delay: Duration::from_millis(500),
        hold_timeout: Duration::from_millis(100),
        ..TestServerConfig::fast()
    })
    .await?;
    let engine = engine(&server)?;

    let long = engine.add_clients(1, Pattern::LongPoll)?[0];
    let sse = engine.add_clients(1, Pattern::EventStream)?[0];
    let ws = engine.add_clients(1, Pattern::SocketStream)?[0];
    settle(&engine).await?;

    let error_of = |id: ClientId| {
        engine
            .snapshot()
            .into_iter()
            .find(|r| r.id == id)
            .and_then(|r| r.error)
            .unwrap_or_default()
    };
    assert!(error_of(long).contains("timeout"));
    assert_eq!(error_of(sse), "SSE stream closed before completion");
    assert_eq!(error_of(ws), "WebSocket closed before completion");

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn clear_empties_the_snapshot_while_clients_run() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let engine = engine(&server)?;

    engine.add_clients(3, Pattern::ShortPoll)?;
    engine.add_clients(3, Pattern::EventStream)?;
    tokio::time::sleep(Duration::from_millis(30)).await;
    engine.clear_clients();
    assert!(engine.snapshot().is_empty());

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(engine.snapshot().is_empty());
    assert!(engine.subscribe().borrow().clients.is_empty());

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn unknown_jobs_report_not_found() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let backend = http_backend(&server)?;

    let status = backend.get_status(&JobId::new("missing")).await?;
    assert_eq!(status.state, JobState::NotFound);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn event_channel_delivers_progress_in_order() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let backend = http_backend(&server)?;

    let job = backend.submit_job().await?;
    let mut channel = backend.open_event_channel(&job).await?;
    let mut last = 0;
    let mut completed = false;
    while let Some(item) = channel.recv().await {
        let status = item?;
        assert!(status.progress >= last);
        last = status.progress;
        if status.is_completed() {
            completed = true;
            break;
        }
    }
    channel.close().await;

    assert!(completed);
    assert_eq!(last, 100);

    server.shutdown().await;
    Ok(())
}
