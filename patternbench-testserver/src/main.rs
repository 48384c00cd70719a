use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "patternbench_testserver=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut bind_addr: SocketAddr = "127.0.0.1:0".parse()?;
    let mut config = patternbench_testserver::TestServerConfig::default();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--bind" => {
                let addr = args.next().ok_or_else(|| {
                    anyhow::anyhow!("--bind requires an address, e.g. 127.0.0.1:0")
                })?;
                bind_addr = addr.parse()?;
            }
            "--fast" => config = patternbench_testserver::TestServerConfig::fast(),
            "--fail-submissions" => config.fail_submissions = true,
            "-h" | "--help" => {
                eprintln!(
                    "patternbench-testserver\n\nUSAGE:\n  patternbench-testserver [--bind 127.0.0.1:0] [--fast] [--fail-submissions]\n\nOUTPUT:\n  Prints HTTP_URL=<url> to stdout once ready."
                );
                return Ok(());
            }
            other => {
                return Err(anyhow::anyhow!("unknown argument: {other}"));
            }
        }
    }

    let listener = TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;

    let app = patternbench_testserver::router(
        config,
        patternbench_testserver::TestServerStats::default(),
    );

    println!("HTTP_URL=http://{addr}");
    tracing::info!(%addr, "listening");

    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
    });

    serve.await?;
    Ok(())
}
