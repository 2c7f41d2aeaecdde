mod cli;
mod logging;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::info;

use lateq_core::app::{InstanceLock, ReaperLoop, RequestHandler, Server};
use lateq_core::config::{self, Config};
use lateq_core::queue::QueueRegistry;

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("lateq error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();

    config::load_dotenv();
    let mut config = Config::from_env().context("invalid configuration")?;
    args.apply(&mut config);

    logging::init_logging(args.log_level, &config.log)?;

    // held until the end of run_main
    let _lock = config
        .server
        .lock_file
        .as_ref()
        .map(InstanceLock::acquire)
        .transpose()?;

    let registry = Arc::new(QueueRegistry::new(config.scheduler.lease_policy()));
    let handler = Arc::new(RequestHandler::new(Arc::clone(&registry)));
    let server = Server::bind(
        config.server.bind_addr(),
        handler,
        config.server.max_connections,
    )
    .await
    .with_context(|| format!("failed to bind {}", config.server.bind_addr()))?;

    info!(
        max_lock_time_secs = config.scheduler.max_lock_time.as_secs(),
        "lateq starting"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reaper = config
        .scheduler
        .reaper_interval
        .map(|interval| ReaperLoop::new(Arc::clone(&registry), interval).spawn(shutdown_rx.clone()));
    let mut server = tokio::spawn(server.run(shutdown_rx));

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for ctrl-c")?;
            info!("shutdown requested");
            // ignore send error: receivers may already be dropped
            let _ = shutdown_tx.send(true);
            server.await.context("server task panicked")??;
        }
        finished = &mut server => {
            let _ = shutdown_tx.send(true);
            finished.context("server task panicked")??;
        }
    }

    if let Some(reaper) = reaper {
        reaper.await.context("reaper task panicked")?;
    }
    Ok(())
}
