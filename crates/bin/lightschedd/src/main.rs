use anyhow::Context;
use lightschedd::config::Config;
use lightschedd::daemon::Daemon;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    let mut daemon = Daemon::build(&config).context("failed to wire the scheduler")?;
    daemon
        .add_demo_devices(&config)
        .context("failed to create demo devices")?;

    let mut events = daemon.bus.subscribe();
    daemon.start().await;
    tracing::info!(entries = daemon.controller.occurrences().len(), "lightschedd running");

    daemon
        .run(&mut events, async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "cannot listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await;

    daemon.stop();
    Ok(())
}
