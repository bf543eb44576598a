use std::net::SocketAddr;

use anyhow::Context as _;
use surge_report::{ReportServer, ServerConfig};

use crate::cli::ServerStartArgs;

/// Serves until Ctrl-C.
pub async fn start(args: ServerStartArgs) -> anyhow::Result<()> {
    let config = ServerConfig {
        bind: SocketAddr::new(args.bind, args.port),
        group_minutes: args.group_minutes,
        report_folder: (!args.no_report).then_some(args.report_folder),
    };
    let server = ReportServer::start(config)
        .await
        .with_context(|| format!("start report server on {}:{}", args.bind, args.port))?;
    println!("Serving UDP on {}...", server.addr());

    tokio::signal::ctrl_c()
        .await
        .context("wait for shutdown signal")?;
    tracing::info!("shutting down");
    server.shutdown().await;
    Ok(())
}
