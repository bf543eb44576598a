use std::net::SocketAddr;
use std::path::PathBuf;

use surge_core::{DEFAULT_REPORT_PORT, ResultRecord};
use tokio::net::UdpSocket;
use tokio::sync::oneshot;

use crate::aggregator::Aggregator;
use crate::error::Result;
use crate::render::render;
use crate::rolling::RollingReport;

/// Request payload that asks the server for its current summary.
pub const DUMP_COMMAND: &[u8] = b"dump";

/// Reply to [`DUMP_COMMAND`] before anything was received.
pub const NO_DATA: &str = "No data found.";

/// Reply to [`DUMP_COMMAND`] when the summary exceeds one datagram.
pub const SUMMARY_TOO_LARGE: &str =
    "Summary too large for one datagram; run `calc` on the server's report folder.";

const MAX_DATAGRAM: usize = 64 * 1024;

/// Largest UDP payload over IPv4.
const MAX_REPLY: usize = 65_507;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub group_minutes: u64,
    /// Keep a rolling CSV copy of every record here. `None` keeps statistics only.
    pub report_folder: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], DEFAULT_REPORT_PORT)),
            group_minutes: 60,
            report_folder: None,
        }
    }
}

/// What the receive loop owns. Only the loop task touches it, so no lock is needed.
struct ServerState {
    aggregator: Aggregator,
    persist: Option<RollingReport>,
}

impl ServerState {
    fn dump(&self) -> String {
        render(&self.aggregator).unwrap_or_else(|| NO_DATA.to_string())
    }

    fn accept(&mut self, payload: &[u8], peer: SocketAddr) {
        let record = match ResultRecord::decode(payload) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(%peer, "dropping malformed datagram: {err}");
                return;
            }
        };

        if let Err(err) = self.aggregator.ingest_record(&record) {
            tracing::warn!(%peer, "dropping record: {err}");
            return;
        }
        if let Some(persist) = self.persist.as_mut()
            && let Err(err) = persist.write(&record)
        {
            tracing::warn!(case = %record.id, "failed to persist record: {err}");
        }
    }

    /// The dump reply, or [`SUMMARY_TOO_LARGE`] when it would not fit in one datagram.
    fn reply(&self) -> String {
        let text = self.dump();
        if text.len() > MAX_REPLY {
            tracing::warn!(bytes = text.len(), "summary does not fit in one datagram");
            return SUMMARY_TOO_LARGE.to_string();
        }
        text
    }
}

/// UDP collector: every datagram is either a result record or the `dump` command.
///
/// Failures are per datagram; nothing short of [`ReportServer::shutdown`] stops the loop.
#[derive(Debug)]
pub struct ReportServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl ReportServer {
    pub async fn start(config: ServerConfig) -> Result<Self> {
        let aggregator = Aggregator::with_group_minutes(config.group_minutes)?;
        let socket = UdpSocket::bind(config.bind).await?;
        let addr = socket.local_addr()?;

        let mut state = ServerState {
            aggregator,
            persist: config.report_folder.map(RollingReport::new),
        };

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM];
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    res = socket.recv_from(&mut buf) => {
                        let (n, peer) = match res {
                            Ok(v) => v,
                            Err(err) => {
                                tracing::warn!("receive failed: {err}");
                                continue;
                            }
                        };
                        let payload = &buf[..n];
                        if payload == DUMP_COMMAND {
                            let reply = state.reply();
                            if let Err(err) = socket.send_to(reply.as_bytes(), peer).await {
                                tracing::warn!(%peer, "failed to send summary: {err}");
                            }
                        } else {
                            state.accept(payload, peer);
                        }
                    }
                }
            }
        });

        tracing::info!("serving UDP on {addr}...");
        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ReportServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_datagram_is_dropped() -> crate::Result<()> {
        let mut state = ServerState {
            aggregator: Aggregator::with_group_minutes(60)?,
            persist: None,
        };
        state.accept(b"{not json", SocketAddr::from(([127, 0, 0, 1], 9)));
        assert_eq!(state.dump(), NO_DATA);
        Ok(())
    }

    #[test]
    fn oversized_summary_gets_a_notice() -> crate::Result<()> {
        let mut state = ServerState {
            aggregator: Aggregator::with_group_minutes(60)?,
            persist: None,
        };
        let t = match surge_core::parse_timestamp("2024-03-01 10:00:00.000000") {
            Ok(t) => t,
            Err(err) => panic!("{err}"),
        };
        for i in 0..2_000 {
            let id = format!("case-{i:04}-{}", "x".repeat(40));
            state.aggregator.ingest(&id, t, t, 1.0, true)?;
        }
        assert!(state.dump().len() > MAX_REPLY);
        assert_eq!(state.reply(), SUMMARY_TOO_LARGE);
        Ok(())
    }
}
