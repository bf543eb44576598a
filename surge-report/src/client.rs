use std::net::SocketAddr;
use std::time::Duration;

use surge_core::parse_report_server;
use tokio::net::UdpSocket;

use crate::error::{Error, Result};
use crate::server::DUMP_COMMAND;

pub const DEFAULT_DUMP_TIMEOUT: Duration = Duration::from_secs(5);

/// Asks a report server (`host[:port]`) for its summary text.
pub async fn dump(report_server: &str, timeout: Duration) -> Result<String> {
    let (host, port) = parse_report_server(report_server)?;
    let target = tokio::net::lookup_host((host.as_str(), port))
        .await?
        .next()
        .ok_or_else(|| Error::Unresolved(report_server.to_string()))?;

    let bind = if target.is_ipv4() {
        SocketAddr::from(([0, 0, 0, 0], 0))
    } else {
        SocketAddr::from(([0u16; 8], 0))
    };
    let socket = UdpSocket::bind(bind).await?;
    socket.send_to(DUMP_COMMAND, target).await?;

    let mut buf = vec![0u8; 64 * 1024];
    let (n, _) = tokio::time::timeout(timeout, socket.recv_from(&mut buf))
        .await
        .map_err(|_| Error::Timeout(timeout))??;
    Ok(String::from_utf8_lossy(&buf[..n]).into_owned())
}
