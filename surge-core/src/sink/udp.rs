use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use crate::record::ResultRecord;

pub const DEFAULT_REPORT_PORT: u16 = 8765;

/// Splits `host[:port]`, falling back to [`DEFAULT_REPORT_PORT`].
pub fn parse_report_server(raw: &str) -> io::Result<(String, u16)> {
    let raw = raw.trim();
    match raw.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => {
            let port = port.parse::<u16>().map_err(|_| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("invalid report server port in `{raw}`"),
                )
            })?;
            Ok((host.to_string(), port))
        }
        Some(_) => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid report server `{raw}` (expected host[:port])"),
        )),
        None if raw.is_empty() => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "report server cannot be empty",
        )),
        None => Ok((raw.to_string(), DEFAULT_REPORT_PORT)),
    }
}

/// Best-effort datagram sender. Nothing is acknowledged or retried.
#[derive(Debug)]
pub struct UdpReporter {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpReporter {
    pub fn connect(report_server: &str) -> io::Result<Self> {
        let (host, port) = parse_report_server(report_server)?;
        let target = (host.as_str(), port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("report server `{host}` did not resolve"),
                )
            })?;

        let bind: SocketAddr = if target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(bind)?;
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    pub fn send(&self, record: &ResultRecord) -> io::Result<()> {
        let payload = record.encode().map_err(io::Error::other)?;
        self.socket.send_to(&payload, self.target)?;
        Ok(())
    }
}
