use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::error::{ProxyError, Result};
use crate::transport::Resolver;

/// Largest datagram we read from a client or an upstream nameserver (EDNS sized)
pub const MAX_PACKET_SIZE: usize = 4096;

/// How long a single nameserver gets to reply
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(5);

/// Forward a raw query to the resolver's nameservers, in order, and return the
/// first reply unmodified.
pub fn forward_to_resolver(resolver: &Resolver, query: &[u8]) -> Result<Bytes> {
    forward_to_nameservers(resolver.nameservers(), query)
}

fn forward_to_nameservers(nameservers: &[SocketAddr], query: &[u8]) -> Result<Bytes> {
    let mut last_error = None;

    for &nameserver in nameservers {
        match exchange(nameserver, query) {
            Ok(response) => {
                debug!(%nameserver, bytes = response.len(), "Upstream replied");
                return Ok(response);
            }
            Err(e) => {
                debug!(%nameserver, error = %e, "Upstream did not reply");
                last_error = Some(format!("{}: {}", nameserver, e));
            }
        }
    }

    Err(ProxyError::Upstream(
        last_error.unwrap_or_else(|| "no nameservers configured".to_string()),
    ))
}

fn exchange(nameserver: SocketAddr, query: &[u8]) -> io::Result<Bytes> {
    let bind_addr = if nameserver.is_ipv4() {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
    } else {
        SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
    };

    let socket = UdpSocket::bind(bind_addr)?;
    socket.set_read_timeout(Some(UPSTREAM_TIMEOUT))?;
    socket.connect(nameserver)?;
    socket.send(query)?;

    let mut buf = BytesMut::zeroed(MAX_PACKET_SIZE);
    let size = socket.recv(&mut buf)?;
    buf.truncate(size);

    Ok(buf.freeze())
}
