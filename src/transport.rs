use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::dns_types::ErrorCode;
use crate::error::{ProxyError, Result};
use crate::server::ProxyServer;

/// Upstream nameservers are always reached over UDP on this port
pub const UPSTREAM_PORT: u16 = 53;

/// Per-query handle handed out by the transport.
///
/// Rules signal the outcome of a query through exactly one of these calls.
pub trait Transaction {
    /// Answer the query with the given values, in order
    fn respond_with(&mut self, values: &[String]);

    /// Fail the query with a response code
    fn fail_with(&mut self, code: ErrorCode);

    /// Forward the query unmodified to the upstream resolver
    fn passthrough(&mut self, resolver: &Resolver);
}

/// Listens for queries and calls back into the server once per query.
pub trait Transport {
    fn serve(self, server: Arc<ProxyServer>) -> Result<()>;
}

/// Handle to the upstream nameservers used for passthrough.
///
/// Cheap to clone; shared read-only across every in-flight query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolver {
    nameservers: Arc<[SocketAddr]>,
}

impl Resolver {
    /// Build a resolver from a list of upstream IP addresses
    pub fn new<S: AsRef<str>>(nameservers: &[S]) -> Result<Self> {
        let nameservers = nameservers
            .iter()
            .map(|addr| {
                let addr = addr.as_ref();
                addr.trim()
                    .parse::<IpAddr>()
                    .map(|ip| SocketAddr::new(ip, UPSTREAM_PORT))
                    .map_err(|_| ProxyError::InvalidNameserver(addr.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            nameservers: nameservers.into(),
        })
    }

    /// Upstream endpoints, in the order they are tried
    pub fn nameservers(&self) -> &[SocketAddr] {
        &self.nameservers
    }

    /// Resolver with explicit endpoints, for upstream doubles on ephemeral ports
    #[cfg(test)]
    pub(crate) fn from_addrs(nameservers: Vec<SocketAddr>) -> Self {
        Self {
            nameservers: nameservers.into(),
        }
    }
}
