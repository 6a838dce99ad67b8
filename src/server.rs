use std::sync::Arc;

use tracing::{debug, info};

use crate::dns_types::RecordType;
use crate::error::Result;
use crate::rule::{Handler, NamePattern, Rule, RuleValue};
use crate::transport::{Resolver, Transaction, Transport};
use crate::udp::UdpTransport;

/// Rule-driven DNS proxy.
///
/// Rules are registered while the server is being built. Serving consumes the
/// server, so the registry is read-only once queries start arriving.
#[derive(Debug)]
pub struct ProxyServer {
    host: String,
    port: u16,
    rules: Vec<Rule>,
    resolver: Resolver,
}

impl ProxyServer {
    /// Create a server and seed its registry with `rules`, in order
    pub fn new<S, I, N>(host: &str, port: u16, nameservers: &[S], rules: I) -> Result<Self>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = (RecordType, N, RuleValue)>,
        N: Into<NamePattern>,
    {
        let mut server = Self {
            host: host.to_string(),
            port,
            rules: Vec::new(),
            resolver: Resolver::new(nameservers)?,
        };

        for (rtype, name, value) in rules {
            server.add_rule(rtype, name, Some(value), None)?;
        }

        Ok(server)
    }

    /// Like [`ProxyServer::new`], then hands the server to `configure` so the
    /// caller can register further rules before serving.
    pub fn with_configure<S, I, N, F>(
        host: &str,
        port: u16,
        nameservers: &[S],
        rules: I,
        configure: F,
    ) -> Result<Self>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = (RecordType, N, RuleValue)>,
        N: Into<NamePattern>,
        F: FnOnce(&mut ProxyServer) -> Result<()>,
    {
        let mut server = Self::new(host, port, nameservers, rules)?;
        configure(&mut server)?;
        Ok(server)
    }

    /// Append a rule to the registry. Fails when neither a result nor a
    /// handler is given.
    pub fn add_rule(
        &mut self,
        rtype: RecordType,
        name: impl Into<NamePattern>,
        result: Option<RuleValue>,
        handler: Option<Handler>,
    ) -> Result<()> {
        let rule = Rule::new(rtype, name, result, handler)?;
        debug!(rtype = %rule.rtype(), pattern = %rule.name(), "Registered rule");
        self.rules.push(rule);
        Ok(())
    }

    /// Listen address
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Listen port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Registered rules, in match order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The upstream handle used for passthrough; clone it into handlers that
    /// want to forward.
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Swap the upstream handle, for upstream doubles on ephemeral ports
    #[cfg(test)]
    pub(crate) fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Resolve one decoded query: the first matching rule handles it, and a
    /// query no rule matches is passed through to the upstream resolver.
    pub fn process(
        &self,
        name: &str,
        rtype: RecordType,
        transaction: &mut dyn Transaction,
    ) -> Result<()> {
        match self.rules.iter().find(|rule| rule.matches(rtype, name)) {
            Some(rule) => rule.invoke(rtype, name, transaction),
            None => {
                debug!(%rtype, query = name, "No rule matched, passing through");
                transaction.passthrough(&self.resolver);
                Ok(())
            }
        }
    }

    /// Serve queries over UDP on the configured host and port until the
    /// socket fails.
    pub fn serve(self) -> Result<()> {
        let transport = UdpTransport::bind(&self.host, self.port)?;
        self.serve_with(transport)
    }

    /// Serve queries from any transport
    pub fn serve_with<T: Transport>(self, transport: T) -> Result<()> {
        info!(
            host = %self.host,
            port = self.port,
            rules = self.rules.len(),
            nameservers = ?self.resolver.nameservers(),
            "Starting DNS proxy"
        );
        transport.serve(Arc::new(self))
    }
}
