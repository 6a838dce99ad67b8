//! Rule-driven DNS proxy.
//!
//! Queries are matched against an ordered list of rules; the first match
//! answers locally, fails the query or runs a handler, and anything no rule
//! matches is passed through to the upstream nameservers.

pub mod config;
pub mod dns_types;
pub mod error;
pub mod forwarder;
pub mod local;
pub mod rule;
pub mod server;
pub mod transport;
pub mod udp;

pub use config::ProxyConfig;
pub use dns_types::{ErrorCode, RecordType};
pub use error::{ProxyError, Result};
pub use rule::{handler, Handler, NamePattern, ResponseStrategy, Rule, RuleValue};
pub use server::ProxyServer;
pub use transport::{Resolver, Transaction, Transport};
pub use udp::UdpTransport;
