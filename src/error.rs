use thiserror::Error;

use crate::dns_types::RecordType;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("must specify a result value or a handler")]
    InvalidRule,

    #[error("Invalid name pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Unknown record type: {0}")]
    UnknownRecordType(String),

    #[error("Unknown error code: {0}")]
    UnknownErrorCode(String),

    #[error("Invalid nameserver address: {0}")]
    InvalidNameserver(String),

    #[error("Handler for {rtype} {name} failed: {source:#}")]
    Handler {
        rtype: RecordType,
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Cannot answer {rtype} query with '{value}'")]
    InvalidAnswer { rtype: RecordType, value: String },

    #[error("Upstream lookup failed: {0}")]
    Upstream(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = ProxyError> = std::result::Result<T, E>;
