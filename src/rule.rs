use std::fmt;
use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use crate::dns_types::{ErrorCode, RecordType};
use crate::error::{ProxyError, Result};
use crate::transport::Transaction;

/// Caller-supplied logic that builds a dynamic answer.
///
/// The handler is responsible for calling one of the transaction actions.
pub type Handler =
    Arc<dyn Fn(RecordType, &str, &mut dyn Transaction) -> anyhow::Result<()> + Send + Sync>;

/// Wrap a closure as a rule handler
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(RecordType, &str, &mut dyn Transaction) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// The name half of a rule's match condition
#[derive(Debug, Clone)]
pub enum NamePattern {
    /// Case-sensitive equality with the queried name
    Exact(String),
    /// Regex search anywhere in the queried name
    Pattern(Regex),
}

impl NamePattern {
    /// Compile a regex pattern
    pub fn pattern(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(NamePattern::Pattern)
            .map_err(|source| ProxyError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    /// Exact equality, or a regex hit anywhere in `name`
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NamePattern::Exact(exact) => exact == name,
            NamePattern::Pattern(regex) => regex.is_match(name),
        }
    }
}

impl From<&str> for NamePattern {
    fn from(name: &str) -> Self {
        NamePattern::Exact(name.to_string())
    }
}

impl From<String> for NamePattern {
    fn from(name: String) -> Self {
        NamePattern::Exact(name)
    }
}

impl From<Regex> for NamePattern {
    fn from(regex: Regex) -> Self {
        NamePattern::Pattern(regex)
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamePattern::Exact(name) => f.write_str(name),
            NamePattern::Pattern(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

/// A fixed result given at registration time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleValue {
    Literal(String),
    LiteralList(Vec<String>),
    ErrorCode(ErrorCode),
}

impl From<&str> for RuleValue {
    fn from(value: &str) -> Self {
        RuleValue::Literal(value.to_string())
    }
}

impl From<String> for RuleValue {
    fn from(value: String) -> Self {
        RuleValue::Literal(value)
    }
}

impl From<Vec<String>> for RuleValue {
    fn from(values: Vec<String>) -> Self {
        RuleValue::LiteralList(values)
    }
}

impl From<Vec<&str>> for RuleValue {
    fn from(values: Vec<&str>) -> Self {
        RuleValue::LiteralList(values.into_iter().map(str::to_string).collect())
    }
}

impl From<ErrorCode> for RuleValue {
    fn from(code: ErrorCode) -> Self {
        RuleValue::ErrorCode(code)
    }
}

/// What a matching rule does with the query
#[derive(Clone)]
pub enum ResponseStrategy {
    Literal(String),
    LiteralList(Vec<String>),
    ErrorCode(ErrorCode),
    Handler(Handler),
}

impl From<RuleValue> for ResponseStrategy {
    fn from(value: RuleValue) -> Self {
        match value {
            RuleValue::Literal(value) => ResponseStrategy::Literal(value),
            RuleValue::LiteralList(values) => ResponseStrategy::LiteralList(values),
            RuleValue::ErrorCode(code) => ResponseStrategy::ErrorCode(code),
        }
    }
}

impl fmt::Debug for ResponseStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseStrategy::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            ResponseStrategy::LiteralList(values) => {
                f.debug_tuple("LiteralList").field(values).finish()
            }
            ResponseStrategy::ErrorCode(code) => f.debug_tuple("ErrorCode").field(code).finish(),
            ResponseStrategy::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

/// A match condition bound to a response strategy
#[derive(Debug, Clone)]
pub struct Rule {
    rtype: RecordType,
    name: NamePattern,
    result: ResponseStrategy,
}

impl Rule {
    /// Build a rule from a fixed result, a handler, or both.
    ///
    /// When both are given the handler wins. Giving neither is an error.
    pub fn new(
        rtype: RecordType,
        name: impl Into<NamePattern>,
        result: Option<RuleValue>,
        handler: Option<Handler>,
    ) -> Result<Self> {
        let result = match (handler, result) {
            (Some(handler), _) => ResponseStrategy::Handler(handler),
            (None, Some(value)) => value.into(),
            (None, None) => return Err(ProxyError::InvalidRule),
        };

        Ok(Self {
            rtype,
            name: name.into(),
            result,
        })
    }

    /// Record type this rule answers
    pub fn rtype(&self) -> RecordType {
        self.rtype
    }

    /// Name condition
    pub fn name(&self) -> &NamePattern {
        &self.name
    }

    /// What the rule does once matched
    pub fn result(&self) -> &ResponseStrategy {
        &self.result
    }

    /// True when both the type and the name condition hold
    pub fn matches(&self, rtype: RecordType, name: &str) -> bool {
        self.rtype == rtype && self.name.matches(name)
    }

    /// Run this rule's strategy against the transaction
    pub fn invoke(
        &self,
        rtype: RecordType,
        name: &str,
        transaction: &mut dyn Transaction,
    ) -> Result<()> {
        debug!(rule = %self.name, %rtype, query = name, strategy = ?self.result, "Rule matched");

        match &self.result {
            ResponseStrategy::Handler(handler) => {
                handler(rtype, name, transaction).map_err(|source| ProxyError::Handler {
                    rtype,
                    name: name.to_string(),
                    source,
                })
            }
            ResponseStrategy::ErrorCode(code) => {
                transaction.fail_with(*code);
                Ok(())
            }
            ResponseStrategy::Literal(value) => {
                transaction.respond_with(std::slice::from_ref(value));
                Ok(())
            }
            ResponseStrategy::LiteralList(values) => {
                transaction.respond_with(values);
                Ok(())
            }
        }
    }
}
