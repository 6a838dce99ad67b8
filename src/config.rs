use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::dns_types::{ErrorCode, RecordType};
use crate::error::{ProxyError, Result};
use crate::rule::{NamePattern, RuleValue};
use crate::server::ProxyServer;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 2053;
pub const DEFAULT_NAMESERVERS: [&str; 2] = ["8.8.8.8", "8.8.4.4"];

/// Proxy configuration, usually read from a TOML file
///
/// ```toml
/// host = "0.0.0.0"
/// port = 53
/// nameservers = ["1.1.1.1"]
///
/// [[rules]]
/// type = "A"
/// name = "example.com"
/// result = "10.0.0.1"
///
/// [[rules]]
/// type = "A"
/// pattern = '\.ads\.'
/// error = "NXDomain"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_nameservers")]
    pub nameservers: Vec<String>,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// One `[[rules]]` entry
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    #[serde(rename = "type")]
    pub rtype: RecordType,
    pub name: Option<String>,
    pub pattern: Option<String>,
    pub result: Option<ResultConfig>,
    pub error: Option<ErrorCode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ResultConfig {
    One(String),
    Many(Vec<String>),
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_nameservers() -> Vec<String> {
    DEFAULT_NAMESERVERS.iter().map(|ns| ns.to_string()).collect()
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            nameservers: default_nameservers(),
            rules: Vec::new(),
        }
    }
}

impl ProxyConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
            .map_err(|e| ProxyError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| ProxyError::Config(e.to_string()))
    }

    /// Build a server whose registry is seeded with the configured rules, in
    /// file order
    pub fn into_server(self) -> Result<ProxyServer> {
        let rules = self
            .rules
            .into_iter()
            .map(RuleConfig::into_parts)
            .collect::<Result<Vec<_>>>()?;

        ProxyServer::new(&self.host, self.port, self.nameservers.as_slice(), rules)
    }
}

impl RuleConfig {
    fn into_parts(self) -> Result<(RecordType, NamePattern, RuleValue)> {
        let name = match (self.name, self.pattern) {
            (Some(name), None) => NamePattern::Exact(name),
            (None, Some(pattern)) => NamePattern::pattern(&pattern)?,
            (Some(_), Some(_)) => {
                return Err(ProxyError::Config(format!(
                    "{} rule sets both name and pattern",
                    self.rtype
                )))
            }
            (None, None) => {
                return Err(ProxyError::Config(format!(
                    "{} rule needs a name or a pattern",
                    self.rtype
                )))
            }
        };

        let value = match (self.result, self.error) {
            (Some(ResultConfig::One(value)), None) => RuleValue::Literal(value),
            (Some(ResultConfig::Many(values)), None) => RuleValue::LiteralList(values),
            (None, Some(code)) => RuleValue::ErrorCode(code),
            (Some(_), Some(_)) => {
                return Err(ProxyError::Config(format!(
                    "{} rule for {} sets both result and error",
                    self.rtype, name
                )))
            }
            (None, None) => return Err(ProxyError::InvalidRule),
        };

        Ok((self.rtype, name, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::tests::{Action, RecordingTransaction};

    const SAMPLE: &str = r#"
host = "0.0.0.0"
port = 5300
nameservers = ["1.1.1.1", "9.9.9.9"]

[[rules]]
type = "A"
name = "example.com"
result = "10.0.0.1"

[[rules]]
type = "A"
pattern = '\.test$'
result = ["10.0.0.42", "10.0.0.43"]

[[rules]]
type = "AAAA"
name = "blocked.example"
error = "NXDomain"
"#;

    #[test]
    fn test_parse_sample() {
        let config = ProxyConfig::from_toml(SAMPLE).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5300);
        assert_eq!(config.nameservers, vec!["1.1.1.1", "9.9.9.9"]);
        assert_eq!(config.rules.len(), 3);
        assert_eq!(config.rules[2].rtype, RecordType::AAAA);
        assert_eq!(config.rules[2].error, Some(ErrorCode::NXDomain));
    }

    #[test]
    fn test_defaults() {
        let config = ProxyConfig::from_toml("").unwrap();

        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.nameservers, vec!["8.8.8.8", "8.8.4.4"]);
        assert!(config.rules.is_empty());
    }

    #[test]
    fn test_into_server_keeps_rule_order() {
        let server = ProxyConfig::from_toml(SAMPLE).unwrap().into_server().unwrap();

        assert_eq!(server.rules().len(), 3);

        let mut txn = RecordingTransaction::default();
        server.process("foo.test", RecordType::A, &mut txn).unwrap();
        assert_eq!(
            txn.actions,
            vec![Action::Respond(vec![
                "10.0.0.42".to_string(),
                "10.0.0.43".to_string()
            ])]
        );

        let mut txn = RecordingTransaction::default();
        server
            .process("blocked.example", RecordType::AAAA, &mut txn)
            .unwrap();
        assert_eq!(txn.actions, vec![Action::Fail(ErrorCode::NXDomain)]);
    }

    #[test]
    fn test_rule_without_result_is_invalid() {
        let config = ProxyConfig::from_toml(
            r#"
[[rules]]
type = "A"
name = "example.com"
"#,
        )
        .unwrap();

        assert!(matches!(config.into_server(), Err(ProxyError::InvalidRule)));
    }

    #[test]
    fn test_rule_with_name_and_pattern_is_rejected() {
        let config = ProxyConfig::from_toml(
            r#"
[[rules]]
type = "A"
name = "example.com"
pattern = "example"
result = "10.0.0.1"
"#,
        )
        .unwrap();

        assert!(matches!(config.into_server(), Err(ProxyError::Config(_))));
    }

    #[test]
    fn test_rule_with_result_and_error_is_rejected() {
        let config = ProxyConfig::from_toml(
            r#"
[[rules]]
type = "A"
name = "example.com"
result = "10.0.0.1"
error = "Refused"
"#,
        )
        .unwrap();

        assert!(matches!(config.into_server(), Err(ProxyError::Config(_))));
    }

    #[test]
    fn test_unknown_record_type_is_rejected() {
        let result = ProxyConfig::from_toml(
            r#"
[[rules]]
type = "OPT"
name = "example.com"
result = "10.0.0.1"
"#,
        );

        assert!(matches!(result, Err(ProxyError::Config(_))));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let config = ProxyConfig::from_toml(
            r#"
[[rules]]
type = "A"
pattern = "(oops"
result = "10.0.0.1"
"#,
        )
        .unwrap();

        assert!(matches!(
            config.into_server(),
            Err(ProxyError::InvalidPattern { .. })
        ));
    }
}
