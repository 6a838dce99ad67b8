use anyhow::Context;
use clap::Parser;
use dns_rule_proxy::ProxyConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dns-rule-proxy")]
#[command(about = "DNS proxy that answers, fails or forwards queries by rule")]
struct Args {
    /// TOML file with listen address, nameservers and rules
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Listen address (overrides the config file)
    #[arg(long)]
    host: Option<String>,

    /// Listen port (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Upstream nameserver IP, reached over UDP port 53; repeatable
    #[arg(short, long = "nameserver", value_name = "IP")]
    nameservers: Vec<String>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => ProxyConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => ProxyConfig::default(),
    };

    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if !args.nameservers.is_empty() {
        config.nameservers = args.nameservers;
    }

    info!(rules = config.rules.len(), "Loaded configuration");

    let server = config.into_server().context("Invalid rule configuration")?;
    server.serve().context("DNS proxy stopped")?;

    Ok(())
}
