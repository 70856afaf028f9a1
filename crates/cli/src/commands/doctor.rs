//! The `doctor` command: connectivity checks against the metrics backend

use anyhow::{anyhow, bail, Context, Result};
use rightsize_lib::parser::parse_instant_vector;
use rightsize_lib::{HttpGateway, MetricsGateway, QueryOptions};
use std::time::Duration;

use crate::config::CliConfig;
use crate::output::{print_error, print_info, print_success};

/// Smallest query whose result is an instant vector
const PROBE_QUERY: &str = "vector(1)";

/// Run every check and fail if any of them failed
pub async fn doctor(config: &CliConfig) -> Result<()> {
    print_info(&format!("Checking {}", config.gateway_url));

    let gateway = HttpGateway::with_timeout(&config.gateway_url, Duration::from_secs(config.timeout_secs))
        .context("Failed to create metrics gateway")?;

    let mut failures = 0;

    match check_dns(&gateway).await {
        Ok(addrs) => print_success(&format!("DNS: resolved to {}", addrs)),
        Err(e) => {
            failures += 1;
            print_error(&format!("DNS: {e:#}"));
        }
    }

    match gateway.check_health().await {
        Ok(status) => print_success(&format!("Health: {status}")),
        Err(e) => {
            failures += 1;
            print_error(&format!("Health: {e}"));
        }
    }

    match check_query(&gateway).await {
        Ok(samples) => print_success(&format!("Query: {PROBE_QUERY} returned {samples} sample(s)")),
        Err(e) => {
            failures += 1;
            print_error(&format!("Query: {e:#}"));
        }
    }

    if failures > 0 {
        bail!("{failures} check(s) failed");
    }
    Ok(())
}

async fn check_dns(gateway: &HttpGateway) -> Result<String> {
    let url = gateway.base_url();
    let host = gateway.host().ok_or_else(|| anyhow!("gateway URL has no host"))?;
    let port = url.port_or_known_default().unwrap_or(80);

    let addrs: Vec<String> = tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("failed to resolve {host}"))?
        .map(|addr| addr.ip().to_string())
        .collect();

    if addrs.is_empty() {
        bail!("{host} resolved to no addresses");
    }
    Ok(addrs.join(", "))
}

async fn check_query(gateway: &HttpGateway) -> Result<usize> {
    let body = gateway.query(&QueryOptions::new(PROBE_QUERY)).await?;
    let parsed = parse_instant_vector(&body)?;
    Ok(parsed.samples.len())
}
