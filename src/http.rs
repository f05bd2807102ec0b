//! Shared wreq client construction and response handling for both stores.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{debug, warn};
use wreq::{Client, Response};

/// Builds an HTTP client with cookies, compression, timeouts and optional proxy.
pub fn build_client(proxy: Option<&str>) -> Result<Client> {
    let mut builder = Client::builder()
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10));

    if let Some(proxy_url) = proxy {
        debug!("Configuring proxy: {}", proxy_url);
        let proxy = wreq::Proxy::all(proxy_url).context("Failed to configure proxy")?;
        builder = builder.proxy(proxy);
    }

    builder.build().context("Failed to build HTTP client")
}

/// Checks the status and reads the body of a store response.
pub async fn read_body(response: Response, store: &str) -> Result<String> {
    let status = response.status();
    debug!("Response status: {}", status);

    if status == 429 || status == 503 {
        warn!("{} rate limited ({}). Consider using a proxy or increasing delay.", store, status);
        anyhow::bail!("Rate limited by {} (status {})", store, status);
    }

    if !status.is_success() {
        anyhow::bail!("{} request failed with status: {}", store, status);
    }

    response.text().await.context("Failed to read response body")
}
