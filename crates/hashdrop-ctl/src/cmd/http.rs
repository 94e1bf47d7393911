//! Shared HTTP request helpers for CLI commands.

use anyhow::{Context, Result, bail};
use serde::Deserialize;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    message: String,
}

/// Turn a non-2xx reply into an error naming the service's error kind.
async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(e) => bail!("{} ({}): {}", status, e.error, e.message),
        Err(_) => bail!("{}: {}", status, body),
    }
}

async fn send(req: reqwest::RequestBuilder, url: &str) -> Result<reqwest::Response> {
    let resp = req
        .send()
        .await
        .with_context(|| format!("failed to connect to {}, is the service running?", url))?;
    check(resp).await
}

pub async fn get_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    send(reqwest::Client::new().get(url), url)
        .await?
        .json::<T>()
        .await
        .context("failed to parse response")
}

pub async fn post_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    send(reqwest::Client::new().post(url), url)
        .await?
        .json::<T>()
        .await
        .context("failed to parse response")
}

pub async fn get_bytes(url: &str) -> Result<Vec<u8>> {
    let bytes = send(reqwest::Client::new().get(url), url)
        .await?
        .bytes()
        .await
        .context("failed to read response body")?;
    Ok(bytes.to_vec())
}
