//! HTTP client side of the API, used by the `report` command.

mod basic;
mod client;
mod report;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use report::fetch_weekly_report;

use anyhow::{Context, Result, bail};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ErrorBody;

/// GETs `url` and decodes the JSON body. Non-success statuses become errors
/// carrying the server's `message` when it sent one.
pub async fn fetch_json<C: HttpClient, T: DeserializeOwned>(client: &C, url: &str) -> Result<T> {
    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse().with_context(|| format!("invalid url {url}"))?,
    );

    let resp = client
        .execute(req)
        .await
        .with_context(|| format!("request to {url} failed"))?;
    let status = resp.status();
    debug!(url, %status, "Response received");

    if !status.is_success() {
        let message = resp
            .json::<ErrorBody>()
            .await
            .map(|body| body.message)
            .unwrap_or_else(|_| "no error message".to_string());
        bail!("{url} returned {status}: {message}");
    }

    resp.json()
        .await
        .with_context(|| format!("invalid JSON from {url}"))
}
