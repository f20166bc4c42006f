//! Shared HTTP request helpers for CLI commands.

use anyhow::{Context, Result};
use serde::Deserialize;

pub fn base_url(port: u16) -> String {
    format!("http://127.0.0.1:{}/api", port)
}

pub async fn get_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    reqwest::get(url)
        .await
        .with_context(|| format!("failed to connect to tandemd at {}. Is it running?", url))?
        .error_for_status()
        .context("tandemd returned an error")?
        .json::<T>()
        .await
        .context("failed to parse response")
}

/// `1h 02m 03s` style duration.
pub fn human_secs(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    match (h, m) {
        (0, 0) => format!("{}s", s),
        (0, _) => format!("{}m {:02}s", m, s),
        _ => format!("{}h {:02}m {:02}s", h, m, s),
    }
}

/// First 8 characters of an id, for compact listings.
pub fn short(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
