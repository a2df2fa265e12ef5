//! Fetching import sources over HTTP.

use anyhow::{Context as _, Result, bail};

/// True if the import source looks like a URL rather than a local path.
pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Download an import source. Returns the body and the filename part of
/// the URL, which drives format detection.
pub async fn fetch_bytes(url: &str) -> Result<(Vec<u8>, String)> {
    let response = reqwest::get(url)
        .await
        .with_context(|| format!("failed to fetch {url}"))?;
    let status = response.status();
    if !status.is_success() {
        bail!("{url} answered {status}");
    }
    let bytes = response
        .bytes()
        .await
        .with_context(|| format!("failed to read response body from {url}"))?;
    Ok((bytes.to_vec(), url_filename(url)))
}

/// The last path segment of a URL, query string stripped.
pub fn url_filename(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .unwrap_or_default()
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}
