//! Live responses for `check --url`.

use anyhow::Context;
use hexpect::{ActualResponse, Headers};
use reqwest::header::HeaderMap;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

pub fn client(timeout_secs: u64) -> Result<Client, anyhow::Error> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("Failed to build HTTP client")
}

/// GET `url` and capture the response for matching.
pub async fn fetch(client: &Client, url: &str) -> Result<ActualResponse, anyhow::Error> {
    let start = std::time::Instant::now();
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET {url} failed"))?;

    let status = response.status().as_u16();
    let headers = convert_headers(response.headers());
    let body = response
        .bytes()
        .await
        .with_context(|| format!("Failed to read body from {url}"))?;

    debug!(
        url,
        status,
        bytes = body.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "fetched response"
    );
    Ok(ActualResponse::new(status, headers, body))
}

/// Header values that are not valid UTF-8 are skipped.
fn convert_headers(map: &HeaderMap) -> Headers {
    map.iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, SET_COOKIE};

    #[test]
    fn test_convert_headers_keeps_repeats() {
        let mut map = HeaderMap::new();
        map.append(SET_COOKIE, HeaderValue::from_static("a=1"));
        map.append(SET_COOKIE, HeaderValue::from_static("b=2"));
        map.append("x-raw", HeaderValue::from_bytes(b"\xff").unwrap());

        let headers = convert_headers(&map);
        assert_eq!(
            headers.get("Set-Cookie"),
            Some(&["a=1".to_string(), "b=2".to_string()][..])
        );
        assert_eq!(headers.get("x-raw"), None);
    }
}
