// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - HTTP Client Factory
 * Builds the probe client and executes probe requests
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::ScanOptions;
use crate::request::ProbeRequest;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Maximum response body size (10MB) to prevent memory exhaustion.
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// An executed probe's response, body drained.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub duration_ms: u64,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&String> {
        self.headers.get(&name.to_lowercase())
    }
}

/// Build the scan client: total-request timeout, optional proxy, TLS
/// verification off (scanner contract), redirects off unless configured.
pub fn build_client(options: &ScanOptions) -> Result<Client> {
    let redirect = if options.follow_redirect {
        reqwest::redirect::Policy::limited(10)
    } else {
        reqwest::redirect::Policy::none()
    };

    let mut headers = HeaderMap::new();
    for (name, value) in &options.custom_headers {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            debug!("Skipping unparsable header name: {}", name);
            continue;
        };
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(name, value);
        }
    }
    if let Some(cookie) = &options.cookie {
        if let Ok(value) = HeaderValue::from_str(cookie) {
            headers.insert(reqwest::header::COOKIE, value);
        }
    }

    let mut builder = Client::builder()
        .timeout(Duration::from_secs(options.timeout_secs))
        .danger_accept_invalid_certs(true)
        .redirect(redirect)
        .user_agent(options.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT))
        .default_headers(headers)
        .tcp_nodelay(true);

    if let Some(proxy) = &options.proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy).context("Invalid proxy address")?);
    }

    builder.build().context("Failed to create HTTP client")
}

/// Execute a probe and drain the body. Transport failures bubble up so the
/// caller can drop the job and move on.
pub async fn execute(client: &Client, probe: &ProbeRequest) -> Result<HttpResponse> {
    let method = Method::from_bytes(probe.method.as_bytes()).unwrap_or(Method::GET);
    let mut builder = client.request(method, probe.url.clone());

    for (name, value) in &probe.headers {
        builder = builder.header(name, value);
    }
    if let Some(body) = &probe.body {
        builder = builder
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body.clone());
    }

    let start = Instant::now();
    let response = builder.send().await?;
    let status_code = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(k, v)| (k.as_str().to_lowercase(), v.to_str().unwrap_or("").to_string()))
        .collect();
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_BODY_SIZE {
        let mut end = MAX_BODY_SIZE;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }

    Ok(HttpResponse {
        status_code,
        headers,
        body,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Plain GET used by discovery and the validation probe.
pub async fn fetch(client: &Client, url: &str) -> Result<HttpResponse> {
    let start = Instant::now();
    let response = client.get(url).send().await?;
    let status_code = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(k, v)| (k.as_str().to_lowercase(), v.to_str().unwrap_or("").to_string()))
        .collect();
    let body = response.text().await.unwrap_or_default();

    Ok(HttpResponse {
        status_code,
        headers,
        body,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_client_defaults() {
        let options = ScanOptions::default();
        assert!(build_client(&options).is_ok());
    }

    #[test]
    fn test_build_client_rejects_bad_proxy() {
        let options = ScanOptions {
            proxy: Some("not a proxy".to_string()),
            ..Default::default()
        };
        assert!(build_client(&options).is_err());
    }

    #[test]
    fn test_response_header_lookup_is_case_insensitive() {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "text/html".to_string());
        let response = HttpResponse {
            status_code: 200,
            headers,
            body: String::new(),
            duration_ms: 0,
        };
        assert_eq!(response.header("Content-Type").map(String::as_str), Some("text/html"));
    }
}
