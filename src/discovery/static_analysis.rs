// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Static Analysis
 * Response policy extraction and path-reflection probing
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use crate::config::ScanOptions;
use crate::http_client;
use crate::rate_limiter::HostGate;
use crate::verify;

/// Marker spliced into path segments to detect reflection.
pub const PATH_MARKER: &str = "kettupathtest";

/// Maximum path segments probed per target.
const MAX_PATH_SEGMENTS: usize = 4;

/// CSP sources that allow script injection despite the policy.
const CSP_BYPASS_SOURCES: &[&str] = &[
    "unsafe-inline",
    "unsafe-eval",
    "data:",
    "*.googleapis.com",
    "*.google-analytics.com",
    "www.google.com",
    "*.cloudflare.com",
];

/// Inspect the target response for policy headers, then probe each path
/// segment for reflection and record the injection context per segment.
pub async fn static_analysis(
    target: &Url,
    _options: &Arc<ScanOptions>,
    client: &Client,
    gate: &Arc<HostGate>,
) -> (HashMap<String, String>, HashMap<usize, String>) {
    let mut policy = HashMap::new();
    let host = target.host_str().unwrap_or("unknown").to_string();

    gate.block(&host).await;
    match http_client::fetch(client, target.as_str()).await {
        Ok(response) => {
            if let Some(ct) = response.header("content-type") {
                policy.insert(
                    "Content-Type".to_string(),
                    ct.split(';').next().unwrap_or(ct).trim().to_string(),
                );
            }
            if let Some(csp) = response.header("content-security-policy") {
                policy.insert("CSP".to_string(), csp.clone());
                let bypass: Vec<&str> = CSP_BYPASS_SOURCES
                    .iter()
                    .filter(|s| csp.contains(*s))
                    .copied()
                    .collect();
                if !bypass.is_empty() {
                    policy.insert("BypassCSP".to_string(), bypass.join(" "));
                }
            }
            if let Some(xfo) = response.header("x-frame-options") {
                policy.insert("X-Frame-Options".to_string(), xfo.clone());
            }
            if let Some(server) = response.header("server") {
                policy.insert("Server".to_string(), server.clone());
            }
        }
        Err(e) => debug!("Static analysis fetch failed: {}", e),
    }

    let path_reflection = probe_path_reflection(target, client, gate, &host).await;
    info!(
        "Static analysis done [policies: {} / reflected path segments: {}]",
        policy.len(),
        path_reflection.len()
    );

    (policy, path_reflection)
}

async fn probe_path_reflection(
    target: &Url,
    client: &Client,
    gate: &Arc<HostGate>,
    host: &str,
) -> HashMap<usize, String> {
    let mut reflection = HashMap::new();
    let segments: Vec<String> = target
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).map(str::to_string).collect())
        .unwrap_or_default();

    if segments.is_empty() {
        let mut probe = target.clone();
        probe.set_path(&format!("/{}", PATH_MARKER));
        if let Some(tag) = probe_one(client, gate, host, &probe).await {
            reflection.insert(0, tag);
        }
        return reflection;
    }

    for (idx, segment) in segments.iter().take(MAX_PATH_SEGMENTS).enumerate() {
        let mut rewritten = segments.clone();
        rewritten[idx] = format!("{}{}", segment, PATH_MARKER);
        let mut probe = target.clone();
        probe.set_path(&format!("/{}", rewritten.join("/")));
        if let Some(tag) = probe_one(client, gate, host, &probe).await {
            reflection.insert(idx, tag);
        }
    }

    reflection
}

async fn probe_one(client: &Client, gate: &Arc<HostGate>, host: &str, probe: &Url) -> Option<String> {
    gate.block(host).await;
    let response = http_client::fetch(client, probe.as_str()).await.ok()?;
    if !response.body.contains(PATH_MARKER) {
        return None;
    }
    let contexts = verify::injection_contexts(&response.body, PATH_MARKER);
    if contexts.is_empty() {
        return None;
    }
    Some(format!("Injected:/{}", contexts.join("/")))
}
