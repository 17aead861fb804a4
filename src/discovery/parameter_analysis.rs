// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Parameter Analysis
 * Parameter discovery, reflection detection and per-character filter
 * probing
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info};
use url::Url;

use crate::config::ScanOptions;
use crate::encoding::Encoder;
use crate::http_client;
use crate::rate_limiter::HostGate;
use crate::request::{build_param_probe, Placement};
use crate::types::{ParamLocation, ParamResult, CHAR_ALPHABET};
use crate::verify;

/// Marker value used for reflection probes.
pub const REFLECT_MARKER: &str = "ktxqv0r7";

/// Cap on parameters mined out of the response HTML.
const MAX_MINED_PARAMS: usize = 25;

/// Discover candidate parameters, probe each for reflection, and build the
/// per-parameter character filter profile.
pub async fn parameter_analysis(
    target: &Url,
    options: &Arc<ScanOptions>,
    client: &Client,
    gate: &Arc<HostGate>,
) -> HashMap<String, ParamResult> {
    let host = target.host_str().unwrap_or("unknown").to_string();
    let mut candidates: Vec<(String, ParamLocation, String)> = Vec::new();

    let fragment_only = target.query().map(|q| q.is_empty()).unwrap_or(true)
        && target.fragment().map(|f| !f.is_empty()).unwrap_or(false);
    if fragment_only {
        for pair in target.fragment().unwrap_or("").split('&') {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            if !name.is_empty() {
                candidates.push((name.to_string(), ParamLocation::Fragment, value.to_string()));
            }
        }
    } else {
        for (name, value) in target.query_pairs() {
            candidates.push((name.to_string(), ParamLocation::Query, value.to_string()));
        }
    }

    if let Some(data) = options.data.as_deref() {
        for pair in data.split('&') {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            if !name.is_empty() {
                candidates.push((name.to_string(), ParamLocation::Body, value.to_string()));
            }
        }
    }

    for name in &options.uniq_params {
        if !name.is_empty() && !candidates.iter().any(|(n, _, _)| n == name) {
            candidates.push((name.clone(), ParamLocation::Query, String::new()));
        }
    }

    // Mine form fields out of the baseline response.
    gate.block(&host).await;
    if let Ok(baseline) = http_client::fetch(client, target.as_str()).await {
        for name in mine_form_params(&baseline.body) {
            if !candidates.iter().any(|(n, _, _)| *n == name) {
                candidates.push((name, ParamLocation::Query, String::new()));
            }
        }
    }

    let mut params = HashMap::new();
    for (name, location, original_value) in candidates {
        if !options.check_inspection_param(&name) {
            continue;
        }
        if params.contains_key(&name) {
            continue;
        }
        let result =
            analyze_param(target, options, client, gate, &host, &name, location, &original_value)
                .await;
        params.insert(name, result);
    }

    info!(
        "Parameter analysis done [{} params, {} reflected]",
        params.len(),
        params.values().filter(|p| p.reflected).count()
    );
    params
}

#[allow(clippy::too_many_arguments)]
async fn analyze_param(
    target: &Url,
    options: &ScanOptions,
    client: &Client,
    gate: &Arc<HostGate>,
    host: &str,
    name: &str,
    location: ParamLocation,
    original_value: &str,
) -> ParamResult {
    let mut result = ParamResult::new(name, location);
    if !original_value.is_empty() && original_value.chars().all(|c| c.is_ascii_digit()) {
        result.ptype = Some("NUM".to_string());
    }

    let probe = build_param_probe(
        target,
        name,
        REFLECT_MARKER,
        "probe",
        Placement::Append,
        Encoder::Plain,
        options,
    );
    gate.block(host).await;
    let Ok(response) = http_client::execute(client, &probe.request).await else {
        return result;
    };
    if !response.body.contains(REFLECT_MARKER) {
        return result;
    }

    result.reflected = true;
    result.injected_contexts = verify::injection_contexts(&response.body, REFLECT_MARKER);
    result.reflected_code = verify::code_view(&response.body, REFLECT_MARKER);
    debug!("Param '{}' reflects in {:?}", name, result.injected_contexts);

    // Probe each alphabet character: surviving raw goes to `chars`,
    // transformed output goes to `bad_chars`.
    for &c in CHAR_ALPHABET {
        let payload = format!("{}{}{}", REFLECT_MARKER, c, REFLECT_MARKER);
        let probe = build_param_probe(
            target,
            name,
            &payload,
            "probe",
            Placement::Append,
            Encoder::Plain,
            options,
        );
        gate.block(host).await;
        let Ok(response) = http_client::execute(client, &probe.request).await else {
            continue;
        };
        if response.body.contains(&payload) {
            result.chars.push(c.to_string());
        } else if response.body.contains(REFLECT_MARKER) {
            result.bad_chars.push(c.to_string());
        }
    }

    result
}

/// Pull candidate parameter names out of form fields in the response.
fn mine_form_params(body: &str) -> Vec<String> {
    let document = Html::parse_document(body);
    let selector = Selector::parse("input[name], textarea[name], select[name]").unwrap();
    let mut names: Vec<String> = Vec::new();
    for element in document.select(&selector) {
        if let Some(name) = element.value().attr("name") {
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        if names.len() >= MAX_MINED_PARAMS {
            break;
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mine_form_params() {
        let body = r#"
            <form action="/search">
              <input name="q" type="text">
              <input name="q" type="hidden">
              <textarea name="comment"></textarea>
              <select name="sort"><option>a</option></select>
              <input type="submit">
            </form>"#;
        let mined = mine_form_params(body);
        assert_eq!(mined, vec!["q".to_string(), "comment".to_string(), "sort".to_string()]);
    }

    #[test]
    fn test_marker_is_alphanumeric() {
        // The reflection marker must survive every encoder untouched.
        assert!(REFLECT_MARKER.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
