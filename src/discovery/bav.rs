// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Broader Attack Vector Analyses
 * Opportunistic ESI / SQLi / SSTI / CRLF / open-redirect probes that run
 * alongside XSS discovery
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ScanOptions;
use crate::encoding::Encoder;
use crate::http_client::{self, HttpResponse};
use crate::output;
use crate::rate_limiter::HostGate;
use crate::request::{build_param_probe, Job, Placement};
use crate::types::Poc;

static SQL_ERROR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(SQL syntax.*MySQL|mysql_fetch|ORA-\d{5}|PostgreSQL.*ERROR|sqlite3?\.OperationalError|Unclosed quotation mark|SQLSTATE\[)",
    )
    .unwrap()
});

/// Run the five BAV sub-analyses concurrently and wait for all of them.
pub async fn run_bav_analysis(
    target: &Url,
    options: &Arc<ScanOptions>,
    client: &Client,
    gate: &Arc<HostGate>,
    results: &mpsc::UnboundedSender<Poc>,
) {
    tokio::join!(
        esi_analysis(target, options, client, gate, results),
        sqli_analysis(target, options, client, gate, results),
        ssti_analysis(target, options, client, gate, results),
        crlf_analysis(target, options, client, gate, results),
        open_redirect_analysis(target, options, client, gate, results),
    );
    info!("[BAV] Analysis done");
}

fn scope_params(target: &Url, options: &ScanOptions) -> Vec<String> {
    target
        .query_pairs()
        .map(|(name, _)| name.to_string())
        .filter(|name| options.check_inspection_param(name))
        .collect()
}

async fn send_probe(
    target: &Url,
    options: &ScanOptions,
    client: &Client,
    gate: &Arc<HostGate>,
    param: &str,
    payload: &str,
    inject_type: &str,
) -> Option<(Job, HttpResponse)> {
    let job = build_param_probe(
        target,
        param,
        payload,
        inject_type,
        Placement::Replace,
        Encoder::Plain,
        options,
    );
    gate.block(&job.request.host()).await;
    match http_client::execute(client, &job.request).await {
        Ok(response) => Some((job, response)),
        Err(e) => {
            debug!("[BAV] Probe failed for {}: {}", param, e);
            None
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn emit_finding(
    options: &ScanOptions,
    results: &mpsc::UnboundedSender<Poc>,
    job: &Job,
    response: &HttpResponse,
    kind: &str,
    cwe: &str,
    severity: &str,
    message: String,
) {
    warn!("{}", message);
    let mut poc = Poc {
        kind: kind.to_string(),
        inject_type: job.meta.inject_type.clone(),
        method: job.request.method.clone(),
        data: output::make_poc(job.request.url.as_str(), &job.request, options),
        param: job.meta.param.clone(),
        payload: job.meta.payload.clone(),
        evidence: String::new(),
        cwe: cwe.to_string(),
        severity: severity.to_string(),
        poc_type: options.poc_type.as_str().to_string(),
        message_id: 0,
        message_str: message,
        raw_http_request: None,
        raw_http_response: None,
    };
    if options.output_request {
        poc.raw_http_request = Some(job.request.dump());
    }
    if options.output_response {
        poc.raw_http_response = Some(response.body.clone());
    }
    output::print_poc(&poc, options);
    let _ = results.send(poc);
}

/// Edge Side Include injection: an unencoded reflection of an esi tag.
async fn esi_analysis(
    target: &Url,
    options: &Arc<ScanOptions>,
    client: &Client,
    gate: &Arc<HostGate>,
    results: &mpsc::UnboundedSender<Poc>,
) {
    let payload = "<esi:include src=\"http://kettu.invalid/\"/>";
    for param in scope_params(target, options) {
        if let Some((job, response)) =
            send_probe(target, options, client, gate, &param, payload, "toESI").await
        {
            if response.body.contains(payload) {
                emit_finding(
                    options,
                    results,
                    &job,
                    &response,
                    "R",
                    "CWE-97",
                    "Medium",
                    format!("Reflected ESI include tag on param '{}'", param),
                );
            }
        }
    }
}

/// Error-based SQL injection indicators.
async fn sqli_analysis(
    target: &Url,
    options: &Arc<ScanOptions>,
    client: &Client,
    gate: &Arc<HostGate>,
    results: &mpsc::UnboundedSender<Poc>,
) {
    for param in scope_params(target, options) {
        for payload in ["'", "\"", "' OR '1'='1"] {
            if let Some((job, response)) =
                send_probe(target, options, client, gate, &param, payload, "toSQLI").await
            {
                if SQL_ERROR_PATTERN.is_match(&response.body) {
                    emit_finding(
                        options,
                        results,
                        &job,
                        &response,
                        "V",
                        "CWE-89",
                        "Medium",
                        format!("SQL error pattern triggered by param '{}'", param),
                    );
                    break;
                }
            }
        }
    }
}

/// Server-side template injection: arithmetic evaluated by the template
/// engine.
async fn ssti_analysis(
    target: &Url,
    options: &Arc<ScanOptions>,
    client: &Client,
    gate: &Arc<HostGate>,
    results: &mpsc::UnboundedSender<Poc>,
) {
    for param in scope_params(target, options) {
        for payload in ["{{341*341}}", "${341*341}"] {
            if let Some((job, response)) =
                send_probe(target, options, client, gate, &param, payload, "toSSTI").await
            {
                if response.body.contains("116281") && !response.body.contains(payload) {
                    emit_finding(
                        options,
                        results,
                        &job,
                        &response,
                        "V",
                        "CWE-94",
                        "Medium",
                        format!("Template expression evaluated via param '{}'", param),
                    );
                    break;
                }
            }
        }
    }
}

/// CRLF injection: a probe value that materializes as a response header.
async fn crlf_analysis(
    target: &Url,
    options: &Arc<ScanOptions>,
    client: &Client,
    gate: &Arc<HostGate>,
    results: &mpsc::UnboundedSender<Poc>,
) {
    let payload = "%0d%0akettu-crlf:%20injected";
    for param in scope_params(target, options) {
        if let Some((job, response)) =
            send_probe(target, options, client, gate, &param, payload, "toCRLF").await
        {
            if response.header("kettu-crlf").is_some() {
                emit_finding(
                    options,
                    results,
                    &job,
                    &response,
                    "V",
                    "CWE-93",
                    "Medium",
                    format!("Injected response header via param '{}'", param),
                );
            }
        }
    }
}

/// Open redirect: a schemeless external value lands in Location.
async fn open_redirect_analysis(
    target: &Url,
    options: &Arc<ScanOptions>,
    client: &Client,
    gate: &Arc<HostGate>,
    results: &mpsc::UnboundedSender<Poc>,
) {
    let payload = "//kettu.invalid/landing";
    for param in scope_params(target, options) {
        if let Some((job, response)) =
            send_probe(target, options, client, gate, &param, payload, "toOpenRedirect").await
        {
            let redirected = matches!(response.status_code, 301 | 302 | 303 | 307 | 308)
                && response
                    .header("location")
                    .map(|l| l.contains("kettu.invalid"))
                    .unwrap_or(false);
            if redirected {
                emit_finding(
                    options,
                    results,
                    &job,
                    &response,
                    "R",
                    "CWE-601",
                    "Medium",
                    format!("Open redirect via param '{}'", param),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_error_pattern_matches_engines() {
        assert!(SQL_ERROR_PATTERN.is_match("You have an error in your SQL syntax; check the manual MySQL"));
        assert!(SQL_ERROR_PATTERN.is_match("ORA-01756: quoted string not properly terminated"));
        assert!(SQL_ERROR_PATTERN.is_match("SQLSTATE[42000]: Syntax error"));
        assert!(!SQL_ERROR_PATTERN.is_match("<html>all good</html>"));
    }

    #[test]
    fn test_scope_params_respects_filters() {
        let target = Url::parse("https://target.example/?q=1&utm_source=x").unwrap();
        let options = ScanOptions {
            ignore_params: vec!["utm_source".to_string()],
            ..Default::default()
        };
        assert_eq!(scope_params(&target, &options), vec!["q".to_string()]);
    }
}
