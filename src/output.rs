// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Finding Output
 * PoC line rendering, the found-action hook and scan summary logging
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use tracing::{debug, info};

use crate::config::{OutputFormat, PocShape, ScanOptions};
use crate::request::ProbeRequest;
use crate::types::{Poc, ScanResult};

/// Rewrite PoC data into the configured shape, attaching the actually
/// executed URL and body.
pub fn make_poc(data: &str, request: &ProbeRequest, options: &ScanOptions) -> String {
    match options.poc_type {
        PocShape::Plain => data.to_string(),
        PocShape::Curl => match &request.body {
            Some(body) => format!("curl -i \"{}\" -d \"{}\"", data, body),
            None => format!("curl -i \"{}\"", data),
        },
        PocShape::Httpie => match &request.body {
            Some(body) => format!("http {} \"{}\" \"{}\"", request.method, data, body),
            None => format!("http {} \"{}\"", request.method, data),
        },
        PocShape::HttpRequest => request.dump(),
    }
}

/// Print a single PoC line. JSON lines carry a trailing comma; framing a
/// valid array is the caller's concern.
pub fn print_poc(poc: &Poc, options: &ScanOptions) {
    match options.format {
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string(poc) {
                println!("{},", json);
            }
        }
        OutputFormat::Plain => {
            println!("[{}][{}][{}] {}", poc.kind, poc.method, poc.inject_type, poc.data);
        }
    }
}

/// Run the found-action shell template for a finding. Failures are
/// ignored by contract.
pub async fn found_action(options: &ScanOptions, target: &str, found_url: &str, tag: &str) {
    let Some(template) = &options.found_action else {
        return;
    };
    let command = template
        .replace("@@target@@", target)
        .replace("@@query@@", found_url)
        .replace("@@type@@", tag);

    debug!("Running found-action: {}", command);
    let _ = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(&command)
        .status()
        .await;
}

pub fn log_scan_start(target: &str, options: &ScanOptions, sid: &str) {
    if options.silence && options.multicast_mode {
        return;
    }
    if options.all_urls > 0 {
        let now: f64 = sid.parse().unwrap_or(0.0);
        let percent = now / options.all_urls as f64 * 100.0;
        info!(
            "Start scan [SID:{}][{}/{}][{:.2}%] / URL: {}",
            sid, sid, options.all_urls, percent, target
        );
    } else {
        info!("Start scan [SID:{}] / URL: {}", sid, target);
    }
}

pub fn log_scan_summary(result: &ScanResult, options: &ScanOptions) {
    if options.silence && options.multicast_mode {
        return;
    }
    info!(
        "[duration: {:.2}s][issues: {}] Finish Scan!",
        result.duration_seconds,
        result.pocs.len()
    );
}

/// Render the final report when requested.
pub fn print_report(result: &ScanResult, options: &ScanOptions) {
    if !options.report {
        return;
    }
    match options.report_format {
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(result) {
                println!("{}", json);
            }
        }
        OutputFormat::Plain => {
            println!("Target: {}", result.target);
            println!("Duration: {:.2}s", result.duration_seconds);
            println!("Parameters: {}", result.params.len());
            for poc in &result.pocs {
                println!("  [{}][{}] {} (param: {})", poc.kind, poc.severity, poc.data, poc.param);
            }
        }
    }
}
