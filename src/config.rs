// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scan Options
 * Immutable per-scan configuration
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::ScanError;

/// Output format for PoC lines and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    #[default]
    Plain,
}

/// Shape applied to PoC data by `make_poc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PocShape {
    #[default]
    Plain,
    Curl,
    Httpie,
    HttpRequest,
}

impl PocShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            PocShape::Plain => "plain",
            PocShape::Curl => "curl",
            PocShape::Httpie => "httpie",
            PocShape::HttpRequest => "http-request",
        }
    }
}

/// Remote payload endpoints recognized by the matrix builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemotePayloadSource {
    Portswigger,
    Payloadbox,
}

impl RemotePayloadSource {
    pub fn parse_list(csv: &str) -> Vec<RemotePayloadSource> {
        csv.split(',')
            .filter_map(|s| match s.trim() {
                "portswigger" => Some(RemotePayloadSource::Portswigger),
                "payloadbox" => Some(RemotePayloadSource::Payloadbox),
                _ => None,
            })
            .collect()
    }

    pub fn name(&self) -> &'static str {
        match self {
            RemotePayloadSource::Portswigger => "portswigger",
            RemotePayloadSource::Payloadbox => "payloadbox",
        }
    }
}

/// Immutable configuration for a single scan.
///
/// Mutable scan state (verdicts, counters, the results channel) lives in the
/// driver and worker pool; it is never threaded back through this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanOptions {
    /// Total-request timeout in seconds.
    pub timeout_secs: u64,
    /// Minimum inter-request delay per host, in milliseconds.
    pub delay_ms: u64,
    /// Number of HTTP workers.
    pub concurrency: usize,
    pub follow_redirect: bool,
    pub proxy: Option<String>,
    pub user_agent: Option<String>,
    pub custom_headers: Vec<(String, String)>,
    pub cookie: Option<String>,
    pub method: String,
    /// Form body; when set, body parameters are probed and probes POST.
    pub data: Option<String>,
    /// Explicit parameter list; restricts inspection when non-empty and
    /// seeds discovery under `skip_discovery`.
    pub uniq_params: Vec<String>,
    pub ignore_params: Vec<String>,
    pub ignore_return: Vec<u16>,
    pub skip_discovery: bool,
    pub only_discovery: bool,
    pub only_custom_payload: bool,
    pub custom_payload_file: Option<PathBuf>,
    pub use_headless: bool,
    pub use_deep_dom: bool,
    pub use_bav: bool,
    pub blind_url: Option<String>,
    pub remote_payloads: Vec<RemotePayloadSource>,
    pub format: OutputFormat,
    /// PoC kind filter, comma list of `r` / `v`. Empty shows both.
    pub only_poc: Option<String>,
    pub poc_type: PocShape,
    /// Shell command template run per finding; `@@target@@`, `@@query@@`
    /// and `@@type@@` are substituted.
    pub found_action: Option<String>,
    pub output_request: bool,
    pub output_response: bool,
    pub silence: bool,
    pub no_color: bool,
    pub no_spinner: bool,
    pub multicast_mode: bool,
    pub report: bool,
    pub report_format: OutputFormat,
    /// Progress context when a caller drives many targets.
    pub now_url: usize,
    pub all_urls: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            delay_ms: 0,
            concurrency: 100,
            follow_redirect: false,
            proxy: None,
            user_agent: None,
            custom_headers: Vec::new(),
            cookie: None,
            method: "GET".to_string(),
            data: None,
            uniq_params: Vec::new(),
            ignore_params: Vec::new(),
            ignore_return: Vec::new(),
            skip_discovery: false,
            only_discovery: false,
            only_custom_payload: false,
            custom_payload_file: None,
            use_headless: false,
            use_deep_dom: false,
            use_bav: false,
            blind_url: None,
            remote_payloads: Vec::new(),
            format: OutputFormat::Plain,
            only_poc: None,
            poc_type: PocShape::Plain,
            found_action: None,
            output_request: false,
            output_response: false,
            silence: false,
            no_color: false,
            no_spinner: false,
            multicast_mode: false,
            report: false,
            report_format: OutputFormat::Plain,
            now_url: 0,
            all_urls: 0,
        }
    }
}

impl ScanOptions {
    /// Validate configuration before any I/O.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.skip_discovery && self.uniq_params.iter().all(|p| p.is_empty()) {
            return Err(ScanError::Configuration(
                "skip-discovery requires parameters to be specified with -p".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(ScanError::Configuration(
                "concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a parameter is in scope for probing.
    pub fn check_inspection_param(&self, name: &str) -> bool {
        if !self.uniq_params.is_empty() {
            return self.uniq_params.iter().any(|p| p == name);
        }
        !self.ignore_params.iter().any(|p| p == name)
    }

    /// Whether a validation-probe status code aborts the scan early.
    pub fn should_ignore_return(&self, status: u16) -> bool {
        self.ignore_return.contains(&status)
    }

    /// Parse the only-PoC filter into `(show_r, show_v)`.
    pub fn poc_filter(&self) -> (bool, bool) {
        match &self.only_poc {
            None => (true, true),
            Some(s) => {
                let kinds: Vec<&str> = s.split(',').map(|k| k.trim()).collect();
                (kinds.contains(&"r"), kinds.contains(&"v"))
            }
        }
    }

    /// Parse a comma list of status codes, ignoring garbage entries.
    pub fn parse_ignore_return(csv: &str) -> Vec<u16> {
        csv.split(',').filter_map(|s| s.trim().parse().ok()).collect()
    }

    /// DOM worker count for the headless pool: half the HTTP workers,
    /// clamped to [1, 10].
    pub fn dom_concurrency(&self) -> usize {
        (self.concurrency / 2).clamp(1, 10)
    }
}
