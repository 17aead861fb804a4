// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Kettu CLI
 * Thin flag layer over the scan driver
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use kettu_scanner::config::{OutputFormat, PocShape, RemotePayloadSource, ScanOptions};
use kettu_scanner::scan;

#[derive(Parser, Debug)]
#[command(name = "kettu", version, about = "Kettu - XSS scanner")]
struct Cli {
    /// Target URL
    url: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Milliseconds between requests to the same host
    #[arg(long, default_value_t = 0)]
    delay: u64,

    /// Number of concurrent HTTP workers
    #[arg(short = 'w', long, default_value_t = 100)]
    worker: usize,

    /// Follow HTTP redirects
    #[arg(long)]
    follow_redirects: bool,

    /// HTTP/HTTPS proxy address
    #[arg(long)]
    proxy: Option<String>,

    /// Custom header, `Name: value` (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Cookie header value
    #[arg(short = 'C', long)]
    cookie: Option<String>,

    /// Custom User-Agent
    #[arg(long)]
    user_agent: Option<String>,

    /// Parameter to test (repeatable); required with --skip-discovery
    #[arg(short = 'p', long = "param")]
    params: Vec<String>,

    /// Parameter to leave alone (repeatable)
    #[arg(long = "ignore-param")]
    ignore_params: Vec<String>,

    /// Form body; switches probing to POST for body parameters
    #[arg(short = 'd', long)]
    data: Option<String>,

    /// HTTP method for probes
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Comma list of status codes that abort the scan without error
    #[arg(long)]
    ignore_return: Option<String>,

    /// Skip the discovery phase (requires -p)
    #[arg(long)]
    skip_discovery: bool,

    /// Stop after discovery; no payload matrix is dispatched
    #[arg(long)]
    only_discovery: bool,

    /// Test only payloads from --custom-payload
    #[arg(long)]
    only_custom_payload: bool,

    /// File with one payload per line
    #[arg(long)]
    custom_payload: Option<PathBuf>,

    /// Blind XSS callback host or URL
    #[arg(short = 'b', long)]
    blind: Option<String>,

    /// Comma list of remote payload sources (portswigger, payloadbox)
    #[arg(long)]
    remote_payloads: Option<String>,

    /// Verify candidate findings in a headless browser
    #[arg(long)]
    headless: bool,

    /// Use the extended DOM XSS payload set (implies --headless)
    #[arg(long)]
    deep_domxss: bool,

    /// Run the broader-attack-vector analyses alongside discovery
    #[arg(long)]
    use_bav: bool,

    /// PoC line format
    #[arg(long, value_parser = ["plain", "json"], default_value = "plain")]
    format: String,

    /// Show only these PoC kinds, comma list of r,v
    #[arg(long)]
    only_poc: Option<String>,

    /// PoC data shape
    #[arg(long, value_parser = ["plain", "curl", "httpie", "http-request"], default_value = "plain")]
    poc_type: String,

    /// Shell command template run per finding
    #[arg(long)]
    found_action: Option<String>,

    /// Attach the raw request to findings
    #[arg(long)]
    output_request: bool,

    /// Attach the raw response to findings
    #[arg(long)]
    output_response: bool,

    /// Suppress log output
    #[arg(short = 'S', long)]
    silence: bool,

    #[arg(long)]
    no_color: bool,

    #[arg(long)]
    no_spinner: bool,

    /// Print the final report
    #[arg(long)]
    report: bool,

    /// Report format
    #[arg(long, value_parser = ["plain", "json"], default_value = "plain")]
    report_format: String,
}

fn parse_format(s: &str) -> OutputFormat {
    match s {
        "json" => OutputFormat::Json,
        _ => OutputFormat::Plain,
    }
}

fn parse_poc_shape(s: &str) -> PocShape {
    match s {
        "curl" => PocShape::Curl,
        "httpie" => PocShape::Httpie,
        "http-request" => PocShape::HttpRequest,
        _ => PocShape::Plain,
    }
}

fn options_from(cli: &Cli) -> ScanOptions {
    ScanOptions {
        timeout_secs: cli.timeout,
        delay_ms: cli.delay,
        concurrency: cli.worker,
        follow_redirect: cli.follow_redirects,
        proxy: cli.proxy.clone(),
        user_agent: cli.user_agent.clone(),
        custom_headers: cli
            .headers
            .iter()
            .filter_map(|h| {
                h.split_once(':')
                    .map(|(n, v)| (n.trim().to_string(), v.trim().to_string()))
            })
            .collect(),
        cookie: cli.cookie.clone(),
        method: cli.method.clone(),
        data: cli.data.clone(),
        uniq_params: cli.params.clone(),
        ignore_params: cli.ignore_params.clone(),
        ignore_return: cli
            .ignore_return
            .as_deref()
            .map(ScanOptions::parse_ignore_return)
            .unwrap_or_default(),
        skip_discovery: cli.skip_discovery,
        only_discovery: cli.only_discovery,
        only_custom_payload: cli.only_custom_payload,
        custom_payload_file: cli.custom_payload.clone(),
        use_headless: cli.headless || cli.deep_domxss,
        use_deep_dom: cli.deep_domxss,
        use_bav: cli.use_bav,
        blind_url: cli.blind.clone(),
        remote_payloads: cli
            .remote_payloads
            .as_deref()
            .map(RemotePayloadSource::parse_list)
            .unwrap_or_default(),
        format: parse_format(&cli.format),
        only_poc: cli.only_poc.clone(),
        poc_type: parse_poc_shape(&cli.poc_type),
        found_action: cli.found_action.clone(),
        output_request: cli.output_request,
        output_response: cli.output_response,
        silence: cli.silence,
        no_color: cli.no_color,
        no_spinner: cli.no_spinner,
        report: cli.report,
        report_format: parse_format(&cli.report_format),
        ..Default::default()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.silence { "error" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_ansi(!cli.no_color)
        .with_target(false)
        .init();

    let options = options_from(&cli);
    match scan(&cli.url, options, "1").await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
