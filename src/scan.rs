// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scan Driver
 * Top-level sequence: validate target, discovery, payload matrix, worker
 * pool, aggregation
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{info, warn};
use url::Url;

use crate::classifier::{Classifier, VerdictStatus};
use crate::config::ScanOptions;
use crate::discovery::{self, DiscoveryOutcome};
use crate::errors::ScanError;
use crate::har::MessageSink;
use crate::headless::{ChromiumVerifier, HeadlessVerifier};
use crate::http_client;
use crate::matrix;
use crate::output;
use crate::rate_limiter::HostGate;
use crate::types::{ParamLocation, ParamResult, Poc, ScanResult};
use crate::worker::{self, PoolContext};

/// Run a full scan against a single target. The headless verifier is
/// constructed from the options; use [`scan_with_verifier`] to inject one.
pub async fn scan(target: &str, options: ScanOptions, sid: &str) -> Result<ScanResult, ScanError> {
    let verifier: Option<Arc<dyn HeadlessVerifier>> = if options.use_headless {
        Some(Arc::new(ChromiumVerifier::new(Duration::from_secs(options.timeout_secs.max(10)))))
    } else {
        None
    };
    scan_with_verifier(target, options, sid, verifier).await
}

/// Scan with an explicit headless verifier (or none). Returns `Ok` with an
/// empty result set on a clean run without findings; errors only for an
/// invalid target, an unreachable target, or bad configuration.
pub async fn scan_with_verifier(
    target: &str,
    options: ScanOptions,
    sid: &str,
    verifier: Option<Arc<dyn HeadlessVerifier>>,
) -> Result<ScanResult, ScanError> {
    options.validate()?;

    let started = Instant::now();
    let mut result = ScanResult::new(target);

    let parsed = Url::parse(target).map_err(|e| ScanError::InvalidTarget {
        url: target.to_string(),
        source: e,
    })?;

    let client = http_client::build_client(&options)
        .map_err(|e| ScanError::Configuration(e.to_string()))?;

    // Validation probe. An unreachable target fails the whole scan.
    let validation = http_client::fetch(&client, target).await.map_err(|e| {
        warn!("not running: {}", e);
        match e.downcast::<reqwest::Error>() {
            Ok(e) => ScanError::TargetUnreachable(e),
            Err(e) => ScanError::Configuration(e.to_string()),
        }
    })?;
    if options.should_ignore_return(validation.status_code) {
        info!("Not running {} from ignore-return option", target);
        finish(&mut result, started);
        return Ok(result);
    }
    info!(
        "Valid target [ code:{} / size:{} ]",
        validation.status_code,
        validation.body.len()
    );

    output::log_scan_start(target, &options, sid);

    let options = Arc::new(options);
    let gate = Arc::new(HostGate::from_millis(options.delay_ms));
    let messages = Arc::new(MessageSink::new());

    // Single-consumer aggregator: every emitted PoC lands in the final
    // result exactly once.
    let (results_tx, mut results_rx) = mpsc::unbounded_channel::<Poc>();
    let collector = tokio::spawn(async move {
        let mut pocs: Vec<Poc> = Vec::new();
        while let Some(poc) = results_rx.recv().await {
            pocs.push(poc);
        }
        pocs
    });

    let outcome = if options.skip_discovery {
        info!("Skipping discovery phase as requested");
        let mut outcome = DiscoveryOutcome::default();
        for name in options.uniq_params.iter().filter(|p| !p.is_empty()) {
            let mut param = ParamResult::new(name, ParamLocation::Query);
            param.reflected = true;
            outcome.params.insert(name.clone(), param);
        }
        // Dummy content type so the markup sub-matrices stay enabled.
        outcome
            .policy
            .insert("Content-Type".to_string(), "text/html".to_string());
        info!(
            "Discovery and content-type checks skipped; testing {} parameters",
            outcome.params.len()
        );
        outcome
    } else {
        let outcome =
            discovery::run_discovery(&parsed, &options, &client, &gate, &results_tx).await;
        log_discovery(&outcome);
        outcome
    };

    let mut params: Vec<ParamResult> = outcome.params.values().cloned().collect();
    params.sort_by(|a, b| a.name.cmp(&b.name));
    result.params = params;

    if !options.only_discovery {
        info!("Generating XSS payload matrix");
        let verdicts = Arc::new(VerdictStatus::new());
        verdicts.seed(outcome.params.keys());

        let test_matrix = matrix::build_matrix(
            &parsed,
            &options,
            &client,
            &outcome.params,
            &outcome.policy,
            &outcome.path_reflection,
        )
        .await;
        info!(
            "Start XSS Scanning.. with {} queries and {} DOM URLs",
            test_matrix.jobs.len(),
            test_matrix.dom_urls.len()
        );

        let classifier = Arc::new(Classifier::new(
            Arc::clone(&options),
            target.to_string(),
            verdicts,
            results_tx.clone(),
            verifier.clone(),
        ));
        let ctx = Arc::new(PoolContext {
            options: Arc::clone(&options),
            client,
            gate,
            classifier,
            messages,
            verifier,
        });
        worker::run_pool(test_matrix.jobs, test_matrix.dom_urls, ctx).await;
    }

    // Close the channel and drain the aggregator.
    drop(results_tx);
    result.pocs = collector.await.unwrap_or_default();

    finish(&mut result, started);
    output::log_scan_summary(&result, &options);
    output::print_report(&result, &options);
    Ok(result)
}

fn finish(result: &mut ScanResult, started: Instant) {
    result.completed_at = chrono::Utc::now().to_rfc3339();
    result.duration_seconds = started.elapsed().as_secs_f64();
}

fn log_discovery(outcome: &DiscoveryOutcome) {
    for (name, value) in &outcome.policy {
        if value.is_empty() {
            continue;
        }
        if name == "BypassCSP" {
            warn!("{}: {}", name, value);
        } else {
            info!("{} is {}", name, value);
        }
    }
    for (idx, tag) in &outcome.path_reflection {
        info!("Reflected PATH segment {} => {}", idx, tag);
    }
    for (name, param) in &outcome.params {
        if param.reflected {
            info!("Reflected {} param => [{}]", name, param.chars.join("  "));
            if !param.reflected_code.is_empty() {
                info!("{}", param.reflected_code);
            }
        }
    }
}
